//! Metadata query layer: what saves exist and what they look like, paying
//! only for the header of each record.

use serde::{Deserialize, Serialize};

use crate::backend::SaveBackend;
use crate::error::SaveResult;
use crate::format::FormatSpec;
use crate::record::{self, SaveDate, SaveTime};
use crate::slots::SaveCatalog;
use crate::thumbnail::Thumbnail;

/// Descriptive listing entry for one existing save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveInfo {
    pub slot: u32,
    pub description: String,
    pub date: SaveDate,
    pub time: SaveTime,
    pub play_time_ms: u32,
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
}

/// Lists every readable save of a target, ascending by slot.
///
/// Entries whose header fails validation are dropped from the listing with
/// a warning; a corrupt save simply does not appear. Thumbnails are skipped,
/// not decoded.
pub(crate) fn list_saves(
    backend: &dyn SaveBackend,
    spec: &FormatSpec,
    target: &str,
) -> SaveResult<Vec<SaveInfo>> {
    let catalog = SaveCatalog::new(backend, &spec.naming, spec.max_slot);
    let mut saves = Vec::new();
    for (slot, name) in catalog.list_slots(target)? {
        match read_info(backend, spec, slot, &name, false) {
            Ok(info) => saves.push(info),
            Err(err) if err.is_listing_skippable() => {
                log::warn!("dropping unreadable save '{name}' from listing: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(saves)
}

/// Full header detail for a single slot, thumbnail included.
///
/// Absent or invalid saves yield `Ok(None)`.
pub(crate) fn query_save_meta(
    backend: &dyn SaveBackend,
    spec: &FormatSpec,
    target: &str,
    slot: u32,
) -> SaveResult<Option<SaveInfo>> {
    let catalog = SaveCatalog::new(backend, &spec.naming, spec.max_slot);
    catalog.check_slot(slot)?;
    let name = spec.naming.blob_name(target, slot);
    match read_info(backend, spec, slot, &name, true) {
        Ok(info) => Ok(Some(info)),
        Err(err) if err.is_listing_skippable() => {
            log::warn!("no usable metadata for save '{name}': {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn read_info(
    backend: &dyn SaveBackend,
    spec: &FormatSpec,
    slot: u32,
    name: &str,
    want_thumbnail: bool,
) -> SaveResult<SaveInfo> {
    let mut reader = backend.open_for_loading(name)?;
    let header = record::read_header(&mut reader, spec, want_thumbnail)?;
    Ok(SaveInfo {
        slot,
        description: header.description,
        date: header.date,
        time: header.time,
        play_time_ms: header.play_time_ms,
        thumbnail: header.thumbnail,
    })
}
