//! Save slot catalog: maps `(target, slot)` pairs to blob names and
//! enumerates what exists, without opening any of the files.

use crate::backend::SaveBackend;
use crate::error::{SaveError, SaveResult};

/// Blob naming pattern for one game configuration.
///
/// The concrete patterns are wire contracts inherited from the original
/// interpreters (two to four digit fields, varying separators, optional
/// extensions), so they stay configurable; only the slot parsing is done
/// from the delimited field rather than a fixed character offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotNaming {
    /// Separator between the target name and the slot digits.
    pub separator: char,
    /// Zero-padded width of the slot field.
    pub digits: u8,
    /// Optional extension appended after the digits, without the dot.
    pub extension: Option<String>,
}

impl Default for SlotNaming {
    fn default() -> Self {
        SlotNaming {
            separator: '.',
            digits: 3,
            extension: None,
        }
    }
}

impl SlotNaming {
    /// Deterministic blob name for a slot, e.g. `"tentacle.003"` or
    /// `"drascula-07.SAV"`.
    pub fn blob_name(&self, target: &str, slot: u32) -> String {
        let width = self.digits as usize;
        match &self.extension {
            Some(extension) => {
                format!("{target}{}{slot:0width$}.{extension}", self.separator)
            }
            None => format!("{target}{}{slot:0width$}", self.separator),
        }
    }

    /// Glob pattern matching every slot of a target.
    pub fn pattern(&self, target: &str) -> String {
        let digits = "?".repeat(self.digits as usize);
        match &self.extension {
            Some(extension) => format!("{target}{}{digits}.{extension}", self.separator),
            None => format!("{target}{}{digits}", self.separator),
        }
    }

    /// Parses the slot number out of a blob name, bounded by the separator
    /// and the extension. Malformed names yield `None`.
    pub fn parse_slot(&self, target: &str, name: &str) -> Option<u32> {
        let rest = name.strip_prefix(target)?;
        let rest = rest.strip_prefix(self.separator)?;
        let field = match &self.extension {
            Some(extension) => rest.strip_suffix(extension.as_str())?.strip_suffix('.')?,
            None => rest,
        };
        if field.is_empty() || !field.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        field.parse().ok()
    }
}

/// Catalog over one backend and naming pattern.
pub struct SaveCatalog<'a> {
    backend: &'a dyn SaveBackend,
    naming: &'a SlotNaming,
    max_slot: u32,
}

impl<'a> SaveCatalog<'a> {
    pub fn new(backend: &'a dyn SaveBackend, naming: &'a SlotNaming, max_slot: u32) -> Self {
        SaveCatalog {
            backend,
            naming,
            max_slot,
        }
    }

    /// Existing slots of a target, ascending by slot number.
    ///
    /// Names whose slot field does not parse or lies outside `0..=max_slot`
    /// are discarded. The files themselves are not opened or validated;
    /// that is the codec's job.
    pub fn list_slots(&self, target: &str) -> SaveResult<Vec<(u32, String)>> {
        let names = self.backend.list(&self.naming.pattern(target))?;
        let mut slots = Vec::with_capacity(names.len());
        for name in names {
            match self.naming.parse_slot(target, &name) {
                Some(slot) if slot <= self.max_slot => slots.push((slot, name)),
                Some(slot) => {
                    log::debug!("ignoring save '{name}': slot {slot} above limit {}", self.max_slot)
                }
                None => log::debug!("ignoring malformed save name '{name}'"),
            }
        }
        slots.sort_by_key(|(slot, _)| *slot);
        Ok(slots)
    }

    /// Removes a slot's blob. Absent slots are a no-op returning `false`.
    pub fn delete_slot(&self, target: &str, slot: u32) -> SaveResult<bool> {
        self.check_slot(slot)?;
        self.backend.remove(&self.naming.blob_name(target, slot))
    }

    /// Moves a record between two slots of the same target.
    pub fn rename_slot(&self, target: &str, from: u32, to: u32) -> SaveResult<bool> {
        self.check_slot(from)?;
        self.check_slot(to)?;
        self.backend.rename(
            &self.naming.blob_name(target, from),
            &self.naming.blob_name(target, to),
        )
    }

    pub(crate) fn check_slot(&self, slot: u32) -> SaveResult<()> {
        if slot > self.max_slot {
            return Err(SaveError::SlotOutOfRange {
                slot,
                max: self.max_slot,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/slots_tests.rs"]
mod tests;
