//! Data-quality patches for known malformed supplier records.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Replaces the first occurrence of `find` in the raw title with `replace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleCorrection {
    pub find: String,
    pub replace: String,
}

/// Overrides structured dimension fields that the supplier sends wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionOverride {
    pub width: Option<String>,
    pub aspect_ratio: Option<String>,
    pub rim_diameter_inches: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub external_id: String,
    pub title_correction: Option<TitleCorrection>,
    pub dimension_override: Option<DimensionOverride>,
    pub notes: Option<String>,
}

impl RecordPatch {
    /// Applies the title correction, if any, returning the patched title.
    #[must_use]
    pub fn patch_title(&self, title: &str) -> String {
        match &self.title_correction {
            Some(c) => title.replacen(&c.find, &c.replace, 1),
            None => title.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordPatchesFile {
    #[serde(default)]
    patches: Vec<RecordPatch>,
}

/// Lookup table of patches keyed by supplier external id.
#[derive(Debug, Clone, Default)]
pub struct RecordPatches {
    by_id: HashMap<String, RecordPatch>,
}

impl RecordPatches {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from already-validated patches.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` on duplicate ids or empty find strings.
    pub fn from_patches(patches: Vec<RecordPatch>) -> Result<Self, ConfigError> {
        validate_patches(&patches)?;
        let by_id = patches
            .into_iter()
            .map(|p| (p.external_id.trim().to_string(), p))
            .collect();
        Ok(Self { by_id })
    }

    #[must_use]
    pub fn get(&self, external_id: &str) -> Option<&RecordPatch> {
        self.by_id.get(external_id.trim())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Load and validate the record patch table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_record_patches(path: &Path) -> Result<RecordPatches, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PatchesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_record_patches(&content)
}

fn parse_record_patches(content: &str) -> Result<RecordPatches, ConfigError> {
    let file: RecordPatchesFile =
        serde_yaml::from_str(content).map_err(ConfigError::PatchesFileParse)?;
    RecordPatches::from_patches(file.patches)
}

fn validate_patches(patches: &[RecordPatch]) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for patch in patches {
        let id = patch.external_id.trim();
        if id.is_empty() {
            return Err(ConfigError::Validation(
                "patch external_id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(id.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate patch for external_id '{id}'"
            )));
        }

        if let Some(correction) = &patch.title_correction {
            if correction.find.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "patch '{id}' has an empty title_correction.find"
                )));
            }
        }

        if patch.title_correction.is_none() && patch.dimension_override.is_none() {
            return Err(ConfigError::Validation(format!(
                "patch '{id}' changes nothing"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "patches_test.rs"]
mod tests;
