// ============================================================
// IMPORT SETTINGS
// ============================================================
// Configuration values for upload checks, parsing and storage shape

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::projection::{is_sql_identifier, Projection};
use crate::domain::error::{AppError, Result};

/// Settings for one import target
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImportSettings {
    /// Table rows are inserted into (default: batch_upload_csv)
    #[validate(length(min = 1, max = 63))]
    pub table: String,

    /// Header names that are kept; every other column is dropped
    #[validate(length(min = 1))]
    pub recognized_fields: Vec<String>,

    /// Storage shape derived from the recognized fields.
    /// Skipped when default so a configured projection replaces it instead of merging.
    #[serde(skip_serializing_if = "Projection::is_default")]
    pub projection: Projection,

    /// Upper bound on the uploaded file size (default: 1,000,000 bytes)
    #[validate(range(min = 1, max = 100_000_000))]
    pub max_upload_bytes: u64,

    /// Accepted file extensions, compared case-insensitively
    #[validate(length(min = 1))]
    pub allowed_extensions: Vec<String>,

    /// Field delimiter (default: comma)
    pub delimiter: char,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            table: "batch_upload_csv".to_string(),
            recognized_fields: vec!["first_name".to_string(), "last_name".to_string()],
            projection: Projection::full_name(),
            max_upload_bytes: 1_000_000,
            allowed_extensions: vec!["csv".to_string()],
            delimiter: ',',
        }
    }
}

impl ImportSettings {
    /// Validate field constraints plus the cross-field rules
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid import settings: {}", e)))?;

        if !is_sql_identifier(&self.table) {
            return Err(AppError::ValidationError(format!(
                "Table name '{}' is not a valid identifier",
                self.table
            )));
        }

        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(AppError::ValidationError(format!(
                "Delimiter {:?} is not supported",
                self.delimiter
            )));
        }

        self.projection.validate(&self.recognized_fields)
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}
