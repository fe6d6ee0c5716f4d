use crate::domain::csv::ImportSettings;
use crate::domain::error::{AppError, Result};
use crate::domain::upload::UploadedFile;

pub const MISSING_FILE_MESSAGE: &str = "Please select csv file to upload.";
pub const WRONG_EXTENSION_MESSAGE: &str = "Please select csv extension to upload.";

/// Checks an upload before any pipeline step runs
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl UploadValidator {
    pub fn new(allowed_extensions: Vec<String>, max_bytes: u64) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_bytes,
        }
    }

    pub fn from_settings(settings: &ImportSettings) -> Self {
        Self::new(
            settings.allowed_extensions.clone(),
            settings.max_upload_bytes,
        )
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// `None` means the form field was left empty
    pub fn check_name(&self, file_name: Option<&str>) -> Result<()> {
        let file_name = match file_name.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(AppError::ValidationError(MISSING_FILE_MESSAGE.to_string())),
        };

        let candidate = UploadedFile::new(file_name, Vec::new());
        match candidate.extension() {
            Some(ext)
                if self
                    .allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext)) =>
            {
                Ok(())
            }
            _ => Err(AppError::ValidationError(
                WRONG_EXTENSION_MESSAGE.to_string(),
            )),
        }
    }

    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(AppError::ValidationError(format!(
                "The file is {} bytes exceeding the maximum file size of {} bytes.",
                size, self.max_bytes
            )));
        }
        Ok(())
    }

    pub fn validate(&self, upload: &UploadedFile) -> Result<()> {
        self.check_name(Some(&upload.file_name))?;
        self.check_size(upload.size())
    }
}
