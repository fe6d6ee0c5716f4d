use sha2::{Digest, Sha256};

/// File handed over by the upload form, already read into memory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Extension after the last dot, as the client sent it
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name.rsplit(['/', '\\']).next().unwrap_or("");
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// SHA-256 of the content, used to spot a second run of the same file
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(UploadedFile::new("people.CSV", "").extension(), Some("CSV"));
        assert_eq!(UploadedFile::new("C:\\tmp\\a.b.csv", "").extension(), Some("csv"));
        assert_eq!(UploadedFile::new("people", "").extension(), None);
        assert_eq!(UploadedFile::new(".csv", "").extension(), None);
    }

    #[test]
    fn test_fingerprint_depends_on_content_only() {
        let a = UploadedFile::new("a.csv", "first_name\nAnn\n");
        let b = UploadedFile::new("b.csv", "first_name\nAnn\n");
        let c = UploadedFile::new("a.csv", "first_name\nBo\n");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
