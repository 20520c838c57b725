//! Disk-backed bucket for certificate-template files. Objects live under
//! `<root>/public/<timestamp>-<filename>`, mirroring the path scheme the
//! rest of the system stores in `templates.file_path`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::AppError;

#[derive(Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bucket-relative object path for a fresh upload. The original file
    /// name is kept, prefixed with a millisecond timestamp to avoid
    /// collisions; path separators are stripped so an upload cannot climb
    /// out of the bucket.
    pub fn object_path(filename: &str, timestamp_millis: i64) -> String {
        let safe_name: String = filename
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("public/{}-{}", timestamp_millis, safe_name)
    }

    fn absolute(&self, object_path: &str) -> PathBuf {
        self.root.join(object_path)
    }

    pub fn save(&self, object_path: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.absolute(object_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn read(&self, object_path: &str) -> Result<Vec<u8>, AppError> {
        let path = self.absolute(object_path);
        if !path.exists() {
            return Err(AppError::not_found("Stored template file is missing"));
        }
        Ok(fs::read(path)?)
    }

    pub fn delete(&self, object_path: &str) -> Result<(), AppError> {
        fs::remove_file(self.absolute(object_path))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Content type for a stored template download, by file extension.
pub fn content_type_for(object_path: &str) -> &'static str {
    match Path::new(object_path)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> TemplateStore {
        let dir = std::env::temp_dir().join(format!("bonafide-store-{}", uuid::Uuid::new_v4()));
        TemplateStore::new(dir)
    }

    #[test]
    fn object_paths_are_bucket_relative_and_timestamped() {
        assert_eq!(
            TemplateStore::object_path("seal.pdf", 1722945600000),
            "public/1722945600000-seal.pdf"
        );
    }

    #[test]
    fn path_separators_in_filenames_are_neutralized() {
        let path = TemplateStore::object_path("../../etc/passwd", 1);
        assert!(!path.contains(".."), "{}", path);
        assert!(path.starts_with("public/1-"));
    }

    #[test]
    fn save_read_delete_cycle() {
        let store = scratch_store();
        let object = TemplateStore::object_path("note.html", 42);

        store.save(&object, b"<p>hi</p>").unwrap();
        assert_eq!(store.read(&object).unwrap(), b"<p>hi</p>");

        store.delete(&object).unwrap();
        claim::assert_err!(store.read(&object));

        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn content_types_cover_the_template_kinds() {
        assert_eq!(content_type_for("public/1-a.pdf"), "application/pdf");
        assert_eq!(
            content_type_for("public/1-a.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(content_type_for("public/1-a.bin"), "application/octet-stream");
    }
}
