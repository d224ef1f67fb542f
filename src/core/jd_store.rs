use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use super::errors::CoreError;
use super::models::JobDescriptionEntry;
use super::naming;

const ACCEPTED_EXTENSIONS: [&str; 2] = ["pdf", "docx"];

/// Directory of uploaded job description documents.
pub struct JobDescriptionStore {
    root: PathBuf,
}

impl JobDescriptionStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Stores an upload under its normalized name, replacing an earlier upload
    /// with the same name. Returns the stored file name.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let base = Path::new(original_name)
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = naming::normalize_filename(&base);

        if !has_accepted_extension(&file_name) {
            return Err(CoreError::InvalidRequest(format!(
                "job descriptions must be PDF or DOCX files, got {original_name:?}"
            ))
            .into());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        let path = self.root.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!(file = %file_name, bytes = bytes.len(), "stored job description");
        Ok(file_name)
    }

    pub async fn list(&self) -> anyhow::Result<Vec<JobDescriptionEntry>> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.metadata().await?.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            if !has_accepted_extension(&file_name) {
                continue;
            }

            entries.push(JobDescriptionEntry {
                display_name: naming::display_name(&file_name),
                path: entry.path(),
                file_name,
            });
        }

        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    pub async fn resolve(&self, file_name: &str) -> anyhow::Result<PathBuf> {
        let is_plain_name = Path::new(file_name)
            .file_name()
            .map(|v| v == file_name)
            .unwrap_or(false);
        if !is_plain_name {
            return Err(CoreError::InvalidRequest(format!(
                "{file_name:?} is not a job description file name"
            ))
            .into());
        }

        let path = self.root.join(file_name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CoreError::JobDescriptionNotFound(file_name.to_string()).into());
        }

        Ok(path)
    }
}

fn has_accepted_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|v| v.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_normalizes_name_and_lists_sorted() {
        let temp = tempfile::tempdir().unwrap();
        let store = JobDescriptionStore::new(temp.path().join("JDs"));

        let stored = store
            .save_upload("Senior Engineer.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert_eq!(stored, "Senior_Engineer.pdf");
        store.save_upload("Backend Lead.docx", b"PK").await.unwrap();
        std::fs::write(temp.path().join("JDs").join("notes.txt"), "ignored").unwrap();

        let listed = store.list().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["Backend_Lead.docx", "Senior_Engineer.pdf"]);
        assert_eq!(listed[1].display_name, "Senior Engineer");
    }

    #[tokio::test]
    async fn upload_rejects_other_file_types() {
        let temp = tempfile::tempdir().unwrap();
        let store = JobDescriptionStore::new(temp.path().to_path_buf());
        assert!(store.save_upload("resume.exe", b"MZ").await.is_err());
    }

    #[tokio::test]
    async fn resolve_rejects_traversal_and_missing_files() {
        let temp = tempfile::tempdir().unwrap();
        let store = JobDescriptionStore::new(temp.path().to_path_buf());

        let traversal = store.resolve("../secrets.pdf").await.unwrap_err();
        assert!(matches!(
            traversal.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidRequest(_))
        ));

        let missing = store.resolve("Nope.pdf").await.unwrap_err();
        assert!(matches!(
            missing.downcast_ref::<CoreError>(),
            Some(CoreError::JobDescriptionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_of_missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let store = JobDescriptionStore::new(temp.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
