//! Files and directories under an output root.

use std::path::{Path, PathBuf};

use crate::identity::ProfileKey;

const PROFILES_LOG: &str = "gs_profiles.jsonl";
const RESULTS_LOG: &str = "gs_result.jsonl";
const PDF_DIR: &str = "gs_pdfs";
const HTML_DIR: &str = "gs_htmls";
const LOCK_FILE: &str = ".scholar.lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn profiles_log(&self) -> PathBuf {
        self.root.join(PROFILES_LOG)
    }

    pub fn results_log(&self) -> PathBuf {
        self.root.join(RESULTS_LOG)
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join(PDF_DIR)
    }

    pub fn html_dir(&self) -> PathBuf {
        self.root.join(HTML_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn pdf_snapshot(&self, key: &ProfileKey) -> PathBuf {
        self.pdf_dir().join(format!("profile_{key}.pdf"))
    }

    pub fn html_snapshot(&self, key: &ProfileKey) -> PathBuf {
        self.html_dir().join(format!("profile_{key}.html"))
    }

    /// Sibling of the profile log carrying a version suffix.
    pub fn versioned_profiles_log(&self, suffix: &str) -> PathBuf {
        self.root.join(format!("gs_profiles_{suffix}.jsonl"))
    }

    /// Create the root and snapshot directories.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir_all(self.pdf_dir()).await?;
        tokio::fs::create_dir_all(self.html_dir()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_paths_follow_key() {
        let layout = OutputLayout::new("/data/out");
        let key = ProfileKey::from_reference("/citations?user=K1").unwrap();

        assert_eq!(
            layout.pdf_snapshot(&key),
            PathBuf::from("/data/out/gs_pdfs/profile_K1.pdf")
        );
        assert_eq!(
            layout.html_snapshot(&key),
            PathBuf::from("/data/out/gs_htmls/profile_K1.html")
        );
        assert_eq!(
            layout.versioned_profiles_log("20240101120000"),
            PathBuf::from("/data/out/gs_profiles_20240101120000.jsonl")
        );
    }

    #[tokio::test]
    async fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("nested/out"));

        layout.ensure_dirs().await.unwrap();

        assert!(layout.pdf_dir().is_dir());
        assert!(layout.html_dir().is_dir());
    }
}
