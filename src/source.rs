//! Legacy source tree layout
//!
//! The source repository is a content-addressed file tree keyed by the short
//! item id (see [`crate::domain::item::short_id`]), sharded by the id's
//! first two characters. Each item directory holds the metadata document,
//! the primary document under `content/`, extracted text alongside it, and
//! supplemental files under `supp/`.

use std::path::{Path, PathBuf};

pub struct SourceLayout {
    root: PathBuf,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn item_dir(&self, id: &str) -> PathBuf {
        let shard = &id[..id.len().min(2)];
        self.root.join(shard).join(id)
    }

    pub fn metadata_path(&self, id: &str) -> PathBuf {
        self.item_dir(id).join("meta.xml")
    }

    /// Extracted full text of the primary document, when the external text
    /// extraction step has produced one.
    pub fn text_path(&self, id: &str) -> PathBuf {
        self.item_dir(id).join("content").join(format!("{}.txt", id))
    }

    pub fn content_path(&self, id: &str, file: &str) -> PathBuf {
        self.item_dir(id).join(file)
    }

    /// True when a primary document is discoverable on disk, independent of
    /// what the metadata claims.
    pub fn has_primary(&self, id: &str) -> bool {
        let dir = self.item_dir(id).join("content");
        match std::fs::read_dir(&dir) {
            Ok(mut entries) => entries.any(|e| {
                e.map(|e| e.path().extension().map_or(false, |x| x == "pdf"))
                    .unwrap_or(false)
            }),
            Err(_) => false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_shard_by_id_prefix() {
        let layout = SourceLayout::new("/data/repo");
        assert_eq!(
            layout.metadata_path("qt8h29m6f2"),
            PathBuf::from("/data/repo/qt/qt8h29m6f2/meta.xml")
        );
    }

    #[test]
    fn primary_discovery_checks_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SourceLayout::new(dir.path());
        assert!(!layout.has_primary("qt0001"));

        let content = layout.item_dir("qt0001").join("content");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("qt0001.pdf"), b"%PDF-1.4").unwrap();
        assert!(layout.has_primary("qt0001"));
    }
}
