//! Outline files: JSON snapshots loaded into an in-memory host.

use std::path::Path;

use anyhow::{Context, Result};

use hydra_blocks::{MemoryHost, OutlineSnapshot};

/// Parse an outline JSON file.
pub fn read_snapshot(path: &Path) -> Result<OutlineSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading outline {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing outline {}", path.display()))
}

/// Load an outline file into a fresh host.
pub fn load_host(path: &Path) -> Result<MemoryHost> {
    let snapshot = read_snapshot(path)?;
    let host = MemoryHost::from_snapshot(&snapshot)
        .with_context(|| format!("building host from {}", path.display()))?;
    tracing::debug!(documents = host.len(), path = %path.display(), "outline loaded");
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_types::{BlockId, DocumentId, SourceRef};
    use hydra_blocks::{BlockHandle, BlockHost, TreeBlock};
    use std::io::Write;

    #[test]
    fn test_load_host() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"documents": [{{"id": "notes", "blocks": [
                {{"id": "fruit", "text": "Fruit", "children": [
                    {{"text": "What", "flavour": "hydra:descriptor"}},
                    {{"id": "apple", "text": "Apple", "expanded": false}}
                ]}}
            ]}}]}}"#
        )
        .unwrap();

        let host = load_host(file.path()).unwrap();
        assert_eq!(host.document_ids(), vec![DocumentId::new("notes")]);
        let apple = host.resolve_block(&SourceRef::new("notes", "apple")).unwrap();
        assert_eq!(apple.text(), "Apple");
        assert!(!apple.is_expanded());

        let fruit = host.resolve_block(&SourceRef::new("notes", BlockId::new("fruit"))).unwrap();
        assert_eq!(fruit.children().len(), 2);
    }

    #[test]
    fn test_bad_json_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = load_host(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing outline"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_host(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("reading outline"));
    }
}
