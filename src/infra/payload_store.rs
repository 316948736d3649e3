use crate::app::ports::{PayloadKind, PayloadStorePort};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem raw store: `<root>/match/<id>.json`, `<root>/timeline/<id>.json`.
///
/// Writes go to a temporary sibling and are renamed into place, so a payload
/// is either fully present or absent after an interrupted run.
pub struct FsPayloadStore {
    root: PathBuf,
}

impl FsPayloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, kind: PayloadKind, id: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(format!("{}.json", id))
    }
}

/// Identifiers become file names; reject anything that could escape the store.
pub fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl PayloadStorePort for FsPayloadStore {
    async fn contains(&self, kind: PayloadKind, id: &str) -> bool {
        tokio::fs::metadata(self.path_for(kind, id))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn get(&self, kind: PayloadKind, id: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(kind, id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put(&self, kind: PayloadKind, id: &str, bytes: &[u8]) -> io::Result<()> {
        if !is_valid_identifier(id) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid identifier '{}'", id),
            ));
        }
        let path = self.path_for(kind, id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await
    }

    async fn list_ids(&self, kind: PayloadKind) -> io::Result<Vec<String>> {
        let dir = self.root.join(kind.dir_name());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_and_list() {
        let dir = tempdir().unwrap();
        let store = FsPayloadStore::new(dir.path());

        assert!(!store.contains(PayloadKind::Match, "EUW1_2").await);
        store.put(PayloadKind::Match, "EUW1_2", b"{}").await.unwrap();
        store.put(PayloadKind::Match, "EUW1_1", b"{\"a\":1}").await.unwrap();
        store.put(PayloadKind::Timeline, "EUW1_1", b"{}").await.unwrap();

        assert!(store.contains(PayloadKind::Match, "EUW1_2").await);
        assert!(!store.contains(PayloadKind::Timeline, "EUW1_2").await);
        assert_eq!(
            store.get(PayloadKind::Match, "EUW1_1").await.unwrap(),
            Some(b"{\"a\":1}".to_vec())
        );
        assert_eq!(store.get(PayloadKind::Match, "EUW1_9").await.unwrap(), None);
        assert_eq!(
            store.list_ids(PayloadKind::Match).await.unwrap(),
            vec!["EUW1_1".to_string(), "EUW1_2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_list_ignores_partial_writes() {
        let dir = tempdir().unwrap();
        let match_dir = dir.path().join("match");
        std::fs::create_dir_all(&match_dir).unwrap();
        std::fs::write(match_dir.join("EUW1_5.json.tmp"), b"{").unwrap();

        let store = FsPayloadStore::new(dir.path());
        assert!(store.list_ids(PayloadKind::Match).await.unwrap().is_empty());
        assert!(!store.contains(PayloadKind::Match, "EUW1_5").await);
    }

    #[tokio::test]
    async fn test_rejects_path_like_identifier() {
        let dir = tempdir().unwrap();
        let store = FsPayloadStore::new(dir.path());
        let err = store.put(PayloadKind::Match, "../escape", b"{}").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("NA1_4938201"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a/b"));
        assert!(!is_valid_identifier("a b"));
    }
}
