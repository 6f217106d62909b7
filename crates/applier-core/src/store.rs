//! Persistent mapping from local identifiers to remote identifiers.
//!
//! The store is what lets a group be renamed remotely without being
//! recreated: once a local identifier is pinned to a remote id, the
//! remote-visible name is no longer used to find the group.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::{ApplierError, Result};
use crate::remote::RemoteId;

/// On-disk layout of the store.
///
/// Top-level keys other than the ones below are kept as they are, so a store
/// written by a build that knows more entity collections survives a pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    groups: IndexMap<String, RemoteId>,
    /// Last applied configuration, for debugging only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    applied_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

/// Identity mappings for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
    document: StoreDocument,
}

impl IdentityStore {
    /// Loads the store at `path`.
    ///
    /// A missing file is a first run and yields an empty store. The directory
    /// holding the file, however, must already exist.
    ///
    /// # Errors
    ///
    /// Returns `ApplierError::Precondition` if the parent directory is missing
    /// and `ApplierError::Store` if the file cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!(path = %path.display(), "Loading identity mappings");

        match fs::read_to_string(&path) {
            Ok(content) => {
                let document: StoreDocument = serde_json::from_str(&content)
                    .map_err(|e| ApplierError::store(&path, format!("cannot parse: {e}")))?;
                Ok(Self { path, document })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let directory = parent_dir(&path);
                if !directory.is_dir() {
                    return Err(ApplierError::precondition(directory));
                }
                info!(
                    path = %path.display(),
                    "Identity mappings file not found, starting with an empty store"
                );
                Ok(Self {
                    path,
                    document: StoreDocument::default(),
                })
            }
            Err(e) => Err(ApplierError::store(&path, format!("cannot read: {e}"))),
        }
    }

    /// Loads `<data_dir>/<file_name>`.
    pub fn open_in(data_dir: impl AsRef<Path>, file_name: &str) -> Result<Self> {
        Self::load(data_dir.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The remote id pinned to `local_id`, if any.
    #[must_use]
    pub fn get(&self, local_id: &str) -> Option<&RemoteId> {
        self.document.groups.get(local_id)
    }

    /// Pins `local_id` to `remote_id`, replacing any earlier mapping.
    ///
    /// Passing `None` leaves the store untouched; a mapping to nothing is never
    /// recorded. Returns the previous mapping.
    pub fn set(
        &mut self,
        local_id: impl Into<String>,
        remote_id: impl Into<Option<RemoteId>>,
    ) -> Option<RemoteId> {
        let remote_id = remote_id.into()?;
        self.document.groups.insert(local_id.into(), remote_id)
    }

    /// The local identifier currently pinned to `remote_id`.
    #[must_use]
    pub fn owner_of(&self, remote_id: &RemoteId) -> Option<&str> {
        self.document
            .groups
            .iter()
            .find(|(_, id)| *id == remote_id)
            .map(|(local_id, _)| local_id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemoteId)> {
        self.document
            .groups
            .iter()
            .map(|(local_id, remote_id)| (local_id.as_str(), remote_id))
    }

    pub fn len(&self) -> usize {
        self.document.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.groups.is_empty()
    }

    /// Configuration applied by the last persist, if it was recorded.
    pub fn last_config(&self) -> Option<&Value> {
        self.document.config.as_ref()
    }

    pub fn applied_at(&self) -> Option<OffsetDateTime> {
        self.document.applied_at
    }

    /// Writes the store back to its file.
    ///
    /// `snapshot` is stored next to the mappings for postmortem use. Without
    /// one, any earlier snapshot is dropped so the file never pairs an old
    /// configuration with a new `applied_at`. The file is replaced
    /// atomically: a crash mid-write leaves the previous store in place.
    pub fn persist(&mut self, snapshot: Option<&Value>) -> Result<()> {
        debug!(path = %self.path.display(), entries = self.len(), "Saving identity mappings");
        self.document.config = snapshot.cloned();
        self.document.applied_at = Some(OffsetDateTime::now_utc());

        let mut payload = serde_json::to_string_pretty(&self.document)
            .map_err(|e| ApplierError::store(&self.path, format!("cannot serialize: {e}")))?;
        payload.push('\n');
        write_atomic(&self.path, payload.as_bytes())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Writes `bytes` to a temp file beside `path`, then renames it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let directory = parent_dir(path);
    if !directory.is_dir() {
        return Err(ApplierError::precondition(directory));
    }

    let mut temp = tempfile::NamedTempFile::new_in(directory)
        .map_err(|e| ApplierError::store(path, format!("cannot create temp file: {e}")))?;
    temp.write_all(bytes)
        .map_err(|e| ApplierError::store(path, format!("cannot write: {e}")))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ApplierError::store(path, format!("cannot sync: {e}")))?;
    temp.persist(path)
        .map_err(|e| ApplierError::store(path, format!("cannot replace: {}", e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FILE: &str = "nix_to_discourse_ids.json";

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::open_in(dir.path(), FILE).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.get("admins"), None);
        assert!(!dir.path().join(FILE).exists());
    }

    #[test]
    fn missing_directory_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");

        let err = IdentityStore::open_in(&missing, FILE).unwrap_err();

        assert!(matches!(err, ApplierError::Precondition { ref directory } if *directory == missing));
        assert!(!missing.exists());
    }

    #[test]
    fn set_overwrites_and_ignores_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();

        assert_eq!(store.set("admins", RemoteId::from(1)), None);
        assert_eq!(store.set("admins", RemoteId::from(2)), Some(RemoteId::from(1)));
        assert_eq!(store.set("admins", None::<RemoteId>), None);

        assert_eq!(store.get("admins"), Some(&RemoteId::from(2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        store.persist(None).unwrap();

        let reloaded = IdentityStore::open_in(dir.path(), FILE).unwrap();
        assert!(reloaded.is_empty());
        assert!(reloaded.applied_at().is_some());
    }

    #[test]
    fn two_entries_round_trip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        store.set("admins", RemoteId::from(41));
        store.set("students", RemoteId::from("grp-students"));
        store.persist(None).unwrap();

        let reloaded = IdentityStore::open_in(dir.path(), FILE).unwrap();
        let entries: Vec<(&str, &RemoteId)> = reloaded.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("admins", &RemoteId::from(41)),
                ("students", &RemoteId::from("grp-students")),
            ]
        );
    }

    #[test]
    fn snapshot_is_written_under_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        store.set("students", RemoteId::from(7));
        let snapshot = json!({"groups": {"students": {"name": "students"}}});
        store.persist(Some(&snapshot)).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(FILE)).unwrap()).unwrap();
        assert_eq!(raw["groups"], json!({"students": 7}));
        assert_eq!(raw["config"]["groups"]["students"]["name"], "students");

        let reloaded = IdentityStore::open_in(dir.path(), FILE).unwrap();
        assert_eq!(reloaded.last_config(), Some(&snapshot));
    }

    #[test]
    fn unknown_collections_survive_a_persist() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(FILE),
            r#"{"groups": {"admins": 3}, "categories": {"general": 12}}"#,
        )
        .unwrap();

        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        store.persist(None).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(FILE)).unwrap()).unwrap();
        assert_eq!(raw["categories"], json!({"general": 12}));
        assert_eq!(raw["groups"], json!({"admins": 3}));
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE), "{not json").unwrap();

        let err = IdentityStore::open_in(dir.path(), FILE).unwrap_err();
        assert!(matches!(err, ApplierError::Store { .. }));
    }

    #[test]
    fn persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        store.set("admins", RemoteId::from(1));
        store.persist(None).unwrap();
        store.set("admins", RemoteId::from(2));
        store.persist(None).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![FILE.to_string()]);
    }

    #[test]
    fn persisting_without_snapshot_drops_the_old_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        assert_eq!(store.path(), dir.path().join(FILE));

        store.set("a", RemoteId::from(1));
        store
            .persist(Some(&json!({"groups": {"a": {"name": "one"}}})))
            .unwrap();
        store.persist(None).unwrap();

        let reloaded = IdentityStore::open_in(dir.path(), FILE).unwrap();
        assert!(reloaded.last_config().is_none());
        assert!(reloaded.applied_at().is_some());
        assert_eq!(reloaded.get("a"), Some(&RemoteId::from(1)));
    }

    #[test]
    fn owner_of_finds_reverse_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IdentityStore::open_in(dir.path(), FILE).unwrap();
        store.set("admins", RemoteId::from(1));
        store.set("students", RemoteId::from(2));

        assert_eq!(store.owner_of(&RemoteId::from(2)), Some("students"));
        assert_eq!(store.owner_of(&RemoteId::from(3)), None);
    }
}
