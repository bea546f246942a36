//! JSON document backend.
//!
//! Each record kind lives in its own document (`fit_tracker.json`,
//! `plans.json`, `wishlist.json`): an object keyed by the stringified user id
//! holding that user's records in insertion order.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::AssistantError;
use crate::models::{FitEntry, PlanEntry, WishlistEntry};
use crate::storage::{Storage, StorageResult};

pub const FIT_TRACKER_FILE: &str = "fit_tracker.json";
pub const PLANS_FILE: &str = "plans.json";
pub const WISHLIST_FILE: &str = "wishlist.json";

type Document<T> = BTreeMap<String, Vec<T>>;

/// Records whose owner is stored as the document key rather than inline
trait UserRecord: Serialize + DeserializeOwned + Send {
    fn set_user_id(&mut self, user_id: i64);
}

impl UserRecord for FitEntry {
    fn set_user_id(&mut self, user_id: i64) {
        self.user_id = user_id;
    }
}

impl UserRecord for PlanEntry {
    fn set_user_id(&mut self, user_id: i64) {
        self.user_id = user_id;
    }
}

impl UserRecord for WishlistEntry {
    fn set_user_id(&mut self, user_id: i64) {
        self.user_id = user_id;
    }
}

/// Write `bytes` to a temp file in `dir`, then rename it over `path`
fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.as_file_mut().write_all(bytes)?;
    temp_file.as_file_mut().sync_all()?;
    temp_file
        .persist(path)
        .map_err(|e| AssistantError::from(e.error))?;
    Ok(())
}

/// File-backed document storage
pub struct JsonStore {
    dir: PathBuf,
    /// Held across every load-append-write cycle
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open (and create if needed) the document directory
    pub async fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        info!(data_dir = %dir.display(), "JSON document storage ready");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Parse `file` without attaching user ids; missing or blank reads as empty
    async fn read_document<T: DeserializeOwned + Send>(&self, file: &str) -> StorageResult<Document<T>> {
        let path = self.path_of(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn load<T: UserRecord>(&self, file: &str) -> StorageResult<Document<T>> {
        let mut document = self.read_document::<T>(file).await?;
        for (key, records) in document.iter_mut() {
            let user_id = key.parse::<i64>().map_err(|_| {
                AssistantError::Persistence(format!("corrupt document {file}: bad user key '{key}'"))
            })?;
            for record in records.iter_mut() {
                record.set_user_id(user_id);
            }
        }
        Ok(document)
    }

    /// Replace `file` atomically: readers see either the old or the new
    /// document, never a partial write
    async fn store<T: UserRecord>(&self, file: &str, document: &Document<T>) -> StorageResult<()> {
        let mut bytes = serde_json::to_vec_pretty(document)?;
        bytes.push(b'\n');
        let dir = self.dir.clone();
        let path = self.path_of(file);

        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &bytes))
            .await
            .map_err(|e| AssistantError::Persistence(format!("document write task failed: {e}")))?
    }

    async fn append<T: UserRecord>(&self, file: &str, user_id: i64, record: T) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load::<T>(file).await?;
        document.entry(user_id.to_string()).or_default().push(record);
        self.store(file, &document).await?;
        debug!(user_id, file, "Appended record to document");
        Ok(())
    }

    async fn records_of<T: UserRecord>(&self, file: &str, user_id: i64) -> StorageResult<Vec<T>> {
        // Writes replace files atomically, so reads skip the lock.
        let mut document = self.load::<T>(file).await?;
        Ok(document.remove(&user_id.to_string()).unwrap_or_default())
    }
}

#[async_trait]
impl Storage for JsonStore {
    async fn add_fit_entry(&self, entry: &FitEntry) -> StorageResult<()> {
        self.append(FIT_TRACKER_FILE, entry.user_id, entry.clone()).await
    }

    async fn fit_entries_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<FitEntry>> {
        let mut entries: Vec<FitEntry> = self
            .records_of::<FitEntry>(FIT_TRACKER_FILE, user_id)
            .await?
            .into_iter()
            .filter(|entry| entry.date >= start && entry.date <= end)
            .collect();
        entries.sort_by_key(|entry| entry.date);
        Ok(entries)
    }

    async fn add_plan(&self, plan: &PlanEntry) -> StorageResult<()> {
        self.append(PLANS_FILE, plan.user_id, plan.clone()).await
    }

    async fn plans_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<PlanEntry>> {
        let mut plans: Vec<PlanEntry> = self
            .records_of::<PlanEntry>(PLANS_FILE, user_id)
            .await?
            .into_iter()
            .filter(|plan| plan.date >= start && plan.date <= end)
            .collect();
        plans.sort_by_key(|plan| (plan.date, plan.time));
        Ok(plans)
    }

    async fn plans_on(&self, date: NaiveDate) -> StorageResult<Vec<PlanEntry>> {
        // Records are decoded one by one so a corrupt plan only costs its owner
        let document = self.read_document::<serde_json::Value>(PLANS_FILE).await?;

        let mut plans = Vec::new();
        for (key, records) in document {
            let Ok(user_id) = key.parse::<i64>() else {
                warn!(key = %key, "Skipping plans under a bad user key");
                continue;
            };
            for record in records {
                match serde_json::from_value::<PlanEntry>(record) {
                    Ok(mut plan) if plan.date == date => {
                        plan.user_id = user_id;
                        plans.push(plan);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(user_id, error = %e, "Skipping corrupt plan record"),
                }
            }
        }
        Ok(plans)
    }

    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> StorageResult<()> {
        self.append(WISHLIST_FILE, entry.user_id, entry.clone()).await
    }

    async fn wishlist(&self, user_id: i64) -> StorageResult<Vec<WishlistEntry>> {
        self.records_of(WISHLIST_FILE, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FitReading, PlanTime};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn lamp(user_id: i64) -> WishlistEntry {
        WishlistEntry {
            user_id,
            link: "http://x".to_string(),
            title: "Lamp".to_string(),
            category: "Home".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_documents_read_as_empty() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;

        assert!(store.wishlist(1).await?.is_empty());
        assert!(store.plans_on(day(17)).await?.is_empty());
        assert!(store.fit_entries_between(1, day(1), day(31)).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_document_layout_is_keyed_by_user_id() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;

        store.add_wishlist_entry(&lamp(42)).await?;

        let raw = std::fs::read_to_string(store.path_of(WISHLIST_FILE))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(
            value,
            serde_json::json!({"42": [{"link": "http://x", "title": "Lamp", "category": "Home"}]})
        );

        let entries = store.wishlist(42).await?;
        assert_eq!(entries, vec![lamp(42)]);

        Ok(())
    }

    #[tokio::test]
    async fn test_fit_entries_between() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;

        store.add_fit_entry(&FitEntry::from_reading(1, day(14), FitReading::Calories(300))).await?;
        store.add_fit_entry(&FitEntry::from_reading(1, day(12), FitReading::Steps(5000))).await?;
        store.add_fit_entry(&FitEntry::from_reading(1, day(25), FitReading::Steps(1))).await?;

        let rows = store.fit_entries_between(1, day(12), day(18)).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(12));
        assert_eq!(rows[0].user_id, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_plans_on_collects_every_user() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;

        for (user_id, date) in [(1, day(17)), (2, day(17)), (2, day(18))] {
            store
                .add_plan(&PlanEntry {
                    user_id,
                    date,
                    text: "Plan".to_string(),
                    time: PlanTime::Unscheduled,
                })
                .await?;
        }

        let mut users: Vec<_> = store.plans_on(day(17)).await?.iter().map(|p| p.user_id).collect();
        users.sort();
        assert_eq!(users, vec![1, 2]);

        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_document_is_persistence_error() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;
        std::fs::write(store.path_of(WISHLIST_FILE), "{not json")?;

        let result = store.wishlist(1).await;
        assert!(matches!(result, Err(AssistantError::Persistence(_))));

        // A failed append leaves the corrupt document untouched
        let result = store.add_wishlist_entry(&lamp(1)).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(store.path_of(WISHLIST_FILE))?, "{not json");

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = Arc::new(JsonStore::open(dir.path()).await?);

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut entry = lamp(7);
                entry.title = format!("Item {i}");
                store.add_wishlist_entry(&entry).await
            }));
        }
        for handle in handles {
            handle.await.expect("append task panicked")?;
        }

        assert_eq!(store.wishlist(7).await?.len(), 20);

        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_writes_leave_only_the_document() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;
        store.add_wishlist_entry(&lamp(1)).await?;
        store.add_wishlist_entry(&lamp(2)).await?;

        let names: Vec<String> = std::fs::read_dir(dir.path())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_, _>>()?;
        assert_eq!(names, vec![WISHLIST_FILE.to_string()]);
        assert!(std::fs::read_to_string(store.path_of(WISHLIST_FILE))?.ends_with("]\n}\n"));

        Ok(())
    }

    #[tokio::test]
    async fn test_plans_on_skips_corrupt_records() -> StorageResult<()> {
        let dir = TempDir::new()?;
        let store = JsonStore::open(dir.path()).await?;
        std::fs::write(
            store.path_of(PLANS_FILE),
            r#"{
  "1": [{"date": "2026-10-17", "text": "x", "time": "noon"}],
  "2": [{"date": "2026-10-17", "text": "Dentist", "time": "14:00"}],
  "oops": [{"date": "2026-10-17", "text": "y", "time": "-"}]
}"#,
        )?;

        let plans = store.plans_on(day(17)).await?;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].user_id, 2);
        assert_eq!(plans[0].text, "Dentist");

        Ok(())
    }
}
