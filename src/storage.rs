//! # Storage Module
//!
//! Persistence seam shared by the SQLite backend (`db`) and the JSON document
//! backend (`json_store`). Both are append-only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::errors::AssistantError;
use crate::models::{distinct_categories, FitEntry, PlanEntry, WishlistEntry};

pub type StorageResult<T> = Result<T, AssistantError>;

/// Per-user record lists backing every bot feature
#[async_trait]
pub trait Storage: Send + Sync {
    async fn add_fit_entry(&self, entry: &FitEntry) -> StorageResult<()>;

    /// Fit rows of `user_id` dated within `[start, end]`, ordered by date
    /// then insertion
    async fn fit_entries_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<FitEntry>>;

    async fn add_plan(&self, plan: &PlanEntry) -> StorageResult<()>;

    /// Plans of `user_id` dated within `[start, end]`, ordered by date then time
    async fn plans_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<PlanEntry>>;

    /// Plans of every user dated `date`. Records that fail to decode are
    /// logged and skipped so they cannot hold back other users' plans.
    async fn plans_on(&self, date: NaiveDate) -> StorageResult<Vec<PlanEntry>>;

    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> StorageResult<()>;

    /// Wishlist of `user_id` in insertion order
    async fn wishlist(&self, user_id: i64) -> StorageResult<Vec<WishlistEntry>>;

    /// Entries whose category matches `category` case-insensitively
    async fn wishlist_in_category(
        &self,
        user_id: i64,
        category: &str,
    ) -> StorageResult<Vec<WishlistEntry>> {
        let entries = self.wishlist(user_id).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.in_category(category))
            .collect())
    }

    async fn wishlist_categories(&self, user_id: i64) -> StorageResult<Vec<String>> {
        let entries = self.wishlist(user_id).await?;
        Ok(distinct_categories(&entries))
    }
}

/// Open the backend selected by configuration
pub async fn open_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::Sqlite => {
            info!(database_url = %config.database_url, "Opening SQLite storage");
            let store = crate::db::SqliteStore::connect(&config.database_url).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Json => {
            info!(data_dir = %config.data_dir.display(), "Opening JSON document storage");
            let store = crate::json_store::JsonStore::open(&config.data_dir).await?;
            Ok(Arc::new(store))
        }
    }
}
