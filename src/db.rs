//! SQLite backend: three append-only tables without primary keys.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::errors::AssistantError;
use crate::models::{FitEntry, PlanEntry, PlanTime, WishlistEntry};
use crate::storage::{Storage, StorageResult};

fn failed(action: &'static str) -> impl FnOnce(sqlx::Error) -> AssistantError {
    move |e| AssistantError::Persistence(format!("Failed to {action}: {e}"))
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &SqlitePool) -> StorageResult<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS fit_tracker (
            user_id INTEGER,
            date TEXT,
            steps INTEGER,
            calories INTEGER,
            weight REAL
        )",
    )
    .execute(pool)
    .await
    .map_err(failed("create fit_tracker table"))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS plans (
            user_id INTEGER,
            date TEXT,
            plan TEXT,
            time TEXT
        )",
    )
    .execute(pool)
    .await
    .map_err(failed("create plans table"))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wishlist (
            user_id INTEGER,
            link TEXT,
            name TEXT,
            category TEXT
        )",
    )
    .execute(pool)
    .await
    .map_err(failed("create wishlist table"))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS fit_tracker_user_date ON fit_tracker (user_id, date)")
        .execute(pool)
        .await
        .map_err(failed("create fit_tracker index"))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS plans_date ON plans (date)")
        .execute(pool)
        .await
        .map_err(failed("create plans index"))?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn fit_entry_from_row(row: &SqliteRow) -> Result<FitEntry, sqlx::Error> {
    Ok(FitEntry {
        user_id: row.try_get("user_id")?,
        date: row.try_get("date")?,
        steps: row.try_get("steps")?,
        calories: row.try_get("calories")?,
        weight: row.try_get("weight")?,
    })
}

fn plan_from_row(row: &SqliteRow) -> StorageResult<PlanEntry> {
    let time: String = row.try_get("time")?;
    let time = time
        .parse::<PlanTime>()
        .map_err(AssistantError::Persistence)?;
    Ok(PlanEntry {
        user_id: row.try_get("user_id")?,
        date: row.try_get("date")?,
        text: row.try_get("plan")?,
        time,
    })
}

fn wishlist_entry_from_row(row: &SqliteRow) -> Result<WishlistEntry, sqlx::Error> {
    Ok(WishlistEntry {
        user_id: row.try_get("user_id")?,
        link: row.try_get("link")?,
        title: row.try_get("name")?,
        category: row.try_get("category")?,
    })
}

/// Plans sorted by date, then time; unscheduled plans last within a day
fn sort_plans(plans: &mut [PlanEntry]) {
    plans.sort_by_key(|plan| (plan.date, plan.time));
}

/// Relational storage backend
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` (e.g. `sqlite://withlilybot.db` or
    /// `sqlite::memory:`), creating the file and schema when missing
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(failed("parse database url"))?
            .create_if_missing(true);

        // One connection serializes every statement against the file.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(failed("connect to SQLite database"))?;

        init_database_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStore {
    async fn add_fit_entry(&self, entry: &FitEntry) -> StorageResult<()> {
        debug!(user_id = entry.user_id, date = %entry.date, "Inserting fit tracker row");

        sqlx::query(
            "INSERT INTO fit_tracker (user_id, date, steps, calories, weight)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.steps)
        .bind(entry.calories)
        .bind(entry.weight)
        .execute(&self.pool)
        .await
        .map_err(failed("insert fit tracker row"))?;

        Ok(())
    }

    async fn fit_entries_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<FitEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, date, steps, calories, weight FROM fit_tracker
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, rowid",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("read fit tracker rows"))?;

        rows.iter()
            .map(fit_entry_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(failed("decode fit tracker row"))
    }

    async fn add_plan(&self, plan: &PlanEntry) -> StorageResult<()> {
        debug!(user_id = plan.user_id, date = %plan.date, "Inserting plan");

        sqlx::query("INSERT INTO plans (user_id, date, plan, time) VALUES (?1, ?2, ?3, ?4)")
            .bind(plan.user_id)
            .bind(plan.date)
            .bind(&plan.text)
            .bind(plan.time.to_string())
            .execute(&self.pool)
            .await
            .map_err(failed("insert plan"))?;

        Ok(())
    }

    async fn plans_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<PlanEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, date, plan, time FROM plans
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date, rowid",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("read plans"))?;

        let mut plans = rows.iter().map(plan_from_row).collect::<StorageResult<Vec<_>>>()?;
        sort_plans(&mut plans);
        Ok(plans)
    }

    async fn plans_on(&self, date: NaiveDate) -> StorageResult<Vec<PlanEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, date, plan, time FROM plans WHERE date = ?1 ORDER BY user_id, rowid",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("read today's plans"))?;

        let mut plans = Vec::with_capacity(rows.len());
        for row in &rows {
            match plan_from_row(row) {
                Ok(plan) => plans.push(plan),
                Err(e) => {
                    let user_id: Option<i64> = row.try_get("user_id").ok();
                    warn!(?user_id, date = %date, error = %e, "Skipping corrupt plan row");
                }
            }
        }
        Ok(plans)
    }

    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> StorageResult<()> {
        debug!(user_id = entry.user_id, category = %entry.category, "Inserting wishlist entry");

        sqlx::query("INSERT INTO wishlist (user_id, link, name, category) VALUES (?1, ?2, ?3, ?4)")
            .bind(entry.user_id)
            .bind(&entry.link)
            .bind(&entry.title)
            .bind(&entry.category)
            .execute(&self.pool)
            .await
            .map_err(failed("insert wishlist entry"))?;

        Ok(())
    }

    async fn wishlist(&self, user_id: i64) -> StorageResult<Vec<WishlistEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, link, name, category FROM wishlist WHERE user_id = ?1 ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("read wishlist"))?;

        rows.iter()
            .map(wishlist_entry_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(failed("decode wishlist entry"))
    }
}
