use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use rusqlite_migration::{Migrations, M};

use crate::app::{AdlogError, Result};
use crate::domain::Listing;
use crate::store::ListingStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LISTING_COLUMNS: &str = "id, url, title, image_path, view_count, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| AdlogError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            AdlogError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<Listing> {
        Ok(Listing {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            image_path: row.get(3)?,
            view_count: u64::try_from(row.get::<_, i64>(4)?).unwrap_or(0),
            created_at: row
                .get::<_, String>(5)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn query_by_id(conn: &Connection, id: i64) -> Result<Option<Listing>> {
        let listing = conn
            .query_row(
                &format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1"),
                params![id],
                Self::row_to_listing,
            )
            .optional()?;

        Ok(listing)
    }

    fn query_by_url(conn: &Connection, url: &str) -> Result<Option<Listing>> {
        let listing = conn
            .query_row(
                &format!("SELECT {LISTING_COLUMNS} FROM listings WHERE url = ?1"),
                params![url],
                Self::row_to_listing,
            )
            .optional()?;

        Ok(listing)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl ListingStore for SqliteStore {
    fn find_by_url(&self, url: &str) -> Result<Option<Listing>> {
        let conn = self.conn()?;
        Self::query_by_url(&conn, url)
    }

    fn get(&self, id: i64) -> Result<Option<Listing>> {
        let conn = self.conn()?;
        Self::query_by_id(&conn, id)
    }

    fn create_or_get_existing(
        &self,
        url: &str,
        title: &str,
        image_path: Option<&str>,
    ) -> Result<Listing> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT INTO listings (url, title, image_path, view_count, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![url, title, image_path, Utc::now().to_rfc3339()],
        );

        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                tracing::info!("Created listing {} for {}", id, url);
                Self::query_by_id(&conn, id)?.ok_or(AdlogError::ListingNotFound(id))
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("Listing for {} already stored, returning existing row", url);
                Self::query_by_url(&conn, url)?.ok_or(AdlogError::Database(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn increment_view(&self, id: i64) -> Result<Listing> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            "UPDATE listings SET view_count = view_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(AdlogError::ListingNotFound(id));
        }

        let listing = Self::query_by_id(&tx, id)?.ok_or(AdlogError::ListingNotFound(id))?;
        tx.commit()?;

        Ok(listing)
    }

    fn top_by_views(&self, limit: usize) -> Result<Vec<Listing>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings
             ORDER BY view_count DESC, id DESC LIMIT ?1"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let listings = stmt
            .query_map(params![limit], Self::row_to_listing)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(listings)
    }

    fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
