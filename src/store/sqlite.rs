use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, UrlsetterError};
use crate::domain::CacheKey;
use crate::store::{Store, StoreStats, DEFAULT_CAPACITY_BYTES};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    capacity_bytes: u64,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P, capacity_bytes: u64) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            capacity_bytes,
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_capacity(DEFAULT_CAPACITY_BYTES)
    }

    pub fn in_memory_with_capacity(capacity_bytes: u64) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            capacity_bytes,
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
            .map_err(|_| UrlsetterError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            UrlsetterError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    /// When the entry for `key` was last written.
    pub fn resolved_at(&self, key: &CacheKey) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT resolved_at FROM resolutions WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|s| Self::parse_datetime(&s)))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    /// Drop least recently accessed rows until the total fits the capacity.
    fn evict(conn: &Connection, capacity_bytes: u64) -> Result<usize> {
        let mut evicted = 0;
        loop {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(size), 0) FROM resolutions",
                [],
                |row| row.get(0),
            )?;
            if total as u64 <= capacity_bytes {
                break;
            }

            let removed = conn.execute(
                "DELETE FROM resolutions WHERE key =
                 (SELECT key FROM resolutions ORDER BY last_access ASC LIMIT 1)",
                [],
            )?;
            if removed == 0 {
                break;
            }
            evicted += removed;
        }
        Ok(evicted)
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let conn = self.conn()?;

        let value: Option<String> = conn
            .query_row(
                "SELECT resolved_url FROM resolutions WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        if value.is_some() {
            conn.execute(
                "UPDATE resolutions
                 SET last_access = (SELECT MAX(last_access) + 1 FROM resolutions)
                 WHERE key = ?1",
                params![key.as_str()],
            )?;
        }

        Ok(value)
    }

    fn put(&self, key: &CacheKey, value: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let size = (key.as_str().len() + value.len()) as i64;
        tx.execute(
            "INSERT INTO resolutions (key, resolved_url, size, last_access, resolved_at)
             VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(last_access), 0) + 1 FROM resolutions), ?4)
             ON CONFLICT(key) DO UPDATE SET
                resolved_url = excluded.resolved_url,
                size = excluded.size,
                last_access = excluded.last_access,
                resolved_at = excluded.resolved_at",
            params![key.as_str(), value, size, Utc::now().to_rfc3339()],
        )?;

        let evicted = Self::evict(&tx, self.capacity_bytes)?;
        if evicted > 0 {
            tracing::debug!("Evicted {} cache entries", evicted);
        }

        tx.commit()?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let (entries, bytes): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM resolutions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(StoreStats {
            entries: entries as u64,
            bytes: bytes as u64,
            capacity_bytes: self.capacity_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s)
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get(&key("missing")).unwrap().is_none());
    }

    #[test]
    fn test_put_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(&key("k1"), "https://example.com/").unwrap();

        assert_eq!(
            store.get(&key("k1")).unwrap(),
            Some("https://example.com/".to_string())
        );
        assert!(store.resolved_at(&key("k1")).unwrap().is_some());
    }

    #[test]
    fn test_put_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(&key("k1"), "https://old.example/").unwrap();
        store.put(&key("k1"), "https://new.example/").unwrap();

        assert_eq!(
            store.get(&key("k1")).unwrap(),
            Some("https://new.example/".to_string())
        );
        assert_eq!(store.stats().unwrap().entries, 1);
    }

    #[test]
    fn test_stats_counts_bytes() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(&key("ab"), "0123456789").unwrap();
        store.put(&key("cd"), "0123").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.bytes, 12 + 6);
        assert_eq!(stats.capacity_bytes, DEFAULT_CAPACITY_BYTES);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        // Each entry is 2 + 8 = 10 bytes; room for two.
        let store = SqliteStore::in_memory_with_capacity(25).unwrap();
        store.put(&key("k1"), "value-01").unwrap();
        store.put(&key("k2"), "value-02").unwrap();

        // Touch k1 so k2 becomes the oldest.
        assert!(store.get(&key("k1")).unwrap().is_some());

        store.put(&key("k3"), "value-03").unwrap();

        assert!(store.get(&key("k1")).unwrap().is_some());
        assert!(store.get(&key("k2")).unwrap().is_none());
        assert!(store.get(&key("k3")).unwrap().is_some());
        assert!(store.stats().unwrap().bytes <= 25);
    }

    #[test]
    fn test_oversized_entry_is_not_kept() {
        let store = SqliteStore::in_memory_with_capacity(8).unwrap();
        store.put(&key("k1"), "far-too-long-to-fit").unwrap();

        assert!(store.get(&key("k1")).unwrap().is_none());
        assert_eq!(store.stats().unwrap().entries, 0);
    }

    #[test]
    fn test_rejects_keys_longer_than_64() {
        let store = SqliteStore::in_memory().unwrap();
        let conn = store.conn().unwrap();
        let result = conn.execute(
            "INSERT INTO resolutions (key, resolved_url, size, last_access, resolved_at)
             VALUES (?1, 'x', 1, 1, '')",
            params!["k".repeat(65)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteStore::new(&path, DEFAULT_CAPACITY_BYTES).unwrap();
            store.put(&key("k1"), "https://example.com/").unwrap();
        }

        let store = SqliteStore::new(&path, DEFAULT_CAPACITY_BYTES).unwrap();
        assert_eq!(
            store.get(&key("k1")).unwrap(),
            Some("https://example.com/".to_string())
        );
    }
}
