use super::schema::{self, SCHEMA_VERSION};
use crate::error::{Error, Result};
use crate::profile::{FunctionStats, Location, SortKey};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Storage writer for profile data
pub struct ProfileWriter {
    conn: Connection,
    /// Cache: location -> location_id
    location_cache: HashMap<Location, i64>,
}

impl ProfileWriter {
    /// Create a new profile file, replacing any profile already there.
    /// Any other database with tables in it is left alone.
    pub fn create(path: &Path, workload: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        if !schema::is_empty(&conn)? && !schema::is_profile(&conn) {
            return Err(Error::NotAProfile(path.display().to_string()));
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        // Create tables (drops existing tables first)
        schema::create_tables(&conn)?;

        schema::set_meta(&conn, "version", &SCHEMA_VERSION.to_string())?;
        schema::set_meta(&conn, "workload", workload)?;
        schema::set_meta(&conn, "start_time", &chrono::Utc::now().to_rfc3339())?;

        tracing::debug!(path = %path.display(), workload, "created profile");

        Ok(ProfileWriter {
            conn,
            location_cache: HashMap::new(),
        })
    }

    /// Set an extra metadata key
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        schema::set_meta(&self.conn, key, value)?;
        Ok(())
    }

    /// Write stats in one transaction. Stats for a location already in the
    /// profile are added to what is there.
    pub fn write_stats(&mut self, stats: &[FunctionStats]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut call_stmt = tx.prepare_cached(
                r#"
                INSERT INTO call_stats (location_id, calls, tottime_ns, cumtime_ns)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(location_id) DO UPDATE SET
                    calls = calls + excluded.calls,
                    tottime_ns = tottime_ns + excluded.tottime_ns,
                    cumtime_ns = cumtime_ns + excluded.cumtime_ns
                "#,
            )?;
            let mut heap_stmt = tx.prepare_cached(
                r#"
                INSERT INTO heap_stats (location_id, alloc_count, alloc_bytes, free_count, free_bytes)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(location_id) DO UPDATE SET
                    alloc_count = alloc_count + excluded.alloc_count,
                    alloc_bytes = alloc_bytes + excluded.alloc_bytes,
                    free_count = free_count + excluded.free_count,
                    free_bytes = free_bytes + excluded.free_bytes
                "#,
            )?;

            for entry in stats {
                let location_id = location_id(&tx, &mut self.location_cache, &entry.location)?;
                call_stmt.execute(rusqlite::params![
                    location_id,
                    entry.calls as i64,
                    entry.tottime.as_nanos() as i64,
                    entry.cumtime.as_nanos() as i64,
                ])?;
                if !entry.heap.is_empty() {
                    heap_stmt.execute(rusqlite::params![
                        location_id,
                        entry.heap.alloc_count as i64,
                        entry.heap.alloc_bytes as i64,
                        entry.heap.free_count as i64,
                        entry.heap.free_bytes as i64,
                    ])?;
                }
            }
        }
        tx.commit()?;
        tracing::debug!(sites = stats.len(), "wrote profile stats");
        Ok(())
    }

    /// Record the run's wall time and fold the WAL back into the main file
    pub fn finish(self, elapsed: Duration) -> Result<()> {
        schema::set_meta(&self.conn, "duration_ms", &elapsed.as_millis().to_string())?;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

/// Get or create location_id for a (file, line, function)
fn location_id(
    conn: &Connection,
    cache: &mut HashMap<Location, i64>,
    location: &Location,
) -> rusqlite::Result<i64> {
    if let Some(&id) = cache.get(location) {
        return Ok(id);
    }

    conn.execute(
        "INSERT OR IGNORE INTO locations (file, line, function) VALUES (?, ?, ?)",
        rusqlite::params![&location.file, location.line as i64, &location.function],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM locations WHERE file = ? AND line = ? AND function = ?",
        rusqlite::params![&location.file, location.line as i64, &location.function],
        |row| row.get(0),
    )?;

    cache.insert(location.clone(), id);
    Ok(id)
}

/// Open an existing profile for reading
pub fn open_profile(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(Error::NotAProfile(path.display().to_string()));
    }
    let conn = Connection::open(path)?;
    if !schema::is_profile(&conn) {
        return Err(Error::NotAProfile(path.display().to_string()));
    }
    Ok(conn)
}

/// Query results for top call sites
#[derive(Debug, Clone)]
pub struct CallEntry {
    pub location_id: i64,
    pub file: String,
    pub line: u32,
    pub function: String,
    pub calls: u64,
    pub tottime: Duration,
    pub cumtime: Duration,
    /// Share of all self time in the profile
    pub tottime_percent: f64,
}

/// Query results for top allocating call sites
#[derive(Debug, Clone)]
pub struct HeapEntry {
    pub location_id: i64,
    pub file: String,
    pub line: u32,
    pub function: String,
    pub alloc_count: u64,
    pub alloc_bytes: i64,
    pub free_count: u64,
    pub free_bytes: i64,
    pub live_bytes: i64,
}

/// Whole-profile figures shown above the tables
#[derive(Debug, Clone, Default)]
pub struct ProfileSummary {
    pub workload: String,
    pub start_time: String,
    pub duration_ms: Option<i64>,
    pub total_calls: u64,
    pub total_alloc_bytes: i64,
    pub total_alloc_count: u64,
}

fn ns_to_duration(ns: i64) -> Duration {
    Duration::from_nanos(ns.max(0) as u64)
}

/// Query top call sites ordered by `sort`
pub fn query_top_calls(
    conn: &Connection,
    sort: SortKey,
    limit: usize,
) -> rusqlite::Result<Vec<CallEntry>> {
    let total_ns: i64 = conn.query_row(
        "SELECT COALESCE(SUM(tottime_ns), 0) FROM call_stats",
        [],
        |row| row.get(0),
    )?;

    let order_by = match sort {
        SortKey::Calls => "cs.calls DESC",
        SortKey::Tottime => "cs.tottime_ns DESC",
        SortKey::Cumtime => "cs.cumtime_ns DESC",
        SortKey::Heap => "COALESCE(hs.alloc_bytes, 0) DESC, COALESCE(hs.alloc_count, 0) DESC",
    };

    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT l.id, l.file, l.line, l.function, cs.calls, cs.tottime_ns, cs.cumtime_ns
        FROM call_stats cs
        JOIN locations l ON cs.location_id = l.id
        LEFT JOIN heap_stats hs ON hs.location_id = l.id
        ORDER BY {order_by}, l.file, l.line
        LIMIT ?
        "#
    ))?;

    let rows = stmt.query_map([limit as i64], |row| {
        let tottime_ns: i64 = row.get(5)?;
        let percent = if total_ns > 0 {
            (tottime_ns as f64 / total_ns as f64) * 100.0
        } else {
            0.0
        };
        Ok(CallEntry {
            location_id: row.get(0)?,
            file: row.get(1)?,
            line: row.get::<_, i64>(2)? as u32,
            function: row.get(3)?,
            calls: row.get::<_, i64>(4)? as u64,
            tottime: ns_to_duration(tottime_ns),
            cumtime: ns_to_duration(row.get(6)?),
            tottime_percent: percent,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Query top allocating call sites by bytes allocated
pub fn query_top_heap(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<HeapEntry>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT l.id, l.file, l.line, l.function,
               hs.alloc_count, hs.alloc_bytes, hs.free_count, hs.free_bytes
        FROM heap_stats hs
        JOIN locations l ON hs.location_id = l.id
        ORDER BY hs.alloc_bytes DESC, hs.alloc_count DESC, l.file, l.line
        LIMIT ?
        "#,
    )?;

    let rows = stmt.query_map([limit as i64], |row| {
        let alloc_bytes: i64 = row.get(5)?;
        let free_bytes: i64 = row.get(7)?;
        Ok(HeapEntry {
            location_id: row.get(0)?,
            file: row.get(1)?,
            line: row.get::<_, i64>(2)? as u32,
            function: row.get(3)?,
            alloc_count: row.get::<_, i64>(4)? as u64,
            alloc_bytes,
            free_count: row.get::<_, i64>(6)? as u64,
            free_bytes,
            live_bytes: alloc_bytes - free_bytes,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Summary figures for a profile
pub fn query_summary(conn: &Connection) -> rusqlite::Result<ProfileSummary> {
    let workload = schema::get_meta(conn, "workload")?.unwrap_or_else(|| "unknown".to_string());
    let start_time =
        schema::get_meta(conn, "start_time")?.unwrap_or_else(|| "unknown".to_string());
    let duration_ms = schema::get_meta(conn, "duration_ms")?.and_then(|v| v.parse().ok());

    let total_calls: i64 = conn.query_row(
        "SELECT COALESCE(SUM(calls), 0) FROM call_stats",
        [],
        |row| row.get(0),
    )?;
    let (total_alloc_bytes, total_alloc_count): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(alloc_bytes), 0), COALESCE(SUM(alloc_count), 0) FROM heap_stats",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(ProfileSummary {
        workload,
        start_time,
        duration_ms,
        total_calls: total_calls as u64,
        total_alloc_bytes,
        total_alloc_count: total_alloc_count as u64,
    })
}
