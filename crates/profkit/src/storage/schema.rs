use rusqlite::{Connection, OptionalExtension};

pub const SCHEMA_VERSION: i32 = 1;

/// Create all tables (drops existing tables first to ensure clean state)
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Drop existing tables to ensure clean state for a new profile
        DROP TABLE IF EXISTS heap_stats;
        DROP TABLE IF EXISTS call_stats;
        DROP TABLE IF EXISTS locations;
        DROP TABLE IF EXISTS meta;

        -- Metadata table
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Unique call sites (file, line, function)
        CREATE TABLE locations (
            id INTEGER PRIMARY KEY,
            file TEXT NOT NULL,
            line INTEGER NOT NULL,
            function TEXT NOT NULL,
            UNIQUE(file, line, function)
        );

        -- Call counts and times per call site, in nanoseconds
        CREATE TABLE call_stats (
            location_id INTEGER PRIMARY KEY,
            calls INTEGER NOT NULL,
            tottime_ns INTEGER NOT NULL,
            cumtime_ns INTEGER NOT NULL,
            FOREIGN KEY (location_id) REFERENCES locations(id)
        );

        -- Allocations made by each call site itself
        CREATE TABLE heap_stats (
            location_id INTEGER PRIMARY KEY,
            alloc_count INTEGER NOT NULL DEFAULT 0,
            alloc_bytes INTEGER NOT NULL DEFAULT 0,
            free_count INTEGER NOT NULL DEFAULT 0,
            free_bytes INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (location_id) REFERENCES locations(id)
        );
        "#,
    )
}

/// Set a metadata key
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
        [key, value],
    )?;
    Ok(())
}

/// Get a metadata key
pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
        row.get(0)
    })
    .optional()
}

/// True if `conn` holds no tables at all
pub fn is_empty(conn: &Connection) -> rusqlite::Result<bool> {
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
        [],
        |row| row.get(0),
    )?;
    Ok(tables == 0)
}

/// True if `conn` holds a profile written by this schema
pub fn is_profile(conn: &Connection) -> bool {
    let has_meta: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'meta')",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    has_meta
        && get_meta(conn, "version")
            .ok()
            .flatten()
            .and_then(|v| v.parse::<i32>().ok())
            == Some(SCHEMA_VERSION)
}
