use crate::error::Result;
use crate::storage::open_profile;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use rusqlite::types::Value;
use std::path::Path;

/// Run `sql` against a profile and collect the header and rows as text
pub fn query(file: &Path, sql: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let conn = open_profile(file)?;
    let mut stmt = conn.prepare(sql)?;

    let column_count = stmt.column_count();
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mut table = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let values: Vec<String> = (0..column_count)
            .map(|i| {
                row.get::<_, Value>(i)
                    .map(|v| format_value(&v))
                    .unwrap_or_else(|_| "NULL".to_string())
            })
            .collect();
        table.push(values);
    }

    Ok((column_names, table))
}

pub fn run(file: &Path, sql: &str) -> Result<()> {
    let (header, rows) = query(file, sql)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");

    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => format!("{:.6}", f),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}
