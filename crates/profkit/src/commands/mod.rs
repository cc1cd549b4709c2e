pub mod encode;
pub mod list;
pub mod login;
pub mod query;
pub mod seed;
pub mod timeit;
pub mod top;

use crate::error::Result;
use crate::profile::{Profiler, SortKey};
use crate::storage::ProfileWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name prefix shared by every saved profile
pub const PROFILE_PREFIX: &str = "profkit.";

/// Resolve the `-o` flag: absent means don't save, bare means a timestamped
/// file in the current directory.
pub fn profile_path(output: Option<Option<PathBuf>>, workload: &str) -> Option<PathBuf> {
    output.map(|path| {
        path.unwrap_or_else(|| {
            let timestamp = chrono::Local::now().format("%y%m%d%H%M%S");
            PathBuf::from(format!("{PROFILE_PREFIX}{workload}.{timestamp}.db"))
        })
    })
}

/// Persist everything `profiler` recorded
pub fn save_profile(
    path: &Path,
    workload: &str,
    profiler: &Profiler,
    elapsed: Duration,
    meta: &[(&str, String)],
) -> Result<()> {
    let mut writer = ProfileWriter::create(path, workload)?;
    for (key, value) in meta {
        writer.set_meta(key, value)?;
    }
    writer.write_stats(&profiler.stats(SortKey::Cumtime))?;
    writer.finish(elapsed)?;
    println!("Profile saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_path() {
        assert_eq!(profile_path(None, "login"), None);
        assert_eq!(
            profile_path(Some(Some(PathBuf::from("x.db"))), "login"),
            Some(PathBuf::from("x.db"))
        );
        let generated = profile_path(Some(None), "encode").unwrap();
        let name = generated.to_string_lossy();
        assert!(name.starts_with("profkit.encode."));
        assert!(name.ends_with(".db"));
    }

    #[test]
    fn test_save_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profkit.test.db");
        let profiler = Profiler::new();
        profiler.call("work", || ());
        save_profile(
            &path,
            "test",
            &profiler,
            Duration::from_millis(5),
            &[("cases", "1".to_string())],
        )
        .unwrap();

        let conn = crate::storage::open_profile(&path).unwrap();
        assert_eq!(
            crate::storage::get_meta(&conn, "cases").unwrap().as_deref(),
            Some("1")
        );
        let summary = crate::storage::query_summary(&conn).unwrap();
        assert_eq!(summary.total_calls, 1);
        assert_eq!(summary.duration_ms, Some(5));
    }
}
