use super::PROFILE_PREFIX;
use crate::error::Result;
use crate::report::format_run_duration;
use crate::storage::{open_profile, query_summary};
use std::path::{Path, PathBuf};

/// Profile info extracted from a database file
pub struct ProfileInfo {
    pub path: PathBuf,
    pub workload: String,
    pub duration_ms: i64,
    pub calls: u64,
    pub created: String,
}

/// Find all profkit profile databases in a directory
pub fn find_profiles(dir: &Path) -> Result<Vec<ProfileInfo>> {
    let mut profiles = Vec::new();

    let entries = std::fs::read_dir(dir)?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "db").unwrap_or(false) {
            // Check if filename matches profkit.*.db pattern
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.starts_with(PROFILE_PREFIX)
                && let Ok(info) = get_profile_info(&path)
            {
                profiles.push(info);
            }
        }
    }

    // Most recent first
    profiles.sort_by(|a, b| b.created.cmp(&a.created));

    Ok(profiles)
}

/// Extract metadata from a profile database
fn get_profile_info(path: &Path) -> Result<ProfileInfo> {
    let conn = open_profile(path)?;
    let summary = query_summary(&conn)?;

    Ok(ProfileInfo {
        path: path.to_path_buf(),
        workload: summary.workload,
        duration_ms: summary.duration_ms.unwrap_or(0),
        calls: summary.total_calls,
        created: summary.start_time,
    })
}

/// Run the list command
pub fn run(dir: Option<&Path>) -> Result<()> {
    let search_dir = dir.unwrap_or_else(|| Path::new("."));
    let profiles = find_profiles(search_dir)?;

    if profiles.is_empty() {
        println!("No profkit profiles found in {}", search_dir.display());
        return Ok(());
    }

    println!(
        "{:<40} {:>12} {:>10} {:>10}",
        "FILE", "WORKLOAD", "DURATION", "CALLS"
    );
    println!("{}", "-".repeat(76));

    for profile in profiles {
        let filename = profile
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        println!(
            "{:<40} {:>12} {:>10} {:>10}",
            filename,
            profile.workload,
            format_run_duration(profile.duration_ms),
            profile.calls
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profiler;
    use std::time::Duration;

    #[test]
    fn test_find_profiles_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let profiler = Profiler::new();
        profiler.call("x", || ());

        let first = dir.path().join("profkit.login.1.db");
        crate::commands::save_profile(&first, "login", &profiler, Duration::ZERO, &[]).unwrap();
        // start_time has sub-second precision; keep the two apart anyway
        std::thread::sleep(Duration::from_millis(10));
        let second = dir.path().join("profkit.encode.2.db");
        crate::commands::save_profile(&second, "encode", &profiler, Duration::ZERO, &[]).unwrap();

        // Ignored: wrong prefix, and right prefix but not a profile
        std::fs::write(dir.path().join("passwords.db"), b"").unwrap();
        std::fs::write(dir.path().join("profkit.junk.db"), b"not sqlite").unwrap();

        let profiles = find_profiles(dir.path()).unwrap();
        let names: Vec<&str> = profiles.iter().map(|p| p.workload.as_str()).collect();
        assert_eq!(names, ["encode", "login"]);
        assert_eq!(profiles[0].calls, 1);

        assert_eq!(profiles[0].path, second);
        run(Some(dir.path())).unwrap();
    }

    #[test]
    fn test_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_profiles(dir.path()).unwrap().is_empty());
        run(Some(dir.path())).unwrap();
    }
}
