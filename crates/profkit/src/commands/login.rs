use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;

use crate::config::CheckerConfig;
use crate::credentials::{Checker, PasswordEncoder, PasswordScheme, SqliteStore, seed_demo_users};
use crate::error::{Error, Result};
use crate::profile::{Profiler, SortKey};
use crate::report;
use crate::workload::{self, LoginOutcome};

pub struct LoginOptions {
    pub cases: usize,
    pub seed: u64,
    pub lines: bool,
    pub compare_schemes: bool,
    pub sort: SortKey,
    pub top: usize,
}

/// Run the login workload under the profiler. Returns the login outcome and
/// the profiler holding the recorded stats.
pub fn profile_login(
    config: &CheckerConfig,
    options: &LoginOptions,
) -> Result<(LoginOutcome, Profiler)> {
    let checker = config.open_checker()?;
    let cases = workload::gen_cases(options.cases, &mut StdRng::seed_from_u64(options.seed));
    tracing::info!(
        cases = cases.len(),
        seed = options.seed,
        lines = options.lines,
        "running login workload"
    );

    let profiler = Profiler::new();
    profkit_trace::reset();
    profkit_trace::start();
    let outcome = if options.lines {
        workload::bench_login_lines(&checker, &cases, &profiler)
    } else {
        workload::bench_login(&checker, &cases, &profiler)
    };
    profkit_trace::stop();

    Ok((outcome?, profiler))
}

/// Checkers for every scheme, each over an in-memory store holding the demo
/// users encoded under that scheme and `salt`
fn scheme_checkers(salt: &str) -> Result<Vec<Checker<SqliteStore>>> {
    PasswordScheme::ALL
        .iter()
        .map(|&scheme| {
            let encoder = PasswordEncoder::new(scheme, salt);
            let store = SqliteStore::in_memory()?;
            seed_demo_users(&store, &encoder)?;
            Ok(Checker::new(store, encoder))
        })
        .collect()
}

/// Run the login cases under every scheme in one profile. The configured
/// store is not used.
pub fn profile_login_schemes(
    config: &CheckerConfig,
    options: &LoginOptions,
) -> Result<(Vec<(PasswordScheme, LoginOutcome)>, Profiler)> {
    if config.salt.is_empty() {
        return Err(Error::InvalidArgument("salt must not be empty".to_string()));
    }
    let checkers = scheme_checkers(&config.salt)?;
    let cases = workload::gen_cases(options.cases, &mut StdRng::seed_from_u64(options.seed));
    tracing::info!(
        cases = cases.len(),
        seed = options.seed,
        schemes = checkers.len(),
        "running login workload per scheme"
    );

    let profiler = Profiler::new();
    profkit_trace::reset();
    profkit_trace::start();
    let outcomes = workload::bench_login_schemes(&checkers, &cases, &profiler);
    profkit_trace::stop();

    let outcomes = PasswordScheme::ALL.into_iter().zip(outcomes?).collect();
    Ok((outcomes, profiler))
}

fn run_schemes(
    config: &CheckerConfig,
    options: &LoginOptions,
    output: Option<&Path>,
) -> Result<()> {
    let (outcomes, profiler) = profile_login_schemes(config, options)?;
    let elapsed = profiler.elapsed();

    println!("# login | every scheme | {} cases each", options.cases);
    for (scheme, outcome) in &outcomes {
        println!(
            "# {}: Accepted: {} | Rejected: {}",
            scheme,
            report::format_count(outcome.accepted),
            report::format_count(outcome.rejected)
        );
    }
    println!(
        "# Calls: {} | Elapsed: {}",
        report::format_count(profiler.total_calls()),
        report::format_secs(elapsed)
    );
    println!("# Ordered by: {}", options.sort.as_str());
    println!();

    report::print_call_stats(&profiler.stats(options.sort), options.top);

    if let Some(path) = output {
        let schemes: Vec<&str> = outcomes.iter().map(|(s, _)| s.as_str()).collect();
        super::save_profile(
            path,
            "login-schemes",
            &profiler,
            elapsed,
            &[
                ("cases", options.cases.to_string()),
                ("seed", options.seed.to_string()),
                ("scheme", schemes.join(",")),
            ],
        )?;
    }

    Ok(())
}

pub fn run(config: &CheckerConfig, options: &LoginOptions, output: Option<&Path>) -> Result<()> {
    if options.compare_schemes {
        return run_schemes(config, options, output);
    }
    let (outcome, profiler) = profile_login(config, options)?;
    let elapsed = profiler.elapsed();

    println!(
        "# login | {} | scheme {} | {} cases",
        config.db_path.display(),
        config.scheme,
        options.cases
    );
    println!(
        "# Accepted: {} | Rejected: {} | Calls: {} | Elapsed: {}",
        report::format_count(outcome.accepted),
        report::format_count(outcome.rejected),
        report::format_count(profiler.total_calls()),
        report::format_secs(elapsed)
    );
    println!("# Ordered by: {}", options.sort.as_str());
    println!();

    report::print_call_stats(&profiler.stats(options.sort), options.top);

    if let Some(path) = output {
        let workload = if options.lines { "login-lines" } else { "login" };
        super::save_profile(
            path,
            workload,
            &profiler,
            elapsed,
            &[
                ("cases", options.cases.to_string()),
                ("seed", options.seed.to_string()),
                ("scheme", config.scheme.to_string()),
                ("accepted", outcome.accepted.to_string()),
                ("rejected", outcome.rejected.to_string()),
            ],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_config(dir: &Path) -> CheckerConfig {
        let config = CheckerConfig {
            db_path: dir.join("passwords.db"),
            scheme: PasswordScheme::Sha256,
            salt: "pepper".to_string(),
        };
        let store = SqliteStore::create(&config.db_path).unwrap();
        seed_demo_users(&store, &config.encoder()).unwrap();
        config
    }

    fn options(lines: bool) -> LoginOptions {
        LoginOptions {
            cases: 200,
            seed: 7,
            lines,
            compare_schemes: false,
            sort: SortKey::Cumtime,
            top: 10,
        }
    }

    #[test]
    fn test_profile_login() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path());

        let (outcome, profiler) = profile_login(&config, &options(false)).unwrap();
        assert_eq!(outcome.total(), 200);
        assert!(outcome.accepted > outcome.rejected);

        let stats = profiler.stats(SortKey::Cumtime);
        assert_eq!(stats[0].location.function, "bench_login");
        assert_eq!(stats[0].calls, 1);
    }

    #[test]
    fn test_lines_mode_gives_same_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path());
        let (a, _) = profile_login(&config, &options(false)).unwrap();
        let (b, profiler) = profile_login(&config, &options(true)).unwrap();
        assert_eq!(a, b);
        assert!(
            profiler
                .stats(SortKey::Calls)
                .iter()
                .all(|s| s.location.function == "login_lines")
        );
    }

    #[test]
    fn test_run_saves_profile() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(dir.path());
        let path = dir.path().join("profkit.login.db");
        run(&config, &options(false), Some(&path)).unwrap();

        let conn = crate::storage::open_profile(&path).unwrap();
        let summary = crate::storage::query_summary(&conn).unwrap();
        assert_eq!(summary.workload, "login");
        assert!(summary.total_calls >= 200);
    }

    #[test]
    fn test_compare_schemes_in_one_profile() {
        let dir = tempfile::tempdir().unwrap();
        // No store on disk: every scheme gets its own seeded store
        let config = CheckerConfig {
            db_path: dir.path().join("nope.db"),
            ..Default::default()
        };
        let options = LoginOptions {
            cases: 20,
            compare_schemes: true,
            ..options(false)
        };

        let (outcomes, profiler) = profile_login_schemes(&config, &options).unwrap();
        let schemes: Vec<PasswordScheme> = outcomes.iter().map(|(s, _)| *s).collect();
        assert_eq!(schemes, PasswordScheme::ALL);
        assert_eq!(outcomes[0].1, outcomes[1].1);
        assert_eq!(outcomes[0].1.total(), 20);
        assert!(outcomes[0].1.accepted > 0);

        let stats = profiler.stats(SortKey::Calls);
        for site in ["login_sha512_crypt", "login_sha256"] {
            assert!(stats.iter().any(|s| s.location.function == site && s.calls == 20));
        }

        let path = dir.path().join("profkit.login-schemes.db");
        run(&config, &options, Some(&path)).unwrap();
        let conn = crate::storage::open_profile(&path).unwrap();
        assert_eq!(crate::storage::query_summary(&conn).unwrap().workload, "login-schemes");
        assert_eq!(
            crate::storage::get_meta(&conn, "scheme").unwrap().as_deref(),
            Some("sha512-crypt,sha256")
        );
    }

    #[test]
    fn test_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckerConfig {
            db_path: dir.path().join("nope.db"),
            ..Default::default()
        };
        assert!(matches!(
            profile_login(&config, &options(false)),
            Err(Error::StoreNotFound(_))
        ));
    }
}
