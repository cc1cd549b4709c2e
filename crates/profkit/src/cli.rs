use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::CheckerConfig;
use crate::credentials::{DEFAULT_SALT, PasswordScheme};
use crate::profile::SortKey;
use crate::timing::{DEFAULT_NUMBER, DEFAULT_REPEAT};

#[derive(Parser, Debug)]
#[command(name = "profkit")]
#[command(about = "Call, line, heap and timing profiles of toy login and event-encoding workloads")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Where the credential store lives and how passwords are encoded
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Credential store database
    #[arg(long, env = "PROFKIT_DB", default_value = "passwords.db")]
    pub db: PathBuf,

    /// Password encoding scheme
    #[arg(long, value_enum, default_value_t = PasswordScheme::default())]
    pub scheme: PasswordScheme,

    /// Salt passed to the password encoder
    #[arg(long, env = "PROFKIT_SALT", default_value = DEFAULT_SALT)]
    pub salt: String,
}

impl StoreArgs {
    pub fn to_config(&self) -> CheckerConfig {
        CheckerConfig {
            db_path: self.db.clone(),
            scheme: self.scheme,
            salt: self.salt.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the credential store with the demo user
    Seed {
        #[command(flatten)]
        store: StoreArgs,

        /// Replace an existing store
        #[arg(long)]
        force: bool,
    },

    /// Profile the login workload against the credential store
    Login {
        #[command(flatten)]
        store: StoreArgs,

        /// Number of login attempts
        #[arg(long, short = 'n', default_value = "1000")]
        cases: usize,

        /// Seed for case generation
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Profile every statement of the login path separately
        #[arg(long)]
        lines: bool,

        /// Run the cases under every password scheme in one profile; each
        /// scheme gets a throwaway store seeded with the demo users
        #[arg(long, conflicts_with = "lines")]
        compare_schemes: bool,

        /// Sort order of the printed table
        #[arg(long, short = 's', value_enum, default_value_t = SortKey::Cumtime)]
        sort: SortKey,

        /// Number of entries to display
        #[arg(long, short = 't', default_value = "10")]
        top: usize,

        /// Save the profile; without a path it goes to profkit.<workload>.<time>.db
        #[arg(long, short = 'o', num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },

    /// Profile heap use of the event encoder
    Encode {
        /// Number of events to encode
        #[arg(long, short = 'n', default_value = "10000")]
        events: usize,

        /// Encoded stream destination (a temporary file when omitted)
        #[arg(long)]
        stream: Option<PathBuf>,

        /// Number of entries to display
        #[arg(long, short = 't', default_value = "10")]
        top: usize,

        /// Save the profile; without a path it goes to profkit.<workload>.<time>.db
        #[arg(long, short = 'o', num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },

    /// Time fallback lookups through the error path and through `get`
    Timeit {
        /// Calls per measurement
        #[arg(long, short = 'n', default_value_t = DEFAULT_NUMBER)]
        number: u64,

        /// Number of measurements; the best one is reported
        #[arg(long, short = 'r', default_value_t = DEFAULT_REPEAT)]
        repeat: usize,

        /// Stop measuring a snippet once this much time has been spent on it
        #[arg(long, value_parser = parse_duration)]
        budget: Option<Duration>,
    },

    /// View top call sites or allocators from a saved profile
    Top {
        /// What to display
        #[arg(value_enum)]
        metric: TopMetric,

        /// Profile database file
        file: PathBuf,

        /// Number of entries to display
        #[arg(long, short = 'n', default_value = "20")]
        top: usize,

        /// Sort order for call sites
        #[arg(long, short = 's', value_enum, default_value_t = SortKey::Cumtime)]
        sort: SortKey,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Execute raw SQL query on a profile database
    Query {
        /// Profile database file
        file: PathBuf,

        /// SQL query to execute
        sql: String,
    },

    /// List saved profile databases
    List {
        /// Directory to search (defaults to current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopMetric {
    Calls,
    Heap,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 500ms, 30s, 5m, 90",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Login { cases: 0, .. } => {
                Err("--cases must be at least 1".to_string())
            }
            Command::Encode { events: 0, .. } => {
                Err("--events must be at least 1".to_string())
            }
            Command::Timeit { number: 0, .. } => {
                Err("--number must be at least 1".to_string())
            }
            Command::Timeit { repeat: 0, .. } => {
                Err("--repeat must be at least 1".to_string())
            }
            Command::Seed { store, .. } | Command::Login { store, .. }
                if store.salt.is_empty() =>
            {
                Err("--salt must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_login_defaults() {
        let cli = Cli::try_parse_from(["profkit", "login", "--db", "x.db"]).unwrap();
        let Command::Login {
            store,
            cases,
            sort,
            lines,
            ..
        } = &cli.command
        else {
            panic!("expected login");
        };
        assert_eq!(store.db, PathBuf::from("x.db"));
        assert_eq!(store.scheme, PasswordScheme::Sha512Crypt);
        assert_eq!(*cases, 1000);
        assert_eq!(*sort, SortKey::Cumtime);
        assert!(!lines);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_scheme_and_sort_values() {
        let cli = Cli::try_parse_from([
            "profkit", "login", "--scheme", "sha256", "--sort", "tottime", "--salt", "pepper",
        ])
        .unwrap();
        let Command::Login {
            store, sort, ..
        } = &cli.command
        else {
            panic!("expected login");
        };
        assert_eq!(store.scheme, PasswordScheme::Sha256);
        assert_eq!(store.salt, "pepper");
        assert_eq!(*sort, SortKey::Tottime);
    }

    #[test]
    fn test_compare_schemes_flag() {
        let cli = Cli::try_parse_from(["profkit", "login", "--compare-schemes"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Login {
                compare_schemes: true,
                lines: false,
                ..
            }
        ));
        assert!(
            Cli::try_parse_from(["profkit", "login", "--compare-schemes", "--lines"]).is_err()
        );
    }

    #[test]
    fn test_output_path_is_optional() {
        let cli = Cli::try_parse_from(["profkit", "encode", "-o"]).unwrap();
        assert!(matches!(cli.command, Command::Encode { output: Some(None), .. }));
        let cli = Cli::try_parse_from(["profkit", "encode", "-o", "p.db"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Encode { output: Some(Some(ref p)), .. } if p == &PathBuf::from("p.db")
        ));
        let cli = Cli::try_parse_from(["profkit", "encode"]).unwrap();
        assert!(matches!(cli.command, Command::Encode { output: None, .. }));
    }

    #[test]
    fn test_validate_rejects_zero_counts() {
        let cli = Cli::try_parse_from(["profkit", "encode", "-n", "0"]).unwrap();
        assert!(cli.validate().is_err());
        let cli = Cli::try_parse_from(["profkit", "timeit", "--repeat", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_verbosity_filter() {
        let cli = Cli::try_parse_from(["profkit", "-vv", "list"]).unwrap();
        assert_eq!(cli.default_log_filter(), "debug");
        let cli = Cli::try_parse_from(["profkit", "list"]).unwrap();
        assert_eq!(cli.default_log_filter(), "warn");
    }

    #[test]
    fn test_top_json_conflicts_with_csv() {
        let parsed = Cli::try_parse_from(["profkit", "top", "calls", "p.db", "--json", "--csv"]);
        assert!(parsed.is_err());
    }
}
