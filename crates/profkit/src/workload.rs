//! Toy workloads driven under the profiler
//!
//! Login cases mimic production traffic: most logins succeed, a few use a
//! wrong password and fewer still name a user that does not exist.

use chrono::NaiveDateTime;
use rand::Rng;
use std::io::Write;

use crate::credentials::{Checker, CredentialStore, PasswordScheme};
use crate::error::Result;
use crate::events::{EncodeError, Event, EventType, encode_event};
use crate::profile::Profiler;

/// One login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginCase {
    pub user: &'static str,
    pub password: &'static str,
}

pub const VALID_LOGIN: LoginCase = LoginCase {
    user: "daffy",
    password: "rabbit season",
};

pub const UNKNOWN_USER: LoginCase = LoginCase {
    user: "tweety",
    password: "puddy tat",
};

pub const WRONG_PASSWORD: LoginCase = LoginCase {
    user: "daffy",
    password: "duck season",
};

/// Generate `n` login cases: 90% valid, the rest split 20/80 between an
/// unknown user and a wrong password.
pub fn gen_cases<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<LoginCase> {
    (0..n)
        .map(|_| {
            if rng.random::<f64>() > 0.1 {
                VALID_LOGIN
            } else if rng.random::<f64>() < 0.2 {
                UNKNOWN_USER
            } else {
                WRONG_PASSWORD
            }
        })
        .collect()
}

/// Login results of a benchmark run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoginOutcome {
    pub accepted: u64,
    pub rejected: u64,
}

impl LoginOutcome {
    fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }
}

/// Login with the lookup and the encoding profiled as separate calls
fn login<S: CredentialStore>(
    checker: &Checker<S>,
    case: &LoginCase,
    profiler: &Profiler,
) -> Result<bool> {
    let Some(stored) = profiler.call("user_passwd", || checker.lookup(case.user))? else {
        return Ok(false);
    };
    let encoded = profiler.call("encrypt_passwd", || checker.encode(case.password))?;
    Ok(encoded == stored)
}

/// Run every case through the checker, one profiled `login` call each
pub fn bench_login<S: CredentialStore>(
    checker: &Checker<S>,
    cases: &[LoginCase],
    profiler: &Profiler,
) -> Result<LoginOutcome> {
    profiler.call("bench_login", || -> Result<LoginOutcome> {
        let mut outcome = LoginOutcome::default();
        for case in cases {
            let accepted = profiler.call("login", || login(checker, case, profiler))?;
            outcome.record(accepted);
        }
        tracing::debug!(?outcome, "login benchmark finished");
        Ok(outcome)
    })
}

/// Same as [`bench_login`], but every statement of the login path is its own
/// profiled site, so the report reads line by line.
pub fn bench_login_lines<S: CredentialStore>(
    checker: &Checker<S>,
    cases: &[LoginCase],
    profiler: &Profiler,
) -> Result<LoginOutcome> {
    let mut outcome = LoginOutcome::default();
    for case in cases {
        let stored = profiler.call("login_lines", || checker.lookup(case.user))?;
        let Some(stored) = stored else {
            outcome.record(false);
            continue;
        };
        let encoded = profiler.call("login_lines", || checker.encode(case.password))?;
        let accepted = profiler.call("login_lines", || encoded == stored);
        outcome.record(accepted);
    }
    tracing::debug!(?outcome, "line-level login benchmark finished");
    Ok(outcome)
}

/// Run the same cases through one checker per scheme in a single profile.
/// Each scheme's logins land on their own `login_<scheme>` site.
pub fn bench_login_schemes<S: CredentialStore>(
    checkers: &[Checker<S>],
    cases: &[LoginCase],
    profiler: &Profiler,
) -> Result<Vec<LoginOutcome>> {
    checkers
        .iter()
        .map(|checker| {
            let scheme = checker.encoder().scheme();
            let site = login_site(scheme);
            let mut outcome = LoginOutcome::default();
            for case in cases {
                let accepted = profiler.call(site, || login(checker, case, profiler))?;
                outcome.record(accepted);
            }
            tracing::debug!(%scheme, ?outcome, "scheme login benchmark finished");
            Ok(outcome)
        })
        .collect()
}

fn login_site(scheme: PasswordScheme) -> &'static str {
    match scheme {
        PasswordScheme::Sha512Crypt => "login_sha512_crypt",
        PasswordScheme::Sha256 => "login_sha256",
    }
}

pub const EVENT_USER: &str = "bugs";
pub const EVENT_URL: &str = "/buy/carrot";
pub const EVENT_SITE: &str = "acme.com";

/// One event of each known type, all stamped `now`
pub fn sample_events(now: NaiveDateTime) -> Vec<Event> {
    EventType::ALL
        .iter()
        .map(|ty| Event::new(ty.as_str(), now, EVENT_USER, EVENT_URL, EVENT_SITE))
        .collect()
}

/// `events` repeated in order until `n` have been yielded
pub fn cycle_events(events: &[Event], n: usize) -> impl Iterator<Item = &Event> {
    events.iter().cycle().take(n)
}

/// Encode each event with a fresh encoder, profiling every call.
/// Returns the number of events written.
pub fn encode_events<'a, W: Write>(
    events: impl IntoIterator<Item = &'a Event>,
    sink: &mut W,
    profiler: &Profiler,
) -> std::result::Result<usize, EncodeError> {
    let mut written = 0;
    for event in events {
        profiler.call("encode_event", || encode_event(event, &mut *sink))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{DEFAULT_SALT, MemoryStore, PasswordEncoder};
    use crate::profile::SortKey;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn checker() -> Checker<MemoryStore> {
        let encoder = PasswordEncoder::new(PasswordScheme::Sha256, DEFAULT_SALT);
        let mut store = MemoryStore::new();
        store
            .insert(VALID_LOGIN.user, &encoder.encode(VALID_LOGIN.password).unwrap())
            .unwrap();
        Checker::new(store, encoder)
    }

    #[test]
    fn test_gen_cases_is_seeded() {
        let a = gen_cases(200, &mut StdRng::seed_from_u64(11));
        let b = gen_cases(200, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
    }

    #[test]
    fn test_gen_cases_mix() {
        let cases = gen_cases(20_000, &mut StdRng::seed_from_u64(3));
        let frac = |c: LoginCase| {
            cases.iter().filter(|&&x| x == c).count() as f64 / cases.len() as f64
        };
        assert!((frac(VALID_LOGIN) - 0.9).abs() < 0.02);
        assert!((frac(UNKNOWN_USER) - 0.02).abs() < 0.01);
        assert!((frac(WRONG_PASSWORD) - 0.08).abs() < 0.015);
    }

    #[test]
    fn test_bench_login_outcome() {
        let checker = checker();
        let cases = [VALID_LOGIN, UNKNOWN_USER, WRONG_PASSWORD, VALID_LOGIN];
        let profiler = Profiler::new();
        let outcome = bench_login(&checker, &cases, &profiler).unwrap();
        assert_eq!(outcome, LoginOutcome { accepted: 2, rejected: 2 });

        let stats = profiler.stats(SortKey::Calls);
        let calls = |name: &str| {
            stats
                .iter()
                .filter(|s| s.location.function == name)
                .map(|s| s.calls)
                .sum::<u64>()
        };
        assert_eq!(calls("bench_login"), 1);
        assert_eq!(calls("login"), 4);
        assert_eq!(calls("user_passwd"), 4);
        // Unknown users never reach the encoder
        assert_eq!(calls("encrypt_passwd"), 3);
    }

    #[test]
    fn test_bench_login_lines_matches_bench_login() {
        let checker = checker();
        let cases = gen_cases(50, &mut StdRng::seed_from_u64(5));
        let a = bench_login(&checker, &cases, &Profiler::new()).unwrap();
        let profiler = Profiler::new();
        let b = bench_login_lines(&checker, &cases, &profiler).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total(), 50);

        let stats = profiler.stats(SortKey::Calls);
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s.location.function == "login_lines"));
        assert_eq!(stats[0].calls, 50);
    }

    #[test]
    fn test_bench_login_schemes_side_by_side() {
        let checkers: Vec<Checker<MemoryStore>> = PasswordScheme::ALL
            .iter()
            .map(|&scheme| {
                let encoder = PasswordEncoder::new(scheme, DEFAULT_SALT);
                let mut store = MemoryStore::new();
                store
                    .insert(VALID_LOGIN.user, &encoder.encode(VALID_LOGIN.password).unwrap())
                    .unwrap();
                Checker::new(store, encoder)
            })
            .collect();
        let cases = [VALID_LOGIN, WRONG_PASSWORD, UNKNOWN_USER];
        let profiler = Profiler::new();
        let outcomes = bench_login_schemes(&checkers, &cases, &profiler).unwrap();

        let expected = LoginOutcome { accepted: 1, rejected: 2 };
        assert_eq!(outcomes, [expected, expected]);

        let stats = profiler.stats(SortKey::Calls);
        for site in ["login_sha512_crypt", "login_sha256"] {
            let site_stats: Vec<_> = stats.iter().filter(|s| s.location.function == site).collect();
            assert_eq!(site_stats.len(), 1);
            assert_eq!(site_stats[0].calls, 3);
        }
        let lookups: u64 = stats
            .iter()
            .filter(|s| s.location.function == "user_passwd")
            .map(|s| s.calls)
            .sum();
        assert_eq!(lookups, 6);
    }

    #[test]
    fn test_encode_events_cycles() {
        let now = NaiveDate::from_ymd_opt(2021, 3, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let events = sample_events(now);
        assert_eq!(events.len(), 3);

        let mut out = Vec::new();
        let profiler = Profiler::new();
        let written = encode_events(cycle_events(&events, 10), &mut out, &profiler).unwrap();
        assert_eq!(written, 10);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "2|time=2021-03-14T12:00:00|user=bugs");
        assert_eq!(lines[1], "3|time=2021-03-14T12:00:00|user=bugs|url=/buy/carrot");
        assert_eq!(lines[2], "3|user=bugs|url=/buy/carrot|site=acme.com");
        assert_eq!(lines[3], lines[0]);
        assert_eq!(profiler.total_calls(), 10);
    }

    #[test]
    fn test_encode_events_stops_at_unknown_type() {
        let now = NaiveDate::from_ymd_opt(2021, 3, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut events = sample_events(now);
        events.insert(1, Event::new("scroll", now, "bugs", "/", "acme.com"));

        let mut out = Vec::new();
        let err = encode_events(&events, &mut out, &Profiler::new()).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownEventType(_)));
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
