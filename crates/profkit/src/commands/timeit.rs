use std::hint::black_box;
use std::time::Duration;

use crate::error::Result;
use crate::lookup::{use_catch, use_get};
use crate::report;
use crate::timing::Timing;

/// Key present in the lookup table
pub const PRESENT_KEY: &str = "a";
/// Key absent from the lookup table
pub const MISSING_KEY: &str = "x";

/// Time both lookup styles for a present and a missing key
pub fn measure(number: u64, repeat: usize, budget: Option<Duration>) -> Vec<Timing> {
    let snippets: [(&str, fn(&str) -> i64, &str); 4] = [
        ("use_catch(present)", use_catch, PRESENT_KEY),
        ("use_get(present)", use_get, PRESENT_KEY),
        ("use_catch(missing)", use_catch, MISSING_KEY),
        ("use_get(missing)", use_get, MISSING_KEY),
    ];

    snippets
        .into_iter()
        .map(|(label, lookup, key)| {
            let f = || {
                black_box(lookup(black_box(key)));
            };
            match budget {
                Some(budget) => Timing::measure_within(label, repeat, number, budget, f),
                None => Timing::measure(label, repeat, number, f),
            }
        })
        .collect()
}

pub fn run(number: u64, repeat: usize, budget: Option<Duration>) -> Result<()> {
    let timings = measure(number, repeat, budget);

    println!(
        "# timeit | {} calls per run | best of {}",
        report::format_count(number),
        repeat
    );
    println!();
    println!(
        "{:<20}  {:>8}  {:>12}  {:>12}",
        "SNIPPET", "RUNS", "BEST", "PER CALL"
    );
    println!("{}", "-".repeat(58));
    for timing in &timings {
        println!(
            "{:<20}  {:>8}  {:>12}  {:>12}",
            timing.label,
            timing.runs.len(),
            report::format_secs(timing.best()),
            format!("{}ns", timing.per_call().as_nanos())
        );
    }

    Ok(())
}
