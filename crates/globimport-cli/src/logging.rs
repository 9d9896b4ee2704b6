//! Logging initialization for the CLI.
//!
//! stdout belongs to the command output: the transformed module (or its
//! JSON result) for `transform`, one update payload per line for `watch`.
//! Every log line goes to stderr, so piping stdout never mixes the two.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Targets raised to the requested verbosity.
const TARGETS: &[&str] = &["globimport", "globimport_core"];

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` sets the baseline (default `warn`); the binary and the core
/// library then log at INFO, DEBUG with `-v` or TRACE with `-vv`. With
/// `json` each event is a JSON object on its own stderr line.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = crate_directives(level).into_iter().fold(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy(),
        EnvFilter::add_directive,
    );

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn crate_directives(level: LevelFilter) -> Vec<Directive> {
    TARGETS
        .iter()
        .filter_map(|target| format!("{target}={level}").parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_directives() {
        let directives: Vec<String> = crate_directives(LevelFilter::DEBUG)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(directives, vec!["globimport=debug", "globimport_core=debug"]);
    }
}
