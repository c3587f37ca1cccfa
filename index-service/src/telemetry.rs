use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets emitted by the indexing pipeline crates.
pub const TARGET_PREFIXES: [&str; 4] = [
    "index_service",
    "vector_store",
    "embedding_service",
    "code_chunker",
];

/// Compact RFC3339 UTC timestamps, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

fn is_pipeline_target(target: &str) -> bool {
    TARGET_PREFIXES.iter().any(|p| target.starts_with(p))
}

/// Formatting layer that renders only pipeline events.
///
/// Single-line output with timestamps, target and `file:line`; span close
/// events carry durations. ANSI colors only on a terminal. The per-layer
/// filter leaves events of other crates to other layers.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_pipeline = filter::filter_fn(|meta| is_pipeline_target(meta.target()));

    // The format goes first: later setters adjust it instead of being replaced.
    fmt::layer()
        .event_format(fmt::format().compact())
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_filter(only_pipeline)
}

/// `<target>=<level>` directives for every pipeline crate.
pub fn level_directives(level: Level) -> Vec<Directive> {
    let lvl = level.as_str().to_lowercase();
    TARGET_PREFIXES
        .iter()
        .filter_map(|t| Directive::from_str(&format!("{t}={lvl}")).ok())
        .collect()
}

/// `RUST_LOG` (or `default`) plus `level` for the pipeline crates.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    level_directives(level)
        .into_iter()
        .fold(base, |f, d| f.add_directive(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_targets_match_by_prefix() {
        assert!(is_pipeline_target("index_service::worker"));
        assert!(is_pipeline_target("vector_store"));
        assert!(!is_pipeline_target("hyper::client"));
    }

    #[test]
    fn one_directive_per_crate() {
        let d = level_directives(Level::DEBUG);
        assert_eq!(d.len(), TARGET_PREFIXES.len());
        assert_eq!(d[0].to_string(), "index_service=debug");
    }
}
