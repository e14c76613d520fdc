//! Logging setup for the `fitsync` binary.
//!
//! `RUST_LOG` filters as usual (default `fitsync=info`); set
//! `RUST_LOG_FORMAT=json` for one JSON object per event. Logs go to stderr
//! so command output on stdout stays clean.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "fitsync=info";

fn json_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Install the global subscriber; later calls are no-ops
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = std::env::var("RUST_LOG_FORMAT").ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json_requested(format.as_deref()) {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
    }

    #[test]
    fn test_json_format_detection() {
        assert!(json_requested(Some("JSON")));
        assert!(!json_requested(Some("pretty")));
        assert!(!json_requested(None));
    }
}
