//! Log subscriber setup for the `repogate` binary.
//!
//! Log lines always go to stderr; stdout carries only the compliance report,
//! so `repogate check --format json` output can be piped as is.
//!
//! `RUST_LOG` takes precedence when set. Otherwise the chosen level applies
//! to repogate itself while the HTTP stack is held at `warn`, keeping
//! connection chatter out of `--verbose` runs.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates whose debug output is noise for a compliance run.
const HTTP_STACK: [&str; 5] = ["hyper", "hyper_util", "h2", "reqwest", "rustls"];

/// Directives used when `RUST_LOG` is unset or blank.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec![level.as_str().to_ascii_lowercase()];
    directives.extend(HTTP_STACK.iter().map(|krate| format!("{}=warn", krate)));
    directives.join(",")
}

/// Filter from an explicit directive string, falling back to the defaults
/// when it is missing, blank or unparsable.
fn log_filter(from_env: Option<&str>, level: Level) -> EnvFilter {
    from_env
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(json: bool, level: Level) {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(from_env.as_deref(), level);

    let output = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output = if json {
        output.json().boxed()
    } else {
        output.boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .ok();
}
