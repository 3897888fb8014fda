//! Brier: a rank-polymorphic, line-oriented interpreter for tabular data.
//!
//! This crate ties the pieces together for embedders: it splits script
//! text into lines, parses them with the default front end, and hands
//! them to a [`Script`] backed by the built-in operators.
//!
//! ```text
//! let script = brierc::load_script("[1, 2, 3]\n$1 |> sum")?;
//! assert_eq!(script.evaluate(LineIndex::new(2).unwrap())?, Value::int(6));
//! ```
//!
//! There is no CLI or REPL; results are plain [`Value`]s, serializable
//! behind the `serde` feature.

use std::sync::{Arc, Once};

pub use brier_eval::{LineStatus, Script, ScriptBuilder, ScriptConfig};
pub use brier_ir::{Dict, LineAst, LineIndex, LineParser, Rank, Scalar, Value};
pub use brier_ops::{global_registry, EvalError, EvalResult, Operand, OperatorRegistry};
pub use brier_parse::{split_script, BrierParser};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=brier_eval=debug` or `RUST_LOG=brier_ops=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_thread_names(true))
                .with(filter)
                .init();
        }
    });
}

/// Load script text with the built-in operators and default configuration.
pub fn load_script(text: &str) -> Result<Script, EvalError> {
    load_script_with(text, ScriptConfig::default(), global_registry())
}

/// Load script text with a given configuration and operator registry.
pub fn load_script_with(
    text: &str,
    config: ScriptConfig,
    registry: Arc<OperatorRegistry>,
) -> Result<Script, EvalError> {
    let lines = split_script(text);
    tracing::debug!(lines = lines.len(), "loading script");
    Script::builder(lines, BrierParser)
        .config(config)
        .registry(registry)
        .build()
}

/// Load and evaluate every line; results in line order.
pub fn run_script(text: &str) -> Result<Vec<EvalResult>, EvalError> {
    load_script(text).map(|script| script.evaluate_all())
}
