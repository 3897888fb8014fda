//! Stack growth for deep `$N` chains.
//!
//! Resolving a line recurses into every line it references, so a script
//! where each line reads the one before it recurses once per line. The
//! resolver wraps each level in [`ensure_sufficient_stack`], which grows
//! the stack on demand instead of overflowing.

use crate::config::ScriptConfig;

/// Default red zone: grow when less than 100KB remain.
pub(crate) const RED_ZONE: usize = 100 * 1024;

/// Default growth: 1MB per allocation.
pub(crate) const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if it is within the configured red zone.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(config: &ScriptConfig, f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(config.stack_red_zone, config.stack_growth, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(_config: &ScriptConfig, f: impl FnOnce() -> R) -> R {
    f()
}
