//! Quiet-mode aware logging. When VENVCALL_QUIET=1 (e.g. batch runs), suppress INFO chatter.
//! Uses `tracing::info!` so output is captured by the tracing subscriber.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

pub fn is_quiet() -> bool {
    venvcall_core::config::ObservabilityConfig::from_env().quiet
}
