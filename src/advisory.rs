//! Advisory warning sink with a process-wide enable toggle.
//!
//! The registry warns when the summed declared capacity of all partitions
//! passes the recommended budget. The warning is informational and never
//! blocks partition creation; hosts that want silence can switch the sink
//! off for the whole process. Ordinary lifecycle logging is not affected by
//! the toggle and stays under the host's subscriber filtering.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

static ADVISORY_ENABLED: AtomicBool = AtomicBool::new(true);

/// Enable or disable advisory warnings for the whole process.
///
/// Warnings are enabled by default.
pub fn set_logging_enabled(enabled: bool) {
    ADVISORY_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Whether advisory warnings are currently emitted.
pub fn logging_enabled() -> bool {
    ADVISORY_ENABLED.load(Ordering::Relaxed)
}

/// Warn that the declared capacity across all partitions passed the
/// recommended budget.
pub(crate) fn warn_over_budget(partition: &str, declared_bytes: u64, budget_bytes: u64) {
    if !logging_enabled() {
        return;
    }

    warn!(
        "partition '{}' pushes declared cache capacity to {} bytes, over the recommended budget of {} bytes",
        partition, declared_bytes, budget_bytes
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        assert!(logging_enabled());
        set_logging_enabled(false);
        assert!(!logging_enabled());
        set_logging_enabled(true);
        assert!(logging_enabled());
    }
}
