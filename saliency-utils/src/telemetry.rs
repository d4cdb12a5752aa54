//! Lightweight timing utilities for optional performance tracing.
//!
//! A simple RAII guard records the elapsed duration of a scoped operation and
//! logs it when dropped. Logging only occurs when telemetry has been enabled
//! and the requested log level is active, keeping the overhead negligible
//! otherwise.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use log::{Level, log, log_enabled};

static TELEMETRY_ENABLED: AtomicBool = AtomicBool::new(false);

/// RAII helper that logs how long an operation took when dropped.
///
/// Guards are usually created via [`timing_guard`] or [`timing_guard_if`] so
/// most callers do not need to interact with this type directly.
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    fn new(label: Cow<'static, str>, level: Level, active: bool) -> Self {
        Self {
            label,
            level,
            start: Instant::now(),
            active,
        }
    }

    /// Returns `true` when the guard will emit a log entry on drop.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the elapsed duration since the guard was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            let duration = self.start.elapsed();
            log!(
                target: "saliency::telemetry",
                self.level,
                "{} completed in {:.2?}",
                self.label,
                duration
            );
        }
    }
}

/// Create a timing guard that logs at the provided level when telemetry is on.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    timing_guard_if(label, level, true)
}

/// Create a timing guard that also respects an explicit boolean flag.
///
/// This variant gives callers the ability to toggle individual guards at
/// runtime in addition to the process-wide telemetry switch.
pub fn timing_guard_if(
    label: impl Into<Cow<'static, str>>,
    level: Level,
    enabled: bool,
) -> TimingGuard {
    let label = label.into();
    let active =
        enabled && telemetry_enabled() && log_enabled!(target: "saliency::telemetry", level);
    TimingGuard::new(label, level, active)
}

/// Toggle the process-wide telemetry switch.
pub fn set_telemetry_enabled(enabled: bool) {
    TELEMETRY_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns whether telemetry logging is currently enabled.
pub fn telemetry_enabled() -> bool {
    TELEMETRY_ENABLED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_stay_inactive_when_telemetry_is_off() {
        set_telemetry_enabled(false);
        let guard = timing_guard("test_op", Level::Debug);
        assert!(!guard.is_active());
    }

    #[test]
    fn explicit_flag_overrides_guard_activation() {
        set_telemetry_enabled(true);
        let guard = timing_guard_if("test_op", Level::Debug, false);
        assert!(!guard.is_active());
        set_telemetry_enabled(false);
    }
}
