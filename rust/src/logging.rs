//! Logging macros for the leveling engine with verbosity level control.
//!
//! Output goes to stderr and costs nothing when the level is not reached.
//! Levels:
//! - 0: SILENT (warnings only)
//! - 1: CHANGES (delays applied, dates persisted)
//! - 2: CHECKS (conflict selection, victim ranking)
//! - 3: DEBUG (per-iteration detection details)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: task delays, persisted date updates, collaborator calls.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: which conflict was picked and how its tasks ranked.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}

/// Log a warning regardless of verbosity.
///
/// Reserved for degraded paths the caller cannot see in the response body:
/// failed notifications, suspicious calendar data.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        eprintln!("warning: {}", format_args!($($arg)*));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_compile() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "delayed {}", "t1");
        log_checks!(verbosity, "ranked {} tasks", 2);
        log_debug!(verbosity, "iteration {}", 3);
        log_warning!("calendar {} has overlapping entries", "c1");
    }
}
