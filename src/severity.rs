use std::fmt;

/// Monitoring result, ordered from healthy to indeterminate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    /// Classify a match count; `None` when `threshold <= 0` disables classification
    pub fn classify(match_count: u64, threshold: i64) -> Option<Severity> {
        let threshold = u64::try_from(threshold).ok().filter(|t| *t > 0)?;
        Some(if match_count >= threshold {
            Severity::Critical
        } else if match_count > 0 {
            Severity::Warning
        } else {
            Severity::Ok
        })
    }

    /// Result code understood by Nagios/Sensu style check runners
    pub fn code(self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        })
    }
}

/// How the outcome of a run is reported through the exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Exit status reflects only whether the scan itself succeeded
    #[default]
    Grep,
    /// Exit status is the severity of the match count against `threshold`
    Check { threshold: u64 },
}

/// Exit status of a grep-mode run that failed during the scan
pub const EXIT_FAILURE: u8 = 1;
/// Exit status of a grep-mode run rejected for bad usage
pub const EXIT_USAGE: u8 = 2;

impl Mode {
    pub fn is_check(self) -> bool {
        matches!(self, Mode::Check { .. })
    }

    pub fn threshold(self) -> i64 {
        match self {
            Mode::Grep => 0,
            Mode::Check { threshold } => i64::try_from(threshold).unwrap_or(i64::MAX),
        }
    }

    pub fn success_status(self, match_count: u64) -> u8 {
        Severity::classify(match_count, self.threshold()).map_or(0, Severity::code)
    }

    pub fn failure_status(self) -> u8 {
        if self.is_check() {
            Severity::Unknown.code()
        } else {
            EXIT_FAILURE
        }
    }

    pub fn usage_status(self) -> u8 {
        if self.is_check() {
            Severity::Unknown.code()
        } else {
            EXIT_USAGE
        }
    }
}
