use thiserror::Error;

/// Errors raised while turning command-line filter options into a `FilterSpec`
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid priority '{0}': expected 0-7 or one of emerg, alert, crit, err, warning, notice, info, debug")]
    InvalidPriority(String),

    #[error("invalid facility '{0}': expected 0-23 or a syslog facility name such as kern, mail, cron, local0")]
    InvalidFacility(String),

    #[error("invalid unit '{0}': unit name must not be empty")]
    InvalidUnit(String),

    #[error("syntax error in pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid number '{0}': threshold must be a positive integer")]
    InvalidThreshold(String),
}
