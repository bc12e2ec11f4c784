//! Filter criteria for a journal scan
//!
//! Filtering happens in two stages. Structural criteria (unit, priority
//! ceiling, facilities) are turned into journal matches by [`crate::query`]
//! and evaluated by the journal itself. Textual criteria (include and exclude
//! regular expressions) are evaluated here by [`Matcher`] on each message the
//! journal hands back.
//!
//! # Semantics
//!
//! ```text
//! --unit=sshd.service        unit field equals the name
//! --priority=err             PRIORITY is 0, 1, 2 or 3
//! --facility=cron            SYSLOG_FACILITY is 9 (repeatable, ORed)
//! -e PATTERN                 message matches PATTERN (repeatable, ANDed)
//! -v PATTERN                 message does not match PATTERN (repeatable, any match rejects)
//! -i                         all patterns ignore case
//! ```
//!
//! Groups combine with AND; an absent group places no restriction.

pub mod error;
pub mod matcher;
pub mod parser;

pub use error::FilterError;
pub use matcher::Matcher;
pub use parser::{Facility, Priority};

use std::collections::BTreeSet;

/// Which journals a scan reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// System journal of the local machine
    #[default]
    LocalSystem,
    /// Journal of the invoking user on the local machine
    LocalUser,
}

/// Raw filter options as given on the command line
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub scope: Scope,
    pub unit: Option<String>,
    pub priority: Option<String>,
    pub facilities: Vec<String>,
    pub patterns: Vec<String>,
    pub inverts: Vec<String>,
    pub ignore_case: bool,
}

impl FilterOptions {
    /// Validate every option and compile the patterns
    pub fn build(&self) -> Result<FilterSpec, FilterError> {
        let unit = match &self.unit {
            Some(unit) if unit.trim().is_empty() => {
                return Err(FilterError::InvalidUnit(unit.clone()));
            }
            other => other.clone(),
        };

        let max_priority = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?;

        let facilities = self
            .facilities
            .iter()
            .map(|f| f.parse::<Facility>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        let matcher = Matcher::compile(&self.patterns, &self.inverts, self.ignore_case)?;

        Ok(FilterSpec {
            scope: self.scope,
            unit,
            max_priority,
            facilities,
            matcher,
        })
    }
}

/// Validated, immutable filter criteria for one invocation
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub scope: Scope,
    pub unit: Option<String>,
    /// Severity ceiling; entries at this priority or more severe pass
    pub max_priority: Option<Priority>,
    pub facilities: BTreeSet<Facility>,
    pub matcher: Matcher,
}
