//! Translation of structural filters into journal matches
//!
//! The journal only understands `FIELD=value` equality matches combined into
//! OR-terms and AND-groups, so a priority ceiling becomes one equality match
//! per level and a unit becomes one match per configured unit field.

use crate::config::FieldNames;
use crate::filter::FilterSpec;
use crate::journal::{Journal, JournalError};
use std::fmt;

/// One step of the match sequence handed to the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Match { field: String, value: String },
    Or,
    And,
}

impl Clause {
    fn equals(field: &str, value: impl ToString) -> Self {
        Clause::Match {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Conjunction of disjunction groups, stored as the flat clause sequence
/// `m (Or m)* (And m (Or m)*)*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append an OR-group; an empty group is the identity and adds nothing
    fn push_group(&mut self, group: Vec<Clause>) {
        if group.is_empty() {
            return;
        }
        if !self.clauses.is_empty() {
            self.clauses.push(Clause::And);
        }
        for (idx, clause) in group.into_iter().enumerate() {
            if idx > 0 {
                self.clauses.push(Clause::Or);
            }
            self.clauses.push(clause);
        }
    }

    /// Install the matches on an open session
    pub fn install<J: Journal>(&self, journal: &mut J) -> Result<(), JournalError> {
        for clause in &self.clauses {
            match clause {
                Clause::Match { field, value } => journal.add_match(field, value)?,
                Clause::Or => journal.add_disjunction()?,
                Clause::And => journal.add_conjunction()?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("(all entries)");
        }
        f.write_str("(")?;
        for clause in &self.clauses {
            match clause {
                Clause::Match { field, value } => write!(f, "{field}={value}")?,
                Clause::Or => f.write_str(" OR ")?,
                Clause::And => f.write_str(") AND (")?,
            }
        }
        f.write_str(")")
    }
}

/// Build `unit AND priority AND facility`, omitting absent groups
pub fn build_query(spec: &FilterSpec, fields: &FieldNames) -> Query {
    let mut query = Query::default();

    if let Some(unit) = &spec.unit {
        query.push_group(
            fields
                .unit_fields(spec.scope)
                .iter()
                .map(|field| Clause::equals(field, unit))
                .collect(),
        );
    }

    if let Some(ceiling) = spec.max_priority {
        query.push_group(
            ceiling
                .at_or_above()
                .map(|priority| Clause::equals(&fields.priority, priority))
                .collect(),
        );
    }

    query.push_group(
        spec.facilities
            .iter()
            .map(|facility| Clause::equals(&fields.facility, facility))
            .collect(),
    );

    query
}
