use super::error::FilterError;
use regex::{Regex, RegexBuilder};

/// Textual include/exclude rules applied to a message after the journal has
/// done the structural filtering.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    case_insensitive: bool,
}

impl Matcher {
    /// Compile both pattern lists with a single case-sensitivity setting.
    ///
    /// Order is preserved so that cheaper patterns given first short-circuit first.
    pub fn compile<I, E>(include: I, exclude: E, case_insensitive: bool) -> Result<Self, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let compile_all = |patterns: Vec<String>| -> Result<Vec<Regex>, FilterError> {
            patterns
                .into_iter()
                .map(|pattern| {
                    RegexBuilder::new(&pattern)
                        .case_insensitive(case_insensitive)
                        .build()
                        .map_err(|source| FilterError::InvalidPattern { pattern, source })
                })
                .collect()
        };

        Ok(Self {
            include: compile_all(include.into_iter().map(|p| p.as_ref().to_string()).collect())?,
            exclude: compile_all(exclude.into_iter().map(|p| p.as_ref().to_string()).collect())?,
            case_insensitive,
        })
    }

    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(Regex::as_str)
    }

    pub fn exclude_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(Regex::as_str)
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// True when the message satisfies every include pattern and no exclude pattern
    pub fn matches(&self, message: &str) -> bool {
        self.include.iter().all(|re| re.is_match(message))
            && !self.exclude.iter().any(|re| re.is_match(message))
    }
}
