use super::error::FilterError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Syslog priority names indexed by numeric level
static PRIORITY_NAMES: LazyLock<BTreeMap<u8, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        (0, "emerg"),
        (1, "alert"),
        (2, "crit"),
        (3, "err"),
        (4, "warning"),
        (5, "notice"),
        (6, "info"),
        (7, "debug"),
    ])
});

/// Syslog facility names indexed by numeric code.
///
/// Codes 12-15 (ntp, security, console, clock daemon) have no portable name and
/// are only reachable numerically.
static FACILITY_NAMES: LazyLock<BTreeMap<u8, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        (0, "kern"),
        (1, "user"),
        (2, "mail"),
        (3, "daemon"),
        (4, "auth"),
        (5, "syslog"),
        (6, "lpr"),
        (7, "news"),
        (8, "uucp"),
        (9, "cron"),
        (10, "authpriv"),
        (11, "ftp"),
        (16, "local0"),
        (17, "local1"),
        (18, "local2"),
        (19, "local3"),
        (20, "local4"),
        (21, "local5"),
        (22, "local6"),
        (23, "local7"),
    ])
});

static PRIORITY_CODES: LazyLock<HashMap<&'static str, u8>> =
    LazyLock::new(|| reverse(&PRIORITY_NAMES));
static FACILITY_CODES: LazyLock<HashMap<&'static str, u8>> =
    LazyLock::new(|| reverse(&FACILITY_NAMES));

pub const MAX_PRIORITY: u8 = 7;
pub const MAX_FACILITY: u8 = 23;

fn reverse(names: &BTreeMap<u8, &'static str>) -> HashMap<&'static str, u8> {
    names.iter().map(|(code, name)| (*name, *code)).collect()
}

/// Resolve `s` either as a decimal code in `0..=max` or as a symbolic name.
fn lookup(s: &str, max: u8, codes: &HashMap<&'static str, u8>) -> Option<u8> {
    if let Ok(n) = s.parse::<i64>() {
        return (0..=i64::from(max)).contains(&n).then_some(n as u8);
    }
    codes.get(s.to_ascii_lowercase().as_str()).copied()
}

/// Syslog priority; lower values are more severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub fn new(level: u8) -> Option<Self> {
        (level <= MAX_PRIORITY).then_some(Priority(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Every priority at least as severe as `self`, most severe first
    pub fn at_or_above(self) -> impl Iterator<Item = Priority> {
        (0..=self.0).map(Priority)
    }
}

impl FromStr for Priority {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s, MAX_PRIORITY, &PRIORITY_CODES)
            .map(Priority)
            .ok_or_else(|| FilterError::InvalidPriority(s.to_string()))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Syslog facility code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Facility(u8);

impl Facility {
    pub fn new(code: u8) -> Option<Self> {
        (code <= MAX_FACILITY).then_some(Facility(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// Symbolic name, if the code has one
    pub fn name(self) -> Option<&'static str> {
        FACILITY_NAMES.get(&self.0).copied()
    }
}

impl FromStr for Facility {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s, MAX_FACILITY, &FACILITY_CODES)
            .map(Facility)
            .ok_or_else(|| FilterError::InvalidFacility(s.to_string()))
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority_numeric_and_symbolic() {
        assert_eq!("3".parse::<Priority>().unwrap().level(), 3);
        assert_eq!("err".parse::<Priority>().unwrap().level(), 3);
        assert_eq!("EMERG".parse::<Priority>().unwrap().level(), 0);
        assert_eq!("debug".parse::<Priority>().unwrap().level(), 7);
    }

    #[test]
    fn test_parse_priority_out_of_range() {
        assert!("8".parse::<Priority>().is_err());
        assert!("-1".parse::<Priority>().is_err());
        assert!("error".parse::<Priority>().is_err());
        assert!("".parse::<Priority>().is_err());
    }

    #[test]
    fn test_parse_facility_gaps_are_numeric_only() {
        assert_eq!("12".parse::<Facility>().unwrap().code(), 12);
        assert_eq!(Facility::new(12).unwrap().name(), None);
        assert_eq!("local7".parse::<Facility>().unwrap().code(), 23);
        assert!("24".parse::<Facility>().is_err());
        assert!("ntp".parse::<Facility>().is_err());
    }

    #[test]
    fn test_numeric_and_symbolic_facility_are_equal() {
        let by_name: Facility = "cron".parse().unwrap();
        let by_code: Facility = "9".parse().unwrap();
        assert_eq!(by_name, by_code);
        assert_eq!(by_code.name(), Some("cron"));
    }

    #[test]
    fn test_priority_ceiling_expansion() {
        let levels: Vec<u8> = Priority::new(3)
            .unwrap()
            .at_or_above()
            .map(Priority::level)
            .collect();
        assert_eq!(levels, vec![0, 1, 2, 3]);
        assert_eq!(Priority::new(0).unwrap().at_or_above().count(), 1);
    }
}
