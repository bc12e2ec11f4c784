use crate::config::{ProbeConfig, load_config};
use crate::errors::CheckError;
use crate::filter::{FilterError, FilterOptions, FilterSpec, Scope};
use crate::severity::Mode;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Count new journal entries matching the given filters.
///
/// Without --check the matches are printed like grep(1). With --check the
/// exit status is a monitoring result: 0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN.
#[derive(Debug, Parser)]
#[command(name = "check-journal", author, version, about, long_about = None)]
pub struct Cli {
    /// File keeping the journal position between runs
    #[arg(short = 'f', long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Read the journal of the current user instead of the system journal
    #[arg(long)]
    pub user: bool,

    /// Only entries of this systemd unit
    #[arg(short, long, value_name = "UNIT")]
    pub unit: Option<String>,

    /// Only entries at this priority or more severe (0-7 or emerg..debug)
    #[arg(short, long, value_name = "PRIORITY")]
    pub priority: Option<String>,

    /// Only entries of this syslog facility (0-23 or a name); repeatable
    #[arg(long, value_name = "FACILITY")]
    pub facility: Vec<String>,

    /// Message must match PATTERN; repeatable, all must match
    #[arg(short = 'e', long = "regexp", value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Ignore case in every pattern
    #[arg(short, long)]
    pub ignore_case: bool,

    /// Message must not match PATTERN; repeatable, any match rejects
    #[arg(short = 'v', long = "invert-match", value_name = "PATTERN")]
    pub inverts: Vec<String>,

    /// Do not print matching entries
    #[arg(short, long)]
    pub quiet: bool,

    /// Report CRITICAL when at least NUM entries match, WARNING when fewer do
    #[arg(
        long,
        value_name = "NUM",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1"
    )]
    pub check: Option<i64>,

    /// TOML file overriding the journal field names
    #[arg(long, value_name = "FILE", env = "CHECK_JOURNAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read entries from a `journalctl --output=json` export instead of the local journal
    #[arg(long, value_name = "FILE")]
    pub export_file: Option<PathBuf>,

    /// Log diagnostics to stderr; repeat for more detail
    #[arg(long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Everything one run needs, fixed before the scan starts
#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub quiet: bool,
    pub state_file: Option<PathBuf>,
    pub export_file: Option<PathBuf>,
    pub filter: FilterSpec,
    pub config: ProbeConfig,
}

impl Cli {
    pub fn mode(&self) -> Result<Mode, FilterError> {
        match self.check {
            None => Ok(Mode::Grep),
            Some(n) if n > 0 => Ok(Mode::Check {
                threshold: n as u64,
            }),
            Some(n) => Err(FilterError::InvalidThreshold(n.to_string())),
        }
    }

    /// Mode used to report failures.
    ///
    /// A rejected `--check` value never enabled threshold mode, so it is
    /// reported with grep-mode statuses.
    pub fn reporting_mode(&self) -> Mode {
        self.mode().unwrap_or(Mode::Grep)
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            scope: if self.user {
                Scope::LocalUser
            } else {
                Scope::LocalSystem
            },
            unit: self.unit.clone(),
            priority: self.priority.clone(),
            facilities: self.facility.clone(),
            patterns: self.patterns.clone(),
            inverts: self.inverts.clone(),
            ignore_case: self.ignore_case,
        }
    }

    pub fn into_invocation(self) -> Result<Invocation, CheckError> {
        let mode = self.mode()?;
        let filter = self.filter_options().build()?;
        let config = load_config(self.config.as_deref())?;

        Ok(Invocation {
            mode,
            quiet: self.quiet,
            state_file: self.state_file,
            export_file: self.export_file,
            filter,
            config,
        })
    }
}

/// Mode implied by raw arguments that clap rejected
pub fn sniff_mode(args: &[OsString]) -> Mode {
    let check = args.iter().skip(1).any(|arg| match arg.to_str() {
        Some("--check") => true,
        Some(s) => s
            .strip_prefix("--check=")
            .and_then(|n| n.parse::<i64>().ok())
            .is_some_and(|n| n > 0),
        None => false,
    });
    if check {
        Mode::Check { threshold: 1 }
    } else {
        Mode::Grep
    }
}

/// Basename of argv[0], used to prefix diagnostics
pub fn program_name(arg0: Option<&OsString>) -> String {
    arg0.map(PathBuf::from)
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "check-journal".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("check-journal").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_repeatable_flags_accumulate_in_order() {
        let cli = parse(&["-e", "b", "--regexp=a", "-v", "z", "--invert-match", "y"]);
        assert_eq!(cli.patterns, ["b", "a"]);
        assert_eq!(cli.inverts, ["z", "y"]);

        let cli = parse(&["--facility=cron", "--facility", "9"]);
        assert_eq!(cli.facility, ["cron", "9"]);
    }

    #[test]
    fn test_check_value_is_optional() {
        assert_eq!(parse(&[]).mode().unwrap(), Mode::Grep);
        assert_eq!(parse(&["--check"]).mode().unwrap(), Mode::Check { threshold: 1 });
        assert_eq!(
            parse(&["--check=5"]).mode().unwrap(),
            Mode::Check { threshold: 5 }
        );
    }

    #[test]
    fn test_non_positive_check_is_rejected() {
        let cli = parse(&["--check=0"]);
        assert!(matches!(cli.mode(), Err(FilterError::InvalidThreshold(_))));
        assert_eq!(cli.reporting_mode(), Mode::Grep);
    }

    #[test]
    fn test_check_does_not_swallow_next_argument() {
        let cli = parse(&["--check", "-q"]);
        assert_eq!(cli.check, Some(1));
        assert!(cli.quiet);
    }

    #[test]
    fn test_user_flag_selects_user_scope() {
        assert_eq!(parse(&["--user"]).filter_options().scope, Scope::LocalUser);
        assert_eq!(parse(&[]).filter_options().scope, Scope::LocalSystem);
    }

    #[test]
    fn test_invocation_validates_filters() {
        let err = parse(&["--priority=loud"]).into_invocation().unwrap_err();
        assert!(matches!(err, CheckError::Filter(FilterError::InvalidPriority(_))));

        let inv = parse(&["-u", "sshd.service", "-p", "err", "-i", "-e", "FAIL"])
            .into_invocation()
            .unwrap();
        assert_eq!(inv.filter.unit.as_deref(), Some("sshd.service"));
        assert!(inv.filter.matcher.matches("auth fail"));
    }

    #[test]
    fn test_sniff_mode() {
        let args = |v: &[&str]| v.iter().map(OsString::from).collect::<Vec<_>>();
        assert!(sniff_mode(&args(&["prog", "--bogus", "--check=4"])).is_check());
        assert!(sniff_mode(&args(&["prog", "--bogus", "--check"])).is_check());
        assert!(!sniff_mode(&args(&["prog", "--check=x"])).is_check());
        assert!(!sniff_mode(&args(&["prog", "--check=-2"])).is_check());
        assert!(!sniff_mode(&args(&["prog", "--bogus"])).is_check());
        assert!(!sniff_mode(&args(&["--check"])).is_check());
    }

    #[test]
    fn test_program_name_is_basename() {
        let arg0 = OsString::from("/usr/lib/monitoring/check-journal");
        assert_eq!(program_name(Some(&arg0)), "check-journal");
        assert_eq!(program_name(None), "check-journal");
    }
}
