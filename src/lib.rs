pub mod cli;
pub mod config;
pub mod errors;
pub mod filter;
pub mod journal;
pub mod query;
pub mod scan;
pub mod severity;
pub mod state;

pub use cli::{Cli, Invocation};
pub use errors::{CheckError, ErrorClass};
pub use filter::{FilterOptions, FilterSpec, Matcher, Scope};
pub use journal::{Cursor, ExportSource, Journal, JournalError, JournalSource, MemoryStore};
pub use query::{Clause, Query, build_query};
pub use scan::{ScanResult, Scanner};
pub use severity::{Mode, Severity};
pub use state::CursorStore;

use clap::Parser;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a tracing filter that overrides `--verbose`
pub const LOG_ENV: &str = "CHECK_JOURNAL_LOG";

/// Route diagnostics to stderr so stdout carries only match lines
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "off",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when running inside tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Load the saved cursor, scan, and save the new cursor
pub fn execute(invocation: &Invocation, out: &mut dyn Write) -> Result<ScanResult, CheckError> {
    let store = invocation.state_file.as_ref().map(CursorStore::new);
    let last = match &store {
        Some(store) => store.load()?,
        None => None,
    };
    match &last {
        Some(cursor) => info!(%cursor, "loaded saved cursor"),
        None => debug!("no saved cursor; scanning from the start of the journal"),
    }

    let scanner = Scanner::new(&invocation.filter, &invocation.config.fields);
    let sink = (!invocation.quiet).then_some(out);
    let result = match &invocation.export_file {
        Some(path) => scanner.run(&ExportSource::new(path), last.as_ref(), sink)?,
        None => scan_local_journal(&scanner, last.as_ref(), sink)?,
    };

    if let (Some(store), Some(cursor)) = (&store, &result.next_cursor) {
        store.save(cursor)?;
        info!(%cursor, path = %store.path().display(), "saved cursor");
    }
    Ok(result)
}

#[cfg(feature = "systemd")]
fn scan_local_journal(
    scanner: &Scanner<'_>,
    last: Option<&Cursor>,
    out: Option<&mut dyn Write>,
) -> Result<ScanResult, CheckError> {
    scanner.run(&journal::systemd::SystemdSource, last, out)
}

#[cfg(not(feature = "systemd"))]
fn scan_local_journal(
    _scanner: &Scanner<'_>,
    _last: Option<&Cursor>,
    _out: Option<&mut dyn Write>,
) -> Result<ScanResult, CheckError> {
    Err(JournalError::backend(
        "open journal",
        "built without the `systemd` feature; rebuild with --features systemd or pass --export-file",
    )
    .into())
}

/// Prints fatal diagnostics and picks the exit status for them
struct Reporter {
    program: String,
    mode: Mode,
    quiet: bool,
}

impl Reporter {
    fn fail(&self, err: &CheckError) -> u8 {
        let class = err.class();
        error!(?class, "{err}");
        if self.quiet || self.mode.is_check() {
            eprintln!("{err}");
        } else {
            eprintln!("{}: {err}", self.program);
        }
        match class {
            ErrorClass::Usage => self.mode.usage_status(),
            ErrorClass::Resource | ErrorClass::CursorInvalid => self.mode.failure_status(),
        }
    }
}

/// Run with explicit arguments and return the process exit status
pub fn run_from<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let program = cli::program_name(args.first());

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => cli::sniff_mode(&args).usage_status(),
            };
            let _ = e.print();
            return status;
        }
    };

    init_logging(cli.verbose);
    let reporter = Reporter {
        program,
        mode: cli.reporting_mode(),
        quiet: cli.quiet,
    };

    let invocation = match cli.into_invocation() {
        Ok(invocation) => invocation,
        Err(e) => return reporter.fail(&e),
    };
    debug!(mode = ?invocation.mode, state_file = ?invocation.state_file, "starting scan");

    let mut stdout = io::BufWriter::new(io::stdout().lock());
    match execute(&invocation, &mut stdout) {
        Ok(result) => {
            let status = invocation.mode.success_status(result.match_count);
            if let Some(severity) =
                Severity::classify(result.match_count, invocation.mode.threshold())
            {
                info!(matches = result.match_count, %severity, "check result");
            }
            status
        }
        Err(e) => {
            drop(stdout);
            reporter.fail(&e)
        }
    }
}

pub fn run() -> ExitCode {
    ExitCode::from(run_from(std::env::args_os()))
}
