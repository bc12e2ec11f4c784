use std::process::ExitCode;

fn main() -> ExitCode {
    check_journal::run()
}
