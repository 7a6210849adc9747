use std::process::ExitCode;

fn main() -> ExitCode {
    balista::cli::run()
}
