//! Archival residual-analysis entry point.
//!
//! Takes no arguments. Reads the archival layout under the working directory
//! and exits with:
//!
//! | code | meaning |
//! |---|---|
//! | 0 | success, records written |
//! | 1 | I/O or configuration failure |
//! | 2 | environment mismatch |
//! | 3 | preregistration violation |
//! | 4 | strict-mode violation |
//! | 5 | fatal execution error |

use std::process::ExitCode;

use archival_harness::runner::run_from_process;
use archival_harness::telemetry;

fn main() -> ExitCode {
    telemetry::init_from_env();
    match run_from_process() {
        Ok(outcome) => {
            println!("{}", outcome.records.forensic.display());
            println!("{}", outcome.records.audit.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
