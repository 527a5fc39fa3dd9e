//! Publish a preregistration commitment.
//!
//! Reads `archival/parameters.json` and writes `archival/preregistration.json`
//! with today's UTC date. Sealing is the only way to change the parameters a
//! run accepts, and it replaces the published commitment in the open.

use std::process::ExitCode;

use archival_harness::artifact_dir::write_atomic;
use archival_harness::error::RunError;
use archival_harness::layout::ArchivalLayout;
use archival_harness::telemetry;
use archival_kernel::error::ArchivalError;
use archival_kernel::preregistration::CommitmentRecord;

fn seal() -> Result<CommitmentRecord, RunError> {
    let layout = ArchivalLayout::from_current_dir()?;
    let params = layout.load_parameters()?;
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let record = CommitmentRecord::seal(&params, &date).map_err(ArchivalError::from)?;
    let bytes = record.to_canonical_bytes().map_err(|e| RunError::Canon {
        detail: e.to_string(),
    })?;
    write_atomic(layout.commitment_path(), &bytes)?;
    tracing::info!(
        event = "preregistration.sealed",
        commitment = %record.commitment,
        preregistered_on = %record.preregistered_on,
    );
    Ok(record)
}

fn main() -> ExitCode {
    telemetry::init_from_env();
    match seal() {
        Ok(record) => {
            println!("{}", record.commitment);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
