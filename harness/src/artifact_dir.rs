//! Run record persistence.
//!
//! Both records are staged as temporary files in the destination directory
//! and only then renamed into place, so a failed write leaves neither record
//! behind and a reader sees either a complete record or nothing. The forensic
//! artifact is renamed first; an audit record never exists without the
//! artifact it references. An existing audit record is never overwritten.

use std::path::{Path, PathBuf};

use crate::error::RunError;
use crate::layout::ArchivalLayout;

/// Paths of the records written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRecords {
    pub forensic: PathBuf,
    pub audit: PathBuf,
}

/// Name parts of the audit record.
#[derive(Debug, Clone, Copy)]
pub struct AuditName<'a> {
    pub fingerprint_short: &'a str,
    pub timestamp: &'a str,
    pub run_tag: &'a str,
}

/// Stage both records, then rename the forensic artifact and the audit
/// record into place.
///
/// # Errors
///
/// Returns [`RunError::Io`] if staging or either rename fails, or if the
/// audit record already exists.
pub fn write_run_records(
    layout: &ArchivalLayout,
    forensic_bytes: &[u8],
    audit_bytes: &[u8],
    name: AuditName<'_>,
) -> Result<WrittenRecords, RunError> {
    let forensic = layout.forensic_path();
    let audit = layout.audit_path(name.fingerprint_short, name.timestamp, name.run_tag);
    if audit.exists() {
        return Err(RunError::Io {
            path: audit.display().to_string(),
            detail: "audit record already exists; refusing to overwrite".into(),
        });
    }

    let staged_forensic = Staged::write(&forensic, forensic_bytes)?;
    let staged_audit = match Staged::write(&audit, audit_bytes) {
        Ok(staged) => staged,
        Err(e) => {
            staged_forensic.discard();
            return Err(e);
        }
    };

    if let Err(e) = staged_forensic.commit() {
        staged_audit.discard();
        return Err(e);
    }
    staged_audit.commit()?;
    Ok(WrittenRecords { forensic, audit })
}

/// Write `content` to `path` via a temporary sibling and a rename.
///
/// # Errors
///
/// Returns [`RunError::Io`] naming the path that failed.
pub fn write_atomic(path: impl AsRef<Path>, content: &[u8]) -> Result<(), RunError> {
    Staged::write(path.as_ref(), content)?.commit()
}

/// A fully written temporary sibling awaiting its rename.
struct Staged {
    temp: PathBuf,
    target: PathBuf,
}

impl Staged {
    fn write(target: &Path, content: &[u8]) -> Result<Self, RunError> {
        let dir = target.parent().ok_or_else(|| RunError::Io {
            path: target.display().to_string(),
            detail: "no parent directory".into(),
        })?;
        let temp = dir.join(format!(
            ".tmp_{}",
            target.file_name().unwrap_or_default().to_string_lossy()
        ));
        std::fs::write(&temp, content).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            RunError::Io {
                path: temp.display().to_string(),
                detail: format!("write: {e}"),
            }
        })?;
        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    fn commit(self) -> Result<(), RunError> {
        std::fs::rename(&self.temp, &self.target).map_err(|e| {
            let detail = format!("rename from {}: {e}", self.temp.display());
            self.discard();
            RunError::Io {
                path: self.target.display().to_string(),
                detail,
            }
        })
    }

    fn discard(&self) {
        let _ = std::fs::remove_file(&self.temp);
    }
}
