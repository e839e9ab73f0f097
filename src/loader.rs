use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;

use crate::log;
use crate::patch;
use crate::reader::{PatchReader, StreamError};

pub const PATCH_FILE: &str = "TRANSL.DAT";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open patch file {path}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
}

pub fn apply_file(path: &Path) -> Result<ApplySummary, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::SourceUnavailable {
        path: path.display().to_string(),
        source,
    })?;
    apply_stream(BufReader::new(file))
}

/// Single pass over the stream: records apply in file order, a record the
/// applier rejects is dropped, a structural error ends the run because the
/// remaining bytes can no longer be trusted to sit on a record boundary.
pub fn apply_stream<R: Read>(src: R) -> Result<ApplySummary, LoadError> {
    let mut reader = PatchReader::new(src);
    let mut summary = ApplySummary::default();

    while let Some(record) = reader.next_record()? {
        if crate::DEBUG {
            log::write_line(&format!(
                "write {} bytes at {:#x}: {}",
                record.payload.len(),
                record.address,
                log::hex(&record.payload)
            ));
        }
        match patch::apply(&record) {
            Ok(()) => summary.applied += 1,
            Err(err) => {
                log::write_line(&format!("record skipped: {:#}", anyhow::Error::new(err)));
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}
