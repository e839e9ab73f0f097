use std::io::{self, Read};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("record at {address:#x} has a truncated header: {got} of 4 length bytes")]
    MalformedStream { address: i64, got: usize },
    #[error("record at {address:#x} declares {declared} payload bytes, stream had {got}")]
    TruncatedPayload {
        address: i64,
        declared: u32,
        got: usize,
    },
    #[error("patch stream read failed")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
pub struct PatchRecord {
    pub address: i64,
    pub payload: Vec<u8>,
}

pub struct PatchReader<R> {
    src: R,
}

impl<R: Read> PatchReader<R> {
    pub fn new(src: R) -> Self {
        PatchReader { src }
    }

    /// A short read inside the address field means the producer is exhausted;
    /// a short read anywhere after that is corruption.
    pub fn next_record(&mut self) -> Result<Option<PatchRecord>, StreamError> {
        let mut address = [0u8; 8];
        if fill(&mut self.src, &mut address)? < address.len() {
            return Ok(None);
        }
        let address = i64::from_ne_bytes(address);

        let mut length = [0u8; 4];
        let got = fill(&mut self.src, &mut length)?;
        if got < length.len() {
            return Err(StreamError::MalformedStream { address, got });
        }
        let length = u32::from_ne_bytes(length);

        // the declared length is untrusted; let the stream prove it has that
        // many bytes instead of reserving all of them up front
        let mut payload = Vec::with_capacity(length.min(0x10000) as usize);
        let got = (&mut self.src)
            .take(u64::from(length))
            .read_to_end(&mut payload)?;
        if got < length as usize {
            return Err(StreamError::TruncatedPayload {
                address,
                declared: length,
                got,
            });
        }

        Ok(Some(PatchRecord { address, payload }))
    }
}

fn fill<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
