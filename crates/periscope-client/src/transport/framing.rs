//! Newline-delimited framing for stream transports.

use std::io::{self, BufRead, Read, Write};

use super::TransportError;

/// Maximum size of a single inbound message in bytes.
pub(crate) const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Reads one newline-terminated frame.
///
/// Returns `Ok(None)` at end of stream. A trailing partial line at end of
/// stream is returned as a final frame. Blank lines are skipped.
pub(crate) fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<String>, TransportError> {
    loop {
        let mut buffer = Vec::new();
        let limit = u64::try_from(MAX_FRAME_BYTES).unwrap_or(u64::MAX).saturating_add(1);
        let read = read_until_with_retry(&mut reader.by_ref().take(limit), &mut buffer)?;
        if read == 0 {
            return Ok(None);
        }
        if buffer.len() > MAX_FRAME_BYTES {
            return Err(TransportError::FrameTooLarge {
                max_size: MAX_FRAME_BYTES,
            });
        }

        let text = String::from_utf8(buffer).map_err(|_| TransportError::InvalidUtf8)?;
        let trimmed = text.trim_end();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_owned()));
        }
    }
}

/// Writes `message` followed by a newline and flushes.
pub(crate) fn write_frame<W: Write>(writer: &mut W, message: &str) -> io::Result<()> {
    writer.write_all(message.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn read_until_with_retry<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<usize> {
    loop {
        match reader.read_until(b'\n', buffer) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}
