//! Writing raw buffer contents to capture side-car files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use vkscoop_core::ScoopError;

use crate::formats::AmberFormat;

// Widest single component is 64 bits.
const ZERO_PADDING: [u8; 8] = [0; 8];

/// Writes buffer elements, one format-described component group at a time,
/// padding each group out to its aligned width.
pub struct BufferFileWriter {
    file: BufWriter<File>,
}

impl BufferFileWriter {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ScoopError> {
        let file = File::create(path)?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }

    /// Write one element: the format's data bytes read from
    /// `data[read_offset..]` followed by the format's padding as zeros.
    ///
    /// A read outside `data` means the recorded stride/offset state
    /// disagrees with the buffer that was actually bound; that is a
    /// host-API violation and aborts.
    pub fn write_element(
        &mut self,
        data: &[u8],
        read_offset: usize,
        format: &AmberFormat,
    ) -> Result<(), ScoopError> {
        let data_bytes = (format.data_width_bits() / 8) as usize;
        let end = match read_offset.checked_add(data_bytes) {
            Some(end) if end <= data.len() => end,
            _ => {
                tracing::error!(
                    read_offset,
                    data_bytes,
                    source_len = data.len(),
                    "element read outside the source buffer"
                );
                panic!(
                    "element read of {data_bytes} bytes at offset {read_offset} overruns source of {} bytes",
                    data.len()
                );
            }
        };
        self.file.write_all(&data[read_offset..end])?;
        let padding = format.padding_bytes() as usize;
        if padding > 0 {
            self.file.write_all(&ZERO_PADDING[..padding])?;
        }
        Ok(())
    }

    /// Write bytes verbatim (index data).
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ScoopError> {
        self.file.write_all(bytes)?;
        Ok(())
    }

    /// Flush and close.
    pub fn finish(mut self) -> Result<(), ScoopError> {
        self.file.flush()?;
        Ok(())
    }
}
