use log::debug;
use snafu::ResultExt;

use crate::error::{MonitorError, UploadAbortedSnafu};
use crate::link::{Channel, Link};

/// Window carried by one `w` command.
pub(crate) const CHUNK_SIZE: usize = 16;

/// Size of the target's persistent program memory region.
pub(crate) const ROM_CAPACITY: usize = 0x2000;

/// Writes `image` into target memory from offset 0 in consecutive 16-byte
/// windows, awaiting the ack of each before sending the next. A fault mid
/// sequence aborts immediately; windows already acknowledged stay written on
/// the target, and the error reports how many bytes that is.
pub(crate) fn upload<C: Channel>(link: &mut Link<C>, image: &[u8]) -> Result<(), MonitorError> {
    for (index, window) in image.chunks(CHUNK_SIZE).enumerate() {
        let offset = index * CHUNK_SIZE;
        write_window(link, offset, window).context(UploadAbortedSnafu { committed: offset })?;
    }
    Ok(())
}

/// Scrubs `length` bytes of target memory with all-zero windows, using the
/// same chunked write protocol as `upload`.
pub(crate) fn erase<C: Channel>(link: &mut Link<C>, length: usize) -> Result<(), MonitorError> {
    let zeros = [0u8; CHUNK_SIZE];
    let mut offset = 0;
    while offset < length {
        let window = &zeros[..CHUNK_SIZE.min(length - offset)];
        write_window(link, offset, window).context(UploadAbortedSnafu { committed: offset })?;
        offset += window.len();
    }
    Ok(())
}

fn write_window<C: Channel>(link: &mut Link<C>, offset: usize, bytes: &[u8]) -> Result<(), MonitorError> {
    let mut command = format!("w {} {}", offset, bytes.len());
    for byte in bytes {
        command.push(' ');
        command.push_str(&byte.to_string());
    }
    link.transact(&command)?;
    debug!("wrote {} bytes at {:#06x}", bytes.len(), offset);
    Ok(())
}
