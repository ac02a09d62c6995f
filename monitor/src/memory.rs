pub const PAGE_SIZE: usize = 256;
pub const PAGE_COUNT: usize = 256;

/// Value of a byte nothing has fetched yet.
const UNFETCHED: u8 = 0xff;

/// Local mirror of the target's 64 KiB address space, filled in 256-byte
/// pages as the operator looks at them. Purely a cache: staleness is normal,
/// and anything that needs a guaranteed-fresh byte probes the target again.
pub struct MemoryImage {
    buffer: Vec<u8>,
}

impl MemoryImage {
    pub(crate) fn new() -> MemoryImage {
        MemoryImage {
            buffer: vec![UNFETCHED; PAGE_SIZE * PAGE_COUNT],
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        self.buffer[address as usize]
    }

    pub(crate) fn write(&mut self, address: u16, value: u8) {
        self.buffer[address as usize] = value;
    }

    pub(crate) fn write_page(&mut self, page: u8, bytes: &[u8]) {
        let base = page as usize * PAGE_SIZE;
        self.buffer[base..base + PAGE_SIZE].copy_from_slice(bytes);
    }

    /// Read-only window for the presentation layer. Clamped at the top of
    /// the address space.
    pub fn range(&self, address: u16, len: usize) -> &[u8] {
        let start = address as usize;
        let end = (start + len).min(self.buffer.len());
        &self.buffer[start..end]
    }
}
