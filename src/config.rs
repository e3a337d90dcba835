/// Knobs shared by the upload gate and the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Largest upload accepted, in bytes. Checked against the declared size
    /// and again against the bytes actually read.
    pub max_upload_bytes: u64,
    /// csv reader buffer; larger means fewer syscalls on big files.
    pub buffer_capacity: usize,
    /// Let rows wider or narrower than the header through the parser, where
    /// short rows fail validation. When off, a ragged row ends the stream.
    pub flexible_rows: bool,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_BUFFER_CAPACITY: usize = 1 << 20; // 1 MiB

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flexible_rows: true,
        }
    }
}

impl IngestConfig {
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes.max(1);
        self
    }

    pub fn with_flexible_rows(mut self, flexible: bool) -> Self {
        self.flexible_rows = flexible;
        self
    }
}
