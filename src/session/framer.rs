/// Splits the raw byte stream of the debugger's stdout into complete lines.
///
/// Chunks arrive with arbitrary boundaries (a terminator or a multi-byte
/// character may be split across chunks), so incomplete data is buffered
/// until a CR or LF shows up. Emitted lines include their terminator byte.
#[derive(Default)]
pub struct LineFramer {
    partial: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, return every line completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = vec![];
        for &byte in chunk {
            self.partial.push(byte);
            if byte == b'\r' || byte == b'\n' {
                lines.push(std::mem::take(&mut self.partial));
            }
        }
        lines
    }

    /// Drop buffered partial data (on debugger process restart).
    pub fn clear(&mut self) {
        self.partial.clear();
    }

    #[cfg(test)]
    fn partial(&self) -> &[u8] {
        &self.partial
    }
}
