//! Easy2 handler collecting one response body in memory.

use std::str;

/// Handler state for one record transfer.
#[derive(Debug, Default)]
pub struct BodyHandler {
    pub(super) body: Vec<u8>,
}

impl BodyHandler {
    pub(super) fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }
}

impl curl::easy::Handler for BodyHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        // A new status line starts a new response (redirect or retry inside curl).
        if let Ok(line) = str::from_utf8(data) {
            if line.starts_with("HTTP/") {
                self.body.clear();
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}
