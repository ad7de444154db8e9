//! 📦 The response buffer: a byte bucket with a lid, a cursor, and firm opinions about size.
//!
//! 🧠 Knowledge graph:
//! - Capacity is fixed at construction. Writes that would overflow are refused whole.
//!   No partial writes. No "I'll just grow a little". The limit is the limit.
//! - `flush_response = true`: every call starts from an empty bucket.
//! - `flush_response = false`: new responses land after the old ones. Clearing is the
//!   caller's chore, via [`ResponseBuffer::clear`].
//! - The buffer remembers where the current response started, so a host that dies
//!   halfway through a body gets its half-body rolled back before the next host speaks.

use std::borrow::Cow;

/// 💀 A chunk that did not fit. Carries the numbers so the log line can do the math for you.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOverflow {
    pub pos: usize,
    pub chunk_len: usize,
    pub capacity: usize,
}

impl std::fmt::Display for BufferOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "a {} byte chunk at position {} would exceed the {} byte response buffer",
            self.chunk_len, self.pos, self.capacity
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
    capacity: usize,
    flush_response: bool,
    // 🔖 where the response of the call in flight begins
    start: usize,
}

impl ResponseBuffer {
    pub fn new(capacity: usize, flush_response: bool) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
            flush_response,
            start: 0,
        }
    }

    /// 🚀 A new call is about to receive a response. Flush or append, per policy.
    pub(crate) fn begin_response(&mut self) {
        if self.flush_response {
            self.bytes.clear();
        }
        self.start = self.bytes.len();
    }

    /// 🔄 Throw away whatever a failed host attempt managed to write for this call.
    pub(crate) fn rewind_attempt(&mut self) {
        self.bytes.truncate(self.start);
    }

    /// 📥 Append one chunk at the cursor, or refuse it entirely if it won't fit.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<usize, BufferOverflow> {
        let pos = self.bytes.len();
        if pos + chunk.len() > self.capacity {
            return Err(BufferOverflow {
                pos,
                chunk_len: chunk.len(),
                capacity: self.capacity,
            });
        }
        self.bytes.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    /// 🔢 The write cursor, a.k.a. how many bytes are in here.
    pub fn pos(&self) -> usize {
        self.bytes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn flush_response(&self) -> bool {
        self.flush_response
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Everything in the buffer, including earlier responses in append mode.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Just the bytes written by the most recent call.
    pub fn current_response(&self) -> &[u8] {
        &self.bytes[self.start..]
    }

    /// 📜 The buffer as text. Invalid UTF-8 gets the replacement character, not a panic.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// 🗑️ Back to zero. The caller's reset button for append mode.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.start = 0;
    }
}
