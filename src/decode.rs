//! Incremental UTF-8 decoding for byte ranges read from the watched file.
//!
//! The watcher reads fixed-size chunks, so a multi-byte character can be
//! cut in half at a chunk (or tick) boundary. [`Utf8Decoder`] holds back
//! the incomplete tail of a chunk and prepends it to the next one, so the
//! character comes out whole once its remaining bytes arrive. Bytes that
//! can never form valid UTF-8 are replaced with U+FFFD.

/// Longest possible prefix of an incomplete UTF-8 sequence.
const MAX_PENDING: usize = 3;

/// Stateful bytes-to-text decoder; one per watch session.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, carrying any trailing incomplete sequence into the
    /// next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let split = buf.len() - incomplete_tail_len(&buf);
        self.pending = buf.split_off(split);

        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any held-back bytes.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Length of the trailing bytes that start a multi-byte sequence which is
/// not finished yet. Returns 0 when the buffer ends on a boundary or when
/// the tail is already invalid.
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(MAX_PENDING) {
        let byte = bytes[len - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            // continuation byte, keep looking for the lead
            continue;
        }
        let needed = match byte {
            b if b & 0b1110_0000 == 0b1100_0000 => 2,
            b if b & 0b1111_0000 == 0b1110_0000 => 3,
            b if b & 0b1111_1000 == 0b1111_0000 => 4,
            _ => return 0,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
