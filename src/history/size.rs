//! Value size probing
//!
//! One serialization pass yields both the encoded size used for the
//! retention budget and a bounded textual preview.

use std::io;

use serde_json::Value;

/// Size and preview of one value's JSON encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueProbe {
    /// Encoded size in bytes
    pub size: u64,
    /// At most `max_chars` characters, with `...` appended when cut
    pub preview: String,
}

/// Counts every byte and keeps only a bounded prefix.
struct ProbeWriter {
    total: u64,
    head: Vec<u8>,
    head_cap: usize,
}

impl io::Write for ProbeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.total += buf.len() as u64;
        let room = self.head_cap.saturating_sub(self.head.len());
        if room > 0 {
            self.head.extend_from_slice(&buf[..buf.len().min(room)]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Measure `value` and build a preview of at most `max_chars` characters.
pub fn probe(value: &Value, max_chars: usize) -> ValueProbe {
    let mut writer = ProbeWriter {
        total: 0,
        // A char is at most 4 bytes in UTF-8
        head: Vec::with_capacity(max_chars.saturating_mul(4).min(4096)),
        head_cap: max_chars.saturating_mul(4),
    };
    // ProbeWriter never fails and Value map keys are always strings.
    let _ = serde_json::to_writer(&mut writer, value);

    let head = match std::str::from_utf8(&writer.head) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&writer.head[..e.valid_up_to()]).unwrap_or_default(),
    };
    let mut preview: String = head.chars().take(max_chars).collect();
    if (preview.len() as u64) < writer.total {
        preview.push_str("...");
    }

    ValueProbe {
        size: writer.total,
        preview,
    }
}
