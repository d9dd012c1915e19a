//! Incremental decoder for the command service's reply body.
//!
//! Accepts either a top-level JSON array of reply objects or a sequence of
//! concatenated / newline-delimited objects. Each object is returned as soon
//! as its closing brace has arrived.

use chatrelay_common::types::ReplyItem;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Nothing significant seen yet.
    Start,
    /// Inside `[...]`, expecting the first element or `]`.
    ArrayOpen,
    /// Inside `[...]` after a comma.
    ArrayValue,
    /// Inside `[...]` after an element.
    ArrayNext,
    /// Bare objects one after another.
    Sequence,
    /// Saw the closing `]`; only whitespace may follow.
    Closed,
}

/// Push-based reply decoder.
///
/// Feed raw body chunks with [`feed`](Self::feed) and pull complete replies
/// with [`next_item`](Self::next_item). Chunk boundaries may fall anywhere,
/// including inside strings and multi-byte characters.
#[derive(Debug)]
pub struct ReplyDecoder {
    framing: Framing,
    pending: Vec<u8>,
    pos: usize,
    /// Bytes of the object currently being collected.
    element: Vec<u8>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    offset: usize,
    decoded: usize,
}

impl Default for ReplyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self {
            framing: Framing::Start,
            pending: Vec::new(),
            pos: 0,
            element: Vec::new(),
            depth: 0,
            in_string: false,
            escaped: false,
            offset: 0,
            decoded: 0,
        }
    }

    /// Number of replies decoded so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Return the next complete reply, or `None` when more input is needed.
    pub fn next_item(&mut self) -> Result<Option<ReplyItem>> {
        while self.pos < self.pending.len() {
            let byte = self.pending[self.pos];
            self.pos += 1;
            self.offset += 1;
            if let Some(item) = self.step(byte)? {
                return Ok(Some(item));
            }
        }
        self.pending.clear();
        self.pos = 0;
        Ok(None)
    }

    /// Check that the body ended on a clean boundary.
    ///
    /// An empty body counts as zero replies.
    pub fn finish(&self) -> Result<()> {
        if self.depth > 0 {
            return Err(Error::decode(format!(
                "body ended inside reply #{} at byte {}",
                self.decoded + 1,
                self.offset
            )));
        }
        match self.framing {
            Framing::ArrayOpen | Framing::ArrayValue | Framing::ArrayNext => Err(Error::decode(
                format!("body ended before closing ']' at byte {}", self.offset),
            )),
            Framing::Start | Framing::Sequence | Framing::Closed => Ok(()),
        }
    }

    fn step(&mut self, byte: u8) -> Result<Option<ReplyItem>> {
        if self.depth > 0 {
            return self.step_in_element(byte);
        }
        if byte.is_ascii_whitespace() {
            return Ok(None);
        }

        match (self.framing, byte) {
            (Framing::Start, b'[') => self.framing = Framing::ArrayOpen,
            (Framing::Start | Framing::Sequence, b'{') => {
                self.framing = Framing::Sequence;
                self.begin_element(byte);
            },
            (Framing::ArrayOpen | Framing::ArrayValue, b'{') => self.begin_element(byte),
            (Framing::ArrayOpen | Framing::ArrayNext, b']') => self.framing = Framing::Closed,
            (Framing::ArrayNext, b',') => self.framing = Framing::ArrayValue,
            (Framing::Closed, _) => {
                return Err(Error::decode(format!(
                    "unexpected data after closing ']' at byte {}",
                    self.offset
                )));
            },
            (Framing::ArrayOpen | Framing::ArrayValue | Framing::Start | Framing::Sequence, _) => {
                return Err(Error::decode(format!(
                    "expected a reply object, found {:?} at byte {}",
                    char::from(byte),
                    self.offset
                )));
            },
            (Framing::ArrayNext, _) => {
                return Err(Error::decode(format!(
                    "expected ',' or ']', found {:?} at byte {}",
                    char::from(byte),
                    self.offset
                )));
            },
        }
        Ok(None)
    }

    fn begin_element(&mut self, byte: u8) {
        self.element.clear();
        self.element.push(byte);
        self.depth = 1;
    }

    fn step_in_element(&mut self, byte: u8) -> Result<Option<ReplyItem>> {
        self.element.push(byte);

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return Ok(None);
        }

        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth -= 1;
                if self.depth == 0 {
                    return self.finish_element().map(Some);
                }
            },
            _ => {},
        }
        Ok(None)
    }

    fn finish_element(&mut self) -> Result<ReplyItem> {
        let item = serde_json::from_slice::<ReplyItem>(&self.element).map_err(|e| {
            Error::decode(format!("reply #{} is invalid: {e}", self.decoded + 1))
        })?;
        self.element.clear();
        self.decoded += 1;
        if self.framing != Framing::Sequence {
            self.framing = Framing::ArrayNext;
        }
        Ok(item)
    }
}
