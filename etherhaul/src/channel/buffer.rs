//! Receive buffer for shell output.
//!
//! Prompts and pager markers always sit at the end of what the radio has
//! printed so far, so only a bounded tail is searched. A full
//! `copy running-configuration display` is never rescanned chunk by chunk.

use bytes::BytesMut;
use regex::bytes::Regex;

use super::ansi::strip_ansi;

/// Bytes searched from the end when no depth is configured.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// ANSI-free output accumulated between two prompts.
#[derive(Debug)]
pub struct PatternBuffer {
    data: BytesMut,
    search_depth: usize,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(4096),
            search_depth,
        }
    }

    /// Append received bytes with escape sequences removed.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(&strip_ansi(chunk));
    }

    /// Split off everything up to the end of the first match of `pattern`
    /// inside the searched tail.
    ///
    /// Bytes after the match stay buffered for the next read.
    pub fn take_through(&mut self, pattern: &Regex) -> Option<Vec<u8>> {
        let offset = self.data.len().saturating_sub(self.search_depth);
        let end = pattern.find(&self.data[offset..])?.end();
        Some(self.data.split_to(offset + end).to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}
