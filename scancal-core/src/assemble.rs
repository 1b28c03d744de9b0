// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Small Barcode Reassembly
//!
//! Data-matrix size limits can force one calibration payload across several
//! physical barcodes. The chunks arrive one reported string at a time,
//! each tagged `(index, count)`; every scan repeats the scanner's prefix
//! and end-of-line, which must not survive into the stitched stream.
//

use std::fmt;

use crate::patterns::ScanPattern;

/// Reassembly failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// A chunk arrived out of order.
    OutOfSequence { expected: usize, received: usize },
    /// The declared chunk count changed mid-sequence.
    CountChanged { expected: usize, received: usize },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfSequence { expected, received } => {
                write!(f, "chunk {received} reported, chunk {expected} expected")
            }
            Self::CountChanged { expected, received } => {
                write!(f, "chunk count changed from {expected} to {received}")
            }
        }
    }
}

impl std::error::Error for AssemblyError {}

/// Accumulates reported chunks until the sequence completes.
#[derive(Debug, Clone, Default)]
pub struct ChunkAssembler {
    accumulated: String,
    received: usize,
    count: usize,
    captured_prefix: String,
}

impl ChunkAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once at least one chunk has been fed.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.received > 0 && self.received < self.count
    }

    /// Feed one reported chunk. Returns the stitched stream when the last
    /// chunk of the sequence lands.
    ///
    /// `declared_prefix` wins over the prefix captured from chunk one when
    /// the caller has declared what the scanner transmits.
    pub fn accumulate(
        &mut self,
        reported: &str,
        index: usize,
        count: usize,
        declared_prefix: &str,
    ) -> Result<Option<String>, AssemblyError> {
        if self.received == 0 {
            self.count = count;
        } else if self.count != count {
            return Err(AssemblyError::CountChanged {
                expected: self.count,
                received: count,
            });
        }
        if index != self.received + 1 {
            return Err(AssemblyError::OutOfSequence {
                expected: self.received + 1,
                received: index,
            });
        }

        let last = index == count;
        let mut chunk = reported.to_string();

        // Every scan ends the same way; only the last chunk's end-of-line
        // is meaningful downstream.
        if !last {
            if let Some(found) = ScanPattern::TrailingEndOfLine.regex().find(&chunk) {
                let start = found.start();
                chunk.truncate(start);
            }
        }

        if index == 1 {
            self.captured_prefix = if declared_prefix.is_empty() {
                capture_prefix(&chunk)
            } else {
                declared_prefix.to_string()
            };
        } else {
            // Chunks after the first repeat the scanner prefix.
            if !self.captured_prefix.is_empty() {
                if let Some(rest) = chunk.strip_prefix(&self.captured_prefix) {
                    chunk = rest.to_string();
                }
            }
        }

        self.accumulated.push_str(&chunk);
        self.received = index;

        if last {
            let full = std::mem::take(&mut self.accumulated);
            *self = Self::new();
            Ok(Some(full))
        } else {
            Ok(None)
        }
    }
}

/// The scanner prefix is whatever precedes the payload's opening delimiter
/// run in the first chunk.
fn capture_prefix(chunk: &str) -> String {
    match ScanPattern::DelimiterRun.regex().find(chunk) {
        Some(found) => chunk[..found.start()].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::payload::{baseline_chunks, baseline_payload};

    #[test]
    fn three_chunks_with_prefix_reassemble() {
        let chunks = baseline_chunks(true, 80).unwrap();
        assert!(chunks.len() >= 3);
        let count = chunks.len();

        let mut assembler = ChunkAssembler::new();
        let mut full = None;
        for (i, chunk) in chunks.iter().enumerate() {
            let reported = format!(">{chunk}\r\n");
            full = assembler
                .accumulate(&reported, i + 1, count, "")
                .unwrap();
        }
        let full = full.expect("last chunk completes the sequence");
        assert_eq!(full, format!(">{}\r\n", baseline_payload(true)));
    }

    #[test]
    fn out_of_order_chunks_are_rejected() {
        let mut assembler = ChunkAssembler::new();
        assembler.accumulate("a", 1, 3, "").unwrap();
        let err = assembler.accumulate("c", 3, 3, "").unwrap_err();
        assert_eq!(
            err,
            AssemblyError::OutOfSequence {
                expected: 2,
                received: 3
            }
        );
    }

    #[test]
    fn count_changes_are_rejected() {
        let mut assembler = ChunkAssembler::new();
        assembler.accumulate("a", 1, 3, "").unwrap();
        let err = assembler.accumulate("b", 2, 4, "").unwrap_err();
        assert_eq!(
            err,
            AssemblyError::CountChanged {
                expected: 3,
                received: 4
            }
        );
    }

    #[test]
    fn declared_prefix_overrides_capture() {
        let mut assembler = ChunkAssembler::new();
        assembler.accumulate("> first", 1, 2, "> ").unwrap();
        let full = assembler
            .accumulate("> second", 2, 2, "> ")
            .unwrap()
            .expect("complete");
        assert_eq!(full, "> firstsecond");
    }
}
