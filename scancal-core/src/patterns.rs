// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Segmentation Pattern Registry
//!
//! Centralized, enum-addressable regex patterns for the segmenter and the
//! pre-processors.
//!
//! Design goals:
//! - Single registry, cached compilation
//! - Stateless call surface
//! - No lookarounds; boundary conditions are checked explicitly by callers
//

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;

/// Canonical pattern registry for reported-stream analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPattern {
    // -------------------------------
    // End-of-line and control tails
    // -------------------------------
    /// Trailing run of CR and LF characters.
    TrailingEndOfLine,
    /// Trailing run of C0 controls other than HT, CR, and LF.
    TrailingControls,

    // -------------------------------
    // Space runs
    // -------------------------------
    /// A run of three or more spaces: one or more segment delimiters, or a
    /// provenance fragment boundary.
    DelimiterRun,

    // -------------------------------
    // Dead key forms
    // -------------------------------
    /// NUL followed by a combining result: an OS dead key sequence.
    DeadKeySequence,
    /// NUL followed by a visible character and a space: a scanner-side dead
    /// key whose OS twin is also dead.
    DeadKeyWithTrailingSpace,
    /// NUL directly followed by a space: a scanner-side dead key whose OS
    /// twin is unassigned.
    UnassignedKey,
    /// Two or more NULs before a visible character: chained dead keys.
    ChainedDeadKeys,
    /// Any run of NULs.
    NulRun,

    // -------------------------------
    // AIM identifiers
    // -------------------------------
    /// An AIM symbology identifier: flag, code character, modifier.
    AimIdentifier,
}

impl ScanPattern {
    /// The pattern source.
    #[must_use]
    pub fn pattern(self) -> &'static str {
        match self {
            Self::TrailingEndOfLine => r"[\r\n]+$",
            Self::TrailingControls => r"[\x00-\x08\x0b\x0c\x0e-\x1f]+$",
            Self::DelimiterRun => r"[ ]{3,}",
            Self::DeadKeySequence => r"\x00[^\x00 ]",
            Self::DeadKeyWithTrailingSpace => r"\x00[^\x00 ][ ]",
            Self::UnassignedKey => r"\x00[ ]",
            Self::ChainedDeadKeys => r"\x00{2,}[^\x00 ]",
            Self::NulRun => r"\x00+",
            Self::AimIdentifier => r"\][A-Za-z][0-9A-Za-z]",
        }
    }

    /// The compiled regex, from the process-wide cache.
    #[must_use]
    pub fn regex(self) -> Regex {
        get_regex(self)
    }
}

// Regex cache. Patterns compile once per process; the handle is cheap to
// clone.
static REGEX_CACHE: OnceLock<Mutex<HashMap<ScanPattern, Regex>>> = OnceLock::new();

fn get_regex(kind: ScanPattern) -> Regex {
    let cache = REGEX_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard
        .entry(kind)
        .or_insert_with(|| {
            Regex::new(kind.pattern()).unwrap_or_else(|e| {
                unreachable!("registry pattern {kind:?} failed to compile: {e}")
            })
        })
        .clone()
}
