// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Calibration Payloads
//!
//! Builds the literal text encoded into calibration barcodes.
//!
//! The baseline payload concatenates three regions behind four-space
//! delimiters: the invariant characters, the additional printable ASCII
//! characters, and one single-character region per probed ASCII control.
//! A leading delimiter isolates any scanner prefix into its own segment and
//! a trailing delimiter keeps scanner suffixes outside the payload.
//!
//! A supplementary payload pairs one discovered OS dead key literal with
//! every printable ASCII character so the dead key's combining behaviour
//! can be observed in a single scan.
//

use std::collections::BTreeSet;
use std::fmt;

use crate::chars::{INVARIANTS, NON_INVARIANTS, PROBED_CONTROLS};

/// Four-space run separating payload segments.
pub const SEGMENT_DELIMITER: &str = "    ";

/// Smallest barcode capacity the chunker will accept.
pub const MINIMUM_CHUNK_CAPACITY: usize = 20;

/// Payload construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The requested chunk capacity cannot hold a usable payload slice.
    ChunkCapacityTooSmall(usize),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChunkCapacityTooSmall(n) => {
                write!(f, "chunk capacity {n} is below the minimum of {MINIMUM_CHUNK_CAPACITY}")
            }
        }
    }
}

impl std::error::Error for PayloadError {}

/// The baseline payload text.
///
/// With `format_assessment` off, only the group separator control region is
/// present; the full set GS, RS, FS, US, EOT is probed otherwise.
#[must_use]
pub fn baseline_payload(format_assessment: bool) -> String {
    let mut payload = String::with_capacity(256);
    payload.push_str(SEGMENT_DELIMITER);
    push_spaced(&mut payload, INVARIANTS);
    payload.push_str(SEGMENT_DELIMITER);
    push_spaced(&mut payload, NON_INVARIANTS);
    for control in probed_controls(format_assessment) {
        payload.push_str(SEGMENT_DELIMITER);
        payload.push(*control);
    }
    payload.push_str(SEGMENT_DELIMITER);
    payload
}

/// The controls probed by the baseline payload, in segment order.
#[must_use]
pub fn probed_controls(format_assessment: bool) -> &'static [char] {
    if format_assessment {
        &PROBED_CONTROLS
    } else {
        &PROBED_CONTROLS[..1]
    }
}

/// Baseline payload, chunked to fit barcodes holding at most `capacity`
/// characters. One chunk is returned whenever the payload already fits.
pub fn baseline_chunks(
    format_assessment: bool,
    capacity: usize,
) -> Result<Vec<String>, PayloadError> {
    if capacity < MINIMUM_CHUNK_CAPACITY {
        return Err(PayloadError::ChunkCapacityTooSmall(capacity));
    }
    let payload = baseline_payload(format_assessment);
    Ok(chunk(&payload, capacity))
}

/// The supplementary payload for one OS dead key.
///
/// Pairs the literal dead key character with every printable ASCII
/// character in baseline order, skipping characters the baseline showed to
/// be unassigned on the OS layout.
#[must_use]
pub fn supplementary_payload(literal: char, unassigned: &BTreeSet<char>) -> String {
    let mut payload = String::with_capacity(2 * 94);
    for c in INVARIANTS.chars().chain(NON_INVARIANTS.chars()) {
        if unassigned.contains(&c) {
            continue;
        }
        payload.push(literal);
        payload.push(c);
    }
    payload
}

/// Expected reported sequences per baseline segment, indexed from the
/// invariant segment (payload segment 1).
#[must_use]
pub fn expected_segments(format_assessment: bool) -> Vec<Vec<char>> {
    let mut segments = vec![
        INVARIANTS.chars().collect::<Vec<char>>(),
        NON_INVARIANTS.chars().collect::<Vec<char>>(),
    ];
    for &control in probed_controls(format_assessment) {
        segments.push(vec![control]);
    }
    segments
}

fn push_spaced(payload: &mut String, chars: &str) {
    let mut first = true;
    for c in chars.chars() {
        if !first {
            payload.push(' ');
        }
        payload.push(c);
        first = false;
    }
}

fn chunk(payload: &str, capacity: usize) -> Vec<String> {
    let chars: Vec<char> = payload.chars().collect();
    if chars.len() <= capacity {
        return vec![payload.to_string()];
    }
    chars
        .chunks(capacity)
        .map(|slice| slice.iter().collect())
        .collect()
}
