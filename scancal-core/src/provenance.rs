// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Scan Provenance
//!
//! Before any expensive segmentation, the engine decides whether a reported
//! string plausibly came from the baseline barcode, from a supplementary
//! dead key barcode, from a truncated scan of either, or from something
//! else entirely.
//!
//! The decision uses marker-interval statistics over the longest fragment
//! bounded by delimiter runs: baseline scans are space-dominated with a
//! near-constant two-character cadence, dead key scans are NUL-dominated
//! with a cadence just under three. Expected values are derived from the
//! generated payloads; tolerances scale with the Bessel-corrected sample
//! deviation of the observed intervals so a distorted but structurally
//! sound scan still classifies.
//

use std::sync::OnceLock;

use crate::chars::NULL_CHAR;
use crate::patterns::ScanPattern;
use crate::payload::baseline_payload;

/// Classification of a reported string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A complete baseline scan.
    Baseline,
    /// Baseline structure, but materially short of a full scan.
    PartialBaseline,
    /// A complete supplementary dead key scan.
    DeadKey,
    /// Dead key structure, but materially short of a full scan.
    PartialDeadKey,
    /// Nothing but whitespace was reported.
    NoData,
    /// Not recognisable as calibration data.
    Unknown,
}

/// Marker-interval statistics over a fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalStats {
    /// Fragment length in characters.
    pub length: usize,
    /// Number of marker occurrences.
    pub count: usize,
    /// Mean distance between successive markers.
    pub mean: f64,
    /// Bessel-corrected sample standard deviation of the distances.
    pub deviation: f64,
}

impl IntervalStats {
    /// Compute statistics for one marker character over a fragment.
    #[must_use]
    pub fn measure(fragment: &str, marker: char) -> Self {
        let chars: Vec<char> = fragment.chars().collect();
        let positions: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| (c == marker).then_some(i))
            .collect();
        let intervals: Vec<f64> = positions
            .windows(2)
            .map(|w| (w[1] - w[0]) as f64)
            .collect();
        let mean = if intervals.is_empty() {
            0.0
        } else {
            intervals.iter().sum::<f64>() / intervals.len() as f64
        };
        let deviation = if intervals.len() < 2 {
            0.0
        } else {
            let variance = intervals.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
                / (intervals.len() - 1) as f64;
            variance.sqrt()
        };
        Self {
            length: chars.len(),
            count: positions.len(),
            mean,
            deviation,
        }
    }
}

//
// Expected baseline statistics, measured once from the generated payload.
//
fn baseline_expectation() -> &'static IntervalStats {
    static IDEAL: OnceLock<IntervalStats> = OnceLock::new();
    IDEAL.get_or_init(|| {
        let payload = baseline_payload(true);
        let fragment = longest_fragment(&payload);
        IntervalStats::measure(fragment, ' ')
    })
}

// Expected mean distance between NULs over a supplementary scan: most
// pairs report NUL + literal + unmodified character, a minority combine
// into NUL + single character.
const DEAD_KEY_EXPECTED_MEAN: f64 = 2.9;
const DEAD_KEY_EXPECTED_COUNT: usize = 94;

// Tolerance multipliers and floors. The floor keeps a zero-variance
// perfect scan inside the window.
const BASELINE_SIGMA: f64 = 4.0;
const DEAD_KEY_SIGMA: f64 = 3.0;
const TOLERANCE_FLOOR: f64 = 0.5;

/// The longest fragment bounded by delimiter runs.
#[must_use]
pub fn longest_fragment(reported: &str) -> &str {
    ScanPattern::DelimiterRun
        .regex()
        .split(reported)
        .max_by_key(|f| f.chars().count())
        .unwrap_or("")
}

/// Classify a reported string.
#[must_use]
pub fn assess(reported: &str) -> Provenance {
    if reported.trim_matches(&[' ', '\r', '\n', '\t'][..]).is_empty() {
        return Provenance::NoData;
    }

    // Dead key scans carry no delimiter runs; measure NUL cadence over the
    // whole string.
    let nul = IntervalStats::measure(reported, NULL_CHAR);
    if nul.count >= DEAD_KEY_EXPECTED_COUNT / 4 {
        let tolerance = (DEAD_KEY_SIGMA * nul.deviation).max(TOLERANCE_FLOOR);
        let cadence_fits = (nul.mean - DEAD_KEY_EXPECTED_MEAN).abs() <= tolerance;
        let complete = nul.count >= DEAD_KEY_EXPECTED_COUNT * 4 / 5;
        return if complete && cadence_fits {
            Provenance::DeadKey
        } else {
            Provenance::PartialDeadKey
        };
    }

    let ideal = baseline_expectation();
    let observed = IntervalStats::measure(longest_fragment(reported), ' ');
    if observed.count >= ideal.count * 4 / 5 {
        let tolerance = (BASELINE_SIGMA * observed.deviation).max(TOLERANCE_FLOOR);
        let slack = (BASELINE_SIGMA * observed.deviation) as usize + 8;
        if (observed.mean - ideal.mean).abs() <= tolerance && observed.length + slack >= ideal.length
        {
            return Provenance::Baseline;
        }
        return Provenance::PartialBaseline;
    }
    if observed.count >= ideal.count / 4 {
        return Provenance::PartialBaseline;
    }

    Provenance::Unknown
}
