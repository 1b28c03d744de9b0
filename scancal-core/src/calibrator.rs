// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Calibrator
//!
//! The public state machine. A session runs one baseline scan (possibly
//! chunked across several small barcodes) followed by one supplementary
//! scan per discovered OS dead key; each `calibrate` call consumes the
//! previous token and returns the next one. Anomalies land in the token's
//! diagnostics log; panics are caught at this boundary and reported as
//! `CalibrationFailedUnexpectedly`.
//

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crate::analysis::{baseline, dead_keys, SessionState};
use crate::assemble::ChunkAssembler;
use crate::capabilities::{performance_band, KeyboardPerformance, SystemCapabilities};
use crate::chars::HT_CHAR;
use crate::data::ExtendedData;
use crate::diagnostics::{DiagnosticLog, EventCode};
use crate::elements::{BuiltinElements, ElementRegistry};
use crate::options::{Assumption, CalibrationOptions, Preprocessor};
use crate::payload::{baseline_chunks, baseline_payload, supplementary_payload, PayloadError};
use crate::provenance::{self, Provenance};
use crate::segment::{segmentize, SegmentError};
use crate::token::CalibrationToken;
use crate::translate::{self, Translation};

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Baseline,
    Supplementary,
    Complete,
}

/// Keyboard-wedge scanner calibration session.
pub struct Calibrator {
    assumption: Assumption,
    format_assessment: bool,
    declared_prefix: String,
    registry: Box<dyn ElementRegistry>,
    state: SessionState,
    assembler: ChunkAssembler,
    phase: Phase,
    supplementary_cursor: usize,
    baseline_timespan: Duration,
    caps_lock: Option<bool>,
    preprocessors: Vec<Preprocessor>,
    last_diagnostics: DiagnosticLog,
    succeeded: bool,
}

impl std::fmt::Debug for Calibrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calibrator")
            .field("assumption", &self.assumption)
            .field("phase", &self.phase)
            .field("supplementary_cursor", &self.supplementary_cursor)
            .field("succeeded", &self.succeeded)
            .finish_non_exhaustive()
    }
}

impl Calibrator {
    /// A fresh session.
    #[must_use]
    pub fn new(assumption: Assumption) -> Self {
        Self {
            assumption,
            format_assessment: true,
            declared_prefix: String::new(),
            registry: Box::new(BuiltinElements::new()),
            state: SessionState::new(),
            assembler: ChunkAssembler::new(),
            phase: Phase::Baseline,
            supplementary_cursor: 0,
            baseline_timespan: Duration::ZERO,
            caps_lock: None,
            preprocessors: Vec::new(),
            last_diagnostics: DiagnosticLog::new(),
            succeeded: false,
        }
    }

    /// Probe only GS instead of the full control set.
    #[must_use]
    pub fn without_format_assessment(mut self) -> Self {
        self.format_assessment = false;
        self
    }

    /// Plug in a data-element identifier lookup.
    #[must_use]
    pub fn with_element_registry(mut self, registry: Box<dyn ElementRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Declare the exact prefix the scanner transmits. Required when the
    /// prefix contains spaces, which would otherwise defeat segmentation.
    pub fn set_reported_prefix(&mut self, prefix: &str) {
        self.declared_prefix = prefix.to_string();
    }

    /// The baseline payload(s) to encode into barcodes. `maximum` bounds
    /// characters per barcode; `None` returns one payload.
    pub fn baseline_barcode_data(
        &self,
        maximum: Option<usize>,
    ) -> Result<Vec<String>, PayloadError> {
        match maximum {
            None => Ok(vec![baseline_payload(self.format_assessment)]),
            Some(capacity) => baseline_chunks(self.format_assessment, capacity),
        }
    }

    /// Supplementary payloads per dead key literal, available once the
    /// baseline has been analysed.
    #[must_use]
    pub fn supplemental_barcode_data(&self) -> std::collections::BTreeMap<char, Vec<String>> {
        let mut map = std::collections::BTreeMap::new();
        if self.phase == Phase::Baseline {
            return map;
        }
        for pending in &self.state.pending_dead_keys {
            map.insert(
                pending.literal,
                vec![supplementary_payload(
                    pending.literal,
                    &self.state.unassigned_expected,
                )],
            );
        }
        map
    }

    /// One token per expected scan, from where the session stands now.
    /// Before the baseline is analysed this yields the baseline token(s);
    /// afterwards, one token per outstanding dead key.
    pub fn calibration_tokens(
        &self,
        maximum: Option<usize>,
    ) -> Result<Vec<CalibrationToken>, PayloadError> {
        if self.phase == Phase::Baseline {
            let chunks = self.baseline_barcode_data(maximum)?;
            let count = chunks.len();
            if count == 1 {
                return Ok(vec![CalibrationToken::baseline(chunks[0].clone(), 1)]);
            }
            return Ok(chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| {
                    CalibrationToken::baseline_chunk(chunk, i + 1, count, count - i)
                })
                .collect());
        }
        let outstanding = &self.state.pending_dead_keys[self.supplementary_cursor..];
        Ok(outstanding
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let remaining = outstanding.len() - i;
                CalibrationToken::supplementary(
                    supplementary_payload(p.literal, &self.state.unassigned_expected),
                    p.key,
                    p.literal,
                    remaining,
                    remaining,
                )
            })
            .collect())
    }

    /// Analyse one reported scan. Returns the next token; a sticky
    /// abandoned token is returned unchanged.
    pub fn calibrate(
        &mut self,
        reported: &str,
        token: &CalibrationToken,
        options: &CalibrationOptions,
    ) -> CalibrationToken {
        if token.calibration_session_abandoned {
            return token.clone();
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.calibrate_inner(reported, token, options)
        }));
        let next = match result {
            Ok(next) => next,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "internal invariant violated".to_string());
                let mut next = token.clone();
                next.fail_with(EventCode::CalibrationFailedUnexpectedly, &[&reason]);
                next
            }
        };
        self.last_diagnostics = next.diagnostics.clone();
        next
    }

    /// `calibrate` over raw codepoints, for hosts whose keyboard hooks
    /// deliver integers rather than text.
    pub fn calibrate_codepoints(
        &mut self,
        codepoints: &[u32],
        token: &CalibrationToken,
        options: &CalibrationOptions,
    ) -> CalibrationToken {
        let reported: String = codepoints
            .iter()
            .map(|&n| char::from_u32(n).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        self.calibrate(&reported, token, options)
    }

    /// Translate a reported scan through the calibrated tables. Before a
    /// successful calibration this passes data through untouched.
    #[must_use]
    pub fn process_input(&self, reported: &str) -> Translation {
        if self.succeeded {
            translate::process_input(reported, &self.state.data, &self.preprocessors)
        } else {
            translate::process_input(reported, &ExtendedData::default(), &self.preprocessors)
        }
    }

    /// The derived capabilities view for the session so far.
    #[must_use]
    pub fn system_capabilities(&self, caps_lock: Option<bool>) -> SystemCapabilities {
        SystemCapabilities::synthesize(
            &self.last_diagnostics,
            self.succeeded.then_some(&self.state.data),
            caps_lock.or(self.caps_lock),
            self.state.script,
            self.baseline_timespan,
            self.state.payload_chars,
        )
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn calibrate_inner(
        &mut self,
        reported: &str,
        token: &CalibrationToken,
        options: &CalibrationOptions,
    ) -> CalibrationToken {
        let mut next = token.clone();
        self.caps_lock = options.caps_lock.or(self.caps_lock);
        self.preprocessors = options.preprocessors.clone();

        let mut text = reported.replace(HT_CHAR, "");
        let mut faults = Vec::new();
        for preprocessor in &options.preprocessors {
            text = preprocessor(&text, &mut faults);
        }
        if !faults.is_empty() {
            log::debug!("{} pre-processor fault(s) during calibration", faults.len());
        }
        next.reported_characters.extend(text.chars());

        if token.is_baseline() {
            self.calibrate_baseline(&text, &mut next, options);
        } else {
            self.calibrate_supplementary(&text, &mut next);
        }

        if next.has_errors() {
            next.diagnostics.add(EventCode::CalibrationFailed);
            next.extended_data = None;
            self.advance(&mut next, true);
            return next;
        }
        self.advance(&mut next, false);
        next
    }

    fn calibrate_baseline(
        &mut self,
        text: &str,
        next: &mut CalibrationToken,
        options: &CalibrationOptions,
    ) {
        // Stitch small-barcode sequences back together first.
        let full = if next.small_barcode_sequence_count > 1 {
            match self.assembler.accumulate(
                text,
                next.small_barcode_sequence_index,
                next.small_barcode_sequence_count,
                &self.declared_prefix,
            ) {
                Ok(Some(full)) => full,
                Ok(None) => {
                    // Point the returned token at the next chunk. Chunk one
                    // is always cut at full capacity, so its length recovers
                    // the chunking the caller asked for.
                    let capacity = next.barcode_data.chars().count();
                    if let Ok(chunks) = baseline_chunks(self.format_assessment, capacity) {
                        if let Some(chunk) = chunks.get(next.small_barcode_sequence_index) {
                            next.barcode_data = chunk.clone();
                        }
                    }
                    next.small_barcode_sequence_index += 1;
                    next.remaining = next.remaining.saturating_sub(1).max(1);
                    return;
                }
                Err(error) => {
                    log::debug!("chunk reassembly failed: {error}");
                    next.fail(EventCode::IncorrectCalibrationDataReported);
                    return;
                }
            }
        } else {
            text.to_string()
        };

        match provenance::assess(&full) {
            Provenance::Baseline => {}
            Provenance::PartialBaseline => {
                next.fail(EventCode::PartialCalibrationDataReported);
                return;
            }
            Provenance::DeadKey | Provenance::PartialDeadKey => {
                next.fail(EventCode::IncorrectCalibrationDataReported);
                return;
            }
            Provenance::NoData => {
                next.fail(EventCode::NoCalibrationDataReported);
                return;
            }
            Provenance::Unknown => {
                next.fail(EventCode::UnrecognisedData);
                return;
            }
        }

        let scan = match segmentize(&full, &self.declared_prefix, self.format_assessment) {
            Ok(scan) => scan,
            Err(SegmentError::NoTemporaryDelimiterCandidate) => {
                next.fail(EventCode::NoTemporaryDelimiterCandidate);
                return;
            }
            Err(SegmentError::UnrecognisedData) => {
                next.fail(EventCode::UnrecognisedData);
                return;
            }
            Err(SegmentError::NoDelimiters) => {
                next.fail(EventCode::NoDelimiters);
                return;
            }
        };

        baseline::analyse(&scan, self.format_assessment, options, next, &mut self.state);
        self.state.payload_chars = baseline_payload(self.format_assessment).chars().count();
        self.baseline_timespan = options.data_entry_timespan;
        self.phase = Phase::Supplementary;

        if !options.data_entry_timespan.is_zero()
            && performance_band(options.data_entry_timespan) != KeyboardPerformance::High
        {
            let cps = crate::capabilities::characters_per_second(
                self.state.payload_chars,
                options.data_entry_timespan,
            );
            next.log_with(
                EventCode::SubOptimalScannerKeyboardPerformance,
                &[&cps.to_string()],
            );
        }
    }

    fn calibrate_supplementary(&mut self, text: &str, next: &mut CalibrationToken) {
        let Some(dead_key) = next.dead_key() else {
            next.fail(EventCode::IncorrectCalibrationDataReported);
            return;
        };
        match provenance::assess(text) {
            Provenance::DeadKey | Provenance::PartialDeadKey => {}
            Provenance::NoData => {
                next.fail(EventCode::NoCalibrationDataReported);
                return;
            }
            _ => {
                next.fail(EventCode::IncorrectCalibrationDataReported);
                return;
            }
        }
        let Some(&pending) = self
            .state
            .pending_dead_keys
            .get(self.supplementary_cursor)
            .filter(|p| p.key == dead_key)
        else {
            next.fail(EventCode::IncorrectCalibrationDataReported);
            return;
        };
        dead_keys::analyse(text, pending, &*self.registry, next, &mut self.state);
        self.supplementary_cursor += 1;
    }

    /// Point the token at the next expected scan, or close the session.
    fn advance(&mut self, next: &mut CalibrationToken, failed: bool) {
        if self.phase == Phase::Baseline {
            // The baseline has not been analysed yet (chunk in progress or
            // an early failure); leave the token's expectations alone.
            if failed {
                self.finalize(next, true);
            }
            return;
        }
        if !failed {
            if let Some(pending) = self.state.pending_dead_keys.get(self.supplementary_cursor) {
                let remaining = self.state.pending_dead_keys.len() - self.supplementary_cursor;
                next.barcode_data =
                    supplementary_payload(pending.literal, &self.state.unassigned_expected);
                next.key = format!("{}{}", crate::chars::NULL_CHAR, pending.key);
                next.value = Some(pending.literal);
                next.remaining = remaining;
                next.calibrations_remaining = remaining;
                return;
            }
        }
        self.finalize(next, failed);
    }

    fn finalize(&mut self, next: &mut CalibrationToken, failed: bool) {
        self.phase = Phase::Complete;
        self.succeeded = !failed && !next.has_errors();
        next.barcode_data = String::new();
        next.key = String::new();
        next.value = None;
        next.remaining = 0;
        next.calibrations_remaining = 0;
        if self.succeeded && self.assumption == Assumption::Calibration {
            next.extended_data = Some(self.state.data.clone());
        }
        next.system_capabilities = Some(SystemCapabilities::synthesize(
            &next.diagnostics,
            self.succeeded.then_some(&self.state.data),
            self.caps_lock,
            self.state.script,
            self.baseline_timespan,
            self.state.payload_chars,
        ));
    }
}
