// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Calibration Token
//!
//! The immutable record passed between the caller and the engine. Each
//! `calibrate` step consumes the previous token and returns a new one
//! carrying the next expected payload, progress counters, the diagnostics
//! log, and, at the end of the run, the translation tables and the
//! capabilities report.
//!
//! The serialized shape is ABI: field names below are stable and the
//! diagnostics split into `information` / `warnings` / `errors` arrays of
//! `{type, level, description}` records.
//

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::capabilities::SystemCapabilities;
use crate::chars::NULL_CHAR;
use crate::data::ExtendedData;
use crate::diagnostics::{Diagnostic, DiagnosticLog, EventCode};

/// State passed between calibration steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TokenWire", into = "TokenWire")]
pub struct CalibrationToken {
    /// The payload the next scan must yield after translation.
    pub barcode_data: String,
    /// `"\0<dead key>"` during a supplementary step, empty otherwise.
    pub key: String,
    /// The literal dead key character for a supplementary step.
    pub value: Option<char>,
    /// 1-based position within a small-barcode sequence; 0 when the payload
    /// fits one barcode.
    pub small_barcode_sequence_index: usize,
    /// Number of barcodes in the small-barcode sequence; 0 when unused.
    pub small_barcode_sequence_count: usize,
    /// Scans remaining in the whole session, this one included.
    pub remaining: usize,
    /// Supplementary dead key calibrations remaining.
    pub calibrations_remaining: usize,
    /// Everything observed so far, ordered by code.
    pub diagnostics: DiagnosticLog,
    /// Raw prefix captured from the baseline scan.
    pub reported_prefix_segment: String,
    /// Raw suffix captured from the baseline scan.
    pub reported_suffix: String,
    /// Every codepoint seen in reported input so far.
    pub reported_characters: BTreeSet<char>,
    /// Sticky terminal flag; once set, `calibrate` returns the token
    /// unchanged.
    pub calibration_session_abandoned: bool,
    /// Final translation tables, present only on a successful last step.
    pub extended_data: Option<ExtendedData>,
    /// Derived feature matrix, populated at the end of the run.
    pub system_capabilities: Option<SystemCapabilities>,
}

impl CalibrationToken {
    /// Token announcing a baseline scan.
    #[must_use]
    pub fn baseline(barcode_data: impl Into<String>, remaining: usize) -> Self {
        Self {
            barcode_data: barcode_data.into(),
            remaining,
            ..Self::default()
        }
    }

    /// Token announcing one chunk of a chunked baseline scan.
    #[must_use]
    pub fn baseline_chunk(
        barcode_data: impl Into<String>,
        index: usize,
        count: usize,
        remaining: usize,
    ) -> Self {
        Self {
            barcode_data: barcode_data.into(),
            small_barcode_sequence_index: index,
            small_barcode_sequence_count: count,
            remaining,
            ..Self::default()
        }
    }

    /// Token announcing a supplementary dead key scan.
    #[must_use]
    pub fn supplementary(
        barcode_data: impl Into<String>,
        dead_key: char,
        literal: char,
        remaining: usize,
        calibrations_remaining: usize,
    ) -> Self {
        Self {
            barcode_data: barcode_data.into(),
            key: format!("{NULL_CHAR}{dead_key}"),
            value: Some(literal),
            remaining,
            calibrations_remaining,
            ..Self::default()
        }
    }

    /// True while this token expects the baseline payload.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.key.is_empty()
    }

    /// The dead key under calibration during a supplementary step.
    #[must_use]
    pub fn dead_key(&self) -> Option<char> {
        self.key.strip_prefix(NULL_CHAR).and_then(|rest| rest.chars().next())
    }

    /// Record a diagnostic with no arguments.
    pub fn log(&mut self, code: EventCode) {
        self.diagnostics.add(code);
        if code.abandons_session() {
            self.calibration_session_abandoned = true;
        }
    }

    /// Record a diagnostic with message arguments.
    pub fn log_with(&mut self, code: EventCode, args: &[&str]) {
        self.diagnostics.add_with(code, args);
        if code.abandons_session() {
            self.calibration_session_abandoned = true;
        }
    }

    /// True once any error-band diagnostic has been recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Mark the run failed, attaching the umbrella record.
    pub fn fail(&mut self, code: EventCode) {
        self.log(code);
        self.diagnostics.add(EventCode::CalibrationFailed);
        self.extended_data = None;
    }

    /// Mark the run failed with message arguments.
    pub fn fail_with(&mut self, code: EventCode, args: &[&str]) {
        self.log_with(code, args);
        self.diagnostics.add(EventCode::CalibrationFailed);
        self.extended_data = None;
    }

    /// Serialize to the ABI JSON shape.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the ABI JSON shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

//
// =============================================================================
// Wire shape
// =============================================================================
//
// The public struct keeps one ordered diagnostics log; the wire splits it
// into the three ABI arrays.
//

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TokenWire {
    barcode_data: String,
    key: String,
    value: Option<char>,
    small_barcode_sequence_index: usize,
    small_barcode_sequence_count: usize,
    remaining: usize,
    calibrations_remaining: usize,
    information: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
    prefix: String,
    suffix: String,
    reported_characters: BTreeSet<char>,
    calibration_session_abandoned: bool,
    extended_data: Option<ExtendedData>,
    system_capabilities: Option<SystemCapabilities>,
}

impl From<CalibrationToken> for TokenWire {
    fn from(token: CalibrationToken) -> Self {
        Self {
            barcode_data: token.barcode_data,
            key: token.key,
            value: token.value,
            small_barcode_sequence_index: token.small_barcode_sequence_index,
            small_barcode_sequence_count: token.small_barcode_sequence_count,
            remaining: token.remaining,
            calibrations_remaining: token.calibrations_remaining,
            information: token.diagnostics.information().cloned().collect(),
            warnings: token.diagnostics.warnings().cloned().collect(),
            errors: token.diagnostics.errors().cloned().collect(),
            prefix: token.reported_prefix_segment,
            suffix: token.reported_suffix,
            reported_characters: token.reported_characters,
            calibration_session_abandoned: token.calibration_session_abandoned,
            extended_data: token.extended_data,
            system_capabilities: token.system_capabilities,
        }
    }
}

impl From<TokenWire> for CalibrationToken {
    fn from(wire: TokenWire) -> Self {
        let mut diagnostics = DiagnosticLog::new();
        for record in wire
            .information
            .into_iter()
            .chain(wire.warnings)
            .chain(wire.errors)
        {
            diagnostics.record(record);
        }
        Self {
            barcode_data: wire.barcode_data,
            key: wire.key,
            value: wire.value,
            small_barcode_sequence_index: wire.small_barcode_sequence_index,
            small_barcode_sequence_count: wire.small_barcode_sequence_count,
            remaining: wire.remaining,
            calibrations_remaining: wire.calibrations_remaining,
            diagnostics,
            reported_prefix_segment: wire.prefix,
            reported_suffix: wire.suffix,
            reported_characters: wire.reported_characters,
            calibration_session_abandoned: wire.calibration_session_abandoned,
            extended_data: wire.extended_data,
            system_capabilities: wire.system_capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn baseline_token_has_no_key() {
        let token = CalibrationToken::baseline("data", 3);
        assert!(token.is_baseline());
        assert_eq!(token.dead_key(), None);
        assert_eq!(token.remaining, 3);
    }

    #[test]
    fn supplementary_token_names_its_dead_key() {
        let token = CalibrationToken::supplementary("data", '\u{b4}', '\'', 1, 1);
        assert!(!token.is_baseline());
        assert_eq!(token.dead_key(), Some('\u{b4}'));
        assert_eq!(token.value, Some('\''));
    }

    #[test]
    fn abandonment_codes_poison_the_token() {
        let mut token = CalibrationToken::baseline("data", 1);
        token.log(EventCode::UnrecognisedData);
        assert!(token.calibration_session_abandoned);
    }

    #[test]
    fn json_round_trip_splits_diagnostic_bands() {
        let mut token = CalibrationToken::baseline("payload", 2);
        token.log(EventCode::AimSupported);
        token.log(EventCode::CapsLockOn);
        token.log_with(EventCode::MultipleKeys, &["x"]);
        token.reported_characters.insert('q');

        let json = token.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["barcodeData"], "payload");
        assert_eq!(value["information"][0]["type"], 110);
        assert_eq!(value["warnings"][0]["type"], 205);
        assert_eq!(value["errors"][0]["type"], 310);

        let back = CalibrationToken::from_json(&json).unwrap();
        assert_eq!(back, token);
    }
}
