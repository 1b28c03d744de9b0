// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # System Capabilities
//!
//! The derived feature matrix computed at the end of a calibration run.
//! Everything here is a pure function of the diagnostics log, the
//! translation tables, and the caller-supplied scan timing; the report is
//! what clients use to decide which barcode formats they can trust.
//

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::ExtendedData;
use crate::diagnostics::{DiagnosticLog, EventCode};
use crate::script::KeyboardScript;

//
// Keyboard performance bands on the per-scan total data-entry interval.
// HID keyboard wedges normally deliver a whole baseline scan well inside a
// second; multi-second deliveries indicate inter-character delays that will
// hurt high-volume scanning.
//
const HIGH_PERFORMANCE_CEILING: Duration = Duration::from_millis(1000);
const MEDIUM_PERFORMANCE_CEILING: Duration = Duration::from_millis(3000);

/// Data-entry throughput band for the scanner keyboard wedge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardPerformance {
    #[default]
    High,
    Medium,
    Low,
}

/// Band a per-scan interval.
#[must_use]
pub fn performance_band(data_entry_timespan: Duration) -> KeyboardPerformance {
    if data_entry_timespan <= HIGH_PERFORMANCE_CEILING {
        KeyboardPerformance::High
    } else if data_entry_timespan <= MEDIUM_PERFORMANCE_CEILING {
        KeyboardPerformance::Medium
    } else {
        KeyboardPerformance::Low
    }
}

/// Characters per second over a scan, rounded down. Zero when no interval
/// was measured.
#[must_use]
pub fn characters_per_second(payload_chars: usize, data_entry_timespan: Duration) -> u32 {
    let secs = data_entry_timespan.as_secs_f64();
    if secs <= f64::EPSILON {
        return 0;
    }
    let rate = payload_chars as f64 / secs;
    if rate >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rate as u32
    }
}

/// Derived boolean feature matrix for the calibrated system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemCapabilities {
    pub can_read_invariant_characters: bool,
    pub can_read_additional_ascii_characters: bool,
    pub can_read_format_05: bool,
    pub can_read_format_06: bool,
    pub can_read_edi: bool,
    pub can_read_group_separators: bool,
    pub aim_identifiers_supported: bool,
    pub aim_identifiers_reliably_supported: bool,
    pub scanner_transmits_aim_identifiers: bool,
    pub scanner_transmits_prefix: bool,
    pub scanner_transmits_code: bool,
    pub scanner_transmits_suffix: bool,
    pub scanner_transmits_end_of_line: bool,
    pub keyboard_script: String,
    pub scanner_keyboard_performance: KeyboardPerformance,
    pub scanner_characters_per_second: u32,
    /// Declared CAPS LOCK state; `None` when never declared.
    pub caps_lock: Option<bool>,
}

impl SystemCapabilities {
    /// Compute the matrix from a finished (or failed) session.
    #[must_use]
    pub fn synthesize(
        log: &DiagnosticLog,
        data: Option<&ExtendedData>,
        caps_lock: Option<bool>,
        script: KeyboardScript,
        data_entry_timespan: Duration,
        payload_chars: usize,
    ) -> Self {
        let failed = log.has_errors();

        let gs_readable = log.contains(EventCode::GroupSeparatorSupported)
            && !log.contains(EventCode::NoGroupSeparatorMapping)
            && !log.contains(EventCode::GroupSeparatorNotReliablyReadableInvariant);
        let rs_readable = log.contains(EventCode::RecordSeparatorSupported)
            && !log.contains(EventCode::RecordSeparatorNotReadable)
            && !log.contains(EventCode::RecordSeparatorNotReliablyReadable)
            && !log.contains(EventCode::RecordSeparatorNotReliablyReadableInvariant);
        let fs_readable = log.contains(EventCode::FileSeparatorSupported)
            && !log.contains(EventCode::FileSeparatorNotReadable)
            && !log.contains(EventCode::FileSeparatorNotReliablyReadable)
            && !log.contains(EventCode::FileSeparatorNotReliablyReadableInvariant);
        let us_readable = log.contains(EventCode::UnitSeparatorSupported)
            && !log.contains(EventCode::UnitSeparatorNotReadable)
            && !log.contains(EventCode::UnitSeparatorNotReliablyReadable)
            && !log.contains(EventCode::UnitSeparatorNotReliablyReadableInvariant);
        let eot_readable = log.contains(EventCode::EndOfTransmissionSupported)
            && !log.contains(EventCode::EotNotReadable)
            && !log.contains(EventCode::EotNotReliablyReadable)
            && !log.contains(EventCode::EotNotReliablyReadableInvariant);

        let additional_ascii_ok = !failed
            && !log.contains(EventCode::MultipleKeysNonInvariantCharacters)
            && !log.contains(EventCode::DeadKeyMultiMappingNonInvariantCharacters)
            && !log.contains(EventCode::NonInvariantCharacterUnrecognised);

        let aim_sequence = data.map(|d| d.aim_flag_sequence.as_str()).unwrap_or("");
        let aim_supported = !failed
            && !aim_sequence.is_empty()
            && aim_sequence != "\u{0}"
            && !log.contains(EventCode::NonCorrespondingKeyboardLayoutsForAimIdentifier);
        let aim_reliable = aim_supported && !aim_sequence.starts_with('\u{0}');

        Self {
            can_read_invariant_characters: !failed,
            can_read_additional_ascii_characters: additional_ascii_ok,
            can_read_format_05: !failed && gs_readable && rs_readable && eot_readable,
            can_read_format_06: !failed && gs_readable && rs_readable && eot_readable,
            can_read_edi: !failed
                && fs_readable
                && us_readable
                && !log.contains(EventCode::IsoIec15434EdiNotReliablyReadable),
            can_read_group_separators: !failed && gs_readable,
            aim_identifiers_supported: aim_supported,
            aim_identifiers_reliably_supported: aim_reliable,
            scanner_transmits_aim_identifiers: log.contains(EventCode::AimTransmitted),
            scanner_transmits_prefix: log.contains(EventCode::PrefixTransmitted),
            scanner_transmits_code: log.contains(EventCode::CodeTransmitted),
            scanner_transmits_suffix: log.contains(EventCode::SuffixTransmitted),
            scanner_transmits_end_of_line: log.contains(EventCode::EndOfLineTransmitted),
            keyboard_script: script.to_string(),
            scanner_keyboard_performance: performance_band(data_entry_timespan),
            scanner_characters_per_second: characters_per_second(
                payload_chars,
                data_entry_timespan,
            ),
            caps_lock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_bands() {
        assert_eq!(
            performance_band(Duration::from_millis(400)),
            KeyboardPerformance::High
        );
        assert_eq!(
            performance_band(Duration::from_millis(2000)),
            KeyboardPerformance::Medium
        );
        assert_eq!(
            performance_band(Duration::from_secs(10)),
            KeyboardPerformance::Low
        );
    }

    #[test]
    fn characters_per_second_rounds_down() {
        assert_eq!(characters_per_second(200, Duration::from_secs(2)), 100);
        assert_eq!(characters_per_second(200, Duration::ZERO), 0);
    }

    #[test]
    fn failed_session_reads_nothing() {
        let mut log = DiagnosticLog::new();
        log.add(EventCode::CalibrationFailed);
        log.add(EventCode::NoGroupSeparatorMapping);
        let caps = SystemCapabilities::synthesize(
            &log,
            None,
            None,
            KeyboardScript::Latin,
            Duration::from_millis(500),
            180,
        );
        assert!(!caps.can_read_invariant_characters);
        assert!(!caps.can_read_format_05);
        assert!(!caps.aim_identifiers_supported);
    }

    #[test]
    fn clean_session_reads_formats() {
        let mut log = DiagnosticLog::new();
        log.add(EventCode::GroupSeparatorSupported);
        log.add(EventCode::RecordSeparatorSupported);
        log.add(EventCode::FileSeparatorSupported);
        log.add(EventCode::UnitSeparatorSupported);
        log.add(EventCode::EndOfTransmissionSupported);
        let mut data = ExtendedData::new();
        data.aim_flag_sequence = "]".into();
        let caps = SystemCapabilities::synthesize(
            &log,
            Some(&data),
            Some(false),
            KeyboardScript::Latin,
            Duration::from_millis(500),
            180,
        );
        assert!(caps.can_read_invariant_characters);
        assert!(caps.can_read_format_05);
        assert!(caps.can_read_format_06);
        assert!(caps.can_read_edi);
        assert!(caps.aim_identifiers_supported);
        assert!(caps.aim_identifiers_reliably_supported);
        assert_eq!(caps.caps_lock, Some(false));
    }
}
