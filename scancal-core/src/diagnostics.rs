// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Calibration Diagnostics
//!
//! Every anomaly the engine observes is recorded as a [`Diagnostic`] with a
//! stable numeric code and a severity. Codes are banded:
//!
//! - `[100, 200)` informational observations
//! - `[200, 300)` warnings (calibration succeeded with caveats)
//! - `[300, 400)` errors (calibration failed, no tables emitted)
//!
//! Nothing is thrown across the public API boundary; callers inspect the
//! log attached to the token. Code values and the serialized record shape
//! `{type, level, description}` are part of the ABI and must not change.
//

use std::fmt;

use serde::{Deserialize, Serialize};

//
// =============================================================================
// Severity
// =============================================================================
//

/// Severity band of a diagnostic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Information => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = InvalidSeverity;

    fn try_from(value: u8) -> Result<Self, InvalidSeverity> {
        match value {
            1 => Ok(Self::Information),
            2 => Ok(Self::Warning),
            3 => Ok(Self::Error),
            other => Err(InvalidSeverity(other)),
        }
    }
}

/// A serialized severity level outside the 1..=3 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverity(pub u8);

impl fmt::Display for InvalidSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid diagnostic severity level: {}", self.0)
    }
}

impl std::error::Error for InvalidSeverity {}

//
// =============================================================================
// Event codes
// =============================================================================
//

/// Stable numeric diagnostic codes.
///
/// Discriminant values are the on-the-wire `type` field. New codes may be
/// appended within a band; existing values never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum EventCode {
    // -------------------------------
    // Information [100, 200)
    // -------------------------------
    KeyboardScript = 100,
    Platform = 101,
    AimSupported = 110,
    AimTransmitted = 111,
    GroupSeparatorSupported = 115,
    RecordSeparatorSupported = 116,
    FileSeparatorSupported = 117,
    UnitSeparatorSupported = 118,
    EndOfTransmissionSupported = 119,
    KeyboardLayoutsCorrespond = 120,
    DeadKeyLiteralIdentified = 121,

    // -------------------------------
    // Warnings [200, 300)
    // -------------------------------
    PrefixTransmitted = 200,
    CodeTransmitted = 201,
    SuffixTransmitted = 202,
    EndOfLineTransmitted = 203,
    CapsLockOn = 205,
    CapsLockProbablyOn = 206,
    ScannerMayConvertToUpperCase = 207,
    ScannerMayConvertToLowerCase = 208,
    ScannerMayInvertCase = 209,
    ScannerMayCompensateForCapsLock = 210,
    NonCorrespondingKeyboardLayouts = 215,
    NonCorrespondingKeyboardLayoutsForInvariants = 216,
    NonCorrespondingKeyboardLayoutsForNonInvariants = 217,
    NonCorrespondingKeyboardLayoutsForAimIdentifier = 218,
    MultipleKeysNonInvariantCharacters = 220,
    DeadKeyMultiMappingNonInvariantCharacters = 221,
    NonInvariantCharacterUnrecognised = 222,
    GroupSeparatorNotReliablyReadableInvariant = 225,
    RecordSeparatorNotReliablyReadableInvariant = 226,
    FileSeparatorNotReliablyReadableInvariant = 227,
    UnitSeparatorNotReliablyReadableInvariant = 228,
    EotNotReliablyReadableInvariant = 229,
    RecordSeparatorNotReadable = 230,
    FileSeparatorNotReadable = 231,
    UnitSeparatorNotReadable = 232,
    EotNotReadable = 233,
    RecordSeparatorNotReliablyReadable = 235,
    FileSeparatorNotReliablyReadable = 236,
    UnitSeparatorNotReliablyReadable = 237,
    EotNotReliablyReadable = 238,
    IsoIec15434EdiNotReliablyReadable = 239,
    SubOptimalScannerKeyboardPerformance = 240,

    // -------------------------------
    // Errors [300, 400)
    // -------------------------------
    CalibrationFailed = 300,
    CalibrationFailedUnexpectedly = 301,
    NoCalibrationDataReported = 303,
    UnrecognisedData = 304,
    PartialCalibrationDataReported = 305,
    IncorrectCalibrationDataReported = 306,
    NoTemporaryDelimiterCandidate = 307,
    NoDelimiters = 308,
    MultipleKeys = 310,
    MultipleSequences = 311,
    DeadKeyMultipleKeys = 312,
    DeadKeyMultiMapping = 313,
    NoGroupSeparatorMapping = 315,
    UndetectedInvariantCharacters = 316,
}

impl EventCode {
    /// Severity band this code belongs to.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self as u16 {
            100..=199 => Severity::Information,
            200..=299 => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// True for the codes that abandon the calibration session outright.
    #[must_use]
    pub fn abandons_session(self) -> bool {
        matches!(
            self,
            Self::PartialCalibrationDataReported
                | Self::IncorrectCalibrationDataReported
                | Self::UnrecognisedData
                | Self::NoCalibrationDataReported
        )
    }

    /// English message template. `{0}` is replaced by the first argument.
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::KeyboardScript => "the OS keyboard layout reports {0} script characters",
            Self::Platform => "calibration was performed for the {0} platform",
            Self::AimSupported => "AIM symbology identifiers are supported",
            Self::AimTransmitted => "the scanner transmits an AIM symbology identifier: {0}",
            Self::GroupSeparatorSupported => "group separator characters are supported",
            Self::RecordSeparatorSupported => "record separator characters are supported",
            Self::FileSeparatorSupported => "file separator characters are supported",
            Self::UnitSeparatorSupported => "unit separator characters are supported",
            Self::EndOfTransmissionSupported => "end-of-transmission characters are supported",
            Self::KeyboardLayoutsCorrespond => {
                "the scanner and OS keyboard layouts correspond"
            }
            Self::DeadKeyLiteralIdentified => {
                "the literal dead key character was identified as {0}"
            }
            Self::PrefixTransmitted => "the scanner transmits a prefix: {0}",
            Self::CodeTransmitted => "the scanner transmits a code between prefix and data: {0}",
            Self::SuffixTransmitted => "the scanner transmits a suffix: {0}",
            Self::EndOfLineTransmitted => "the scanner transmits an end-of-line sequence",
            Self::CapsLockOn => "CAPS LOCK is switched on",
            Self::CapsLockProbablyOn => "CAPS LOCK appears to be switched on",
            Self::ScannerMayConvertToUpperCase => {
                "the scanner may be configured to convert letters to upper case"
            }
            Self::ScannerMayConvertToLowerCase => {
                "the scanner may be configured to convert letters to lower case"
            }
            Self::ScannerMayInvertCase => {
                "the scanner may be configured to invert letter case"
            }
            Self::ScannerMayCompensateForCapsLock => {
                "the scanner may be configured to compensate for CAPS LOCK"
            }
            Self::NonCorrespondingKeyboardLayouts => {
                "the scanner and OS keyboard layouts do not correspond"
            }
            Self::NonCorrespondingKeyboardLayoutsForInvariants => {
                "the keyboard layouts do not correspond for invariant characters"
            }
            Self::NonCorrespondingKeyboardLayoutsForNonInvariants => {
                "the keyboard layouts do not correspond for additional ASCII characters"
            }
            Self::NonCorrespondingKeyboardLayoutsForAimIdentifier => {
                "the keyboard layouts do not correspond for AIM identifiers"
            }
            Self::MultipleKeysNonInvariantCharacters => {
                "multiple keys report the same additional ASCII character: {0}"
            }
            Self::DeadKeyMultiMappingNonInvariantCharacters => {
                "a dead key sequence maps multiple additional ASCII characters: {0}"
            }
            Self::NonInvariantCharacterUnrecognised => {
                "the additional ASCII character {0} is not recognised"
            }
            Self::GroupSeparatorNotReliablyReadableInvariant => {
                "group separators are reported as the invariant character {0}"
            }
            Self::RecordSeparatorNotReliablyReadableInvariant => {
                "record separators are reported as the invariant character {0}"
            }
            Self::FileSeparatorNotReliablyReadableInvariant => {
                "file separators are reported as the invariant character {0}"
            }
            Self::UnitSeparatorNotReliablyReadableInvariant => {
                "unit separators are reported as the invariant character {0}"
            }
            Self::EotNotReliablyReadableInvariant => {
                "end-of-transmission characters are reported as the invariant character {0}"
            }
            Self::RecordSeparatorNotReadable => "record separators cannot be read",
            Self::FileSeparatorNotReadable => "file separators cannot be read",
            Self::UnitSeparatorNotReadable => "unit separators cannot be read",
            Self::EotNotReadable => "end-of-transmission characters cannot be read",
            Self::RecordSeparatorNotReliablyReadable => {
                "record separators cannot be reliably read"
            }
            Self::FileSeparatorNotReliablyReadable => "file separators cannot be reliably read",
            Self::UnitSeparatorNotReliablyReadable => "unit separators cannot be reliably read",
            Self::EotNotReliablyReadable => {
                "end-of-transmission characters cannot be reliably read"
            }
            Self::IsoIec15434EdiNotReliablyReadable => {
                "ISO/IEC 15434 EDI data cannot be reliably read"
            }
            Self::SubOptimalScannerKeyboardPerformance => {
                "the scanner keyboard data entry rate is sub-optimal: {0} characters per second"
            }
            Self::CalibrationFailed => "calibration failed",
            Self::CalibrationFailedUnexpectedly => "calibration failed unexpectedly: {0}",
            Self::NoCalibrationDataReported => "no calibration data was reported",
            Self::UnrecognisedData => "the reported data is not recognised as calibration data",
            Self::PartialCalibrationDataReported => "partial calibration data was reported",
            Self::IncorrectCalibrationDataReported => {
                "the reported data does not match the expected calibration barcode"
            }
            Self::NoTemporaryDelimiterCandidate => {
                "no unused temporary delimiter character is available"
            }
            Self::NoDelimiters => "no calibration segment delimiters were detected",
            Self::MultipleKeys => "multiple keys report the invariant character {0}",
            Self::MultipleSequences => {
                "multiple sequences report the invariant character {0}"
            }
            Self::DeadKeyMultipleKeys => {
                "multiple dead keys report the invariant character {0}"
            }
            Self::DeadKeyMultiMapping => {
                "a dead key sequence maps multiple invariant characters: {0}"
            }
            Self::NoGroupSeparatorMapping => "no reliable group separator mapping was found",
            Self::UndetectedInvariantCharacters => {
                "invariant characters were not detected: {0}"
            }
        }
    }
}

impl From<EventCode> for u16 {
    fn from(value: EventCode) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for EventCode {
    type Error = UnknownEventCode;

    fn try_from(value: u16) -> Result<Self, UnknownEventCode> {
        ALL_CODES
            .iter()
            .copied()
            .find(|&c| c as u16 == value)
            .ok_or(UnknownEventCode(value))
    }
}

/// A serialized diagnostic type outside the known code registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownEventCode(pub u16);

impl fmt::Display for UnknownEventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown diagnostic code: {}", self.0)
    }
}

impl std::error::Error for UnknownEventCode {}

const ALL_CODES: &[EventCode] = &[
    EventCode::KeyboardScript,
    EventCode::Platform,
    EventCode::AimSupported,
    EventCode::AimTransmitted,
    EventCode::GroupSeparatorSupported,
    EventCode::RecordSeparatorSupported,
    EventCode::FileSeparatorSupported,
    EventCode::UnitSeparatorSupported,
    EventCode::EndOfTransmissionSupported,
    EventCode::KeyboardLayoutsCorrespond,
    EventCode::DeadKeyLiteralIdentified,
    EventCode::PrefixTransmitted,
    EventCode::CodeTransmitted,
    EventCode::SuffixTransmitted,
    EventCode::EndOfLineTransmitted,
    EventCode::CapsLockOn,
    EventCode::CapsLockProbablyOn,
    EventCode::ScannerMayConvertToUpperCase,
    EventCode::ScannerMayConvertToLowerCase,
    EventCode::ScannerMayInvertCase,
    EventCode::ScannerMayCompensateForCapsLock,
    EventCode::NonCorrespondingKeyboardLayouts,
    EventCode::NonCorrespondingKeyboardLayoutsForInvariants,
    EventCode::NonCorrespondingKeyboardLayoutsForNonInvariants,
    EventCode::NonCorrespondingKeyboardLayoutsForAimIdentifier,
    EventCode::MultipleKeysNonInvariantCharacters,
    EventCode::DeadKeyMultiMappingNonInvariantCharacters,
    EventCode::NonInvariantCharacterUnrecognised,
    EventCode::GroupSeparatorNotReliablyReadableInvariant,
    EventCode::RecordSeparatorNotReliablyReadableInvariant,
    EventCode::FileSeparatorNotReliablyReadableInvariant,
    EventCode::UnitSeparatorNotReliablyReadableInvariant,
    EventCode::EotNotReliablyReadableInvariant,
    EventCode::RecordSeparatorNotReadable,
    EventCode::FileSeparatorNotReadable,
    EventCode::UnitSeparatorNotReadable,
    EventCode::EotNotReadable,
    EventCode::RecordSeparatorNotReliablyReadable,
    EventCode::FileSeparatorNotReliablyReadable,
    EventCode::UnitSeparatorNotReliablyReadable,
    EventCode::EotNotReliablyReadable,
    EventCode::IsoIec15434EdiNotReliablyReadable,
    EventCode::SubOptimalScannerKeyboardPerformance,
    EventCode::CalibrationFailed,
    EventCode::CalibrationFailedUnexpectedly,
    EventCode::NoCalibrationDataReported,
    EventCode::UnrecognisedData,
    EventCode::PartialCalibrationDataReported,
    EventCode::IncorrectCalibrationDataReported,
    EventCode::NoTemporaryDelimiterCandidate,
    EventCode::NoDelimiters,
    EventCode::MultipleKeys,
    EventCode::MultipleSequences,
    EventCode::DeadKeyMultipleKeys,
    EventCode::DeadKeyMultiMapping,
    EventCode::NoGroupSeparatorMapping,
    EventCode::UndetectedInvariantCharacters,
];

//
// =============================================================================
// Diagnostic record & log
// =============================================================================
//

/// One recorded observation: `{type, level, description}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub code: EventCode,
    pub level: Severity,
    pub description: String,
}

impl Diagnostic {
    /// Build a record from a code and message arguments.
    #[must_use]
    pub fn new(code: EventCode, args: &[&str]) -> Self {
        Self {
            code,
            level: code.severity(),
            description: render(code.template(), args),
        }
    }
}

/// Substitute `{0}`, `{1}`, … placeholders.
fn render(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), arg);
    }
    out
}

/// Ordered store of everything observed during a calibration session.
///
/// Entries keep a stable order: ascending code, duplicates suppressed
/// unless their description differs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a code with no message arguments.
    pub fn add(&mut self, code: EventCode) {
        self.push(Diagnostic::new(code, &[]));
    }

    /// Record a code with message arguments.
    pub fn add_with(&mut self, code: EventCode, args: &[&str]) {
        self.push(Diagnostic::new(code, args));
    }

    /// Record an already-rendered diagnostic, preserving its description.
    pub fn record(&mut self, record: Diagnostic) {
        self.push(record);
    }

    fn push(&mut self, record: Diagnostic) {
        if self.entries.contains(&record) {
            return;
        }
        let at = self
            .entries
            .partition_point(|e| e.code as u16 <= record.code as u16);
        self.entries.insert(at, record);
    }

    /// All records, ordered by code.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Records in the informational band.
    pub fn information(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|e| e.level == Severity::Information)
    }

    /// Records in the warning band.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|e| e.level == Severity::Warning)
    }

    /// Records in the error band.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|e| e.level == Severity::Error)
    }

    /// True once any error-band record lands.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// True when the given code has been recorded.
    #[must_use]
    pub fn contains(&self, code: EventCode) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    /// Absorb every record from another log.
    pub fn merge(&mut self, other: &DiagnosticLog) {
        for record in &other.entries {
            self.push(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn codes_sit_in_their_bands() {
        assert_eq!(EventCode::AimSupported.severity(), Severity::Information);
        assert_eq!(EventCode::CapsLockOn.severity(), Severity::Warning);
        assert_eq!(EventCode::CalibrationFailed.severity(), Severity::Error);
    }

    #[test]
    fn log_orders_by_code() {
        let mut log = DiagnosticLog::new();
        log.add(EventCode::CalibrationFailed);
        log.add(EventCode::CapsLockOn);
        log.add(EventCode::AimSupported);
        let codes: Vec<u16> = log.entries().iter().map(|e| e.code as u16).collect();
        assert_eq!(codes, vec![110, 205, 300]);
    }

    #[test]
    fn duplicate_records_are_suppressed() {
        let mut log = DiagnosticLog::new();
        log.add_with(EventCode::MultipleKeys, &["a"]);
        log.add_with(EventCode::MultipleKeys, &["a"]);
        log.add_with(EventCode::MultipleKeys, &["b"]);
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn abandonment_set_matches_policy() {
        assert!(EventCode::UnrecognisedData.abandons_session());
        assert!(EventCode::NoCalibrationDataReported.abandons_session());
        assert!(!EventCode::NoGroupSeparatorMapping.abandons_session());
    }

    #[test]
    fn record_serializes_with_abi_field_names() {
        let record = Diagnostic::new(EventCode::MultipleKeys, &["q"]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], 310);
        assert_eq!(json["level"], 3);
        assert!(json["description"].as_str().unwrap().contains('q'));
    }

    #[test]
    fn codes_round_trip_through_u16() {
        for &code in ALL_CODES {
            assert_eq!(EventCode::try_from(code as u16), Ok(code));
        }
    }
}
