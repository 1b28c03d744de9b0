// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Case & CAPS LOCK Inference
//!
//! Letter-case anomalies in the invariant segment say a lot about the
//! system: CAPS LOCK left on, a scanner configured to force case, or a
//! scanner pre-inverting to compensate for CAPS LOCK. The decision table
//! keys on the declared CAPS LOCK state, the two observed conversion
//! directions, and the platform (Macintosh CAPS LOCK upper-cases letters
//! instead of inverting them).
//

use crate::diagnostics::EventCode;
use crate::options::Platform;
use crate::token::CalibrationToken;

/// Observed letter-case conversions over the invariant segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseObservations {
    /// Count of upper-case letters reported as their lower-case twin.
    pub upper_reported_lower: u32,
    /// Count of lower-case letters reported as their upper-case twin.
    pub lower_reported_upper: u32,
}

impl CaseObservations {
    /// Every letter flipped in both directions: the trivial inversion the
    /// translator can compensate for.
    #[must_use]
    pub fn full_inversion(self) -> bool {
        self.upper_reported_lower == 26 && self.lower_reported_upper == 26
    }
}

/// Apply the decision table, recording diagnostics on the token.
pub fn infer(
    caps_lock: Option<bool>,
    platform: Platform,
    observed: CaseObservations,
    token: &mut CalibrationToken,
) {
    let upper_to_lower = observed.upper_reported_lower > 0;
    let lower_to_upper = observed.lower_reported_upper > 0;
    let mac = platform == Platform::Macintosh;

    match caps_lock {
        Some(true) => {
            token.log(EventCode::CapsLockOn);
            match (upper_to_lower, lower_to_upper) {
                // Inversion is exactly what CAPS LOCK produces.
                (true, true) => {}
                (false, true) if !mac => token.log(EventCode::ScannerMayConvertToLowerCase),
                // Macintosh CAPS LOCK upper-cases letters; this is expected.
                (false, true) => {}
                (true, false) => token.log(EventCode::ScannerMayConvertToUpperCase),
                (false, false) if !mac => {
                    token.log(EventCode::ScannerMayCompensateForCapsLock);
                }
                (false, false) => {}
            }
        }
        Some(false) | None => match (upper_to_lower, lower_to_upper) {
            (true, true) if mac => token.log(EventCode::ScannerMayInvertCase),
            (true, true) => token.log(EventCode::CapsLockProbablyOn),
            (true, false) => token.log(EventCode::ScannerMayConvertToUpperCase),
            (false, true) => token.log(EventCode::ScannerMayConvertToLowerCase),
            (false, false) => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(upper: u32, lower: u32) -> CaseObservations {
        CaseObservations {
            upper_reported_lower: upper,
            lower_reported_upper: lower,
        }
    }

    #[test]
    fn declared_on_with_inversion_logs_caps_lock_only() {
        let mut token = CalibrationToken::default();
        infer(Some(true), Platform::Windows, observed(26, 26), &mut token);
        assert!(token.diagnostics.contains(EventCode::CapsLockOn));
        assert_eq!(token.diagnostics.entries().len(), 1);
    }

    #[test]
    fn undeclared_inversion_suggests_caps_lock() {
        let mut token = CalibrationToken::default();
        infer(None, Platform::Windows, observed(26, 26), &mut token);
        assert!(token.diagnostics.contains(EventCode::CapsLockProbablyOn));
    }

    #[test]
    fn undeclared_inversion_on_mac_is_a_scanner_setting() {
        let mut token = CalibrationToken::default();
        infer(None, Platform::Macintosh, observed(26, 26), &mut token);
        assert!(token.diagnostics.contains(EventCode::ScannerMayInvertCase));
        assert!(!token.diagnostics.contains(EventCode::CapsLockProbablyOn));
    }

    #[test]
    fn mac_caps_lock_upper_casing_is_expected() {
        let mut token = CalibrationToken::default();
        infer(Some(true), Platform::Macintosh, observed(0, 26), &mut token);
        assert!(token.diagnostics.contains(EventCode::CapsLockOn));
        assert_eq!(token.diagnostics.entries().len(), 1);
    }

    #[test]
    fn caps_on_with_no_conversions_means_compensation() {
        let mut token = CalibrationToken::default();
        infer(Some(true), Platform::Windows, observed(0, 0), &mut token);
        assert!(token
            .diagnostics
            .contains(EventCode::ScannerMayCompensateForCapsLock));
    }

    #[test]
    fn one_directional_conversions() {
        let mut token = CalibrationToken::default();
        infer(None, Platform::Linux, observed(26, 0), &mut token);
        assert!(token
            .diagnostics
            .contains(EventCode::ScannerMayConvertToUpperCase));

        let mut token = CalibrationToken::default();
        infer(Some(false), Platform::Linux, observed(0, 26), &mut token);
        assert!(token
            .diagnostics
            .contains(EventCode::ScannerMayConvertToLowerCase));
    }
}
