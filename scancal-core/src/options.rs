// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Calibration Options
//!
//! Caller-supplied context for a calibration session. The engine performs
//! no environment probing of its own: platform, CAPS LOCK state, and the
//! measured data-entry interval all arrive as values.
//

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why the calibrator is being run.
///
/// Under [`Assumption::NoCalibration`] the engine analyses the reported
/// data and synthesises capabilities but emits no translation tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assumption {
    #[default]
    Calibration,
    NoCalibration,
}

/// Host operating system family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    Windows,
    Linux,
    Macintosh,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "Windows"),
            Self::Linux => write!(f, "Linux"),
            Self::Macintosh => write!(f, "Macintosh"),
        }
    }
}

/// A fault raised while pre-processing reported input.
///
/// Faults never abort translation; they travel alongside the output so the
/// caller can decide what to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessorFault {
    pub description: String,
    /// True when the input could not be safely transformed and was passed
    /// through unchanged.
    pub fatal: bool,
}

impl PreprocessorFault {
    #[must_use]
    pub fn advisory(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fatal: false,
        }
    }

    #[must_use]
    pub fn fatal(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fatal: true,
        }
    }
}

/// A caller-supplied input transform applied before analysis/translation.
pub type Preprocessor = fn(&str, &mut Vec<PreprocessorFault>) -> String;

/// Per-invocation calibration context.
#[derive(Debug, Clone)]
pub struct CalibrationOptions {
    /// Declared CAPS LOCK state; `None` when unknown.
    pub caps_lock: Option<bool>,
    /// Host platform, for case-inference rules.
    pub platform: Platform,
    /// Wall-clock interval the caller measured for the whole scan.
    pub data_entry_timespan: Duration,
    /// Classify the keyboard layout script from reported output.
    pub assess_script: bool,
    /// Input transforms applied to the reported string before analysis.
    pub preprocessors: Vec<Preprocessor>,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            caps_lock: None,
            platform: Platform::default(),
            data_entry_timespan: Duration::ZERO,
            assess_script: true,
            preprocessors: Vec::new(),
        }
    }
}

impl CalibrationOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_caps_lock(mut self, on: bool) -> Self {
        self.caps_lock = Some(on);
        self
    }

    #[must_use]
    pub fn with_data_entry_timespan(mut self, timespan: Duration) -> Self {
        self.data_entry_timespan = timespan;
        self
    }

    #[must_use]
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }
}
