// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Scancal Core
//!
//! Calibration engine for keyboard-wedge barcode scanners.
//!
//! A scanner that emulates a keyboard emits scan codes from its configured
//! layout; the host OS translates them with a possibly different layout, so
//! what an application reads may not be what the barcode held. This crate
//! infers, from one scan of a known calibration barcode (plus one
//! supplementary scan per discovered dead key), a deterministic
//! transformation back to the original barcode bytes, or proves that no
//! such transformation exists and reports exactly why.
//!
//! Guarantees:
//! - Purely in-memory, single-threaded, no I/O of any kind
//! - Nothing is thrown across the public API; anomalies land in the
//!   token's diagnostics log with stable numeric codes
//! - Serialized token and table shapes are stable
//!
//! Non-goals:
//! - Barcode image generation and data-matrix encoding
//! - Orchestration CLI and user interaction
//! - GS1 / ISO-IEC 15434 payload parsing
//!
//! ## Typical session
//!
//! ```rust
//! use scancal_core::{Assumption, CalibrationOptions, Calibrator};
//!
//! let mut calibrator = Calibrator::new(Assumption::Calibration);
//! let tokens = calibrator.calibration_tokens(None).unwrap();
//!
//! // Print/display tokens[0].barcode_data as a barcode, scan it, and feed
//! // back what the OS reported. An identity layout reports it verbatim:
//! let reported = tokens[0].barcode_data.clone();
//! let token = calibrator.calibrate(&reported, &tokens[0], &CalibrationOptions::default());
//! assert!(!token.has_errors());
//!
//! let translation = calibrator.process_input("]d2123456");
//! assert_eq!(translation.text, "]d2123456");
//! ```
//

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod analysis;
pub mod assemble;
pub mod calibrator;
pub mod capabilities;
pub mod chars;
pub mod data;
pub mod diagnostics;
pub mod elements;
pub mod options;
pub mod patterns;
pub mod payload;
pub mod provenance;
pub mod script;
pub mod segment;
pub mod token;
pub mod translate;

//
// Re-export for ergonomic API, so consumers can write:
//     use scancal_core::{Calibrator, CalibrationToken};
//
// Instead of:
//     use scancal_core::calibrator::Calibrator;
//
pub use calibrator::Calibrator;
pub use capabilities::{KeyboardPerformance, SystemCapabilities};
pub use data::ExtendedData;
pub use diagnostics::{Diagnostic, DiagnosticLog, EventCode, Severity};
pub use elements::{BuiltinElements, ElementRegistry};
pub use options::{Assumption, CalibrationOptions, Platform, Preprocessor, PreprocessorFault};
pub use script::KeyboardScript;
pub use token::CalibrationToken;
pub use translate::Translation;
