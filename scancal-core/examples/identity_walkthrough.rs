//! =============================================================================
//! Scancal Core — Identity Calibration Walkthrough
//! =============================================================================
//!
//! Demonstrates:
//!   • Generating the baseline calibration payload
//!   • Simulating a scan on matching keyboard layouts
//!   • Inspecting the resulting token and diagnostics
//!   • Translating barcode input with the calibrated tables
//!
//! Run with:
//!   cargo run --example identity_walkthrough
//! =============================================================================

use scancal_core::chars::visualized;
use scancal_core::{Assumption, CalibrationOptions, Calibrator};

fn main() {
    env_logger::init();

    let mut calibrator = Calibrator::new(Assumption::Calibration);

    // -------------------------------------------------------------------------
    // The payload the client would encode into a data matrix barcode
    // -------------------------------------------------------------------------
    let tokens = calibrator
        .calibration_tokens(None)
        .expect("unchunked payload generation cannot fail");
    println!("baseline payload: {}", visualized(&tokens[0].barcode_data));

    // -------------------------------------------------------------------------
    // Matching layouts: the OS reports the payload verbatim
    // -------------------------------------------------------------------------
    let reported = tokens[0].barcode_data.clone();
    let token = calibrator.calibrate(&reported, &tokens[0], &CalibrationOptions::default());

    println!("errors: {}", token.diagnostics.errors().count());
    for record in token.diagnostics.information() {
        println!("info {}: {}", record.code as u16, record.description);
    }

    // -------------------------------------------------------------------------
    // Runtime translation
    // -------------------------------------------------------------------------
    let translation = calibrator.process_input("]d201034531200000111719112510ABC123");
    println!("translated: {}", translation.text);

    if let Some(capabilities) = token.system_capabilities.as_ref() {
        println!(
            "keyboard script: {}, can read GS1: {}",
            capabilities.keyboard_script, capabilities.can_read_group_separators
        );
    }
}
