//! =============================================================================
//! Scancal Core — Mismatched Layout Translation Example
//! =============================================================================
//!
//! Demonstrates:
//!   • Simulating a French AZERTY host with a QWERTY-configured scanner
//!   • Building the character map from one baseline scan
//!   • Recovering barcode digits from shifted-symbol reports
//!
//! Run with:
//!   cargo run --example azerty_translation
//! =============================================================================

use std::collections::HashMap;

use scancal_core::{Assumption, CalibrationOptions, Calibrator};

fn main() {
    env_logger::init();

    // How the AZERTY host reports the scanner's keystrokes.
    let layout: HashMap<char, char> = [
        ('1', '&'),
        ('&', '7'),
        ('7', 'è'),
        ('2', 'é'),
        ('a', 'q'),
        ('q', 'a'),
        ('w', 'z'),
        ('z', 'w'),
    ]
    .into_iter()
    .collect();

    let mut calibrator = Calibrator::new(Assumption::Calibration);
    let tokens = calibrator
        .calibration_tokens(None)
        .expect("unchunked payload generation cannot fail");

    let reported: String = tokens[0]
        .barcode_data
        .chars()
        .map(|c| layout.get(&c).copied().unwrap_or(c))
        .collect();

    let token = calibrator.calibrate(&reported, &tokens[0], &CalibrationOptions::default());
    println!("errors: {}", token.diagnostics.errors().count());
    for record in token.diagnostics.warnings() {
        println!("warning {}: {}", record.code as u16, record.description);
    }

    if let Some(data) = token.extended_data.as_ref() {
        println!("character map entries: {}", data.character_map.len());
    }

    // The scanner reads "12" but the host reported "&é".
    let translation = calibrator.process_input("&é");
    println!("reported \"&é\" translates to {:?}", translation.text);
}
