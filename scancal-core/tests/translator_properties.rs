// -----------------------------------------------------------------------------
// Scancal — Translator Properties
// -----------------------------------------------------------------------------
//
// Universally quantified checks over the calibrate-then-translate pipeline.
// -----------------------------------------------------------------------------

use std::collections::HashMap;

use scancal_core::chars::{INVARIANTS, NULL_CHAR};
use scancal_core::{Assumption, CalibrationOptions, CalibrationToken, Calibrator};

fn calibrate_with(map: &HashMap<char, char>) -> (Calibrator, CalibrationToken) {
    let mut calibrator = Calibrator::new(Assumption::Calibration);
    let payload = calibrator.baseline_barcode_data(None).unwrap().remove(0);
    let reported: String = payload
        .chars()
        .map(|c| map.get(&c).copied().unwrap_or(c))
        .collect();
    let tokens = calibrator.calibration_tokens(None).unwrap();
    let token = calibrator.calibrate(&reported, &tokens[0], &CalibrationOptions::default());
    (calibrator, token)
}

fn azerty_like() -> HashMap<char, char> {
    [
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
    .collect()
}

// -----------------------------------------------------------------------------
// Property 1 — every invariant survives the round trip
// -----------------------------------------------------------------------------

#[test]
fn every_invariant_translates_back() {
    let map = azerty_like();
    let (calibrator, token) = calibrate_with(&map);
    assert!(!token.has_errors());

    for i in INVARIANTS.chars() {
        let reported = map.get(&i).copied().unwrap_or(i);
        let translated = calibrator.process_input(&reported.to_string()).text;
        assert!(
            translated.contains(i),
            "invariant {i:?} lost: reported {reported:?} translated to {translated:?}"
        );
    }
}

// -----------------------------------------------------------------------------
// Property 2 — the invariant segment of the baseline round-trips
// -----------------------------------------------------------------------------

#[test]
fn baseline_invariant_segment_round_trips() {
    let map = azerty_like();
    let (calibrator, token) = calibrate_with(&map);
    assert!(!token.has_errors());

    let literal_segment: String = INVARIANTS
        .chars()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let reported_segment: String = literal_segment
        .chars()
        .map(|c| map.get(&c).copied().unwrap_or(c))
        .collect();

    assert_eq!(
        calibrator.process_input(&reported_segment).text,
        literal_segment
    );
}

// -----------------------------------------------------------------------------
// Property 3 — translation is idempotent once dead key markers are gone
// -----------------------------------------------------------------------------

#[test]
fn translation_is_idempotent_on_translated_output() {
    // A dead key layout: the reported alphabet (NUL sequences) and the
    // translated alphabet (plain ASCII) are disjoint on the mapped keys.
    let mut calibrator = Calibrator::new(Assumption::Calibration);
    let payload = calibrator.baseline_barcode_data(None).unwrap().remove(0);
    let reported = payload.replacen("' (", "\u{0}'(", 1);
    let tokens = calibrator.calibration_tokens(None).unwrap();
    let token = calibrator.calibrate(&reported, &tokens[0], &CalibrationOptions::default());

    // Complete the pending supplementary scan with no combining pairs.
    let supplementary: String = token
        .barcode_data
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .flat_map(|pair| [NULL_CHAR, pair[0], pair[1]])
        .collect();
    let token = calibrator.calibrate(&supplementary, &token, &CalibrationOptions::default());
    assert!(!token.has_errors());

    for input in ["\u{0}'A12", "]d2123456", "abc xyz\r\n", "\u{0}'\u{0}'"] {
        let once = calibrator.process_input(input).text;
        let twice = calibrator.process_input(&once).text;
        assert_eq!(once, twice, "not idempotent for {input:?}");
        assert!(!once.contains(NULL_CHAR), "markers survived in {once:?}");
    }
}

// -----------------------------------------------------------------------------
// Property 4 — no silent ambiguity on invariants
// -----------------------------------------------------------------------------

#[test]
fn ambiguous_invariants_error_the_token() {
    // Both 'a' and 'q' report as 'q'.
    let map: HashMap<char, char> = [('a', 'q')].into_iter().collect();
    let (_calibrator, token) = calibrate_with(&map);
    assert!(token.has_errors());
}

// -----------------------------------------------------------------------------
// Property 5 — dead key closure
// -----------------------------------------------------------------------------

#[test]
fn single_character_dead_key_values_close_over_the_character_map() {
    let mut calibrator = Calibrator::new(Assumption::Calibration);
    let payload = calibrator.baseline_barcode_data(None).unwrap().remove(0);
    let reported = payload.replacen("' (", "\u{0}'(", 1);
    let tokens = calibrator.calibration_tokens(None).unwrap();
    let token = calibrator.calibrate(&reported, &tokens[0], &CalibrationOptions::default());
    assert!(!token.has_errors());

    // The tables so far live on the final token only; drive the session to
    // completion first.
    let supplementary: String = token
        .barcode_data
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .flat_map(|pair| [NULL_CHAR, pair[0], pair[1]])
        .collect();
    let token = calibrator.calibrate(&supplementary, &token, &CalibrationOptions::default());
    let data = token.extended_data.as_ref().expect("tables emitted");

    for (key, value) in &data.dead_keys_map {
        if value.chars().count() != 1 {
            continue;
        }
        let c = key.chars().nth(1).expect("dead key keys are NUL plus char");
        let v = value.chars().next().expect("single character value");
        assert!(
            c == v || data.character_map.get(&c) == Some(&v),
            "dead key {key:?} -> {value:?} does not close"
        );
    }
}

// -----------------------------------------------------------------------------
// Property 6 — suffix handling is conservative
// -----------------------------------------------------------------------------

#[test]
fn empty_declared_suffix_leaves_trailing_runs_alone() {
    let (calibrator, token) = calibrate_with(&HashMap::new());
    assert!(!token.has_errors());
    assert!(token
        .extended_data
        .as_ref()
        .expect("tables emitted")
        .reported_suffix
        .is_empty());

    for input in ["data   \r\n", "data\u{1d}\u{1e} ", "data \u{4}\r"] {
        assert_eq!(calibrator.process_input(input).text, input);
    }
}
