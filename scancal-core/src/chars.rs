// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Scancal Contributors
//
//! # Character Classes
//!
//! Canonical character tables for the calibration engine.
//!
//! The invariant set is the 82-character subset shared by GS1 element
//! strings and ANSI MH10.8.2 data identifiers. Everything else in printable
//! ASCII (0x20..0x7E) is non-invariant. ASCII control characters of
//! interest are the ISO/IEC 15434 envelope controls plus the reserved
//! dead-key marker NUL.
//!
//! Guarantees:
//! - Table ordering is fixed and matches the baseline payload ordering
//! - Predicates are pure and allocation-free
//

//
// =============================================================================
// Control characters
// =============================================================================
//

/// Reserved dead-key marker emitted by the OS before a dead-key sequence.
pub const NULL_CHAR: char = '\u{0}';

/// End-of-transmission, the ISO/IEC 15434 format 05/06 trailer.
pub const EOT_CHAR: char = '\u{4}';

/// File separator (ISO/IEC 15434 EDI envelopes).
pub const FS_CHAR: char = '\u{1c}';

/// Group separator (GS1 FNC1 representation in element strings).
pub const GS_CHAR: char = '\u{1d}';

/// Record separator (ISO/IEC 15434 format envelopes).
pub const RS_CHAR: char = '\u{1e}';

/// Unit separator (ISO/IEC 15434 EDI envelopes).
pub const US_CHAR: char = '\u{1f}';

/// Carriage return.
pub const CR_CHAR: char = '\r';

/// Line feed.
pub const LF_CHAR: char = '\n';

/// Horizontal tab. Ignored wherever it appears in reported input.
pub const HT_CHAR: char = '\t';

/// The AIM symbology identifier flag character.
pub const AIM_FLAG: char = ']';

/// Sentinel emitted by the translator for characters it has never seen.
pub const UNKNOWN_CHAR: char = '\u{25a1}';

//
// =============================================================================
// Character tables
// =============================================================================
//

/// The 82 invariant characters, in baseline payload order.
pub const INVARIANTS: &str =
    "!\"%&'()*+,-./0123456789:;<=>?ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// The 12 printable ASCII characters outside the invariant set (space
/// excluded), in baseline payload order.
pub const NON_INVARIANTS: &str = "#$@[\\]^`{|}~";

/// Envelope control characters probed by the baseline payload, in segment
/// order. GS is always probed; the rest only under format assessment.
pub const PROBED_CONTROLS: [char; 5] = [GS_CHAR, RS_CHAR, FS_CHAR, US_CHAR, EOT_CHAR];

/// True for members of the 82-character invariant set.
#[must_use]
pub fn is_invariant(c: char) -> bool {
    matches!(c,
        '!' | '"' | '%' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | '-' | '.' | '/'
        | '0'..='9'
        | ':' | ';' | '<' | '=' | '>' | '?'
        | 'A'..='Z'
        | '_'
        | 'a'..='z')
}

/// True for printable ASCII outside the invariant set, space excluded.
#[must_use]
pub fn is_non_invariant(c: char) -> bool {
    matches!(c, '#' | '$' | '@' | '[' | '\\' | ']' | '^' | '`' | '{' | '|' | '}' | '~')
}

/// True for any printable ASCII character (0x20..=0x7E).
#[must_use]
pub fn is_printable_ascii(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7e}')
}

/// True for the extended single-byte range 0x80..=0xFF used when hunting
/// for an unused temporary delimiter codepoint.
#[must_use]
pub fn is_extended_ascii(c: char) -> bool {
    matches!(c, '\u{80}'..='\u{ff}')
}

/// True for the ASCII controls the calibration payload probes.
#[must_use]
pub fn is_probed_control(c: char) -> bool {
    PROBED_CONTROLS.contains(&c)
}

/// True for any C0 control character.
#[must_use]
pub fn is_ascii_control(c: char) -> bool {
    (c as u32) < 0x20 || c == '\u{7f}'
}

//
// =============================================================================
// Control pictures
// =============================================================================
//
// Trace records substitute U+2400 block pictures for C0 controls so log
// output stays printable on one line.
//

/// The Unicode control picture for a C0 control or DEL, otherwise the
/// character itself.
#[must_use]
pub fn control_picture(c: char) -> char {
    match c as u32 {
        n @ 0x00..=0x1f => char::from_u32(0x2400 + n).unwrap_or(c),
        0x7f => '\u{2421}',
        _ => c,
    }
}

/// Render a reported string with control pictures substituted.
#[must_use]
pub fn visualized(s: &str) -> String {
    s.chars().map(control_picture).collect()
}
