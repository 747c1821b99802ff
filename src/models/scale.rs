// src/models/scale.rs

//! Seismic intensity ("shindo") in the ×10 encoding shared by both feeds.
//!
//! | shindo | code |
//! |--------|------|
//! | 1..4   | 10..40 |
//! | 5弱 / 5強 | 45 / 50 |
//! | 6弱 / 6強 | 55 / 60 |
//! | 7      | 70 |
//!
//! `-1` is unknown and `99` means "or greater" (areas only).

use std::cmp::Ordering;

/// Unknown intensity.
pub const UNKNOWN: i32 = -1;

/// "Or greater" marker on an area's upper bound.
pub const OR_GREATER: i32 = 99;

/// Thresholds accepted in configuration.
pub const VALID_THRESHOLDS: [i32; 9] = [10, 20, 30, 40, 45, 50, 55, 60, 70];

/// Convert a JMA intensity string (`"1"`, `"5-"`, `"6+"`, ...) to its ×10 code.
///
/// Anything that is not a defined JMA intensity yields [`UNKNOWN`].
pub fn jma_scale_code(text: &str) -> i32 {
    match text {
        "5-" => 45,
        "5+" => 50,
        "6-" => 55,
        "6+" => 60,
        _ => match text.as_bytes() {
            [d @ b'0'..=b'7'] => i32::from(d - b'0') * 10,
            _ => UNKNOWN,
        },
    }
}

/// Human label for a ×10 code, as printed in thread bodies.
pub fn scale_label(scale: i32) -> &'static str {
    match scale {
        0 => "0",
        10 => "1",
        20 => "2",
        30 => "3",
        40 => "4",
        45 => "5弱",
        50 => "5強",
        55 => "6弱",
        60 => "6強",
        70 => "7",
        OR_GREATER => "以上",
        _ => "不明",
    }
}

/// Normalise a configured threshold; `None` when it is not an accepted value.
pub fn checked_threshold(scale: i32) -> Option<i32> {
    VALID_THRESHOLDS.contains(&scale).then_some(scale)
}

/// Descending severity order with unknown values last.
pub fn cmp_point_scale(a: i32, b: i32) -> Ordering {
    match (a == UNKNOWN, b == UNKNOWN) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.cmp(&a),
    }
}

/// Descending severity order for an area's upper bound; unknown and
/// "or greater" both sort after every real value.
pub fn cmp_area_upper(a: i32, b: i32) -> Ordering {
    let rank = |s: i32| matches!(s, UNKNOWN | OR_GREATER);
    match (rank(a), rank(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.cmp(&a),
    }
}
