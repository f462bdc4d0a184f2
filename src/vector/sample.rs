//! Eight-user reference pool used by the `finder knn` command, the
//! end-to-end tests and the benchmarks.

use crate::types::DIMENSIONS;

/// Reference users on the 1-5 Likert scale.
pub const REFERENCE_SAMPLE: [(&str, [f64; DIMENSIONS]); 8] = [
    ("user_1", [4.2, 3.1, 2.8, 4.5, 3.9]),
    ("user_2", [2.1, 4.3, 3.2, 2.7, 4.1]),
    ("user_3", [4.8, 4.2, 4.1, 4.9, 4.3]),
    ("user_4", [1.2, 2.1, 1.8, 2.3, 1.9]),
    ("user_5", [3.5, 3.8, 3.2, 3.6, 3.4]),
    ("user_6", [4.9, 4.7, 4.8, 4.6, 4.5]),
    ("user_7", [2.3, 2.8, 2.1, 2.9, 2.6]),
    ("user_8", [3.1, 3.3, 3.7, 3.0, 3.2]),
];

/// Reference query on the 1-5 Likert scale.
pub const REFERENCE_QUERY: [f64; DIMENSIONS] = [4.0, 4.0, 4.0, 4.2, 4.1];

/// Factor applied to the reference data to place it on the [0,100] scale.
pub const SAMPLE_SCALE: f64 = 20.0;

/// Multiply every component by [`SAMPLE_SCALE`].
pub fn scale(values: [f64; DIMENSIONS]) -> [f64; DIMENSIONS] {
    values.map(|v| v * SAMPLE_SCALE)
}

/// The reference pool scaled onto [0,100].
pub fn scaled_reference_sample() -> Vec<(&'static str, [f64; DIMENSIONS])> {
    REFERENCE_SAMPLE
        .iter()
        .map(|(id, values)| (*id, scale(*values)))
        .collect()
}
