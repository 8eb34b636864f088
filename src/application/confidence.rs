//! Heuristic confidence scoring.
//!
//! This is a UX smoothing function, not a statistical confidence
//! interval: it maps the magnitude of the predicted move onto a bounded
//! band so the UI never shows implausible certainty in either direction.
//! The constants are documented tunables; changing them requires
//! re-deriving the calibration, not taste.

use crate::domain::types::Trend;

/// Lower bound of the reported confidence band.
pub const CONFIDENCE_FLOOR: f64 = 70.0;
/// Width of the band above the floor (ceiling = floor + range).
pub const CONFIDENCE_RANGE: f64 = 20.0;
/// Percent move at which confidence saturates.
pub const MOVE_CAP_PCT: f64 = 3.0;

/// Maps the predicted move onto [70, 90].
///
/// Monotonically non-decreasing in the move size: an unchanged price
/// scores exactly 70.0 and any move of `MOVE_CAP_PCT` or more saturates
/// at 90.0. Assumes `last_close > 0`.
pub fn confidence(last_close: f64, predicted: f64) -> f64 {
    let percent_change = (predicted - last_close).abs() / last_close * 100.0;
    let normalized = percent_change.min(MOVE_CAP_PCT) / MOVE_CAP_PCT;
    CONFIDENCE_FLOOR + normalized * CONFIDENCE_RANGE
}

/// Strict comparison: equal closes are `Flat`, not a coin-flip.
pub fn trend(last_close: f64, predicted: f64) -> Trend {
    if predicted > last_close {
        Trend::Up
    } else if predicted < last_close {
        Trend::Down
    } else {
        Trend::Flat
    }
}
