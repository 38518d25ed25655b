//! Direction of change between consecutive readings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
            Trend::Flat => "→",
        }
    }
}

/// Compare `current` to `previous`. A change within `epsilon` is flat.
pub fn trend(current: f64, previous: f64, epsilon: f64) -> Option<Trend> {
    if !current.is_finite() || !previous.is_finite() {
        return None;
    }
    let delta = current - previous;
    let trend = if delta.abs() <= epsilon {
        Trend::Flat
    } else if delta > epsilon {
        Trend::Up
    } else {
        Trend::Down
    };
    Some(trend)
}

/// Trend of each entry of a newest-first series against the entry after it.
///
/// The output has the same length as the input; the oldest entry has no trend.
pub fn pairwise_trends(values: &[f64], epsilon: f64) -> Vec<Option<Trend>> {
    (0..values.len())
        .map(|idx| {
            values
                .get(idx + 1)
                .and_then(|previous| trend(values[idx], *previous, epsilon))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_of_the_delta_decides() {
        assert_eq!(trend(100.0, 90.0, 0.0), Some(Trend::Up));
        assert_eq!(trend(90.0, 100.0, 0.0), Some(Trend::Down));
        assert_eq!(trend(100.0, 100.0, 0.0), Some(Trend::Flat));
        assert_eq!(trend(f64::NAN, 100.0, 0.0), None);
        assert_eq!(trend(100.0, f64::INFINITY, 0.0), None);
    }

    #[test]
    fn epsilon_widens_the_flat_band() {
        assert_eq!(trend(105.0, 100.0, 5.0), Some(Trend::Flat));
        assert_eq!(trend(95.0, 100.0, 5.0), Some(Trend::Flat));
        assert_eq!(trend(105.5, 100.0, 5.0), Some(Trend::Up));
        assert_eq!(trend(94.0, 100.0, 5.0), Some(Trend::Down));
    }

    #[test]
    fn pairwise_leaves_the_oldest_without_trend() {
        let trends = pairwise_trends(&[120.0, 110.0, f64::NAN, 130.0], 0.0);
        assert_eq!(trends, vec![Some(Trend::Up), None, None, None]);
        assert!(pairwise_trends(&[], 0.0).is_empty());
    }
}
