//! Threshold-based anomaly detectors
//!
//! Three independent classifiers run against every snapshot:
//! - **UNDERPRICED**: price sits well below the reference average, optionally
//!   gated by a z-score check when volatility is known.
//! - **FAKE_BIN_SUSPECT**: a drop so large it is more likely a data or listing
//!   error than a genuine bargain, with a grace band under known volatility.
//! - **SPIKE**: price well above the reference average.
//!
//! Detectors are pure functions of (price, reference avg, reference stddev,
//! thresholds). Missing or non-positive inputs mean "no signal", never an
//! error. All three may fire for the same snapshot; the engine applies no
//! mutual exclusion.

use std::fmt;

/// Width of the suppression band above the fake-BIN threshold when the
/// item's volatility is known.
const FAKE_BIN_GRACE_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    Underpriced,
    FakeBinSuspect,
    Spike,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Underpriced => "UNDERPRICED",
            DetectorKind::FakeBinSuspect => "FAKE_BIN_SUSPECT",
            DetectorKind::Spike => "SPIKE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNDERPRICED" => Some(DetectorKind::Underpriced),
            "FAKE_BIN_SUSPECT" => Some(DetectorKind::FakeBinSuspect),
            "SPIKE" => Some(DetectorKind::Spike),
            _ => None,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified anomaly with kind-specific metrics and the reference price
/// the detector compared against. Consumed immediately by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Underpriced {
        discount_pct: f64,
        /// Z-score rounded to two decimals; absent when no stddev was known.
        score: Option<f64>,
        expected: f64,
    },
    FakeBinSuspect {
        drop_pct: f64,
        expected: f64,
    },
    Spike {
        spike_pct: f64,
        expected: f64,
    },
}

impl Detection {
    pub fn kind(&self) -> DetectorKind {
        match self {
            Detection::Underpriced { .. } => DetectorKind::Underpriced,
            Detection::FakeBinSuspect { .. } => DetectorKind::FakeBinSuspect,
            Detection::Spike { .. } => DetectorKind::Spike,
        }
    }

    pub fn expected(&self) -> f64 {
        match self {
            Detection::Underpriced { expected, .. }
            | Detection::FakeBinSuspect { expected, .. }
            | Detection::Spike { expected, .. } => *expected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnderpricedConfig {
    pub min_discount: f64,
    pub zscore_min: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct FakeBinConfig {
    pub fake_drop_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SpikeConfig {
    pub spike_pct: f64,
}

/// Valid, positive reference inputs or no signal.
fn usable(price: f64, avg: Option<f64>) -> Option<(f64, f64)> {
    let avg = avg?;
    if price > 0.0 && price.is_finite() && avg > 0.0 && avg.is_finite() {
        Some((price, avg))
    } else {
        None
    }
}

/// Price at least `min_discount` below the reference average.
///
/// When a positive stddev is known the discount alone is not enough: the
/// price must also sit at least `zscore_min` standard deviations below the
/// mean, otherwise the signal is suppressed as noise.
pub fn detect_underpriced(
    price: f64,
    avg: Option<f64>,
    std: Option<f64>,
    cfg: &UnderpricedConfig,
) -> Option<Detection> {
    let (price, avg) = usable(price, avg)?;

    let discount_pct = 1.0 - price / avg;
    if discount_pct < cfg.min_discount {
        return None;
    }

    let mut score = None;
    if let Some(std) = std.filter(|s| *s > 0.0) {
        let z = (price - avg) / std;
        if z > -cfg.zscore_min {
            return None;
        }
        score = Some((z * 100.0).round() / 100.0);
    }

    Some(Detection::Underpriced {
        discount_pct,
        score,
        expected: avg,
    })
}

/// Implausibly large drop, likely a bad listing rather than a bargain.
///
/// Grace band: with a positive stddev, a drop only marginally past the
/// threshold (within [threshold, threshold + 0.05)) is suppressed — on a
/// volatile item that is more likely noise than a data anomaly. Without
/// volatility information the raw threshold alone governs.
pub fn detect_fake_bin(
    price: f64,
    avg: Option<f64>,
    std: Option<f64>,
    cfg: &FakeBinConfig,
) -> Option<Detection> {
    let (price, avg) = usable(price, avg)?;

    let drop_pct = 1.0 - price / avg;
    if drop_pct < cfg.fake_drop_pct {
        return None;
    }

    if std.is_some_and(|s| s > 0.0) && drop_pct < cfg.fake_drop_pct + FAKE_BIN_GRACE_BAND {
        return None;
    }

    Some(Detection::FakeBinSuspect {
        drop_pct,
        expected: avg,
    })
}

/// Price at least `spike_pct` above the reference average.
pub fn detect_spike(
    price: f64,
    avg: Option<f64>,
    _std: Option<f64>,
    cfg: &SpikeConfig,
) -> Option<Detection> {
    let (price, avg) = usable(price, avg)?;

    let spike_pct = price / avg - 1.0;
    if spike_pct < cfg.spike_pct {
        return None;
    }

    Some(Detection::Spike {
        spike_pct,
        expected: avg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ucfg() -> UnderpricedConfig {
        UnderpricedConfig {
            min_discount: 0.12,
            zscore_min: 1.8,
        }
    }

    #[test]
    fn test_underpriced_fires_without_stddev() {
        // Test: discount threshold alone governs when no stddev is supplied
        let det = detect_underpriced(80.0, Some(100.0), None, &ucfg()).unwrap();
        match det {
            Detection::Underpriced {
                discount_pct,
                score,
                expected,
            } => {
                assert!((discount_pct - 0.2).abs() < 1e-9);
                assert_eq!(score, None);
                assert_eq!(expected, 100.0);
            }
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_underpriced_below_threshold_is_silent() {
        assert!(detect_underpriced(90.0, Some(100.0), None, &ucfg()).is_none());
    }

    #[test]
    fn test_underpriced_zscore_gate() {
        // discount = 0.2 passes, but z = (80-100)/15 = -1.33 > -1.8: suppressed
        assert!(detect_underpriced(80.0, Some(100.0), Some(15.0), &ucfg()).is_none());

        // z = (80-100)/10 = -2.0 <= -1.8: fires with rounded score
        let det = detect_underpriced(80.0, Some(100.0), Some(10.0), &ucfg()).unwrap();
        match det {
            Detection::Underpriced { score, .. } => assert_eq!(score, Some(-2.0)),
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_underpriced_score_rounding() {
        // z = (70-100)/9 = -3.333... rounds to -3.33
        let det = detect_underpriced(70.0, Some(100.0), Some(9.0), &ucfg()).unwrap();
        match det {
            Detection::Underpriced { score, .. } => assert_eq!(score, Some(-3.33)),
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_fake_bin_grace_band_boundary() {
        let cfg = FakeBinConfig { fake_drop_pct: 0.40 };

        // drop = 0.45, stddev known: inside [0.40, 0.45) and suppressed
        assert!(detect_fake_bin(55.0, Some(100.0), Some(5.0), &cfg).is_none());

        // drop = 0.44 sits inside the band: suppressed
        assert!(detect_fake_bin(56.0, Some(100.0), Some(5.0), &cfg).is_none());

        // drop = 0.46: fires
        let det = detect_fake_bin(54.0, Some(100.0), Some(5.0), &cfg).unwrap();
        match det {
            Detection::FakeBinSuspect { drop_pct, expected } => {
                assert!((drop_pct - 0.46).abs() < 1e-9);
                assert_eq!(expected, 100.0);
            }
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_fake_bin_without_stddev_uses_raw_threshold() {
        let cfg = FakeBinConfig { fake_drop_pct: 0.40 };

        // Same 0.44 drop, but no volatility info: raw threshold governs
        assert!(detect_fake_bin(56.0, Some(100.0), None, &cfg).is_some());
        assert!(detect_fake_bin(56.0, Some(100.0), Some(0.0), &cfg).is_some());
        assert!(detect_fake_bin(61.0, Some(100.0), None, &cfg).is_none());
    }

    #[test]
    fn test_spike_fires_above_threshold() {
        let cfg = SpikeConfig { spike_pct: 0.20 };

        let det = detect_spike(140.0, Some(100.0), None, &cfg).unwrap();
        match det {
            Detection::Spike { spike_pct, expected } => {
                assert!((spike_pct - 0.40).abs() < 1e-9);
                assert_eq!(expected, 100.0);
            }
            other => panic!("unexpected detection: {:?}", other),
        }

        assert!(detect_spike(110.0, Some(100.0), None, &cfg).is_none());
    }

    #[test]
    fn test_no_signal_on_missing_or_nonpositive_inputs() {
        let u = ucfg();
        let f = FakeBinConfig { fake_drop_pct: 0.40 };
        let s = SpikeConfig { spike_pct: 0.20 };

        assert!(detect_underpriced(80.0, None, None, &u).is_none());
        assert!(detect_underpriced(0.0, Some(100.0), None, &u).is_none());
        assert!(detect_fake_bin(50.0, Some(0.0), None, &f).is_none());
        assert!(detect_fake_bin(-5.0, Some(100.0), None, &f).is_none());
        assert!(detect_spike(140.0, Some(-100.0), None, &s).is_none());
        assert!(detect_spike(f64::NAN, Some(100.0), None, &s).is_none());
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            DetectorKind::Underpriced,
            DetectorKind::FakeBinSuspect,
            DetectorKind::Spike,
        ] {
            assert_eq!(DetectorKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DetectorKind::parse("bogus"), None);
    }
}
