// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Demodulation mode records and their configurator functions.
//!
//! A [`Mode`] is immutable once handed to a pipeline; the `with_*` functions
//! return an adjusted copy. Out-of-range values are clamped to the legal
//! range of the scheme, never rejected.

use serde::{Deserialize, Serialize};

use crate::error::RadioError;

/// NBFM maximum deviation range (Hz).
pub const NBFM_DEVIATION_HZ: (u32, u32) = (125, 15_000);
/// AM audio bandwidth range (Hz).
pub const AM_BANDWIDTH_HZ: (u32, u32) = (250, 30_000);
/// SSB audio bandwidth range (Hz).
pub const SSB_BANDWIDTH_HZ: (u32, u32) = (10, 15_000);
/// CW audio bandwidth range (Hz).
pub const CW_BANDWIDTH_HZ: (u32, u32) = (5, 1_000);
/// Squelch threshold range (linear SNR units).
pub const SQUELCH_RANGE: (f32, f32) = (0.0, 6.0);

/// Demodulation scheme tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    WBFM,
    NBFM,
    AM,
    USB,
    LSB,
    CW,
}

impl Scheme {
    /// Parse a scheme tag as it appears in configuration or UI payloads.
    pub fn from_tag(tag: &str) -> Result<Self, RadioError> {
        match tag {
            "WBFM" => Ok(Scheme::WBFM),
            "NBFM" => Ok(Scheme::NBFM),
            "AM" => Ok(Scheme::AM),
            "USB" => Ok(Scheme::USB),
            "LSB" => Ok(Scheme::LSB),
            "CW" => Ok(Scheme::CW),
            other => Err(RadioError::UnknownScheme(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Scheme::WBFM => "WBFM",
            Scheme::NBFM => "NBFM",
            Scheme::AM => "AM",
            Scheme::USB => "USB",
            Scheme::LSB => "LSB",
            Scheme::CW => "CW",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Per-scheme demodulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme")]
pub enum Mode {
    WBFM { stereo: bool },
    NBFM { max_deviation_hz: u32, squelch: f32 },
    AM { bandwidth_hz: u32, squelch: f32 },
    USB { bandwidth_hz: u32, squelch: f32 },
    LSB { bandwidth_hz: u32, squelch: f32 },
    CW { bandwidth_hz: u32 },
}

fn clamp_u32(value: u32, range: (u32, u32)) -> u32 {
    value.clamp(range.0, range.1)
}

fn clamp_squelch(value: f32) -> f32 {
    value.clamp(SQUELCH_RANGE.0, SQUELCH_RANGE.1)
}

impl Mode {
    /// Default parameters when switching to a scheme.
    pub fn default_for(scheme: Scheme) -> Self {
        match scheme {
            Scheme::WBFM => Mode::WBFM { stereo: true },
            Scheme::NBFM => Mode::NBFM {
                max_deviation_hz: 10_000,
                squelch: 0.0,
            },
            Scheme::AM => Mode::AM {
                bandwidth_hz: 10_000,
                squelch: 0.0,
            },
            Scheme::USB => Mode::USB {
                bandwidth_hz: 2_800,
                squelch: 0.0,
            },
            Scheme::LSB => Mode::LSB {
                bandwidth_hz: 2_800,
                squelch: 0.0,
            },
            Scheme::CW => Mode::CW { bandwidth_hz: 50 },
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Mode::WBFM { .. } => Scheme::WBFM,
            Mode::NBFM { .. } => Scheme::NBFM,
            Mode::AM { .. } => Scheme::AM,
            Mode::USB { .. } => Scheme::USB,
            Mode::LSB { .. } => Scheme::LSB,
            Mode::CW { .. } => Scheme::CW,
        }
    }

    /// Return a copy with every field clamped to its legal range.
    #[must_use]
    pub fn clamped(self) -> Self {
        match self {
            Mode::WBFM { stereo } => Mode::WBFM { stereo },
            Mode::NBFM {
                max_deviation_hz,
                squelch,
            } => Mode::NBFM {
                max_deviation_hz: clamp_u32(max_deviation_hz, NBFM_DEVIATION_HZ),
                squelch: clamp_squelch(squelch),
            },
            Mode::AM {
                bandwidth_hz,
                squelch,
            } => Mode::AM {
                bandwidth_hz: clamp_u32(bandwidth_hz, AM_BANDWIDTH_HZ),
                squelch: clamp_squelch(squelch),
            },
            Mode::USB {
                bandwidth_hz,
                squelch,
            } => Mode::USB {
                bandwidth_hz: clamp_u32(bandwidth_hz, SSB_BANDWIDTH_HZ),
                squelch: clamp_squelch(squelch),
            },
            Mode::LSB {
                bandwidth_hz,
                squelch,
            } => Mode::LSB {
                bandwidth_hz: clamp_u32(bandwidth_hz, SSB_BANDWIDTH_HZ),
                squelch: clamp_squelch(squelch),
            },
            Mode::CW { bandwidth_hz } => Mode::CW {
                bandwidth_hz: clamp_u32(bandwidth_hz, CW_BANDWIDTH_HZ),
            },
        }
    }

    pub fn has_bandwidth(&self) -> bool {
        self.bandwidth_hz().is_some()
    }

    /// Audio bandwidth of the scheme, where it has one.
    pub fn bandwidth_hz(&self) -> Option<u32> {
        match self {
            Mode::AM { bandwidth_hz, .. }
            | Mode::USB { bandwidth_hz, .. }
            | Mode::LSB { bandwidth_hz, .. }
            | Mode::CW { bandwidth_hz } => Some(*bandwidth_hz),
            Mode::WBFM { .. } | Mode::NBFM { .. } => None,
        }
    }

    /// Copy with the bandwidth replaced (clamped). No-op for schemes
    /// without a bandwidth field.
    #[must_use]
    pub fn with_bandwidth_hz(self, hz: u32) -> Self {
        match self {
            Mode::AM { squelch, .. } => Mode::AM {
                bandwidth_hz: clamp_u32(hz, AM_BANDWIDTH_HZ),
                squelch,
            },
            Mode::USB { squelch, .. } => Mode::USB {
                bandwidth_hz: clamp_u32(hz, SSB_BANDWIDTH_HZ),
                squelch,
            },
            Mode::LSB { squelch, .. } => Mode::LSB {
                bandwidth_hz: clamp_u32(hz, SSB_BANDWIDTH_HZ),
                squelch,
            },
            Mode::CW { .. } => Mode::CW {
                bandwidth_hz: clamp_u32(hz, CW_BANDWIDTH_HZ),
            },
            other => other,
        }
    }

    pub fn has_deviation(&self) -> bool {
        matches!(self, Mode::NBFM { .. })
    }

    pub fn max_deviation_hz(&self) -> Option<u32> {
        match self {
            Mode::NBFM {
                max_deviation_hz, ..
            } => Some(*max_deviation_hz),
            _ => None,
        }
    }

    #[must_use]
    pub fn with_max_deviation_hz(self, hz: u32) -> Self {
        match self {
            Mode::NBFM { squelch, .. } => Mode::NBFM {
                max_deviation_hz: clamp_u32(hz, NBFM_DEVIATION_HZ),
                squelch,
            },
            other => other,
        }
    }

    pub fn has_squelch(&self) -> bool {
        self.squelch().is_some()
    }

    /// Squelch threshold for the gated schemes. WBFM and CW never gate.
    pub fn squelch(&self) -> Option<f32> {
        match self {
            Mode::NBFM { squelch, .. }
            | Mode::AM { squelch, .. }
            | Mode::USB { squelch, .. }
            | Mode::LSB { squelch, .. } => Some(*squelch),
            Mode::WBFM { .. } | Mode::CW { .. } => None,
        }
    }

    #[must_use]
    pub fn with_squelch(self, level: f32) -> Self {
        let level = clamp_squelch(level);
        match self {
            Mode::NBFM {
                max_deviation_hz, ..
            } => Mode::NBFM {
                max_deviation_hz,
                squelch: level,
            },
            Mode::AM { bandwidth_hz, .. } => Mode::AM {
                bandwidth_hz,
                squelch: level,
            },
            Mode::USB { bandwidth_hz, .. } => Mode::USB {
                bandwidth_hz,
                squelch: level,
            },
            Mode::LSB { bandwidth_hz, .. } => Mode::LSB {
                bandwidth_hz,
                squelch: level,
            },
            other => other,
        }
    }

    pub fn has_stereo(&self) -> bool {
        matches!(self, Mode::WBFM { .. })
    }

    pub fn stereo(&self) -> Option<bool> {
        match self {
            Mode::WBFM { stereo } => Some(*stereo),
            _ => None,
        }
    }

    #[must_use]
    pub fn with_stereo(self, enabled: bool) -> Self {
        match self {
            Mode::WBFM { .. } => Mode::WBFM { stereo: enabled },
            other => other,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::default_for(Scheme::WBFM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_tag_round_trip() {
        for scheme in [
            Scheme::WBFM,
            Scheme::NBFM,
            Scheme::AM,
            Scheme::USB,
            Scheme::LSB,
            Scheme::CW,
        ] {
            assert_eq!(Scheme::from_tag(scheme.tag()).unwrap(), scheme);
        }
    }

    #[test]
    fn test_unknown_scheme_is_an_error() {
        let err = Scheme::from_tag("RTTY").unwrap_err();
        assert!(matches!(err, RadioError::UnknownScheme(ref tag) if tag == "RTTY"));
    }

    #[test]
    fn test_bandwidth_clamps_low_and_high() {
        let mode = Mode::default_for(Scheme::AM).with_bandwidth_hz(0);
        assert_eq!(mode.bandwidth_hz(), Some(AM_BANDWIDTH_HZ.0));
        let mode = mode.with_bandwidth_hz(1_000_000_000);
        assert_eq!(mode.bandwidth_hz(), Some(AM_BANDWIDTH_HZ.1));
    }

    #[test]
    fn test_cw_bandwidth_clamps() {
        let mode = Mode::default_for(Scheme::CW).with_bandwidth_hz(2);
        assert_eq!(mode.bandwidth_hz(), Some(CW_BANDWIDTH_HZ.0));
        let mode = mode.with_bandwidth_hz(90_000);
        assert_eq!(mode.bandwidth_hz(), Some(CW_BANDWIDTH_HZ.1));
    }

    #[test]
    fn test_deviation_clamps() {
        let mode = Mode::default_for(Scheme::NBFM).with_max_deviation_hz(1);
        assert_eq!(mode.max_deviation_hz(), Some(NBFM_DEVIATION_HZ.0));
        let mode = mode.with_max_deviation_hz(u32::MAX);
        assert_eq!(mode.max_deviation_hz(), Some(NBFM_DEVIATION_HZ.1));
    }

    #[test]
    fn test_squelch_clamps() {
        let mode = Mode::default_for(Scheme::USB).with_squelch(-3.5);
        assert_eq!(mode.squelch(), Some(0.0));
        let mode = mode.with_squelch(99.0);
        assert_eq!(mode.squelch(), Some(6.0));
    }

    #[test]
    fn test_wbfm_and_cw_have_no_squelch() {
        assert!(!Mode::default_for(Scheme::WBFM).has_squelch());
        assert!(!Mode::default_for(Scheme::CW).has_squelch());
        assert!(Mode::default_for(Scheme::NBFM).has_squelch());
    }

    #[test]
    fn test_setters_ignore_foreign_fields() {
        let mode = Mode::default_for(Scheme::WBFM)
            .with_bandwidth_hz(5_000)
            .with_squelch(3.0)
            .with_max_deviation_hz(1_000);
        assert_eq!(mode, Mode::WBFM { stereo: true });
        let mode = Mode::default_for(Scheme::CW).with_stereo(false);
        assert_eq!(mode.stereo(), None);
    }

    #[test]
    fn test_clamped_normalises_hand_built_records() {
        let mode = Mode::NBFM {
            max_deviation_hz: 1,
            squelch: 42.0,
        }
        .clamped();
        assert_eq!(
            mode,
            Mode::NBFM {
                max_deviation_hz: NBFM_DEVIATION_HZ.0,
                squelch: 6.0,
            }
        );
    }
}
