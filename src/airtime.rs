use std::time::Duration;

const LONG_PREAMBLE_US: f64 = 192.0;
const SHORT_PREAMBLE_US: f64 = 96.0;
const SIFS_US: f64 = 10.0;

const MCS_RATE_STEP_MBPS: f64 = 6.5;
const MCS_RATE_CAP_MBPS: f64 = 54.0;
const VHT_BASE_RATE_MBPS: f64 = 65.0;

const MANAGEMENT_FALLBACK_MBPS: f64 = 6.0;
const FALLBACK_MBPS: f64 = 1.0;

/// Estimated time on air of a frame.
///
/// `frame_bytes * 8 / phy_mbps` microseconds of payload (10% less with a short guard interval),
/// the PLCP preamble and one SIFS. A non-positive rate yields zero.
pub fn airtime(
    frame_bytes: usize,
    phy_mbps: f64,
    short_preamble: bool,
    short_gi: bool,
) -> Duration {
    if phy_mbps <= 0.0 || !phy_mbps.is_finite() {
        return Duration::ZERO;
    }

    let mut data_us = (frame_bytes as f64 * 8.0) / phy_mbps;
    if short_gi {
        data_us *= 0.9;
    }
    let preamble_us = if short_preamble {
        SHORT_PREAMBLE_US
    } else {
        LONG_PREAMBLE_US
    };

    Duration::from_secs_f64((preamble_us + data_us + SIFS_US) / 1_000_000.0)
}

/// VHT transmission parameters of a single user.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VhtRate {
    pub mcs: u8,
    pub nss: u8,
    /// Channel bandwidth in MHz.
    pub bandwidth_mhz: u16,
}

/// What the radio header told us about the modulation of a frame.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhyRateHints {
    /// Legacy rate field, already in Mbps.
    pub legacy_mbps: Option<f64>,
    pub mcs_index: Option<u8>,
    pub vht: Option<VhtRate>,
    pub short_gi: bool,
    pub is_management: bool,
}

/// Estimate the PHY rate of a frame in Mbps.
///
/// Precedence: legacy rate, HT MCS index, VHT user parameters, then a fixed fallback of
/// 6 Mbps for management frames and 1 Mbps for everything else.
pub fn estimate_phy_rate(hints: &PhyRateHints) -> f64 {
    if let Some(rate) = hints.legacy_mbps.filter(|rate| *rate > 0.0) {
        return rate;
    }

    if let Some(index) = hints.mcs_index {
        return ((f64::from(index) + 1.0) * MCS_RATE_STEP_MBPS).min(MCS_RATE_CAP_MBPS);
    }

    if let Some(vht) = hints.vht {
        let bw_factor = match vht.bandwidth_mhz {
            40 => 2.0,
            80 => 4.0,
            160 => 8.0,
            _ => 1.0,
        };
        let mut rate = VHT_BASE_RATE_MBPS
            * bw_factor
            * f64::from(vht.nss.max(1))
            * (f64::from(vht.mcs) + 1.0)
            / 8.0;
        if hints.short_gi {
            rate *= 1.1;
        }
        return rate;
    }

    if hints.is_management {
        MANAGEMENT_FALLBACK_MBPS
    } else {
        FALLBACK_MBPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn micros(duration: Duration) -> f64 {
        duration.as_secs_f64() * 1_000_000.0
    }

    #[test]
    fn test_airtime() {
        // 100 bytes at 8 Mbps: 100us payload, long preamble, SIFS
        assert!((micros(airtime(100, 8.0, false, false)) - 302.0).abs() < 1e-3);
        assert!((micros(airtime(100, 8.0, true, false)) - 206.0).abs() < 1e-3);
        assert!((micros(airtime(100, 8.0, true, true)) - 196.0).abs() < 1e-3);
    }

    #[test]
    fn test_airtime_without_rate() {
        assert_eq!(airtime(1500, 0.0, false, false), Duration::ZERO);
        assert_eq!(airtime(1500, -1.0, true, true), Duration::ZERO);
        assert_eq!(airtime(1500, f64::NAN, true, true), Duration::ZERO);
    }

    #[test]
    fn test_legacy_rate_wins() {
        let hints = PhyRateHints {
            legacy_mbps: Some(24.0),
            mcs_index: Some(7),
            ..Default::default()
        };
        assert_eq!(estimate_phy_rate(&hints), 24.0);
    }

    #[test]
    fn test_mcs_rate() {
        let mut hints = PhyRateHints {
            mcs_index: Some(0),
            ..Default::default()
        };
        assert_eq!(estimate_phy_rate(&hints), 6.5);
        hints.mcs_index = Some(5);
        assert_eq!(estimate_phy_rate(&hints), 39.0);
        hints.mcs_index = Some(15);
        assert_eq!(estimate_phy_rate(&hints), 54.0);
    }

    #[test]
    fn test_vht_rate() {
        let mut hints = PhyRateHints {
            vht: Some(VhtRate {
                mcs: 7,
                nss: 2,
                bandwidth_mhz: 80,
            }),
            ..Default::default()
        };
        // 65 * 4 * 2 * 8 / 8
        assert!((estimate_phy_rate(&hints) - 520.0).abs() < 1e-9);
        hints.short_gi = true;
        assert!((estimate_phy_rate(&hints) - 572.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallbacks() {
        let mut hints = PhyRateHints::default();
        assert_eq!(estimate_phy_rate(&hints), 1.0);
        hints.is_management = true;
        assert_eq!(estimate_phy_rate(&hints), 6.0);
    }
}
