use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Frequency band of a Wi-Fi channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Band {
    #[strum(serialize = "2.4GHz")]
    TwoPointFour,
    #[strum(serialize = "5GHz")]
    Five,
    #[strum(serialize = "6GHz")]
    Six,
}

impl Band {
    /// All channel numbers defined for this band.
    pub fn channels(&self) -> impl Iterator<Item = u8> {
        match self {
            Band::TwoPointFour => 1..=14u8,
            Band::Five => 34..=165u8,
            Band::Six => 1..=233u8,
        }
    }

    /// Center frequencies in MHz covered by this band.
    pub fn frequencies(&self) -> RangeInclusive<u16> {
        match self {
            Band::TwoPointFour => 2412..=2484,
            Band::Five => 5170..=5825,
            Band::Six => 5955..=7115,
        }
    }
}

/// Map a center frequency in MHz to its channel number. Returns `0` for frequencies outside
/// the 2.4, 5 and 6 GHz bands.
pub fn frequency_to_channel(frequency: u16) -> u8 {
    let channel = match frequency {
        2412..=2472 => (frequency - 2412) / 5 + 1,
        2484 => 14,
        5170..=5825 => (frequency - 5000) / 5,
        5955..=7115 => (frequency - 5950) / 5,
        _ => 0,
    };
    channel as u8
}

/// Map a channel number of the given band to its center frequency in MHz.
pub fn channel_to_frequency(channel: u8, band: Band) -> Option<u16> {
    let channel = u16::from(channel);
    match band {
        Band::TwoPointFour => match channel {
            1..=13 => Some(2407 + channel * 5),
            14 => Some(2484),
            _ => None,
        },
        Band::Five => match channel {
            34..=165 => Some(5000 + channel * 5),
            _ => None,
        },
        Band::Six => match channel {
            1..=233 => Some(5950 + channel * 5),
            _ => None,
        },
    }
}

/// The band a center frequency belongs to.
pub fn band_of(frequency: u16) -> Option<Band> {
    Band::iter().find(|band| band.frequencies().contains(&frequency))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_to_channel() {
        assert_eq!(frequency_to_channel(2412), 1);
        assert_eq!(frequency_to_channel(2437), 6);
        assert_eq!(frequency_to_channel(2472), 13);
        assert_eq!(frequency_to_channel(2484), 14);
        assert_eq!(frequency_to_channel(5180), 36);
        assert_eq!(frequency_to_channel(5825), 165);
        assert_eq!(frequency_to_channel(5955), 1);
        assert_eq!(frequency_to_channel(7115), 233);
    }

    #[test]
    fn test_every_channel_maps_back() {
        for band in Band::iter() {
            for channel in band.channels() {
                let frequency = channel_to_frequency(channel, band).unwrap();
                assert_eq!(band_of(frequency), Some(band), "{band} channel {channel}");
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(frequency_to_channel(0), 0);
        assert_eq!(frequency_to_channel(2400), 0);
        assert_eq!(frequency_to_channel(2480), 0);
        assert_eq!(frequency_to_channel(5900), 0);
        assert_eq!(frequency_to_channel(7200), 0);
    }

    #[test]
    fn test_channel_to_frequency() {
        assert_eq!(channel_to_frequency(6, Band::TwoPointFour), Some(2437));
        assert_eq!(channel_to_frequency(14, Band::TwoPointFour), Some(2484));
        assert_eq!(channel_to_frequency(36, Band::Five), Some(5180));
        assert_eq!(channel_to_frequency(37, Band::Six), Some(6135));
        assert_eq!(channel_to_frequency(15, Band::TwoPointFour), None);
        assert_eq!(channel_to_frequency(0, Band::Six), None);
        assert_eq!(band_of(5180), Some(Band::Five));
        assert_eq!(band_of(2484), Some(Band::TwoPointFour));
    }
}
