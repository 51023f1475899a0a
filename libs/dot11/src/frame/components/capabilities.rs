use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use strum_macros::Display;

#[inline]
fn bit(value: u32, bit: u32) -> bool {
    value & (1 << bit) != 0
}

/// HT capabilities element (id 45).
///
/// Layout: 2 bytes HT capability info, 16 bytes supported MCS set, followed by A-MPDU
/// parameters, extended capabilities, beamforming and ASEL fields which are carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtCapabilities {
    pub info: u16,
    /// Raw supported MCS set. Empty if the element is shorter than 18 bytes.
    pub supported_mcs_set: Vec<u8>,
    remainder: Vec<u8>,
}

impl HtCapabilities {
    pub fn decode(data: &[u8]) -> Option<HtCapabilities> {
        if data.len() < 2 {
            return None;
        }
        let info = LittleEndian::read_u16(&data[0..2]);
        let (supported_mcs_set, remainder) = if data.len() >= 18 {
            (data[2..18].to_vec(), data[18..].to_vec())
        } else {
            (Vec::new(), data[2..].to_vec())
        };

        Some(HtCapabilities {
            info,
            supported_mcs_set,
            remainder,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.info.to_le_bytes().to_vec();
        bytes.extend_from_slice(&self.supported_mcs_set);
        bytes.extend_from_slice(&self.remainder);
        bytes
    }

    pub fn ldpc_coding(&self) -> bool {
        bit(self.info.into(), 0)
    }

    pub fn channel_width_40mhz(&self) -> bool {
        bit(self.info.into(), 1)
    }

    /// 0: static, 1: dynamic, 3: disabled
    pub fn sm_power_save(&self) -> u8 {
        ((self.info >> 2) & 0b11) as u8
    }

    pub fn greenfield(&self) -> bool {
        bit(self.info.into(), 4)
    }

    pub fn short_gi_20mhz(&self) -> bool {
        bit(self.info.into(), 5)
    }

    pub fn short_gi_40mhz(&self) -> bool {
        bit(self.info.into(), 6)
    }

    pub fn tx_stbc(&self) -> bool {
        bit(self.info.into(), 7)
    }

    /// Number of spatial streams supported for STBC reception.
    pub fn rx_stbc(&self) -> u8 {
        ((self.info >> 8) & 0b11) as u8
    }

    pub fn delayed_block_ack(&self) -> bool {
        bit(self.info.into(), 10)
    }

    pub fn max_amsdu_length(&self) -> u16 {
        if bit(self.info.into(), 11) {
            7935
        } else {
            3839
        }
    }

    pub fn dsss_cck_40mhz(&self) -> bool {
        bit(self.info.into(), 12)
    }

    pub fn forty_mhz_intolerant(&self) -> bool {
        bit(self.info.into(), 14)
    }
}

impl Serialize for HtCapabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HtCapabilities", 13)?;
        state.serialize_field("channel_width_40mhz", &self.channel_width_40mhz())?;
        state.serialize_field("short_gi_20mhz", &self.short_gi_20mhz())?;
        state.serialize_field("short_gi_40mhz", &self.short_gi_40mhz())?;
        state.serialize_field("supported_mcs_set", &self.supported_mcs_set)?;
        state.serialize_field("ldpc_coding", &self.ldpc_coding())?;
        state.serialize_field("sm_power_save", &self.sm_power_save())?;
        state.serialize_field("greenfield", &self.greenfield())?;
        state.serialize_field("tx_stbc", &self.tx_stbc())?;
        state.serialize_field("rx_stbc", &self.rx_stbc())?;
        state.serialize_field("delayed_block_ack", &self.delayed_block_ack())?;
        state.serialize_field("max_amsdu_length", &self.max_amsdu_length())?;
        state.serialize_field("dsss_cck_40mhz", &self.dsss_cck_40mhz())?;
        state.serialize_field("forty_mhz_intolerant", &self.forty_mhz_intolerant())?;
        state.end()
    }
}

/// VHT capabilities element (id 191).
///
/// Layout: 4 bytes VHT capability info, then the supported VHT-MCS and NSS set:
/// Rx MCS map (2), Rx highest rate (2), Tx MCS map (2), Tx highest rate (2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VhtCapabilities {
    pub info: u32,
    pub rx_mcs_map: u16,
    pub rx_highest_rate: u16,
    pub tx_mcs_map: u16,
    pub tx_highest_rate: u16,
    remainder: Vec<u8>,
}

impl VhtCapabilities {
    pub fn decode(data: &[u8]) -> Option<VhtCapabilities> {
        if data.len() < 12 {
            return None;
        }

        Some(VhtCapabilities {
            info: LittleEndian::read_u32(&data[0..4]),
            rx_mcs_map: LittleEndian::read_u16(&data[4..6]),
            rx_highest_rate: LittleEndian::read_u16(&data[6..8]),
            tx_mcs_map: LittleEndian::read_u16(&data[8..10]),
            tx_highest_rate: LittleEndian::read_u16(&data[10..12]),
            remainder: data[12..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(12 + self.remainder.len());
        bytes.extend_from_slice(&self.info.to_le_bytes());
        bytes.extend_from_slice(&self.rx_mcs_map.to_le_bytes());
        bytes.extend_from_slice(&self.rx_highest_rate.to_le_bytes());
        bytes.extend_from_slice(&self.tx_mcs_map.to_le_bytes());
        bytes.extend_from_slice(&self.tx_highest_rate.to_le_bytes());
        bytes.extend_from_slice(&self.remainder);
        bytes
    }

    /// 0: 3895, 1: 7991, 2: 11454 octets
    pub fn max_mpdu_length(&self) -> u8 {
        (self.info & 0b11) as u8
    }

    /// 0: 20/40 MHz, 1: 80 MHz, 2: 160 and 80+80 MHz, 3: 160 MHz
    pub fn supported_channel_width_set(&self) -> u8 {
        ((self.info >> 2) & 0b11) as u8
    }

    pub fn rx_ldpc(&self) -> bool {
        bit(self.info, 4)
    }

    pub fn short_gi_80mhz(&self) -> bool {
        bit(self.info, 5)
    }

    pub fn short_gi_160mhz(&self) -> bool {
        bit(self.info, 6)
    }

    pub fn tx_stbc(&self) -> bool {
        bit(self.info, 7)
    }

    /// Byte 1, bit 0 of the capability info.
    pub fn su_beamformer(&self) -> bool {
        bit(self.info, 8)
    }

    /// Byte 1, bit 3 of the capability info.
    pub fn mu_beamformer(&self) -> bool {
        bit(self.info, 11)
    }

    /// Number of spatial streams supported for STBC reception.
    pub fn rx_stbc(&self) -> u8 {
        ((self.info >> 8) & 0b111) as u8
    }

    pub fn su_beamformee(&self) -> bool {
        bit(self.info, 12)
    }

    pub fn beamformee_sts(&self) -> u8 {
        ((self.info >> 13) & 0b111) as u8
    }

    pub fn sounding_dimensions(&self) -> u8 {
        ((self.info >> 16) & 0b111) as u8
    }

    pub fn mu_beamformee(&self) -> bool {
        bit(self.info, 20)
    }

    pub fn txop_ps(&self) -> bool {
        bit(self.info, 21)
    }

    pub fn htc_vht(&self) -> bool {
        bit(self.info, 22)
    }

    pub fn max_ampdu_exponent(&self) -> u8 {
        ((self.info >> 23) & 0b111) as u8
    }

    pub fn rx_antenna_pattern_consistency(&self) -> bool {
        bit(self.info, 28)
    }

    pub fn tx_antenna_pattern_consistency(&self) -> bool {
        bit(self.info, 29)
    }

    pub fn rx_highest_long_gi_rate(&self) -> u16 {
        (self.rx_mcs_map >> 10) & 0b111
    }

    pub fn tx_highest_long_gi_rate(&self) -> u16 {
        (self.tx_mcs_map >> 10) & 0b111
    }
}

impl Serialize for VhtCapabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("VhtCapabilities", 22)?;
        state.serialize_field("max_mpdu_length", &self.max_mpdu_length())?;
        state.serialize_field(
            "supported_channel_width_set",
            &self.supported_channel_width_set(),
        )?;
        state.serialize_field("short_gi_80mhz", &self.short_gi_80mhz())?;
        state.serialize_field("short_gi_160mhz", &self.short_gi_160mhz())?;
        state.serialize_field("su_beamformer_capable", &self.su_beamformer())?;
        state.serialize_field("mu_beamformer_capable", &self.mu_beamformer())?;
        state.serialize_field("rx_mcs_map", &self.rx_mcs_map)?;
        state.serialize_field("rx_highest_long_gi_rate", &self.rx_highest_long_gi_rate())?;
        state.serialize_field("tx_mcs_map", &self.tx_mcs_map)?;
        state.serialize_field("tx_highest_long_gi_rate", &self.tx_highest_long_gi_rate())?;
        state.serialize_field("rx_ldpc", &self.rx_ldpc())?;
        state.serialize_field("tx_stbc", &self.tx_stbc())?;
        state.serialize_field("rx_stbc", &self.rx_stbc())?;
        state.serialize_field("su_beamformee_capable", &self.su_beamformee())?;
        state.serialize_field("mu_beamformee_capable", &self.mu_beamformee())?;
        state.serialize_field("beamformee_sts", &self.beamformee_sts())?;
        state.serialize_field("sounding_dimensions", &self.sounding_dimensions())?;
        state.serialize_field("htc_vht", &self.htc_vht())?;
        state.serialize_field("txop_ps", &self.txop_ps())?;
        state.serialize_field("max_ampdu_exponent", &self.max_ampdu_exponent())?;
        state.serialize_field(
            "rx_pattern_consistency",
            &self.rx_antenna_pattern_consistency(),
        )?;
        state.serialize_field(
            "tx_pattern_consistency",
            &self.tx_antenna_pattern_consistency(),
        )?;
        state.end()
    }
}

/// VHT operation element (id 192).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VhtOperation {
    /// 0: 20/40 MHz, 1: 80 MHz, 2: 160 MHz, 3: 80+80 MHz
    pub channel_width: u8,
    pub center_segment_0: Option<u8>,
    pub center_segment_1: Option<u8>,
}

impl VhtOperation {
    pub fn decode(data: &[u8]) -> Option<VhtOperation> {
        let channel_width = *data.first()?;
        Some(VhtOperation {
            channel_width,
            center_segment_0: data.get(1).copied(),
            center_segment_1: data.get(2).copied(),
        })
    }
}

/// HE capabilities element (element extension 35).
///
/// Layout: 6 bytes HE MAC capabilities, 11 bytes HE PHY capabilities, followed by the
/// supported HE-MCS and NSS set and optional PPE thresholds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeCapabilities {
    pub mac_capabilities: [u8; 6],
    pub phy_capabilities: [u8; 11],
    pub mcs_nss_set: Vec<u8>,
}

impl HeCapabilities {
    pub fn decode(data: &[u8]) -> Option<HeCapabilities> {
        if data.len() < 17 {
            return None;
        }
        let mut mac_capabilities = [0u8; 6];
        mac_capabilities.copy_from_slice(&data[0..6]);
        let mut phy_capabilities = [0u8; 11];
        phy_capabilities.copy_from_slice(&data[6..17]);

        Some(HeCapabilities {
            mac_capabilities,
            phy_capabilities,
            mcs_nss_set: data[17..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.mac_capabilities.to_vec();
        bytes.extend_from_slice(&self.phy_capabilities);
        bytes.extend_from_slice(&self.mcs_nss_set);
        bytes
    }

    pub fn htc_he(&self) -> bool {
        bit(self.mac_capabilities[0].into(), 0)
    }

    pub fn twt_requester(&self) -> bool {
        bit(self.mac_capabilities[0].into(), 1)
    }

    pub fn twt_responder(&self) -> bool {
        bit(self.mac_capabilities[0].into(), 2)
    }

    pub fn supports_40mhz_2ghz(&self) -> bool {
        bit(self.phy_capabilities[0].into(), 1)
    }

    pub fn supports_40_80mhz_5ghz(&self) -> bool {
        bit(self.phy_capabilities[0].into(), 2)
    }

    pub fn supports_160mhz(&self) -> bool {
        bit(self.phy_capabilities[0].into(), 3)
    }

    pub fn supports_80_80mhz(&self) -> bool {
        bit(self.phy_capabilities[0].into(), 4)
    }

    pub fn su_beamformer(&self) -> bool {
        bit(self.phy_capabilities[3].into(), 7)
    }

    pub fn su_beamformee(&self) -> bool {
        bit(self.phy_capabilities[4].into(), 0)
    }

    pub fn mu_beamformer(&self) -> bool {
        bit(self.phy_capabilities[4].into(), 1)
    }

    /// Rx HE-MCS map for channel widths up to 80 MHz.
    pub fn rx_mcs_map_80(&self) -> Option<u16> {
        self.mcs_nss_set.get(0..2).map(LittleEndian::read_u16)
    }

    /// Tx HE-MCS map for channel widths up to 80 MHz.
    pub fn tx_mcs_map_80(&self) -> Option<u16> {
        self.mcs_nss_set.get(2..4).map(LittleEndian::read_u16)
    }
}

impl Serialize for HeCapabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HeCapabilities", 12)?;
        state.serialize_field("htc_he", &self.htc_he())?;
        state.serialize_field("twt_requester", &self.twt_requester())?;
        state.serialize_field("twt_responder", &self.twt_responder())?;
        state.serialize_field("supports_40mhz_2ghz", &self.supports_40mhz_2ghz())?;
        state.serialize_field("supports_40_80mhz_5ghz", &self.supports_40_80mhz_5ghz())?;
        state.serialize_field("supports_160mhz", &self.supports_160mhz())?;
        state.serialize_field("supports_80_80mhz", &self.supports_80_80mhz())?;
        state.serialize_field("su_beamformer", &self.su_beamformer())?;
        state.serialize_field("su_beamformee", &self.su_beamformee())?;
        state.serialize_field("mu_beamformer", &self.mu_beamformer())?;
        state.serialize_field("rx_mcs_map_80", &self.rx_mcs_map_80())?;
        state.serialize_field("tx_mcs_map_80", &self.tx_mcs_map_80())?;
        state.end()
    }
}

/// Primary channel width of a BSS.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize)]
pub enum ChannelWidth {
    #[strum(serialize = "20MHz")]
    #[serde(rename = "20MHz")]
    Twenty,
    #[strum(serialize = "40MHz")]
    #[serde(rename = "40MHz")]
    Forty,
    #[strum(serialize = "80MHz")]
    #[serde(rename = "80MHz")]
    Eighty,
    #[strum(serialize = "160MHz")]
    #[serde(rename = "160MHz")]
    OneSixty,
    #[strum(serialize = "80+80MHz")]
    #[serde(rename = "80+80MHz")]
    EightyPlusEighty,
}

impl ChannelWidth {
    pub fn mhz(&self) -> u16 {
        match self {
            ChannelWidth::Twenty => 20,
            ChannelWidth::Forty => 40,
            ChannelWidth::Eighty => 80,
            ChannelWidth::OneSixty | ChannelWidth::EightyPlusEighty => 160,
        }
    }

    /// Infer the channel width from the HT and VHT elements.
    ///
    /// HT gives 20 or 40 MHz. A VHT operation element is authoritative and overrides it.
    /// Without one, the VHT capability width set upgrades a 20/40 MHz inference.
    pub fn from_elements(
        ht: Option<&HtCapabilities>,
        vht_op: Option<&VhtOperation>,
        vht_cap: Option<&VhtCapabilities>,
    ) -> Option<ChannelWidth> {
        let ht_width = ht.map(|ht| {
            if ht.channel_width_40mhz() {
                ChannelWidth::Forty
            } else {
                ChannelWidth::Twenty
            }
        });

        if let Some(op) = vht_op {
            return match op.channel_width {
                0 => Some(ht_width.unwrap_or(ChannelWidth::Twenty)),
                1 => Some(ChannelWidth::Eighty),
                2 => Some(ChannelWidth::OneSixty),
                3 => Some(ChannelWidth::EightyPlusEighty),
                unknown => {
                    debug!("Unknown VHT operation channel width {unknown}");
                    Some(ht_width.unwrap_or(ChannelWidth::Twenty))
                }
            };
        }

        match vht_cap.map(|vht| vht.supported_channel_width_set()) {
            Some(1) => Some(ChannelWidth::Eighty),
            Some(2) | Some(3) => Some(ChannelWidth::OneSixty),
            _ => ht_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // HT capabilities of a 2.4 GHz AP: 40 MHz, SGI 20/40, MCS 0-23
    const HT_CAPS: [u8; 26] = [
        0xef, 0x19, 0x17, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    // VHT capabilities: 11454 MPDU, 160 MHz, SGI 80/160, Rx LDPC
    const VHT_CAPS: [u8; 12] = [
        0x7a, 0x09, 0x80, 0x0f, 0xfa, 0xff, 0x00, 0x00, 0xfa, 0xff, 0x00, 0x00,
    ];

    #[test]
    fn test_ht_decode() {
        let ht = HtCapabilities::decode(&HT_CAPS).unwrap();
        assert!(ht.channel_width_40mhz());
        assert!(ht.short_gi_20mhz());
        assert!(ht.short_gi_40mhz());
        assert!(ht.ldpc_coding());
        assert_eq!(ht.supported_mcs_set.len(), 16);
        assert_eq!(ht.supported_mcs_set[1..4], [0xff, 0xff, 0xff]);
        assert_eq!(ht.max_amsdu_length(), 7935);
        assert_eq!(ht.encode(), HT_CAPS);
    }

    #[test]
    fn test_ht_short_blob() {
        assert!(HtCapabilities::decode(&[0x02]).is_none());

        let ht = HtCapabilities::decode(&[0x62, 0x00, 0x17]).unwrap();
        assert!(ht.channel_width_40mhz());
        assert!(ht.supported_mcs_set.is_empty());
        assert_eq!(ht.encode(), vec![0x62, 0x00, 0x17]);
    }

    #[test]
    fn test_vht_decode() {
        let vht = VhtCapabilities::decode(&VHT_CAPS).unwrap();
        assert_eq!(vht.max_mpdu_length(), 2);
        assert_eq!(vht.supported_channel_width_set(), 2);
        assert!(vht.rx_ldpc());
        assert!(vht.short_gi_80mhz());
        assert!(vht.short_gi_160mhz());
        assert!(vht.su_beamformer());
        assert!(vht.mu_beamformer());
        assert_eq!(vht.rx_mcs_map, 0xfffa);
        assert_eq!(vht.rx_highest_long_gi_rate(), 7);
        assert_eq!(vht.encode(), VHT_CAPS);
        assert!(VhtCapabilities::decode(&VHT_CAPS[..11]).is_none());
    }

    #[test]
    fn test_he_decode() {
        let mut blob = vec![0x05, 0x00, 0x00, 0x00, 0x00, 0x00];
        blob.extend_from_slice(&[0x0c, 0x00, 0x00, 0x80, 0x01, 0, 0, 0, 0, 0, 0]);
        blob.extend_from_slice(&[0xfa, 0xff, 0xfa, 0xff]);

        let he = HeCapabilities::decode(&blob).unwrap();
        assert!(he.htc_he());
        assert!(!he.twt_requester());
        assert!(he.twt_responder());
        assert!(he.supports_40_80mhz_5ghz());
        assert!(he.supports_160mhz());
        assert!(he.su_beamformer());
        assert!(he.su_beamformee());
        assert_eq!(he.rx_mcs_map_80(), Some(0xfffa));
        assert_eq!(he.encode(), blob);
        assert!(HeCapabilities::decode(&blob[..16]).is_none());
    }

    #[test]
    fn test_channel_width() {
        let ht40 = HtCapabilities::decode(&[0x02, 0x00]).unwrap();
        let ht20 = HtCapabilities::decode(&[0x00, 0x00]).unwrap();
        let op = |width| VhtOperation::decode(&[width, 42, 0]).unwrap();
        let vht = VhtCapabilities::decode(&VHT_CAPS).unwrap();

        assert_eq!(
            ChannelWidth::from_elements(Some(&ht40), None, None),
            Some(ChannelWidth::Forty)
        );
        assert_eq!(
            ChannelWidth::from_elements(Some(&ht20), None, None),
            Some(ChannelWidth::Twenty)
        );
        assert_eq!(
            ChannelWidth::from_elements(Some(&ht40), Some(&op(0)), None),
            Some(ChannelWidth::Forty)
        );
        assert_eq!(
            ChannelWidth::from_elements(Some(&ht40), Some(&op(1)), Some(&vht)),
            Some(ChannelWidth::Eighty)
        );
        assert_eq!(
            ChannelWidth::from_elements(None, Some(&op(3)), None),
            Some(ChannelWidth::EightyPlusEighty)
        );
        // Without an operation element the capability width set upgrades HT.
        assert_eq!(
            ChannelWidth::from_elements(Some(&ht20), None, Some(&vht)),
            Some(ChannelWidth::OneSixty)
        );
        assert_eq!(ChannelWidth::from_elements(None, None, None), None);
        assert_eq!(ChannelWidth::EightyPlusEighty.to_string(), "80+80MHz");
    }
}
