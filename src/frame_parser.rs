use std::time::Duration;

use dot11::frame::components::{
    AddressSet, ChannelWidth, HeCapabilities, HtCapabilities, InformationElements, MacAddress,
    VhtCapabilities,
};
use dot11::{FrameSubType, FrameType};
use etherparse::{SlicedPacket, TransportSlice};
use log::trace;
use radiotap::field::ext::GuardInterval;
use radiotap::Radiotap;
use thiserror::Error;

use crate::airtime::{estimate_phy_rate, PhyRateHints, VhtRate};
use crate::channels::frequency_to_channel;

/// Security label of a BSS advertising a non-empty RSN element.
pub const SECURITY_RSN: &str = "RSN/WPA2/WPA3";
pub const SECURITY_OPEN: &str = "Open";

const LLC_SNAP_PREFIX: [u8; 6] = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00];
const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;

/// How the frames of a capture are encapsulated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkType {
    /// 802.11 frames behind a radiotap header.
    Radiotap,
    /// Bare 802.11 frames.
    Ieee80211,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// The outer framing couldn't be decoded, or the radio reported a broken frame.
    #[error("Malformed frame: {0}")]
    DecodeError(String),
    /// Neither a radiotap header nor an 802.11 MAC header could be found.
    #[error("No 802.11 frame found: {0}")]
    NoDot11(String),
    /// A beacon or probe response is too short for its fixed parameters.
    #[error("{subtype} body too short: expected {expected} bytes, got {actual}")]
    ShortBody {
        subtype: FrameSubType,
        expected: usize,
        actual: usize,
    },
}

/// Physical layer attributes reported by the radio.
///
/// Zero means "not reported" for channel, frequency, signal and noise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhyInfo {
    pub frequency: u16,
    pub channel: u8,
    pub signal_dbm: i8,
    pub noise_dbm: i8,
    pub bandwidth: Option<ChannelWidth>,
    pub short_preamble: bool,
    pub short_gi: bool,
    /// FCS appended to the MAC frame.
    pub fcs: bool,
    pub bad_fcs: bool,
    pub rate_hints: PhyRateHints,
}

/// Everything the analyzer knows about a single captured frame.
#[derive(Clone, Debug)]
pub struct ParsedFrame {
    /// Capture time, relative to the unix epoch.
    pub timestamp: Duration,
    pub frame_type: FrameType,
    pub subtype: FrameSubType,
    pub addresses: AddressSet,
    /// Fourth address of WDS frames, equal to the SA.
    pub address_4: Option<MacAddress>,
    pub to_ds: bool,
    pub from_ds: bool,
    pub retry: bool,
    pub protected: bool,
    pub is_qos_data: bool,

    pub channel: u8,
    pub frequency: u16,
    pub signal_dbm: i8,
    pub noise_dbm: i8,
    pub bandwidth: Option<ChannelWidth>,
    pub short_preamble: bool,
    pub short_gi: bool,
    pub phy_rate_mbps: f64,
    /// The raw duration/ID field of the MAC header.
    pub duration_id: u16,
    /// NAV reservation in microseconds. Zero for PS-Poll frames.
    pub nav_us: u16,

    /// Length of the MAC frame on air, FCS included.
    pub frame_length: usize,
    /// Payload length of a TCP or UDP segment, -1 if the frame doesn't carry one.
    pub transport_payload_length: i64,

    /// The SSID string, or one of the hidden/invalid placeholders.
    pub ssid: Option<String>,
    /// Raw information elements of management frames.
    pub elements: Option<InformationElements>,
    pub ht_capabilities: Option<HtCapabilities>,
    pub vht_capabilities: Option<VhtCapabilities>,
    pub he_capabilities: Option<HeCapabilities>,
}

impl ParsedFrame {
    pub fn is_management(&self) -> bool {
        self.frame_type == FrameType::Management
    }

    pub fn is_data(&self) -> bool {
        self.frame_type == FrameType::Data
    }

    pub fn rsn(&self) -> Option<&[u8]> {
        self.elements.as_ref().and_then(|elements| elements.rsn.as_deref())
    }

    /// `RSN/WPA2/WPA3` if the RSN element carries anything, `Open` otherwise.
    pub fn security(&self) -> &'static str {
        if self.elements.as_ref().is_some_and(|e| e.has_rsn()) {
            SECURITY_RSN
        } else {
            SECURITY_OPEN
        }
    }
}

/// Decode a captured frame.
///
/// With [LinkType::Radiotap] a missing or broken radiotap header is tolerated as long as the
/// bytes still decode as an 802.11 frame. The PHY fields then stay unpopulated.
pub fn parse_frame(
    data: &[u8],
    link_type: LinkType,
    timestamp: Duration,
) -> Result<ParsedFrame, ParseError> {
    if data.is_empty() {
        return Err(ParseError::DecodeError("Empty buffer".to_string()));
    }

    match link_type {
        LinkType::Ieee80211 => {
            let frame =
                decode_mac(data, false).map_err(|err| mac_error(err, ParseError::NoDot11))?;
            Ok(build(frame, PhyInfo::default(), data.len(), timestamp))
        }
        LinkType::Radiotap => match Radiotap::parse(data) {
            Ok((radiotap, payload)) => {
                let phy = phy_from_radiotap(&radiotap);
                if phy.bad_fcs {
                    return Err(ParseError::DecodeError("Radio reported a bad FCS".to_string()));
                }
                let frame = decode_mac(payload, phy.fcs)
                    .map_err(|err| mac_error(err, ParseError::DecodeError))?;
                Ok(build(frame, phy, payload.len(), timestamp))
            }
            Err(radiotap_error) => {
                trace!("No radiotap header: {radiotap_error:?}");
                let frame = decode_mac(data, false).map_err(|err| {
                    mac_error(err, |reason| {
                        ParseError::NoDot11(format!("{reason}, radiotap: {radiotap_error:?}"))
                    })
                })?;
                Ok(build(frame, PhyInfo::default(), data.len(), timestamp))
            }
        },
    }
}

fn decode_mac(data: &[u8], fcs_included: bool) -> Result<dot11::Frame, dot11::error::Error> {
    dot11::parse_frame(data, fcs_included)
}

fn mac_error(
    error: dot11::error::Error,
    otherwise: impl FnOnce(String) -> ParseError,
) -> ParseError {
    match error {
        dot11::error::Error::ShortBody {
            subtype,
            expected,
            actual,
        } => ParseError::ShortBody {
            subtype,
            expected,
            actual,
        },
        dot11::error::Error::FcsMismatch { .. } => ParseError::DecodeError(error.to_string()),
        other => otherwise(other.to_string()),
    }
}

/// Pull the PHY attributes out of a radiotap header.
pub fn phy_from_radiotap(radiotap: &Radiotap) -> PhyInfo {
    let mut phy = PhyInfo::default();

    if let Some(channel) = &radiotap.channel {
        phy.frequency = channel.freq;
        phy.channel = frequency_to_channel(channel.freq);
    }
    if let Some(signal) = &radiotap.antenna_signal {
        phy.signal_dbm = signal.value;
    }
    if let Some(noise) = &radiotap.antenna_noise {
        phy.noise_dbm = noise.value;
    }
    if let Some(flags) = &radiotap.flags {
        phy.short_preamble = flags.preamble;
        phy.short_gi = flags.sgi;
        phy.fcs = flags.fcs;
        phy.bad_fcs = flags.bad_fcs;
    }
    if let Some(rate) = &radiotap.rate {
        phy.rate_hints.legacy_mbps = Some(f64::from(rate.value));
    }

    if let Some(mcs) = &radiotap.mcs {
        phy.rate_hints.mcs_index = mcs.index;
        if matches!(mcs.gi, Some(GuardInterval::Short)) {
            phy.short_gi = true;
        }
        if let Some(bw) = &mcs.bw {
            phy.bandwidth = width_from_mhz(u16::from(bw.bandwidth));
        }
    }

    if let Some(vht) = &radiotap.vht {
        if matches!(vht.gi, Some(GuardInterval::Short)) {
            phy.short_gi = true;
        }
        let bandwidth_mhz = vht
            .bw
            .as_ref()
            .map(|bw| u16::from(bw.bandwidth))
            .unwrap_or(20);
        if vht.bw.is_some() {
            phy.bandwidth = width_from_mhz(bandwidth_mhz);
        }
        // Only the first user is of interest for SU transmissions.
        if let Some(user) = vht.users.iter().flatten().next() {
            phy.rate_hints.vht = Some(VhtRate {
                mcs: user.index,
                nss: user.nss,
                bandwidth_mhz,
            });
        }
    }

    phy.rate_hints.short_gi = phy.short_gi;
    phy
}

fn width_from_mhz(mhz: u16) -> Option<ChannelWidth> {
    match mhz {
        20 => Some(ChannelWidth::Twenty),
        40 => Some(ChannelWidth::Forty),
        80 => Some(ChannelWidth::Eighty),
        160 => Some(ChannelWidth::OneSixty),
        _ => None,
    }
}

fn build(
    frame: dot11::Frame,
    mut phy: PhyInfo,
    frame_length: usize,
    timestamp: Duration,
) -> ParsedFrame {
    let control = frame.frame_control().clone();
    let is_management = frame.frame_type() == FrameType::Management;

    let mut ssid = None;
    let mut ht_capabilities = None;
    let mut vht_capabilities = None;
    let mut he_capabilities = None;
    if let Some(elements) = &frame.elements {
        ssid = elements.ssid.as_ref().map(|ssid| ssid.as_str().to_string());
        ht_capabilities = elements.ht();
        vht_capabilities = elements.vht();
        he_capabilities = elements.he();

        if phy.channel == 0 {
            if let Some(ds_channel) = elements.ds_parameter_set.filter(|c| (1..=14).contains(c)) {
                phy.channel = ds_channel;
            }
        }
        if let Some(width) = elements.channel_width() {
            phy.bandwidth = Some(width);
        }
    }

    phy.rate_hints.is_management = is_management;
    let phy_rate_mbps = estimate_phy_rate(&phy.rate_hints);

    let transport_payload_length = if frame.frame_type() == FrameType::Data && !control.protected()
    {
        transport_payload_length(&frame.body)
    } else {
        -1
    };

    ParsedFrame {
        timestamp,
        frame_type: frame.frame_type(),
        subtype: frame.subtype(),
        addresses: frame.addresses(),
        address_4: frame.header.address_4,
        to_ds: control.to_ds(),
        from_ds: control.from_ds(),
        retry: control.retry(),
        protected: control.protected(),
        is_qos_data: frame.frame_type() == FrameType::Data && frame.subtype().is_qos(),
        channel: phy.channel,
        frequency: phy.frequency,
        signal_dbm: phy.signal_dbm,
        noise_dbm: phy.noise_dbm,
        bandwidth: phy.bandwidth,
        short_preamble: phy.short_preamble,
        short_gi: phy.short_gi,
        phy_rate_mbps,
        duration_id: frame.header.duration,
        nav_us: frame.header.nav_us(),
        frame_length,
        transport_payload_length,
        ssid,
        elements: frame.elements,
        ht_capabilities,
        vht_capabilities,
        he_capabilities,
    }
}

/// Length of the TCP or UDP payload behind an LLC/SNAP header, -1 if there is none.
pub fn transport_payload_length(body: &[u8]) -> i64 {
    if body.len() < 8 || body[..6] != LLC_SNAP_PREFIX {
        return -1;
    }
    let ethertype = u16::from_be_bytes([body[6], body[7]]);
    if ethertype != ETHERTYPE_IPV4 && ethertype != ETHERTYPE_IPV6 {
        return -1;
    }

    match SlicedPacket::from_ip(&body[8..]) {
        Ok(packet) => match &packet.transport {
            Some(TransportSlice::Tcp(tcp)) => tcp.payload().len() as i64,
            Some(TransportSlice::Udp(udp)) => udp.payload().len() as i64,
            _ => -1,
        },
        Err(err) => {
            trace!("Not an IP packet behind LLC/SNAP: {err}");
            -1
        }
    }
}
