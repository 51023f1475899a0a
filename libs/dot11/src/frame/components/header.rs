use serde::Serialize;

use super::{FrameControl, MacAddress, SequenceControl};
use crate::frame_types::FrameType;

/// The MAC header shared by all frame types.
///
/// Structure:
///
/// **Bytes 0-1** \
/// The [FrameControl]. Parsed before the rest of the header.
///
/// **Bytes 2-3** \
/// Duration/ID. For most frames the NAV reservation in microseconds.
/// For PS-Poll frames it carries the association ID instead.
///
/// **Bytes 4-23** \
/// byte 4-9: Address 1. Always present!
/// byte 10-15: Address 2. Missing in CTS and ACK frames.
/// byte 16-21: Address 3. Management and data frames only.
/// byte 22-23: Sequence Control. Management and data frames only.
///
/// **Optional trailing fields** \
/// Address 4 (data frames with both `to_ds` and `from_ds` set),
/// QoS control (QoS data subtypes),
/// HT control (`order` flag on QoS data and management frames).
#[derive(Clone, Debug)]
pub struct MacHeader {
    pub frame_control: FrameControl,
    pub duration: u16,
    pub address_1: MacAddress,
    pub address_2: Option<MacAddress>,
    pub address_3: Option<MacAddress>,
    pub sequence_control: Option<SequenceControl>,
    pub address_4: Option<MacAddress>,
    pub qos: Option<[u8; 2]>,
    pub ht_control: Option<[u8; 4]>,
}

/// The addressing roles of a frame, resolved from the `to_ds`/`from_ds` combination.
///
/// | to_ds | from_ds | addr1 | addr2 | addr3 | addr4 |
/// |-------|---------|-------|-------|-------|-------|
/// | 0     | 0       | DA    | SA    | BSSID | -     |
/// | 0     | 1       | DA    | BSSID | SA    | -     |
/// | 1     | 0       | BSSID | SA    | DA    | -     |
/// | 1     | 1       | RA    | TA    | DA    | SA    |
///
/// The receiver is always address 1 and the transmitter is always address 2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AddressSet {
    pub bssid: Option<MacAddress>,
    pub sa: Option<MacAddress>,
    pub da: Option<MacAddress>,
    pub ra: Option<MacAddress>,
    pub ta: Option<MacAddress>,
}

impl MacHeader {
    /// Resolve the addressing roles of this header.
    pub fn addresses(&self) -> AddressSet {
        let fc = &self.frame_control;
        let (a1, a2, a3) = (Some(self.address_1), self.address_2, self.address_3);

        let mut set = match (fc.to_ds(), fc.from_ds()) {
            (false, false) => AddressSet {
                da: a1,
                sa: a2,
                bssid: a3,
                ..Default::default()
            },
            (false, true) => AddressSet {
                da: a1,
                bssid: a2,
                sa: a3,
                ..Default::default()
            },
            (true, false) => AddressSet {
                bssid: a1,
                sa: a2,
                da: a3,
                ..Default::default()
            },
            (true, true) => AddressSet {
                da: a3,
                sa: self.address_4,
                ..Default::default()
            },
        };
        set.ra = a1;
        set.ta = a2;

        set
    }

    /// Network allocation vector reserved by this frame in microseconds.
    ///
    /// PS-Poll frames carry an association ID in this field and frames with bit 15 set don't
    /// reserve the medium, both of which yield `0`.
    pub fn nav_us(&self) -> u16 {
        if self.frame_control.frame_subtype == crate::FrameSubType::PsPoll {
            return 0;
        }
        if self.duration & 0x8000 != 0 {
            return 0;
        }
        self.duration
    }

    pub fn is_management(&self) -> bool {
        self.frame_control.frame_type == FrameType::Management
    }

    pub fn is_data(&self) -> bool {
        self.frame_control.frame_type == FrameType::Data
    }

    pub fn is_control(&self) -> bool {
        self.frame_control.frame_type == FrameType::Control
    }

    /// Length of this header on the wire.
    pub fn encoded_len(&self) -> usize {
        let mut len = 2 + 2 + 6;
        if self.address_2.is_some() {
            len += 6;
        }
        if self.address_3.is_some() {
            len += 6;
        }
        if self.sequence_control.is_some() {
            len += 2;
        }
        if self.address_4.is_some() {
            len += 6;
        }
        if self.qos.is_some() {
            len += 2;
        }
        if self.ht_control.is_some() {
            len += 4;
        }
        len
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&self.frame_control.encode());
        bytes.extend_from_slice(&self.duration.to_le_bytes());
        bytes.extend_from_slice(&self.address_1.0);
        if let Some(address) = self.address_2 {
            bytes.extend_from_slice(&address.0);
        }
        if let Some(address) = self.address_3 {
            bytes.extend_from_slice(&address.0);
        }
        if let Some(sequence_control) = &self.sequence_control {
            bytes.extend_from_slice(&sequence_control.encode());
        }
        if let Some(address) = self.address_4 {
            bytes.extend_from_slice(&address.0);
        }
        if let Some(qos) = self.qos {
            bytes.extend_from_slice(&qos);
        }
        if let Some(ht_control) = self.ht_control {
            bytes.extend_from_slice(&ht_control);
        }
        bytes
    }
}
