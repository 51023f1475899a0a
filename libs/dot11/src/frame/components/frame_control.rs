use crate::frame_types::{FrameSubType, FrameType};

const TO_DS: u8 = 0x01;
const FROM_DS: u8 = 0x02;
const MORE_FRAGMENTS: u8 = 0x04;
const RETRY: u8 = 0x08;
const POWER_MANAGEMENT: u8 = 0x10;
const MORE_DATA: u8 = 0x20;
const PROTECTED: u8 = 0x40;
const ORDER: u8 = 0x80;

/// The first two bytes of every frame.
///
/// The first byte packs the protocol version (bits 0-1), the [FrameType] (bits 2-3) and the
/// [FrameSubType] (bits 4-7). The second byte holds the flags, lowest bit first: to DS,
/// from DS, more fragments, retry, power management, more data, protected and order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameControl {
    pub protocol_version: u8,
    pub frame_type: FrameType,
    pub frame_subtype: FrameSubType,
    pub flags: u8,
}

impl FrameControl {
    fn has(&self, mask: u8) -> bool {
        self.flags & mask != 0
    }

    /// Headed into the distribution system.
    pub fn to_ds(&self) -> bool {
        self.has(TO_DS)
    }

    /// Coming out of the distribution system.
    pub fn from_ds(&self) -> bool {
        self.has(FROM_DS)
    }

    pub fn more_frag(&self) -> bool {
        self.has(MORE_FRAGMENTS)
    }

    pub fn retry(&self) -> bool {
        self.has(RETRY)
    }

    pub fn pwr_mgmt(&self) -> bool {
        self.has(POWER_MANAGEMENT)
    }

    pub fn more_data(&self) -> bool {
        self.has(MORE_DATA)
    }

    /// The body is encrypted.
    pub fn protected(&self) -> bool {
        self.has(PROTECTED)
    }

    /// QoS data and management frames carry an HT control field.
    pub fn order(&self) -> bool {
        self.has(ORDER)
    }

    pub fn encode(&self) -> [u8; 2] {
        let frame_type = match self.frame_type {
            FrameType::Management => 0,
            FrameType::Control => 1,
            FrameType::Data => 2,
            FrameType::Unknown => 3,
        };
        [
            self.frame_subtype.wire_value() << 4 | frame_type << 2 | self.protocol_version & 0b11,
            self.flags,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_frame_control;

    #[test]
    fn test_each_flag_reads_its_own_bit() {
        let getters: [fn(&FrameControl) -> bool; 8] = [
            FrameControl::to_ds,
            FrameControl::from_ds,
            FrameControl::more_frag,
            FrameControl::retry,
            FrameControl::pwr_mgmt,
            FrameControl::more_data,
            FrameControl::protected,
            FrameControl::order,
        ];
        for bit in 0..8 {
            let (_, frame_control) = parse_frame_control(&[0x08, 1 << bit]).unwrap();
            let set: Vec<bool> = getters.iter().map(|get| get(&frame_control)).collect();
            let expected: Vec<bool> = (0..8).map(|other| other == bit).collect();
            assert_eq!(set, expected, "bit {bit}");
        }
    }

    #[test]
    /// Management-Beacon: FrameType `00` and SubType `1000`
    fn test_beacon() {
        let bytes = [0b1000_0000, 0b0000_0000];
        let frame_control = parse_frame_control(&bytes).unwrap().1;

        assert!(matches!(frame_control.frame_type, FrameType::Management));
        assert!(matches!(frame_control.frame_subtype, FrameSubType::Beacon));
        assert_eq!(frame_control.encode(), bytes);
    }

    #[test]
    fn test_qos_data_to_ds() {
        let bytes = [0x88, 0x41];
        let frame_control = parse_frame_control(&bytes).unwrap().1;

        assert_eq!(frame_control.frame_type, FrameType::Data);
        assert_eq!(frame_control.frame_subtype, FrameSubType::QosData);
        assert!(frame_control.to_ds());
        assert!(!frame_control.from_ds());
        assert!(frame_control.protected());
        assert_eq!(frame_control.encode(), bytes);
    }
}
