use serde::Serialize;
use strum_macros::Display;

use FrameSubType::*;

/// Enum with all frame types.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Serialize)]
pub enum FrameType {
    Management,
    Control,
    Data,
    Unknown,
}

/// Enum with all frame subtypes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Serialize)]
pub enum FrameSubType {
    // Management subtypes
    AssociationRequest,
    AssociationResponse,
    ReassociationRequest,
    ReassociationResponse,
    ProbeRequest,
    ProbeResponse,
    MeasurementPilot,
    Beacon,
    Atim,
    Disassociation,
    Authentication,
    Deauthentication,
    Action,
    ActionNoAck,

    // Control subtypes
    Trigger,
    Tack,
    BeamformingReportPoll,
    NdpAnnouncement,
    ControlFrameExtension,
    ControlWrapper,
    BlockAckRequest,
    BlockAck,
    PsPoll,
    Rts,
    Cts,
    Ack,
    CfEnd,
    CfEndCfAck,

    // Data subtypes
    Data,
    DataCfAck,
    DataCfPoll,
    DataCfAckCfPoll,
    NullData,
    CfAck,
    CfPoll,
    CfAckCfPoll,
    QosData,
    QosDataCfAck,
    QosDataCfPoll,
    QosDataCfAckCfPoll,
    QosNull,
    QosCfPoll,
    QosCfAckCfPoll,

    // Special subtypes
    Reserved,
    Unhandled,
}

impl FrameSubType {
    /// Whether the data header of this subtype carries the two QoS control bytes.
    pub fn is_qos(&self) -> bool {
        matches!(
            self,
            FrameSubType::QosData
                | FrameSubType::QosDataCfAck
                | FrameSubType::QosDataCfPoll
                | FrameSubType::QosDataCfAckCfPoll
                | FrameSubType::QosNull
                | FrameSubType::QosCfPoll
                | FrameSubType::QosCfAckCfPoll,
        )
    }

    /// Beacons and probe responses advertise a BSS.
    pub fn is_bss_announcement(&self) -> bool {
        matches!(self, FrameSubType::Beacon | FrameSubType::ProbeResponse)
    }

    /// Length of the fixed parameters in front of the information elements of a
    /// management frame body.
    pub fn fixed_parameters_len(&self) -> usize {
        match self {
            // timestamp + beacon interval + capability info
            FrameSubType::Beacon | FrameSubType::ProbeResponse => 12,
            // capability info + listen interval
            FrameSubType::AssociationRequest => 4,
            // The current AP address is only read from address 3.
            FrameSubType::ReassociationRequest => 4,
            // category + action + dialog token
            FrameSubType::MeasurementPilot => 3,
            // category + action
            FrameSubType::Action | FrameSubType::ActionNoAck => 2,
            _ => 0,
        }
    }

    /// Decode the 4-bit subtype field of a frame of the given type.
    pub fn from_wire(frame_type: FrameType, bits: u8) -> FrameSubType {
        match frame_type {
            FrameType::Management => MANAGEMENT_SUBTYPES[usize::from(bits & 0x0f)],
            FrameType::Control => CONTROL_SUBTYPES[usize::from(bits & 0x0f)],
            FrameType::Data => DATA_SUBTYPES[usize::from(bits & 0x0f)],
            FrameType::Unknown => FrameSubType::Unhandled,
        }
    }

    /// The 4-bit wire value of this subtype.
    pub fn wire_value(&self) -> u8 {
        match self {
            FrameSubType::Reserved => 7,
            FrameSubType::Unhandled => 15,
            subtype => [MANAGEMENT_SUBTYPES, CONTROL_SUBTYPES, DATA_SUBTYPES]
                .iter()
                .find_map(|table| table.iter().position(|entry| entry == subtype))
                .map_or(15, |position| position as u8),
        }
    }
}

impl FrameType {
    /// Decode the 2-bit type field.
    pub fn from_wire(bits: u8) -> FrameType {
        match bits & 0b11 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Unknown,
        }
    }
}

/// Subtypes indexed by their wire value.
const MANAGEMENT_SUBTYPES: [FrameSubType; 16] = [
    AssociationRequest,
    AssociationResponse,
    ReassociationRequest,
    ReassociationResponse,
    ProbeRequest,
    ProbeResponse,
    MeasurementPilot,
    Reserved,
    Beacon,
    Atim,
    Disassociation,
    Authentication,
    Deauthentication,
    Action,
    ActionNoAck,
    Reserved,
];

const CONTROL_SUBTYPES: [FrameSubType; 16] = [
    Reserved,
    Reserved,
    Trigger,
    Tack,
    BeamformingReportPoll,
    NdpAnnouncement,
    ControlFrameExtension,
    ControlWrapper,
    BlockAckRequest,
    BlockAck,
    PsPoll,
    Rts,
    Cts,
    Ack,
    CfEnd,
    CfEndCfAck,
];

const DATA_SUBTYPES: [FrameSubType; 16] = [
    Data,
    DataCfAck,
    DataCfPoll,
    DataCfAckCfPoll,
    NullData,
    CfAck,
    CfPoll,
    CfAckCfPoll,
    QosData,
    QosDataCfAck,
    QosDataCfPoll,
    QosDataCfAckCfPoll,
    QosNull,
    Reserved,
    QosCfPoll,
    QosCfAckCfPoll,
];
