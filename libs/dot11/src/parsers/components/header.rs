use nom::bytes::complete::take;
use nom::combinator::opt;
use nom::number::complete::le_u16;
use nom::sequence::tuple;

use super::{clone_slice, parse_mac};
use crate::error::Error;
use crate::frame::components::{FrameControl, MacHeader, SequenceControl};
use crate::frame_types::{FrameSubType, FrameType};

/// Parse the [MacHeader] that follows the frame control.
///
/// Which fields are present depends on the frame type:
/// - Management and data frames always carry three addresses and a sequence control field.
/// - Data frames add a fourth address in WDS mode and the QoS field for QoS subtypes.
/// - Control frames carry one or two addresses depending on the subtype.
pub fn parse_header(
    frame_control: FrameControl,
    input: &[u8],
) -> Result<(&[u8], MacHeader), Error> {
    match frame_control.frame_type {
        FrameType::Management | FrameType::Data => parse_full_header(frame_control, input),
        FrameType::Control => parse_control_header(frame_control, input),
        FrameType::Unknown => Err(Error::UnhandledFrameType(frame_control)),
    }
}

fn parse_full_header(
    frame_control: FrameControl,
    input: &[u8],
) -> Result<(&[u8], MacHeader), Error> {
    let (mut remaining, (duration, address_1, address_2, address_3, sequence_control)) =
        tuple((le_u16, parse_mac, parse_mac, parse_mac, le_u16))(input)?;

    let is_data = frame_control.frame_type == FrameType::Data;

    // The fourth address only exists if both `from_ds` and `to_ds` are set.
    let mut address_4 = None;
    if is_data && frame_control.to_ds() && frame_control.from_ds() {
        (remaining, address_4) = opt(parse_mac)(remaining)?;
    }

    let mut qos = None;
    if is_data && frame_control.frame_subtype.is_qos() {
        let (rest, qos_bytes) = take(2usize)(remaining)?;
        qos = Some(clone_slice::<2>(qos_bytes));
        remaining = rest;
    }

    // With the order bit set, QoS data and management frames carry an HT control field.
    let mut ht_control = None;
    if frame_control.order() && (qos.is_some() || !is_data) {
        let (rest, ht_bytes) = take(4usize)(remaining)?;
        ht_control = Some(clone_slice::<4>(ht_bytes));
        remaining = rest;
    }

    Ok((
        remaining,
        MacHeader {
            frame_control,
            duration,
            address_1,
            address_2: Some(address_2),
            address_3: Some(address_3),
            sequence_control: Some(SequenceControl::from_u16(sequence_control)),
            address_4,
            qos,
            ht_control,
        },
    ))
}

fn parse_control_header(
    frame_control: FrameControl,
    input: &[u8],
) -> Result<(&[u8], MacHeader), Error> {
    let (mut remaining, (duration, address_1)) = tuple((le_u16, parse_mac))(input)?;

    // CTS and ACK only know a receiver.
    let mut address_2 = None;
    if !matches!(
        frame_control.frame_subtype,
        FrameSubType::Cts | FrameSubType::Ack | FrameSubType::ControlWrapper
    ) {
        (remaining, address_2) = opt(parse_mac)(remaining)?;
    }

    Ok((
        remaining,
        MacHeader {
            frame_control,
            duration,
            address_1,
            address_2,
            address_3: None,
            sequence_control: None,
            address_4: None,
            qos: None,
            ht_control: None,
        },
    ))
}
