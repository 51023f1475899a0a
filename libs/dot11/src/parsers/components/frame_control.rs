use nom::number::complete::u8 as byte;
use nom::sequence::pair;
use nom::IResult;

use crate::frame::components::FrameControl;
use crate::frame_types::{FrameSubType, FrameType};

/// Parse the two frame control bytes every frame starts with.
///
/// The subtype bits only mean something together with the type bits.
pub fn parse_frame_control(input: &[u8]) -> IResult<&[u8], FrameControl> {
    let (remaining, (first, flags)) = pair(byte, byte)(input)?;

    let frame_type = FrameType::from_wire(first >> 2);
    Ok((
        remaining,
        FrameControl {
            protocol_version: first & 0b11,
            frame_type,
            frame_subtype: FrameSubType::from_wire(frame_type, first >> 4),
            flags,
        },
    ))
}
