/// Dot11's own [Error](error::Error) implementation
pub mod error;
/// The [Frame](frame::Frame) struct, its header and all element/capability structs.
pub mod frame;
/// Enums representing frame types and frame subtypes.
mod frame_types;
/// [nom] parsers for internal usage.
pub mod parsers;

use crate::error::Error;
use crate::parsers::*;

// Re-exports for user convenience
pub use crate::frame::Frame;
pub use crate::frame_types::*;

use crc::{Crc, CRC_32_ISO_HDLC};

// CRC algorithm for FCS calculation
const CRC_32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Parse an IEEE 802.11 MAC frame from raw bytes.
///
/// If `fcs_included` is set, the trailing four bytes are checked against the CRC of the frame
/// and stripped before parsing.
pub fn parse_frame(input: &[u8], fcs_included: bool) -> Result<Frame, Error> {
    let input = if fcs_included {
        strip_fcs(input)?
    } else {
        input
    };

    let (remaining, frame_control) = parse_frame_control(input)?;
    let (body, header) = parse_header(frame_control, remaining)?;

    Frame::from_parts(header, body)
}

/// Verify the trailing FCS of a frame and return the frame without it.
pub fn strip_fcs(input: &[u8]) -> Result<&[u8], Error> {
    if input.len() < 4 {
        return Err(Error::Incomplete("Frame is shorter than its FCS".to_string()));
    }

    let (frame_data, fcs_bytes) = input.split_at(input.len() - 4);
    let crc = CRC_32.checksum(frame_data);
    // The FCS is transmitted little endian.
    let fcs = u32::from_le_bytes([fcs_bytes[0], fcs_bytes[1], fcs_bytes[2], fcs_bytes[3]]);

    if crc != fcs {
        return Err(Error::FcsMismatch {
            expected: fcs,
            calculated: crc,
        });
    }

    Ok(frame_data)
}

/// Append a valid FCS to the given frame bytes.
pub fn append_fcs(frame: &mut Vec<u8>) {
    let crc = CRC_32.checksum(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}
