pub mod components;

use log::debug;

use crate::error::Error;
use crate::frame_types::{FrameSubType, FrameType};
use crate::parsers::parse_information_elements;
use components::{AddressSet, FrameControl, InformationElements, MacHeader};

/// A decoded 802.11 MAC frame.
///
/// Management frames get their fixed parameters split off and their information elements
/// decoded. The body of every other frame is kept verbatim.
#[derive(Clone, Debug)]
pub struct Frame {
    pub header: MacHeader,
    /// Fixed parameters of a management frame (timestamp, intervals, capability info, ...).
    pub fixed_parameters: Vec<u8>,
    /// Information elements of a management frame. `None` for all other frame types and for
    /// management frames whose body is shorter than their fixed parameters.
    pub elements: Option<InformationElements>,
    /// Everything after the MAC header.
    pub body: Vec<u8>,
}

impl Frame {
    pub(crate) fn from_parts(header: MacHeader, body: &[u8]) -> Result<Frame, Error> {
        if header.frame_control.frame_type != FrameType::Management {
            return Ok(Frame {
                header,
                fixed_parameters: Vec::new(),
                elements: None,
                body: body.to_vec(),
            });
        }

        let subtype = header.frame_control.frame_subtype;
        let fixed_len = subtype.fixed_parameters_len();
        if body.len() < fixed_len {
            if subtype.is_bss_announcement() {
                return Err(Error::ShortBody {
                    subtype,
                    expected: fixed_len,
                    actual: body.len(),
                });
            }
            debug!(
                "{subtype} body shorter than its fixed parameters ({} < {fixed_len})",
                body.len()
            );
            return Ok(Frame {
                header,
                fixed_parameters: Vec::new(),
                elements: None,
                body: body.to_vec(),
            });
        }

        let (fixed_parameters, element_bytes) = body.split_at(fixed_len);
        let elements = parse_information_elements(element_bytes);
        if elements.truncated {
            debug!("Malformed information element in {subtype}, kept the elements before it");
        }

        Ok(Frame {
            header,
            fixed_parameters: fixed_parameters.to_vec(),
            elements: Some(elements),
            body: body.to_vec(),
        })
    }

    pub fn frame_control(&self) -> &FrameControl {
        &self.header.frame_control
    }

    pub fn frame_type(&self) -> FrameType {
        self.header.frame_control.frame_type
    }

    pub fn subtype(&self) -> FrameSubType {
        self.header.frame_control.frame_subtype
    }

    pub fn addresses(&self) -> AddressSet {
        self.header.addresses()
    }

    /// The capability info field of beacons and probe responses.
    pub fn capability_info(&self) -> Option<u16> {
        if !self.subtype().is_bss_announcement() {
            return None;
        }
        let bytes = self.fixed_parameters.get(10..12)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// The beacon interval of beacons and probe responses in time units.
    pub fn beacon_interval(&self) -> Option<u16> {
        if !self.subtype().is_bss_announcement() {
            return None;
        }
        let bytes = self.fixed_parameters.get(8..10)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// The reason code of deauthentication and disassociation frames.
    pub fn reason_code(&self) -> Option<u16> {
        if !matches!(
            self.subtype(),
            FrameSubType::Deauthentication | FrameSubType::Disassociation
        ) {
            return None;
        }
        let bytes = self.body.get(0..2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}
