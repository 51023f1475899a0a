use log::trace;
use nom::bytes::complete::take;
use nom::number::complete::u8 as get_u8;
use nom::sequence::tuple;
use nom::IResult;

use crate::frame::components::{InformationElements, Ssid};

/// Element extension id of the HE capabilities element.
const EXT_HE_CAPABILITIES: u8 = 35;

fn parse_element(input: &[u8]) -> IResult<&[u8], (u8, &[u8])> {
    let (input, (element_id, length)) = tuple((get_u8, get_u8))(input)?;
    let (input, data) = take(length)(input)?;
    Ok((input, (element_id, data)))
}

/// Walk the variable length information elements of a management frame body.
/// The general structure of every element looks like this:
///
/// 1 byte: Element id
/// 1 byte: Element length (up to 255 bytes)
/// $element_length bytes: Element data
///
/// The walk stops at the first element whose header is cut short or whose declared length
/// runs past the end of the buffer. Everything parsed up to that point is kept and
/// [InformationElements::truncated] is set.
pub fn parse_information_elements(mut input: &[u8]) -> InformationElements {
    let mut elements = InformationElements::default();

    while !input.is_empty() {
        let (element_id, data) = match parse_element(input) {
            Ok((remaining, element)) => {
                input = remaining;
                element
            }
            Err(_) => {
                trace!("Malformed element at {} trailing bytes", input.len());
                elements.truncated = true;
                break;
            }
        };

        match element_id {
            0 => elements.ssid = Some(Ssid::from_bytes(data)),
            1 => elements.supported_rates = data.to_vec(),
            3 => {
                if let Some(channel) = data.first() {
                    elements.ds_parameter_set = Some(*channel);
                }
            }
            5 => elements.tim = Some(data.to_vec()),
            45 => elements.ht_capabilities = Some(data.to_vec()),
            48 => elements.rsn = Some(data.to_vec()),
            50 => elements.extended_supported_rates = data.to_vec(),
            191 => elements.vht_capabilities = Some(data.to_vec()),
            192 => elements.vht_operation = Some(data.to_vec()),
            255 if data.first() == Some(&EXT_HE_CAPABILITIES) => {
                elements.he_capabilities = Some(data[1..].to_vec())
            }
            _ => elements.other.push((element_id, data.to_vec())),
        }
    }

    elements
}
