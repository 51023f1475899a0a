use nom::Needed;

use crate::frame::components::FrameControl;
use crate::frame_types::FrameSubType;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A parser combinator failed somewhere inside the MAC header.
    /// The remaining data is passed as second parameter and can be used for debugging.
    #[error("A parsing failure occurred: \n{}\ndata: {:?}", .0, .1)]
    Failure(String, Vec<u8>),
    #[error("There wasn't enough data. {}", .0)]
    Incomplete(String),

    /// Frames of the extension type (`0b11`) aren't handled.
    /// The [FrameControl] header has been parsed and can be used for debugging.
    #[error("This frame type isn't handled: {:?}", .0.frame_type)]
    UnhandledFrameType(FrameControl),

    /// The frame body is shorter than the fixed parameters of its subtype.
    /// Only raised for subtypes whose fixed parameters are mandatory for further decoding.
    #[error("{subtype} body too short: expected {expected} bytes, got {actual}")]
    ShortBody {
        subtype: FrameSubType,
        expected: usize,
        actual: usize,
    },

    #[error("(FCS) mismatch {expected:08x} {calculated:08x}")]
    FcsMismatch { expected: u32, calculated: u32 },
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    /// Manually specify the conversion from a [nom::error::Error] to our own error.
    /// We need this conversion, since we work with slices.
    /// If nom's error is propagated through the program, we get lifetime issues as we can't hold
    /// ownership of that slice and thereby require a 'static.
    fn from(error: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        match error {
            nom::Err::Incomplete(needed) => match needed {
                Needed::Size(size) => {
                    Error::Incomplete(format!("At least {size} bytes are missing"))
                }
                Needed::Unknown => Error::Incomplete(String::new()),
            },
            nom::Err::Failure(error) | nom::Err::Error(error) => Error::Failure(
                format!(
                    "An error occured while parsing the data: nom::ErrorKind is {:?}",
                    error.code
                ),
                error.input.to_vec(),
            ),
        }
    }
}
