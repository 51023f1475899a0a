use std::time::Duration;

use log::debug;
use pcap_file::pcap::PcapParser;
use pcap_file::{DataLink, PcapError};
use thiserror::Error;

use crate::frame_parser::LinkType;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Malformed capture stream: {0}")]
    Pcap(#[from] PcapError),
    #[error("Unsupported link type {0:?}")]
    UnsupportedLinkType(DataLink),
}

/// One captured frame cut out of the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub timestamp: Duration,
    pub data: Vec<u8>,
    pub link_type: LinkType,
}

/// Cuts a pcap byte stream delivered in arbitrary chunks into frames.
///
/// Bytes that don't yet form a complete global header or packet record stay buffered
/// until the next chunk arrives.
#[derive(Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
    parser: Option<(PcapParser, LinkType)>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link type of the stream, known once the global header went through.
    pub fn link_type(&self) -> Option<LinkType> {
        self.parser.as_ref().map(|(_, link_type)| *link_type)
    }

    /// Bytes waiting for the rest of their record.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed the next chunk and return every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<RawFrame>, SplitError> {
        self.buffer.extend_from_slice(chunk);

        let mut offset = 0;
        if self.parser.is_none() {
            match PcapParser::new(&self.buffer) {
                Ok((rest, parser)) => {
                    let link_type = match parser.header().datalink {
                        DataLink::IEEE802_11_RADIOTAP => LinkType::Radiotap,
                        DataLink::IEEE802_11 => LinkType::Ieee80211,
                        other => return Err(SplitError::UnsupportedLinkType(other)),
                    };
                    debug!("Capture stream header: {:?}", parser.header());
                    offset = self.buffer.len() - rest.len();
                    self.parser = Some((parser, link_type));
                }
                Err(PcapError::IncompleteBuffer) => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            }
        }

        let mut frames = Vec::new();
        if let Some((parser, link_type)) = &self.parser {
            loop {
                match parser.next_packet(&self.buffer[offset..]) {
                    Ok((rest, packet)) => {
                        frames.push(RawFrame {
                            timestamp: packet.timestamp,
                            data: packet.data.into_owned(),
                            link_type: *link_type,
                        });
                        offset = self.buffer.len() - rest.len();
                    }
                    Err(PcapError::IncompleteBuffer) => break,
                    Err(err) => return Err(err.into()),
                }
            }
        }

        self.buffer.drain(..offset);
        Ok(frames)
    }
}
