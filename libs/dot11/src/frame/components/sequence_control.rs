#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceControl {
    /// The 4 bit fragment number from a sequence control field.
    pub fragment_number: u8,
    /// The 12 bit sequence number from a sequence control field.
    pub sequence_number: u16,
}

impl SequenceControl {
    pub fn from_u16(raw: u16) -> Self {
        SequenceControl {
            fragment_number: (raw & 0x000F) as u8,
            sequence_number: raw >> 4,
        }
    }

    pub fn encode(&self) -> [u8; 2] {
        let combined =
            ((self.sequence_number & 0x0FFF) << 4) | (self.fragment_number & 0x0F) as u16;
        combined.to_le_bytes()
    }
}
