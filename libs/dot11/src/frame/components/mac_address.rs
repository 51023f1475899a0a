use std::fmt;

use serde::{Serialize, Serializer};

/// This is our representation of a MAC-address
///
/// ```
/// use dot11::frame::components::MacAddress;
///
/// let address = MacAddress([255, 255, 255, 255, 255, 255]);
/// assert!(address.is_broadcast());
/// assert!(!address.is_unicast());
/// ```
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([255, 255, 255, 255, 255, 255]);
    pub const ZERO: MacAddress = MacAddress([0, 0, 0, 0, 0, 0]);

    /// Check whether this MAC addresses the whole network.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group addresses have the I/G bit (lowest bit of the first octet) set.
    /// This includes the broadcast address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// An individual, non-zero address that can identify a single device.
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast() && !self.is_zero()
    }

    /// Locally administered addresses have the U/L bit set. These are typically randomized.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 == 0x02
    }

    /// Build an address from a slice, which has to be exactly 6 bytes long.
    pub fn from_slice(slice: &[u8]) -> Option<MacAddress> {
        let bytes: [u8; 6] = slice.try_into().ok()?;
        Some(MacAddress(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum MacParseError {
    #[error("mac address contains an invalid hex digit")]
    InvalidDigit,
    #[error("mac address must consist of six octets")]
    InvalidLength,
}

impl std::str::FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut array = [0u8; 6];

        let bytes: Vec<&str> = input.split(|c| c == ':' || c == '-').collect();
        if bytes.len() != 6 {
            return Err(MacParseError::InvalidLength);
        }

        for (count, byte) in bytes.iter().enumerate() {
            if byte.len() != 2 {
                return Err(MacParseError::InvalidDigit);
            }
            array[count] = u8::from_str_radix(byte, 16).map_err(|_| MacParseError::InvalidDigit)?;
        }

        Ok(MacAddress(array))
    }
}
