use super::capabilities::{
    ChannelWidth, HeCapabilities, HtCapabilities, VhtCapabilities, VhtOperation,
};

/// The SSID advertised in an SSID element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ssid {
    /// A zero length SSID element, as sent by hidden networks.
    Hidden,
    Name(String),
    /// Bytes that aren't valid UTF-8.
    Invalid(Vec<u8>),
}

impl Ssid {
    pub const HIDDEN: &'static str = "<Hidden SSID>";
    pub const INVALID: &'static str = "<Invalid/Undecodable SSID>";

    pub fn from_bytes(data: &[u8]) -> Ssid {
        if data.is_empty() {
            return Ssid::Hidden;
        }
        match std::str::from_utf8(data) {
            Ok(name) => Ssid::Name(name.to_string()),
            Err(_) => Ssid::Invalid(data.to_vec()),
        }
    }

    /// The SSID string, or one of the placeholder strings.
    pub fn as_str(&self) -> &str {
        match self {
            Ssid::Hidden => Self::HIDDEN,
            Ssid::Name(name) => name,
            Ssid::Invalid(_) => Self::INVALID,
        }
    }

    /// Whether this is one of the placeholder strings and not a real network name.
    pub fn is_placeholder(name: &str) -> bool {
        name.is_empty() || name == Self::HIDDEN || name == Self::INVALID
    }
}

/// Variable length information elements of a management frame body.
///
/// Blobs are kept verbatim so they can be decoded on demand with [HtCapabilities::decode] and
/// friends. If the same element occurs more than once, the last occurrence wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InformationElements {
    pub ssid: Option<Ssid>,
    pub supported_rates: Vec<u8>,
    pub extended_supported_rates: Vec<u8>,
    pub ds_parameter_set: Option<u8>,
    pub tim: Option<Vec<u8>>,
    pub ht_capabilities: Option<Vec<u8>>,
    pub rsn: Option<Vec<u8>>,
    pub vht_capabilities: Option<Vec<u8>>,
    pub vht_operation: Option<Vec<u8>>,
    /// HE capabilities from the element extension (id 255, extension id 35),
    /// without the extension id byte.
    pub he_capabilities: Option<Vec<u8>>,
    /// Every other element as `(id, data)`.
    pub other: Vec<(u8, Vec<u8>)>,
    /// Set if the walk over the elements stopped at a malformed element.
    pub truncated: bool,
}

impl InformationElements {
    pub fn ht(&self) -> Option<HtCapabilities> {
        self.ht_capabilities.as_deref().and_then(HtCapabilities::decode)
    }

    pub fn vht(&self) -> Option<VhtCapabilities> {
        self.vht_capabilities
            .as_deref()
            .and_then(VhtCapabilities::decode)
    }

    pub fn vht_op(&self) -> Option<VhtOperation> {
        self.vht_operation.as_deref().and_then(VhtOperation::decode)
    }

    pub fn he(&self) -> Option<HeCapabilities> {
        self.he_capabilities.as_deref().and_then(HeCapabilities::decode)
    }

    /// Whether the RSN element carries anything but zeroes.
    pub fn has_rsn(&self) -> bool {
        self.rsn
            .as_ref()
            .is_some_and(|rsn| rsn.iter().any(|byte| *byte != 0))
    }

    /// Channel width announced by the HT and VHT elements.
    pub fn channel_width(&self) -> Option<ChannelWidth> {
        ChannelWidth::from_elements(
            self.ht().as_ref(),
            self.vht_op().as_ref(),
            self.vht().as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssid_variants() {
        assert_eq!(Ssid::from_bytes(&[]), Ssid::Hidden);
        assert_eq!(Ssid::from_bytes(b"Lab").as_str(), "Lab");
        assert_eq!(
            Ssid::from_bytes(&[0xff, 0xfe, 0x41]).as_str(),
            "<Invalid/Undecodable SSID>"
        );
        assert_eq!(Ssid::Hidden.as_str(), "<Hidden SSID>");
    }

    #[test]
    fn test_placeholder() {
        assert!(Ssid::is_placeholder(""));
        assert!(Ssid::is_placeholder(Ssid::HIDDEN));
        assert!(Ssid::is_placeholder(Ssid::INVALID));
        assert!(!Ssid::is_placeholder("Lab"));
    }

    #[test]
    fn test_rsn_presence() {
        let mut elements = InformationElements::default();
        assert!(!elements.has_rsn());
        elements.rsn = Some(vec![0, 0, 0]);
        assert!(!elements.has_rsn());
        elements.rsn = Some(vec![1, 0, 0, 15, 172, 4]);
        assert!(elements.has_rsn());
    }
}
