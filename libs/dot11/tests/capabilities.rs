use dot11::frame::components::{
    ChannelWidth, HeCapabilities, HtCapabilities, VhtCapabilities, VhtOperation,
};
use dot11::parsers::parse_information_elements;
use proptest::prelude::*;

proptest! {
    #[test]
    fn ht_capabilities_keep_their_bytes(blob in proptest::collection::vec(any::<u8>(), 2..40)) {
        let ht = HtCapabilities::decode(&blob).unwrap();
        prop_assert_eq!(ht.encode(), blob.clone());
        prop_assert_eq!(ht.channel_width_40mhz(), blob[0] & 0x02 != 0);
        if blob.len() >= 18 {
            prop_assert_eq!(&ht.supported_mcs_set[..], &blob[2..18]);
        } else {
            prop_assert!(ht.supported_mcs_set.is_empty());
        }
    }

    #[test]
    fn vht_capabilities_keep_their_bytes(blob in proptest::collection::vec(any::<u8>(), 12..24)) {
        let vht = VhtCapabilities::decode(&blob).unwrap();
        prop_assert_eq!(vht.encode(), blob.clone());
        prop_assert_eq!(vht.supported_channel_width_set(), (blob[0] >> 2) & 0b11);
        prop_assert_eq!(vht.su_beamformer(), blob[1] & 0x01 != 0);
        prop_assert_eq!(vht.mu_beamformer(), blob[1] & 0x08 != 0);
    }

    #[test]
    fn he_capabilities_keep_their_bytes(blob in proptest::collection::vec(any::<u8>(), 17..40)) {
        let he = HeCapabilities::decode(&blob).unwrap();
        prop_assert_eq!(he.encode(), blob);
    }

    #[test]
    fn element_walk_never_panics(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        let elements = parse_information_elements(&data);
        // Every decoded blob must fit into the input.
        if let Some(ht) = &elements.ht_capabilities {
            prop_assert!(ht.len() <= data.len());
        }
    }

    #[test]
    fn vht_operation_width_wins(width in 0u8..4, ht_info in any::<u16>()) {
        let ht = HtCapabilities::decode(&ht_info.to_le_bytes()).unwrap();
        let op = VhtOperation::decode(&[width, 0, 0]).unwrap();
        let inferred = ChannelWidth::from_elements(Some(&ht), Some(&op), None).unwrap();

        let expected = match width {
            1 => ChannelWidth::Eighty,
            2 => ChannelWidth::OneSixty,
            3 => ChannelWidth::EightyPlusEighty,
            _ if ht.channel_width_40mhz() => ChannelWidth::Forty,
            _ => ChannelWidth::Twenty,
        };
        prop_assert_eq!(inferred, expected);
    }
}
