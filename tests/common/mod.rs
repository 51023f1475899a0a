#![allow(dead_code)]

use std::time::Duration;

use byteorder::{LittleEndian, WriteBytesExt};
use dot11::frame::components::MacAddress;
use etherparse::PacketBuilder;
use wifi_analyzer::frame_parser::{parse_frame, LinkType, ParsedFrame};

pub const AP: MacAddress = MacAddress([0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x01]);
pub const STATION: MacAddress = MacAddress([0x12, 0x22, 0x33, 0x44, 0x55, 0x66]);

/// Some time in November 2023, in epoch milliseconds.
pub const T0: u64 = 1_700_000_000_000;

pub const CHANNEL_6: u16 = 2437;

/// flags | rate | channel | antenna signal | antenna noise
pub fn radiotap(frequency: u16, signal: i8) -> Vec<u8> {
    let mut header = vec![0, 0];
    header.write_u16::<LittleEndian>(16).unwrap();
    header.write_u32::<LittleEndian>(0x0000_006e).unwrap();
    header.push(0x00); // Flags
    header.push(12); // 6 Mbps
    header.write_u16::<LittleEndian>(frequency).unwrap();
    header.write_u16::<LittleEndian>(0x00a0).unwrap();
    header.push(signal as u8);
    header.push(-95i8 as u8);
    header
}

pub fn mac_header(
    frame_control: [u8; 2],
    duration: u16,
    addresses: [MacAddress; 3],
) -> Vec<u8> {
    let mut header = frame_control.to_vec();
    header.write_u16::<LittleEndian>(duration).unwrap();
    for address in addresses {
        header.extend_from_slice(&address.0);
    }
    header.extend_from_slice(&[0x10, 0x00]); // Sequence control
    header
}

fn announcement(frame_control: [u8; 2], bssid: MacAddress, da: MacAddress, ssid: &[u8]) -> Vec<u8> {
    let mut frame = mac_header(frame_control, 0, [da, bssid, bssid]);
    frame.extend_from_slice(&[0; 8]); // Timestamp
    frame.extend_from_slice(&[100, 0]); // Beacon interval
    frame.extend_from_slice(&[0x01, 0x04]); // Capability info
    frame.push(0);
    frame.push(ssid.len() as u8);
    frame.extend_from_slice(ssid);
    frame.extend_from_slice(&[1, 4, 0x82, 0x84, 0x8b, 0x96]); // Supported rates
    frame.extend_from_slice(&[3, 1, 6]); // DS parameter set
    frame
}

pub fn beacon(bssid: MacAddress, ssid: &[u8]) -> Vec<u8> {
    announcement([0x80, 0x00], bssid, MacAddress::BROADCAST, ssid)
}

pub fn probe_response(bssid: MacAddress, station: MacAddress, ssid: &[u8]) -> Vec<u8> {
    announcement([0x50, 0x00], bssid, station, ssid)
}

pub fn probe_request(station: MacAddress) -> Vec<u8> {
    let mut frame = mac_header(
        [0x40, 0x00],
        0,
        [MacAddress::BROADCAST, station, MacAddress::BROADCAST],
    );
    frame.extend_from_slice(&[0, 0]); // Wildcard SSID
    frame.extend_from_slice(&[1, 4, 0x02, 0x04, 0x0b, 0x16]);
    frame
}

pub fn deauthentication(sa: MacAddress, da: MacAddress, bssid: MacAddress) -> Vec<u8> {
    let mut frame = mac_header([0xc0, 0x00], 314, [da, sa, bssid]);
    frame.extend_from_slice(&[7, 0]); // Reason code
    frame
}

pub fn association_response(ap: MacAddress, station: MacAddress) -> Vec<u8> {
    let mut frame = mac_header([0x10, 0x00], 60, [station, ap, ap]);
    frame.extend_from_slice(&[0x01, 0x04]); // Capability info
    frame.extend_from_slice(&[0, 0]); // Status code
    frame.extend_from_slice(&[0x01, 0xc0]); // Association id
    frame.extend_from_slice(&[1, 4, 0x82, 0x84, 0x8b, 0x96]);
    frame
}

fn with_udp(mut frame: Vec<u8>, payload_len: usize) -> Vec<u8> {
    frame.extend_from_slice(&[0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00]);
    PacketBuilder::ipv4([192, 168, 1, 20], [192, 168, 1, 1], 64)
        .udp(5000, 5001)
        .write(&mut frame, &vec![0x5a; payload_len])
        .unwrap();
    frame
}

/// Unprotected data frame from `station` to `ap` carrying a UDP datagram.
pub fn udp_uplink(station: MacAddress, ap: MacAddress, payload_len: usize) -> Vec<u8> {
    with_udp(mac_header([0x08, 0x01], 44, [ap, station, ap]), payload_len)
}

/// Unprotected data frame from `ap` to `station` carrying a UDP datagram.
pub fn udp_downlink(ap: MacAddress, station: MacAddress, payload_len: usize) -> Vec<u8> {
    with_udp(mac_header([0x08, 0x02], 44, [station, ap, ap]), payload_len)
}

/// A frame as the capture agent delivers it, behind a radiotap header.
pub fn captured(mac_frame: &[u8], signal: i8) -> Vec<u8> {
    let mut packet = radiotap(CHANNEL_6, signal);
    packet.extend_from_slice(mac_frame);
    packet
}

pub fn parsed(mac_frame: &[u8], signal: i8) -> ParsedFrame {
    parse_frame(
        &captured(mac_frame, signal),
        LinkType::Radiotap,
        Duration::ZERO,
    )
    .expect("Test frame should parse")
}
