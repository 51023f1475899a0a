use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use dot11::frame::components::{
    ChannelWidth, HeCapabilities, HtCapabilities, MacAddress, Ssid, VhtCapabilities,
};
use serde::Serialize;

use crate::frame_parser::{ParsedFrame, SECURITY_OPEN, SECURITY_RSN};

//////////////////////////////////////////////////////////////////////

/// A metric series holding at most `history_points` samples, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History<T>(VecDeque<T>);

impl<T> History<T> {
    pub fn push(&mut self, sample: T, capacity: usize) {
        self.0.push_back(sample);
        while self.0.len() > capacity {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.0.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

/// Seconds elapsed since the last metrics sample, or `None` for an unstamped entity.
fn elapsed_secs(last_calc_time: u64, now_ms: u64) -> Option<f64> {
    if last_calc_time == 0 {
        return None;
    }
    Some(now_ms.saturating_sub(last_calc_time) as f64 / 1000.0)
}

fn percentage(part_secs: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (100.0 * part_secs / elapsed_secs).min(100.0)
}

fn bits_per_second(bytes: u64, elapsed_secs: f64) -> u64 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    (bytes as f64 * 8.0 / elapsed_secs).round() as u64
}

//////////////////////////////////////////////////////////////////////

pub trait WiFiDeviceType: Clone {
    fn last_seen(&self) -> u64;
}

#[derive(Clone, Debug)]
enum Slot<T> {
    Pending { first_seen: u64 },
    Confirmed(T),
}

/// Outcome of sighting a MAC address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sighting {
    /// The device was confirmed before this sighting.
    Known,
    /// Second sighting within the window, the device is now confirmed.
    Confirmed,
    /// First sighting, or one after the window expired. The device waits for another.
    Pending,
    /// Second sighting within the window but the admission check refused the device.
    Rejected,
}

/// Devices keyed by MAC address, each either waiting for confirmation or confirmed.
#[derive(Clone, Debug)]
pub struct WiFiDeviceList<T: WiFiDeviceType> {
    devices: HashMap<MacAddress, Slot<T>>,
}

impl<T: WiFiDeviceType> Default for WiFiDeviceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WiFiDeviceType> WiFiDeviceList<T> {
    pub fn new() -> Self {
        WiFiDeviceList {
            devices: HashMap::new(),
        }
    }

    /// Number of confirmed devices.
    pub fn size(&self) -> usize {
        self.devices
            .values()
            .filter(|slot| matches!(slot, Slot::Confirmed(_)))
            .count()
    }

    pub fn pending_size(&self) -> usize {
        self.devices.len() - self.size()
    }

    /// When a pending device was first seen.
    pub fn pending_since(&self, mac_address: &MacAddress) -> Option<u64> {
        match self.devices.get(mac_address) {
            Some(Slot::Pending { first_seen }) => Some(*first_seen),
            _ => None,
        }
    }

    /// Record a sighting of `mac_address` at `now_ms`.
    ///
    /// A second sighting less than `window_ms` after the first one confirms the device with
    /// whatever `admit` builds. When `admit` refuses, the device stays pending with its
    /// original first-seen time.
    pub fn sight<F>(
        &mut self,
        mac_address: MacAddress,
        now_ms: u64,
        window_ms: u64,
        admit: F,
    ) -> Sighting
    where
        F: FnOnce() -> Option<T>,
    {
        let first_seen = match self.devices.get(&mac_address) {
            Some(Slot::Confirmed(_)) => return Sighting::Known,
            Some(Slot::Pending { first_seen }) => Some(*first_seen),
            None => None,
        };

        match first_seen {
            Some(first_seen) if now_ms.saturating_sub(first_seen) < window_ms => match admit() {
                Some(device) => {
                    self.devices.insert(mac_address, Slot::Confirmed(device));
                    Sighting::Confirmed
                }
                None => Sighting::Rejected,
            },
            _ => {
                self.devices
                    .insert(mac_address, Slot::Pending { first_seen: now_ms });
                Sighting::Pending
            }
        }
    }

    pub fn contains(&self, mac_address: &MacAddress) -> bool {
        matches!(self.devices.get(mac_address), Some(Slot::Confirmed(_)))
    }

    pub fn get_device(&self, mac_address: &MacAddress) -> Option<&T> {
        match self.devices.get(mac_address) {
            Some(Slot::Confirmed(device)) => Some(device),
            _ => None,
        }
    }

    pub fn get_device_mut(&mut self, mac_address: &MacAddress) -> Option<&mut T> {
        match self.devices.get_mut(mac_address) {
            Some(Slot::Confirmed(device)) => Some(device),
            _ => None,
        }
    }

    /// Confirmed devices in no particular order.
    pub fn get_devices(&self) -> impl Iterator<Item = (&MacAddress, &T)> {
        self.devices.iter().filter_map(|(mac, slot)| match slot {
            Slot::Confirmed(device) => Some((mac, device)),
            Slot::Pending { .. } => None,
        })
    }

    pub fn get_devices_mut(&mut self) -> impl Iterator<Item = (&MacAddress, &mut T)> {
        self.devices.iter_mut().filter_map(|(mac, slot)| match slot {
            Slot::Confirmed(device) => Some((mac, device)),
            Slot::Pending { .. } => None,
        })
    }

    /// Drop confirmed devices last seen before `stale_before` and pending ones first seen
    /// before `pending_before`. Returns the removed confirmed devices.
    pub fn prune(&mut self, stale_before: u64, pending_before: u64) -> Vec<MacAddress> {
        let mut removed = Vec::new();
        self.devices.retain(|mac, slot| {
            let keep = match slot {
                Slot::Pending { first_seen } => *first_seen >= pending_before,
                Slot::Confirmed(device) => device.last_seen() >= stale_before,
            };
            if !keep && matches!(slot, Slot::Confirmed(_)) {
                removed.push(*mac);
            }
            keep
        });
        removed
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

//////////////////////////////////////////////////////////////////////

/// A confirmed access point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bss {
    pub bssid: MacAddress,
    pub ssid: String,
    pub channel: u8,
    /// 20 MHz until the BSS advertises something wider.
    pub bandwidth: ChannelWidth,
    pub security: String,
    pub signal_strength: i8,
    /// Epoch milliseconds.
    pub last_seen: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ht_capabilities: Option<HtCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vht_capabilities: Option<VhtCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub he_capabilities: Option<HeCapabilities>,
    /// Keys into the station list, resolved when a snapshot is taken.
    #[serde(skip)]
    pub associated_stas: BTreeSet<MacAddress>,

    pub channel_utilization: f64,
    pub nav_utilization: f64,
    pub throughput: u64,
    pub historical_channel_utilization: History<f64>,
    pub historical_nav_utilization: History<f64>,
    pub historical_throughput: History<u64>,

    #[serde(skip)]
    pub total_airtime: Duration,
    #[serde(skip)]
    pub total_tx_bytes: u64,
    #[serde(skip)]
    pub accumulated_nav_us: u64,
    #[serde(skip)]
    pub last_calc_time: u64,
}

impl WiFiDeviceType for Bss {
    fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

impl Bss {
    pub fn new(bssid: MacAddress, now_ms: u64) -> Self {
        Bss {
            bssid,
            ssid: String::new(),
            channel: 0,
            bandwidth: ChannelWidth::Twenty,
            security: String::new(),
            signal_strength: 0,
            last_seen: now_ms,
            ht_capabilities: None,
            vht_capabilities: None,
            he_capabilities: None,
            associated_stas: BTreeSet::new(),
            channel_utilization: 0.0,
            nav_utilization: 0.0,
            throughput: 0,
            historical_channel_utilization: History::default(),
            historical_nav_utilization: History::default(),
            historical_throughput: History::default(),
            total_airtime: Duration::ZERO,
            total_tx_bytes: 0,
            accumulated_nav_us: 0,
            last_calc_time: now_ms,
        }
    }

    /// Built from the Beacon or Probe Response that confirmed it.
    pub fn from_announcement(bssid: MacAddress, frame: &ParsedFrame, now_ms: u64) -> Self {
        let mut bss = Bss::new(bssid, now_ms);
        bss.update_from_announcement(frame);
        bss
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_seen = self.last_seen.max(now_ms);
    }

    /// Refresh the advertised attributes from a Beacon or Probe Response.
    pub fn update_from_announcement(&mut self, frame: &ParsedFrame) {
        if frame.signal_dbm != 0 {
            self.signal_strength = frame.signal_dbm;
        }

        if let Some(ssid) = frame.ssid.as_deref() {
            if !Ssid::is_placeholder(ssid) {
                self.ssid = ssid.to_string();
            } else if self.ssid.is_empty() {
                self.ssid = ssid.to_string();
            }
        }

        if frame.channel != 0 {
            self.channel = frame.channel;
        }
        if let Some(bandwidth) = frame.bandwidth {
            self.bandwidth = bandwidth;
        }

        if frame.ht_capabilities.is_some() {
            self.ht_capabilities = frame.ht_capabilities.clone();
        }
        if frame.vht_capabilities.is_some() {
            self.vht_capabilities = frame.vht_capabilities.clone();
        }
        if frame.he_capabilities.is_some() {
            self.he_capabilities = frame.he_capabilities.clone();
        }

        if frame.security() == SECURITY_RSN {
            self.security = SECURITY_RSN.to_string();
        } else if self.security.is_empty() {
            self.security = SECURITY_OPEN.to_string();
        }
    }

    /// Close the current metrics interval.
    pub fn tick(&mut self, now_ms: u64, history_points: usize) {
        match elapsed_secs(self.last_calc_time, now_ms) {
            Some(elapsed) => {
                self.channel_utilization = percentage(self.total_airtime.as_secs_f64(), elapsed);
                self.nav_utilization =
                    percentage(self.accumulated_nav_us as f64 / 1_000_000.0, elapsed);
                self.throughput = bits_per_second(self.total_tx_bytes, elapsed);
            }
            None => {
                self.channel_utilization = 0.0;
                self.nav_utilization = 0.0;
                self.throughput = 0;
            }
        }

        self.historical_channel_utilization
            .push(self.channel_utilization, history_points);
        self.historical_nav_utilization
            .push(self.nav_utilization, history_points);
        self.historical_throughput
            .push(self.throughput, history_points);

        self.total_airtime = Duration::ZERO;
        self.total_tx_bytes = 0;
        self.accumulated_nav_us = 0;
        self.last_calc_time = now_ms;
    }
}

//////////////////////////////////////////////////////////////////////

/// A confirmed station.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sta {
    pub mac_address: MacAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_bssid: Option<MacAddress>,
    pub signal_strength: i8,
    /// Epoch milliseconds.
    pub last_seen: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ht_capabilities: Option<HtCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vht_capabilities: Option<VhtCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub he_capabilities: Option<HeCapabilities>,

    pub channel_utilization: f64,
    pub uplink_throughput: u64,
    pub downlink_throughput: u64,
    pub historical_channel_utilization: History<f64>,
    pub historical_uplink_throughput: History<u64>,
    pub historical_downlink_throughput: History<u64>,

    // Lifetime counters, never reset by the metrics tick.
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_retries: u64,
    pub rx_retries: u64,
    /// PHY rate of the last frame sent by this station, in Mbps.
    pub bitrate: f64,

    #[serde(skip)]
    pub total_airtime: Duration,
    #[serde(skip)]
    pub total_uplink_bytes: u64,
    #[serde(skip)]
    pub total_downlink_bytes: u64,
    #[serde(skip)]
    pub last_calc_time: u64,
}

impl WiFiDeviceType for Sta {
    fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

impl Sta {
    pub fn new(mac_address: MacAddress, now_ms: u64) -> Self {
        Sta {
            mac_address,
            associated_bssid: None,
            signal_strength: 0,
            last_seen: now_ms,
            ht_capabilities: None,
            vht_capabilities: None,
            he_capabilities: None,
            channel_utilization: 0.0,
            uplink_throughput: 0,
            downlink_throughput: 0,
            historical_channel_utilization: History::default(),
            historical_uplink_throughput: History::default(),
            historical_downlink_throughput: History::default(),
            tx_bytes: 0,
            rx_bytes: 0,
            tx_packets: 0,
            rx_packets: 0,
            tx_retries: 0,
            rx_retries: 0,
            bitrate: 0.0,
            total_airtime: Duration::ZERO,
            total_uplink_bytes: 0,
            total_downlink_bytes: 0,
            last_calc_time: now_ms,
        }
    }

    /// Built from the frame that confirmed it, taking over its capabilities.
    pub fn from_frame(mac_address: MacAddress, frame: &ParsedFrame, now_ms: u64) -> Self {
        let mut sta = Sta::new(mac_address, now_ms);
        sta.ht_capabilities = frame.ht_capabilities.clone();
        sta.vht_capabilities = frame.vht_capabilities.clone();
        sta.he_capabilities = frame.he_capabilities.clone();
        sta
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_seen = self.last_seen.max(now_ms);
    }

    pub fn update_signal(&mut self, signal_dbm: i8) {
        if signal_dbm != 0 {
            self.signal_strength = signal_dbm;
        }
    }

    pub fn record_uplink(&mut self, bytes: u64, retry: bool) {
        self.total_uplink_bytes += bytes;
        self.tx_bytes += bytes;
        self.tx_packets += 1;
        if retry {
            self.tx_retries += 1;
        }
    }

    pub fn record_downlink(&mut self, bytes: u64, retry: bool) {
        self.total_downlink_bytes += bytes;
        self.rx_bytes += bytes;
        self.rx_packets += 1;
        if retry {
            self.rx_retries += 1;
        }
    }

    /// Close the current metrics interval.
    pub fn tick(&mut self, now_ms: u64, history_points: usize) {
        match elapsed_secs(self.last_calc_time, now_ms) {
            Some(elapsed) => {
                self.channel_utilization = percentage(self.total_airtime.as_secs_f64(), elapsed);
                self.uplink_throughput = bits_per_second(self.total_uplink_bytes, elapsed);
                self.downlink_throughput = bits_per_second(self.total_downlink_bytes, elapsed);
            }
            None => {
                self.channel_utilization = 0.0;
                self.uplink_throughput = 0;
                self.downlink_throughput = 0;
            }
        }

        self.historical_channel_utilization
            .push(self.channel_utilization, history_points);
        self.historical_uplink_throughput
            .push(self.uplink_throughput, history_points);
        self.historical_downlink_throughput
            .push(self.downlink_throughput, history_points);

        self.total_airtime = Duration::ZERO;
        self.total_uplink_bytes = 0;
        self.total_downlink_bytes = 0;
        self.last_calc_time = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = MacAddress([0xaa, 0xbb, 0xcc, 0, 0, 1]);

    #[test]
    fn test_history_is_bounded() {
        let mut history = History::default();
        for sample in 0..10u64 {
            history.push(sample, 3);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![7, 8, 9]);
        assert_eq!(history.latest(), Some(&9));
    }

    #[test]
    fn test_confirmation_window() {
        let mut list: WiFiDeviceList<Sta> = WiFiDeviceList::new();
        assert_eq!(list.sight(MAC, 1_000, 60_000, || None), Sighting::Pending);
        assert_eq!(list.pending_since(&MAC), Some(1_000));
        assert_eq!(
            list.sight(MAC, 31_000, 60_000, || Some(Sta::new(MAC, 31_000))),
            Sighting::Confirmed
        );
        assert!(list.contains(&MAC));
        assert_eq!(list.pending_since(&MAC), None);
        assert_eq!(list.sight(MAC, 32_000, 60_000, || None), Sighting::Known);
        assert_eq!(list.size(), 1);
        assert_eq!(list.pending_size(), 0);
    }

    #[test]
    fn test_sighting_after_window_resets() {
        let mut list: WiFiDeviceList<Sta> = WiFiDeviceList::new();
        list.sight(MAC, 1_000, 60_000, || None);
        assert_eq!(
            list.sight(MAC, 62_000, 60_000, || Some(Sta::new(MAC, 62_000))),
            Sighting::Pending
        );
        assert_eq!(list.pending_since(&MAC), Some(62_000));
        assert!(!list.contains(&MAC));
    }

    #[test]
    fn test_rejected_keeps_first_seen() {
        let mut list: WiFiDeviceList<Bss> = WiFiDeviceList::new();
        list.sight(MAC, 1_000, 60_000, || None);
        assert_eq!(list.sight(MAC, 2_000, 60_000, || None), Sighting::Rejected);
        assert_eq!(list.pending_since(&MAC), Some(1_000));
    }

    #[test]
    fn test_prune() {
        let other = MacAddress([2, 0, 0, 0, 0, 1]);
        let mut list: WiFiDeviceList<Sta> = WiFiDeviceList::new();
        list.sight(MAC, 1_000, 60_000, || None);
        list.sight(MAC, 2_000, 60_000, || Some(Sta::new(MAC, 2_000)));
        list.sight(other, 5_000, 60_000, || None);

        assert!(list.prune(1_000, 1_000).is_empty());
        assert_eq!(list.prune(3_000, 1_000), vec![MAC]);
        assert_eq!(list.size(), 0);
        assert_eq!(list.pending_size(), 1);
        list.prune(3_000, 6_000);
        assert_eq!(list.pending_size(), 0);
    }

    #[test]
    fn test_sta_tick() {
        let mut sta = Sta::new(MAC, 10_000);
        sta.record_uplink(1200, false);
        sta.record_downlink(300, true);
        sta.total_airtime = Duration::from_millis(250);
        sta.tick(11_000, 60);

        assert_eq!(sta.uplink_throughput, 9600);
        assert_eq!(sta.downlink_throughput, 2400);
        assert!((sta.channel_utilization - 25.0).abs() < 1e-9);
        assert_eq!(sta.total_uplink_bytes, 0);
        assert_eq!(sta.total_airtime, Duration::ZERO);
        assert_eq!(sta.last_calc_time, 11_000);
        // Lifetime counters survive the tick.
        assert_eq!(sta.tx_bytes, 1200);
        assert_eq!(sta.rx_retries, 1);
    }

    #[test]
    fn test_unstamped_tick_pushes_zero() {
        let mut bss = Bss::new(MAC, 0);
        bss.total_tx_bytes = 5_000;
        bss.tick(1_000, 60);
        assert_eq!(bss.historical_throughput.latest(), Some(&0));
        assert_eq!(bss.total_tx_bytes, 0);
        assert_eq!(bss.last_calc_time, 1_000);
    }

    #[test]
    fn test_utilization_is_capped() {
        let mut bss = Bss::new(MAC, 1_000);
        bss.total_airtime = Duration::from_secs(5);
        bss.accumulated_nav_us = 500_000;
        bss.tick(2_000, 60);
        assert_eq!(bss.channel_utilization, 100.0);
        assert!((bss.nav_utilization - 50.0).abs() < 1e-9);
    }
}
