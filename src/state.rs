use std::time::Duration;

use dot11::frame::components::{MacAddress, Ssid};
use dot11::FrameSubType;
use log::{debug, info};
use parking_lot::RwLock;

use crate::airtime::airtime;
use crate::devices::{Bss, Sighting, Sta, WiFiDeviceList};
use crate::frame_parser::ParsedFrame;
use crate::snapshot::Snapshot;
use crate::util::epoch_millis;

/// How long after the confirmation window a pending entry is kept around.
const PENDING_GRACE: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq)]
pub struct StateConfig {
    pub confirmation_window: Duration,
    /// Beacons weaker than this never create a BSS.
    pub min_bss_creation_rssi: Option<i8>,
    pub history_points: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig {
            confirmation_window: Duration::from_secs(60),
            min_bss_creation_rssi: Some(-84),
            history_points: 60,
        }
    }
}

/// Only unicast, non-zero addresses are tracked.
pub fn is_trackable(mac: &MacAddress) -> bool {
    !mac.is_broadcast() && !mac.is_multicast() && !mac.is_zero()
}

/// The BSS and station inventory shared between the ingestion task and its readers.
#[derive(Debug, Default)]
pub struct StateManager {
    config: StateConfig,
    inventory: RwLock<Inventory>,
}

impl StateManager {
    pub fn new(config: StateConfig) -> Self {
        StateManager {
            config,
            inventory: RwLock::new(Inventory::default()),
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn process(&self, frame: &ParsedFrame) {
        self.process_at(frame, epoch_millis());
    }

    /// Fold one frame into the inventory, `now_ms` being the wall time of the sighting.
    pub fn process_at(&self, frame: &ParsedFrame, now_ms: u64) {
        self.inventory.write().process(frame, now_ms, &self.config);
    }

    pub fn tick_metrics(&self) {
        self.tick_metrics_at(epoch_millis());
    }

    /// Close the current metrics interval of every confirmed entity.
    pub fn tick_metrics_at(&self, now_ms: u64) {
        let history_points = self.config.history_points;
        let mut inventory = self.inventory.write();
        for (_, bss) in inventory.bsss.get_devices_mut() {
            bss.tick(now_ms, history_points);
        }
        for (_, sta) in inventory.stas.get_devices_mut() {
            sta.tick(now_ms, history_points);
        }
    }

    pub fn prune(&self, stale_after: Duration) {
        self.prune_at(stale_after, epoch_millis());
    }

    /// Forget entities not seen for `stale_after` and pending entries that never got confirmed.
    pub fn prune_at(&self, stale_after: Duration, now_ms: u64) {
        let stale_before = now_ms.saturating_sub(stale_after.as_millis() as u64);
        let pending_before = now_ms
            .saturating_sub((self.config.confirmation_window + PENDING_GRACE).as_millis() as u64);
        self.inventory
            .write()
            .prune(stale_before, pending_before);
    }

    pub fn snapshot(&self) -> Snapshot {
        let inventory = self.inventory.read();
        Snapshot::project(&inventory.bsss, &inventory.stas)
    }

    pub fn clear(&self) {
        let mut inventory = self.inventory.write();
        inventory.bsss.clear();
        inventory.stas.clear();
    }

    pub fn pending_bss_since(&self, bssid: &MacAddress) -> Option<u64> {
        self.inventory.read().bsss.pending_since(bssid)
    }

    pub fn pending_sta_since(&self, mac: &MacAddress) -> Option<u64> {
        self.inventory.read().stas.pending_since(mac)
    }

    /// Confirmed BSS and station counts.
    pub fn counts(&self) -> (usize, usize) {
        let inventory = self.inventory.read();
        (inventory.bsss.size(), inventory.stas.size())
    }

    /// Read access to a confirmed BSS, including its accumulators.
    pub fn with_bss<R>(&self, bssid: &MacAddress, f: impl FnOnce(&Bss) -> R) -> Option<R> {
        self.inventory.read().bsss.get_device(bssid).map(f)
    }

    /// Read access to a confirmed station, including its accumulators.
    pub fn with_sta<R>(&self, mac: &MacAddress, f: impl FnOnce(&Sta) -> R) -> Option<R> {
        self.inventory.read().stas.get_device(mac).map(f)
    }
}

/// Second sighting checks for a BSS: strong enough, and not lacking every identifying attribute.
fn admits(frame: &ParsedFrame, min_rssi: Option<i8>) -> bool {
    if let Some(min_rssi) = min_rssi {
        if frame.signal_dbm < min_rssi {
            return false;
        }
    }

    let ssid_missing = frame.ssid.as_deref().map_or(true, Ssid::is_placeholder);
    let rsn_missing = frame.rsn().map_or(true, <[u8]>::is_empty);
    let caps_missing = frame.ht_capabilities.is_none() && frame.vht_capabilities.is_none();
    !(ssid_missing && rsn_missing && caps_missing)
}

#[derive(Debug, Default)]
struct Inventory {
    bsss: WiFiDeviceList<Bss>,
    stas: WiFiDeviceList<Sta>,
}

impl Inventory {
    fn process(&mut self, frame: &ParsedFrame, now_ms: u64, config: &StateConfig) {
        let window_ms = config.confirmation_window.as_millis() as u64;
        let addresses = frame.addresses;

        let sa = addresses.sa.filter(is_trackable);
        let ta = addresses.ta.filter(is_trackable).filter(|ta| Some(*ta) != sa);
        for mac in [sa, ta].into_iter().flatten() {
            self.sight_station(mac, frame, now_ms, window_ms);
        }

        if frame.is_management() {
            self.process_management(frame, now_ms, window_ms, config.min_bss_creation_rssi);
        }

        let (bss, sta) = if frame.is_data() {
            self.process_data(frame, now_ms)
        } else {
            self.resolve(frame)
        };
        self.accumulate(frame, bss, sta);
    }

    fn sight_station(&mut self, mac: MacAddress, frame: &ParsedFrame, now_ms: u64, window_ms: u64) {
        let sighting = self
            .stas
            .sight(mac, now_ms, window_ms, || Some(Sta::from_frame(mac, frame, now_ms)));
        if sighting == Sighting::Confirmed {
            debug!("Station {mac} confirmed");
        }

        if let Some(sta) = self.stas.get_device_mut(&mac) {
            sta.touch(now_ms);
            sta.update_signal(frame.signal_dbm);
            if frame.phy_rate_mbps > 0.0 {
                sta.bitrate = frame.phy_rate_mbps;
            }
        }
    }

    fn process_management(
        &mut self,
        frame: &ParsedFrame,
        now_ms: u64,
        window_ms: u64,
        min_rssi: Option<i8>,
    ) {
        let Some(bssid) = frame.addresses.bssid.filter(is_trackable) else {
            return;
        };
        let announcement = frame.subtype.is_bss_announcement();

        if let Some(bss) = self.bsss.get_device_mut(&bssid) {
            bss.touch(now_ms);
            if announcement {
                bss.update_from_announcement(frame);
            }
        } else if announcement {
            let sighting = self.bsss.sight(bssid, now_ms, window_ms, || {
                admits(frame, min_rssi).then(|| Bss::from_announcement(bssid, frame, now_ms))
            });
            match sighting {
                Sighting::Confirmed => info!(
                    "New BSS {bssid} ({}) on channel {}",
                    frame.ssid.as_deref().unwrap_or_default(),
                    frame.channel
                ),
                Sighting::Rejected => debug!(
                    "BSS {bssid} not admitted, signal {} dBm",
                    frame.signal_dbm
                ),
                Sighting::Known | Sighting::Pending => {}
            }
        }

        if !self.bsss.contains(&bssid) {
            return;
        }

        let addresses = frame.addresses;
        match frame.subtype {
            FrameSubType::AssociationRequest | FrameSubType::ReassociationRequest => {
                if let Some(sta) = addresses.sa {
                    self.associate(sta, bssid);
                }
            }
            FrameSubType::AssociationResponse | FrameSubType::ReassociationResponse => {
                if let Some(sta) = addresses.da {
                    self.associate(sta, bssid);
                }
            }
            FrameSubType::Disassociation | FrameSubType::Deauthentication => {
                let sta = match (addresses.sa, addresses.da) {
                    (Some(sa), Some(da)) if da == bssid => Some(sa),
                    (Some(sa), Some(da)) if sa == bssid => Some(da),
                    _ => None,
                };
                if let Some(sta) = sta {
                    self.disassociate(sta, bssid);
                }
            }
            _ => {}
        }
    }

    /// Work out which side of a data frame is the access point. Returns the confirmed
    /// (BSS, station) pair the frame belongs to.
    fn process_data(
        &mut self,
        frame: &ParsedFrame,
        now_ms: u64,
    ) -> (Option<MacAddress>, Option<MacAddress>) {
        let addresses = frame.addresses;
        let Some(ta) = addresses.ta.filter(is_trackable) else {
            return (None, None);
        };
        let ra = addresses.ra.filter(is_trackable);

        let (sta, ap) = if self.bsss.contains(&ta) {
            (ra, Some(ta))
        } else {
            (Some(ta), ra.filter(|ra| self.bsss.contains(ra)))
        };
        let sta = sta.filter(|sta| self.stas.contains(sta));

        match (sta, ap) {
            (Some(sta), Some(ap)) => {
                if let Some(bss) = self.bsss.get_device_mut(&ap) {
                    bss.touch(now_ms);
                }
                if let Some(station) = self.stas.get_device_mut(&sta) {
                    station.touch(now_ms);
                    station.update_signal(frame.signal_dbm);
                }
                self.associate(sta, ap);
            }
            (Some(sta), None) => {
                if let Some(station) = self.stas.get_device_mut(&sta) {
                    station.touch(now_ms);
                }
            }
            _ => {}
        }

        (ap, sta)
    }

    /// The confirmed BSS of a management or control frame, and the first confirmed station
    /// among its source and transmitter that isn't that BSS.
    fn resolve(&self, frame: &ParsedFrame) -> (Option<MacAddress>, Option<MacAddress>) {
        let addresses = frame.addresses;
        let bss = addresses.bssid.filter(|bssid| self.bsss.contains(bssid));
        let sta = [addresses.sa, addresses.ta]
            .into_iter()
            .flatten()
            .find(|mac| Some(*mac) != addresses.bssid && self.stas.contains(mac));
        (bss, sta)
    }

    fn accumulate(
        &mut self,
        frame: &ParsedFrame,
        bss: Option<MacAddress>,
        sta: Option<MacAddress>,
    ) {
        let on_air = airtime(
            frame.frame_length,
            frame.phy_rate_mbps,
            frame.short_preamble,
            frame.short_gi,
        );

        if let Some(bss) = bss.as_ref().and_then(|bssid| self.bsss.get_device_mut(bssid)) {
            bss.total_airtime += on_air;
            bss.total_tx_bytes += frame.frame_length as u64;
            bss.accumulated_nav_us += u64::from(frame.nav_us);
        }

        if let Some(sta) = sta.as_ref().and_then(|mac| self.stas.get_device_mut(mac)) {
            sta.total_airtime += on_air;
            if frame.transport_payload_length >= 0 {
                let bytes = frame.transport_payload_length as u64;
                match (frame.from_ds, frame.to_ds) {
                    (true, false) => sta.record_downlink(bytes, frame.retry),
                    (false, true) => sta.record_uplink(bytes, frame.retry),
                    _ => {}
                }
            }
        }
    }

    /// Only confirmed stations are associated. Moving to a new BSS leaves the old one.
    fn associate(&mut self, sta: MacAddress, bssid: MacAddress) {
        if sta == bssid || !is_trackable(&sta) {
            return;
        }
        let Some(station) = self.stas.get_device_mut(&sta) else {
            return;
        };
        let previous = station.associated_bssid.replace(bssid);

        if let Some(previous) = previous.filter(|previous| *previous != bssid) {
            if let Some(old) = self.bsss.get_device_mut(&previous) {
                old.associated_stas.remove(&sta);
            }
            debug!("Station {sta} moved from {previous} to {bssid}");
        }
        if let Some(bss) = self.bsss.get_device_mut(&bssid) {
            if bss.associated_stas.insert(sta) {
                debug!("Station {sta} associated with {bssid}");
            }
        }
    }

    fn disassociate(&mut self, sta: MacAddress, bssid: MacAddress) {
        if let Some(bss) = self.bsss.get_device_mut(&bssid) {
            bss.associated_stas.remove(&sta);
        }
        if let Some(station) = self.stas.get_device_mut(&sta) {
            if station.associated_bssid == Some(bssid) {
                station.associated_bssid = None;
                debug!("Station {sta} left {bssid}");
            }
        }
    }

    fn prune(&mut self, stale_before: u64, pending_before: u64) {
        for bssid in self.bsss.prune(stale_before, pending_before) {
            info!("BSS {bssid} went stale");
            for (_, sta) in self.stas.get_devices_mut() {
                if sta.associated_bssid == Some(bssid) {
                    sta.associated_bssid = None;
                }
            }
        }

        for mac in self.stas.prune(stale_before, pending_before) {
            debug!("Station {mac} went stale");
            for (_, bss) in self.bsss.get_devices_mut() {
                bss.associated_stas.remove(&mac);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_parser::{parse_frame, LinkType};

    const AP: MacAddress = MacAddress([0xaa, 0xbb, 0xcc, 0, 0, 1]);
    const STATION: MacAddress = MacAddress([0x12, 0x22, 0x33, 0x44, 0x55, 0x66]);

    fn frame(bytes: &[u8]) -> ParsedFrame {
        parse_frame(bytes, LinkType::Ieee80211, Duration::ZERO).unwrap()
    }

    fn beacon(ssid: &[u8]) -> ParsedFrame {
        let mut bytes = vec![
            128, 0, // FrameControl
            0, 0, // Duration id
            255, 255, 255, 255, 255, 255, // First address
            0xaa, 0xbb, 0xcc, 0, 0, 1, // Second address
            0xaa, 0xbb, 0xcc, 0, 0, 1, // Third address
            16, 0, // SequenceControl
            0, 0, 0, 0, 0, 0, 0, 0, // timestamp
            100, 0, // interval
            1, 0, // capability
            0, ssid.len() as u8,
        ];
        bytes.extend_from_slice(ssid);
        bytes.extend_from_slice(&[3, 1, 6]); // DS parameter set
        frame(&bytes)
    }

    fn probe_request() -> ParsedFrame {
        frame(&[
            64, 0, // FrameControl
            0, 0, // Duration id
            255, 255, 255, 255, 255, 255, // First address
            0x12, 0x22, 0x33, 0x44, 0x55, 0x66, // Second address
            255, 255, 255, 255, 255, 255, // Third address
            32, 0, // SequenceControl
            0, 0, // Wildcard SSID
        ])
    }

    fn association_request() -> ParsedFrame {
        frame(&[
            0, 0, // FrameControl
            0, 0, // Duration id
            0xaa, 0xbb, 0xcc, 0, 0, 1, // First address
            0x12, 0x22, 0x33, 0x44, 0x55, 0x66, // Second address
            0xaa, 0xbb, 0xcc, 0, 0, 1, // Third address
            48, 0, // SequenceControl
            1, 0, 10, 0, // capability, listen interval
            0, 3, b'L', b'a', b'b',
        ])
    }

    fn manager() -> StateManager {
        StateManager::new(StateConfig {
            min_bss_creation_rssi: None,
            ..Default::default()
        })
    }

    #[test]
    fn test_trackable() {
        assert!(is_trackable(&AP));
        assert!(!is_trackable(&MacAddress::BROADCAST));
        assert!(!is_trackable(&MacAddress::ZERO));
        assert!(!is_trackable(&MacAddress([0x33, 0x33, 0, 0, 0, 1])));
    }

    #[test]
    fn test_admission() {
        let mut lab = beacon(b"Lab");
        assert!(admits(&lab, None));
        lab.signal_dbm = -90;
        assert!(!admits(&lab, Some(-84)));
        assert!(admits(&lab, Some(-95)));
        assert!(!admits(&beacon(b""), None));
    }

    #[test]
    fn test_association_request() {
        let state = manager();
        state.process_at(&beacon(b"Lab"), 1_000);
        state.process_at(&beacon(b"Lab"), 2_000);
        state.process_at(&probe_request(), 3_000);
        state.process_at(&probe_request(), 4_000);
        state.process_at(&association_request(), 5_000);

        assert_eq!(
            state.with_sta(&STATION, |sta| sta.associated_bssid),
            Some(Some(AP))
        );
        assert_eq!(
            state.with_bss(&AP, |bss| bss.associated_stas.contains(&STATION)),
            Some(true)
        );
    }

    #[test]
    fn test_unconfirmed_station_is_not_associated() {
        let state = manager();
        state.process_at(&beacon(b"Lab"), 1_000);
        state.process_at(&beacon(b"Lab"), 2_000);
        state.process_at(&association_request(), 3_000);

        assert_eq!(state.with_bss(&AP, |bss| bss.associated_stas.len()), Some(0));
        assert_eq!(state.pending_sta_since(&STATION), Some(3_000));
    }

    #[test]
    fn test_management_frames_refresh_last_seen() {
        let state = manager();
        state.process_at(&beacon(b"Lab"), 1_000);
        state.process_at(&beacon(b"Lab"), 2_000);
        state.process_at(&association_request(), 9_000);
        assert_eq!(state.with_bss(&AP, |bss| bss.last_seen), Some(9_000));

        // Older sightings never move last_seen back.
        state.process_at(&beacon(b"Lab"), 5_000);
        assert_eq!(state.with_bss(&AP, |bss| bss.last_seen), Some(9_000));
    }

    #[test]
    fn test_beacon_accumulates_airtime() {
        let state = manager();
        state.process_at(&beacon(b"Lab"), 1_000);
        state.process_at(&beacon(b"Lab"), 2_000);

        let (bytes, on_air) = state
            .with_bss(&AP, |bss| (bss.total_tx_bytes, bss.total_airtime))
            .unwrap();
        assert_eq!(bytes, beacon(b"Lab").frame_length as u64);
        assert!(on_air > Duration::ZERO);

        state.tick_metrics_at(3_000);
        let (bytes, on_air, history) = state
            .with_bss(&AP, |bss| {
                (
                    bss.total_tx_bytes,
                    bss.total_airtime,
                    bss.historical_throughput.len(),
                )
            })
            .unwrap();
        assert_eq!(bytes, 0);
        assert_eq!(on_air, Duration::ZERO);
        assert_eq!(history, 1);
    }

    #[test]
    fn test_clear() {
        let state = manager();
        state.process_at(&beacon(b"Lab"), 1_000);
        state.process_at(&beacon(b"Lab"), 2_000);
        assert_eq!(state.counts(), (1, 1));
        state.clear();
        assert_eq!(state.counts(), (0, 0));
        assert_eq!(state.pending_bss_since(&AP), None);
    }
}
