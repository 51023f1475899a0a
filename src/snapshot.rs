use dot11::frame::components::MacAddress;
use itertools::Itertools;
use serde::Serialize;

use crate::devices::{Bss, Sta, WiFiDeviceList};

/// A BSS together with copies of the stations associated with it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BssView {
    #[serde(flatten)]
    pub bss: Bss,
    pub associated_stas: Vec<Sta>,
}

/// Point in time copy of the inventory, detached from the live state.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub bsss: Vec<BssView>,
    pub stas: Vec<Sta>,
}

impl Snapshot {
    /// Copy both device lists, ordered by MAC address.
    ///
    /// Association sets are resolved through the station list. A station pointing at a BSS
    /// that no longer exists shows up unassociated.
    pub fn project(bsss: &WiFiDeviceList<Bss>, stas: &WiFiDeviceList<Sta>) -> Snapshot {
        let station = |sta: &Sta| -> Sta {
            let mut sta = sta.clone();
            if sta
                .associated_bssid
                .is_some_and(|bssid| !bsss.contains(&bssid))
            {
                sta.associated_bssid = None;
            }
            sta
        };

        let bss_views = bsss
            .get_devices()
            .map(|(_, bss)| BssView {
                bss: bss.clone(),
                associated_stas: bss
                    .associated_stas
                    .iter()
                    .filter_map(|mac| stas.get_device(mac))
                    .map(station)
                    .collect(),
            })
            .sorted_by_key(|view| view.bss.bssid)
            .collect();

        let sta_views = stas
            .get_devices()
            .map(|(_, sta)| station(sta))
            .sorted_by_key(|sta| sta.mac_address)
            .collect();

        Snapshot {
            bsss: bss_views,
            stas: sta_views,
        }
    }

    pub fn bss(&self, bssid: &MacAddress) -> Option<&BssView> {
        self.bsss
            .binary_search_by_key(bssid, |view| view.bss.bssid)
            .ok()
            .map(|index| &self.bsss[index])
    }

    pub fn sta(&self, mac: &MacAddress) -> Option<&Sta> {
        self.stas
            .binary_search_by_key(mac, |sta| sta.mac_address)
            .ok()
            .map(|index| &self.stas[index])
    }

    pub fn is_empty(&self) -> bool {
        self.bsss.is_empty() && self.stas.is_empty()
    }
}
