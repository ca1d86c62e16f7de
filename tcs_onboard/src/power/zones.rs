//! Geofenced power zones announced by punctual TVM information.
//!
//! A beacon tag `ZONE:<kind>:<start_m>:<length_m>` opens a window measured by
//! odometer from the beacon. Inside a `CB` window the breaker must be open;
//! inside a `PANTO` window the pantograph must be lowered.

use heapless::Vec;
use tcs_common::host::SignalObservation;

use crate::primitives::OdoMeter;

/// Maximum zones tracked at the same time.
pub const MAX_ACTIVE_ZONES: usize = 4;

/// Kind of power restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Neutral section: circuit breaker open.
    BreakerOpen,
    /// Pantograph lowering section.
    PantographDown,
}

/// One zone parsed from a beacon tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneWindow {
    pub kind: ZoneKind,
    pub start_m: f64,
    pub length_m: f64,
}

/// Parse the part after `ZONE:`.
pub fn parse_zone(value: &str) -> Option<ZoneWindow> {
    let mut parts = value.split(':');
    let kind = match parts.next()? {
        "CB" => ZoneKind::BreakerOpen,
        "PANTO" => ZoneKind::PantographDown,
        _ => return None,
    };
    let start_m: f64 = parts.next()?.parse().ok()?;
    let length_m: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(start_m >= 0.0) || !(length_m > 0.0) {
        return None;
    }
    Some(ZoneWindow {
        kind,
        start_m,
        length_m,
    })
}

#[derive(Debug, Clone)]
struct ActiveZone {
    window: ZoneWindow,
    odometer: OdoMeter,
}

impl ActiveZone {
    fn inside(&self) -> bool {
        self.odometer.travelled_m() >= self.window.start_m && !self.odometer.triggered()
    }
}

/// Zones announced by passed beacons and not yet left.
#[derive(Debug, Clone, Default)]
pub struct PowerZones {
    zones: Vec<ActiveZone, MAX_ACTIVE_ZONES>,
}

impl PowerZones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance odometers by `distance_m`, drop left zones, register zones
    /// from the beacon passed this tick.
    pub fn update(&mut self, passed: Option<&SignalObservation>, distance_m: f64) {
        for zone in self.zones.iter_mut() {
            zone.odometer.update(distance_m);
        }
        self.zones.retain(|z| !z.odometer.triggered());

        let Some(beacon) = passed else {
            return;
        };
        for tag in beacon.tags.iter() {
            let Some(value) = tag.as_str().strip_prefix("ZONE:") else {
                continue;
            };
            match parse_zone(value) {
                Some(window) => self.register(window),
                None => tracing::warn!(tag = tag.as_str(), "malformed power zone tag ignored"),
            }
        }
    }

    fn register(&mut self, window: ZoneWindow) {
        let mut odometer = OdoMeter::new(window.start_m + window.length_m);
        odometer.start();
        tracing::debug!(?window, "power zone registered");
        if self.zones.push(ActiveZone { window, odometer }).is_err() {
            tracing::warn!(?window, "too many power zones, oldest kept");
        }
    }

    pub fn breaker_opening_required(&self) -> bool {
        self.zones
            .iter()
            .any(|z| z.window.kind == ZoneKind::BreakerOpen && z.inside())
    }

    pub fn pantograph_lowering_required(&self) -> bool {
        self.zones
            .iter()
            .any(|z| z.window.kind == ZoneKind::PantographDown && z.inside())
    }

    pub fn active_count(&self) -> usize {
        self.zones.len()
    }
}
