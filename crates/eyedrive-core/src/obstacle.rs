// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Distance zoning with edge detection

use eyedrive_config::{ObstacleConfig, SensorFailurePolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProximityZone {
    Clear,
    Warning,
    Blocked,
}

impl std::fmt::Display for ProximityZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProximityZone::Clear => write!(f, "CLEAR"),
            ProximityZone::Warning => write!(f, "WARNING"),
            ProximityZone::Blocked => write!(f, "BLOCKED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSettings {
    /// Strictly below this distance is BLOCKED
    pub blocked_below: f32,
    /// Up to and including this distance is WARNING
    pub warning_up_to: f32,
    pub sensor_failure: SensorFailurePolicy,
}

impl Default for ObstacleSettings {
    fn default() -> Self {
        Self::from(&ObstacleConfig::default())
    }
}

impl From<&ObstacleConfig> for ObstacleSettings {
    fn from(config: &ObstacleConfig) -> Self {
        Self {
            blocked_below: config.blocked_below,
            warning_up_to: config.warning_up_to,
            sensor_failure: config.sensor_failure,
        }
    }
}

/// Zone of this cycle plus whether it differs from the previous cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneReading {
    pub zone: ProximityZone,
    pub previous: ProximityZone,
    pub changed: bool,
    /// No usable distance arrived this cycle
    pub sensor_failed: bool,
}

#[derive(Debug, Clone)]
pub struct ObstacleMonitor {
    settings: ObstacleSettings,
    last_zone: ProximityZone,
}

impl Default for ObstacleMonitor {
    fn default() -> Self {
        Self::new(ObstacleSettings::default())
    }
}

impl ObstacleMonitor {
    pub fn new(settings: ObstacleSettings) -> Self {
        Self {
            settings,
            last_zone: ProximityZone::Clear,
        }
    }

    pub fn last_zone(&self) -> ProximityZone {
        self.last_zone
    }

    pub fn zone_for(&self, distance: f32) -> ProximityZone {
        if distance < self.settings.blocked_below {
            ProximityZone::Blocked
        } else if distance <= self.settings.warning_up_to {
            ProximityZone::Warning
        } else {
            ProximityZone::Clear
        }
    }

    /// Zone the distance and report the transition
    ///
    /// `None`, or a reading that is negative or not finite, is a sensor
    /// failure and is resolved by the configured policy.
    pub fn observe(&mut self, distance: Option<f32>) -> ZoneReading {
        let usable = distance.filter(|d| d.is_finite() && *d >= 0.0);
        let zone = match usable {
            Some(d) => self.zone_for(d),
            None => match self.settings.sensor_failure {
                SensorFailurePolicy::AssumeClear => ProximityZone::Clear,
                SensorFailurePolicy::HoldLast => self.last_zone,
            },
        };

        let previous = self.last_zone;
        let changed = zone != previous;
        if changed {
            debug!(target: "eyedrive_core", "Proximity zone {} -> {} ({:?} cm)", previous, zone, usable);
        }
        self.last_zone = zone;

        ZoneReading {
            zone,
            previous,
            changed,
            sensor_failed: usable.is_none(),
        }
    }
}
