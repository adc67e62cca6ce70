//! Station and charging spot entities

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::DomainError;

/// Station operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationStatus {
    Active,
    Inactive,
    Maintenance,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Maintenance => "Maintenance",
        }
    }
}

impl FromStr for StationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Inactive" => Ok(Self::Inactive),
            "Maintenance" => Ok(Self::Maintenance),
            other => Err(DomainError::Validation(format!(
                "unknown station status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spot status. `Occupied` mirrors "has a session in progress" and is
/// rewritten in the same transaction as the session it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotStatus {
    Available,
    Occupied,
    Maintenance,
    Offline,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
            Self::Maintenance => "Maintenance",
            Self::Offline => "Offline",
        }
    }
}

impl FromStr for SpotStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Occupied" => Ok(Self::Occupied),
            "Maintenance" => Ok(Self::Maintenance),
            "Offline" => Ok(Self::Offline),
            other => Err(DomainError::Validation(format!(
                "unknown spot status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Station {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub status: StationStatus,
    pub created_at: DateTime<Utc>,
}

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            address: None,
            status: StationStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == StationStatus::Active
    }
}

/// A single physical connector within a station
#[derive(Debug, Clone)]
pub struct ChargingSpot {
    pub id: Uuid,
    pub station_id: Uuid,
    /// Human label printed on the spot (e.g. "A-01")
    pub label: String,
    pub connector_type: Option<String>,
    pub power_kw: Option<f64>,
    pub status: SpotStatus,
    /// Price per kWh in station currency
    pub price_per_kwh: f64,
    pub updated_at: DateTime<Utc>,
}

impl ChargingSpot {
    pub fn new(station_id: Uuid, label: impl Into<String>, price_per_kwh: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            station_id,
            label: label.into(),
            connector_type: None,
            power_kw: None,
            status: SpotStatus::Available,
            price_per_kwh,
            updated_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SpotStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spot_is_available() {
        let spot = ChargingSpot::new(Uuid::new_v4(), "A-01", 3500.0);
        assert!(spot.is_available());
        assert_eq!(spot.price_per_kwh, 3500.0);
    }

    #[test]
    fn spot_status_parsing_rejects_unknown() {
        assert_eq!("Occupied".parse::<SpotStatus>().unwrap(), SpotStatus::Occupied);
        assert!(matches!(
            "Busy".parse::<SpotStatus>(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn station_status_roundtrip() {
        for status in [
            StationStatus::Active,
            StationStatus::Inactive,
            StationStatus::Maintenance,
        ] {
            assert_eq!(status.as_str().parse::<StationStatus>().unwrap(), status);
        }
    }
}
