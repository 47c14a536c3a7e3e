#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sales status of a vehicle in the inventory.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// On the lot and offered to customers.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "available"))]
    Available,
    /// Held for a customer; not offered to others.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "reserved"))]
    Reserved,
    /// Sold. Kept for the record.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "sold"))]
    Sold,
}

impl VehicleStatus {
    /// Returns true if the vehicle can be offered (and recommended) to customers.
    pub fn is_offered(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// All possible status values.
    pub const ALL: &'static [VehicleStatus] = &[Self::Available, Self::Reserved, Self::Sold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Sold => "sold",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            VehicleStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for VehicleStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "sold" => Ok(Self::Sold),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
