pub mod config;
pub mod storage;
pub mod vehicle_status;

pub use vehicle_status::{ParseStatusError, VehicleStatus};
