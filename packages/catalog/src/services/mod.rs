pub mod category;
pub mod media;
pub mod vehicle;

pub use category::CategoryRegistry;
pub use media::MediaPipeline;
pub use vehicle::VehicleCatalog;
