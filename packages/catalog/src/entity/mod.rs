pub mod category;
pub mod vehicle;
pub mod vehicle_image;
