pub mod category;
pub mod image;
pub mod shared;
pub mod vehicle;
