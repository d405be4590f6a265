pub mod space;
pub mod wheel;
