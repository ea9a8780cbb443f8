pub mod model;
pub mod sessions;
