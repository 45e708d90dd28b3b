mod sled_backend;

pub use sled_backend::*;
