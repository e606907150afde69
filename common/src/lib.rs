pub mod config;
pub mod frame;
pub mod intensity;
pub mod roi;
