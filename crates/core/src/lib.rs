pub mod capture;
pub mod config;
pub mod detection;
pub mod preprocessing;
pub mod shared;
pub mod tracking;
