pub mod config;
pub mod db;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod records;
pub mod registry;
pub mod rest;
pub mod store;
pub mod validate;
pub mod window;
