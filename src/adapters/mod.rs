//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod env_credentials;
pub mod file_config_adapter;
pub mod paper_broker;
