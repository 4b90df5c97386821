//! Core domain types and logic.

pub mod price_bar;
pub mod signal;
pub mod stock_frame;
pub mod indicator;
pub mod position;
pub mod portfolio;
pub mod order;
pub mod trade;
pub mod market_hours;
pub mod robot;
pub mod config_validation;
pub mod error;
