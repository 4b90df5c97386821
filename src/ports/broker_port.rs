//! Brokerage session port.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::error::AutotraderError;
use crate::domain::order::{Order, OrderResponse};
use crate::domain::price_bar::{BarType, PriceBar, Quote};

/// What a broker needs to open a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub redirect_uri: String,
    pub credentials_path: Option<String>,
}

pub trait BrokerPort {
    fn login(&mut self, credentials: &Credentials) -> Result<(), AutotraderError>;

    fn get_quotes(&self, symbols: &[String]) -> Result<BTreeMap<String, Quote>, AutotraderError>;

    fn get_price_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bar_size: u32,
        bar_type: BarType,
    ) -> Result<Vec<PriceBar>, AutotraderError>;

    fn place_order(
        &mut self,
        account: &str,
        order: &Order,
    ) -> Result<OrderResponse, AutotraderError>;
}
