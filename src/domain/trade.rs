//! Trade builder: wraps an [`Order`] and attaches legs and exit children.
//!
//! A trade starts as a SINGLE order with one blank leg. Setting the
//! instrument on leg 0 makes it ready for child orders; adding any child
//! converts it to a TRIGGER order whose children fire once it fills.

use chrono::{DateTime, SecondsFormat, Utc};

use super::error::AutotraderError;
use super::order::{
    EnterExit, Instruction, Instrument, Order, OrderDuration, OrderLeg, OrderResponse,
    OrderStrategyType, OrderType, Session, Side, StopPriceLinkBasis, StopPriceLinkType, StopType,
};
use super::position::AssetType;

/// Parameters for [`Trade::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub trade_id: String,
    pub order_type: OrderType,
    pub side: Side,
    pub enter_exit: EnterExit,
    pub price: f64,
    pub stop_limit_price: f64,
}

impl NewTrade {
    pub fn market(trade_id: &str, side: Side, enter_exit: EnterExit, price: f64) -> Self {
        NewTrade {
            trade_id: trade_id.to_string(),
            order_type: OrderType::Market,
            side,
            enter_exit,
            price,
            stop_limit_price: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    trade_id: String,
    order: Order,
    order_type: OrderType,
    side: Side,
    enter_exit: EnterExit,
    price: f64,
    stop_price: Option<f64>,
    stop_limit_price: Option<f64>,
    symbol: Option<String>,
    asset_type: Option<AssetType>,
    order_size: i64,
    order_response: Option<OrderResponse>,
    trigger_added: bool,
    multi_leg: bool,
}

fn check_non_negative(name: &str, value: f64) -> Result<f64, AutotraderError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AutotraderError::invalid_order(format!(
            "{name} must be a finite, non-negative number, got {value}"
        )));
    }
    Ok(value)
}

fn check_quantity(quantity: i64) -> Result<i64, AutotraderError> {
    if quantity <= 0 {
        return Err(AutotraderError::invalid_order(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(quantity)
}

impl Trade {
    pub fn new(params: NewTrade) -> Result<Self, AutotraderError> {
        let price = check_non_negative("price", params.price)?;
        let stop_limit_price = check_non_negative("stop limit price", params.stop_limit_price)?;

        let mut order = Order::single(params.order_type);
        let mut stop_price = None;
        let mut limit_price = None;
        match params.order_type {
            OrderType::Market => {}
            OrderType::Limit => {
                order.price = Some(price);
            }
            OrderType::Stop => {
                order.stop_price = Some(price);
                stop_price = Some(price);
            }
            OrderType::StopLimit => {
                order.price = Some(stop_limit_price);
                order.stop_price = Some(price);
                stop_price = Some(price);
                limit_price = Some(stop_limit_price);
            }
            OrderType::TrailingStop => {
                order.stop_price_link_basis = Some(StopPriceLinkBasis::Last);
                order.stop_price_link_type = Some(StopPriceLinkType::Value);
                order.stop_price_offset = Some(0.0);
                order.stop_type = Some(StopType::Standard);
            }
        }
        order.order_leg_collection.push(OrderLeg {
            instruction: Instruction::for_trade(params.enter_exit, params.side),
            quantity: 0,
            instrument: None,
        });

        Ok(Trade {
            trade_id: params.trade_id,
            order,
            order_type: params.order_type,
            side: params.side,
            enter_exit: params.enter_exit,
            price,
            stop_price,
            stop_limit_price: limit_price,
            symbol: None,
            asset_type: None,
            order_size: 0,
            order_response: None,
            trigger_added: false,
            multi_leg: false,
        })
    }

    pub fn trade_id(&self) -> &str {
        &self.trade_id
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn side_opposite(&self) -> Side {
        self.side.opposite()
    }

    pub fn enter_exit(&self) -> EnterExit {
        self.enter_exit
    }

    pub fn enter_exit_opposite(&self) -> EnterExit {
        self.enter_exit.opposite()
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stop_price(&self) -> Option<f64> {
        self.stop_price
    }

    pub fn stop_limit_price(&self) -> Option<f64> {
        self.stop_limit_price
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn asset_type(&self) -> Option<AssetType> {
        self.asset_type
    }

    pub fn order_size(&self) -> i64 {
        self.order_size
    }

    pub fn is_trigger(&self) -> bool {
        self.trigger_added
    }

    pub fn is_multi_leg(&self) -> bool {
        self.multi_leg
    }

    fn leg_mut(&mut self, leg_id: usize) -> Result<&mut OrderLeg, AutotraderError> {
        let legs = self.order.order_leg_collection.len();
        self.order
            .order_leg_collection
            .get_mut(leg_id)
            .ok_or_else(|| {
                AutotraderError::invalid_order(format!(
                    "leg {leg_id} does not exist, the order has {legs} leg(s)"
                ))
            })
    }

    /// Sets the instrument and quantity on an existing leg. Leg 0 also
    /// becomes the trade's symbol, size and asset type.
    pub fn instrument(
        &mut self,
        symbol: &str,
        quantity: i64,
        asset_type: AssetType,
        sub_asset_type: Option<&str>,
        leg_id: usize,
    ) -> Result<&OrderLeg, AutotraderError> {
        let quantity = check_quantity(quantity)?;
        let leg = self.leg_mut(leg_id)?;
        leg.quantity = quantity;
        leg.instrument = Some(Instrument {
            symbol: symbol.to_string(),
            asset_type,
            sub_asset_type: sub_asset_type.map(str::to_string),
        });
        if leg_id == 0 {
            self.symbol = Some(symbol.to_string());
            self.asset_type = Some(asset_type);
            self.order_size = quantity;
        }
        Ok(&self.order.order_leg_collection[leg_id])
    }

    pub fn good_till_cancel(&mut self, cancel_time: DateTime<Utc>) {
        self.order.duration = OrderDuration::GoodTillCancel;
        self.order.cancel_time = Some(cancel_time.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    /// `None` flips the leg to the instruction for the opposite side.
    pub fn modify_side(
        &mut self,
        instruction: Option<Instruction>,
        leg_id: usize,
    ) -> Result<(), AutotraderError> {
        let instruction = instruction
            .unwrap_or_else(|| Instruction::for_trade(self.enter_exit, self.side.opposite()));
        self.leg_mut(leg_id)?.instruction = instruction;
        Ok(())
    }

    pub fn modify_session(&mut self, session: Session) {
        self.order.session = session;
    }

    /// Sets the trailing distance of a TRAILING_STOP order.
    pub fn set_trailing_offset(
        &mut self,
        offset: f64,
        link_type: StopPriceLinkType,
    ) -> Result<(), AutotraderError> {
        if self.order_type != OrderType::TrailingStop {
            return Err(AutotraderError::invalid_order(format!(
                "trailing offset needs a trailing_stop order, this is {}",
                self.order_type
            )));
        }
        self.order.stop_price_offset = Some(check_non_negative("trailing offset", offset)?);
        self.order.stop_price_link_type = Some(link_type);
        Ok(())
    }

    pub fn convert_to_trigger(&mut self) {
        if !self.trigger_added {
            self.order.order_strategy_type = OrderStrategyType::Trigger;
            self.order.child_order_strategies = Vec::new();
            self.trigger_added = true;
        }
    }

    /// `price * adjustment` when `percentage`, `price + adjustment`
    /// otherwise. Rounded to 4 decimals below 1.00 and 2 decimals above.
    pub fn calculate_new_price(price: f64, adjustment: f64, percentage: bool) -> f64 {
        let new_price = if percentage {
            price * adjustment
        } else {
            price + adjustment
        };
        let scale = if new_price < 1.0 { 10_000.0 } else { 100.0 };
        (new_price * scale).round() / scale
    }

    /// +1 for long trades, -1 for short. Profit lies in this direction.
    fn direction(&self) -> f64 {
        match self.side {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    fn shift(&self, basis: f64, size: f64, percentage: bool, toward_profit: bool) -> f64 {
        let sign = if toward_profit {
            self.direction()
        } else {
            -self.direction()
        };
        if percentage {
            Self::calculate_new_price(basis, 1.0 + sign * size, true)
        } else {
            Self::calculate_new_price(basis, sign * size, false)
        }
    }

    fn basis_price(&self) -> Result<f64, AutotraderError> {
        if self.price > 0.0 {
            Ok(self.price)
        } else {
            Err(AutotraderError::TradeNotReady {
                reason: "a positive trade price is needed to place child orders".into(),
            })
        }
    }

    fn exit_leg(&self) -> Result<OrderLeg, AutotraderError> {
        let instrument = self.order.primary_instrument().cloned().ok_or_else(|| {
            AutotraderError::TradeNotReady {
                reason: "set the instrument before adding child orders".into(),
            }
        })?;
        Ok(OrderLeg {
            instruction: Instruction::for_trade(self.enter_exit.opposite(), self.side),
            quantity: self.order_size,
            instrument: Some(instrument),
        })
    }

    fn child_order(&self, order_type: OrderType) -> Result<Order, AutotraderError> {
        let mut child = Order::single(order_type);
        child.session = self.order.session;
        child.duration = self.order.duration;
        child.cancel_time = self.order.cancel_time.clone();
        child.order_leg_collection.push(self.exit_leg()?);
        Ok(child)
    }

    fn positive(name: &str, price: f64) -> Result<f64, AutotraderError> {
        if price > 0.0 {
            Ok(price)
        } else {
            Err(AutotraderError::invalid_order(format!(
                "{name} price would be {price}, it must stay above zero"
            )))
        }
    }

    fn take_profit_order(&self, size: f64, percentage: bool) -> Result<Order, AutotraderError> {
        let size = check_non_negative("take profit size", size)?;
        let mut child = self.child_order(OrderType::Limit)?;
        let target = self.shift(self.basis_price()?, size, percentage, true);
        child.price = Some(Self::positive("take profit", target)?);
        Ok(child)
    }

    fn stop_loss_order(&self, size: f64, percentage: bool) -> Result<Order, AutotraderError> {
        let size = check_non_negative("stop loss size", size)?;
        let mut child = self.child_order(OrderType::Stop)?;
        let stop = self.shift(self.basis_price()?, size, percentage, false);
        child.stop_price = Some(Self::positive("stop loss", stop)?);
        Ok(child)
    }

    fn stop_limit_order(
        &self,
        stop_size: f64,
        limit_size: f64,
        stop_percentage: bool,
        limit_percentage: bool,
    ) -> Result<Order, AutotraderError> {
        let stop_size = check_non_negative("stop size", stop_size)?;
        let limit_size = check_non_negative("limit size", limit_size)?;
        let mut child = self.child_order(OrderType::StopLimit)?;
        let stop = Self::positive(
            "stop",
            self.shift(self.basis_price()?, stop_size, stop_percentage, false),
        )?;
        let limit = Self::positive(
            "limit",
            self.shift(stop, limit_size, limit_percentage, false),
        )?;
        child.stop_price = Some(stop);
        child.price = Some(limit);
        Ok(child)
    }

    fn push_children(&mut self, children: Vec<Order>) -> &[Order] {
        self.convert_to_trigger();
        self.order.child_order_strategies.extend(children);
        &self.order.child_order_strategies
    }

    /// Appends a LIMIT exit above a long entry (below a short one).
    pub fn add_take_profit(
        &mut self,
        profit_size: f64,
        percentage: bool,
    ) -> Result<&[Order], AutotraderError> {
        let child = self.take_profit_order(profit_size, percentage)?;
        Ok(self.push_children(vec![child]))
    }

    /// Appends a STOP exit below a long entry (above a short one).
    pub fn add_stop_loss(
        &mut self,
        stop_size: f64,
        percentage: bool,
    ) -> Result<&[Order], AutotraderError> {
        let child = self.stop_loss_order(stop_size, percentage)?;
        Ok(self.push_children(vec![child]))
    }

    /// Appends a STOP_LIMIT exit. The limit sits `limit_size` past the stop
    /// on the loss side.
    pub fn add_stop_limit(
        &mut self,
        stop_size: f64,
        limit_size: f64,
        stop_percentage: bool,
        limit_percentage: bool,
    ) -> Result<&[Order], AutotraderError> {
        let child =
            self.stop_limit_order(stop_size, limit_size, stop_percentage, limit_percentage)?;
        Ok(self.push_children(vec![child]))
    }

    /// Take profit plus stop loss, or stop limit when `stop_limit_size` is
    /// given. Nothing is added if either child is invalid.
    pub fn add_box_range(
        &mut self,
        profit_size: f64,
        stop_size: f64,
        percentage: bool,
        stop_limit_size: Option<f64>,
    ) -> Result<&[Order], AutotraderError> {
        let profit = self.take_profit_order(profit_size, percentage)?;
        let stop = match stop_limit_size {
            Some(limit_size) => {
                self.stop_limit_order(stop_size, limit_size, percentage, percentage)?
            }
            None => self.stop_loss_order(stop_size, percentage)?,
        };
        Ok(self.push_children(vec![profit, stop]))
    }

    /// Leg 0 fills the primary leg. Other ids insert a new leg at
    /// `min(leg_id, len)` carrying the trade's own instruction.
    pub fn add_leg(
        &mut self,
        leg_id: usize,
        symbol: &str,
        quantity: i64,
        asset_type: AssetType,
        sub_asset_type: Option<&str>,
    ) -> Result<&[OrderLeg], AutotraderError> {
        if leg_id == 0 {
            self.instrument(symbol, quantity, asset_type, sub_asset_type, 0)?;
        } else {
            let quantity = check_quantity(quantity)?;
            let legs = &mut self.order.order_leg_collection;
            let at = leg_id.min(legs.len());
            legs.insert(
                at,
                OrderLeg {
                    instruction: Instruction::for_trade(self.enter_exit, self.side),
                    quantity,
                    instrument: Some(Instrument {
                        symbol: symbol.to_string(),
                        asset_type,
                        sub_asset_type: sub_asset_type.map(str::to_string),
                    }),
                },
            );
        }
        self.multi_leg = self.order.order_leg_collection.len() > 1;
        Ok(&self.order.order_leg_collection)
    }

    pub fn number_of_legs(&self) -> usize {
        self.order.order_leg_collection.len()
    }

    pub fn to_json(&self) -> Result<String, AutotraderError> {
        Ok(serde_json::to_string_pretty(&self.order)?)
    }

    pub fn order_response(&self) -> Option<&OrderResponse> {
        self.order_response.as_ref()
    }

    pub fn set_order_response(&mut self, response: OrderResponse) {
        self.order_response = Some(response);
    }

    /// `{symbol}_{side}_{enter_exit}_{unix_seconds}`, empty before an
    /// instrument is set.
    pub fn generate_order_id(&self, now: DateTime<Utc>) -> String {
        match &self.symbol {
            Some(symbol) => format!(
                "{symbol}_{}_{}_{}",
                self.side,
                self.enter_exit,
                now.timestamp()
            ),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn limit_trade(side: Side, price: f64) -> Trade {
        let mut trade = Trade::new(NewTrade {
            trade_id: "long_msft".into(),
            order_type: OrderType::Limit,
            side,
            enter_exit: EnterExit::Enter,
            price,
            stop_limit_price: 0.0,
        })
        .unwrap();
        trade
            .instrument("MSFT", 2, AssetType::Equity, None, 0)
            .unwrap();
        trade
    }

    #[test]
    fn new_market_trade_is_single_with_blank_leg() {
        let trade = Trade::new(NewTrade::market("t1", Side::Long, EnterExit::Enter, 0.0)).unwrap();
        let order = trade.order();
        assert_eq!(order.order_strategy_type, OrderStrategyType::Single);
        assert_eq!(order.session, Session::Normal);
        assert_eq!(order.duration, OrderDuration::Day);
        assert_eq!(order.price, None);
        assert_eq!(order.stop_price, None);
        assert_eq!(trade.number_of_legs(), 1);
        assert_eq!(order.order_leg_collection[0].instruction, Instruction::Buy);
        assert!(order.order_leg_collection[0].instrument.is_none());
        assert_eq!(trade.side_opposite(), Side::Short);
        assert_eq!(trade.enter_exit_opposite(), EnterExit::Exit);
    }

    #[test]
    fn prices_follow_order_type() {
        let stop = Trade::new(NewTrade {
            order_type: OrderType::Stop,
            ..NewTrade::market("s", Side::Long, EnterExit::Exit, 9.5)
        })
        .unwrap();
        assert_eq!(stop.order().stop_price, Some(9.5));
        assert_eq!(stop.order().price, None);
        assert_eq!(stop.order().order_leg_collection[0].instruction, Instruction::Sell);

        let stop_limit = Trade::new(NewTrade {
            order_type: OrderType::StopLimit,
            stop_limit_price: 9.25,
            ..NewTrade::market("sl", Side::Long, EnterExit::Exit, 9.5)
        })
        .unwrap();
        assert_eq!(stop_limit.order().stop_price, Some(9.5));
        assert_eq!(stop_limit.order().price, Some(9.25));
        assert_eq!(stop_limit.stop_limit_price(), Some(9.25));

        let trailing = Trade::new(NewTrade {
            order_type: OrderType::TrailingStop,
            ..NewTrade::market("ts", Side::Short, EnterExit::Enter, 0.0)
        })
        .unwrap();
        let order = trailing.order();
        assert_eq!(order.stop_price_link_basis, Some(StopPriceLinkBasis::Last));
        assert_eq!(order.stop_price_link_type, Some(StopPriceLinkType::Value));
        assert_eq!(order.stop_price_offset, Some(0.0));
        assert_eq!(order.stop_type, Some(StopType::Standard));
        assert_eq!(order.order_leg_collection[0].instruction, Instruction::SellShort);
    }

    #[test]
    fn rejects_bad_prices() {
        for price in [-1.0, f64::NAN, f64::INFINITY] {
            let err = Trade::new(NewTrade::market("x", Side::Long, EnterExit::Enter, price))
                .unwrap_err();
            assert!(matches!(err, AutotraderError::InvalidOrder { .. }));
        }
    }

    #[test]
    fn instrument_sets_leg_and_trade_fields() {
        let trade = limit_trade(Side::Long, 12.0);
        let leg = &trade.order().order_leg_collection[0];
        assert_eq!(leg.quantity, 2);
        assert_eq!(leg.instrument.as_ref().unwrap().symbol, "MSFT");
        assert_eq!(trade.symbol(), Some("MSFT"));
        assert_eq!(trade.order_size(), 2);
        assert_eq!(trade.asset_type(), Some(AssetType::Equity));
    }

    #[test]
    fn instrument_rejects_unknown_leg_and_bad_quantity() {
        let mut trade = limit_trade(Side::Long, 12.0);
        assert!(trade.instrument("AAPL", 1, AssetType::Equity, None, 3).is_err());
        assert!(trade.instrument("AAPL", 0, AssetType::Equity, None, 0).is_err());
    }

    #[test]
    fn good_till_cancel_sets_iso_time() {
        let mut trade = limit_trade(Side::Long, 12.0);
        let when = Utc.with_ymd_and_hms(2020, 11, 14, 16, 0, 0).unwrap();
        trade.good_till_cancel(when);
        assert_eq!(trade.order().duration, OrderDuration::GoodTillCancel);
        assert_eq!(trade.order().cancel_time.as_deref(), Some("2020-11-14T16:00:00Z"));
    }

    #[test]
    fn modify_side_explicit_and_default() {
        let mut trade = limit_trade(Side::Long, 12.0);
        trade.modify_side(None, 0).unwrap();
        assert_eq!(
            trade.order().order_leg_collection[0].instruction,
            Instruction::SellShort
        );
        trade.modify_side(Some(Instruction::BuyToOpen), 0).unwrap();
        assert_eq!(
            trade.order().order_leg_collection[0].instruction,
            Instruction::BuyToOpen
        );
        assert!(trade.modify_side(None, 5).is_err());
    }

    #[test]
    fn modify_session() {
        let mut trade = limit_trade(Side::Long, 12.0);
        trade.modify_session("am".parse().unwrap());
        assert_eq!(trade.order().session, Session::Am);
    }

    #[test]
    fn trailing_offset_only_on_trailing_stop() {
        let mut trade = limit_trade(Side::Long, 12.0);
        assert!(trade.set_trailing_offset(0.5, StopPriceLinkType::Value).is_err());

        let mut trailing = Trade::new(NewTrade {
            order_type: OrderType::TrailingStop,
            ..NewTrade::market("ts", Side::Long, EnterExit::Exit, 0.0)
        })
        .unwrap();
        trailing.set_trailing_offset(5.0, StopPriceLinkType::Percent).unwrap();
        assert_eq!(trailing.order().stop_price_offset, Some(5.0));
        assert_eq!(
            trailing.order().stop_price_link_type,
            Some(StopPriceLinkType::Percent)
        );
    }

    #[test]
    fn convert_to_trigger_is_idempotent() {
        let mut trade = limit_trade(Side::Long, 12.0);
        trade.add_take_profit(1.0, false).unwrap();
        trade.convert_to_trigger();
        assert!(trade.is_trigger());
        assert_eq!(trade.order().order_strategy_type, OrderStrategyType::Trigger);
        assert_eq!(trade.order().child_order_strategies.len(), 1);
    }

    #[test]
    fn calculate_new_price_rounding() {
        assert_relative_eq!(Trade::calculate_new_price(12.0, 1.1, true), 13.2);
        assert_relative_eq!(Trade::calculate_new_price(12.3456, 0.0, false), 12.35);
        assert_relative_eq!(Trade::calculate_new_price(0.5, 0.01234, false), 0.5123);
        assert_relative_eq!(Trade::calculate_new_price(10.0, -0.5, false), 9.5);
    }

    #[test]
    fn take_profit_long_and_short() {
        let mut long = limit_trade(Side::Long, 10.0);
        let children = long.add_take_profit(0.1, true).unwrap();
        assert_eq!(children[0].order_type, OrderType::Limit);
        assert_relative_eq!(children[0].price.unwrap(), 11.0);
        let leg = &children[0].order_leg_collection[0];
        assert_eq!(leg.instruction, Instruction::Sell);
        assert_eq!(leg.quantity, 2);
        assert_eq!(leg.instrument.as_ref().unwrap().symbol, "MSFT");

        let mut short = limit_trade(Side::Short, 10.0);
        let children = short.add_take_profit(1.5, false).unwrap();
        assert_relative_eq!(children[0].price.unwrap(), 8.5);
        assert_eq!(
            children[0].order_leg_collection[0].instruction,
            Instruction::BuyToCover
        );
    }

    #[test]
    fn stop_loss_long_and_short() {
        let mut long = limit_trade(Side::Long, 10.0);
        let children = long.add_stop_loss(0.1, true).unwrap();
        assert_eq!(children[0].order_type, OrderType::Stop);
        assert_relative_eq!(children[0].stop_price.unwrap(), 9.0);

        let mut short = limit_trade(Side::Short, 10.0);
        let children = short.add_stop_loss(0.5, false).unwrap();
        assert_relative_eq!(children[0].stop_price.unwrap(), 10.5);
    }

    #[test]
    fn stop_limit_offsets_from_stop() {
        let mut long = limit_trade(Side::Long, 10.0);
        let children = long.add_stop_limit(1.0, 0.25, false, false).unwrap();
        assert_eq!(children[0].order_type, OrderType::StopLimit);
        assert_relative_eq!(children[0].stop_price.unwrap(), 9.0);
        assert_relative_eq!(children[0].price.unwrap(), 8.75);

        let mut short = limit_trade(Side::Short, 10.0);
        let children = short.add_stop_limit(0.1, 0.1, true, true).unwrap();
        assert_relative_eq!(children[0].stop_price.unwrap(), 11.0);
        assert_relative_eq!(children[0].price.unwrap(), 12.1);
    }

    #[test]
    fn box_range_adds_two_children() {
        let mut trade = limit_trade(Side::Long, 10.0);
        let children = trade.add_box_range(0.2, 0.1, true, None).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].order_type, OrderType::Limit);
        assert_eq!(children[1].order_type, OrderType::Stop);

        let mut trade = limit_trade(Side::Long, 10.0);
        let children = trade.add_box_range(2.0, 1.0, false, Some(0.5)).unwrap();
        assert_eq!(children[1].order_type, OrderType::StopLimit);
        assert_relative_eq!(children[1].price.unwrap(), 8.5);
    }

    #[test]
    fn box_range_is_all_or_nothing() {
        let mut trade = limit_trade(Side::Long, 10.0);
        assert!(trade.add_box_range(1.0, 20.0, false, None).is_err());
        assert!(!trade.is_trigger());
        assert!(trade.order().child_order_strategies.is_empty());
    }

    #[test]
    fn children_need_instrument() {
        let mut trade = Trade::new(NewTrade::market("t", Side::Long, EnterExit::Enter, 10.0)).unwrap();
        let err = trade.add_take_profit(1.0, false).unwrap_err();
        assert!(matches!(err, AutotraderError::TradeNotReady { .. }));
    }

    #[test]
    fn children_need_positive_basis() {
        let mut trade = Trade::new(NewTrade::market("t", Side::Long, EnterExit::Enter, 0.0)).unwrap();
        trade.instrument("MSFT", 1, AssetType::Equity, None, 0).unwrap();
        let err = trade.add_stop_loss(1.0, false).unwrap_err();
        assert!(matches!(err, AutotraderError::TradeNotReady { .. }));
    }

    #[test]
    fn add_leg_inserts_and_flags_multi_leg() {
        let mut trade = limit_trade(Side::Long, 10.0);
        assert!(!trade.is_multi_leg());
        trade.add_leg(5, "AAPL", 3, AssetType::Equity, None).unwrap();
        assert!(trade.is_multi_leg());
        assert_eq!(trade.number_of_legs(), 2);
        let legs = trade.add_leg(1, "SPY", 1, AssetType::Etf, None).unwrap();
        assert_eq!(legs[1].instrument.as_ref().unwrap().symbol, "SPY");
        assert_eq!(legs[2].instrument.as_ref().unwrap().symbol, "AAPL");
        assert_eq!(legs[1].instruction, Instruction::Buy);

        trade.add_leg(0, "TSLA", 4, AssetType::Equity, None).unwrap();
        assert_eq!(trade.number_of_legs(), 3);
        assert_eq!(trade.symbol(), Some("TSLA"));
    }

    #[test]
    fn to_json_renders_children() {
        let mut trade = limit_trade(Side::Long, 10.0);
        trade.add_take_profit(1.0, false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&trade.to_json().unwrap()).unwrap();
        assert_eq!(json["orderStrategyType"], "TRIGGER");
        assert_eq!(json["childOrderStrategies"][0]["orderType"], "LIMIT");
        assert_eq!(json["childOrderStrategies"][0]["price"], 11.0);
    }

    #[test]
    fn generate_order_id_uses_symbol_side_and_time() {
        let now = Utc.with_ymd_and_hms(2020, 11, 14, 16, 0, 0).unwrap();
        let trade = limit_trade(Side::Long, 10.0);
        assert_eq!(
            trade.generate_order_id(now),
            format!("MSFT_long_enter_{}", now.timestamp())
        );
        let blank = Trade::new(NewTrade::market("t", Side::Long, EnterExit::Enter, 1.0)).unwrap();
        assert_eq!(blank.generate_order_id(now), "");
    }
}
