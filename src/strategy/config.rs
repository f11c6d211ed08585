//! Declarative strategy configuration: `Strategy`/`Rule`/`StrategyAction`
//! data. The evaluator only consumes this; it never branches on strategy
//! identity.

use super::predicate::Predicate;
use crate::domain::order_request::{OrderType, Tif};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAction {
    pub side: crate::domain::ids::Side,
    pub size: Decimal,
    pub outcome: String,
    pub slippage: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub order_type: OrderType,
    pub time_in_force: Tif,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub condition: Predicate,
    pub action: StrategyAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub condition: Predicate,
    pub rules: Vec<Rule>,
}
