//! Strategy evaluator (C5): maps a `MarketContext` to an order intent per
//! outcome, gated by trend confirmation, lockouts, and active-position
//! checks.

use super::config::Strategy;
use crate::domain::context::MarketContext;
use crate::domain::ids::Side;
use crate::domain::order_request::{OrderRequest, OrderType, RequestSource, Tif};
use crate::domain::trade_record::TradeRecord;
use crate::domain::trend::{Direction, TrendPrediction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const ENTER_LOCKOUT_SECS: f64 = 180.0;
pub const EXIT_LOCKOUT_SECS: f64 = 10.0;
pub const REVERSAL_CONFIRMATION_SECS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockCode {
    TrendFlat,
    TrendReversal,
    TrendMismatch,
    Lockout,
    NoEnter,
    NoExit,
    MissingDataError,
    Slippage,
}

#[derive(Debug, Clone)]
pub enum EvalOutcome {
    Intent(OrderRequest),
    Blocked(BlockCode),
}

/// `should_enter`: the first `(strategy, rule)` whose condition holds and
/// whose action targets `outcome` wins; no active BUY trade record may
/// exist for the outcome.
pub fn should_enter(
    ctx: &MarketContext,
    outcome: &str,
    strategies: &[Strategy],
    active_buy_trade: Option<&TradeRecord>,
    now_ts: f64,
) -> EvalOutcome {
    if let Some(time_left) = ctx.time_left() {
        if time_left <= ENTER_LOCKOUT_SECS {
            return EvalOutcome::Blocked(BlockCode::Lockout);
        }
    }

    let matched = strategies.iter().find_map(|strategy| {
        if !strategy.condition.eval(ctx) {
            return None;
        }
        strategy
            .rules
            .iter()
            .find(|rule| rule.action.outcome == outcome && rule.condition.eval(ctx))
            .map(|rule| (strategy, rule))
    });

    let Some((strategy, rule)) = matched else {
        return EvalOutcome::Blocked(BlockCode::NoEnter);
    };

    let Some(prices) = ctx.outcome_prices.get(outcome) else {
        return EvalOutcome::Blocked(BlockCode::MissingDataError);
    };
    let Some(buy_price) = prices.buy.filter(|p| !p.is_zero()) else {
        return EvalOutcome::Blocked(BlockCode::MissingDataError);
    };

    if active_buy_trade.is_some_and(|t| t.active) {
        return EvalOutcome::Blocked(BlockCode::NoEnter);
    }

    let Some(asset_id) = ctx.asset_for(outcome) else {
        return EvalOutcome::Blocked(BlockCode::MissingDataError);
    };

    EvalOutcome::Intent(OrderRequest {
        market_id: ctx.market_id.clone(),
        asset_id: asset_id.clone(),
        side: Side::Buy,
        price: buy_price,
        size: rule.action.size.max(ctx.order_min_size),
        tif: rule.action.time_in_force,
        order_type: rule.action.order_type,
        request_source: RequestSource::StrategyEnter,
        strategy: strategy.name.clone(),
        rule: rule.name.clone(),
        context: ctx.clone(),
        created_ts: now_ts,
    })
}

/// `should_exit`: stop-loss / take-profit evaluation against an active
/// entry-side trade record.
pub fn should_exit(
    ctx: &MarketContext,
    outcome: &str,
    active_enter_trade: Option<&TradeRecord>,
    action: &super::config::StrategyAction,
    now_ts: f64,
) -> EvalOutcome {
    if let Some(time_left) = ctx.time_left() {
        if time_left <= EXIT_LOCKOUT_SECS {
            return EvalOutcome::Blocked(BlockCode::Lockout);
        }
    }

    let Some(active) = active_enter_trade.filter(|t| t.active) else {
        return EvalOutcome::Blocked(BlockCode::NoExit);
    };

    let exit_side = active.side.opposite();
    let exit_size = active.matched_amount;

    let Some(prices) = ctx.outcome_prices.get(outcome) else {
        return EvalOutcome::Blocked(BlockCode::MissingDataError);
    };
    let current_price = match exit_side {
        Side::Buy => prices.buy,
        Side::Sell => prices.sell,
    };
    let Some(current_price) = current_price.filter(|p| !p.is_zero()) else {
        return EvalOutcome::Blocked(BlockCode::MissingDataError);
    };

    let entry_price = active.price;
    let one = Decimal::ONE;
    let half = Decimal::new(5, 1); // 0.5
    let cap = Decimal::new(99, 2); // 0.99

    let sl_trigger = if action.stop_loss >= one {
        (entry_price - action.stop_loss).max(half)
    } else {
        entry_price - action.stop_loss
    };
    let tp_trigger = (entry_price + action.take_profit).min(cap);

    let (request_source, order_type) = if current_price <= sl_trigger {
        if current_price < sl_trigger - action.slippage {
            return EvalOutcome::Blocked(BlockCode::Slippage);
        }
        (RequestSource::StopLoss, OrderType::Market)
    } else if current_price >= tp_trigger {
        (RequestSource::TakeProfit, OrderType::Market)
    } else {
        return EvalOutcome::Blocked(BlockCode::NoExit);
    };

    EvalOutcome::Intent(OrderRequest {
        market_id: ctx.market_id.clone(),
        asset_id: active.asset_id.clone(),
        side: exit_side,
        price: current_price,
        size: exit_size,
        tif: Tif::Gtc,
        order_type,
        request_source,
        strategy: String::new(),
        rule: String::new(),
        context: ctx.clone(),
        created_ts: now_ts,
    })
}

/// Trend gating applied after `should_enter`/`should_exit` produces a
/// candidate intent. Stop-loss and take-profit intents bypass the gate.
pub fn validate_request(
    candidate: OrderRequest,
    trend: Option<&TrendPrediction>,
    now_ts: f64,
) -> EvalOutcome {
    if matches!(
        candidate.request_source,
        RequestSource::StopLoss | RequestSource::TakeProfit
    ) {
        return EvalOutcome::Intent(candidate);
    }

    let Some(trend) = trend else {
        return EvalOutcome::Blocked(BlockCode::TrendFlat);
    };
    if trend.direction == Direction::Flat {
        return EvalOutcome::Blocked(BlockCode::TrendFlat);
    }
    if trend.reversal {
        if let Some(flipped_ts) = trend.flipped_ts {
            if now_ts - flipped_ts < REVERSAL_CONFIRMATION_SECS {
                return EvalOutcome::Blocked(BlockCode::TrendReversal);
            }
        }
    }
    let side_matches = match trend.direction {
        Direction::Up => candidate.side == Side::Buy,
        Direction::Down => candidate.side == Side::Sell,
        Direction::Flat => false,
    };
    if !side_matches {
        return EvalOutcome::Blocked(BlockCode::TrendMismatch);
    }
    EvalOutcome::Intent(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade_record::TraderSide;
    use crate::strategy::config::StrategyAction;
    use rust_decimal_macros::dec;

    fn action(stop_loss: Decimal, take_profit: Decimal, slippage: Decimal) -> StrategyAction {
        StrategyAction {
            side: Side::Sell,
            size: dec!(10),
            outcome: "Up".into(),
            slippage,
            stop_loss,
            take_profit,
            order_type: OrderType::Market,
            time_in_force: Tif::Gtc,
        }
    }

    fn trade(price: Decimal, matched: Decimal) -> TradeRecord {
        TradeRecord {
            market_id: crate::domain::ids::MarketId::from("m"),
            asset_id: crate::domain::ids::TokenId::from("a"),
            side: Side::Buy,
            order_id: "o1".into(),
            transaction_hash: None,
            matched_amount: matched,
            size: matched,
            price,
            fee_rate_bps: dec!(0),
            trader_side: TraderSide::Taker,
            status: crate::domain::trade_record::TradeStatus::Matched,
            active: true,
            raw: serde_json::json!({}),
            matched_ts: None,
            created_ts: 0.0,
            order_request_key: None,
        }
    }

    fn ctx_with_sell_price(price: Decimal) -> MarketContext {
        use std::collections::{HashMap, HashSet};
        let mut outcome_prices = HashMap::new();
        outcome_prices.insert(
            "Up".to_string(),
            crate::domain::context::SidePrices {
                buy: None,
                sell: Some(price),
            },
        );
        MarketContext {
            market_id: crate::domain::ids::MarketId::from("m"),
            slug: "s".into(),
            start_date: None,
            end_date: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
            liquidity: dec!(0),
            spread: dec!(0),
            outcomes: vec!["Up".into()],
            outcome_prices,
            outcome_assets: HashMap::new(),
            outcome_trends: HashMap::new(),
            tags: HashSet::new(),
            event_ts: chrono::Utc::now().timestamp() as f64,
            order_min_size: dec!(5),
        }
    }

    #[test]
    fn stop_loss_triggers_within_slippage() {
        let ctx = ctx_with_sell_price(dec!(0.74));
        let active = trade(dec!(0.85), dec!(10));
        let act = action(dec!(0.10), dec!(0.10), dec!(0.05));
        let out = should_exit(&ctx, "Up", Some(&active), &act, 0.0);
        match out {
            EvalOutcome::Intent(req) => {
                assert_eq!(req.request_source, RequestSource::StopLoss);
                assert_eq!(req.price, dec!(0.74));
            }
            other => panic!("expected intent, got {other:?}"),
        }
    }

    #[test]
    fn stop_loss_beyond_slippage_blocks() {
        let ctx = ctx_with_sell_price(dec!(0.69));
        let active = trade(dec!(0.85), dec!(10));
        let act = action(dec!(0.10), dec!(0.10), dec!(0.05));
        let out = should_exit(&ctx, "Up", Some(&active), &act, 0.0);
        assert!(matches!(out, EvalOutcome::Blocked(BlockCode::Slippage)));
    }

    #[test]
    fn take_profit_capped_at_99() {
        let ctx = ctx_with_sell_price(dec!(0.99));
        let active = trade(dec!(0.95), dec!(10));
        let act = action(dec!(0.10), dec!(0.10), dec!(0.05));
        let out = should_exit(&ctx, "Up", Some(&active), &act, 0.0);
        match out {
            EvalOutcome::Intent(req) => assert_eq!(req.request_source, RequestSource::TakeProfit),
            other => panic!("expected intent, got {other:?}"),
        }
    }

    #[test]
    fn stop_loss_sentinel_floors_trigger_at_half() {
        let ctx = ctx_with_sell_price(dec!(0.55));
        let active = trade(dec!(0.85), dec!(10));
        let act = action(dec!(1.0), dec!(0.10), dec!(0.50));
        let out = should_exit(&ctx, "Up", Some(&active), &act, 0.0);
        // sl_trigger floored at 0.5; 0.55 > 0.5 so no SL fires, falls through to no-exit or TP.
        assert!(matches!(out, EvalOutcome::Blocked(BlockCode::NoExit)));
    }

    #[test]
    fn trend_flat_blocks_non_exit_intents() {
        let ctx = ctx_with_sell_price(dec!(0.74));
        let req = OrderRequest {
            market_id: crate::domain::ids::MarketId::from("m"),
            asset_id: crate::domain::ids::TokenId::from("a"),
            side: Side::Buy,
            price: dec!(0.85),
            size: dec!(10),
            tif: Tif::Gtc,
            order_type: OrderType::Limit,
            request_source: RequestSource::StrategyEnter,
            strategy: "s".into(),
            rule: "r".into(),
            context: ctx,
            created_ts: 0.0,
        };
        let out = validate_request(req, None, 0.0);
        assert!(matches!(out, EvalOutcome::Blocked(BlockCode::TrendFlat)));
    }

    #[test]
    fn stop_loss_bypasses_trend_gate() {
        let ctx = ctx_with_sell_price(dec!(0.74));
        let req = OrderRequest {
            market_id: crate::domain::ids::MarketId::from("m"),
            asset_id: crate::domain::ids::TokenId::from("a"),
            side: Side::Sell,
            price: dec!(0.74),
            size: dec!(10),
            tif: Tif::Gtc,
            order_type: OrderType::Market,
            request_source: RequestSource::StopLoss,
            strategy: String::new(),
            rule: String::new(),
            context: ctx,
            created_ts: 0.0,
        };
        let out = validate_request(req, None, 0.0);
        assert!(matches!(out, EvalOutcome::Intent(_)));
    }
}
