pub mod config;
pub mod evaluator;
pub mod predicate;

pub use config::{Rule, Strategy, StrategyAction};
pub use evaluator::{BlockCode, EvalOutcome};
pub use predicate::Predicate;

use crate::domain::context::MarketContext;
use crate::domain::ids::Side;
use crate::store::{OrderRequestStore, TradeRecordStore};

/// Per-outcome entry point tying the case analysis from §4.5 together:
/// BUY intent present with no SELL intent in flight runs `should_exit`;
/// neither present runs `should_enter`; otherwise the outcome is skipped
/// (a close is already in flight).
pub fn evaluate_outcome(
    ctx: &MarketContext,
    outcome: &str,
    strategies: &[Strategy],
    order_store: &OrderRequestStore,
    trade_store: &TradeRecordStore,
    now_ts: f64,
) -> Option<EvalOutcome> {
    let asset_id = ctx.asset_for(outcome)?;

    let buy_intent = order_store
        .get(&ctx.market_id, asset_id, Side::Buy)
        .ok()
        .flatten();
    let sell_intent = order_store
        .get(&ctx.market_id, asset_id, Side::Sell)
        .ok()
        .flatten();

    let candidate = match (buy_intent.is_some(), sell_intent.is_some()) {
        (true, false) => {
            let active = trade_store
                .get_active(&ctx.market_id, Some(asset_id), Some(Side::Buy))
                .ok()
                .flatten();
            // Any rule whose action targets this outcome supplies the exit
            // parameters (stop-loss/take-profit/slippage); use the first
            // strategy's matching rule if present, else fall back to a
            // neutral (non-triggering) action.
            let action = strategies
                .iter()
                .flat_map(|s| s.rules.iter())
                .find(|r| r.action.outcome == outcome)
                .map(|r| r.action.clone())?;
            evaluator::should_exit(ctx, outcome, active.as_ref(), &action, now_ts)
        }
        (false, false) => {
            let active = trade_store
                .get_active(&ctx.market_id, Some(asset_id), Some(Side::Buy))
                .ok()
                .flatten();
            evaluator::should_enter(ctx, outcome, strategies, active.as_ref(), now_ts)
        }
        _ => return None,
    };

    let trend = ctx.trend_for(outcome);
    let gated = match candidate {
        EvalOutcome::Intent(req) => evaluator::validate_request(req, trend, now_ts),
        blocked => blocked,
    };
    Some(gated)
}
