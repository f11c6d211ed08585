//! Resolution service (C11): periodic housekeeping against markets that
//! have already ended — cancelling orders left open too long, and
//! redeeming positions once the market is confirmed resolved.

use crate::domain::ids::MarketId;
use crate::error::Result;
use crate::exchange::{Client, ExchangeMarket};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// An order left `LIVE` past its ended+resolved market is abandoned rather
/// than genuinely still working; cancel it after this many seconds.
pub const STALE_ORDER_SECONDS: f64 = 300.0;
/// No new entries/exits within this many seconds of a market's end.
pub const RESOLUTION_BUFFER_SECONDS: f64 = 10.0;

#[derive(Debug, Default, Clone)]
pub struct CancelStaleOrdersReport {
    pub cancelled: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone)]
pub struct RedeemPositionsReport {
    pub redeemed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

fn market_has_ended(market: &ExchangeMarket, now_ts: f64) -> bool {
    market
        .end_date
        .is_some_and(|end| (end.timestamp() as f64) <= now_ts)
}

pub struct ResolutionService {
    exchange: Arc<dyn Client>,
}

impl ResolutionService {
    #[must_use]
    pub fn new(exchange: Arc<dyn Client>) -> Self {
        Self { exchange }
    }

    async fn get_market_cached<'a>(
        &self,
        market_id: &MarketId,
        cache: &'a mut HashMap<MarketId, ExchangeMarket>,
    ) -> Result<&'a ExchangeMarket> {
        if !cache.contains_key(market_id) {
            let market = self.exchange.get_market(market_id).await?;
            cache.insert(market_id.clone(), market);
        }
        Ok(cache.get(market_id).expect("just inserted"))
    }

    /// Cancels every `LIVE` order whose market has both ended and resolved,
    /// and which has sat open for at least `STALE_ORDER_SECONDS`.
    pub async fn cancel_stale_orders(&self, now_ts: f64) -> CancelStaleOrdersReport {
        let mut report = CancelStaleOrdersReport::default();
        let mut cache = HashMap::new();

        let orders = match self.exchange.get_orders(None, None).await {
            Ok(orders) => orders,
            Err(err) => {
                warn!(error = %err, "cancel_stale_orders: failed to list orders");
                return report;
            }
        };

        for order in orders {
            if order.status.to_uppercase() != "LIVE" {
                continue;
            }
            let market = match self.get_market_cached(&order.market_id, &mut cache).await {
                Ok(m) => m,
                Err(err) => {
                    report.failed.push((order.id.clone(), err.to_string()));
                    continue;
                }
            };
            let resolved = match self.exchange.is_market_resolved(&order.market_id).await {
                Ok(r) => r,
                Err(err) => {
                    report.failed.push((order.id.clone(), err.to_string()));
                    continue;
                }
            };
            if !market_has_ended(market, now_ts) || !resolved {
                continue;
            }

            let age = now_ts - order.created_at;
            if age < STALE_ORDER_SECONDS {
                continue;
            }

            match self.exchange.cancel(&order.id).await {
                Ok(_) => {
                    info!(order_id = %order.id, "cancelled stale order");
                    report.cancelled.push(order.id);
                }
                Err(err) => report.failed.push((order.id, err.to_string())),
            }
        }
        report
    }

    /// Redeems every open position whose market has ended and resolved.
    pub async fn redeem_resolved_positions(&self, now_ts: f64) -> RedeemPositionsReport {
        let mut report = RedeemPositionsReport::default();
        let mut cache = HashMap::new();

        let positions = match self.exchange.get_positions().await {
            Ok(positions) => positions,
            Err(err) => {
                warn!(error = %err, "redeem_resolved_positions: failed to list positions");
                return report;
            }
        };

        for position in positions {
            let market = match self
                .get_market_cached(&position.market_id, &mut cache)
                .await
            {
                Ok(m) => m,
                Err(err) => {
                    report
                        .failed
                        .push((position.condition_id.clone(), err.to_string()));
                    continue;
                }
            };
            let resolved = match self.exchange.is_market_resolved(&position.market_id).await {
                Ok(r) => r,
                Err(err) => {
                    report
                        .failed
                        .push((position.condition_id.clone(), err.to_string()));
                    continue;
                }
            };
            if !market_has_ended(market, now_ts) || !resolved {
                continue;
            }

            match self
                .exchange
                .redeem(&position.market_id, &position.asset_id)
                .await
            {
                Ok(_) => {
                    info!(condition_id = %position.condition_id, "redeemed resolved position");
                    report.redeemed.push(position.condition_id);
                }
                Err(err) => report.failed.push((position.condition_id, err.to_string())),
            }
        }
        report
    }
}
