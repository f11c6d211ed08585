use super::ids::{MarketId, Side, TokenId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Live,
    Matched,
    Cancelled,
    Failed,
    Redeemed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraderSide {
    Maker,
    Taker,
}

/// Keyed by `(market_id, asset_id, side, order_id)`. At most one `active`
/// record per `(market_id, asset_id, side)` — opening one on side X
/// implicitly deactivates the opposite side's active record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub market_id: MarketId,
    pub asset_id: TokenId,
    pub side: Side,
    pub order_id: String,
    pub transaction_hash: Option<String>,
    pub matched_amount: Decimal,
    pub size: Decimal,
    pub price: Decimal,
    pub fee_rate_bps: Decimal,
    pub trader_side: TraderSide,
    pub status: TradeStatus,
    pub active: bool,
    pub raw: serde_json::Value,
    pub matched_ts: Option<f64>,
    pub created_ts: f64,
    /// Foreign key into the order request store, looked up on demand rather
    /// than storing a deep clone of the originating request.
    pub order_request_key: Option<String>,
}

impl TradeRecord {
    #[must_use]
    pub fn set_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.market_id, self.asset_id, self.side, self.order_id
        )
    }

    /// Merge a new fill observation into this record.
    ///
    /// `matched_amount` only updates when the incoming value is non-zero —
    /// a zero `size_matched` preserves the prior matched amount. `matched_ts`
    /// only bumps when that update actually changes `matched_amount`; a
    /// repeated fill with the same matched amount keeps the original ts.
    pub fn merge_fill(
        &mut self,
        matched_amount: Decimal,
        status: TradeStatus,
        price: Decimal,
        size: Decimal,
        trader_side: TraderSide,
        matched_ts: f64,
    ) {
        let amount_changed =
            matched_amount != Decimal::ZERO && matched_amount != self.matched_amount;
        if matched_amount != Decimal::ZERO {
            self.matched_amount = matched_amount;
        }
        self.status = status;
        self.price = price;
        self.size = size;
        self.trader_side = trader_side;
        if amount_changed {
            self.matched_ts = Some(matched_ts);
        }
        if matches!(status, TradeStatus::Failed) {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> TradeRecord {
        TradeRecord {
            market_id: MarketId::from("m1"),
            asset_id: TokenId::from("a1"),
            side: Side::Buy,
            order_id: "o1".into(),
            transaction_hash: None,
            matched_amount: dec!(10),
            size: dec!(10),
            price: dec!(0.6),
            fee_rate_bps: dec!(0),
            trader_side: TraderSide::Taker,
            status: TradeStatus::Live,
            active: true,
            raw: serde_json::json!({}),
            matched_ts: None,
            created_ts: 0.0,
            order_request_key: None,
        }
    }

    #[test]
    fn zero_matched_amount_preserves_prior_value() {
        let mut rec = sample();
        rec.merge_fill(
            dec!(0),
            TradeStatus::Matched,
            dec!(0.61),
            dec!(10),
            TraderSide::Taker,
            5.0,
        );
        assert_eq!(rec.matched_amount, dec!(10));
        assert_eq!(rec.status, TradeStatus::Matched);
    }

    #[test]
    fn repeated_same_matched_amount_preserves_matched_ts() {
        let mut rec = sample();
        rec.matched_ts = Some(1.0);
        rec.merge_fill(
            dec!(10),
            TradeStatus::Matched,
            dec!(0.61),
            dec!(10),
            TraderSide::Maker,
            2.0,
        );
        assert_eq!(rec.matched_ts, Some(1.0));
    }

    #[test]
    fn changed_matched_amount_bumps_matched_ts() {
        let mut rec = sample();
        rec.matched_ts = Some(1.0);
        rec.merge_fill(
            dec!(15),
            TradeStatus::Matched,
            dec!(0.61),
            dec!(15),
            TraderSide::Maker,
            2.0,
        );
        assert_eq!(rec.matched_ts, Some(2.0));
    }

    #[test]
    fn nonzero_matched_amount_updates() {
        let mut rec = sample();
        rec.merge_fill(
            dec!(15),
            TradeStatus::Matched,
            dec!(0.61),
            dec!(15),
            TraderSide::Taker,
            5.0,
        );
        assert_eq!(rec.matched_amount, dec!(15));
    }

    #[test]
    fn failed_status_forces_inactive() {
        let mut rec = sample();
        rec.merge_fill(
            dec!(0),
            TradeStatus::Failed,
            dec!(0.6),
            dec!(10),
            TraderSide::Taker,
            5.0,
        );
        assert!(!rec.active);
    }
}
