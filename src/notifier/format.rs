//! One function per notification kind, in the teacher's
//! escape-then-template style.

use crate::domain::ids::Side;
use crate::domain::order_request::RequestSource;
use crate::domain::trade_record::TradeRecord;
use rust_decimal::Decimal;

fn escape_markdown(s: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[must_use]
pub fn place_order_message(
    slug: &str,
    outcome: &str,
    side: Side,
    price: Decimal,
    size: Decimal,
) -> String {
    format!(
        "📥 *Order Placed*\n\n📋 {}\n🎯 {} {}\n💵 `{price}` x `{size}`",
        escape_markdown(slug),
        side,
        escape_markdown(outcome),
    )
}

#[must_use]
pub fn cancel_order_message(slug: &str, order_id: &str, reason: &str) -> String {
    format!(
        "🚫 *Order Cancelled*\n\n📋 {}\n🆔 `{}`\n📝 {}",
        escape_markdown(slug),
        escape_markdown(order_id),
        escape_markdown(reason),
    )
}

#[must_use]
pub fn close_position_message(slug: &str, outcome: &str, rec: &TradeRecord) -> String {
    format!(
        "📤 *Position Closed*\n\n📋 {}\n🎯 {}\n💵 `{}` matched `{}`",
        escape_markdown(slug),
        escape_markdown(outcome),
        rec.price,
        rec.matched_amount,
    )
}

#[must_use]
pub fn exit_message(slug: &str, outcome: &str, source: RequestSource, price: Decimal) -> String {
    let reason = match source {
        RequestSource::StopLoss => "stop-loss",
        RequestSource::TakeProfit => "take-profit",
        RequestSource::StrategyExit => "strategy exit",
        RequestSource::StrategyEnter => "entry",
        RequestSource::ApiCall => "manual",
    };
    format!(
        "🚪 *Exiting Position*\n\n📋 {}\n🎯 {}\n📝 {}\n💵 `{price}`",
        escape_markdown(slug),
        escape_markdown(outcome),
        reason,
    )
}

#[must_use]
pub fn trend_reversal_message(slug: &str, outcome: &str, from: &str, to: &str) -> String {
    format!(
        "🔁 *Trend Reversal*\n\n📋 {}\n🎯 {}\n{} → {}",
        escape_markdown(slug),
        escape_markdown(outcome),
        from,
        to,
    )
}
