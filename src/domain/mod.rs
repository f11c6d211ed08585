//! Pure domain types: market/asset identifiers, price book, trend state,
//! market context, order/trade records, notifications.

pub mod context;
pub mod ids;
pub mod market_meta;
pub mod notification;
pub mod order_request;
pub mod price_book;
pub mod slug;
pub mod trade_record;
pub mod trend;

pub use context::MarketContext;
pub use ids::{MarketId, Side, TokenId};
pub use market_meta::MarketMeta;
pub use notification::{Notification, Severity};
pub use order_request::{OrderType, RequestSource, Tif};
pub use price_book::{PriceBook, PriceLevels};
pub use slug::SlugSet;
pub use trade_record::{TradeRecord, TradeStatus, TraderSide};
pub use trend::{Direction, TrendPrediction};
