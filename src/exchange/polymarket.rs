//! Polymarket CLOB/Gamma HTTP client implementing the `Client` trait,
//! with every call wrapped by the retry+timeout policy.

use super::retry::retryable;
use super::{
    CancelResult, Client, ExchangeMarket, ExchangeOrder, OrderBookSnapshot, PlaceOrderArgs,
    PlaceOrderResult, Position,
};
use crate::domain::ids::{MarketId, TokenId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::debug;

pub struct PolymarketClient {
    http: HttpClient,
    clob_url: String,
    gamma_url: String,
    wallet_address: String,
}

impl PolymarketClient {
    #[must_use]
    pub fn new(clob_url: String, gamma_url: String, wallet_address: String) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            clob_url,
            gamma_url,
            wallet_address,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.http.get(url).send().await?;
        let resp = resp.error_for_status()?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl Client for PolymarketClient {
    async fn get_market(&self, market_id: &MarketId) -> Result<ExchangeMarket> {
        let url = format!("{}/markets/{}", self.gamma_url, market_id);
        retryable(|| async {
            debug!(%market_id, "fetching market");
            self.get_json(&url).await
        })
        .await
    }

    async fn get_orders(
        &self,
        market_id: Option<&MarketId>,
        asset_id: Option<&TokenId>,
    ) -> Result<Vec<ExchangeOrder>> {
        let mut url = format!("{}/orders", self.clob_url);
        let mut query = vec![];
        if let Some(m) = market_id {
            query.push(format!("market={m}"));
        }
        if let Some(a) = asset_id {
            query.push(format!("asset_id={a}"));
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        retryable(|| self.get_json(&url)).await
    }

    async fn get_order(&self, order_id: &str) -> Result<ExchangeOrder> {
        let url = format!("{}/orders/{order_id}", self.clob_url);
        retryable(|| self.get_json(&url)).await
    }

    async fn get_order_book(&self, asset_id: &TokenId) -> Result<OrderBookSnapshot> {
        let url = format!("{}/book?token_id={asset_id}", self.clob_url);
        retryable(|| self.get_json(&url)).await
    }

    async fn create_market_order(&self, args: PlaceOrderArgs) -> Result<PlaceOrderResult> {
        self.post_order(&args, "market").await
    }

    async fn create_limit_order(&self, args: PlaceOrderArgs) -> Result<PlaceOrderResult> {
        self.post_order(&args, "limit").await
    }

    async fn cancel(&self, order_id: &str) -> Result<CancelResult> {
        let url = format!("{}/order/{order_id}", self.clob_url);
        retryable(|| async {
            let resp = self.http.delete(&url).send().await?;
            let resp = resp.error_for_status()?;
            Ok(resp.json::<CancelResult>().await?)
        })
        .await
    }

    async fn redeem(&self, market_id: &MarketId, asset_id: &TokenId) -> Result<CancelResult> {
        let url = format!("{}/markets/{market_id}/redeem", self.gamma_url);
        retryable(|| async {
            let resp = self
                .http
                .post(&url)
                .json(&serde_json::json!({"asset_id": asset_id.as_str()}))
                .send()
                .await?;
            let resp = resp.error_for_status()?;
            Ok(resp.json::<CancelResult>().await?)
        })
        .await
    }

    async fn wallet_address(&self) -> Result<String> {
        Ok(self.wallet_address.clone())
    }

    async fn wallet_balance(&self) -> Result<Decimal> {
        let url = format!("{}/balance?address={}", self.gamma_url, self.wallet_address);
        #[derive(serde::Deserialize)]
        struct BalanceResponse {
            balance: Decimal,
        }
        let resp: BalanceResponse = retryable(|| self.get_json(&url)).await?;
        Ok(resp.balance)
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        let url = format!(
            "{}/positions?address={}",
            self.gamma_url, self.wallet_address
        );
        retryable(|| self.get_json(&url)).await
    }

    async fn is_market_resolved(&self, market_id: &MarketId) -> Result<bool> {
        let url = format!("{}/markets/{}/resolved", self.gamma_url, market_id);
        #[derive(serde::Deserialize)]
        struct ResolvedResponse {
            resolved: bool,
        }
        let resp: ResolvedResponse = retryable(|| self.get_json(&url)).await?;
        Ok(resp.resolved)
    }

    async fn list_active_markets(
        &self,
        end_before: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ExchangeMarket>> {
        let url = format!(
            "{}/markets?active=true&closed=false&archived=false&end_date_max={}",
            self.gamma_url,
            end_before.to_rfc3339(),
        );
        retryable(|| self.get_json(&url)).await
    }
}

impl PolymarketClient {
    async fn post_order(&self, args: &PlaceOrderArgs, kind: &str) -> Result<PlaceOrderResult> {
        let url = format!("{}/order", self.clob_url);
        let body = serde_json::json!({
            "market": args.market_id.as_str(),
            "asset_id": args.asset_id.as_str(),
            "side": args.side.as_str(),
            "price": args.price,
            "size": args.size,
            "order_type": kind,
            "tif": format!("{:?}", args.tif),
        });
        retryable(|| async {
            let resp = self.http.post(&url).json(&body).send().await?;
            let resp = resp.error_for_status().map_err(Error::Http)?;
            Ok(resp.json::<PlaceOrderResult>().await?)
        })
        .await
    }
}
