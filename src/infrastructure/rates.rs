//! # Price Feed
//!
//! Fetches currency, commodity and crypto quotes from three public sources in parallel
//! and serves a formatted report from a cache. A refresh round starts when the cache
//! is older than the configured interval; sources that fail keep their previous values.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::config::RatesConfig;
use crate::domain::traits::PriceFeed;

const MOEX_URL: &str = "http://iss.moex.com/iss/engines/currency/markets/selt/boards/CETS/securities.json?iss.meta=off&iss.only=marketdata&securities=CNYRUB_TOM,EUR_RUB__TOM,GBPRUB_TOM,USD000UTSTOM&marketdata.columns=LAST,CHANGE";
const BRENT_URL: &str =
    "http://sbcharts.investing.com/charts_xml/jschart_sideblock_8833_area.json";
const BITFINEX_URL: &str = "https://api.bitfinex.com/v2/tickers?symbols=tBTCUSD,tLTCUSD,tETHUSD,tBCHUSD";

/// Report layout: one block per group, in this order.
pub const TICKER_GROUPS: [&[&str]; 3] = [
    &["Euro", "USD", "GBP", "CNY"],
    &["Brent"],
    &["Bitcoin", "Litecoin", "Ethereum", "Bitcoin Cash"],
];

/// MOEX returns securities sorted by their code.
const MOEX_TICKERS: [&str; 4] = ["CNY", "Euro", "GBP", "USD"];
const BITFINEX_TICKERS: [&str; 4] = ["Bitcoin", "Litecoin", "Ethereum", "Bitcoin Cash"];

#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub ticker: &'static str,
    pub current: f64,
    /// Previous close; zero when unknown.
    pub prev: f64,
    pub currency: &'static str,
}

#[derive(Debug, Deserialize)]
struct MoexResponse {
    marketdata: MoexMarketData,
}

#[derive(Debug, Deserialize)]
struct MoexMarketData {
    data: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct BrentResponse {
    attr: BrentAttr,
}

#[derive(Debug, Deserialize)]
struct BrentAttr {
    last_value: f64,
    last_close_value: f64,
}

pub fn parse_moex(body: &str) -> Result<Vec<Price>> {
    let response: MoexResponse = serde_json::from_str(body).context("MOEX payload")?;
    MOEX_TICKERS
        .iter()
        .enumerate()
        .map(|(i, ticker)| {
            let row = response
                .marketdata
                .data
                .get(i)
                .ok_or_else(|| anyhow!("MOEX payload has no row for {ticker}"))?;
            let last = row.first().copied().flatten().unwrap_or_default();
            let change = row.get(1).copied().flatten().unwrap_or_default();
            Ok(Price {
                ticker,
                current: last,
                prev: last - change,
                currency: "₽",
            })
        })
        .collect()
}

pub fn parse_brent(body: &str) -> Result<Vec<Price>> {
    let response: BrentResponse = serde_json::from_str(body).context("Brent payload")?;
    Ok(vec![Price {
        ticker: "Brent",
        current: response.attr.last_value,
        prev: response.attr.last_close_value,
        currency: "$",
    }])
}

pub fn parse_bitfinex(body: &str) -> Result<Vec<Price>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body).context("Bitfinex payload")?;
    BITFINEX_TICKERS
        .iter()
        .enumerate()
        .map(|(i, ticker)| {
            let field = |index: usize| {
                rows.get(i)
                    .and_then(|row| row.get(index))
                    .and_then(Value::as_f64)
                    .ok_or_else(|| anyhow!("Bitfinex payload has no field {index} for {ticker}"))
            };
            let last = field(7)?;
            let change = field(5)?;
            Ok(Price {
                ticker,
                current: last,
                prev: last - change,
                currency: "$",
            })
        })
        .collect()
}

/// Formats cached prices, group by group.
pub fn format_report(values: &HashMap<&'static str, Price>) -> String {
    let mut out = String::new();
    for group in TICKER_GROUPS {
        for ticker in group {
            let (current, prev, currency) = values
                .get(ticker)
                .map(|p| (p.current, p.prev, p.currency))
                .unwrap_or((0.0, 0.0, ""));
            out.push_str(&format!("<b>{ticker}</b>: {current:.2}{currency}"));
            if prev != 0.0 {
                let change = current - prev;
                if change >= 0.0 {
                    out.push_str(&format!(" : (📈 +{change:.2}{currency})"));
                } else {
                    out.push_str(&format!(" : (📉 {change:.2}{currency})"));
                }
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

struct RatesCache {
    next_update: Option<Instant>,
    values: HashMap<&'static str, Price>,
}

pub struct RatesService {
    client: Client,
    refresh: Duration,
    cache: Mutex<RatesCache>,
}

impl RatesService {
    pub fn new(config: &RatesConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            refresh: Duration::from_secs(config.refresh_seconds),
            cache: Mutex::new(RatesCache {
                next_update: None,
                values: HashMap::new(),
            }),
        })
    }

    async fn fetch(&self, source: &str, url: &str, parse: fn(&str) -> Result<Vec<Price>>) -> Vec<Price> {
        let body = async {
            self.client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        match body.await {
            Ok(body) => match parse(&body) {
                Ok(prices) => prices,
                Err(e) => {
                    tracing::warn!("Can't parse {} rates: {:#}", source, e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("Can't fetch {} rates: {}", source, e);
                Vec::new()
            }
        }
    }

    async fn refresh(&self, cache: &mut RatesCache) {
        let now = Instant::now();
        if cache.next_update.is_some_and(|next| now < next) {
            return;
        }
        cache.next_update = Some(now + self.refresh);

        let (moex, brent, crypto) = futures::join!(
            self.fetch("MOEX", MOEX_URL, parse_moex),
            self.fetch("Brent", BRENT_URL, parse_brent),
            self.fetch("Bitfinex", BITFINEX_URL, parse_bitfinex),
        );
        for price in moex.into_iter().chain(brent).chain(crypto) {
            cache.values.insert(price.ticker, price);
        }
    }
}

#[async_trait]
impl PriceFeed for RatesService {
    async fn report(&self) -> String {
        let mut cache = self.cache.lock().await;
        self.refresh(&mut cache).await;
        format_report(&cache.values)
    }
}
