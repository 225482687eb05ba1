use super::common::AlpacaBarPage;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSource;
use crate::domain::trading::types::Candle;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tracing::{debug, error, info};

/// Max bars per page accepted by the bars endpoint
const PAGE_LIMIT: &str = "10000";

/// Historical bars from the Alpaca data API (IEX feed)
pub struct AlpacaCandleSource {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    data_base_url: String,
}

impl AlpacaCandleSource {
    pub fn new(api_key: String, api_secret: String, data_base_url: String, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout),
            api_key,
            api_secret,
            data_base_url: data_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[async_trait]
impl CandleSource for AlpacaCandleSource {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>> {
        if !self.has_credentials() {
            anyhow::bail!("Alpaca credentials are not configured");
        }

        let start_dt = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
        let end_dt = Utc.from_utc_datetime(
            &end.and_hms_opt(23, 59, 59)
                .context("Invalid end date")?,
        );
        let url = format!("{}/v2/stocks/bars", self.data_base_url);

        let mut candles = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("symbols", symbol.to_string()),
                ("start", start_dt.to_rfc3339()),
                ("end", end_dt.to_rfc3339()),
                ("timeframe", interval.label().to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("feed", "iex".to_string()),
            ];
            if let Some(token) = &page_token {
                query_params.push(("page_token", token.clone()));
            }

            debug!(
                "AlpacaCandleSource: fetching {} {} bars {} -> {} (page {:?})",
                symbol,
                interval.label(),
                start,
                end,
                page_token
            );

            let response = self
                .client
                .get(build_url_with_query(&url, &query_params))
                .header("APCA-API-KEY-ID", &self.api_key)
                .header("APCA-API-SECRET-KEY", &self.api_secret)
                .send()
                .await
                .context("Failed to fetch bars from Alpaca")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "AlpacaCandleSource: API error {} for {}: {}",
                    status, symbol, error_text
                );
                anyhow::bail!("Alpaca API error ({}): {}", status, error_text);
            }

            let page: AlpacaBarPage = response
                .json()
                .await
                .context("Failed to parse bars response")?;

            if let Some(bars) = page.bars.as_ref().and_then(|b| b.get(symbol)) {
                for bar in bars {
                    candles.push(bar.to_candle(symbol, interval.label())?);
                }
            }

            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        info!(
            "AlpacaCandleSource: fetched {} bars for {}",
            candles.len(),
            symbol
        );
        Ok(candles)
    }

    fn name(&self) -> &str {
        "alpaca"
    }
}
