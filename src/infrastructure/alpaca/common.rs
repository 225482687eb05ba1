use crate::domain::trading::types::Candle;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bar as returned by the v2 bars endpoint
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

/// One page of the multi-symbol bars response
#[derive(Debug, Deserialize)]
pub struct AlpacaBarPage {
    #[serde(default)]
    pub bars: Option<HashMap<String, Vec<AlpacaBar>>>,
    pub next_page_token: Option<String>,
}

impl AlpacaBar {
    pub fn to_candle(&self, symbol: &str, interval: &str) -> Result<Candle> {
        let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&self.timestamp)
            .with_context(|| format!("Invalid bar timestamp '{}'", self.timestamp))?
            .with_timezone(&Utc);

        Ok(Candle {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            timestamp,
            open: to_decimal(self.open, "open")?,
            high: to_decimal(self.high, "high")?,
            low: to_decimal(self.low, "low")?,
            close: to_decimal(self.close, "close")?,
            volume: to_decimal(self.volume, "volume")?,
        })
    }
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal> {
    Decimal::from_f64(value).with_context(|| format!("Bar {} is not a finite number: {}", field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_bar_page() {
        let body = r#"{
            "bars": {"AAPL": [{"t": "2024-01-02T05:00:00Z", "o": 187.15, "h": 188.44, "l": 183.89, "c": 185.64, "v": 82488700}]},
            "next_page_token": null
        }"#;
        let page: AlpacaBarPage = serde_json::from_str(body).unwrap();
        assert!(page.next_page_token.is_none());

        let bars = page.bars.unwrap();
        let candle = bars["AAPL"][0].to_candle("AAPL", "1Day").unwrap();
        assert_eq!(candle.close, dec!(185.64));
        assert_eq!(candle.timestamp.to_rfc3339(), "2024-01-02T05:00:00+00:00");
    }

    #[test]
    fn test_empty_page_has_null_bars() {
        let page: AlpacaBarPage =
            serde_json::from_str(r#"{"bars": null, "next_page_token": null}"#).unwrap();
        assert!(page.bars.is_none());
    }
}
