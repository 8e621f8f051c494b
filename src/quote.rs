/*
 *  quote.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Price fields and close history from the Yahoo Finance v8 chart endpoint
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::http::{build_client, send_with_retries};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const MAX_RETRIES: u8 = 3;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("no data for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("quote provider answered {status} for {symbol}")]
    Status { symbol: String, status: u16 },
}

impl QuoteError {
    fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        QuoteError::DataUnavailable { symbol: symbol.to_string(), reason: reason.into() }
    }
}

/// Latest fields for one ticker, one refresh worth.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRecord {
    pub symbol: String,
    pub full_name: String,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub latest_price: f64,
    /// latest - previous close, 2 dp
    pub change: f64,
    /// change / previous close * 100, 2 dp
    pub percent_change: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl SymbolRecord {
    /// Build a record, deriving the change fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: &str,
        full_name: &str,
        previous_close: f64,
        open: f64,
        high: f64,
        low: f64,
        volume: u64,
        latest_price: f64,
    ) -> Self {
        let change = latest_price - previous_close;
        let percent_change = if previous_close != 0.0 { change / previous_close * 100.0 } else { 0.0 };
        Self {
            symbol: symbol.to_string(),
            full_name: full_name.to_string(),
            previous_close,
            open,
            high,
            low,
            volume,
            latest_price,
            change: round2(change),
            percent_change: round2(percent_change),
        }
    }

    fn is_finite(&self) -> bool {
        [self.previous_close, self.open, self.high, self.low, self.latest_price, self.change, self.percent_change]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// One daily close for the trend chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Market data provider.
#[allow(async_fn_in_trait)]
pub trait StockSource {
    /// Current price fields for a ticker.
    async fn fetch_quote(&self, symbol: &str) -> Result<SymbolRecord, QuoteError>;

    /// Daily closes with `start <= date < end`, oldest first.
    async fn fetch_closes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<ClosePoint>, QuoteError>;

    /// True when the provider knows this exact ticker.
    async fn symbol_exists(&self, symbol: &str) -> Result<bool, QuoteError>;
}

// Yahoo v8 chart response structures
#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartData {
    #[serde(default)]
    pub result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    pub error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartResult {
    pub meta: YahooChartMeta,
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    #[serde(default)]
    pub indicators: Option<YahooChartIndicators>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub regular_market_day_high: Option<f64>,
    #[serde(default)]
    pub regular_market_day_low: Option<f64>,
    #[serde(default)]
    pub regular_market_volume: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChartIndicators {
    #[serde(default)]
    pub quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YahooChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

/// One daily session. Today's close is null until the session settles.
#[derive(Debug, Clone, Copy)]
struct Bar {
    ts: i64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
}

impl YahooChartResult {
    fn quote(&self) -> Option<&YahooChartQuote> {
        self.indicators.as_ref().and_then(|i| i.quote.first())
    }

    /// Every timestamped session, oldest first.
    fn bars(&self) -> Vec<Bar> {
        let (Some(ts), Some(q)) = (self.timestamp.as_ref(), self.quote()) else {
            return Vec::new();
        };
        let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();
        ts.iter()
            .enumerate()
            .map(|(i, &t)| Bar {
                ts: t,
                open: at(&q.open, i),
                high: at(&q.high, i),
                low: at(&q.low, i),
                close: at(&q.close, i),
                volume: q.volume.get(i).copied().flatten(),
            })
            .collect()
    }

    /// Closes keyed by UTC date.
    pub fn closes(&self) -> Vec<ClosePoint> {
        self.bars()
            .into_iter()
            .filter_map(|b| {
                let close = b.close.filter(|c| c.is_finite())?;
                DateTime::<Utc>::from_timestamp(b.ts, 0).map(|dt| ClosePoint { date: dt.date_naive(), close })
            })
            .collect()
    }
}

/// Pull the single result out of a chart body.
pub fn parse_chart(body: &str, symbol: &str) -> Result<YahooChartResult, QuoteError> {
    let resp: YahooChartResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.chart.error {
        return Err(QuoteError::unavailable(symbol, format!("{}: {}", err.code, err.description)));
    }
    resp.chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| QuoteError::unavailable(symbol, "empty chart result"))
}

impl SymbolRecord {
    /// Derive the record from a short daily chart (a few sessions).
    ///
    /// Today's open/high/low/volume come from the latest session whether or
    /// not it has closed. Previous close is the last settled close before it.
    pub fn from_chart(symbol: &str, chart: &YahooChartResult) -> Result<Self, QuoteError> {
        let meta = &chart.meta;
        let bars = chart.bars();
        let (today, earlier) = match bars.split_last() {
            Some((last, rest)) => (Some(last), rest),
            None => (None, &[][..]),
        };

        let latest = meta
            .regular_market_price
            .or_else(|| today.and_then(|b| b.close))
            .ok_or_else(|| QuoteError::unavailable(symbol, "no market price"))?;
        let previous_close = earlier
            .iter()
            .rev()
            .find_map(|b| b.close)
            .or(meta.previous_close)
            .or(meta.chart_previous_close)
            .ok_or_else(|| QuoteError::unavailable(symbol, "no previous close"))?;

        let name = meta
            .long_name
            .as_deref()
            .or(meta.short_name.as_deref())
            .unwrap_or(symbol);

        let record = SymbolRecord::new(
            symbol,
            name,
            previous_close,
            today.and_then(|b| b.open).unwrap_or(latest),
            today.and_then(|b| b.high).or(meta.regular_market_day_high).unwrap_or(latest),
            today.and_then(|b| b.low).or(meta.regular_market_day_low).unwrap_or(latest),
            today.and_then(|b| b.volume).or(meta.regular_market_volume).unwrap_or(0),
            latest,
        );
        if !record.is_finite() {
            return Err(QuoteError::unavailable(symbol, "non-finite price field"));
        }
        Ok(record)
    }
}

/// Yahoo Finance chart client.
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self, QuoteError> {
        Ok(Self { client: build_client()?, base_url: CHART_URL.to_string() })
    }

    async fn chart<T: serde::Serialize + ?Sized>(&self, symbol: &str, params: &T) -> Result<YahooChartResult, QuoteError> {
        let url = format!("{}/{}", self.base_url, symbol);
        let fetched = send_with_retries(&self.client, &url, params, MAX_RETRIES).await?;
        if fetched.status == 404 {
            return Err(QuoteError::unavailable(symbol, "unknown symbol"));
        }
        if !fetched.is_success() {
            return Err(QuoteError::Status { symbol: symbol.to_string(), status: fetched.status });
        }
        parse_chart(&fetched.body, symbol)
    }
}

impl StockSource for YahooClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<SymbolRecord, QuoteError> {
        let chart = self.chart(symbol, &[("range", "5d"), ("interval", "1d")]).await?;
        let record = SymbolRecord::from_chart(symbol, &chart)?;
        info!("Retrieved stock data for {}", symbol);
        debug!("{:?}", record);
        Ok(record)
    }

    async fn fetch_closes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<ClosePoint>, QuoteError> {
        let epoch = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp());
        let params = [
            ("period1", epoch(start).to_string()),
            ("period2", epoch(end).to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.chart(symbol, &params).await?;
        let closes: Vec<ClosePoint> = chart.closes().into_iter().filter(|c| c.date >= start && c.date < end).collect();
        if closes.is_empty() {
            return Err(QuoteError::unavailable(symbol, format!("no closes between {start} and {end}")));
        }
        Ok(closes)
    }

    async fn symbol_exists(&self, symbol: &str) -> Result<bool, QuoteError> {
        match self.chart(symbol, &[("range", "1d"), ("interval", "1d")]).await {
            Ok(chart) => Ok(chart.meta.symbol.eq_ignore_ascii_case(symbol)),
            // 404 or a chart error body
            Err(QuoteError::DataUnavailable { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AAPL: &str = r#"{"chart":{"result":[{
        "meta":{"symbol":"AAPL","longName":"Apple Inc.","shortName":"Apple","regularMarketPrice":189.5,
                "chartPreviousClose":180.0,"regularMarketDayHigh":190.1,"regularMarketDayLow":187.0},
        "timestamp":[1704205800,1704292200,1704378600],
        "indicators":{"quote":[{
            "open":[187.1,184.2,182.0],
            "high":[188.4,185.8,190.2],
            "low":[183.8,183.4,181.5],
            "close":[185.6,184.25,null],
            "volume":[82488700,58414500,null]}]}}],"error":null}}"#;

    #[test]
    fn test_record_from_chart() {
        let chart = parse_chart(AAPL, "AAPL").unwrap();
        let r = SymbolRecord::from_chart("AAPL", &chart).unwrap();

        assert_eq!(r.full_name, "Apple Inc.");
        assert_eq!(r.latest_price, 189.5);
        // today's bar is still open, yesterday's close is the baseline
        assert_eq!(r.previous_close, 184.25);
        assert_eq!(r.open, 182.0);
        assert_eq!(r.high, 190.2);
        assert_eq!(r.low, 181.5);
        assert_eq!(r.volume, 0);
        assert_eq!(r.change, 5.25);
        assert_eq!(r.percent_change, 2.85);
    }

    #[test]
    fn test_record_after_close() {
        let body = AAPL.replace("[185.6,184.25,null]", "[185.6,184.25,189.1]").replace("58414500,null]", "58414500,61000000]");
        let chart = parse_chart(&body, "AAPL").unwrap();
        let r = SymbolRecord::from_chart("AAPL", &chart).unwrap();
        assert_eq!(r.previous_close, 184.25);
        assert_eq!(r.volume, 61000000);
        assert_eq!(r.change, 5.25);
    }

    #[test]
    fn test_previous_close_skips_unsettled_bars() {
        let body = r#"{"chart":{"result":[{
            "meta":{"symbol":"ABC","regularMarketPrice":9.0,"previousClose":7.5,"chartPreviousClose":5.0},
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"open":[8.0,8.5],"high":[8.2,9.1],"low":[7.9,8.4],"close":[null,null],"volume":[null,null]}]}}],
            "error":null}}"#;
        let chart = parse_chart(body, "ABC").unwrap();
        let r = SymbolRecord::from_chart("ABC", &chart).unwrap();
        assert_eq!(r.previous_close, 7.5);
        assert_eq!(r.open, 8.5);
        assert_eq!(r.change, 1.5);
        assert_eq!(r.percent_change, 20.0);
    }

    /// Serve one canned HTTP response per connection.
    async fn canned_server(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = sock.write_all(reply.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        format!("http://{}/chart", addr)
    }

    fn client_at(base_url: String) -> YahooClient {
        YahooClient { client: build_client().unwrap(), base_url }
    }

    #[tokio::test]
    async fn test_symbol_exists_by_status() {
        let missing = client_at(canned_server("404 Not Found", "").await);
        assert!(!missing.symbol_exists("NOPE").await.unwrap());

        let busy = client_at(canned_server("503 Service Unavailable", "").await);
        assert!(matches!(busy.symbol_exists("AAPL").await, Err(QuoteError::Status { status: 503, .. })));

        let limited = client_at(canned_server("429 Too Many Requests", "").await);
        assert!(matches!(limited.symbol_exists("AAPL").await, Err(QuoteError::Status { status: 429, .. })));

        let delisted = client_at(
            canned_server(
                "200 OK",
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
            )
            .await,
        );
        assert!(!delisted.symbol_exists("GONE").await.unwrap());

        let known = client_at(canned_server("200 OK", r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"}}],"error":null}}"#).await);
        assert!(known.symbol_exists("AAPL").await.unwrap());
    }

    #[test]
    fn test_name_falls_back_to_ticker() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"XYZ","regularMarketPrice":10.0,"chartPreviousClose":8.0}}],"error":null}}"#;
        let chart = parse_chart(body, "XYZ").unwrap();
        let r = SymbolRecord::from_chart("XYZ", &chart).unwrap();
        assert_eq!(r.full_name, "XYZ");
        assert_eq!(r.previous_close, 8.0);
        assert_eq!(r.change, 2.0);
        assert_eq!(r.percent_change, 25.0);
    }

    #[test]
    fn test_chart_error_is_data_unavailable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart(body, "NOPE"), Err(QuoteError::DataUnavailable { .. })));
    }

    #[test]
    fn test_closes_skip_nulls() {
        let chart = parse_chart(AAPL, "AAPL").unwrap();
        let closes = chart.closes();
        assert_eq!(closes.len(), 2);
        assert_eq!(closes[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(closes[1].close, 184.25);
    }

    #[test]
    fn test_change_rounding() {
        let r = SymbolRecord::new("T", "T", 3.0, 3.0, 3.0, 3.0, 1, 2.9);
        assert_eq!(r.change, -0.1);
        assert_eq!(r.percent_change, -3.33);
        let flat = SymbolRecord::new("T", "T", 0.0, 0.0, 0.0, 0.0, 0, 0.0);
        assert_eq!(flat.percent_change, 0.0);
    }
}
