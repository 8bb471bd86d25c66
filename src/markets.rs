// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Market data clients: crypto prices (CoinGecko), stock indices and
//! commodities (Yahoo Finance chart endpoint), and prediction markets
//! (Polymarket gamma API).
//!
//! The index and commodity groups fan out one sub-fetch per symbol and
//! rejoin in definition order, so output order is deterministic regardless
//! of completion order. If every sub-fetch fails the group reports one
//! consolidated error; if any succeeds, failed sub-items are dropped
//! silently.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::FetchError;

#[derive(Debug, Clone, PartialEq)]
pub struct CryptoPrice {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub change_24h: f64,
    pub market_cap_usd: f64,
    pub volume_24h_usd: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockIndex {
    pub symbol: String,
    pub name: &'static str,
    pub price: f64,
    pub prev_close: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commodity {
    pub symbol: String,
    pub name: &'static str,
    pub price: f64,
    pub prev_close: f64,
    pub unit: &'static str,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionMarket {
    pub title: String,
    pub probability: f64,
    pub volume: f64,
    pub category: String,
    pub end_date: String,
    pub slug: String,
}

// ─── Crypto ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GeckoMarket {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    current_price: f64,
    #[serde(default)]
    price_change_percentage_24h: f64,
    #[serde(default)]
    market_cap: f64,
    #[serde(default)]
    total_volume: f64,
    #[serde(default)]
    last_updated: String,
}

/// Fetches prices for the given CoinGecko coin ids.
pub async fn fetch_crypto_prices(
    client: &reqwest::Client,
    ids: &[String],
) -> Result<Vec<CryptoPrice>, FetchError> {
    let url = format!(
        "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd&ids={}\
         &order=market_cap_desc&per_page=20&page=1&sparkline=false\
         &price_change_percentage=24h",
        ids.join(","),
    );

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| FetchError::Request {
            what: "coingecko",
            source,
        })?;
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(FetchError::RateLimited { what: "CoinGecko" });
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            what: "coingecko",
            code: status.as_u16(),
        });
    }

    let raw: Vec<GeckoMarket> = response.json().await.map_err(|source| FetchError::Decode {
        what: "coingecko",
        source,
    })?;

    Ok(raw
        .into_iter()
        .map(|r| CryptoPrice {
            symbol: r.symbol.to_uppercase(),
            last_updated: DateTime::parse_from_rfc3339(&r.last_updated)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            id: r.id,
            name: r.name,
            price_usd: r.current_price,
            change_24h: r.price_change_percentage_24h,
            market_cap_usd: r.market_cap,
            volume_24h_usd: r.total_volume,
        })
        .collect())
}

// ─── Yahoo Finance chart endpoint ────────────────────────────────────────
// One GET per symbol against v8/finance/chart; the meta object carries
// regularMarketPrice, previousClose, and regularMarketChangePercent.

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: f64,
    #[serde(rename = "previousClose", default)]
    previous_close: f64,
    #[serde(rename = "regularMarketChangePercent", default)]
    regular_market_change_percent: f64,
    #[serde(rename = "chartPreviousClose", default)]
    chart_previous_close: f64,
    #[serde(default)]
    symbol: String,
}

#[derive(Deserialize)]
struct YahooEnvelope {
    chart: YahooChart,
}

#[derive(Deserialize)]
struct YahooChart {
    #[serde(default)]
    result: Vec<YahooResult>,
    #[serde(default)]
    error: Option<YahooError>,
}

#[derive(Deserialize)]
struct YahooResult {
    meta: YahooMeta,
}

#[derive(Deserialize)]
struct YahooError {
    #[serde(default)]
    description: String,
}

async fn fetch_yahoo_chart(client: &reqwest::Client, symbol: &str) -> Result<YahooMeta, String> {
    let url = format!("https://query1.finance.yahoo.com/v8/finance/chart/{symbol}");

    let response = client
        .get(&url)
        .header(
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        )
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|err| format!("yahoo chart request for {symbol}: {err}"))?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("yahoo chart HTTP {} for {symbol}", status.as_u16()));
    }

    let envelope: YahooEnvelope = response
        .json()
        .await
        .map_err(|err| format!("decoding yahoo chart for {symbol}: {err}"))?;
    if let Some(error) = envelope.chart.error {
        return Err(format!("yahoo chart error for {symbol}: {}", error.description));
    }
    let Some(result) = envelope.chart.result.into_iter().next() else {
        return Err(format!("no results from yahoo chart for {symbol}"));
    };

    Ok(fill_change_pct(result.meta))
}

// Yahoo sometimes omits the percent change or previousClose; derive them
// from whichever close we did get.
fn fill_change_pct(mut meta: YahooMeta) -> YahooMeta {
    if meta.regular_market_change_percent == 0.0 && meta.previous_close != 0.0 {
        meta.regular_market_change_percent =
            (meta.regular_market_price - meta.previous_close) / meta.previous_close * 100.0;
    }
    if meta.previous_close == 0.0 && meta.chart_previous_close != 0.0 {
        meta.previous_close = meta.chart_previous_close;
        if meta.regular_market_change_percent == 0.0 {
            meta.regular_market_change_percent = (meta.regular_market_price
                - meta.chart_previous_close)
                / meta.chart_previous_close
                * 100.0;
        }
    }
    meta
}

fn join_group<T>(slots: Vec<Result<T, String>>) -> Result<Vec<T>, FetchError> {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for slot in slots {
        match slot {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }
    if values.is_empty() && !errors.is_empty() {
        return Err(FetchError::Group { errors });
    }
    Ok(values)
}

// ─── Stock indices ───────────────────────────────────────────────────────

const INDEX_DEFS: &[(&str, &str)] = &[("%5EGSPC", "S&P 500"), ("%5EDJI", "Dow Jones")];

/// Fetches the index group concurrently, preserving definition order.
pub async fn fetch_stock_indices(
    client: &reqwest::Client,
) -> Result<Vec<StockIndex>, FetchError> {
    let fetches = INDEX_DEFS.iter().map(|&(symbol, name)| async move {
        let meta = fetch_yahoo_chart(client, symbol).await?;
        Ok(StockIndex {
            symbol: meta.symbol,
            name,
            price: meta.regular_market_price,
            prev_close: meta.previous_close,
            change_pct: meta.regular_market_change_percent,
        })
    });
    join_group(futures::future::join_all(fetches).await)
}

// ─── Commodities ─────────────────────────────────────────────────────────

const COMMODITY_DEFS: &[(&str, &str, &str)] = &[
    ("CL%3DF", "WTI Crude Oil", "$/bbl"),
    ("GC%3DF", "Gold", "$/oz"),
    ("HG%3DF", "Copper", "$/lb"),
];

/// Fetches the commodity group concurrently, preserving definition order.
pub async fn fetch_commodities(client: &reqwest::Client) -> Result<Vec<Commodity>, FetchError> {
    let fetches = COMMODITY_DEFS.iter().map(|&(symbol, name, unit)| async move {
        let meta = fetch_yahoo_chart(client, symbol).await?;
        Ok(Commodity {
            symbol: meta.symbol,
            name,
            price: meta.regular_market_price,
            prev_close: meta.previous_close,
            unit,
            change_pct: meta.regular_market_change_percent,
        })
    });
    join_group(futures::future::join_all(fetches).await)
}

// ─── Prediction markets ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct GammaMarket {
    #[serde(default)]
    question: String,
    #[serde(rename = "outcomePrices", default)]
    outcome_prices: String,
    #[serde(default)]
    volume: String,
    #[serde(rename = "endDateIso", default)]
    end_date_iso: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    tags: Vec<GammaTag>,
}

#[derive(Deserialize)]
struct GammaTag {
    #[serde(default)]
    slug: String,
}

/// Fetches the top active politics markets from Polymarket.
pub async fn fetch_prediction_markets(
    client: &reqwest::Client,
) -> Result<Vec<PredictionMarket>, FetchError> {
    let url = "https://gamma-api.polymarket.com/markets?limit=20&active=true&closed=false\
               &order=volume&ascending=false&tag_slug=politics";

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| FetchError::Request {
            what: "polymarket",
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            what: "polymarket",
            code: status.as_u16(),
        });
    }

    let raw: Vec<GammaMarket> = response.json().await.map_err(|source| FetchError::Decode {
        what: "polymarket",
        source,
    })?;

    Ok(raw.into_iter().filter_map(prediction_market_from_raw).collect())
}

fn prediction_market_from_raw(raw: GammaMarket) -> Option<PredictionMarket> {
    if raw.question.is_empty() {
        return None;
    }
    // outcomePrices is a JSON array encoded as a string; tolerate anything.
    let probability = serde_json::from_str::<Vec<String>>(&raw.outcome_prices)
        .ok()
        .and_then(|prices| prices.first().and_then(|p| p.parse::<f64>().ok()))
        .unwrap_or(0.5);
    let volume = raw.volume.parse::<f64>().unwrap_or(0.0);
    let category = raw
        .tags
        .into_iter()
        .next()
        .map(|tag| tag.slug)
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| "politics".to_owned());
    let end_date = if raw.end_date_iso.len() >= 10 {
        raw.end_date_iso[..10].to_owned()
    } else {
        String::new()
    };
    Some(PredictionMarket {
        title: raw.question,
        probability,
        volume,
        category,
        end_date,
        slug: raw.slug,
    })
}

// ─── Formatters ──────────────────────────────────────────────────────────

/// Human-readable price with thousands separators for large values.
pub fn format_price(p: f64) -> String {
    if p >= 1000.0 {
        format!("${}", comma_separate(&format!("{p:.0}")))
    } else if p >= 1.0 {
        format!("${p:.2}")
    } else if p >= 0.01 {
        format!("${p:.4}")
    } else {
        format!("${p:.6}")
    }
}

/// Abbreviates large dollar amounts (1_200_000 → "$1.2M").
pub fn format_large_num(n: f64) -> String {
    if n >= 1e12 {
        format!("${:.2}T", n / 1e12)
    } else if n >= 1e9 {
        format!("${:.2}B", n / 1e9)
    } else if n >= 1e6 {
        format!("${:.1}M", n / 1e6)
    } else {
        format!("${n:.0}")
    }
}

fn comma_separate(s: &str) -> String {
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let n = digits.len();
    if n <= 3 {
        return s.to_owned();
    }
    let mut out = String::with_capacity(n + n / 3 + 1);
    if neg {
        out.push('-');
    }
    let lead = n % 3;
    if lead > 0 {
        out.push_str(&digits[..lead]);
    }
    for (i, chunk) in digits[lead..].as_bytes().chunks(3).enumerate() {
        if lead > 0 || i > 0 {
            out.push(',');
        }
        out.push_str(std::str::from_utf8(chunk).unwrap_or(""));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(64123.0, "$64,123")]
    #[case(1000.0, "$1,000")]
    #[case(999.994, "$999.99")]
    #[case(2.5, "$2.50")]
    #[case(0.0432, "$0.0432")]
    #[case(0.000071, "$0.000071")]
    fn price_formatting(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(format_price(input), expected);
    }

    #[rstest]
    #[case(2.34e12, "$2.34T")]
    #[case(8.1e9, "$8.10B")]
    #[case(1_200_000.0, "$1.2M")]
    #[case(950.0, "$950")]
    fn large_number_formatting(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(format_large_num(input), expected);
    }

    #[rstest]
    #[case("1234567", "1,234,567")]
    #[case("123", "123")]
    #[case("-4521", "-4,521")]
    #[case("1000", "1,000")]
    fn comma_separation(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(comma_separate(input), expected);
    }

    #[test]
    fn change_pct_derived_from_previous_close() {
        let meta = fill_change_pct(YahooMeta {
            regular_market_price: 110.0,
            previous_close: 100.0,
            ..YahooMeta::default()
        });
        assert!((meta.regular_market_change_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn chart_previous_close_fallback() {
        let meta = fill_change_pct(YahooMeta {
            regular_market_price: 90.0,
            chart_previous_close: 100.0,
            ..YahooMeta::default()
        });
        assert_eq!(meta.previous_close, 100.0);
        assert!((meta.regular_market_change_percent + 10.0).abs() < 1e-9);
    }

    #[test]
    fn group_with_any_success_drops_failures() {
        let joined = join_group(vec![
            Ok(1),
            Err("yahoo chart HTTP 500 for X".to_owned()),
            Ok(3),
        ])
        .expect("partial success is success");
        assert_eq!(joined, vec![1, 3]);
    }

    #[test]
    fn group_with_all_failures_consolidates() {
        let err = join_group::<i32>(vec![Err("a failed".to_owned()), Err("b failed".to_owned())])
            .expect_err("all-fail must error");
        assert_eq!(err.to_string(), "a failed; b failed");
    }

    #[test]
    fn empty_group_is_ok() {
        assert_eq!(join_group::<i32>(Vec::new()).expect("empty"), Vec::<i32>::new());
    }

    #[test]
    fn prediction_market_tolerates_malformed_prices() {
        let market = prediction_market_from_raw(GammaMarket {
            question: "Will it happen?".to_owned(),
            outcome_prices: "not json".to_owned(),
            volume: "12000.5".to_owned(),
            end_date_iso: "2026-11-03T00:00:00Z".to_owned(),
            slug: "will-it".to_owned(),
            tags: Vec::new(),
        })
        .expect("market");
        assert_eq!(market.probability, 0.5);
        assert_eq!(market.volume, 12000.5);
        assert_eq!(market.end_date, "2026-11-03");
        assert_eq!(market.category, "politics");
    }

    #[test]
    fn prediction_market_without_question_is_skipped() {
        assert!(prediction_market_from_raw(GammaMarket {
            question: String::new(),
            outcome_prices: String::new(),
            volume: String::new(),
            end_date_iso: String::new(),
            slug: String::new(),
            tags: Vec::new(),
        })
        .is_none());
    }

    #[test]
    fn prediction_market_parses_outcome_prices() {
        let market = prediction_market_from_raw(GammaMarket {
            question: "Q".to_owned(),
            outcome_prices: r#"["0.67","0.33"]"#.to_owned(),
            volume: String::new(),
            end_date_iso: "short".to_owned(),
            slug: String::new(),
            tags: vec![GammaTag {
                slug: "geopolitics".to_owned(),
            }],
        })
        .expect("market");
        assert!((market.probability - 0.67).abs() < 1e-9);
        assert_eq!(market.category, "geopolitics");
        assert_eq!(market.end_date, "");
    }
}
