// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Open-Meteo weather client: current conditions plus a daily forecast.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::fetch::FetchError;

/// Current conditions for the configured location.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditions {
    pub city: String,
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub humidity: i64,
    pub wind_speed_kmh: f64,
    pub wind_direction: i64,
    pub description: &'static str,
    pub icon: &'static str,
    pub visibility_m: f64,
    pub uv_index: f64,
    pub is_day: bool,
    pub updated_at: DateTime<Utc>,
}

/// One day of forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub rain_mm: f64,
    pub icon: &'static str,
    pub description: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    current: ApiCurrent,
    daily: ApiDaily,
}

#[derive(Deserialize)]
struct ApiCurrent {
    temperature_2m: f64,
    relative_humidity_2m: i64,
    apparent_temperature: f64,
    is_day: i64,
    weather_code: i64,
    wind_speed_10m: f64,
    wind_direction_10m: i64,
    #[serde(default)]
    uv_index: f64,
    #[serde(default)]
    visibility: f64,
}

#[derive(Deserialize)]
struct ApiDaily {
    time: Vec<String>,
    weather_code: Vec<i64>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_sum: Vec<f64>,
}

/// Retrieves current weather and the daily forecast for one location.
pub async fn fetch(
    client: &reqwest::Client,
    lat: f64,
    lon: f64,
    city: &str,
) -> Result<(Conditions, Vec<DayForecast>), FetchError> {
    let url = format!(
        "https://api.open-meteo.com/v1/forecast?latitude={lat:.4}&longitude={lon:.4}\
         &current=temperature_2m,relative_humidity_2m,apparent_temperature,is_day,\
         weather_code,wind_speed_10m,wind_direction_10m,uv_index,visibility\
         &daily=weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum\
         &timezone=auto&forecast_days=10"
    );

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            what: "open-meteo",
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            what: "open-meteo",
            code: status.as_u16(),
        });
    }

    let raw: ApiResponse = response.json().await.map_err(|source| FetchError::Decode {
        what: "open-meteo",
        source,
    })?;

    let is_day = raw.current.is_day == 1;
    let (icon, description) = wmo_code_to_emoji(raw.current.weather_code, is_day);
    let conditions = Conditions {
        city: city.to_owned(),
        temp_c: raw.current.temperature_2m,
        feels_like_c: raw.current.apparent_temperature,
        humidity: raw.current.relative_humidity_2m,
        wind_speed_kmh: raw.current.wind_speed_10m,
        wind_direction: raw.current.wind_direction_10m,
        description,
        icon,
        visibility_m: raw.current.visibility,
        uv_index: raw.current.uv_index,
        is_day,
        updated_at: Utc::now(),
    };

    let mut forecast = Vec::new();
    for (i, date_str) in raw.daily.time.iter().enumerate() {
        if i >= raw.daily.weather_code.len()
            || i >= raw.daily.temperature_2m_max.len()
            || i >= raw.daily.temperature_2m_min.len()
        {
            break;
        }
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };
        let (icon, description) = wmo_code_to_emoji(raw.daily.weather_code[i], true);
        let rain_mm = raw.daily.precipitation_sum.get(i).copied().unwrap_or(0.0);
        forecast.push(DayForecast {
            date,
            max_temp_c: raw.daily.temperature_2m_max[i],
            min_temp_c: raw.daily.temperature_2m_min[i],
            rain_mm,
            icon,
            description,
        });
    }

    Ok((conditions, forecast))
}

/// Converts wind degrees to a compass direction label.
pub fn wind_direction_str(deg: i64) -> &'static str {
    const DIRS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let idx = ((deg.rem_euclid(360) + 22) % 360) / 45;
    DIRS.get(idx as usize).copied().unwrap_or("N")
}

/// Maps a WMO weather code to an emoji and short description.
pub fn wmo_code_to_emoji(code: i64, is_day: bool) -> (&'static str, &'static str) {
    match code {
        0 if is_day => ("☀️", "Clear sky"),
        0 => ("🌙", "Clear night"),
        1 => ("🌤️", "Mainly clear"),
        2 => ("⛅", "Partly cloudy"),
        3 => ("☁️", "Overcast"),
        45..=48 => ("🌫️", "Fog"),
        51..=57 => ("🌦️", "Drizzle"),
        61..=67 => ("🌧️", "Rain"),
        71..=77 => ("❄️", "Snow"),
        80..=82 => ("🌦️", "Rain showers"),
        95 => ("⛈️", "Thunderstorm"),
        96..=99 => ("⛈️", "Thunderstorm with hail"),
        _ => ("🌡️", "Unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "N")]
    #[case(45, "NE")]
    #[case(90, "E")]
    #[case(135, "SE")]
    #[case(180, "S")]
    #[case(225, "SW")]
    #[case(270, "W")]
    #[case(315, "NW")]
    #[case(359, "N")]
    fn compass_labels(#[case] deg: i64, #[case] label: &str) {
        assert_eq!(wind_direction_str(deg), label);
    }

    #[test]
    fn clear_code_depends_on_daylight() {
        assert_eq!(wmo_code_to_emoji(0, true).1, "Clear sky");
        assert_eq!(wmo_code_to_emoji(0, false).1, "Clear night");
    }

    #[test]
    fn unknown_code_falls_through() {
        assert_eq!(wmo_code_to_emoji(42, true).1, "Unknown");
    }

    #[test]
    fn daily_arrays_decode_with_missing_precipitation() {
        let raw: ApiResponse = serde_json::from_str(
            r#"{
                "current": {
                    "temperature_2m": 21.5, "relative_humidity_2m": 40,
                    "apparent_temperature": 20.9, "is_day": 1, "weather_code": 2,
                    "wind_speed_10m": 12.0, "wind_direction_10m": 200
                },
                "daily": {
                    "time": ["2026-08-28", "2026-08-29"],
                    "weather_code": [3, 61],
                    "temperature_2m_max": [24.0, 19.5],
                    "temperature_2m_min": [14.0, 12.5]
                }
            }"#,
        )
        .expect("decode");
        assert_eq!(raw.daily.time.len(), 2);
        assert!(raw.daily.precipitation_sum.is_empty());
        assert_eq!(raw.current.uv_index, 0.0);
    }
}
