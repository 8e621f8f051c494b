/*
 *  weather.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Current temperature from OpenWeatherMap and the staleness cache
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

use std::fmt::{self, Display};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use reqwest::Client;
use serde_json::{Error as JsonError, Value};

use crate::config::WeatherSettings;
use crate::http::{build_client, send_with_retries};

const BASE_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

// Custom error type for weather API operations.
#[derive(Debug)]
pub enum WeatherError {
    Http(reqwest::Error),
    Parse(JsonError),
    WeatherUnavailable(String),
}

impl Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::Http(e) => write!(f, "HTTP request error: {}", e),
            WeatherError::Parse(e) => write!(f, "JSON deserialization error: {}", e),
            WeatherError::WeatherUnavailable(msg) => write!(f, "Weather unavailable: {}", msg),
        }
    }
}

impl std::error::Error for WeatherError {}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Http(err)
    }
}

impl From<JsonError> for WeatherError {
    fn from(err: JsonError) -> Self {
        WeatherError::Parse(err)
    }
}

/// Temperature source.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    /// Whole degrees Celsius at `location`.
    async fn fetch_temperature(&self, api_key: &str, location: &str) -> Result<i32, WeatherError>;
}

/// Round a `main.temp` reading out of an OpenWeatherMap body.
pub fn parse_temperature(body: &str) -> Result<i32, WeatherError> {
    let json: Value = serde_json::from_str(body)?;
    let temp = json["main"]["temp"]
        .as_f64()
        .ok_or_else(|| WeatherError::WeatherUnavailable("response has no main.temp".to_string()))?;
    Ok(temp.round() as i32)
}

pub struct OpenWeatherClient {
    client: Client,
    units: String,
}

impl OpenWeatherClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self, WeatherError> {
        Ok(Self { client: build_client()?, units: settings.units.clone() })
    }
}

impl WeatherSource for OpenWeatherClient {
    async fn fetch_temperature(&self, api_key: &str, location: &str) -> Result<i32, WeatherError> {
        info!("Fetching weather data for {}...", location);
        let params = [("q", location), ("appid", api_key), ("units", self.units.as_str())];
        let fetched = send_with_retries(&self.client, BASE_URL, &params, 3).await?;
        if !fetched.is_success() {
            return Err(WeatherError::WeatherUnavailable(format!("status {}: {}", fetched.status, fetched.body)));
        }
        parse_temperature(&fetched.body)
    }
}

/// A temperature and when it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherReading {
    pub temperature_c: i32,
    pub fetched_at: DateTime<Utc>,
}

/// Last good reading plus the window after which it must be refreshed.
#[derive(Debug, Clone)]
pub struct WeatherCache {
    refresh_interval: Duration,
    reading: Option<WeatherReading>,
}

impl WeatherCache {
    pub fn new(refresh_interval: Duration) -> Self {
        Self { refresh_interval, reading: None }
    }

    /// Stale when never fetched or `now - fetched_at >= refresh_interval`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.reading {
            None => true,
            Some(r) => (now - r.fetched_at).to_std().map_or(false, |age| age >= self.refresh_interval),
        }
    }

    pub fn record(&mut self, temperature_c: i32, now: DateTime<Utc>) -> WeatherReading {
        let reading = WeatherReading { temperature_c, fetched_at: now };
        self.reading = Some(reading);
        reading
    }

    pub fn reading(&self) -> Option<&WeatherReading> {
        self.reading.as_ref()
    }
}
