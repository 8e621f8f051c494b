/*
 *  cache.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Last known values held between ticks
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

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::quote::SymbolRecord;
use crate::weather::{WeatherCache, WeatherReading};

/// Most recent fetched values, nothing older.
///
/// Weather is `None` when the capability is off; then it is never stale
/// and never shown.
#[derive(Debug, Clone, Default)]
pub struct DataCache {
    quotes: HashMap<String, SymbolRecord>,
    weather: Option<WeatherCache>,
    market_open: Option<bool>,
}

impl DataCache {
    pub fn new(weather_refresh: Option<Duration>) -> Self {
        DataCache {
            quotes: HashMap::new(),
            weather: weather_refresh.map(WeatherCache::new),
            market_open: None,
        }
    }

    pub fn record_quote(&mut self, record: SymbolRecord) {
        self.quotes.insert(record.symbol.clone(), record);
    }

    pub fn quote(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.quotes.get(symbol)
    }

    pub fn weather_enabled(&self) -> bool {
        self.weather.is_some()
    }

    /// True when weather is on and due for a refetch.
    pub fn weather_is_stale(&self, now: DateTime<Utc>) -> bool {
        self.weather.as_ref().is_some_and(|w| w.is_stale(now))
    }

    /// Store a fresh temperature, ignored when weather is off.
    pub fn record_weather(&mut self, temperature_c: i32, now: DateTime<Utc>) -> Option<WeatherReading> {
        self.weather.as_mut().map(|w| w.record(temperature_c, now))
    }

    pub fn weather(&self) -> Option<&WeatherReading> {
        self.weather.as_ref().and_then(|w| w.reading())
    }

    pub fn record_market(&mut self, open: bool) {
        self.market_open = Some(open);
    }

    /// Last successfully queried market status.
    pub fn market_open(&self) -> Option<bool> {
        self.market_open
    }
}
