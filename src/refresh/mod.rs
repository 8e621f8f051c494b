/*
 *  refresh/mod.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	The refresh loop: verify, then fetch, chart, compose and push per symbol
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

//! The scheduler.
//!
//! One `RefreshLoop` covers every variant of the dashboard: weather and the
//! market label are optional capabilities switched by configuration, and the
//! panel is whatever `BoxedDriver` the factory produced.
//!
//! Steady state never fails. A symbol whose quote cannot be fetched is
//! skipped for the pass, a chart that cannot be rebuilt leaves the previous
//! artifact in use, weather and market errors fall back to the last known
//! values. Only the operator interrupt ends the loop.

pub mod shutdown;
pub mod state;

use std::path::PathBuf;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::cache::DataCache;
use crate::chart::{self, TrendChartGenerator};
use crate::clock::Clock;
use crate::config::{ConfigError, Settings, WeatherSettings};
use crate::display::{Annotations, BoxedDriver, ComposeError, DashboardComposer, DisplayError};
use crate::market::{MarketCalendar, MarketError};
use crate::netcheck::NetworkProbe;
use crate::quote::{StockSource, SymbolRecord};
use crate::weather::{WeatherError, WeatherSource};

pub use shutdown::{
    run_cleanup, shutdown_channel, until_shutdown, ShutdownReport, ShutdownSignal, ShutdownStep,
    ShutdownStepError, ShutdownTrigger,
};
pub use state::{LoopState, StateMachine};

/// Anything that stops the process before the loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("symbol '{symbol}' is invalid: {reason}")]
    InvalidSymbol { symbol: String, reason: String },
    #[error("network verification failed, check the network connection")]
    NetworkUnreachable,
    #[error("market calendar verification failed: {0}")]
    Market(#[from] MarketError),
    #[error("weather verification failed: {0}")]
    Weather(#[from] WeatherError),
    #[error("display initialization failed: {0}")]
    DisplayInit(DisplayError),
}

/// Why a symbol produced no frame this pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Quote(String),
    Compose(String),
    Display(String),
}

/// Result of one symbol tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Displayed,
    /// Pushed without a trend chart
    DisplayedDegraded,
    Skipped(SkipReason),
    /// The interrupt arrived mid-tick, nothing was pushed
    Interrupted,
}

/// Outcomes of one pass over the symbol list, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub outcomes: Vec<(String, TickOutcome)>,
    pub interrupted: bool,
}

/// External services the loop drives.
pub struct Collaborators<S, W, N> {
    pub stock: S,
    /// Used only when the settings carry a weather block
    pub weather: Option<W>,
    pub probe: N,
    pub calendar: Box<dyn MarketCalendar>,
    pub clock: Box<dyn Clock>,
    pub driver: BoxedDriver,
}

pub struct RefreshLoop<S, W, N> {
    settings: Settings,
    stock: S,
    weather: Option<(W, WeatherSettings)>,
    probe: N,
    calendar: Box<dyn MarketCalendar>,
    clock: Box<dyn Clock>,
    driver: BoxedDriver,
    charts: TrendChartGenerator,
    composer: DashboardComposer,
    cache: DataCache,
    state: StateMachine,
    shutdown: ShutdownSignal,
    timezone: Option<Tz>,
}

impl<S, W, N> RefreshLoop<S, W, N>
where
    S: StockSource,
    W: WeatherSource,
    N: NetworkProbe,
{
    pub fn new(settings: Settings, parts: Collaborators<S, W, N>, shutdown: ShutdownSignal) -> Self {
        let weather = match (parts.weather, settings.weather.clone()) {
            (Some(source), Some(cfg)) => Some((source, cfg)),
            (None, Some(_)) => {
                warn!("Weather configured without a weather source, temperature disabled");
                None
            }
            _ => None,
        };
        // an unparsable zone is reported by verify()
        let timezone = settings.market.as_ref().and_then(|m| m.timezone.parse::<Tz>().ok());
        let cache = DataCache::new(weather.as_ref().map(|(_, cfg)| cfg.refresh_interval));
        let composer = DashboardComposer::new(&settings.fonts, settings.trend_resolution, timezone, weather.is_some());

        RefreshLoop {
            settings,
            stock: parts.stock,
            weather,
            probe: parts.probe,
            calendar: parts.calendar,
            clock: parts.clock,
            driver: parts.driver,
            charts: TrendChartGenerator::new(),
            composer,
            cache,
            state: StateMachine::new(),
            shutdown,
            timezone,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state.current()
    }

    pub fn subscribe_state(&self) -> tokio::sync::watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Startup checks, any failure is fatal.
    pub async fn verify(&mut self) -> Result<(), StartupError> {
        self.state.transition(LoopState::Verifying);
        match self.run_checks().await {
            Ok(()) => {
                self.state.transition(LoopState::Ready);
                Ok(())
            }
            Err(e) => {
                error!("Startup verification failed: {}", e);
                self.state.transition(LoopState::Stopped);
                Err(e)
            }
        }
    }

    async fn run_checks(&mut self) -> Result<(), StartupError> {
        for symbol in &self.settings.symbols {
            match self.stock.symbol_exists(symbol).await {
                Ok(true) => debug!("{} symbol verification passed.", symbol),
                Ok(false) => {
                    return Err(StartupError::InvalidSymbol {
                        symbol: symbol.clone(),
                        reason: "unknown to the quote provider".to_string(),
                    });
                }
                Err(e) => {
                    return Err(StartupError::InvalidSymbol { symbol: symbol.clone(), reason: e.to_string() });
                }
            }
        }
        info!("Configuration verification passed.");

        if !self.probe.is_reachable().await {
            return Err(StartupError::NetworkUnreachable);
        }
        info!("Network verification passed.");

        if let Some(market) = &self.settings.market {
            let open = self.calendar.is_open_at(&market.name, &market.timezone, self.clock.now())?;
            self.cache.record_market(open);
            info!("Market verification passed, {} is {}", market.name, if open { "open" } else { "closed" });
        }

        if let Some((source, cfg)) = &self.weather {
            let temperature = source.fetch_temperature(&cfg.api_key, &cfg.location).await?;
            self.cache.record_weather(temperature, self.clock.now());
            info!("Weather verification passed, {}°C in {}", temperature, cfg.location);
        }

        self.driver.init().map_err(StartupError::DisplayInit)?;
        self.driver.clear().map_err(StartupError::DisplayInit)?;
        info!("Display initialized.");
        Ok(())
    }

    /// Cycle through the symbols until interrupted, then clean up.
    pub async fn run(mut self) -> ShutdownReport {
        loop {
            let pass = self.run_pass().await;
            if pass.interrupted {
                break;
            }
        }
        self.shutdown()
    }

    /// One pass over the configured symbols, each followed by the pause.
    pub async fn run_pass(&mut self) -> PassReport {
        let symbols = self.settings.symbols.clone();
        let mut report = PassReport::default();
        for symbol in symbols {
            if self.shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            self.state.transition(LoopState::ProcessingSymbol);
            let outcome = self.process_symbol(&symbol).await;
            let interrupted = outcome == TickOutcome::Interrupted;
            report.outcomes.push((symbol, outcome));
            if interrupted {
                report.interrupted = true;
                break;
            }

            self.state.transition(LoopState::Sleeping);
            if !self.pause().await {
                report.interrupted = true;
                break;
            }
        }
        report
    }

    /// Returns false when the pause was cut short by the interrupt.
    async fn pause(&mut self) -> bool {
        let interval = self.settings.refresh_interval;
        info!("Pausing for {} seconds", interval.as_secs());
        until_shutdown(&mut self.shutdown, tokio::time::sleep(interval)).await.is_some()
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match self.timezone {
            Some(tz) => now.with_timezone(&tz).date_naive(),
            None => now.with_timezone(&Local).date_naive(),
        }
    }

    /// Fetch, chart, weather, market, compose and push for one symbol.
    pub async fn process_symbol(&mut self, symbol: &str) -> TickOutcome {
        let now = self.clock.now();

        let record = match until_shutdown(&mut self.shutdown, self.stock.fetch_quote(symbol)).await {
            None => return TickOutcome::Interrupted,
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                warn!("Failed to retrieve information for {}: {}", symbol, e);
                return TickOutcome::Skipped(SkipReason::Quote(e.to_string()));
            }
        };
        info!("Information for {} retrieved.", symbol);
        log_record(&record);
        self.cache.record_quote(record.clone());

        let Some(chart_path) = self.refresh_chart(symbol, now).await else {
            return TickOutcome::Interrupted;
        };

        if self.cache.weather_is_stale(now) {
            if let Some((source, cfg)) = &self.weather {
                match until_shutdown(&mut self.shutdown, source.fetch_temperature(&cfg.api_key, &cfg.location)).await {
                    None => return TickOutcome::Interrupted,
                    Some(Ok(temperature)) => {
                        self.cache.record_weather(temperature, now);
                        info!("Weather refreshed: {}°C", temperature);
                    }
                    Some(Err(e)) => warn!("Weather refresh failed, keeping the last reading: {}", e),
                }
            }
        }

        let market_open = match &self.settings.market {
            None => None,
            Some(m) => match self.calendar.is_open_at(&m.name, &m.timezone, now) {
                Ok(open) => {
                    self.cache.record_market(open);
                    Some(open)
                }
                Err(e) => {
                    warn!("Market status unavailable, using last known: {}", e);
                    self.cache.market_open()
                }
            },
        };

        if self.shutdown.is_triggered() {
            return TickOutcome::Interrupted;
        }

        let notes = Annotations { market_open, weather: self.cache.weather() };
        let frame = match self.composer.compose(&record, chart_path.as_deref(), notes, now) {
            Ok(frame) => frame,
            Err(e @ (ComposeError::MissingArtifact(_) | ComposeError::InvalidArtifact { .. })) => {
                warn!("{}, drawing {} without a chart", e, symbol);
                match self.composer.compose(&record, None, notes, now) {
                    Ok(frame) => frame,
                    Err(e) => return TickOutcome::Skipped(SkipReason::Compose(e.to_string())),
                }
            }
            Err(e) => {
                error!("Could not compose {}: {}", symbol, e);
                return TickOutcome::Skipped(SkipReason::Compose(e.to_string()));
            }
        };

        if self.shutdown.is_triggered() {
            return TickOutcome::Interrupted;
        }

        match self.driver.push(&frame) {
            Ok(()) => {
                info!("Sent {} data to Display", symbol);
                if frame.is_degraded() { TickOutcome::DisplayedDegraded } else { TickOutcome::Displayed }
            }
            Err(e) => {
                error!("Display push for {} failed: {}", symbol, e);
                TickOutcome::Skipped(SkipReason::Display(e.to_string()))
            }
        }
    }

    // None when interrupted; Some(None) when there is no artifact to show.
    async fn refresh_chart(&mut self, symbol: &str, now: DateTime<Utc>) -> Option<Option<PathBuf>> {
        let end = self.today(now);
        let start = end.checked_sub_days(Days::new(u64::from(self.settings.trend_days))).unwrap_or(NaiveDate::MIN);
        let generated = until_shutdown(
            &mut self.shutdown,
            self.charts.generate(
                &self.stock,
                symbol,
                start,
                end,
                &self.settings.graph_path,
                self.settings.trend_resolution,
            ),
        )
        .await?;

        Some(match generated {
            Ok(artifact) => Some(artifact.path),
            Err(e) => {
                warn!("Graph for {} not generated: {}", symbol, e);
                let previous = chart::artifact_path(&self.settings.graph_path, symbol);
                previous.exists().then_some(previous)
            }
        })
    }

    /// ShuttingDown: every cleanup step is attempted, then Stopped.
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.state.transition(LoopState::ShuttingDown);
        info!("Shutting down, cleaning up {}", self.settings.graph_path.display());
        let report = run_cleanup(&self.settings.graph_path, self.driver.as_mut());
        if report.is_clean() {
            info!("Cleanup complete");
        } else {
            warn!("Cleanup finished with {} failed step(s)", report.failures().len());
        }
        self.state.transition(LoopState::Stopped);
        report
    }
}

fn log_record(r: &SymbolRecord) {
    debug!("Ticker: {}", r.symbol);
    debug!("Full Name: {}", r.full_name);
    debug!("Previous Close: ${:.2}", r.previous_close);
    debug!("Open: ${:.2}", r.open);
    debug!("High: ${:.2}", r.high);
    debug!("Low: ${:.2}", r.low);
    debug!("Volume: {}", r.volume);
    debug!("Latest Price: ${:.2}", r.latest_price);
    debug!("Change: {:.2} ({:.2}%)", r.change, r.percent_change);
}
