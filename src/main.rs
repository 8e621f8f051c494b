/*
 *  main.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
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

use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};

use lyticker::clock::SystemClock;
use lyticker::config;
use lyticker::display::DisplayDriverFactory;
use lyticker::market::ExchangeCalendar;
use lyticker::netcheck::TcpProbe;
use lyticker::quote::YahooClient;
use lyticker::refresh::{shutdown_channel, Collaborators, RefreshLoop};
use lyticker::weather::OpenWeatherClient;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and logs which one arrived.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

// one symbol at a time, nothing runs concurrently with the loop
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = match config::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}: {}", env!("CARGO_PKG_NAME"), e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("This {} ticks on paper", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    info!("Tracking {}", settings.symbols.join(", "));

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        match signal_handler().await {
            Ok(()) => trigger.trigger(),
            Err(e) => error!("Signal handlers unavailable: {}", e),
        }
    });

    let stock = YahooClient::new().context("building the quote client")?;
    let weather = match settings.weather.as_ref() {
        Some(w) => Some(OpenWeatherClient::new(w).context("building the weather client")?),
        None => None,
    };
    let driver = match DisplayDriverFactory::create_from_config(&settings.display) {
        Ok(driver) => driver,
        Err(e) => {
            error!("Display driver unavailable: {}", e);
            std::process::exit(1);
        }
    };

    let parts = Collaborators {
        stock,
        weather,
        probe: TcpProbe::default(),
        calendar: Box::new(ExchangeCalendar),
        clock: Box::new(SystemClock),
        driver,
    };
    let mut refresh = RefreshLoop::new(settings, parts, shutdown);

    if let Err(e) = refresh.verify().await {
        error!("{}", e);
        std::process::exit(1);
    }

    let report = refresh.run().await;
    for failure in report.failures() {
        warn!("{}", failure);
    }
    info!("{} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
