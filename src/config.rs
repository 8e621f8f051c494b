/*
 *  config.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML + CLI configuration, merged then resolved into immutable Settings
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::*;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Raw configuration layer, every field optional so layers can merge.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,          // e.g., "info" | "debug"
    pub symbols: Option<Vec<String>>,
    pub trend_days: Option<u32>,
    pub graph_path: Option<PathBuf>,
    pub refresh_seconds: Option<u64>,
    pub resized_trend_resolution: Option<[u32; 2]>,
    pub weather: Option<WeatherConfig>,
    pub market: Option<MarketConfig>,
    pub display: Option<DisplayConfig>,
    pub fonts: Option<FontConfig>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub location: Option<String>,
    pub refresh_hours: Option<f64>,
    pub units: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct MarketConfig {
    pub name: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>,
    pub spi_bus: Option<String>,     // e.g. "/dev/spidev0.0"
    pub gpio_chip: Option<String>,   // e.g. "/dev/gpiochip0"
    pub dc_pin: Option<u32>,         // BCM numbering
    pub rst_pin: Option<u32>,
    pub busy_pin: Option<u32>,
    pub pwr_pin: Option<u32>,
    pub busy_timeout_secs: Option<u64>,
    pub dump_path: Option<PathBuf>,  // mock only, BMP per pushed frame
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct FontConfig {
    pub light: Option<String>,
    pub bold: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Epd7in3e,
    Mock,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "LyTicker", about = "LyTicker e-paper stock dashboard", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// comma separated tickers, replaces the configured list
    #[arg(long, value_delimiter = ',')]
    pub symbols: Option<Vec<String>>,
    #[arg(long)]
    pub refresh_seconds: Option<u64>,
    #[arg(long)]
    pub trend_days: Option<u32>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub graph_path: Option<PathBuf>,
    /// run against the mock panel, no hardware needed
    #[arg(long, action = ArgAction::SetTrue)]
    pub mock_display: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Chart target size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub api_key: String,
    pub location: String,
    pub refresh_interval: Duration,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSettings {
    pub name: String,
    pub timezone: String,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub driver: DriverKind,
    pub spi_bus: String,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub busy_pin: u32,
    pub pwr_pin: u32,
    pub busy_timeout: Duration,
    pub dump_path: Option<PathBuf>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            driver: DriverKind::Mock,
            spi_bus: "/dev/spidev0.0".into(),
            gpio_chip: "/dev/gpiochip0".into(),
            dc_pin: 25,
            rst_pin: 17,
            busy_pin: 24,
            pwr_pin: 18,
            busy_timeout: Duration::from_secs(60),
            dump_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSettings {
    pub light: String,
    pub bold: String,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self { light: "10x20".into(), bold: "9x18_bold".into() }
    }
}

/// Validated, immutable view of the configuration handed to the refresh loop.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub symbols: Vec<String>,
    pub trend_days: u32,
    pub graph_path: PathBuf,
    pub refresh_interval: Duration,
    pub trend_resolution: Resolution,
    pub weather: Option<WeatherSettings>,
    pub market: Option<MarketSettings>,
    pub display: DisplaySettings,
    pub fonts: FontSettings,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Settings, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    resolve(cfg)
}

/// Layer defaults, YAML and CLI without resolving.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        log::debug!("using config file {}", p.display());
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lyticker/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lyticker/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lyticker.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lyticker.yaml", "config.yaml", "config/lyticker.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()                { dst.log_level = src.log_level; }
    if src.symbols.is_some()                  { dst.symbols = src.symbols; }
    if src.trend_days.is_some()               { dst.trend_days = src.trend_days; }
    if src.graph_path.is_some()               { dst.graph_path = src.graph_path; }
    if src.refresh_seconds.is_some()          { dst.refresh_seconds = src.refresh_seconds; }
    if src.resized_trend_resolution.is_some() { dst.resized_trend_resolution = src.resized_trend_resolution; }
    if src.fonts.is_some()                    { dst.fonts = src.fonts; }
    if src.weather.is_some()                  { dst.weather = src.weather; }
    if src.market.is_some()                   { dst.market = src.market; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()            { dst.driver = src.driver; }
    if src.spi_bus.is_some()           { dst.spi_bus = src.spi_bus; }
    if src.gpio_chip.is_some()         { dst.gpio_chip = src.gpio_chip; }
    if src.dc_pin.is_some()            { dst.dc_pin = src.dc_pin; }
    if src.rst_pin.is_some()           { dst.rst_pin = src.rst_pin; }
    if src.busy_pin.is_some()          { dst.busy_pin = src.busy_pin; }
    if src.pwr_pin.is_some()           { dst.pwr_pin = src.pwr_pin; }
    if src.busy_timeout_secs.is_some() { dst.busy_timeout_secs = src.busy_timeout_secs; }
    if src.dump_path.is_some()         { dst.dump_path = src.dump_path; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug {
        cfg.log_level = Some("debug".into());
    } else if cli.log_level.is_some() {
        cfg.log_level = cli.log_level.clone();
    }
    if cli.symbols.is_some()         { cfg.symbols = cli.symbols.clone(); }
    if cli.refresh_seconds.is_some() { cfg.refresh_seconds = cli.refresh_seconds; }
    if cli.trend_days.is_some()      { cfg.trend_days = cli.trend_days; }
    if cli.graph_path.is_some()      { cfg.graph_path = cli.graph_path.clone(); }
    if cli.mock_display {
        cfg.display.get_or_insert_with(DisplayConfig::default).driver = Some(DriverKind::Mock);
    }
}

/// Upper-case, trim and drop repeats, keeping first occurrence order.
pub fn normalize_symbols(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for s in raw {
        let s = s.trim().to_ascii_uppercase();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

fn valid_ticker(s: &str) -> bool {
    s.len() <= 16 && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
}

fn required(value: Option<String>, what: &str) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Validation(format!("{what} must be set"))),
    }
}

/// Apply defaults and invariants, producing the immutable settings.
pub fn resolve(cfg: Config) -> Result<Settings, ConfigError> {
    let symbols = normalize_symbols(cfg.symbols.as_deref().unwrap_or_default());
    if symbols.is_empty() {
        return Err(ConfigError::Validation("at least one symbol is required".into()));
    }
    if let Some(bad) = symbols.iter().find(|s| !valid_ticker(s)) {
        return Err(ConfigError::Validation(format!("symbol '{bad}' is not a ticker")));
    }

    let trend_days = cfg.trend_days.unwrap_or(DEFAULT_TREND_DAYS);
    if trend_days == 0 {
        return Err(ConfigError::Validation("trend_days must be >= 1".into()));
    }
    let refresh_seconds = cfg.refresh_seconds.unwrap_or(DEFAULT_REFRESH_SECONDS);
    if refresh_seconds == 0 {
        return Err(ConfigError::Validation("refresh_seconds must be >= 1".into()));
    }
    let [width, height] = cfg
        .resized_trend_resolution
        .unwrap_or([DEFAULT_TREND_RESOLUTION.0, DEFAULT_TREND_RESOLUTION.1]);
    if width == 0 || height == 0 {
        return Err(ConfigError::Validation("resized_trend_resolution must be > 0".into()));
    }

    let weather = match cfg.weather {
        None => None,
        Some(w) => {
            let hours = w.refresh_hours.unwrap_or(DEFAULT_WEATHER_REFRESH_HOURS);
            if !hours.is_finite() || hours <= 0.0 {
                return Err(ConfigError::Validation("weather.refresh_hours must be > 0".into()));
            }
            let refresh_interval = Duration::try_from_secs_f64(hours * 3600.0)
                .map_err(|e| ConfigError::Validation(format!("weather.refresh_hours {hours}: {e}")))?;
            Some(WeatherSettings {
                api_key: required(w.api_key, "weather.api_key")?,
                location: required(w.location, "weather.location")?,
                refresh_interval,
                units: w.units.unwrap_or_else(|| "metric".into()),
            })
        }
    };

    let market = cfg.market.map(|m| MarketSettings {
        name: m.name.unwrap_or_else(|| DEFAULT_MARKET.into()),
        timezone: m.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.into()),
    });

    let mut display = DisplaySettings::default();
    let dc = cfg.display.unwrap_or_default();
    display.driver = dc.driver.unwrap_or(if cfg!(feature = "epd7in3e") {
        DriverKind::Epd7in3e
    } else {
        DriverKind::Mock
    });
    if let Some(v) = dc.spi_bus { display.spi_bus = v; }
    if let Some(v) = dc.gpio_chip { display.gpio_chip = v; }
    if let Some(v) = dc.dc_pin { display.dc_pin = v; }
    if let Some(v) = dc.rst_pin { display.rst_pin = v; }
    if let Some(v) = dc.busy_pin { display.busy_pin = v; }
    if let Some(v) = dc.pwr_pin { display.pwr_pin = v; }
    if let Some(v) = dc.busy_timeout_secs { display.busy_timeout = Duration::from_secs(v.max(1)); }
    display.dump_path = dc.dump_path;

    let mut fonts = FontSettings::default();
    if let Some(f) = cfg.fonts {
        if let Some(v) = f.light { fonts.light = v; }
        if let Some(v) = f.bold { fonts.bold = v; }
    }

    Ok(Settings {
        log_level: cfg.log_level.unwrap_or_else(|| "info".into()),
        symbols,
        trend_days,
        graph_path: cfg.graph_path.unwrap_or_else(|| PathBuf::from(DEFAULT_GRAPH_PATH)),
        refresh_interval: Duration::from_secs(refresh_seconds),
        trend_resolution: Resolution { width, height },
        weather,
        market,
        display,
        fonts,
    })
}
