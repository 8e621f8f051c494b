/*
 *  tests/refresh_loop.rs
 *
 *  Integration tests for the refresh loop, against fake services and the
 *  mock panel
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 */

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};

use lyticker::bmp;
use lyticker::clock::ManualClock;
use lyticker::config::{DisplaySettings, FontSettings, MarketSettings, Resolution, Settings, WeatherSettings};
use lyticker::display::{DisplayFrame, DisplayOp, MockDriver, PanelColor};
use lyticker::market::{ExchangeCalendar, MarketCalendar, MarketError};
use lyticker::netcheck::NetworkProbe;
use lyticker::quote::{ClosePoint, QuoteError, StockSource, SymbolRecord};
use lyticker::refresh::{
    shutdown_channel, Collaborators, LoopState, RefreshLoop, ShutdownSignal, ShutdownStep, ShutdownTrigger,
    SkipReason, StartupError, TickOutcome,
};
use lyticker::weather::{WeatherError, WeatherSource};

#[derive(Clone, Default)]
struct FakeStock {
    calls: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    unknown: HashSet<String>,
    no_history: HashSet<String>,
    // raise the interrupt from inside the nth quote fetch
    stop_on_call: Option<(usize, ShutdownTrigger)>,
}

impl FakeStock {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl StockSource for FakeStock {
    async fn fetch_quote(&self, symbol: &str) -> Result<SymbolRecord, QuoteError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(symbol.to_string());
            calls.len()
        };
        if let Some((at, trigger)) = &self.stop_on_call {
            if n == *at {
                trigger.trigger();
            }
        }
        if self.failing.contains(symbol) {
            return Err(QuoteError::DataUnavailable { symbol: symbol.into(), reason: "provider down".into() });
        }
        Ok(SymbolRecord::new(symbol, &format!("{} Corp", symbol), 100.0, 101.0, 104.0, 99.5, 1_000_000, 102.5))
    }

    async fn fetch_closes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<ClosePoint>, QuoteError> {
        if self.no_history.contains(symbol) {
            return Ok(Vec::new());
        }
        Ok(start
            .iter_days()
            .take_while(|d| *d < end)
            .enumerate()
            .map(|(i, date)| ClosePoint { date, close: 100.0 + i as f64 })
            .collect())
    }

    async fn symbol_exists(&self, symbol: &str) -> Result<bool, QuoteError> {
        Ok(!self.unknown.contains(symbol))
    }
}

#[derive(Clone, Default)]
struct FakeWeather {
    calls: Arc<Mutex<usize>>,
    // scripted answers, 20°C once exhausted
    script: Arc<Mutex<VecDeque<Option<i32>>>>,
}

impl FakeWeather {
    fn scripted(answers: &[Option<i32>]) -> Self {
        let w = FakeWeather::default();
        w.script.lock().unwrap().extend(answers.iter().copied());
        w
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl WeatherSource for FakeWeather {
    async fn fetch_temperature(&self, _api_key: &str, _location: &str) -> Result<i32, WeatherError> {
        *self.calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(Some(t)) => Ok(t),
            Some(None) => Err(WeatherError::WeatherUnavailable("status 503".into())),
            None => Ok(20),
        }
    }
}

struct FakeProbe(bool);

impl NetworkProbe for FakeProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

#[derive(Clone)]
struct FixedMarket(Arc<Mutex<Result<bool, MarketError>>>);

impl FixedMarket {
    fn new(answer: Result<bool, MarketError>) -> Self {
        FixedMarket(Arc::new(Mutex::new(answer)))
    }

    fn set(&self, answer: Result<bool, MarketError>) {
        *self.0.lock().unwrap() = answer;
    }
}

impl MarketCalendar for FixedMarket {
    fn is_open_at(&self, _market: &str, _timezone: &str, _at: chrono::DateTime<Utc>) -> Result<bool, MarketError> {
        self.0.lock().unwrap().clone()
    }
}

fn settings(graph_path: &Path, symbols: &[&str]) -> Settings {
    Settings {
        log_level: "info".into(),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        trend_days: 30,
        graph_path: graph_path.to_path_buf(),
        refresh_interval: Duration::from_secs(60),
        trend_resolution: Resolution { width: 40, height: 20 },
        weather: None,
        market: None,
        display: DisplaySettings::default(),
        fonts: FontSettings::default(),
    }
}

fn hourly_weather() -> WeatherSettings {
    WeatherSettings {
        api_key: "key".into(),
        location: "Toronto".into(),
        refresh_interval: Duration::from_secs(3600),
        units: "metric".into(),
    }
}

fn nine_am() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 13, 0, 0).unwrap())
}

struct Rig {
    refresh: RefreshLoop<FakeStock, FakeWeather, FakeProbe>,
    panel: MockDriver,
}

fn rig(
    settings: Settings,
    stock: FakeStock,
    weather: Option<FakeWeather>,
    calendar: Box<dyn MarketCalendar>,
    clock: ManualClock,
    shutdown: ShutdownSignal,
) -> Rig {
    let panel = MockDriver::new_with_size(800, 480);
    let parts = Collaborators {
        stock,
        weather,
        probe: FakeProbe(true),
        calendar,
        clock: Box::new(clock),
        driver: Box::new(panel.clone()),
    };
    Rig { refresh: RefreshLoop::new(settings, parts, shutdown), panel }
}

fn pushed(panel: &MockDriver) -> Vec<String> {
    panel
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            DisplayOp::Push { symbol, .. } => Some(symbol),
            _ => None,
        })
        .collect()
}

fn last_frames(panel: &MockDriver) -> Vec<DisplayFrame> {
    panel.state().lock().unwrap().frames.iter().cloned().collect()
}

fn region(frame: &DisplayFrame, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> Vec<Option<PanelColor>> {
    y.flat_map(|yy| x.clone().map(move |xx| (xx, yy)))
        .map(|(xx, yy)| frame.ink_at(xx, yy))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_pass_keeps_configured_order_despite_failures() {
    let dir = tempfile::tempdir().unwrap();
    let (_trigger, signal) = shutdown_channel();
    let stock = FakeStock { failing: ["BBB".to_string()].into(), ..Default::default() };
    let mut rig = rig(
        settings(dir.path(), &["CCC", "BBB", "AAA"]),
        stock.clone(),
        None,
        Box::new(ExchangeCalendar),
        nine_am(),
        signal,
    );

    rig.refresh.verify().await.unwrap();
    assert_eq!(rig.refresh.state(), LoopState::Ready);

    for _ in 0..2 {
        let pass = rig.refresh.run_pass().await;
        assert!(!pass.interrupted);
        let order: Vec<&str> = pass.outcomes.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, ["CCC", "BBB", "AAA"]);
        assert_eq!(pass.outcomes[0].1, TickOutcome::Displayed);
        assert!(matches!(pass.outcomes[1].1, TickOutcome::Skipped(SkipReason::Quote(_))));
        assert_eq!(pass.outcomes[2].1, TickOutcome::Displayed);
    }

    assert_eq!(stock.calls(), ["CCC", "BBB", "AAA", "CCC", "BBB", "AAA"]);
    assert_eq!(pushed(&rig.panel), ["CCC", "AAA", "CCC", "AAA"]);
    assert_eq!(&rig.panel.ops()[..2], &[DisplayOp::Init, DisplayOp::Clear]);
    assert_eq!(rig.refresh.state(), LoopState::Sleeping);
    assert!(dir.path().join("CCC.bmp").exists());
    assert!(!dir.path().join("BBB.bmp").exists());
}

#[tokio::test(start_paused = true)]
async fn test_weather_refetched_only_when_stale() {
    let dir = tempfile::tempdir().unwrap();
    let (_trigger, signal) = shutdown_channel();
    let mut cfg = settings(dir.path(), &["AAA", "BBB", "CCC"]);
    cfg.weather = Some(hourly_weather());
    let weather = FakeWeather::scripted(&[Some(18), Some(22)]);
    let clock = nine_am();
    let mut rig = rig(cfg, FakeStock::default(), Some(weather.clone()), Box::new(ExchangeCalendar), clock.clone(), signal);

    rig.refresh.verify().await.unwrap();
    assert_eq!(weather.calls(), 1);

    rig.refresh.run_pass().await;
    assert_eq!(weather.calls(), 1);

    clock.advance(chrono::Duration::minutes(59));
    rig.refresh.run_pass().await;
    assert_eq!(weather.calls(), 1);
    assert_eq!(rig.refresh.cache().weather().map(|w| w.temperature_c), Some(18));

    // due exactly at the interval, and only once for the three symbols
    clock.advance(chrono::Duration::minutes(1));
    rig.refresh.run_pass().await;
    assert_eq!(weather.calls(), 2);
    assert_eq!(rig.refresh.cache().weather().map(|w| w.temperature_c), Some(22));
}

#[tokio::test(start_paused = true)]
async fn test_weather_failure_keeps_rendered_temperature() {
    let dir = tempfile::tempdir().unwrap();
    let (_trigger, signal) = shutdown_channel();
    let mut cfg = settings(dir.path(), &["AAA"]);
    cfg.weather = Some(hourly_weather());
    let weather = FakeWeather::scripted(&[Some(21), None]);
    let clock = nine_am();
    let mut rig = rig(cfg, FakeStock::default(), Some(weather.clone()), Box::new(ExchangeCalendar), clock.clone(), signal);

    rig.refresh.verify().await.unwrap();
    rig.refresh.run_pass().await;

    clock.advance(chrono::Duration::hours(2));
    let pass = rig.refresh.run_pass().await;
    assert_eq!(pass.outcomes[0].1, TickOutcome::Displayed);
    assert_eq!(weather.calls(), 2);
    assert_eq!(rig.refresh.cache().weather().map(|w| w.temperature_c), Some(21));

    let frames = last_frames(&rig.panel);
    let (before, after) = (&frames[frames.len() - 2], &frames[frames.len() - 1]);
    let temp_before = region(before, 580..700, 55..75);
    let temp_after = region(after, 580..700, 55..75);
    assert!(temp_before.contains(&Some(PanelColor::Black)));
    assert_eq!(temp_before, temp_after);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_runs_every_shutdown_step() {
    let dir = tempfile::tempdir().unwrap();
    let (trigger, signal) = shutdown_channel();
    let stock = FakeStock { stop_on_call: Some((2, trigger)), ..Default::default() };
    let mut rig = rig(
        settings(dir.path(), &["AAA", "BBB"]),
        stock,
        None,
        Box::new(ExchangeCalendar),
        nine_am(),
        signal,
    );
    let states = rig.refresh.subscribe_state();

    rig.refresh.verify().await.unwrap();
    std::fs::write(dir.path().join("stray.png"), b"x").unwrap();
    rig.panel.state().lock().unwrap().simulate_clear_failure = true;

    let report = rig.refresh.run().await;

    assert_eq!(report.attempted(), ShutdownStep::ORDER.to_vec());
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].step, ShutdownStep::ClearDisplay);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // BBB was interrupted mid-tick and never reached the panel
    assert_eq!(pushed(&rig.panel), ["AAA"]);
    let ops = rig.panel.ops();
    assert_eq!(&ops[ops.len() - 3..], &[DisplayOp::Clear, DisplayOp::Sleep, DisplayOp::Release]);
    let state = rig.panel.state();
    let state = state.lock().unwrap();
    assert!(state.is_asleep);
    assert!(!state.is_initialized);
    assert_eq!(*states.borrow(), LoopState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_during_pause() {
    let dir = tempfile::tempdir().unwrap();
    let (trigger, signal) = shutdown_channel();
    let mut rig = rig(
        settings(dir.path(), &["AAA"]),
        FakeStock::default(),
        None,
        Box::new(ExchangeCalendar),
        nine_am(),
        signal,
    );
    rig.refresh.verify().await.unwrap();

    let interrupt = async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.trigger();
    };
    let started = tokio::time::Instant::now();
    let (pass, ()) = tokio::join!(rig.refresh.run_pass(), interrupt);

    assert!(pass.interrupted);
    assert_eq!(pass.outcomes, vec![("AAA".to_string(), TickOutcome::Displayed)]);
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_verify_failures_are_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let (_t, signal) = shutdown_channel();
    let stock = FakeStock { unknown: ["NOPE".to_string()].into(), ..Default::default() };
    let mut r = rig(settings(dir.path(), &["AAA", "NOPE"]), stock, None, Box::new(ExchangeCalendar), nine_am(), signal);
    assert!(matches!(r.refresh.verify().await, Err(StartupError::InvalidSymbol { symbol, .. }) if symbol == "NOPE"));
    assert_eq!(r.refresh.state(), LoopState::Stopped);
    assert!(r.panel.ops().is_empty());

    let (_t, signal) = shutdown_channel();
    let panel = MockDriver::new_with_size(800, 480);
    let parts = Collaborators {
        stock: FakeStock::default(),
        weather: None::<FakeWeather>,
        probe: FakeProbe(false),
        calendar: Box::new(ExchangeCalendar),
        clock: Box::new(nine_am()),
        driver: Box::new(panel.clone()),
    };
    let mut offline = RefreshLoop::new(settings(dir.path(), &["AAA"]), parts, signal);
    assert!(matches!(offline.verify().await, Err(StartupError::NetworkUnreachable)));
    assert!(panel.ops().is_empty());

    let (_t, signal) = shutdown_channel();
    let mut cfg = settings(dir.path(), &["AAA"]);
    cfg.market = Some(MarketSettings { name: "MOON".into(), timezone: "America/New_York".into() });
    let mut r = rig(cfg, FakeStock::default(), None, Box::new(ExchangeCalendar), nine_am(), signal);
    assert!(matches!(r.refresh.verify().await, Err(StartupError::Market(MarketError::UnknownMarket(_)))));

    let (_t, signal) = shutdown_channel();
    let mut cfg = settings(dir.path(), &["AAA"]);
    cfg.weather = Some(hourly_weather());
    let weather = FakeWeather::scripted(&[None]);
    let mut r = rig(cfg, FakeStock::default(), Some(weather), Box::new(ExchangeCalendar), nine_am(), signal);
    assert!(matches!(r.refresh.verify().await, Err(StartupError::Weather(_))));

    let (_t, signal) = shutdown_channel();
    let r = rig(settings(dir.path(), &["AAA"]), FakeStock::default(), None, Box::new(ExchangeCalendar), nine_am(), signal);
    r.panel.state().lock().unwrap().simulate_init_failure = true;
    let mut refresh = r.refresh;
    assert!(matches!(refresh.verify().await, Err(StartupError::DisplayInit(_))));
}

#[tokio::test(start_paused = true)]
async fn test_chart_failure_uses_previous_artifact_or_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let (_trigger, signal) = shutdown_channel();
    let stock = FakeStock { no_history: ["AAA".to_string()].into(), ..Default::default() };
    let mut rig = rig(settings(dir.path(), &["AAA"]), stock, None, Box::new(ExchangeCalendar), nine_am(), signal);
    rig.refresh.verify().await.unwrap();

    let pass = rig.refresh.run_pass().await;
    assert_eq!(pass.outcomes[0].1, TickOutcome::DisplayedDegraded);

    // an artifact from an earlier run is still good enough
    std::fs::write(dir.path().join("AAA.bmp"), bmp::encode_rgb24(40, 20, &vec![[0, 0, 255]; 800])).unwrap();
    let pass = rig.refresh.run_pass().await;
    assert_eq!(pass.outcomes[0].1, TickOutcome::Displayed);
    let frames = last_frames(&rig.panel);
    assert_eq!(frames.last().and_then(|f| f.ink_at(371, 236)), Some(PanelColor::Blue));
}

#[tokio::test(start_paused = true)]
async fn test_market_error_falls_back_to_last_known() {
    let dir = tempfile::tempdir().unwrap();
    let (_trigger, signal) = shutdown_channel();
    let mut cfg = settings(dir.path(), &["AAA"]);
    cfg.market = Some(MarketSettings { name: "NYSE".into(), timezone: "America/New_York".into() });
    let market = FixedMarket::new(Ok(true));
    let mut rig = rig(cfg, FakeStock::default(), None, Box::new(market.clone()), nine_am(), signal);

    rig.refresh.verify().await.unwrap();
    market.set(Err(MarketError::UnknownMarket("NYSE".into())));
    let pass = rig.refresh.run_pass().await;
    assert_eq!(pass.outcomes[0].1, TickOutcome::Displayed);

    let frames = last_frames(&rig.panel);
    let label = region(frames.last().unwrap(), 580..720, 161..181);
    assert!(label.contains(&Some(PanelColor::Green)));
    assert!(!label.contains(&Some(PanelColor::Red)));
}

#[test]
fn test_nyse_closed_on_weekend() {
    let calendar = ExchangeCalendar;
    // Saturday 2024-05-11, every hour
    for hour in 0..24 {
        let at = Utc.with_ymd_and_hms(2024, 5, 11, hour, 30, 0).unwrap();
        assert_eq!(calendar.is_open_at("NYSE", "America/New_York", at), Ok(false));
    }
}
