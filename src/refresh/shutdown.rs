/*
 *  refresh/shutdown.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Operator interrupt plumbing and the cleanup sequence
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

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use thiserror::Error;
use tokio::sync::watch;

use crate::chart;
use crate::display::DisplayDriver;

/// Raises the interrupt, held by the signal handler.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes the interrupt, held by the loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once triggered; never, if every trigger is gone.
    pub async fn triggered(&mut self) {
        if self.rx.wait_for(|&raised| raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

/// Run `fut` unless the interrupt comes first, `None` when interrupted.
pub async fn until_shutdown<F: Future>(signal: &mut ShutdownSignal, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = signal.triggered() => None,
        out = fut => Some(out),
    }
}

/// Cleanup steps, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    RemoveArtifacts,
    ClearDisplay,
    SleepDisplay,
    ReleaseResources,
}

impl ShutdownStep {
    pub const ORDER: [ShutdownStep; 4] = [
        ShutdownStep::RemoveArtifacts,
        ShutdownStep::ClearDisplay,
        ShutdownStep::SleepDisplay,
        ShutdownStep::ReleaseResources,
    ];
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{step:?} failed: {reason}")]
pub struct ShutdownStepError {
    pub step: ShutdownStep,
    pub reason: String,
}

/// One entry per attempted step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub steps: Vec<(ShutdownStep, Result<(), ShutdownStepError>)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> Vec<&ShutdownStepError> {
        self.steps.iter().filter_map(|(_, r)| r.as_ref().err()).collect()
    }

    pub fn attempted(&self) -> Vec<ShutdownStep> {
        self.steps.iter().map(|(s, _)| *s).collect()
    }
}

/// Empty the artifact directory and put the panel to rest.
///
/// Every step runs even when an earlier one failed.
pub fn run_cleanup(graph_path: &Path, driver: &mut dyn DisplayDriver) -> ShutdownReport {
    let mut report = ShutdownReport::default();
    for step in ShutdownStep::ORDER {
        let result = match step {
            ShutdownStep::RemoveArtifacts => chart::remove_artifacts(graph_path)
                .map(|n| info!("{} files in {} are removed", n, graph_path.display()))
                .map_err(|e| e.to_string()),
            ShutdownStep::ClearDisplay => driver.clear().map_err(|e| e.to_string()),
            ShutdownStep::SleepDisplay => driver.sleep().map_err(|e| e.to_string()),
            ShutdownStep::ReleaseResources => driver.release_resources().map_err(|e| e.to_string()),
        };
        let result = result.map_err(|reason| ShutdownStepError { step, reason });
        match &result {
            Ok(()) => info!("Shutdown step {:?} done", step),
            Err(e) => error!("{}", e),
        }
        report.steps.push((step, result));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayOp, MockDriver};
    use std::time::Duration;

    #[tokio::test]
    async fn test_until_shutdown() {
        let (trigger, mut signal) = shutdown_channel();
        assert_eq!(until_shutdown(&mut signal, async { 7 }).await, Some(7));

        trigger.trigger();
        assert!(signal.is_triggered());
        let slow = tokio::time::sleep(Duration::from_secs(3600));
        assert_eq!(until_shutdown(&mut signal, slow).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trigger_never_fires() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);
        let out = until_shutdown(&mut signal, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "done"
        })
        .await;
        assert_eq!(out, Some("done"));
    }

    #[test]
    fn test_cleanup_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AAPL.bmp"), b"x").unwrap();
        let mut driver = MockDriver::new_with_size(8, 8);
        {
            let state = driver.state();
            let mut s = state.lock().unwrap();
            s.simulate_clear_failure = true;
            s.simulate_sleep_failure = true;
        }

        let report = run_cleanup(dir.path(), &mut driver);
        assert_eq!(report.attempted(), ShutdownStep::ORDER.to_vec());
        assert!(!report.is_clean());
        assert_eq!(report.failures().len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(driver.ops(), vec![DisplayOp::Clear, DisplayOp::Sleep, DisplayOp::Release]);
    }
}
