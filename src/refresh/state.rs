/*
 *  refresh/state.rs
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

use std::time::Instant;

use tokio::sync::watch;

/// Refresh loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Verifying,
    Ready,
    ProcessingSymbol,
    Sleeping,
    ShuttingDown,
    Stopped,
}

impl LoopState {
    /// Whether `self -> next` is a legal move.
    pub fn can_transition(self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (Initializing, Verifying)
                | (Verifying, Ready)
                | (Verifying, Stopped)
                | (Ready, ProcessingSymbol)
                | (ProcessingSymbol, Sleeping)
                | (Sleeping, ProcessingSymbol)
                | (Ready | Verifying | ProcessingSymbol | Sleeping, ShuttingDown)
                | (ShuttingDown, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LoopState::Stopped
    }
}

/// Current state, published on a watch channel for observers.
#[derive(Debug)]
pub struct StateMachine {
    tx: watch::Sender<LoopState>,
    entered: Instant,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoopState::Initializing);
        Self { tx, entered: Instant::now() }
    }

    pub fn current(&self) -> LoopState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.tx.subscribe()
    }

    /// Move to `next`. Returns false, and stays put, on an illegal move.
    pub fn transition(&mut self, next: LoopState) -> bool {
        let current = self.current();
        if current == next {
            return true;
        }
        if !current.can_transition(next) {
            log::warn!("Ignoring loop state change {:?} -> {:?}", current, next);
            return false;
        }
        log::info!("Loop state changed: {:?} -> {:?} after {:?}", current, next, self.entered.elapsed());
        self.tx.send_replace(next);
        self.entered = Instant::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut sm = StateMachine::new();
        for next in [
            LoopState::Verifying,
            LoopState::Ready,
            LoopState::ProcessingSymbol,
            LoopState::Sleeping,
            LoopState::ProcessingSymbol,
            LoopState::ShuttingDown,
            LoopState::Stopped,
        ] {
            assert!(sm.transition(next), "{:?}", next);
        }
        assert!(sm.current().is_terminal());
    }

    #[test]
    fn test_illegal_moves_rejected() {
        let mut sm = StateMachine::new();
        assert!(!sm.transition(LoopState::ProcessingSymbol));
        assert_eq!(sm.current(), LoopState::Initializing);
        assert!(!LoopState::Stopped.can_transition(LoopState::Ready));
        assert!(!LoopState::ShuttingDown.can_transition(LoopState::Sleeping));
    }

    #[test]
    fn test_observers_see_changes() {
        let mut sm = StateMachine::new();
        let rx = sm.subscribe();
        sm.transition(LoopState::Verifying);
        assert_eq!(*rx.borrow(), LoopState::Verifying);
    }
}
