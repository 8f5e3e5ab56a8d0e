//! # Operation State (`common::archive::state`)
//!
//! File: cli/src/common/archive/state.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Every archive operation is a linear pipeline:
//!
//! ```text
//! Validating ──▶ Streaming ──▶ Finalizing ──▶ Done
//!      │             │              │
//!      └─────────────┴──────────────┴──▶ Failed { at, kind }
//! ```
//!
//! `Operation` tracks where an operation is and logs each transition. Stages
//! only move forward and `Failed` is terminal.
//!
use crate::core::error::{ArchiveError, ErrorKind};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Validating,
    Streaming,
    Finalizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating inputs",
            Stage::Streaming => "streaming",
            Stage::Finalizing => "finalizing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Active(Stage),
    Failed { at: Stage, kind: ErrorKind },
}

#[derive(Debug)]
pub struct Operation {
    name: &'static str,
    state: State,
    started: Instant,
}

impl Operation {
    pub fn begin(name: &'static str) -> Self {
        debug!("{}: {}", name, Stage::Validating);
        Self {
            name,
            state: State::Active(Stage::Validating),
            started: Instant::now(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> State {
        self.state
    }

    /// Moves to `next`. Backward moves and moves out of `Failed` are bugs:
    /// they panic in debug builds and are ignored otherwise.
    pub fn advance(&mut self, next: Stage) {
        match self.state {
            State::Active(current) if next > current => {
                debug!("{}: {} -> {}", self.name, current, next);
                self.state = State::Active(next);
                if next == Stage::Done {
                    info!("{} finished in {:.2?}", self.name, self.started.elapsed());
                }
            }
            state => {
                debug_assert!(false, "invalid transition from {:?} to {:?}", state, next);
            }
        }
    }

    /// Records `err` as the terminal state and hands it back for propagation.
    pub fn fail(&mut self, err: ArchiveError) -> ArchiveError {
        if let State::Active(at) = self.state {
            error!("{} failed while {}: {}", self.name, at, err);
            self.state = State::Failed {
                at,
                kind: err.kind(),
            };
        }
        err
    }
}
