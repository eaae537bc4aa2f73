//! Deterministic control plane for multi-agent task orchestration.
//!
//! The heart of the crate is [`state_machine::transition`], a pure function
//! from a [`Snapshot`](state_machine::Snapshot) and an [`Event`](state_machine::Event)
//! to the next snapshot plus the [`Command`](state_machine::Command)s that
//! collaborators should carry out. [`StateMachine`](state_machine::StateMachine)
//! wraps it with an owned snapshot, and [`runtime`] serializes events arriving
//! from many senders onto one instance.

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod ranking;
pub mod runtime;
pub mod state_machine;
pub mod ui;

pub use error::{EpicflowError, Result};
