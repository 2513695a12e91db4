//! Utterance endpointing state machine and its per-session scheduler

mod action;
mod callbacks;
mod manager;
mod scheduler;
mod state;


pub use action::{ActionId, CancelOutcome, InFlightAction, TurnAction};
pub use callbacks::{
    FinalCallback, FinalizedUtterance, InterruptCallback, PartialCallback, StateCallback,
    UtteranceCallbacks,
};
pub use manager::UtteranceManager;
pub use scheduler::{ManagerCommand, ManagerSnapshot, UtteranceScheduler};
pub use state::UtteranceState;
