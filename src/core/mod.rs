// src/core/mod.rs — Governor core: session, guardrails, sequencing

pub mod clock;
pub mod governor;
pub mod guardrails;
pub mod sequencer;
pub mod session;
pub mod types;

pub use governor::{Dispatch, Governor};
