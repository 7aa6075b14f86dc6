//! `cadence-hooks`: middleware hooks around scheduler, queue and cache events.
//!
//! Instrumentation is registered on a [`HookEngineBuilder`] when the process
//! starts and the frozen [`HookEngine`] is injected into each component.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{HookEngine, HookEngineBuilder};
pub use error::{HookError, Result};
pub use types::{
    HookAction, HookContext, HookDefinition, HookEvent, HookHandler, HookResult, HookTiming,
};
