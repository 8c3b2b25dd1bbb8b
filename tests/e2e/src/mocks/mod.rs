//! Scripted provider adapters for journey tests.

mod adapters;

pub use adapters::{ScriptedAdapter, ScriptedResponse, engine_for, public_descriptor};
