//! End-to-end test support for the fabsearch workspace.
//!
//! Provides scripted provider adapters with call counters so journey tests
//! can assert exactly which upstreams were contacted.

pub mod mocks;
