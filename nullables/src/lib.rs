//! Nullable infrastructure for deterministic testing.
//!
//! The chain is the only external dependency the distributor talks to, so it
//! is the one abstracted here. [`NullChain`] never touches the network:
//! - it replays pre-scripted lifecycle events per submission
//! - it records every call it is asked to submit
//! - it can be told to hang (to exercise timeouts) or to fail at setup
//!
//! Usage: swap `RpcChainClient` for `NullChain` in tests.

pub mod chain;

pub use chain::{NullChain, Script};
