//! Chain-client boundary for vestdrop.
//!
//! The distributor treats the chain as an opaque transaction-submission
//! service: it hands over a call plus the sending account, and receives a
//! stream of lifecycle events for that one transaction. [`ChainClient`] is
//! that seam; [`RpcChainClient`] implements it against a node's signing
//! relay over JSON-RPC.

pub mod client;
pub mod error;
pub mod rpc;

pub use client::{ChainClient, SenderAccount, TxStatusStream};
pub use error::ChainError;
pub use rpc::RpcChainClient;
