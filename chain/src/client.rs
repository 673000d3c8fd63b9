//! The chain-client trait and the sending account handle.

use futures_util::stream::BoxStream;
use std::fmt;
use std::future::Future;
use vestdrop_types::{Amount, Call, TxStatus};
use zeroize::Zeroizing;

use crate::error::ChainError;

/// Lifecycle events for one submitted transaction, in arrival order.
///
/// The stream ends when the chain stops reporting on the transaction; it
/// may also stay pending forever, so consumers must bound their wait.
pub type TxStatusStream = BoxStream<'static, TxStatus>;

/// The account funds are sent from.
///
/// `signer` is the key reference the node-side signer resolves (a secret
/// URI such as `//Alice` on development chains). It is wiped on drop and
/// never printed.
#[derive(Clone)]
pub struct SenderAccount {
    pub address: String,
    signer: Zeroizing<String>,
}

impl SenderAccount {
    pub fn new(address: impl Into<String>, signer: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            signer: Zeroizing::new(signer.into()),
        }
    }

    pub fn signer(&self) -> &str {
        &self.signer
    }
}

impl fmt::Debug for SenderAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderAccount")
            .field("address", &self.address)
            .field("signer", &"<redacted>")
            .finish()
    }
}

/// Opaque transaction-submission service.
pub trait ChainClient: Send + Sync {
    /// Free balance of `account`, in base units.
    fn free_balance(&self, account: &str) -> impl Future<Output = Result<Amount, ChainError>> + Send;

    /// Sign `call` as `sender`, submit it, and subscribe to its lifecycle events.
    fn submit_and_watch(
        &self,
        sender: &SenderAccount,
        call: &Call,
    ) -> impl Future<Output = Result<TxStatusStream, ChainError>> + Send;
}
