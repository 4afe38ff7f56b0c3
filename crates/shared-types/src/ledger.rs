//! # Ledger Gateway Ports
//!
//! The two call shapes the resilience layer consumes from the remote ledger:
//!
//! - **Read**: returns a decoded JSON value or raises.
//! - **Write**: returns a pending transaction whose `wait()` suspends until
//!   finality or raises on revert.
//!
//! Contract semantics stay behind these traits.

use crate::errors::LedgerResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A read-only contract call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRead {
    pub contract: String,
    pub method: String,
    pub args: serde_json::Value,
}

impl LedgerRead {
    pub fn new(contract: &str, method: &str, args: serde_json::Value) -> Self {
        Self {
            contract: contract.to_string(),
            method: method.to_string(),
            args,
        }
    }
}

/// A state-changing contract call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMutation {
    pub contract: String,
    pub method: String,
    pub args: serde_json::Value,
}

impl LedgerMutation {
    pub fn new(contract: &str, method: &str, args: serde_json::Value) -> Self {
        Self {
            contract: contract.to_string(),
            method: method.to_string(),
            args,
        }
    }
}

/// Confirmation of a finalized transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_id: Uuid,
    pub block_height: u64,
}

/// Handle for a submitted, not yet final, transaction.
#[async_trait]
pub trait PendingTransaction: Send {
    /// Identifier assigned at submission.
    fn tx_id(&self) -> Uuid;

    /// Suspend until the transaction is final.
    ///
    /// # Errors
    ///
    /// Raises the revert reason if the ledger rejects the transaction.
    async fn wait(self: Box<Self>) -> LedgerResult<TxReceipt>;
}

/// Opaque gateway to the remote ledger.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Execute a read call.
    async fn read(&self, call: LedgerRead) -> LedgerResult<serde_json::Value>;

    /// Submit a mutation and return its pending handle.
    async fn submit(&self, mutation: LedgerMutation) -> LedgerResult<Box<dyn PendingTransaction>>;

    /// Submit a mutation and wait for finality.
    async fn submit_and_wait(&self, mutation: LedgerMutation) -> LedgerResult<TxReceipt> {
        let pending = self.submit(mutation).await?;
        pending.wait().await
    }
}
