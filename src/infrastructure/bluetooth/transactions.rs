//! Named Transactions
//!
//! Each transaction is a tokio task paired with a cancellation token and
//! registered under its [`TransactionId`], so teardown can cancel it by name.

use crate::infrastructure::bluetooth::protocol::TransactionId;
use std::collections::HashMap;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Transaction {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct TransactionRegistry {
    transactions: HashMap<TransactionId, Transaction>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` under `id`, cancelling any transaction already using it.
    pub fn start<F>(&mut self, id: TransactionId, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel(id);

        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => debug!(transaction = %id, "Transaction cancelled"),
                _ = work => debug!(transaction = %id, "Transaction finished"),
            }
        });

        debug!(transaction = %id, "Transaction started");
        self.transactions.insert(id, Transaction { token, handle });
    }

    /// Cancel the transaction registered under `id`.
    ///
    /// Returns `true` if it was still running. Unknown or finished
    /// transactions are a no-op.
    pub fn cancel(&mut self, id: TransactionId) -> bool {
        match self.transactions.remove(&id) {
            Some(transaction) => {
                let running = !transaction.handle.is_finished();
                transaction.token.cancel();
                running
            }
            None => false,
        }
    }

    /// Cancel every transaction and return the ones that were still running.
    pub fn cancel_all(&mut self) -> Vec<TransactionId> {
        TransactionId::ALL
            .into_iter()
            .filter(|id| self.cancel(*id))
            .collect()
    }

    pub fn is_active(&self, id: TransactionId) -> bool {
        self.transactions
            .get(&id)
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Transactions that have not finished, in identifier order.
    pub fn active(&self) -> Vec<TransactionId> {
        TransactionId::ALL
            .into_iter()
            .filter(|id| self.is_active(*id))
            .collect()
    }
}

impl Drop for TransactionRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
