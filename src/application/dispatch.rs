use tracing::error;

use crate::domain::{AccountId, CreditRequest, DebitRequest, Statement, TransferKey};

use super::{CreditReceipt, DebitReceipt, LedgerEngine, LedgerError};

/// One ledger operation, as handed over by a request handler.
#[derive(Debug, Clone)]
pub enum LedgerCommand {
    Credit(CreditRequest),
    Debit(DebitRequest),
    Statement(AccountId),
    EnsureTransferKey(AccountId),
}

#[derive(Debug, Clone)]
pub enum LedgerOutcome {
    Credited(CreditReceipt),
    Debited(DebitReceipt),
    Statement(Statement),
    TransferKey(TransferKey),
}

impl LedgerEngine {
    /// Run a command on the current task.
    pub async fn execute(&self, command: LedgerCommand) -> Result<LedgerOutcome, LedgerError> {
        match command {
            LedgerCommand::Credit(request) => {
                self.apply_credit(request).await.map(LedgerOutcome::Credited)
            }
            LedgerCommand::Debit(request) => {
                self.apply_debit(request).await.map(LedgerOutcome::Debited)
            }
            LedgerCommand::Statement(account_id) => {
                self.statement(account_id).await.map(LedgerOutcome::Statement)
            }
            LedgerCommand::EnsureTransferKey(account_id) => self
                .ensure_transfer_key(account_id)
                .await
                .map(LedgerOutcome::TransferKey),
        }
    }

    /// Run a command on its own task and wait for its single result, so a
    /// slow unit never stalls the caller's task. The unit keeps running to
    /// commit or rollback even if the caller stops waiting.
    pub async fn dispatch(&self, command: LedgerCommand) -> Result<LedgerOutcome, LedgerError> {
        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.execute(command).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(error = %join_err, "Ledger task did not complete");
                Err(LedgerError::Internal(format!("ledger task failed: {join_err}")))
            }
        }
    }
}
