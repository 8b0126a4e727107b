//! Transaction composition, fee estimation, signing, submission and
//! confirmation.
//!
//! One attempt runs `Composing -> FeeEstimated -> Signed -> Submitted` and
//! ends `Confirmed`, `Failed` or `Expired`. An expired blockhash restarts
//! the attempt from `Composing` with a fresh one, up to
//! `max_blockhash_retries` times.

use std::fmt;

use chain_sol::{Instruction, Keypair, Message, Pubkey, Signature, SolError, Transaction};
use cryptoscore_layout::{ProgramError, ProgramIds};
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::retry::with_retry;
use crate::transport::{
    LatestBlockhash, TransactionFailure, TransactionStatus, Transport, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TxState {
    Composing,
    FeeEstimated,
    Signed,
    Submitted,
    Confirmed,
    Failed,
    Expired,
}

impl TxState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::Confirmed | TxState::Failed | TxState::Expired)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Composing => "composing",
            TxState::FeeEstimated => "fee-estimated",
            TxState::Signed => "signed",
            TxState::Submitted => "submitted",
            TxState::Confirmed => "confirmed",
            TxState::Failed => "failed",
            TxState::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// Network fee for one composed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
    pub lamports: u64,
    pub signatures: u8,
}

/// Result of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub signature: Signature,
    pub fee: FeeEstimate,
    /// Blockhash refreshes spent before the confirmed attempt.
    pub blockhash_refreshes: u32,
    pub slot: u64,
    pub status: TxState,
}

enum Landing {
    Confirmed { slot: u64 },
    Expired,
}

enum Broadcast {
    Accepted,
    StaleBlockhash,
}

/// Builds and drives a single transaction.
pub struct TransactionBuilder<'a> {
    transport: &'a dyn Transport,
    config: &'a ClientConfig,
    fee_payer: Pubkey,
    instructions: Vec<Instruction>,
    state: TxState,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(transport: &'a dyn Transport, config: &'a ClientConfig, fee_payer: Pubkey) -> Self {
        Self {
            transport,
            config,
            fee_payer,
            instructions: Vec::new(),
            state: TxState::Composing,
        }
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn add_instructions(&mut self, instructions: impl IntoIterator<Item = Instruction>) -> &mut Self {
        self.instructions.extend(instructions);
        self
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    fn transition(&mut self, next: TxState) {
        debug!(from = %self.state, to = %next, "transaction state");
        self.state = next;
    }

    /// Compose against a fresh blockhash and price the result without
    /// signing or sending anything.
    pub async fn estimate_fee(&mut self) -> Result<FeeEstimate, ClientError> {
        let (message, _) = self.compose().await?;
        self.estimate(&message).await
    }

    async fn compose(&mut self) -> Result<(Message, LatestBlockhash), ClientError> {
        self.transition(TxState::Composing);
        let transport = self.transport;
        let latest = with_retry(&self.config.retry, "get_latest_blockhash", || {
            transport.get_latest_blockhash()
        })
        .await?;
        let message = Message::compile(&self.instructions, &self.fee_payer, latest.blockhash)?;
        Ok((message, latest))
    }

    async fn estimate(&mut self, message: &Message) -> Result<FeeEstimate, ClientError> {
        let bytes = message.serialize()?;
        let transport = self.transport;
        let lamports = with_retry(&self.config.retry, "get_fee_for_message", || {
            transport.get_fee_for_message(&bytes)
        })
        .await
        .map_err(|e| match e {
            ClientError::Transient {
                attempts, source, ..
            } => ClientError::FeeEstimationUnavailable { attempts, source },
            other => other,
        })?;
        self.transition(TxState::FeeEstimated);
        Ok(FeeEstimate {
            lamports,
            signatures: message.num_required_signatures,
        })
    }

    fn sign(&mut self, message: Message, signers: &[&Keypair]) -> Result<Transaction, ClientError> {
        let tx = Transaction::sign(message, signers)?;
        self.transition(TxState::Signed);
        Ok(tx)
    }

    /// Run the full pipeline until the transaction is confirmed or fails.
    ///
    /// Cancelling `cancel` stops confirmation polling only. A transaction
    /// already broadcast is not withdrawn and may still land.
    pub async fn send_and_confirm(
        &mut self,
        signers: &[&Keypair],
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome, ClientError> {
        let max_refreshes = self.config.max_blockhash_retries;
        let mut refreshes = 0;
        loop {
            let (message, latest) = self.compose().await?;
            let fee = self.estimate(&message).await?;
            let tx = self.sign(message, signers)?;
            let signature = tx.signature().copied().ok_or_else(|| {
                ClientError::Compose(SolError::TransactionBuildError(
                    "transaction has no signatures".into(),
                ))
            })?;

            let landing = match self.submit(&tx).await {
                Ok(Broadcast::Accepted) => self.confirm(&tx, &signature, &latest, cancel).await,
                Ok(Broadcast::StaleBlockhash) => Ok(Landing::Expired),
                Err(e) => Err(e),
            };

            match landing {
                Ok(Landing::Confirmed { slot }) => {
                    self.transition(TxState::Confirmed);
                    info!(%signature, slot, fee = fee.lamports, refreshes, "transaction confirmed");
                    return Ok(SubmitOutcome {
                        signature,
                        fee,
                        blockhash_refreshes: refreshes,
                        slot,
                        status: TxState::Confirmed,
                    });
                }
                Ok(Landing::Expired) => {
                    self.transition(TxState::Expired);
                    if refreshes >= max_refreshes {
                        warn!(%signature, refreshes, "blockhash expired, giving up");
                        return Err(ClientError::Expired { refreshes });
                    }
                    refreshes += 1;
                    warn!(
                        %signature,
                        refresh = refreshes,
                        max_refreshes,
                        "blockhash expired, recomposing"
                    );
                }
                Err(e) => {
                    if matches!(e, ClientError::Program { .. } | ClientError::TransactionFailed(_)) {
                        self.transition(TxState::Failed);
                        warn!(%signature, error = %e, "transaction failed");
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn submit(&mut self, tx: &Transaction) -> Result<Broadcast, ClientError> {
        let wire = tx.serialize()?;
        let transport = self.transport;
        let sent = with_retry(&self.config.retry, "send_transaction", || {
            transport.send_transaction(&wire)
        })
        .await;
        match sent {
            Ok(_) => {
                self.transition(TxState::Submitted);
                Ok(Broadcast::Accepted)
            }
            Err(ClientError::Transport {
                source: TransportError::BlockhashNotFound,
                ..
            }) => Ok(Broadcast::StaleBlockhash),
            Err(ClientError::Transport {
                source: TransportError::Rejected(failure),
                ..
            }) => Err(map_failure(&self.config.programs, &tx.message, failure)),
            Err(e) => Err(e),
        }
    }

    /// Poll until the signature lands, fails, or its blockhash ages out.
    async fn confirm(
        &mut self,
        tx: &Transaction,
        signature: &Signature,
        latest: &LatestBlockhash,
        cancel: &CancellationToken,
    ) -> Result<Landing, ClientError> {
        let deadline = Instant::now() + self.config.confirm_timeout();
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled {
                    signature: *signature,
                });
            }

            match self.transport.get_signature_status(signature).await {
                Ok(TransactionStatus::Confirmed { slot }) => return Ok(Landing::Confirmed { slot }),
                Ok(TransactionStatus::Failed(failure)) => {
                    return Err(map_failure(&self.config.programs, &tx.message, failure))
                }
                Ok(TransactionStatus::Pending) => match self.transport.get_block_height().await {
                    Ok(height) if height > latest.last_valid_block_height => {
                        // It may have landed between the two reads.
                        match self.transport.get_signature_status(signature).await {
                            Ok(TransactionStatus::Confirmed { slot }) => {
                                return Ok(Landing::Confirmed { slot })
                            }
                            Ok(TransactionStatus::Failed(failure)) => {
                                return Err(map_failure(&self.config.programs, &tx.message, failure))
                            }
                            Ok(TransactionStatus::Pending) => return Ok(Landing::Expired),
                            Err(e) => {
                                debug!(%signature, error = %e, "status recheck failed, polling again")
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "block height unavailable"),
                },
                Err(e) if e.is_transient() => {
                    debug!(%signature, error = %e, "status poll failed, polling again");
                }
                Err(e) => {
                    return Err(ClientError::Transport {
                        operation: "get_signature_status",
                        source: e,
                    })
                }
            }

            if Instant::now() >= deadline {
                return Err(ClientError::ConfirmationTimeout {
                    signature: *signature,
                    timeout_secs: self.config.confirm_timeout_secs,
                });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ClientError::Cancelled { signature: *signature });
                }
                _ = sleep(self.config.poll_interval()) => {}
            }
        }
    }
}

/// Attribute a ledger failure to the program that raised it.
fn map_failure(programs: &ProgramIds, message: &Message, failure: TransactionFailure) -> ClientError {
    let (instruction_index, code) = match failure {
        TransactionFailure::Custom {
            instruction_index,
            code,
        } => (instruction_index, code),
        other => return ClientError::TransactionFailed(other),
    };
    let program = message
        .instructions
        .get(usize::from(instruction_index))
        .and_then(|ix| message.account_keys.get(usize::from(ix.program_id_index)))
        .and_then(|id| programs.kind_of(id));
    match program {
        Some(program) => ClientError::Program {
            program,
            instruction_index,
            error: ProgramError::from_code(program, code),
        },
        None => ClientError::TransactionFailed(TransactionFailure::Custom {
            instruction_index,
            code,
        }),
    }
}
