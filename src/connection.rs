//! Connection to the remote node: signer registry, submission, finalization
//!
//! The connection owns the JSON-RPC provider and a registry of signing
//! middlewares keyed by identity address. Submissions go through the
//! registered signer for the `from` address; the receipt wait polls under
//! a bounded deadline so a hung node surfaces as a timeout rather than
//! stalling the run indefinitely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, Log, TransactionRequest, TxHash, U256};
use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::constants::{
    FINALIZATION_TIMEOUT_SECONDS, MAX_TRANSPORT_ATTEMPTS, RECEIPT_POLL_INTERVAL_MILLIS,
    TRANSPORT_RETRY_BACKOFF_MILLIS,
};
use crate::contracts::CallObject;
use crate::error::{classify_rpc_error, HarnessError};
use crate::identity::Identity;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Confirmation record for a finalized submission.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: U256,
    /// False when the transaction was mined but its execution reverted.
    pub succeeded: bool,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Treat a mined-but-reverted receipt as a remote rejection.
    pub fn ensure_success(&self) -> Result<(), HarnessError> {
        if self.succeeded {
            return Ok(());
        }
        Err(HarnessError::Rejected {
            reason: format!("transaction {:?} reverted on-chain", self.tx_hash),
        })
    }
}

/// A submitted, not-yet-finalized state mutation. State mutated by this
/// submission must not be relied on until `wait_for_finalization` returns.
pub struct Submission<'a> {
    tx_hash: TxHash,
    connection: &'a Connection,
}

impl Submission<'_> {
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Poll for the receipt under a bounded deadline. Expiry yields a
    /// `Timeout` error distinct from a rejection; transport failures
    /// while polling propagate as fatal.
    pub async fn wait_for_finalization(&self) -> Result<Receipt, HarnessError> {
        let deadline = Duration::from_secs(FINALIZATION_TIMEOUT_SECONDS);

        timeout(deadline, self.poll_for_receipt())
            .await
            .map_err(|_| HarnessError::Timeout {
                tx_hash: format!("{:?}", self.tx_hash),
                timeout_seconds: FINALIZATION_TIMEOUT_SECONDS,
            })?
    }

    async fn poll_for_receipt(&self) -> Result<Receipt, HarnessError> {
        let interval = Duration::from_millis(RECEIPT_POLL_INTERVAL_MILLIS);

        loop {
            let lookup = self
                .connection
                .provider
                .get_transaction_receipt(self.tx_hash)
                .await
                .map_err(|e| classify_rpc_error(e.to_string()))?;

            if let Some(receipt) = lookup {
                let succeeded = receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false);
                debug!(
                    "Submission {:?} finalized in block {:?} (succeeded: {})",
                    self.tx_hash, receipt.block_number, succeeded
                );

                return Ok(Receipt {
                    tx_hash: receipt.transaction_hash,
                    block_number: receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
                    gas_used: receipt.gas_used.unwrap_or_default(),
                    succeeded,
                    logs: receipt.logs,
                });
            }

            sleep(interval).await;
        }
    }
}

/// Wrapper around the JSON-RPC endpoint holding the signer registry.
pub struct Connection {
    provider: Provider<Http>,
    chain_id: u64,
    signers: Mutex<HashMap<Address, Arc<SignerClient>>>,
}

impl Connection {
    /// Connect to the endpoint and read its chain id.
    pub async fn connect(rpc_url: &str) -> Result<Self, HarnessError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| HarnessError::Config(format!("invalid RPC URL {rpc_url}: {e}")))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| classify_rpc_error(e.to_string()))?
            .as_u64();

        info!("Connected to {} (chain id {})", rpc_url, chain_id);
        Self::with_chain_id(rpc_url, chain_id)
    }

    /// Build a connection for an already-known chain id, skipping the
    /// startup round trip. Performs no network I/O.
    pub fn with_chain_id(rpc_url: &str, chain_id: u64) -> Result<Self, HarnessError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| HarnessError::Config(format!("invalid RPC URL {rpc_url}: {e}")))?;

        Ok(Self {
            provider,
            chain_id,
            signers: Mutex::new(HashMap::new()),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Clone of the underlying provider, for building contract handles.
    pub fn provider(&self) -> Provider<Http> {
        self.provider.clone()
    }

    /// Register an identity's signing capability. Registering the same
    /// identity twice is a no-op.
    pub fn register_signer(&self, identity: &Identity) {
        let mut signers = self.signers.lock().expect("signer registry poisoned");

        if signers.contains_key(&identity.address) {
            debug!("Signer for {} already registered", identity.label);
            return;
        }

        let client = SignerMiddleware::new(self.provider.clone(), identity.wallet.clone());
        signers.insert(identity.address, Arc::new(client));
        info!("Registered signer for {} ({:?})", identity.label, identity.address);
    }

    fn signer_for(&self, from: Address) -> Result<Arc<SignerClient>, HarnessError> {
        let signers = self.signers.lock().expect("signer registry poisoned");
        signers.get(&from).cloned().ok_or_else(|| {
            HarnessError::Config(format!("no signer registered for {from:?}"))
        })
    }

    /// Submit a state-mutating call from a registered identity.
    ///
    /// Transport-classified failures are retried a bounded number of
    /// times; a remote rejection is returned on the first occurrence.
    pub async fn submit(
        &self,
        call: &CallObject,
        from: Address,
    ) -> Result<Submission<'_>, HarnessError> {
        let client = self.signer_for(from)?;

        let tx = TransactionRequest::new()
            .to(call.to)
            .data(call.data.clone())
            .from(from);

        let mut attempt = 1;
        loop {
            match client.send_transaction(tx.clone(), None).await {
                Ok(pending) => {
                    let tx_hash = *pending;
                    info!(
                        "Submitted {} from {:?} as {:?}",
                        call.method, from, tx_hash
                    );
                    return Ok(Submission {
                        tx_hash,
                        connection: self,
                    });
                }
                Err(e) => {
                    let classified = classify_rpc_error(e.to_string());
                    if classified.is_transport() && attempt < MAX_TRANSPORT_ATTEMPTS {
                        warn!(
                            "Transport failure submitting {} (attempt {}/{}): {}",
                            call.method, attempt, MAX_TRANSPORT_ATTEMPTS, classified
                        );
                        attempt += 1;
                        sleep(Duration::from_millis(TRANSPORT_RETRY_BACKOFF_MILLIS)).await;
                        continue;
                    }
                    return Err(classified);
                }
            }
        }
    }

    /// Submit, wait for finalization, and require execution success.
    pub async fn submit_and_confirm(
        &self,
        call: &CallObject,
        from: Address,
    ) -> Result<Receipt, HarnessError> {
        let submission = self.submit(call, from).await?;
        let receipt = submission.wait_for_finalization().await?;
        receipt.ensure_success()?;
        Ok(receipt)
    }
}
