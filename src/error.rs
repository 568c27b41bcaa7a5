//! Error taxonomy for the scenario harness
//!
//! Failures are classified into remote rejections, transport failures,
//! finalization timeouts, assertion mismatches, and harness configuration
//! errors. The classification drives run-level policy: rejections are
//! tolerated only where a scenario expects them, transport failures abort
//! the whole run, and assertion failures always fail the scenario that
//! raised them.

use thiserror::Error;

/// Harness-level error taxonomy
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The remote node evaluated the call and refused it (revert,
    /// permission check, failed receipt status).
    #[error("submission rejected by remote node: {reason}")]
    Rejected { reason: String },

    /// Network-level failure reaching the remote node. Always fatal for
    /// the run; never an expected scenario outcome.
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// The finalization wait expired before a receipt appeared.
    #[error("finalization timed out after {timeout_seconds}s for {tx_hash}")]
    Timeout { tx_hash: String, timeout_seconds: u64 },

    /// Observed state diverged from the expected value after a successful
    /// submission. Carries both sides for reporting.
    #[error("assertion failed for {context}: expected {expected}, got {actual}")]
    Assertion {
        context: String,
        expected: String,
        actual: String,
    },

    /// Bad harness setup: unparseable address, unknown identity label,
    /// unknown ABI method, argument encoding mismatch, out-of-order
    /// scenario preconditions.
    #[error("harness configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    /// True when a scenario declaring `ExpectRejection` may treat this
    /// error as its expected outcome.
    pub fn is_rejection(&self) -> bool {
        matches!(self, HarnessError::Rejected { .. })
    }

    /// True when the whole run must stop.
    pub fn is_transport(&self) -> bool {
        matches!(self, HarnessError::Transport { .. })
    }
}

/// Markers the remote node emits when it evaluated a call and refused it.
const REJECTION_MARKERS: &[&str] = &[
    "revert",
    "reverted",
    "invalid opcode",
    "always failing transaction",
    "execution error",
    "out of gas",
    "nonce too low",
];

/// Classify an RPC-layer error message into the harness taxonomy.
///
/// A revert-shaped message means the node was reached and evaluated the
/// call, so it maps to `Rejected`. Everything else is assumed to be a
/// failure to reach or converse with the node and maps to `Transport`,
/// which keeps unknown failure modes fatal rather than silently tolerated.
pub fn classify_rpc_error(message: impl Into<String>) -> HarnessError {
    let message = message.into();
    let lowered = message.to_lowercase();

    if REJECTION_MARKERS.iter().any(|m| lowered.contains(m)) {
        HarnessError::Rejected { reason: message }
    } else {
        HarnessError::Transport { reason: message }
    }
}
