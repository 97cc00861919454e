//! Governed value store.
//!
//! The simulation target: a box holding one number that only successful
//! proposals may change.

use std::sync::Arc;
use agora_governance::{ActionExecutor, ProposalAction};
use parking_lot::Mutex;

/// Payload prefix understood by [`ValueStore`].
pub const STORE_PREFIX: &str = "store:";

/// Executor accepting payloads of the form `store:<u64>`.
/// Clones share the stored value.
#[derive(Debug, Default, Clone)]
pub struct ValueStore {
    value: Arc<Mutex<Option<u64>>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last stored value.
    pub fn retrieve(&self) -> Option<u64> {
        *self.value.lock()
    }
}

/// Parse a `store:<u64>` payload.
pub fn parse_payload(payload: &[u8]) -> Result<u64, String> {
    let text = std::str::from_utf8(payload).map_err(|_| "payload is not UTF-8".to_string())?;
    let number = text
        .strip_prefix(STORE_PREFIX)
        .ok_or_else(|| format!("unsupported payload '{}'", text))?;
    number
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid value '{}': {}", number, e))
}

impl ActionExecutor for ValueStore {
    fn invoke(&mut self, proposal_id: u64, action: &ProposalAction) -> Result<(), String> {
        let value = parse_payload(&action.payload)?;
        *self.value.lock() = Some(value);
        tracing::info!("Box value set to {} by proposal #{}", value, proposal_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::Address;

    #[test]
    fn test_store_payload() {
        let handle = ValueStore::new();
        let mut exec = handle.clone();
        let action = ProposalAction::new(Address::ZERO, b"store:77".to_vec());
        exec.invoke(1, &action).unwrap();
        assert_eq!(handle.retrieve(), Some(77));
    }

    #[test]
    fn test_rejects_other_payloads() {
        let mut exec = ValueStore::new();
        let payloads: [&[u8]; 4] = [b"burn:1", b"store:", b"store:-4", &[0xff, 0xfe]];
        for payload in payloads {
            let action = ProposalAction::new(Address::ZERO, payload.to_vec());
            assert!(exec.invoke(1, &action).is_err());
        }
        assert_eq!(exec.retrieve(), None);
    }
}
