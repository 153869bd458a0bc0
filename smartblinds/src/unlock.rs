use std::time::Duration;

/// How often a fresh unlock attempt is retried while `Unlocking`.
pub const UNLOCK_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// State of the passkey unlock handshake for a single [`crate::device::BlindDevice`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnlockState {
    Locked,
    Unlocking,
    Unlocked,
    Failed,
}

/// Encode a configured passkey hex string into the bytes written to the Passkey characteristic.
///
/// If `passkey` is exactly 12 hex characters, `01` is appended. Otherwise (untested vendor
/// branch, kept for parity) the first two hex characters are dropped before appending `01`.
pub fn encode_passkey(passkey: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let framed = if passkey.len() == 12 {
        format!("{passkey}01")
    } else {
        log::warn!(
            "Passkey {:?} is not the expected 12 hex characters; using the untested short-passkey encoding",
            passkey
        );
        let (_, rest) = passkey.split_at(passkey.len().min(2));
        format!("{rest}01")
    };
    hex::decode(framed)
}

/// The expected echo a Passkey notification must carry for the handshake to succeed:
/// `configured_passkey || 0x00`.
pub fn expected_echo(passkey: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(format!("{passkey}00"))
}

/// Attempt tracker driving the `Locked -> Unlocking -> {Unlocked, Failed}` handshake.
#[derive(Debug)]
pub struct UnlockHandshake {
    state: UnlockState,
    attempts: u32,
    max_attempts: u32,
}

impl UnlockHandshake {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: UnlockState::Locked,
            attempts: 0,
            max_attempts,
        }
    }

    pub fn state(&self) -> UnlockState {
        self.state
    }

    /// Begin (or retry) an attempt. Returns `true` if an attempt should be made (a passkey write
    /// issued), `false` if the attempt cap has been reached and the handshake has moved to
    /// `Failed`.
    pub fn begin_attempt(&mut self) -> bool {
        if self.attempts >= self.max_attempts {
            self.state = UnlockState::Failed;
            return false;
        }
        self.attempts += 1;
        self.state = UnlockState::Unlocking;
        true
    }

    /// Handle a Passkey characteristic notification. Returns `true` if the handshake transitioned
    /// to `Unlocked` as a result.
    pub fn on_passkey_echo(&mut self, echo: &[u8], expected: &[u8]) -> bool {
        if self.state != UnlockState::Unlocking {
            return false;
        }
        if echo == expected {
            self.attempts = 0;
            self.state = UnlockState::Unlocked;
            true
        } else {
            false
        }
    }

    /// Reset to `Locked` on disconnect. The attempt counter is also reset, since a fresh
    /// connection starts a fresh handshake.
    pub fn on_disconnect(&mut self) {
        self.state = UnlockState::Locked;
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_12_char_passkey() {
        let bytes = encode_passkey("000102030405").unwrap();
        assert_eq!(bytes, vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x01]);
    }

    #[test]
    fn encodes_non_12_char_passkey_by_dropping_first_byte() {
        // Untested vendor branch: still exercised here so the behavior is pinned down.
        let bytes = encode_passkey("00AABBCCDDEE").unwrap();
        // Same length as above (12 chars), so this only demonstrates the other branch with a
        // shorter key.
        let short = encode_passkey("AABBCC").unwrap();
        assert_eq!(short, vec![0xBB, 0xCC, 0x01]);
        assert_eq!(bytes, vec![0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
    }

    #[test]
    fn expected_echo_appends_zero_byte() {
        assert_eq!(
            expected_echo("000102030405").unwrap(),
            vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x00]
        );
    }

    #[test]
    fn unlock_success_scenario() {
        let mut handshake = UnlockHandshake::new(3);
        assert_eq!(handshake.state(), UnlockState::Locked);
        assert!(handshake.begin_attempt());
        assert_eq!(handshake.state(), UnlockState::Unlocking);

        let expected = expected_echo("000102030405").unwrap();
        assert!(handshake.on_passkey_echo(&expected, &expected));
        assert_eq!(handshake.state(), UnlockState::Unlocked);
    }

    #[test]
    fn unlock_retries_then_fails_after_cap() {
        let mut handshake = UnlockHandshake::new(2);
        assert!(handshake.begin_attempt());
        assert!(!handshake.on_passkey_echo(b"wrong", b"expected"));
        assert_eq!(handshake.state(), UnlockState::Unlocking);

        assert!(handshake.begin_attempt());
        assert!(!handshake.on_passkey_echo(b"wrong", b"expected"));

        assert!(!handshake.begin_attempt());
        assert_eq!(handshake.state(), UnlockState::Failed);
    }

    #[test]
    fn disconnect_resets_to_locked() {
        let mut handshake = UnlockHandshake::new(3);
        handshake.begin_attempt();
        handshake.on_disconnect();
        assert_eq!(handshake.state(), UnlockState::Locked);
    }
}
