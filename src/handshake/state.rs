/// Steps of the one-shot trust handshake.
///
/// `Idle -> Probing -> {Trusted, PromptPending}`, `PromptPending -> Retrying`,
/// `Retrying -> {Trusted, Failed}`. A probe that fails for any reason other than
/// an uncached host key goes straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Probing,
    PromptPending,
    Retrying,
    Trusted,
    Failed,
}

impl HandshakeState {
    pub fn can_transition_to(self, next: HandshakeState) -> bool {
        use HandshakeState::*;
        matches!(
            (self, next),
            (Idle, Probing)
                | (Probing, Trusted)
                | (Probing, PromptPending)
                | (Probing, Failed)
                | (PromptPending, Retrying)
                | (PromptPending, Failed)
                | (Retrying, Trusted)
                | (Retrying, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::Trusted | HandshakeState::Failed)
    }
}

/// Whether the remote host identity is cached by the transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustState {
    Unknown,
    Trusted,
}
