// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pairing / authentication state machine for one server session.
//
// The table below is the whole state space.  `transition` is pure: the
// connection manager feeds it triggers, performs the side effects that belong
// to the trigger, and moves to the returned state.  A `None` result means the
// trigger is not valid in the current state and must be ignored.
//
//   Disconnected --dial--> Connecting --open--> Pairing | Authenticating
//   Pairing --approved--> Authenticating --auth ok--> Connected
//   Pairing | Authenticating | Connected --failure--> Error
//   Error --backoff elapsed--> Disconnected
//   any live state --transport lost / force_disconnect--> Disconnected

use propslink_core::types::ConnectionStatus;

use crate::codec::ServerMessage;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Pairing,
    Authenticating,
    Connected,
    Error,
}

impl SessionState {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::Disconnected => ConnectionStatus::Disconnected,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Pairing => ConnectionStatus::Pairing,
            Self::Authenticating => ConnectionStatus::Authenticating,
            Self::Connected => ConnectionStatus::Connected,
            Self::Error => ConnectionStatus::Error,
        }
    }

    /// Whether a transport is open in this state.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Pairing | Self::Authenticating | Self::Connected
        )
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Start a connection attempt.
    Dial,
    /// Transport open, no token held.
    OpenedUnpaired,
    /// Transport open, token held.
    OpenedWithToken,
    PairingPending,
    PairingApproved,
    PairingDenied,
    AuthSucceeded,
    AuthFailed,
    Print,
    ServerError,
    ForceDisconnect,
    /// An inbound frame failed to decode.
    DecodeFailed,
    /// Transport closed or a read/write failed.
    TransportLost,
    BackoffElapsed,
}

impl From<&ServerMessage> for Trigger {
    fn from(msg: &ServerMessage) -> Self {
        match msg {
            ServerMessage::AuthResult { success: true, .. } => Self::AuthSucceeded,
            ServerMessage::AuthResult { success: false, .. } => Self::AuthFailed,
            ServerMessage::PairingApproved { .. } => Self::PairingApproved,
            ServerMessage::PairingDenied => Self::PairingDenied,
            ServerMessage::PairingPending { .. } => Self::PairingPending,
            ServerMessage::Print(_) => Self::Print,
            ServerMessage::Error { .. } => Self::ServerError,
            ServerMessage::ForceDisconnect { .. } => Self::ForceDisconnect,
        }
    }
}

/// The transition table.
pub fn transition(state: SessionState, trigger: Trigger) -> Option<SessionState> {
    use SessionState as S;
    use Trigger as T;

    let next = match (state, trigger) {
        (S::Disconnected, T::Dial) => S::Connecting,

        (S::Connecting, T::OpenedUnpaired) => S::Pairing,
        (S::Connecting, T::OpenedWithToken) => S::Authenticating,

        (S::Pairing, T::PairingPending) => S::Pairing,
        (S::Pairing, T::PairingApproved) => S::Authenticating,
        (S::Pairing, T::PairingDenied) => S::Error,
        (S::Pairing, T::DecodeFailed) => S::Error,

        (S::Authenticating, T::AuthSucceeded) => S::Connected,
        (S::Authenticating, T::AuthFailed) => S::Error,
        // Unreadable frames are skipped once past pairing.
        (S::Authenticating, T::DecodeFailed) => S::Authenticating,

        (S::Connected, T::Print) => S::Connected,
        (S::Connected, T::DecodeFailed) => S::Connected,

        (S::Pairing | S::Authenticating | S::Connected, T::ServerError) => S::Error,
        (S::Pairing | S::Authenticating | S::Connected, T::ForceDisconnect) => S::Disconnected,
        (s, T::TransportLost) if s.is_live() => S::Disconnected,

        (S::Error, T::BackoffElapsed) => S::Disconnected,

        _ => return None,
    };
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState as S;
    use Trigger as T;

    #[test]
    fn pairing_path() {
        let mut state = S::Disconnected;
        for trigger in [T::Dial, T::OpenedUnpaired, T::PairingPending, T::PairingApproved, T::AuthSucceeded] {
            state = transition(state, trigger).unwrap();
        }
        assert_eq!(state, S::Connected);
    }

    #[test]
    fn token_path_skips_pairing() {
        let state = transition(S::Disconnected, T::Dial).unwrap();
        assert_eq!(transition(state, T::OpenedWithToken), Some(S::Authenticating));
    }

    #[test]
    fn failures_enter_error() {
        assert_eq!(transition(S::Pairing, T::PairingDenied), Some(S::Error));
        assert_eq!(transition(S::Pairing, T::DecodeFailed), Some(S::Error));
        assert_eq!(transition(S::Authenticating, T::AuthFailed), Some(S::Error));
        assert_eq!(transition(S::Connected, T::ServerError), Some(S::Error));
        assert_eq!(transition(S::Error, T::BackoffElapsed), Some(S::Disconnected));
    }

    #[test]
    fn transport_loss_from_any_live_state() {
        for state in [S::Connecting, S::Pairing, S::Authenticating, S::Connected] {
            assert_eq!(transition(state, T::TransportLost), Some(S::Disconnected));
        }
        assert_eq!(transition(S::Disconnected, T::TransportLost), None);
    }

    #[test]
    fn force_disconnect_is_not_an_error() {
        assert_eq!(transition(S::Connected, T::ForceDisconnect), Some(S::Disconnected));
    }

    #[test]
    fn out_of_state_messages_are_rejected() {
        // One handshake at a time: a second approval mid-authentication is ignored.
        assert_eq!(transition(S::Authenticating, T::PairingApproved), None);
        assert_eq!(transition(S::Pairing, T::Print), None);
        assert_eq!(transition(S::Authenticating, T::Print), None);
        assert_eq!(transition(S::Connected, T::AuthSucceeded), None);
        assert_eq!(transition(S::Connected, T::Dial), None);
    }

    #[test]
    fn decode_failures_skipped_after_pairing() {
        assert_eq!(transition(S::Authenticating, T::DecodeFailed), Some(S::Authenticating));
        assert_eq!(transition(S::Connected, T::DecodeFailed), Some(S::Connected));
    }
}
