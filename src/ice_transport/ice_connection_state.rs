use std::fmt;

use serde::{Deserialize, Serialize};

/// RTCIceConnectionState is the connectivity state the transport engine
/// reports and the handlers forward to their listener unchanged.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RTCIceConnectionState {
    #[default]
    Unspecified,

    /// The transport has been closed and will not report again.
    Closed,

    /// Checks failed on every candidate pair. An ICE restart is needed.
    Failed,

    /// Consent was lost on the selected pair. May recover on its own.
    Disconnected,

    /// No checks have started yet.
    New,

    /// Checks are in progress.
    Checking,

    /// Checks finished and a pair was selected.
    Completed,

    /// A usable pair exists; checks may still be running.
    Connected,
}

const ICE_CONNECTION_STATE_NEW_STR: &str = "new";
const ICE_CONNECTION_STATE_CHECKING_STR: &str = "checking";
const ICE_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const ICE_CONNECTION_STATE_COMPLETED_STR: &str = "completed";
const ICE_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const ICE_CONNECTION_STATE_FAILED_STR: &str = "failed";
const ICE_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCIceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CONNECTION_STATE_NEW_STR => RTCIceConnectionState::New,
            ICE_CONNECTION_STATE_CHECKING_STR => RTCIceConnectionState::Checking,
            ICE_CONNECTION_STATE_CONNECTED_STR => RTCIceConnectionState::Connected,
            ICE_CONNECTION_STATE_COMPLETED_STR => RTCIceConnectionState::Completed,
            ICE_CONNECTION_STATE_DISCONNECTED_STR => RTCIceConnectionState::Disconnected,
            ICE_CONNECTION_STATE_FAILED_STR => RTCIceConnectionState::Failed,
            ICE_CONNECTION_STATE_CLOSED_STR => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

// Engines keep the last state in an atomic.
impl From<u8> for RTCIceConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCIceConnectionState::Closed,
            2 => RTCIceConnectionState::Failed,
            3 => RTCIceConnectionState::Disconnected,
            4 => RTCIceConnectionState::New,
            5 => RTCIceConnectionState::Checking,
            6 => RTCIceConnectionState::Completed,
            7 => RTCIceConnectionState::Connected,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceConnectionState::New => ICE_CONNECTION_STATE_NEW_STR,
            RTCIceConnectionState::Checking => ICE_CONNECTION_STATE_CHECKING_STR,
            RTCIceConnectionState::Connected => ICE_CONNECTION_STATE_CONNECTED_STR,
            RTCIceConnectionState::Completed => ICE_CONNECTION_STATE_COMPLETED_STR,
            RTCIceConnectionState::Disconnected => ICE_CONNECTION_STATE_DISCONNECTED_STR,
            RTCIceConnectionState::Failed => ICE_CONNECTION_STATE_FAILED_STR,
            RTCIceConnectionState::Closed => ICE_CONNECTION_STATE_CLOSED_STR,
            RTCIceConnectionState::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_connection_state_string_round_trip() {
        let tests = vec![
            (crate::UNSPECIFIED_STR, RTCIceConnectionState::Unspecified),
            ("new", RTCIceConnectionState::New),
            ("checking", RTCIceConnectionState::Checking),
            ("connected", RTCIceConnectionState::Connected),
            ("completed", RTCIceConnectionState::Completed),
            ("disconnected", RTCIceConnectionState::Disconnected),
            ("failed", RTCIceConnectionState::Failed),
            ("closed", RTCIceConnectionState::Closed),
        ];

        for (state_string, expected_state) in tests {
            assert_eq!(
                RTCIceConnectionState::from(state_string),
                expected_state,
                "testCase: {expected_state}",
            );
            assert_eq!(expected_state.to_string(), state_string);
        }
    }

    #[test]
    fn test_ice_connection_state_from_u8() {
        for state in [
            RTCIceConnectionState::Closed,
            RTCIceConnectionState::Failed,
            RTCIceConnectionState::Disconnected,
            RTCIceConnectionState::New,
            RTCIceConnectionState::Checking,
            RTCIceConnectionState::Completed,
            RTCIceConnectionState::Connected,
        ] {
            assert_eq!(RTCIceConnectionState::from(state as u8), state);
        }
        assert_eq!(
            RTCIceConnectionState::from(42u8),
            RTCIceConnectionState::Unspecified
        );
    }
}
