use std::fmt;

use serde::{Deserialize, Serialize};

/// DTLSRole is the side of the DTLS handshake the local transport takes.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DTLSRole {
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified = 0,

    /// The role follows the ICE role: controlled acts as client,
    /// controlling acts as server.
    #[serde(rename = "auto")]
    Auto = 1,

    /// Local side sends the ClientHello.
    #[serde(rename = "client")]
    Client = 2,

    /// Local side waits for the ClientHello.
    #[serde(rename = "server")]
    Server = 3,
}

/// Sending sessions answer the remote's DTLS handshake.
pub(crate) const DEFAULT_DTLS_ROLE_SEND: DTLSRole = DTLSRole::Server;

/// Receiving sessions start the handshake themselves.
pub(crate) const DEFAULT_DTLS_ROLE_RECV: DTLSRole = DTLSRole::Client;

const DTLS_ROLE_AUTO_STR: &str = "auto";
const DTLS_ROLE_CLIENT_STR: &str = "client";
const DTLS_ROLE_SERVER_STR: &str = "server";

impl DTLSRole {
    /// remote returns the role the remote side has to take.
    pub fn remote(&self) -> DTLSRole {
        match *self {
            DTLSRole::Client => DTLSRole::Server,
            DTLSRole::Server => DTLSRole::Client,
            other => other,
        }
    }
}

impl From<&str> for DTLSRole {
    fn from(raw: &str) -> Self {
        match raw {
            DTLS_ROLE_AUTO_STR => DTLSRole::Auto,
            DTLS_ROLE_CLIENT_STR => DTLSRole::Client,
            DTLS_ROLE_SERVER_STR => DTLSRole::Server,
            _ => DTLSRole::Unspecified,
        }
    }
}

impl fmt::Display for DTLSRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DTLSRole::Auto => DTLS_ROLE_AUTO_STR,
            DTLSRole::Client => DTLS_ROLE_CLIENT_STR,
            DTLSRole::Server => DTLS_ROLE_SERVER_STR,
            DTLSRole::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dtls_role_string() {
        let tests = vec![
            (DTLSRole::Unspecified, "Unspecified"),
            (DTLSRole::Auto, "auto"),
            (DTLSRole::Client, "client"),
            (DTLSRole::Server, "server"),
        ];

        for (role, expected_string) in tests {
            assert_eq!(role.to_string(), expected_string);
        }
    }

    #[test]
    fn test_dtls_role_remote() {
        let tests = vec![
            (DTLSRole::Client, DTLSRole::Server),
            (DTLSRole::Server, DTLSRole::Client),
            (DTLSRole::Auto, DTLSRole::Auto),
        ];

        for (role, expected_remote) in tests {
            assert_eq!(role.remote(), expected_remote, "{role}");
        }

        assert_eq!(DEFAULT_DTLS_ROLE_SEND.remote(), DEFAULT_DTLS_ROLE_RECV);
    }
}
