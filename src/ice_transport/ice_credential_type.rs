use std::fmt;

use serde::{Deserialize, Serialize};

/// RTCIceCredentialType tells a TURN server entry how to interpret its
/// `credential` field.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCIceCredentialType {
    #[serde(rename = "unspecified")]
    Unspecified,

    /// Long-term username/password credentials, <https://tools.ietf.org/html/rfc5389>.
    #[default]
    #[serde(rename = "password")]
    Password,

    /// Token based credentials, <https://tools.ietf.org/html/rfc7635>.
    #[serde(rename = "oauth")]
    Oauth,
}

const ICE_CREDENTIAL_TYPE_PASSWORD_STR: &str = "password";
const ICE_CREDENTIAL_TYPE_OAUTH_STR: &str = "oauth";

impl From<&str> for RTCIceCredentialType {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CREDENTIAL_TYPE_PASSWORD_STR => RTCIceCredentialType::Password,
            ICE_CREDENTIAL_TYPE_OAUTH_STR => RTCIceCredentialType::Oauth,
            _ => RTCIceCredentialType::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceCredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceCredentialType::Password => ICE_CREDENTIAL_TYPE_PASSWORD_STR,
            RTCIceCredentialType::Oauth => ICE_CREDENTIAL_TYPE_OAUTH_STR,
            RTCIceCredentialType::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_credential_type_conversions() {
        let tests = vec![
            (crate::UNSPECIFIED_STR, RTCIceCredentialType::Unspecified),
            ("password", RTCIceCredentialType::Password),
            ("oauth", RTCIceCredentialType::Oauth),
        ];

        for (ct_str, expected_ct) in tests {
            assert_eq!(RTCIceCredentialType::from(ct_str), expected_ct);
            assert_eq!(expected_ct.to_string(), ct_str);
        }
    }

    #[test]
    fn test_ice_credential_type_serde() {
        let ct: RTCIceCredentialType = serde_json::from_str("\"oauth\"").unwrap();
        assert_eq!(ct, RTCIceCredentialType::Oauth);
        assert_eq!(
            serde_json::to_string(&RTCIceCredentialType::Password).unwrap(),
            "\"password\""
        );
    }
}
