use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ice_transport::ice_credential_type::RTCIceCredentialType;

/// RTCIceServer is one STUN or TURN server entry the engine may use to
/// gather candidates.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
    pub credential_type: RTCIceCredentialType,
}

impl RTCIceServer {
    pub(crate) fn validate(&self) -> Result<()> {
        self.urls()?;
        Ok(())
    }

    /// urls parses every url of the entry and attaches the credentials to
    /// TURN urls. TURN urls without complete credentials are rejected.
    pub fn urls(&self) -> Result<Vec<ice::url::Url>> {
        let mut urls = vec![];

        for url_str in &self.urls {
            let mut url = ice::url::Url::parse_url(url_str)?;
            if url.scheme == ice::url::SchemeType::Turn || url.scheme == ice::url::SchemeType::Turns
            {
                if self.username.is_empty() || self.credential.is_empty() {
                    return Err(Error::ErrNoTurnCredentials);
                }
                url.username.clone_from(&self.username);

                match self.credential_type {
                    RTCIceCredentialType::Password => {
                        url.password.clone_from(&self.credential);
                    }
                    // the token is handed to the engine as is
                    RTCIceCredentialType::Oauth => {}
                    RTCIceCredentialType::Unspecified => return Err(Error::ErrTurnCredentials),
                };
            }

            urls.push(url);
        }

        Ok(urls)
    }
}

/// sanitize_ice_servers strips the query part of STUN urls. Some signaling
/// servers append `?transport=udp` to every url, which is only legal for TURN.
pub(crate) fn sanitize_ice_servers(ice_servers: &[RTCIceServer]) -> Vec<RTCIceServer> {
    let mut ice_servers = ice_servers.to_vec();
    for ice_server in &mut ice_servers {
        for raw_url in &mut ice_server.urls {
            if raw_url.starts_with("stun") {
                if let Some((base, _)) = raw_url.split_once('?') {
                    *raw_url = base.to_owned();
                }
            }
        }
    }
    ice_servers
}

/// validate_ice_servers sanitizes and validates a server list, returning the
/// list the engine should be given.
pub(crate) fn validate_ice_servers(ice_servers: &[RTCIceServer]) -> Result<Vec<RTCIceServer>> {
    let ice_servers = sanitize_ice_servers(ice_servers);
    for ice_server in &ice_servers {
        ice_server.validate()?;
    }
    Ok(ice_servers)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_server_validate_success() {
        let tests = vec![
            RTCIceServer {
                urls: vec!["turn:192.158.29.39?transport=udp".to_owned()],
                username: "unittest".to_owned(),
                credential: "placeholder".to_owned(),
                credential_type: RTCIceCredentialType::Password,
            },
            RTCIceServer {
                urls: vec!["turn:[2001:db8:1234:5678::1]?transport=udp".to_owned()],
                username: "unittest".to_owned(),
                credential: "placeholder".to_owned(),
                credential_type: RTCIceCredentialType::Password,
            },
            RTCIceServer {
                urls: vec!["stun:stun.l.google.com:19302".to_owned()],
                ..Default::default()
            },
        ];

        for ice_server in tests {
            let urls = ice_server.urls().unwrap();
            assert_eq!(urls.len(), 1);
            if urls[0].scheme == ice::url::SchemeType::Turn {
                assert_eq!(urls[0].username, "unittest");
                assert_eq!(urls[0].password, "placeholder");
            }
        }
    }

    #[test]
    fn test_ice_server_validate_failure() {
        let tests = vec![
            (
                RTCIceServer {
                    urls: vec!["turn:192.158.29.39?transport=udp".to_owned()],
                    ..Default::default()
                },
                Error::ErrNoTurnCredentials,
            ),
            (
                RTCIceServer {
                    urls: vec!["turn:192.158.29.39?transport=udp".to_owned()],
                    username: "unittest".to_owned(),
                    credential: String::new(),
                    credential_type: RTCIceCredentialType::Password,
                },
                Error::ErrNoTurnCredentials,
            ),
            (
                RTCIceServer {
                    urls: vec!["turn:192.158.29.39?transport=udp".to_owned()],
                    username: "unittest".to_owned(),
                    credential: "placeholder".to_owned(),
                    credential_type: RTCIceCredentialType::Unspecified,
                },
                Error::ErrTurnCredentials,
            ),
        ];

        for (ice_server, expected_err) in tests {
            if let Err(err) = ice_server.urls() {
                assert_eq!(err, expected_err, "{ice_server:?} with err {err:?}");
            } else {
                panic!("expected error, but got ok");
            }
        }
    }

    #[test]
    fn test_ice_server_stun_query() {
        let ice_servers = vec![RTCIceServer {
            urls: vec!["stun:google.de?transport=udp".to_owned()],
            ..Default::default()
        }];

        let err = ice_servers[0].validate().unwrap_err();
        assert_eq!(err, ice::Error::ErrStunQuery);

        let validated = validate_ice_servers(&ice_servers).unwrap();
        assert_eq!(validated[0].urls, vec!["stun:google.de".to_owned()]);
    }

    #[test]
    fn test_ice_server_deserialize() {
        let json = r#"{"urls":["turn:turn.example.org:3478"],"username":"u","credential":"p"}"#;
        let ice_server: RTCIceServer = serde_json::from_str(json).unwrap();
        assert_eq!(ice_server.credential_type, RTCIceCredentialType::Password);
        assert!(ice_server.validate().is_ok());
    }
}
