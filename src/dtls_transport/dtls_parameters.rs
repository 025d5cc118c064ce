use serde::{Deserialize, Serialize};

use super::dtls_fingerprint::*;
use super::dtls_role::*;

/// DTLSParameters are the role and certificate fingerprints of one side of
/// the DTLS handshake.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DTLSParameters {
    #[serde(default)]
    pub role: DTLSRole,
    pub fingerprints: Vec<RTCDtlsFingerprint>,
}
