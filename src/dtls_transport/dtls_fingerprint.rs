use serde::{Deserialize, Serialize};

/// RTCDtlsFingerprint is the hash of the certificate used by one side of
/// the DTLS handshake, <https://tools.ietf.org/html/rfc4572#section-5>.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    /// Hash function name from the 'Hash function Textual Names' registry,
    /// e.g. `sha-256`.
    pub algorithm: String,

    /// Colon separated, uppercase hex bytes of the digest.
    pub value: String,
}

impl RTCDtlsFingerprint {
    /// from_digest renders a raw digest in the colon separated form used on
    /// the wire.
    pub fn from_digest(algorithm: &str, digest: &[u8]) -> Self {
        let value = digest
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<String>>()
            .join(":");

        RTCDtlsFingerprint {
            algorithm: algorithm.to_owned(),
            value,
        }
    }

    /// digest parses the value back into bytes. Returns None on malformed input.
    pub fn digest(&self) -> Option<Vec<u8>> {
        let compact: String = self.value.split(':').collect();
        hex::decode(compact).ok()
    }
}
