use serde::{Deserialize, Serialize};

/// RTCIceParameters are the ICE credentials of one side of the transport, as
/// exchanged over signaling and supplied again on ICE restart.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceParameters {
    pub username_fragment: String,
    pub password: String,
    #[serde(default)]
    pub ice_lite: bool,
}
