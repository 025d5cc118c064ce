
pub mod recv_handler;
pub(crate) mod registry;
pub mod send_handler;
pub mod transport_session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dtls_transport::dtls_parameters::DTLSParameters;
use crate::error::Result;
use crate::ice_transport::ice_candidate::RTCIceCandidate;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::ice_transport::ice_server::RTCIceServer;
use crate::ice_transport::ice_transport_policy::RTCIceTransportPolicy;
use crate::ortc::RtpParametersByKind;

/// HandlerListener is implemented by the application to carry transport
/// parameters to the remote party and to observe connectivity.
#[async_trait]
pub trait HandlerListener: Send + Sync {
    /// on_connect is called once per transport session, before the first
    /// send or receive touches the engine. The operation that triggered it
    /// waits for the returned future; an error fails that operation and the
    /// next one tries again.
    async fn on_connect(&self, local_parameters: TransportLocalParameters) -> Result<()>;

    /// on_connection_state_change is called on every connectivity change.
    async fn on_connection_state_change(&self, _state: RTCIceConnectionState) {}
}

/// TransportRemoteParameters describe the remote end of the transport.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportRemoteParameters {
    pub ice_parameters: RTCIceParameters,
    pub ice_candidates: Vec<RTCIceCandidate>,
    pub dtls_parameters: DTLSParameters,
}

/// TransportLocalParameters is what the remote party needs from us to
/// complete the DTLS handshake.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportLocalParameters {
    pub dtls_parameters: DTLSParameters,
}

/// A HandlerConfiguration defines how a send or receive handler sets up its
/// transport and which RTP parameters it starts from.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerConfiguration {
    pub transport_remote_parameters: TransportRemoteParameters,

    /// ice_servers defines a slice describing servers available to be used by
    /// ICE, such as STUN and TURN servers.
    pub ice_servers: Vec<RTCIceServer>,

    /// ice_transport_policy indicates which candidates the ICEAgent is allowed
    /// to use.
    pub ice_transport_policy: RTCIceTransportPolicy,

    /// Passed to the engine untouched.
    pub proprietary_constraints: serde_json::Value,

    /// RTP parameter templates, usually built with
    /// [`crate::ortc::get_rtp_parameters_by_kind`].
    pub rtp_parameters_by_kind: RtpParametersByKind,
}

impl HandlerConfiguration {
    /// from_json loads a configuration as produced by a signaling server.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
