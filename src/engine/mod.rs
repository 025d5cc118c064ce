//! The transport engine seam. An engine owns ICE, DTLS, SRTP and RTP I/O;
//! the handlers only drive it through these traits.

#[cfg(test)]
mod engine_test;

pub mod loopback;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::get_native_rtp_capabilities;
use crate::dtls_transport::dtls_parameters::DTLSParameters;
use crate::dtls_transport::dtls_role::DTLSRole;
use crate::error::Result;
use crate::ice_transport::ice_candidate::RTCIceCandidate;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::ice_transport::ice_server::RTCIceServer;
use crate::ice_transport::ice_transport_policy::RTCIceTransportPolicy;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::{RTCRtpCapabilities, RTCRtpEncodingParameters, RTCRtpParameters};
use crate::stats::StatsReport;
use crate::track::track_local::TrackLocal;
use crate::track::track_remote::TrackRemote;

pub type OnIceConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceConnectionState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// TransportConfiguration is everything an engine needs to set up one
/// transport towards the remote party.
#[derive(Default, Debug, Clone)]
pub struct TransportConfiguration {
    pub remote_ice_parameters: RTCIceParameters,
    pub remote_ice_candidates: Vec<RTCIceCandidate>,
    pub remote_dtls_parameters: DTLSParameters,
    /// Validated, with STUN queries stripped.
    pub ice_servers: Vec<RTCIceServer>,
    pub ice_transport_policy: RTCIceTransportPolicy,
    /// Opaque, engine specific settings passed through untouched.
    pub proprietary_constraints: serde_json::Value,
    pub local_dtls_role: DTLSRole,
}

/// RtpSender is the engine's handle on one outgoing track.
#[async_trait]
pub trait RtpSender: Send + Sync {
    /// get_parameters returns the parameters the sender was created with,
    /// completed with the SSRCs, mid and CNAME the engine assigned.
    async fn get_parameters(&self) -> RTCRtpParameters;

    /// set_parameters replaces the encodings, e.g. to deactivate spatial layers.
    async fn set_parameters(&self, encodings: Vec<RTCRtpEncodingParameters>) -> Result<()>;

    /// replace_track swaps the media source without renegotiation.
    async fn replace_track(&self, track: Arc<dyn TrackLocal>) -> Result<()>;

    async fn track(&self) -> Arc<dyn TrackLocal>;

    async fn get_stats(&self) -> Result<StatsReport>;

    async fn stop(&self) -> Result<()>;
}

/// RtpReceiver is the engine's handle on one incoming stream.
#[async_trait]
pub trait RtpReceiver: Send + Sync {
    async fn track(&self) -> Arc<TrackRemote>;

    async fn get_stats(&self) -> Result<StatsReport>;

    async fn stop(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportEngine: Send + Sync {
    /// local_dtls_parameters returns the local certificate fingerprints.
    /// The role is decided by the caller.
    async fn local_dtls_parameters(&self) -> Result<DTLSParameters>;

    /// rtp_capabilities is what the engine can send and receive.
    fn rtp_capabilities(&self) -> RTCRtpCapabilities {
        get_native_rtp_capabilities()
    }

    async fn add_sender(
        &self,
        track: Arc<dyn TrackLocal>,
        rtp_parameters: &RTCRtpParameters,
        send_encodings: Vec<RTCRtpEncodingParameters>,
    ) -> Result<Arc<dyn RtpSender>>;

    async fn add_receiver(
        &self,
        id: &str,
        kind: RTPCodecType,
        rtp_parameters: &RTCRtpParameters,
    ) -> Result<Arc<dyn RtpReceiver>>;

    async fn restart_ice(&self, remote_ice_parameters: &RTCIceParameters) -> Result<()>;

    async fn update_ice_servers(&self, ice_servers: &[RTCIceServer]) -> Result<()>;

    /// on_ice_connection_state_change sets the handler called on every
    /// connectivity state change. Replaces any previous handler.
    fn on_ice_connection_state_change(&self, f: OnIceConnectionStateChangeHdlrFn);

    /// get_stats returns transport level statistics.
    async fn get_stats(&self) -> Result<StatsReport>;

    async fn close(&self) -> Result<()>;
}

/// TransportEngineFactory builds one engine per transport session.
pub trait TransportEngineFactory: Send + Sync {
    fn new_engine(&self, config: TransportConfiguration) -> Result<Arc<dyn TransportEngine>>;
}
