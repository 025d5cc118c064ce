//! Capability query: what the local engine can offer, independent of any
//! handler or transport.

pub mod media_engine;

use media_engine::MediaEngine;

use crate::rtp_transceiver::RTCRtpCapabilities;

/// HANDLER_NAME identifies this handler implementation to signaling servers.
pub const HANDLER_NAME: &str = "webrtc-rs";

/// get_native_rtp_capabilities returns the codecs, header extensions and FEC
/// mechanisms of the default media engine, audio first.
pub fn get_native_rtp_capabilities() -> RTCRtpCapabilities {
    MediaEngine::with_defaults().get_rtp_capabilities()
}

/// get_name returns the handler implementation identifier.
pub fn get_name() -> &'static str {
    HANDLER_NAME
}
