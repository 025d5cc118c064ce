#[cfg(test)]
mod rtp_transceiver_test;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::rtp_transceiver::rtp_codec::*;

pub(crate) mod fmtp;
pub mod rtp_codec;

/// SSRC represents a synchronization source
/// A synchronization source is a randomly chosen
/// value meant to be globally unique within a particular
/// RTP session. Used to identify a single stream of media.
/// <https://tools.ietf.org/html/rfc3550#section-3>
#[allow(clippy::upper_case_acronyms)]
pub type SSRC = u32;

/// PayloadType identifies the format of the RTP payload and determines
/// its interpretation by the application. Each codec in a RTP Session
/// will have a different PayloadType
/// <https://tools.ietf.org/html/rfc3550#section-3>
pub type PayloadType = u8;

/// TYPE_RTCP_FB_TRANSPORT_CC ..
pub const TYPE_RTCP_FB_TRANSPORT_CC: &str = "transport-cc";

/// TYPE_RTCP_FB_GOOG_REMB ..
pub const TYPE_RTCP_FB_GOOG_REMB: &str = "goog-remb";

/// TYPE_RTCP_FB_CCM ..
pub const TYPE_RTCP_FB_CCM: &str = "ccm";

/// TYPE_RTCP_FB_NACK ..
pub const TYPE_RTCP_FB_NACK: &str = "nack";

/// RTCPFeedback signals the connection to use additional RTCP packet types.
/// <https://draft.ortc.org/#dom-rtcrtcpfeedback>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCPFeedback {
    /// valid: ack, ccm, nack, goog-remb, transport-cc
    #[serde(rename = "type")]
    pub typ: String,

    /// e.g. type="nack" parameter="pli" requests Picture Loss Indication.
    #[serde(default)]
    pub parameter: String,
}

/// RTCRtpCapabilities is what one side of the transport can send or receive.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtpCapabilities {
    pub codecs: Vec<RTCRtpCodecParameters>,
    pub header_extensions: Vec<RTCRtpHeaderExtensionCapability>,
    pub fec_mechanisms: Vec<String>,
}

/// RTCRtpRtxParameters carries the SSRC of the retransmission stream.
/// <https://draft.ortc.org/#dom-rtcrtprtxparameters>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpRtxParameters {
    pub ssrc: SSRC,
}

fn default_active() -> bool {
    true
}

/// RTCRtpEncodingParameters is one RTP stream of a sender or receiver. A
/// simulcast sender has one per spatial layer, lowest resolution first.
/// <http://draft.ortc.org/#dom-rtcrtpencodingparameters>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtpEncodingParameters {
    #[serde(skip_serializing_if = "SmolStr::is_empty")]
    pub rid: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<SSRC>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtx: Option<RTCRtpRtxParameters>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_resolution_down_by: Option<f64>,
}

impl Default for RTCRtpEncodingParameters {
    fn default() -> Self {
        RTCRtpEncodingParameters {
            rid: SmolStr::default(),
            ssrc: None,
            rtx: None,
            active: true,
            max_bitrate: None,
            scale_resolution_down_by: None,
        }
    }
}

/// RTCRtcpParameters configures RTCP for one RTP stream set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtcpParameters {
    pub cname: String,
    pub reduced_size: bool,
    pub mux: bool,
}

impl Default for RTCRtcpParameters {
    fn default() -> Self {
        RTCRtcpParameters {
            cname: String::new(),
            reduced_size: true,
            mux: true,
        }
    }
}

/// RTCRtpParameters is the full negotiated RTP description of one sender or
/// receiver: codecs, header extensions, encodings and RTCP.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtpParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    pub codecs: Vec<RTCRtpCodecParameters>,
    pub header_extensions: Vec<RTCRtpHeaderExtensionParameters>,
    pub encodings: Vec<RTCRtpEncodingParameters>,
    pub rtcp: RTCRtcpParameters,
}

impl RTCRtpParameters {
    /// media_codec returns the first codec that is not a retransmission,
    /// FEC or comfort-noise codec.
    pub fn media_codec(&self) -> Option<&RTCRtpCodecParameters> {
        self.codecs.iter().find(|c| c.capability.is_media())
    }

    /// first_ssrc returns the SSRC of the first encoding, if any.
    pub fn first_ssrc(&self) -> Option<SSRC> {
        self.encodings.first().and_then(|e| e.ssrc)
    }
}

/// simulcast_encodings are the three spatial layers requested for a
/// simulcast video sender, lowest resolution first.
pub(crate) fn simulcast_encodings() -> Vec<RTCRtpEncodingParameters> {
    [("low", 4.0), ("medium", 2.0), ("high", 1.0)]
        .into_iter()
        .map(|(rid, scale)| RTCRtpEncodingParameters {
            rid: SmolStr::new(rid),
            scale_resolution_down_by: Some(scale),
            ..Default::default()
        })
        .collect()
}
