use std::fmt;

use serde::{Deserialize, Serialize};
use unicase::UniCase;

use super::*;
use crate::api::media_engine::*;
use crate::rtp_transceiver::fmtp;

/// RTPCodecType determines the type of a codec
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RTPCodecType {
    #[default]
    Unspecified = 0,

    /// RTPCodecTypeAudio indicates this is an audio codec
    Audio = 1,

    /// RTPCodecTypeVideo indicates this is a video codec
    Video = 2,
}

impl From<&str> for RTPCodecType {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RTPCodecType::Audio,
            "video" => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

impl From<u8> for RTPCodecType {
    fn from(v: u8) -> Self {
        match v {
            1 => RTPCodecType::Audio,
            2 => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

impl fmt::Display for RTPCodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTPCodecType::Audio => "audio",
            RTPCodecType::Video => "video",
            RTPCodecType::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// RTCRtpCodecCapability provides information about codec capabilities.
/// <https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpcodeccapability-members>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtpCodecCapability {
    pub mime_type: String,
    pub clock_rate: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub channels: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sdp_fmtp_line: String,
    pub rtcp_feedback: Vec<RTCPFeedback>,
}

fn is_zero(v: &u16) -> bool {
    *v == 0
}

impl RTCRtpCodecCapability {
    /// kind derives the media kind from the mime type prefix.
    pub fn kind(&self) -> RTPCodecType {
        match self.mime_type.split_once('/') {
            Some((kind, _)) => RTPCodecType::from(kind.to_lowercase().as_str()),
            None => RTPCodecType::Unspecified,
        }
    }

    pub fn is_rtx(&self) -> bool {
        UniCase::new(self.mime_type.as_str()) == UniCase::new(MIME_TYPE_RTX_VIDEO)
            || UniCase::new(self.mime_type.as_str()) == UniCase::new(MIME_TYPE_RTX_AUDIO)
    }

    /// is_media is false for retransmission, FEC and comfort noise codecs,
    /// which never carry a track on their own.
    pub fn is_media(&self) -> bool {
        let mime_type = UniCase::new(self.mime_type.as_str());
        !self.is_rtx()
            && mime_type != UniCase::new(MIME_TYPE_ULPFEC)
            && mime_type != UniCase::new(MIME_TYPE_FLEXFEC)
            && mime_type != UniCase::new(MIME_TYPE_RED)
            && mime_type != UniCase::new(MIME_TYPE_CN)
            && mime_type != UniCase::new(MIME_TYPE_TELEPHONE_EVENT)
    }

    /// apt returns the associated payload type of an RTX codec.
    pub(crate) fn apt(&self) -> Option<PayloadType> {
        fmtp::parse_fmtp(&self.sdp_fmtp_line)
            .get("apt")
            .and_then(|apt| apt.parse().ok())
    }
}

/// RTCRtpHeaderExtensionCapability is an RFC5285 header extension one side
/// supports, with the id it prefers.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtpcapabilities-headerextensions>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtpHeaderExtensionCapability {
    pub kind: RTPCodecType,
    pub uri: String,
    pub preferred_id: u16,
}

/// RTCRtpHeaderExtensionParameters represents a negotiated RFC5285 RTP header extension.
/// <https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpheaderextensionparameters-members>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RTCRtpHeaderExtensionParameters {
    pub uri: String,
    pub id: u16,
}

/// RTCRtpCodecParameters is a codec together with the payload type it was
/// negotiated under.
/// <https://w3c.github.io/webrtc-pc/#rtcrtpcodecparameters>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCRtpCodecParameters {
    #[serde(flatten)]
    pub capability: RTCRtpCodecCapability,
    pub payload_type: PayloadType,
}

#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub(crate) enum CodecMatch {
    #[default]
    None = 0,
    Partial = 1,
    Exact = 2,
}

/// codec_match compares two codecs on mime type, clock rate, channels and
/// the codec specific fmtp parameters. Payload types are not compared.
pub(crate) fn codec_match(a: &RTCRtpCodecCapability, b: &RTCRtpCodecCapability) -> CodecMatch {
    if UniCase::new(a.mime_type.as_str()) != UniCase::new(b.mime_type.as_str()) {
        return CodecMatch::None;
    }
    if a.clock_rate != b.clock_rate {
        return CodecMatch::None;
    }
    if a.kind() == RTPCodecType::Audio && a.channels.max(1) != b.channels.max(1) {
        return CodecMatch::None;
    }
    if a.is_rtx() {
        // rtx pairs are matched through their apt
        return CodecMatch::Exact;
    }

    if fmtp::fmtp_match(&a.mime_type, &a.sdp_fmtp_line, &b.sdp_fmtp_line) {
        CodecMatch::Exact
    } else {
        CodecMatch::Partial
    }
}

/// Do a fuzzy find for a codec in the list of codecs
/// Used for lookup up a codec in an existing list to find a match
/// Returns codecMatchExact, codecMatchPartial, or codecMatchNone
pub(crate) fn codec_parameters_fuzzy_search(
    needle: &RTCRtpCodecParameters,
    haystack: &[RTCRtpCodecParameters],
) -> (RTCRtpCodecParameters, CodecMatch) {
    let mut partial = None;
    for c in haystack {
        match codec_match(&needle.capability, &c.capability) {
            CodecMatch::Exact => return (c.clone(), CodecMatch::Exact),
            CodecMatch::Partial if partial.is_none() => partial = Some(c.clone()),
            _ => {}
        }
    }

    match partial {
        Some(c) => (c, CodecMatch::Partial),
        None => (RTCRtpCodecParameters::default(), CodecMatch::None),
    }
}
