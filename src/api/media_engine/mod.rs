#[cfg(test)]
mod media_engine_test;

use std::ops::RangeInclusive;

use unicase::UniCase;

use crate::error::{Error, Result};
use crate::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTCRtpHeaderExtensionCapability, RTPCodecType,
};
use crate::rtp_transceiver::{
    PayloadType, RTCPFeedback, RTCRtpCapabilities, TYPE_RTCP_FB_CCM, TYPE_RTCP_FB_GOOG_REMB,
    TYPE_RTCP_FB_NACK, TYPE_RTCP_FB_TRANSPORT_CC,
};

/// MIME_TYPE_H264 H264 MIME type.
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_H264: &str = "video/H264";
/// MIME_TYPE_OPUS Opus MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_OPUS: &str = "audio/opus";
/// MIME_TYPE_VP8 VP8 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_VP8: &str = "video/VP8";
/// MIME_TYPE_VP9 VP9 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_VP9: &str = "video/VP9";
/// MIME_TYPE_G722 G722 MIME type
pub const MIME_TYPE_G722: &str = "audio/G722";
/// MIME_TYPE_PCMU PCMU MIME type
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";
/// MIME_TYPE_PCMA PCMA MIME type
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";
/// MIME_TYPE_TELEPHONE_EVENT telephone-event MIME type
pub const MIME_TYPE_TELEPHONE_EVENT: &str = "audio/telephone-event";
/// MIME_TYPE_CN comfort noise MIME type
pub const MIME_TYPE_CN: &str = "audio/CN";
/// MIME_TYPE_RTX_VIDEO retransmission MIME type for video
pub const MIME_TYPE_RTX_VIDEO: &str = "video/rtx";
/// MIME_TYPE_RTX_AUDIO retransmission MIME type for audio
pub const MIME_TYPE_RTX_AUDIO: &str = "audio/rtx";
/// MIME_TYPE_ULPFEC ULPFEC MIME type
pub const MIME_TYPE_ULPFEC: &str = "video/ulpfec";
/// MIME_TYPE_FLEXFEC FlexFEC MIME type
pub const MIME_TYPE_FLEXFEC: &str = "video/flexfec-03";
/// MIME_TYPE_RED RED MIME type
pub const MIME_TYPE_RED: &str = "video/red";

pub const SDES_MID_URI: &str = "urn:ietf:params:rtp-hdrext:sdes:mid";
pub const SDES_RTP_STREAM_ID_URI: &str = "urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id";
pub const SDES_REPAIR_RTP_STREAM_ID_URI: &str =
    "urn:ietf:params:rtp-hdrext:sdes:repaired-rtp-stream-id";
pub const ABS_SEND_TIME_URI: &str = "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
pub const TRANSPORT_CC_URI: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";
pub const AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:ssrc-audio-level";
pub const VIDEO_ORIENTATION_URI: &str = "urn:3gpp:video-orientation";
pub const TOFFSET_URI: &str = "urn:ietf:params:rtp-hdrext:toffset";

// one-byte header extension ids
const VALID_EXT_IDS: RangeInclusive<u16> = 1..=14;

fn codec(
    mime_type: &str,
    clock_rate: u32,
    channels: u16,
    sdp_fmtp_line: &str,
    rtcp_feedback: &[RTCPFeedback],
    payload_type: PayloadType,
) -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            clock_rate,
            channels,
            sdp_fmtp_line: sdp_fmtp_line.to_owned(),
            rtcp_feedback: rtcp_feedback.to_vec(),
        },
        payload_type,
    }
}

fn rtx(payload_type: PayloadType, apt: PayloadType) -> RTCRtpCodecParameters {
    codec(
        MIME_TYPE_RTX_VIDEO,
        90000,
        0,
        &format!("apt={apt}"),
        &[],
        payload_type,
    )
}

fn feedback(typ: &str, parameter: &str) -> RTCPFeedback {
    RTCPFeedback {
        typ: typ.to_owned(),
        parameter: parameter.to_owned(),
    }
}

/// A MediaEngine defines the codecs, header extensions and FEC mechanisms a
/// transport engine offers. It is the source of the capability set
/// reported to signaling servers and of the local side of negotiation.
#[derive(Default, Debug, Clone)]
pub struct MediaEngine {
    pub(crate) audio_codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) video_codecs: Vec<RTCRtpCodecParameters>,
    header_extensions: Vec<RTCRtpHeaderExtensionCapability>,
    fec_mechanisms: Vec<String>,
}

impl MediaEngine {
    /// with_defaults returns an engine with the default codecs and header
    /// extensions registered.
    pub fn with_defaults() -> Self {
        let mut m = MediaEngine::default();
        m.register_default_codecs();
        m.register_default_header_extensions();
        m
    }

    /// register_default_codecs registers opus, G722, PCMU, PCMA, VP8, VP9,
    /// H264 (with RTX for every video codec) and ULPFEC.
    pub fn register_default_codecs(&mut self) {
        let audio_rtcp_feedback = [feedback(TYPE_RTCP_FB_TRANSPORT_CC, "")];
        for c in [
            codec(
                MIME_TYPE_OPUS,
                48000,
                2,
                "minptime=10;useinbandfec=1",
                &audio_rtcp_feedback,
                111,
            ),
            codec(MIME_TYPE_G722, 8000, 0, "", &[], 9),
            codec(MIME_TYPE_PCMU, 8000, 0, "", &[], 0),
            codec(MIME_TYPE_PCMA, 8000, 0, "", &[], 8),
        ] {
            MediaEngine::add_codec(&mut self.audio_codecs, c);
        }

        let video_rtcp_feedback = [
            feedback(TYPE_RTCP_FB_GOOG_REMB, ""),
            feedback(TYPE_RTCP_FB_TRANSPORT_CC, ""),
            feedback(TYPE_RTCP_FB_CCM, "fir"),
            feedback(TYPE_RTCP_FB_NACK, ""),
            feedback(TYPE_RTCP_FB_NACK, "pli"),
        ];
        for c in [
            codec(MIME_TYPE_VP8, 90000, 0, "", &video_rtcp_feedback, 96),
            rtx(97, 96),
            codec(MIME_TYPE_VP9, 90000, 0, "profile-id=0", &video_rtcp_feedback, 98),
            rtx(99, 98),
            codec(
                MIME_TYPE_H264,
                90000,
                0,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42001f",
                &video_rtcp_feedback,
                102,
            ),
            rtx(121, 102),
            codec(
                MIME_TYPE_H264,
                90000,
                0,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
                &video_rtcp_feedback,
                125,
            ),
            rtx(107, 125),
            codec(
                MIME_TYPE_H264,
                90000,
                0,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=640032",
                &video_rtcp_feedback,
                123,
            ),
            rtx(118, 123),
            codec(MIME_TYPE_ULPFEC, 90000, 0, "", &[], 116),
        ] {
            MediaEngine::add_codec(&mut self.video_codecs, c);
        }
    }

    /// register_default_header_extensions registers the header extensions
    /// an SFU expects per media kind.
    pub fn register_default_header_extensions(&mut self) {
        let defaults = [
            (RTPCodecType::Audio, SDES_MID_URI, 1),
            (RTPCodecType::Audio, ABS_SEND_TIME_URI, 4),
            (RTPCodecType::Audio, AUDIO_LEVEL_URI, 10),
            (RTPCodecType::Video, SDES_MID_URI, 1),
            (RTPCodecType::Video, SDES_RTP_STREAM_ID_URI, 2),
            (RTPCodecType::Video, SDES_REPAIR_RTP_STREAM_ID_URI, 3),
            (RTPCodecType::Video, ABS_SEND_TIME_URI, 4),
            (RTPCodecType::Video, TRANSPORT_CC_URI, 5),
            (RTPCodecType::Video, VIDEO_ORIENTATION_URI, 11),
            (RTPCodecType::Video, TOFFSET_URI, 12),
        ];

        for (kind, uri, preferred_id) in defaults {
            if !self.has_header_extension(kind, uri) {
                self.header_extensions.push(RTCRtpHeaderExtensionCapability {
                    kind,
                    uri: uri.to_owned(),
                    preferred_id,
                });
            }
        }
    }

    /// add_codec will append codec if it not exists
    fn add_codec(codecs: &mut Vec<RTCRtpCodecParameters>, codec: RTCRtpCodecParameters) {
        let exists = codecs.iter().any(|c| {
            UniCase::new(c.capability.mime_type.as_str())
                == UniCase::new(codec.capability.mime_type.as_str())
                && c.payload_type == codec.payload_type
        });
        if !exists {
            codecs.push(codec);
        }
    }

    /// register_codec adds codec to the MediaEngine.
    pub fn register_codec(&mut self, codec: RTCRtpCodecParameters, typ: RTPCodecType) -> Result<()> {
        match typ {
            RTPCodecType::Audio => {
                MediaEngine::add_codec(&mut self.audio_codecs, codec);
                Ok(())
            }
            RTPCodecType::Video => {
                MediaEngine::add_codec(&mut self.video_codecs, codec);
                Ok(())
            }
            _ => Err(Error::ErrUnknownType),
        }
    }

    fn has_header_extension(&self, kind: RTPCodecType, uri: &str) -> bool {
        self.header_extensions
            .iter()
            .any(|ext| ext.kind == kind && ext.uri == uri)
    }

    /// register_header_extension adds a header extension for one media kind.
    /// A `preferred_id` of 0 picks the lowest id not yet used by that kind.
    pub fn register_header_extension(
        &mut self,
        mut extension: RTCRtpHeaderExtensionCapability,
    ) -> Result<()> {
        if extension.kind == RTPCodecType::Unspecified {
            return Err(Error::ErrUnknownType);
        }
        if self.has_header_extension(extension.kind, &extension.uri) {
            return Ok(());
        }

        if extension.preferred_id == 0 {
            let used: Vec<u16> = self
                .header_extensions
                .iter()
                .filter(|ext| ext.kind == extension.kind)
                .map(|ext| ext.preferred_id)
                .collect();
            extension.preferred_id = VALID_EXT_IDS
                .clone()
                .find(|id| !used.contains(id))
                .ok_or(Error::ErrRegisterHeaderExtensionNoFreeID)?;
        } else if !VALID_EXT_IDS.contains(&extension.preferred_id) {
            return Err(Error::ErrRegisterHeaderExtensionNoFreeID);
        }

        self.header_extensions.push(extension);
        Ok(())
    }

    /// register_feedback adds feedback mechanism to already registered codecs.
    pub fn register_feedback(&mut self, feedback: RTCPFeedback, typ: RTPCodecType) {
        let codecs = match typ {
            RTPCodecType::Video => &mut self.video_codecs,
            RTPCodecType::Audio => &mut self.audio_codecs,
            RTPCodecType::Unspecified => return,
        };
        for c in codecs.iter_mut().filter(|c| c.capability.is_media()) {
            if !c.capability.rtcp_feedback.contains(&feedback) {
                c.capability.rtcp_feedback.push(feedback.clone());
            }
        }
    }

    /// register_fec_mechanism announces a FEC mechanism, e.g. `RED+ULPFEC`.
    pub fn register_fec_mechanism(&mut self, mechanism: &str) {
        if !self.fec_mechanisms.iter().any(|m| m == mechanism) {
            self.fec_mechanisms.push(mechanism.to_owned());
        }
    }

    pub(crate) fn get_codecs_by_kind(&self, typ: RTPCodecType) -> &[RTCRtpCodecParameters] {
        match typ {
            RTPCodecType::Audio => &self.audio_codecs,
            RTPCodecType::Video => &self.video_codecs,
            RTPCodecType::Unspecified => &[],
        }
    }

    /// get_rtp_capabilities returns the registered codecs (audio first),
    /// header extensions and FEC mechanisms.
    pub fn get_rtp_capabilities(&self) -> RTCRtpCapabilities {
        RTCRtpCapabilities {
            codecs: self
                .audio_codecs
                .iter()
                .chain(self.video_codecs.iter())
                .cloned()
                .collect(),
            header_extensions: self.header_extensions.clone(),
            fec_mechanisms: self.fec_mechanisms.clone(),
        }
    }
}
