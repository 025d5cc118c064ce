//! ORTC style negotiation between the local capabilities and those of the
//! remote party: which codecs and header extensions both sides support, and
//! under which payload types and ids.


use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rtp_transceiver::rtp_codec::{
    codec_match, CodecMatch, RTCRtpCodecCapability, RTCRtpCodecParameters,
    RTCRtpHeaderExtensionParameters, RTPCodecType,
};
use crate::rtp_transceiver::{PayloadType, RTCPFeedback, RTCRtpCapabilities, RTCRtpParameters};

/// RTCExtendedRtpCodec is a codec supported by both sides.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCExtendedRtpCodec {
    pub kind: RTPCodecType,
    /// Local capability, with rtcp feedback reduced to what both sides support.
    pub capability: RTCRtpCodecCapability,
    pub local_payload_type: PayloadType,
    pub local_rtx_payload_type: Option<PayloadType>,
    pub remote_payload_type: PayloadType,
    pub remote_rtx_payload_type: Option<PayloadType>,
    pub remote_sdp_fmtp_line: String,
}

/// RTCExtendedHeaderExtension is a header extension supported by both sides,
/// with the id each side uses when sending.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCExtendedHeaderExtension {
    pub kind: RTPCodecType,
    pub uri: String,
    pub send_id: u16,
    pub recv_id: u16,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCExtendedRtpCapabilities {
    pub codecs: Vec<RTCExtendedRtpCodec>,
    pub header_extensions: Vec<RTCExtendedHeaderExtension>,
}

/// RtpParametersByKind holds the RTP parameter template a handler uses for
/// each media kind.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtpParametersByKind {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<RTCRtpParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<RTCRtpParameters>,
}

impl RtpParametersByKind {
    pub fn get(&self, kind: RTPCodecType) -> Option<&RTCRtpParameters> {
        match kind {
            RTPCodecType::Audio => self.audio.as_ref(),
            RTPCodecType::Video => self.video.as_ref(),
            RTPCodecType::Unspecified => None,
        }
    }
}

fn reduce_rtcp_feedback(local: &[RTCPFeedback], remote: &[RTCPFeedback]) -> Vec<RTCPFeedback> {
    local
        .iter()
        .filter(|fb| remote.contains(fb))
        .cloned()
        .collect()
}

/// get_extended_rtp_capabilities intersects the local and remote
/// capabilities. Codec order follows the remote side.
pub fn get_extended_rtp_capabilities(
    local: &RTCRtpCapabilities,
    remote: &RTCRtpCapabilities,
) -> RTCExtendedRtpCapabilities {
    let mut extended = RTCExtendedRtpCapabilities::default();

    for remote_codec in remote.codecs.iter().filter(|c| !c.capability.is_rtx()) {
        let matching = local.codecs.iter().find(|local_codec| {
            codec_match(&local_codec.capability, &remote_codec.capability) == CodecMatch::Exact
        });
        let local_codec = match matching {
            Some(local_codec) => local_codec,
            None => continue,
        };

        let mut capability = local_codec.capability.clone();
        capability.rtcp_feedback = reduce_rtcp_feedback(
            &local_codec.capability.rtcp_feedback,
            &remote_codec.capability.rtcp_feedback,
        );

        extended.codecs.push(RTCExtendedRtpCodec {
            kind: capability.kind(),
            capability,
            local_payload_type: local_codec.payload_type,
            local_rtx_payload_type: None,
            remote_payload_type: remote_codec.payload_type,
            remote_rtx_payload_type: None,
            remote_sdp_fmtp_line: remote_codec.capability.sdp_fmtp_line.clone(),
        });
    }

    // rtx is only kept when both sides offer it for the codec
    for extended_codec in &mut extended.codecs {
        let rtx_for = |codecs: &[RTCRtpCodecParameters], apt: PayloadType| {
            codecs
                .iter()
                .find(|c| c.capability.is_rtx() && c.capability.apt() == Some(apt))
                .map(|c| c.payload_type)
        };

        let local_rtx = rtx_for(&local.codecs, extended_codec.local_payload_type);
        let remote_rtx = rtx_for(&remote.codecs, extended_codec.remote_payload_type);
        if let (Some(local_rtx), Some(remote_rtx)) = (local_rtx, remote_rtx) {
            extended_codec.local_rtx_payload_type = Some(local_rtx);
            extended_codec.remote_rtx_payload_type = Some(remote_rtx);
        }
    }

    for remote_ext in &remote.header_extensions {
        if let Some(local_ext) = local
            .header_extensions
            .iter()
            .find(|ext| ext.kind == remote_ext.kind && ext.uri == remote_ext.uri)
        {
            extended.header_extensions.push(RTCExtendedHeaderExtension {
                kind: remote_ext.kind,
                uri: remote_ext.uri.clone(),
                send_id: local_ext.preferred_id,
                recv_id: remote_ext.preferred_id,
            });
        }
    }

    extended
}

/// get_sending_rtp_parameters builds the RTP parameter template for sending
/// media of the given kind. Encodings and RTCP are left for the engine.
pub fn get_sending_rtp_parameters(
    kind: RTPCodecType,
    extended: &RTCExtendedRtpCapabilities,
) -> RTCRtpParameters {
    let mut params = RTCRtpParameters::default();

    for extended_codec in extended.codecs.iter().filter(|c| c.kind == kind) {
        params.codecs.push(RTCRtpCodecParameters {
            capability: extended_codec.capability.clone(),
            payload_type: extended_codec.local_payload_type,
        });

        if let Some(rtx_payload_type) = extended_codec.local_rtx_payload_type {
            params.codecs.push(RTCRtpCodecParameters {
                capability: RTCRtpCodecCapability {
                    mime_type: format!("{kind}/rtx"),
                    clock_rate: extended_codec.capability.clock_rate,
                    channels: 0,
                    sdp_fmtp_line: format!("apt={}", extended_codec.local_payload_type),
                    rtcp_feedback: vec![],
                },
                payload_type: rtx_payload_type,
            });
        }
    }

    params.header_extensions = extended
        .header_extensions
        .iter()
        .filter(|ext| ext.kind == kind)
        .map(|ext| RTCRtpHeaderExtensionParameters {
            uri: ext.uri.clone(),
            id: ext.send_id,
        })
        .collect();

    params
}

/// get_rtp_parameters_by_kind builds the per kind templates. A kind without
/// any common codec gets no template, so sending it fails.
pub fn get_rtp_parameters_by_kind(extended: &RTCExtendedRtpCapabilities) -> RtpParametersByKind {
    let template = |kind| {
        if can_send(kind, extended) {
            Some(get_sending_rtp_parameters(kind, extended))
        } else {
            None
        }
    };

    RtpParametersByKind {
        audio: template(RTPCodecType::Audio),
        video: template(RTPCodecType::Video),
    }
}

/// can_send reports whether media of the given kind can be sent.
pub fn can_send(kind: RTPCodecType, extended: &RTCExtendedRtpCapabilities) -> bool {
    extended.codecs.iter().any(|c| c.kind == kind)
}

/// can_receive reports whether a stream described by the remote party's
/// parameters can be received: its first codec must be a common one.
pub fn can_receive(params: &RTCRtpParameters, extended: &RTCExtendedRtpCapabilities) -> bool {
    match params.codecs.first() {
        Some(first) => extended
            .codecs
            .iter()
            .any(|c| c.remote_payload_type == first.payload_type),
        None => false,
    }
}

/// reduce_codecs keeps a single media codec, the preferred one or the first,
/// together with its rtx codec.
pub fn reduce_codecs(
    codecs: &[RTCRtpCodecParameters],
    preferred: Option<&RTCRtpCodecCapability>,
) -> Result<Vec<RTCRtpCodecParameters>> {
    let media = match preferred {
        Some(preferred) => codecs.iter().find(|c| {
            c.capability.is_media() && codec_match(&c.capability, preferred) == CodecMatch::Exact
        }),
        None => codecs.iter().find(|c| c.capability.is_media()),
    }
    .ok_or(Error::ErrNoCodecsAvailable)?;

    let mut reduced = vec![media.clone()];
    if let Some(rtx) = codecs
        .iter()
        .find(|c| c.capability.is_rtx() && c.capability.apt() == Some(media.payload_type))
    {
        reduced.push(rtx.clone());
    }

    Ok(reduced)
}
