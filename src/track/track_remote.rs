use std::sync::atomic::{AtomicUsize, Ordering};

use smol_str::SmolStr;

use crate::rtp_transceiver::rtp_codec::{RTCRtpCodecParameters, RTPCodecType};
use crate::rtp_transceiver::{PayloadType, RTCRtpParameters, SSRC};

static TRACK_REMOTE_UNIQUE_ID: AtomicUsize = AtomicUsize::new(0);

/// TrackRemote represents a single inbound source of media, as created by
/// a receive handler from the remote party's RTP parameters.
#[derive(Debug)]
pub struct TrackRemote {
    tid: usize,

    id: String,
    stream_id: String,
    kind: RTPCodecType,
    ssrc: SSRC,
    rid: SmolStr,
    codec: RTCRtpCodecParameters,
    params: RTCRtpParameters,
}

impl TrackRemote {
    pub(crate) fn from_parameters(id: &str, kind: RTPCodecType, params: &RTCRtpParameters) -> Self {
        let encoding = params.encodings.first();
        TrackRemote {
            tid: TRACK_REMOTE_UNIQUE_ID.fetch_add(1, Ordering::SeqCst),
            id: id.to_owned(),
            stream_id: params.rtcp.cname.clone(),
            kind,
            ssrc: encoding.and_then(|e| e.ssrc).unwrap_or_default(),
            rid: encoding.map(|e| e.rid.clone()).unwrap_or_default(),
            codec: params.media_codec().cloned().unwrap_or_default(),
            params: params.clone(),
        }
    }

    pub fn tid(&self) -> usize {
        self.tid
    }

    /// id is the receiver id the application registered the stream under.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// stream_id is the RTCP CNAME of the remote sender.
    pub fn stream_id(&self) -> &str {
        self.stream_id.as_str()
    }

    pub fn kind(&self) -> RTPCodecType {
        self.kind
    }

    pub fn ssrc(&self) -> SSRC {
        self.ssrc
    }

    /// rid is the RTP stream id of the first encoding, empty when the remote
    /// sender is not simulcasting.
    pub fn rid(&self) -> &str {
        self.rid.as_str()
    }

    pub fn payload_type(&self) -> PayloadType {
        self.codec.payload_type
    }

    pub fn codec(&self) -> &RTCRtpCodecParameters {
        &self.codec
    }

    pub fn params(&self) -> &RTCRtpParameters {
        &self.params
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
    use crate::rtp_transceiver::{RTCRtcpParameters, RTCRtpEncodingParameters};

    #[test]
    fn test_track_remote_from_parameters() {
        let params = RTCRtpParameters {
            codecs: vec![
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: "video/rtx".to_owned(),
                        clock_rate: 90000,
                        sdp_fmtp_line: "apt=101".to_owned(),
                        ..Default::default()
                    },
                    payload_type: 102,
                },
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: "video/VP8".to_owned(),
                        clock_rate: 90000,
                        ..Default::default()
                    },
                    payload_type: 101,
                },
            ],
            encodings: vec![RTCRtpEncodingParameters {
                ssrc: Some(11111111),
                ..Default::default()
            }],
            rtcp: RTCRtcpParameters {
                cname: "test-cname".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        };

        let a = TrackRemote::from_parameters("r1", RTPCodecType::Video, &params);
        let b = TrackRemote::from_parameters("r2", RTPCodecType::Video, &params);

        assert_eq!(a.id(), "r1");
        assert_eq!(a.stream_id(), "test-cname");
        assert_eq!(a.ssrc(), 11111111);
        assert_eq!(a.payload_type(), 101);
        assert_eq!(a.rid(), "");
        assert_ne!(a.tid(), b.tid());
    }
}
