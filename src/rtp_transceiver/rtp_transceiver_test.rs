use super::*;
use crate::api::media_engine::{MediaEngine, MIME_TYPE_H264, MIME_TYPE_OPUS, MIME_TYPE_VP8};
use crate::error::Result;

#[test]
fn test_rtp_codec_type_conversions() {
    let tests = vec![
        ("audio", RTPCodecType::Audio),
        ("video", RTPCodecType::Video),
        ("Unspecified", RTPCodecType::Unspecified),
    ];

    for (kind_string, expected_kind) in tests {
        assert_eq!(RTPCodecType::from(kind_string), expected_kind);
        assert_eq!(expected_kind.to_string(), kind_string);
        assert_eq!(RTPCodecType::from(expected_kind as u8), expected_kind);
    }
}

#[test]
fn test_codec_capability_kind() {
    let tests = vec![
        (MIME_TYPE_OPUS, RTPCodecType::Audio),
        ("Video/VP8", RTPCodecType::Video),
        ("application/data", RTPCodecType::Unspecified),
        ("garbage", RTPCodecType::Unspecified),
    ];

    for (mime_type, expected_kind) in tests {
        let capability = RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            ..Default::default()
        };
        assert_eq!(capability.kind(), expected_kind, "{mime_type}");
    }
}

#[test]
fn test_codec_parameters_fuzzy_search() {
    let m = MediaEngine::with_defaults();
    let video = m.get_codecs_by_kind(RTPCodecType::Video);

    let needle = RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: "video/h264".to_owned(),
            clock_rate: 90000,
            sdp_fmtp_line: "packetization-mode=1;profile-level-id=42e034".to_owned(),
            ..Default::default()
        },
        payload_type: 100,
    };
    let (found, codec_match) = codec_parameters_fuzzy_search(&needle, video);
    assert_eq!(codec_match, CodecMatch::Exact);
    assert_eq!(found.payload_type, 125);

    let needle = RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: MIME_TYPE_H264.to_owned(),
            clock_rate: 90000,
            sdp_fmtp_line: "packetization-mode=0;profile-level-id=42e01f".to_owned(),
            ..Default::default()
        },
        payload_type: 100,
    };
    let (_, codec_match) = codec_parameters_fuzzy_search(&needle, video);
    assert_eq!(codec_match, CodecMatch::Partial);

    let needle = RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: "video/AV1".to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        payload_type: 45,
    };
    let (_, codec_match) = codec_parameters_fuzzy_search(&needle, video);
    assert_eq!(codec_match, CodecMatch::None);
}

#[test]
fn test_codec_match_channels_and_clock() {
    let opus = RTCRtpCodecCapability {
        mime_type: MIME_TYPE_OPUS.to_owned(),
        clock_rate: 48000,
        channels: 2,
        ..Default::default()
    };

    let mono = RTCRtpCodecCapability {
        channels: 1,
        ..opus.clone()
    };
    assert_eq!(codec_match(&opus, &mono), CodecMatch::None);

    let other_clock = RTCRtpCodecCapability {
        clock_rate: 16000,
        ..opus.clone()
    };
    assert_eq!(codec_match(&opus, &other_clock), CodecMatch::None);

    let vp8 = RTCRtpCodecCapability {
        mime_type: MIME_TYPE_VP8.to_owned(),
        clock_rate: 90000,
        ..Default::default()
    };
    let vp8_upper = RTCRtpCodecCapability {
        mime_type: "VIDEO/VP8".to_owned(),
        ..vp8.clone()
    };
    assert_eq!(codec_match(&vp8, &vp8_upper), CodecMatch::Exact);
}

#[test]
fn test_rtp_parameters_deserialize() -> Result<()> {
    let json = r#"{
        "codecs": [
            {"mimeType": "audio/opus", "clockRate": 48000, "channels": 2, "payloadType": 100,
             "rtcpFeedback": [{"type": "transport-cc"}]}
        ],
        "headerExtensions": [{"uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "id": 1}],
        "encodings": [{"ssrc": 11111111}],
        "rtcp": {"cname": "test-cname", "reducedSize": true, "mux": true}
    }"#;

    let params: RTCRtpParameters = serde_json::from_str(json)?;
    assert_eq!(params.mid, None);
    assert_eq!(params.first_ssrc(), Some(11111111));
    assert!(params.encodings[0].active);
    assert_eq!(params.rtcp.cname, "test-cname");

    let codec = params.media_codec().ok_or(crate::Error::ErrNoCodecsAvailable)?;
    assert_eq!(codec.payload_type, 100);
    assert_eq!(codec.capability.channels, 2);
    assert_eq!(codec.capability.rtcp_feedback[0].typ, TYPE_RTCP_FB_TRANSPORT_CC);
    assert_eq!(params.header_extensions[0].id, 1);

    Ok(())
}

#[test]
fn test_rtp_parameters_serialize_camel_case() -> Result<()> {
    let params = RTCRtpParameters {
        mid: Some("0".to_owned()),
        encodings: vec![RTCRtpEncodingParameters {
            ssrc: Some(1234),
            max_bitrate: Some(500_000),
            ..Default::default()
        }],
        ..Default::default()
    };

    let value = serde_json::to_value(&params)?;
    assert_eq!(value["mid"], "0");
    assert_eq!(value["encodings"][0]["ssrc"], 1234);
    assert_eq!(value["encodings"][0]["maxBitrate"], 500_000);
    assert!(value["encodings"][0].get("rid").is_none());
    assert_eq!(value["rtcp"]["reducedSize"], true);

    Ok(())
}

#[test]
fn test_simulcast_encodings() {
    let encodings = simulcast_encodings();
    let layers: Vec<(&str, Option<f64>)> = encodings
        .iter()
        .map(|e| (e.rid.as_str(), e.scale_resolution_down_by))
        .collect();

    assert_eq!(
        layers,
        vec![
            ("low", Some(4.0)),
            ("medium", Some(2.0)),
            ("high", Some(1.0))
        ]
    );
    assert!(encodings.iter().all(|e| e.active && e.ssrc.is_none()));
}
