use super::*;

#[test]
fn test_opus_case() -> Result<()> {
    let m = MediaEngine::with_defaults();

    let opus = m
        .get_codecs_by_kind(RTPCodecType::Audio)
        .iter()
        .find(|c| UniCase::new(c.capability.mime_type.as_str()) == UniCase::new("AUDIO/OPUS"))
        .ok_or(Error::ErrNoCodecsAvailable)?;
    assert_eq!(opus.payload_type, 111);
    assert_eq!(opus.capability.clock_rate, 48000);
    assert_eq!(opus.capability.channels, 2);

    Ok(())
}

#[test]
fn test_video_case() -> Result<()> {
    let m = MediaEngine::with_defaults();
    let video = m.get_codecs_by_kind(RTPCodecType::Video);

    for mime_type in [MIME_TYPE_VP8, MIME_TYPE_VP9, MIME_TYPE_H264] {
        assert!(
            video.iter().any(|c| c.capability.mime_type == mime_type),
            "missing {mime_type}"
        );
    }

    // every rtx points at a registered media codec
    for c in video.iter().filter(|c| c.capability.is_rtx()) {
        let apt = c.capability.apt().ok_or(Error::ErrUnknownType)?;
        assert!(video
            .iter()
            .any(|m| m.payload_type == apt && m.capability.is_media()));
    }

    Ok(())
}

#[test]
fn test_register_codec_deduplicates() -> Result<()> {
    let mut m = MediaEngine::default();
    let pcmu = codec(MIME_TYPE_PCMU, 8000, 0, "", &[], 0);

    m.register_codec(pcmu.clone(), RTPCodecType::Audio)?;
    m.register_codec(pcmu.clone(), RTPCodecType::Audio)?;
    assert_eq!(m.get_codecs_by_kind(RTPCodecType::Audio).len(), 1);

    assert_eq!(
        m.register_codec(pcmu, RTPCodecType::Unspecified),
        Err(Error::ErrUnknownType)
    );

    Ok(())
}

#[test]
fn test_default_header_extensions() {
    let caps = MediaEngine::with_defaults().get_rtp_capabilities();

    let audio: Vec<&str> = caps
        .header_extensions
        .iter()
        .filter(|ext| ext.kind == RTPCodecType::Audio)
        .map(|ext| ext.uri.as_str())
        .collect();
    assert_eq!(audio, vec![SDES_MID_URI, ABS_SEND_TIME_URI, AUDIO_LEVEL_URI]);

    assert!(caps
        .header_extensions
        .iter()
        .any(|ext| ext.kind == RTPCodecType::Video && ext.uri == SDES_RTP_STREAM_ID_URI));
}

#[test]
fn test_register_header_extension() -> Result<()> {
    let mut m = MediaEngine::default();

    m.register_header_extension(RTCRtpHeaderExtensionCapability {
        kind: RTPCodecType::Video,
        uri: SDES_MID_URI.to_owned(),
        preferred_id: 0,
    })?;
    m.register_header_extension(RTCRtpHeaderExtensionCapability {
        kind: RTPCodecType::Video,
        uri: TOFFSET_URI.to_owned(),
        preferred_id: 0,
    })?;
    // same uri for audio gets its own entry
    m.register_header_extension(RTCRtpHeaderExtensionCapability {
        kind: RTPCodecType::Audio,
        uri: SDES_MID_URI.to_owned(),
        preferred_id: 0,
    })?;

    let ids: Vec<(RTPCodecType, u16)> = m
        .get_rtp_capabilities()
        .header_extensions
        .iter()
        .map(|ext| (ext.kind, ext.preferred_id))
        .collect();
    assert_eq!(
        ids,
        vec![
            (RTPCodecType::Video, 1),
            (RTPCodecType::Video, 2),
            (RTPCodecType::Audio, 1)
        ]
    );

    let result = m.register_header_extension(RTCRtpHeaderExtensionCapability {
        kind: RTPCodecType::Unspecified,
        uri: AUDIO_LEVEL_URI.to_owned(),
        preferred_id: 0,
    });
    assert_eq!(result, Err(Error::ErrUnknownType));

    Ok(())
}

#[test]
fn test_register_header_extension_no_free_id() -> Result<()> {
    let mut m = MediaEngine::default();
    for i in 0..14 {
        m.register_header_extension(RTCRtpHeaderExtensionCapability {
            kind: RTPCodecType::Audio,
            uri: format!("urn:test:{i}"),
            preferred_id: 0,
        })?;
    }

    let result = m.register_header_extension(RTCRtpHeaderExtensionCapability {
        kind: RTPCodecType::Audio,
        uri: "urn:test:overflow".to_owned(),
        preferred_id: 0,
    });
    assert_eq!(result, Err(Error::ErrRegisterHeaderExtensionNoFreeID));

    let result = m.register_header_extension(RTCRtpHeaderExtensionCapability {
        kind: RTPCodecType::Video,
        uri: "urn:test:too-large".to_owned(),
        preferred_id: 15,
    });
    assert_eq!(result, Err(Error::ErrRegisterHeaderExtensionNoFreeID));

    Ok(())
}

#[test]
fn test_register_feedback_and_fec() {
    let mut m = MediaEngine::with_defaults();
    let fb = RTCPFeedback {
        typ: TYPE_RTCP_FB_NACK.to_owned(),
        parameter: String::new(),
    };
    m.register_feedback(fb.clone(), RTPCodecType::Audio);
    m.register_feedback(fb.clone(), RTPCodecType::Audio);

    for c in m.get_codecs_by_kind(RTPCodecType::Audio) {
        assert_eq!(
            c.capability.rtcp_feedback.iter().filter(|f| **f == fb).count(),
            1
        );
    }

    m.register_fec_mechanism("RED+ULPFEC");
    m.register_fec_mechanism("RED+ULPFEC");
    assert_eq!(
        m.get_rtp_capabilities().fec_mechanisms,
        vec!["RED+ULPFEC".to_owned()]
    );
}
