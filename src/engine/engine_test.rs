use std::sync::atomic::{AtomicUsize, Ordering};

use super::loopback::{LoopbackEngine, LoopbackEngineFactory, LoopbackOperation};
use super::*;
use crate::api::get_native_rtp_capabilities;
use crate::error::Error;
use crate::ortc::{get_extended_rtp_capabilities, get_sending_rtp_parameters};
use crate::rtp_transceiver::simulcast_encodings;
use crate::track::track_local::TrackLocalStatic;

fn sending_parameters(kind: RTPCodecType) -> RTCRtpParameters {
    let native = get_native_rtp_capabilities();
    get_sending_rtp_parameters(kind, &get_extended_rtp_capabilities(&native, &native))
}

fn local_track(id: &str, kind: RTPCodecType) -> Arc<dyn TrackLocal> {
    Arc::new(TrackLocalStatic::new(id.to_owned(), "stream".to_owned(), kind))
}

#[tokio::test]
async fn test_loopback_add_sender_assigns_identifiers() -> Result<()> {
    let engine = LoopbackEngine::new(TransportConfiguration::default());
    let template = sending_parameters(RTPCodecType::Video);

    let sender = engine
        .add_sender(local_track("v", RTPCodecType::Video), &template, vec![])
        .await?;
    let params = sender.get_parameters().await;
    assert_eq!(params.mid.as_deref(), Some("0"));
    assert_eq!(params.encodings.len(), 1);
    assert!(params.encodings[0].ssrc.is_some());
    assert!(params.encodings[0].rtx.is_some(), "video template carries rtx");
    assert_eq!(params.rtcp.cname, engine.cname());
    assert_eq!(params.codecs, template.codecs);

    let sender = engine
        .add_sender(
            local_track("v2", RTPCodecType::Video),
            &template,
            simulcast_encodings(),
        )
        .await?;
    let params = sender.get_parameters().await;
    assert_eq!(params.mid.as_deref(), Some("1"));
    assert_eq!(params.encodings.len(), 3);
    assert_eq!(params.encodings[2].rid, "high");

    let audio = engine
        .add_sender(
            local_track("a", RTPCodecType::Audio),
            &sending_parameters(RTPCodecType::Audio),
            vec![],
        )
        .await?;
    assert!(audio.get_parameters().await.encodings[0].rtx.is_none());
    assert_eq!(engine.active_senders().await, 3);

    Ok(())
}

#[tokio::test]
async fn test_loopback_without_codecs() -> Result<()> {
    let engine = LoopbackEngine::new(TransportConfiguration::default());

    let result = engine
        .add_sender(
            local_track("a", RTPCodecType::Audio),
            &RTCRtpParameters::default(),
            vec![],
        )
        .await;
    assert!(matches!(result, Err(Error::ErrEngine(_))));

    // receivers take the payload type from the packets they see
    let receive_parameters = RTCRtpParameters {
        encodings: vec![RTCRtpEncodingParameters {
            ssrc: Some(1234),
            ..Default::default()
        }],
        ..Default::default()
    };
    let receiver = engine
        .add_receiver("r", RTPCodecType::Audio, &receive_parameters)
        .await?;
    assert_eq!(receiver.track().await.ssrc(), 1234);

    Ok(())
}

#[tokio::test]
async fn test_loopback_sender_set_parameters_and_replace() -> Result<()> {
    let engine = LoopbackEngine::new(TransportConfiguration::default());
    let sender = engine
        .add_sender(
            local_track("v", RTPCodecType::Video),
            &sending_parameters(RTPCodecType::Video),
            simulcast_encodings(),
        )
        .await?;
    let assigned = sender.get_parameters().await.encodings;

    let mut encodings = simulcast_encodings();
    encodings[2].active = false;
    sender.set_parameters(encodings).await?;
    let updated = sender.get_parameters().await.encodings;
    assert!(!updated[2].active);
    assert_eq!(updated[2].ssrc, assigned[2].ssrc);

    assert!(matches!(
        sender.set_parameters(vec![]).await,
        Err(Error::ErrEngine(_))
    ));

    assert!(matches!(
        sender
            .replace_track(local_track("a", RTPCodecType::Audio))
            .await,
        Err(Error::ErrEngine(_))
    ));
    sender
        .replace_track(local_track("v2", RTPCodecType::Video))
        .await?;
    assert_eq!(sender.track().await.id(), "v2");

    sender.stop().await?;
    assert!(sender
        .replace_track(local_track("v3", RTPCodecType::Video))
        .await
        .is_err());

    Ok(())
}

#[tokio::test]
async fn test_loopback_state_changes() -> Result<()> {
    let engine = LoopbackEngine::new(TransportConfiguration::default());
    let changes = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&changes);
    engine.on_ice_connection_state_change(Box::new(move |_state: RTCIceConnectionState| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }));

    assert_eq!(engine.ice_connection_state(), RTCIceConnectionState::New);
    engine.restart_ice(&RTCIceParameters::default()).await?;
    assert_eq!(changes.load(Ordering::SeqCst), 0, "not connected yet");
    assert_eq!(engine.ice_restarts(), 1);

    engine
        .add_receiver(
            "r",
            RTPCodecType::Video,
            &sending_parameters(RTPCodecType::Video),
        )
        .await?;
    assert_eq!(changes.load(Ordering::SeqCst), 2);
    assert_eq!(engine.ice_connection_state(), RTCIceConnectionState::Connected);

    engine.close().await?;
    engine.close().await?;
    assert_eq!(changes.load(Ordering::SeqCst), 3);
    assert_eq!(engine.ice_connection_state(), RTCIceConnectionState::Closed);
    assert_eq!(engine.active_receivers().await, 0);

    assert!(engine.local_dtls_parameters().await.is_err());
    assert!(engine.update_ice_servers(&[]).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_loopback_scripted_failures() -> Result<()> {
    let engine = LoopbackEngine::new(TransportConfiguration::default());

    engine.set_failure(LoopbackOperation::Close, true).await;
    assert_eq!(
        engine.close().await,
        Err(Error::ErrEngine("loopback rejected Close".to_owned()))
    );
    assert_eq!(engine.ice_connection_state(), RTCIceConnectionState::New);

    engine.set_failure(LoopbackOperation::Close, false).await;
    engine.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_loopback_local_dtls_parameters() -> Result<()> {
    let engine = LoopbackEngine::new(TransportConfiguration::default());

    let dtls_parameters = engine.local_dtls_parameters().await?;
    assert_eq!(dtls_parameters.role, DTLSRole::Auto);
    assert_eq!(dtls_parameters.fingerprints.len(), 1);
    let digest = dtls_parameters.fingerprints[0].digest();
    assert_eq!(digest.map(|d| d.len()), Some(32));

    // stable for the engine's lifetime
    assert_eq!(engine.local_dtls_parameters().await?, dtls_parameters);

    Ok(())
}

#[test]
fn test_loopback_factory_keeps_last_engine() -> Result<()> {
    let factory = LoopbackEngineFactory::new();
    assert!(factory.last_engine().is_none());

    let config = TransportConfiguration {
        local_dtls_role: DTLSRole::Client,
        ..Default::default()
    };
    factory.new_engine(config)?;
    factory.new_engine(TransportConfiguration::default())?;

    assert_eq!(factory.engines_created(), 2);
    let last = factory.last_engine();
    assert_eq!(
        last.map(|e| e.config().local_dtls_role),
        Some(DTLSRole::Unspecified)
    );

    Ok(())
}
