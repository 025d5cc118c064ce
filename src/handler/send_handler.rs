use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, trace, warn};
use portable_atomic::AtomicBool;
use tokio::sync::Mutex;

use super::registry::Registry;
use super::transport_session::TransportSession;
use super::{HandlerConfiguration, HandlerListener};
use crate::dtls_transport::dtls_role::DEFAULT_DTLS_ROLE_SEND;
use crate::engine::{RtpSender, TransportEngineFactory};
use crate::error::{flatten_errs, Error, Result};
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::ice_transport::ice_server::RTCIceServer;
use crate::ortc::reduce_codecs;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::{
    simulcast_encodings, RTCRtpCapabilities, RTCRtpEncodingParameters, RTCRtpParameters,
};
use crate::stats::StatsReport;
use crate::track::track_local::TrackLocal;

struct SentTrackEntry {
    track: Arc<dyn TrackLocal>,
    sender: Arc<dyn RtpSender>,
    rtp_parameters: RTCRtpParameters,
    max_spatial_layer: u8,
}

/// SendHandler sends local tracks over one transport.
pub struct SendHandler {
    session: Arc<TransportSession>,
    owns_session: bool,
    registry: Mutex<Registry<SentTrackEntry>>,
    closed: AtomicBool,
}

impl SendHandler {
    /// new builds a handler with its own transport session.
    pub fn new(
        listener: Arc<dyn HandlerListener>,
        factory: &dyn TransportEngineFactory,
        config: &HandlerConfiguration,
    ) -> Result<Self> {
        let session = TransportSession::new(listener, factory, config, DEFAULT_DTLS_ROLE_SEND)?;
        Ok(Self::build(session, true))
    }

    /// with_session builds a handler on a session shared with other
    /// handlers. Closing the handler leaves the session open.
    pub fn with_session(session: Arc<TransportSession>) -> Self {
        Self::build(session, false)
    }

    fn build(session: Arc<TransportSession>, owns_session: bool) -> Self {
        SendHandler {
            session,
            owns_session,
            registry: Mutex::new(Registry::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<TransportSession> {
        &self.session
    }

    /// send starts sending `track` and returns the RTP parameters it is
    /// sent with. With `use_simulcast` a video track is sent in three
    /// spatial layers.
    pub async fn send(
        &self,
        track: Option<Arc<dyn TrackLocal>>,
        use_simulcast: bool,
    ) -> Result<RTCRtpParameters> {
        self.check_open()?;
        let track = track.ok_or(Error::ErrTrackNil)?;
        let kind = track.kind();
        let template = self.session.rtp_parameters(kind)?;
        let track_id = track.id().to_owned();

        trace!("send() [track:{track_id}, kind:{kind}, simulcast:{use_simulcast}]");

        let reservation = self
            .registry
            .lock()
            .await
            .reserve(&track_id)
            .ok_or(Error::ErrExistingTrack)?;

        let (sender, rtp_parameters) = self
            .create_sender(Arc::clone(&track), template, use_simulcast)
            .await?;

        let mut registry = self.registry.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            drop(reservation);
            drop(registry);
            if let Err(err) = sender.stop().await {
                warn!("failed to stop sender of track {track_id} after close: {err}");
            }
            return Err(Error::ErrHandlerClosed);
        }

        let max_spatial_layer = rtp_parameters.encodings.len().saturating_sub(1) as u8;
        reservation.commit(
            &mut *registry,
            SentTrackEntry {
                track,
                sender,
                rtp_parameters: rtp_parameters.clone(),
                max_spatial_layer,
            },
        );
        debug!(
            "sending track {track_id} [mid:{:?}, encodings:{}]",
            rtp_parameters.mid,
            rtp_parameters.encodings.len()
        );

        Ok(rtp_parameters)
    }

    async fn create_sender(
        &self,
        track: Arc<dyn TrackLocal>,
        template: RTCRtpParameters,
        use_simulcast: bool,
    ) -> Result<(Arc<dyn RtpSender>, RTCRtpParameters)> {
        self.session.ensure_connected().await?;

        let kind = track.kind();
        let send_encodings = match (use_simulcast, kind) {
            (true, RTPCodecType::Video) => simulcast_encodings(),
            (true, _) => {
                warn!("simulcast ignored for {kind} track {}", track.id());
                vec![]
            }
            (false, _) => vec![],
        };

        let engine = self.session.engine();
        let sender = engine.add_sender(track, &template, send_encodings).await?;

        let params = sender.get_parameters().await;
        match negotiate_send_parameters(params, &engine.rtp_capabilities(), kind) {
            Ok(params) => Ok((sender, params)),
            Err(err) => {
                if let Err(stop_err) = sender.stop().await {
                    warn!("failed to stop sender after negotiation failure: {stop_err}");
                }
                Err(err)
            }
        }
    }

    /// replace_track makes the sender of `old_track` send `new_track`
    /// instead. Negotiated parameters and the spatial layer are kept.
    pub async fn replace_track(
        &self,
        old_track: Option<&dyn TrackLocal>,
        new_track: Option<Arc<dyn TrackLocal>>,
    ) -> Result<()> {
        self.check_open()?;
        let old_track = old_track.ok_or(Error::ErrTrackNil)?;
        let new_track = new_track.ok_or(Error::ErrTrackNil)?;
        let (old_id, new_id) = (old_track.id().to_owned(), new_track.id().to_owned());

        trace!("replace_track() [old:{old_id}, new:{new_id}]");

        let mut registry = self.registry.lock().await;
        let entry = registry.get(&old_id).ok_or(Error::ErrTrackNotFound)?;
        if entry.track.kind() != new_track.kind() {
            return Err(Error::ErrTrackKindMismatch);
        }
        if new_id != old_id && (registry.contains(&new_id) || registry.is_reserved(&new_id)) {
            return Err(Error::ErrExistingTrack);
        }

        entry
            .sender
            .replace_track(Arc::clone(&new_track))
            .await?;

        if let Some(mut entry) = registry.remove(&old_id) {
            entry.track = new_track;
            registry.insert(&new_id, entry);
        }
        debug!("track {old_id} replaced by {new_id}");

        Ok(())
    }

    /// set_max_spatial_layer keeps the encodings up to `spatial_layer`
    /// active and deactivates the rest. `spatial_layer` must index one of the
    /// encodings the track is sent with.
    pub async fn set_max_spatial_layer(
        &self,
        track: Option<&dyn TrackLocal>,
        spatial_layer: u8,
    ) -> Result<()> {
        self.check_open()?;
        let track = track.ok_or(Error::ErrTrackNil)?;
        trace!("set_max_spatial_layer() [track:{}, layer:{spatial_layer}]", track.id());

        let mut registry = self.registry.lock().await;
        let entry = registry.get_mut(track.id()).ok_or(Error::ErrTrackNotFound)?;
        if spatial_layer as usize >= entry.rtp_parameters.encodings.len() {
            return Err(Error::ErrSpatialLayerOutOfRange);
        }

        let encodings: Vec<RTCRtpEncodingParameters> = entry
            .rtp_parameters
            .encodings
            .iter()
            .enumerate()
            .map(|(idx, encoding)| RTCRtpEncodingParameters {
                active: idx <= spatial_layer as usize,
                ..encoding.clone()
            })
            .collect();
        entry.sender.set_parameters(encodings).await?;
        entry.max_spatial_layer = spatial_layer;

        Ok(())
    }

    pub async fn get_sender_stats(&self, track: Option<&dyn TrackLocal>) -> Result<StatsReport> {
        self.check_open()?;
        let track = track.ok_or(Error::ErrTrackNil)?;

        let sender = {
            let registry = self.registry.lock().await;
            let entry = registry.get(track.id()).ok_or(Error::ErrTrackNotFound)?;
            Arc::clone(&entry.sender)
        };

        sender.get_stats().await
    }

    /// stop_sending stops the sender of `track`. The track stays registered
    /// if the engine fails to stop it.
    pub async fn stop_sending(&self, track: Option<&dyn TrackLocal>) -> Result<()> {
        self.check_open()?;
        let track = track.ok_or(Error::ErrTrackNil)?;
        trace!("stop_sending() [track:{}]", track.id());

        let mut registry = self.registry.lock().await;
        let entry = registry.get(track.id()).ok_or(Error::ErrTrackNotFound)?;
        entry.sender.stop().await?;
        registry.remove(track.id());
        debug!("stopped sending track {}", track.id());

        Ok(())
    }

    pub async fn restart_ice(&self, remote_ice_parameters: RTCIceParameters) -> Result<()> {
        self.check_open()?;
        self.session.restart_ice(remote_ice_parameters).await
    }

    pub async fn update_ice_servers(&self, ice_servers: Vec<RTCIceServer>) -> Result<()> {
        self.check_open()?;
        self.session.update_ice_servers(ice_servers).await
    }

    pub async fn get_transport_stats(&self) -> Result<StatsReport> {
        self.check_open()?;
        self.session.get_stats().await
    }

    /// close stops every sender and, if the handler created its session,
    /// closes the session. Every sender is stopped even if some fail.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        trace!("close()");

        let entries = self.registry.lock().await.drain();
        let mut errs = vec![];
        for (track_id, entry) in entries {
            if let Err(err) = entry.sender.stop().await {
                warn!("failed to stop sender of track {track_id}: {err}");
                errs.push(err);
            }
        }

        if self.owns_session {
            if let Err(err) = self.session.close().await {
                errs.push(err);
            }
        }

        flatten_errs(errs)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.session.is_closed()
    }

    /// track_ids returns the ids of the tracks being sent, sorted.
    pub async fn track_ids(&self) -> Vec<String> {
        self.registry.lock().await.keys()
    }

    pub async fn rtp_parameters(&self, track_id: &str) -> Option<RTCRtpParameters> {
        let registry = self.registry.lock().await;
        registry.get(track_id).map(|e| e.rtp_parameters.clone())
    }

    pub async fn max_spatial_layer(&self, track_id: &str) -> Option<u8> {
        let registry = self.registry.lock().await;
        registry.get(track_id).map(|e| e.max_spatial_layer)
    }

    /// track returns the track currently sent under `track_id`.
    pub async fn track(&self, track_id: &str) -> Option<Arc<dyn TrackLocal>> {
        let registry = self.registry.lock().await;
        registry.get(track_id).map(|e| Arc::clone(&e.track))
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ErrHandlerClosed)
        } else {
            Ok(())
        }
    }
}

/// negotiate_send_parameters narrows what the engine reports to a single
/// media codec (plus rtx) and the header extensions it supports for `kind`.
fn negotiate_send_parameters(
    mut params: RTCRtpParameters,
    capabilities: &RTCRtpCapabilities,
    kind: RTPCodecType,
) -> Result<RTCRtpParameters> {
    params.codecs = reduce_codecs(&params.codecs, None)?;
    params.header_extensions.retain(|ext| {
        capabilities
            .header_extensions
            .iter()
            .any(|cap| cap.kind == kind && cap.uri == ext.uri)
    });

    Ok(params)
}
