use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, trace, warn};
use portable_atomic::AtomicBool;
use tokio::sync::Mutex;

use super::registry::Registry;
use super::transport_session::TransportSession;
use super::{HandlerConfiguration, HandlerListener};
use crate::dtls_transport::dtls_role::DEFAULT_DTLS_ROLE_RECV;
use crate::engine::{RtpReceiver, TransportEngineFactory};
use crate::error::{flatten_errs, Error, Result};
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::ice_transport::ice_server::RTCIceServer;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::RTCRtpParameters;
use crate::stats::StatsReport;
use crate::track::track_remote::TrackRemote;

struct ReceivedStreamEntry {
    receiver: Arc<dyn RtpReceiver>,
    track: Arc<TrackRemote>,
    rtp_parameters: RTCRtpParameters,
    kind: RTPCodecType,
}

/// RecvHandler receives remote streams over one transport, each under an
/// id chosen by the application.
pub struct RecvHandler {
    session: Arc<TransportSession>,
    owns_session: bool,
    registry: Mutex<Registry<ReceivedStreamEntry>>,
    closed: AtomicBool,
}

impl RecvHandler {
    /// new builds a handler with its own transport session.
    pub fn new(
        listener: Arc<dyn HandlerListener>,
        factory: &dyn TransportEngineFactory,
        config: &HandlerConfiguration,
    ) -> Result<Self> {
        let session = TransportSession::new(listener, factory, config, DEFAULT_DTLS_ROLE_RECV)?;
        Ok(Self::build(session, true))
    }

    /// with_session builds a handler on a session shared with other
    /// handlers. Closing the handler leaves the session open.
    pub fn with_session(session: Arc<TransportSession>) -> Self {
        Self::build(session, false)
    }

    fn build(session: Arc<TransportSession>, owns_session: bool) -> Self {
        RecvHandler {
            session,
            owns_session,
            registry: Mutex::new(Registry::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<TransportSession> {
        &self.session
    }

    /// receive starts receiving the stream described by `rtp_parameters`
    /// under `id`.
    pub async fn receive(
        &self,
        id: &str,
        kind: RTPCodecType,
        rtp_parameters: RTCRtpParameters,
    ) -> Result<Arc<TrackRemote>> {
        self.check_open()?;
        if id.is_empty() {
            return Err(Error::ErrReceiverIdEmpty);
        }
        if kind == RTPCodecType::Unspecified {
            return Err(Error::ErrUnknownType);
        }
        if rtp_parameters.encodings.is_empty() {
            return Err(Error::ErrRtpParametersNoEncodings);
        }

        trace!(
            "receive() [id:{id}, kind:{kind}, ssrc:{:?}]",
            rtp_parameters.first_ssrc()
        );

        let reservation = self
            .registry
            .lock()
            .await
            .reserve(id)
            .ok_or(Error::ErrExistingReceiver)?;

        let receiver = self.create_receiver(id, kind, &rtp_parameters).await?;

        let mut registry = self.registry.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            drop(reservation);
            drop(registry);
            if let Err(err) = receiver.stop().await {
                warn!("failed to stop receiver {id} after close: {err}");
            }
            return Err(Error::ErrHandlerClosed);
        }

        let track = receiver.track().await;
        reservation.commit(
            &mut *registry,
            ReceivedStreamEntry {
                receiver,
                track: Arc::clone(&track),
                rtp_parameters,
                kind,
            },
        );
        debug!("receiving {id} [ssrc:{}]", track.ssrc());

        Ok(track)
    }

    async fn create_receiver(
        &self,
        id: &str,
        kind: RTPCodecType,
        rtp_parameters: &RTCRtpParameters,
    ) -> Result<Arc<dyn RtpReceiver>> {
        self.session.ensure_connected().await?;
        self.session
            .engine()
            .add_receiver(id, kind, rtp_parameters)
            .await
    }

    pub async fn get_receiver_stats(&self, id: &str) -> Result<StatsReport> {
        self.check_open()?;
        if id.is_empty() {
            return Err(Error::ErrReceiverIdEmpty);
        }

        let receiver = {
            let registry = self.registry.lock().await;
            let entry = registry.get(id).ok_or(Error::ErrReceiverNotFound)?;
            Arc::clone(&entry.receiver)
        };

        receiver.get_stats().await
    }

    /// stop_receiving stops the receiver registered under `id`. The id stays
    /// registered if the engine fails to stop it.
    pub async fn stop_receiving(&self, id: &str) -> Result<()> {
        self.check_open()?;
        if id.is_empty() {
            return Err(Error::ErrReceiverIdEmpty);
        }
        trace!("stop_receiving() [id:{id}]");

        let mut registry = self.registry.lock().await;
        let entry = registry.get(id).ok_or(Error::ErrReceiverNotFound)?;
        entry.receiver.stop().await?;
        registry.remove(id);
        debug!("stopped receiving {id}");

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

    /// close stops every receiver and, if the handler created its session,
    /// closes the session.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        trace!("close()");

        let entries = self.registry.lock().await.drain();
        let mut errs = vec![];
        for (id, entry) in entries {
            if let Err(err) = entry.receiver.stop().await {
                warn!("failed to stop receiver {id}: {err}");
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

    /// receiver_ids returns the registered ids, sorted.
    pub async fn receiver_ids(&self) -> Vec<String> {
        self.registry.lock().await.keys()
    }

    pub async fn track(&self, id: &str) -> Option<Arc<TrackRemote>> {
        let registry = self.registry.lock().await;
        registry.get(id).map(|e| Arc::clone(&e.track))
    }

    pub async fn rtp_parameters(&self, id: &str) -> Option<RTCRtpParameters> {
        let registry = self.registry.lock().await;
        registry.get(id).map(|e| e.rtp_parameters.clone())
    }

    pub async fn kind(&self, id: &str) -> Option<RTPCodecType> {
        let registry = self.registry.lock().await;
        registry.get(id).map(|e| e.kind)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ErrHandlerClosed)
        } else {
            Ok(())
        }
    }
}
