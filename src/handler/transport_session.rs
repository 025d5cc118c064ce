use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{debug, trace};
use portable_atomic::AtomicBool;
use tokio::sync::{watch, Mutex};

use super::{HandlerConfiguration, HandlerListener, TransportLocalParameters};
use crate::dtls_transport::dtls_role::DTLSRole;
use crate::engine::{TransportConfiguration, TransportEngine, TransportEngineFactory};
use crate::error::{Error, Result};
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::ice_transport::ice_server::{validate_ice_servers, RTCIceServer};
use crate::ortc::RtpParametersByKind;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::{RTCRtpCapabilities, RTCRtpParameters};
use crate::stats::StatsReport;

/// The outcome of a connect attempt is published as `Some(succeeded)`.
type ConnectOutcome = Option<bool>;

enum ConnectState {
    New,
    Connecting(watch::Receiver<ConnectOutcome>),
    Connected,
}

/// TransportSession owns the transport engine shared by the handlers built
/// on it, and connects it on first use.
pub struct TransportSession {
    engine: Arc<dyn TransportEngine>,
    listener: Arc<dyn HandlerListener>,
    local_dtls_role: DTLSRole,
    connect_state: Mutex<ConnectState>,
    ice_servers: ArcSwap<Vec<RTCIceServer>>,
    rtp_parameters_by_kind: RtpParametersByKind,
    closed: AtomicBool,
}

impl TransportSession {
    /// new validates the configuration and builds the engine. Nothing is
    /// connected until the first [`TransportSession::ensure_connected`].
    pub fn new(
        listener: Arc<dyn HandlerListener>,
        factory: &dyn TransportEngineFactory,
        config: &HandlerConfiguration,
        local_dtls_role: DTLSRole,
    ) -> Result<Arc<Self>> {
        let ice_servers = validate_ice_servers(&config.ice_servers)?;

        let remote = &config.transport_remote_parameters;
        let engine = factory.new_engine(TransportConfiguration {
            remote_ice_parameters: remote.ice_parameters.clone(),
            remote_ice_candidates: remote.ice_candidates.clone(),
            remote_dtls_parameters: remote.dtls_parameters.clone(),
            ice_servers: ice_servers.clone(),
            ice_transport_policy: config.ice_transport_policy,
            proprietary_constraints: config.proprietary_constraints.clone(),
            local_dtls_role,
        })?;

        let state_listener = Arc::clone(&listener);
        engine.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
            let listener = Arc::clone(&state_listener);
            Box::pin(async move {
                listener.on_connection_state_change(state).await;
            })
        }));

        debug!(
            "transport session created [dtls role:{local_dtls_role}, ice servers:{}]",
            ice_servers.len()
        );

        Ok(Arc::new(TransportSession {
            engine,
            listener,
            local_dtls_role,
            connect_state: Mutex::new(ConnectState::New),
            ice_servers: ArcSwap::from_pointee(ice_servers),
            rtp_parameters_by_kind: config.rtp_parameters_by_kind.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    /// ensure_connected delivers the local transport parameters to the
    /// listener the first time it is called. Callers arriving while that is
    /// in flight wait for its outcome; a failed attempt leaves the session
    /// unconnected.
    pub async fn ensure_connected(&self) -> Result<()> {
        loop {
            self.check_open()?;

            let mut rx = {
                let mut state = self.connect_state.lock().await;
                let in_flight = match &*state {
                    ConnectState::Connected => return Ok(()),
                    ConnectState::Connecting(rx) => Some(rx.clone()),
                    ConnectState::New => None,
                };

                match in_flight {
                    Some(rx) => rx,
                    None => {
                        let (tx, rx) = watch::channel(None);
                        *state = ConnectState::Connecting(rx);
                        drop(state);

                        return self.connect(tx).await;
                    }
                }
            };

            trace!("waiting for in-flight transport connect");
            let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
                Ok(outcome) => *outcome,
                Err(_) => None,
            };

            match outcome {
                Some(true) => return Ok(()),
                Some(false) => return Err(Error::ErrConnectAborted),
                None => {
                    // the connecting call was dropped before it finished
                    let mut state = self.connect_state.lock().await;
                    let abandoned = matches!(
                        &*state,
                        ConnectState::Connecting(current) if current.same_channel(&rx)
                    );
                    if abandoned {
                        *state = ConnectState::New;
                    }
                }
            }
        }
    }

    async fn connect(&self, tx: watch::Sender<ConnectOutcome>) -> Result<()> {
        let result = self.deliver_local_parameters().await;

        {
            let mut state = self.connect_state.lock().await;
            *state = if result.is_ok() {
                ConnectState::Connected
            } else {
                ConnectState::New
            };
        }
        tx.send_replace(Some(result.is_ok()));

        match &result {
            Ok(()) => debug!("transport connected [dtls role:{}]", self.local_dtls_role),
            Err(err) => debug!("transport connect failed: {err}"),
        }
        result
    }

    async fn deliver_local_parameters(&self) -> Result<()> {
        let mut dtls_parameters = self.engine.local_dtls_parameters().await?;
        dtls_parameters.role = self.local_dtls_role;

        trace!("delivering local transport parameters to listener");
        self.listener
            .on_connect(TransportLocalParameters { dtls_parameters })
            .await
    }

    /// restart_ice hands new remote ICE parameters to the engine. It does not
    /// require the session to be connected.
    pub async fn restart_ice(&self, remote_ice_parameters: RTCIceParameters) -> Result<()> {
        self.check_open()?;
        trace!(
            "restart_ice() [ufrag:{}]",
            remote_ice_parameters.username_fragment
        );

        self.engine.restart_ice(&remote_ice_parameters).await?;
        debug!("ice restarted");
        Ok(())
    }

    /// update_ice_servers validates `ice_servers` and makes them the active
    /// list. On failure the previous list stays active.
    pub async fn update_ice_servers(&self, ice_servers: Vec<RTCIceServer>) -> Result<()> {
        self.check_open()?;
        let ice_servers = validate_ice_servers(&ice_servers)?;

        self.engine.update_ice_servers(&ice_servers).await?;
        debug!("ice servers updated [count:{}]", ice_servers.len());
        self.ice_servers.store(Arc::new(ice_servers));
        Ok(())
    }

    pub fn ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers.load().as_ref().clone()
    }

    pub fn local_dtls_role(&self) -> DTLSRole {
        self.local_dtls_role
    }

    /// rtp_parameters returns the configured RTP parameter template for `kind`.
    pub fn rtp_parameters(&self, kind: RTPCodecType) -> Result<RTCRtpParameters> {
        self.rtp_parameters_by_kind
            .get(kind)
            .cloned()
            .ok_or(Error::ErrNoRtpParametersForKind)
    }

    pub fn rtp_capabilities(&self) -> RTCRtpCapabilities {
        self.engine.rtp_capabilities()
    }

    pub(crate) fn engine(&self) -> Arc<dyn TransportEngine> {
        Arc::clone(&self.engine)
    }

    pub async fn get_stats(&self) -> Result<StatsReport> {
        self.check_open()?;
        self.engine.get_stats().await
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.connect_state.lock().await, ConnectState::Connected)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// close closes the engine. Later calls are no-ops.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("closing transport session");
        self.engine.close().await
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ErrHandlerClosed)
        } else {
            Ok(())
        }
    }
}
