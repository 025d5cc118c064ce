//! An in-process transport engine. It assigns SSRCs, mids and a CNAME like
//! a real engine would, reports connectivity changes, and keeps packet
//! counters that can be driven with [`LoopbackEngine::simulate_traffic`].
//! Any operation can be told to fail.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use log::{debug, trace};
use portable_atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8};
use smol_str::SmolStr;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::*;
use crate::dtls_transport::dtls_fingerprint::RTCDtlsFingerprint;
use crate::error::Error;
use crate::rtp_transceiver::{RTCRtcpParameters, RTCRtpRtxParameters};
use crate::stats::{
    InboundRTPStats, OutboundRTPStats, RTCStatsType, StatsReportType, TransportStats,
};

/// LoopbackOperation names an engine operation that can be scripted to fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LoopbackOperation {
    LocalDtlsParameters,
    AddSender,
    AddReceiver,
    SetParameters,
    ReplaceTrack,
    SenderStats,
    ReceiverStats,
    StopSender,
    StopReceiver,
    RestartIce,
    UpdateIceServers,
    TransportStats,
    Close,
}

type Failures = Arc<Mutex<HashSet<LoopbackOperation>>>;

async fn check(failures: &Failures, op: LoopbackOperation) -> Result<()> {
    if failures.lock().await.contains(&op) {
        Err(Error::ErrEngine(format!("loopback rejected {op:?}")))
    } else {
        Ok(())
    }
}

#[derive(Default)]
struct RtpCounters {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl RtpCounters {
    fn add(&self, packets: u64, payload_bytes: u64) {
        self.packets.fetch_add(packets, Ordering::SeqCst);
        self.bytes
            .fetch_add(packets * payload_bytes, Ordering::SeqCst);
    }

    fn packets(&self) -> u64 {
        self.packets.load(Ordering::SeqCst)
    }

    fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}

const RTP_HEADER_SIZE: u64 = 12;

pub struct LoopbackSender {
    track: Mutex<Arc<dyn TrackLocal>>,
    params: Mutex<RTCRtpParameters>,
    stopped: AtomicBool,
    counters: RtpCounters,
    failures: Failures,
}

#[async_trait]
impl RtpSender for LoopbackSender {
    async fn get_parameters(&self) -> RTCRtpParameters {
        self.params.lock().await.clone()
    }

    async fn set_parameters(&self, encodings: Vec<RTCRtpEncodingParameters>) -> Result<()> {
        check(&self.failures, LoopbackOperation::SetParameters).await?;

        let mut params = self.params.lock().await;
        if encodings.len() != params.encodings.len() {
            return Err(Error::ErrEngine(format!(
                "expected {} encodings, got {}",
                params.encodings.len(),
                encodings.len()
            )));
        }

        // ssrc and rid are fixed once assigned
        for (current, requested) in params.encodings.iter_mut().zip(encodings) {
            current.active = requested.active;
            current.max_bitrate = requested.max_bitrate;
            current.scale_resolution_down_by = requested.scale_resolution_down_by;
        }

        Ok(())
    }

    async fn replace_track(&self, track: Arc<dyn TrackLocal>) -> Result<()> {
        check(&self.failures, LoopbackOperation::ReplaceTrack).await?;
        if self.stopped.load(Ordering::SeqCst) {
            return Err(Error::ErrEngine("sender is stopped".to_owned()));
        }

        let mut current = self.track.lock().await;
        if current.kind() != track.kind() {
            return Err(Error::ErrEngine(format!(
                "cannot replace {} track with {} track",
                current.kind(),
                track.kind()
            )));
        }
        *current = track;

        Ok(())
    }

    async fn track(&self) -> Arc<dyn TrackLocal> {
        Arc::clone(&*self.track.lock().await)
    }

    async fn get_stats(&self) -> Result<StatsReport> {
        check(&self.failures, LoopbackOperation::SenderStats).await?;

        let track = self.track().await;
        let params = self.params.lock().await;
        let mid = SmolStr::new(params.mid.as_deref().unwrap_or_default());

        let mut report = StatsReport::default();
        for encoding in &params.encodings {
            let ssrc = encoding.ssrc.unwrap_or_default();
            let (packets, bytes) = if encoding.active {
                (self.counters.packets(), self.counters.bytes())
            } else {
                (0, 0)
            };

            report.insert(StatsReportType::OutboundRTP(OutboundRTPStats {
                timestamp: Instant::now(),
                stats_type: RTCStatsType::OutboundRTP,
                id: format!("RTCOutboundRTPStream_{ssrc}"),
                ssrc,
                kind: track.kind(),
                packets_sent: packets,
                bytes_sent: bytes,
                track_identifier: track.id().to_owned(),
                mid: mid.clone(),
                rid: (!encoding.rid.is_empty()).then(|| encoding.rid.clone()),
                active: encoding.active,
                header_bytes_sent: packets * RTP_HEADER_SIZE,
                nack_count: 0,
                fir_count: None,
                pli_count: None,
            }));
        }

        Ok(report)
    }

    async fn stop(&self) -> Result<()> {
        check(&self.failures, LoopbackOperation::StopSender).await?;
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct LoopbackReceiver {
    track: Arc<TrackRemote>,
    stopped: AtomicBool,
    counters: RtpCounters,
    failures: Failures,
}

#[async_trait]
impl RtpReceiver for LoopbackReceiver {
    async fn track(&self) -> Arc<TrackRemote> {
        Arc::clone(&self.track)
    }

    async fn get_stats(&self) -> Result<StatsReport> {
        check(&self.failures, LoopbackOperation::ReceiverStats).await?;

        let ssrc = self.track.ssrc();
        let packets = self.counters.packets();
        let mut report = StatsReport::default();
        report.insert(StatsReportType::InboundRTP(InboundRTPStats {
            timestamp: Instant::now(),
            stats_type: RTCStatsType::InboundRTP,
            id: format!("RTCInboundRTPStream_{ssrc}"),
            ssrc,
            kind: self.track.kind(),
            packets_received: packets,
            packets_lost: 0,
            jitter: 0.0,
            track_identifier: self.track.id().to_owned(),
            mid: SmolStr::new(self.track.params().mid.as_deref().unwrap_or_default()),
            header_bytes_received: packets * RTP_HEADER_SIZE,
            bytes_received: self.counters.bytes(),
            nack_count: 0,
            fir_count: None,
            pli_count: None,
        }));

        Ok(report)
    }

    async fn stop(&self) -> Result<()> {
        check(&self.failures, LoopbackOperation::StopReceiver).await?;
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct LoopbackEngine {
    config: TransportConfiguration,
    local_dtls_parameters: DTLSParameters,
    cname: String,
    next_mid: AtomicU32,

    ice_connection_state: AtomicU8,
    connected_once: AtomicBool,
    closed: AtomicBool,
    ice_restarts: AtomicU32,
    remote_ice_parameters: Mutex<RTCIceParameters>,
    ice_servers: Mutex<Vec<RTCIceServer>>,

    senders: Mutex<Vec<Arc<LoopbackSender>>>,
    receivers: Mutex<Vec<Arc<LoopbackReceiver>>>,
    failures: Failures,

    on_ice_connection_state_change_handler:
        Arc<ArcSwapOption<Mutex<OnIceConnectionStateChangeHdlrFn>>>,
}

impl LoopbackEngine {
    pub fn new(config: TransportConfiguration) -> Self {
        let digest: [u8; 32] = rand::random();
        let local_dtls_parameters = DTLSParameters {
            role: DTLSRole::Auto,
            fingerprints: vec![RTCDtlsFingerprint::from_digest("sha-256", &digest)],
        };
        let cname = hex::encode(rand::random::<[u8; 8]>());

        LoopbackEngine {
            remote_ice_parameters: Mutex::new(config.remote_ice_parameters.clone()),
            ice_servers: Mutex::new(config.ice_servers.clone()),
            config,
            local_dtls_parameters,
            cname,
            next_mid: AtomicU32::new(0),
            ice_connection_state: AtomicU8::new(RTCIceConnectionState::New as u8),
            connected_once: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            ice_restarts: AtomicU32::new(0),
            senders: Mutex::new(vec![]),
            receivers: Mutex::new(vec![]),
            failures: Arc::new(Mutex::new(HashSet::new())),
            on_ice_connection_state_change_handler: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// set_failure makes `op` fail (or succeed again) from now on.
    pub async fn set_failure(&self, op: LoopbackOperation, fail: bool) {
        let mut failures = self.failures.lock().await;
        if fail {
            failures.insert(op);
        } else {
            failures.remove(&op);
        }
    }

    pub fn config(&self) -> &TransportConfiguration {
        &self.config
    }

    pub fn cname(&self) -> &str {
        self.cname.as_str()
    }

    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.ice_connection_state.load(Ordering::SeqCst).into()
    }

    pub fn ice_restarts(&self) -> u32 {
        self.ice_restarts.load(Ordering::SeqCst)
    }

    pub async fn remote_ice_parameters(&self) -> RTCIceParameters {
        self.remote_ice_parameters.lock().await.clone()
    }

    pub async fn ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers.lock().await.clone()
    }

    /// active_senders counts senders that have not been stopped.
    pub async fn active_senders(&self) -> usize {
        let senders = self.senders.lock().await;
        senders
            .iter()
            .filter(|s| !s.stopped.load(Ordering::SeqCst))
            .count()
    }

    /// active_receivers counts receivers that have not been stopped.
    pub async fn active_receivers(&self) -> usize {
        let receivers = self.receivers.lock().await;
        receivers
            .iter()
            .filter(|r| !r.stopped.load(Ordering::SeqCst))
            .count()
    }

    /// simulate_traffic accounts `packets` packets of `payload_bytes` each on
    /// every live sender and receiver.
    pub async fn simulate_traffic(&self, packets: u64, payload_bytes: u64) {
        for sender in self.senders.lock().await.iter() {
            if !sender.stopped.load(Ordering::SeqCst) {
                sender.counters.add(packets, payload_bytes);
            }
        }
        for receiver in self.receivers.lock().await.iter() {
            if !receiver.stopped.load(Ordering::SeqCst) {
                receiver.counters.add(packets, payload_bytes);
            }
        }
    }

    async fn set_ice_connection_state(&self, state: RTCIceConnectionState) {
        self.ice_connection_state
            .store(state as u8, Ordering::SeqCst);
        trace!("loopback ice connection state: {state}");

        if let Some(handler) = &*self.on_ice_connection_state_change_handler.load() {
            let mut f = handler.lock().await;
            f(state).await;
        }
    }

    async fn connect_if_needed(&self) {
        if !self.connected_once.swap(true, Ordering::SeqCst) {
            self.set_ice_connection_state(RTCIceConnectionState::Checking)
                .await;
            self.set_ice_connection_state(RTCIceConnectionState::Connected)
                .await;
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::ErrEngine("transport is closed".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TransportEngine for LoopbackEngine {
    async fn local_dtls_parameters(&self) -> Result<DTLSParameters> {
        self.check_open()?;
        check(&self.failures, LoopbackOperation::LocalDtlsParameters).await?;
        Ok(self.local_dtls_parameters.clone())
    }

    async fn add_sender(
        &self,
        track: Arc<dyn TrackLocal>,
        rtp_parameters: &RTCRtpParameters,
        send_encodings: Vec<RTCRtpEncodingParameters>,
    ) -> Result<Arc<dyn RtpSender>> {
        self.check_open()?;
        check(&self.failures, LoopbackOperation::AddSender).await?;
        if rtp_parameters.codecs.is_empty() {
            return Err(Error::ErrEngine("no codecs to send with".to_owned()));
        }

        let has_rtx = rtp_parameters.codecs.iter().any(|c| c.capability.is_rtx());
        let mut encodings = if send_encodings.is_empty() {
            vec![RTCRtpEncodingParameters::default()]
        } else {
            send_encodings
        };
        for encoding in &mut encodings {
            encoding.ssrc = Some(rand::random());
            if has_rtx {
                encoding.rtx = Some(RTCRtpRtxParameters {
                    ssrc: rand::random(),
                });
            }
        }

        let mut params = rtp_parameters.clone();
        params.mid = Some(self.next_mid.fetch_add(1, Ordering::SeqCst).to_string());
        params.encodings = encodings;
        params.rtcp = RTCRtcpParameters {
            cname: self.cname.clone(),
            reduced_size: true,
            mux: true,
        };

        debug!(
            "loopback sender for track {} on mid {:?}",
            track.id(),
            params.mid
        );
        let sender = Arc::new(LoopbackSender {
            track: Mutex::new(track),
            params: Mutex::new(params),
            stopped: AtomicBool::new(false),
            counters: RtpCounters::default(),
            failures: Arc::clone(&self.failures),
        });
        self.senders.lock().await.push(Arc::clone(&sender));

        self.connect_if_needed().await;

        Ok(sender)
    }

    async fn add_receiver(
        &self,
        id: &str,
        kind: RTPCodecType,
        rtp_parameters: &RTCRtpParameters,
    ) -> Result<Arc<dyn RtpReceiver>> {
        self.check_open()?;
        check(&self.failures, LoopbackOperation::AddReceiver).await?;

        debug!("loopback receiver {id} for ssrc {:?}", rtp_parameters.first_ssrc());
        let receiver = Arc::new(LoopbackReceiver {
            track: Arc::new(TrackRemote::from_parameters(id, kind, rtp_parameters)),
            stopped: AtomicBool::new(false),
            counters: RtpCounters::default(),
            failures: Arc::clone(&self.failures),
        });
        self.receivers.lock().await.push(Arc::clone(&receiver));

        self.connect_if_needed().await;

        Ok(receiver)
    }

    async fn restart_ice(&self, remote_ice_parameters: &RTCIceParameters) -> Result<()> {
        self.check_open()?;
        check(&self.failures, LoopbackOperation::RestartIce).await?;

        *self.remote_ice_parameters.lock().await = remote_ice_parameters.clone();
        self.ice_restarts.fetch_add(1, Ordering::SeqCst);

        if self.connected_once.load(Ordering::SeqCst) {
            self.set_ice_connection_state(RTCIceConnectionState::Checking)
                .await;
            self.set_ice_connection_state(RTCIceConnectionState::Connected)
                .await;
        }

        Ok(())
    }

    async fn update_ice_servers(&self, ice_servers: &[RTCIceServer]) -> Result<()> {
        self.check_open()?;
        check(&self.failures, LoopbackOperation::UpdateIceServers).await?;

        *self.ice_servers.lock().await = ice_servers.to_vec();
        Ok(())
    }

    fn on_ice_connection_state_change(&self, f: OnIceConnectionStateChangeHdlrFn) {
        self.on_ice_connection_state_change_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    async fn get_stats(&self) -> Result<StatsReport> {
        check(&self.failures, LoopbackOperation::TransportStats).await?;

        let (mut packets_sent, mut bytes_sent) = (0, 0);
        for sender in self.senders.lock().await.iter() {
            packets_sent += sender.counters.packets();
            bytes_sent += sender.counters.bytes();
        }
        let (mut packets_received, mut bytes_received) = (0, 0);
        for receiver in self.receivers.lock().await.iter() {
            packets_received += receiver.counters.packets();
            bytes_received += receiver.counters.bytes();
        }

        let mut report = StatsReport::default();
        report.insert(StatsReportType::Transport(TransportStats {
            timestamp: Instant::now(),
            stats_type: RTCStatsType::Transport,
            id: format!("RTCTransport_{}", self.cname),
            ice_state: self.ice_connection_state(),
            dtls_role: self.config.local_dtls_role,
            ice_restarts: self.ice_restarts(),
            packets_sent,
            packets_received,
            bytes_sent,
            bytes_received,
        }));

        Ok(report)
    }

    async fn close(&self) -> Result<()> {
        check(&self.failures, LoopbackOperation::Close).await?;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        for sender in self.senders.lock().await.iter() {
            sender.stopped.store(true, Ordering::SeqCst);
        }
        for receiver in self.receivers.lock().await.iter() {
            receiver.stopped.store(true, Ordering::SeqCst);
        }

        self.set_ice_connection_state(RTCIceConnectionState::Closed)
            .await;
        Ok(())
    }
}

/// LoopbackEngineFactory builds loopback engines and keeps the last one
/// around so tests can script it.
#[derive(Default)]
pub struct LoopbackEngineFactory {
    last_engine: ArcSwapOption<LoopbackEngine>,
    engines_created: AtomicU32,
}

impl LoopbackEngineFactory {
    pub fn new() -> Self {
        LoopbackEngineFactory::default()
    }

    pub fn last_engine(&self) -> Option<Arc<LoopbackEngine>> {
        self.last_engine.load_full()
    }

    pub fn engines_created(&self) -> u32 {
        self.engines_created.load(Ordering::SeqCst)
    }
}

impl TransportEngineFactory for LoopbackEngineFactory {
    fn new_engine(&self, config: TransportConfiguration) -> Result<Arc<dyn TransportEngine>> {
        let engine = Arc::new(LoopbackEngine::new(config));
        self.last_engine.store(Some(Arc::clone(&engine)));
        self.engines_created.fetch_add(1, Ordering::SeqCst);
        Ok(engine)
    }
}
