use std::collections::HashMap;

use serde::{Serialize, Serializer};
use smol_str::SmolStr;
use tokio::time::Instant;

use crate::dtls_transport::dtls_role::DTLSRole;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::SSRC;

mod serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RTCStatsType {
    #[serde(rename = "inbound-rtp")]
    InboundRTP,
    #[serde(rename = "outbound-rtp")]
    OutboundRTP,
    #[serde(rename = "transport")]
    Transport,
}

#[derive(Debug, Clone)]
pub enum StatsReportType {
    InboundRTP(InboundRTPStats),
    OutboundRTP(OutboundRTPStats),
    Transport(TransportStats),
}

impl StatsReportType {
    pub fn id(&self) -> &str {
        match self {
            StatsReportType::InboundRTP(stats) => &stats.id,
            StatsReportType::OutboundRTP(stats) => &stats.id,
            StatsReportType::Transport(stats) => &stats.id,
        }
    }
}

impl Serialize for StatsReportType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            StatsReportType::InboundRTP(stats) => stats.serialize(serializer),
            StatsReportType::OutboundRTP(stats) => stats.serialize(serializer),
            StatsReportType::Transport(stats) => stats.serialize(serializer),
        }
    }
}

/// StatsReport is a snapshot of statistics keyed by stats id.
#[derive(Default, Debug, Clone)]
pub struct StatsReport {
    pub reports: HashMap<String, StatsReportType>,
}

impl StatsReport {
    pub fn insert(&mut self, stats: StatsReportType) {
        self.reports.insert(stats.id().to_owned(), stats);
    }

    pub fn get(&self, id: &str) -> Option<&StatsReportType> {
        self.reports.get(id)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// inbound_rtp iterates the inbound RTP entries of the report.
    pub fn inbound_rtp(&self) -> impl Iterator<Item = &InboundRTPStats> {
        self.reports.values().filter_map(|r| match r {
            StatsReportType::InboundRTP(stats) => Some(stats),
            _ => None,
        })
    }

    /// outbound_rtp iterates the outbound RTP entries of the report.
    pub fn outbound_rtp(&self) -> impl Iterator<Item = &OutboundRTPStats> {
        self.reports.values().filter_map(|r| match r {
            StatsReportType::OutboundRTP(stats) => Some(stats),
            _ => None,
        })
    }
}

impl From<Vec<StatsReportType>> for StatsReport {
    fn from(reports: Vec<StatsReportType>) -> Self {
        let mut report = StatsReport::default();
        for stats in reports {
            report.insert(stats);
        }
        report
    }
}

impl Serialize for StatsReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.reports.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRTPStats {
    // RTCStats
    #[serde(with = "serialize::instant_to_epoch_seconds")]
    pub timestamp: Instant,
    #[serde(rename = "type")]
    pub stats_type: RTCStatsType,
    pub id: String,

    // RTCRtpStreamStats
    pub ssrc: SSRC,
    pub kind: RTPCodecType,

    // RTCReceivedRtpStreamStats
    pub packets_received: u64,
    pub packets_lost: i64,
    pub jitter: f64,

    // RTCInboundRtpStreamStats
    pub track_identifier: String,
    pub mid: SmolStr,
    pub header_bytes_received: u64,
    pub bytes_received: u64,
    pub nack_count: u64,
    pub fir_count: Option<u64>,
    pub pli_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRTPStats {
    // RTCStats
    #[serde(with = "serialize::instant_to_epoch_seconds")]
    pub timestamp: Instant,
    #[serde(rename = "type")]
    pub stats_type: RTCStatsType,
    pub id: String,

    // RTCRtpStreamStats
    pub ssrc: SSRC,
    pub kind: RTPCodecType,

    // RTCSentRtpStreamStats
    pub packets_sent: u64,
    pub bytes_sent: u64,

    // RTCOutboundRtpStreamStats
    pub track_identifier: String,
    pub mid: SmolStr,
    pub rid: Option<SmolStr>,
    pub active: bool,
    pub header_bytes_sent: u64,
    pub nack_count: u64,
    pub fir_count: Option<u64>,
    pub pli_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportStats {
    // RTCStats
    #[serde(with = "serialize::instant_to_epoch_seconds")]
    pub timestamp: Instant,
    #[serde(rename = "type")]
    pub stats_type: RTCStatsType,
    pub id: String,

    pub ice_state: RTCIceConnectionState,
    pub dtls_role: DTLSRole,
    pub ice_restarts: u32,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}
