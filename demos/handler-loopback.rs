use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::{AppSettings, Arg, Command};
use webrtc_handler::api::{get_name, get_native_rtp_capabilities};
use webrtc_handler::engine::loopback::{LoopbackEngine, LoopbackEngineFactory};
use webrtc_handler::handler::TransportLocalParameters;
use webrtc_handler::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc_handler::ortc::{get_extended_rtp_capabilities, get_rtp_parameters_by_kind};
use webrtc_handler::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc_handler::rtp_transceiver::{RTCRtcpParameters, RTCRtpEncodingParameters};
use webrtc_handler::track::track_local::{TrackLocal, TrackLocalStatic};
use webrtc_handler::{Error, HandlerConfiguration, HandlerListener, RecvHandler, SendHandler};

struct PrintingListener {
    role: &'static str,
}

#[async_trait]
impl HandlerListener for PrintingListener {
    async fn on_connect(
        &self,
        local_parameters: TransportLocalParameters,
    ) -> webrtc_handler::error::Result<()> {
        // A real application hands these to its signaling server here.
        println!(
            "[{}] local transport parameters: {}",
            self.role,
            serde_json::to_string(&local_parameters)?
        );
        Ok(())
    }

    async fn on_connection_state_change(&self, state: RTCIceConnectionState) {
        println!("[{}] connection state has changed: {state}", self.role);
    }
}

fn load_configuration(path: Option<&str>) -> Result<HandlerConfiguration> {
    let mut config = match path {
        Some(path) => HandlerConfiguration::from_json(&std::fs::read_to_string(path)?)?,
        None => HandlerConfiguration::default(),
    };

    // Without templates from the signaling server, negotiate against ourselves.
    let by_kind = &config.rtp_parameters_by_kind;
    if by_kind.audio.is_none() && by_kind.video.is_none() {
        let native = get_native_rtp_capabilities();
        let extended = get_extended_rtp_capabilities(&native, &native);
        config.rtp_parameters_by_kind = get_rtp_parameters_by_kind(&extended);
    }

    Ok(config)
}

fn last_engine(factory: &LoopbackEngineFactory) -> Result<Arc<LoopbackEngine>> {
    factory
        .last_engine()
        .ok_or_else(|| Error::new("loopback factory built no engine".to_owned()).into())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut app = Command::new("handler-loopback")
        .version("0.1.0")
        .author("Rain Liu <yliu@webrtc.rs>")
        .about("Sends a track and receives a stream over the loopback engine.")
        .setting(AppSettings::DeriveDisplayOrder)
        .subcommand_negates_reqs(true)
        .arg(
            Arg::new("FULLHELP")
                .help("Prints more detailed help information")
                .long("fullhelp"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('d')
                .help("Prints debug log information"),
        )
        .arg(
            Arg::new("config")
                .takes_value(true)
                .short('c')
                .long("config")
                .help("Handler configuration JSON, as sent by the signaling server."),
        )
        .arg(
            Arg::new("simulcast")
                .long("simulcast")
                .help("Send the video track in three spatial layers."),
        )
        .arg(
            Arg::new("packets")
                .takes_value(true)
                .long("packets")
                .default_value("100")
                .help("Number of packets to account on every stream."),
        );

    let matches = app.clone().get_matches();

    if matches.is_present("FULLHELP") {
        app.print_long_help()?;
        std::process::exit(0);
    }

    let debug = matches.is_present("debug");
    if debug {
        env_logger::Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}:{} [{}] {} - {}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.level(),
                    chrono::Local::now().format("%H:%M:%S.%6f"),
                    record.args()
                )
            })
            .filter(None, log::LevelFilter::Trace)
            .init();
    }

    let use_simulcast = matches.is_present("simulcast");
    let packets: u64 = matches.value_of("packets").unwrap_or("100").parse()?;
    let config = load_configuration(matches.value_of("config"))?;

    println!("handler: {}", get_name());

    let send_factory = LoopbackEngineFactory::new();
    let send_handler = SendHandler::new(
        Arc::new(PrintingListener { role: "send" }),
        &send_factory,
        &config,
    )?;
    let send_engine = last_engine(&send_factory)?;

    let recv_factory = LoopbackEngineFactory::new();
    let recv_handler = RecvHandler::new(
        Arc::new(PrintingListener { role: "recv" }),
        &recv_factory,
        &config,
    )?;
    let recv_engine = last_engine(&recv_factory)?;

    // Send a video track
    let video: Arc<dyn TrackLocal> = Arc::new(TrackLocalStatic::new(
        "video".to_owned(),
        "webcam".to_owned(),
        RTPCodecType::Video,
    ));
    let send_parameters = send_handler
        .send(Some(Arc::clone(&video)), use_simulcast)
        .await?;
    println!(
        "send parameters: {}",
        serde_json::to_string_pretty(&send_parameters)?
    );
    if use_simulcast {
        send_handler
            .set_max_spatial_layer(Some(video.as_ref()), 1)
            .await?;
    }

    // Receive what the other side would send with the same audio template
    let mut recv_parameters = send_handler
        .session()
        .rtp_parameters(RTPCodecType::Audio)?;
    recv_parameters.mid = Some("0".to_owned());
    recv_parameters.encodings = vec![RTCRtpEncodingParameters {
        ssrc: Some(rand::random()),
        ..Default::default()
    }];
    recv_parameters.rtcp = RTCRtcpParameters {
        cname: "remote".to_owned(),
        ..Default::default()
    };
    let track = recv_handler
        .receive("remote-audio", RTPCodecType::Audio, recv_parameters)
        .await?;
    println!(
        "receiving {} [ssrc:{}, codec:{}]",
        track.id(),
        track.ssrc(),
        track.codec().capability.mime_type
    );

    send_engine.simulate_traffic(packets, 1200).await;
    recv_engine.simulate_traffic(packets, 160).await;

    let sender_stats = send_handler.get_sender_stats(Some(video.as_ref())).await?;
    println!("sender stats: {}", serde_json::to_string_pretty(&sender_stats)?);
    let receiver_stats = recv_handler.get_receiver_stats("remote-audio").await?;
    println!(
        "receiver stats: {}",
        serde_json::to_string_pretty(&receiver_stats)?
    );
    let transport_stats = send_handler.get_transport_stats().await?;
    println!(
        "transport stats: {}",
        serde_json::to_string_pretty(&transport_stats)?
    );

    send_handler.stop_sending(Some(video.as_ref())).await?;
    recv_handler.stop_receiving("remote-audio").await?;

    send_handler.close().await?;
    recv_handler.close().await?;

    Ok(())
}
