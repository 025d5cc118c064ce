#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export sub-crates
pub use ice;

pub mod api;
pub mod dtls_transport;
pub mod engine;
pub mod error;
pub mod handler;
pub mod ice_transport;
pub mod ortc;
pub mod rtp_transceiver;
pub mod stats;
pub mod track;

pub use error::{Error, ErrorKind};
pub use handler::recv_handler::RecvHandler;
pub use handler::send_handler::SendHandler;
pub use handler::transport_session::TransportSession;
pub use handler::{HandlerConfiguration, HandlerListener};

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";
