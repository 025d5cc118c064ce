use std::any::Any;
use std::fmt;

use crate::rtp_transceiver::rtp_codec::RTPCodecType;

/// TrackLocal is a media source the application hands to a send handler.
/// The handler keys its registry on `id`; the engine reads media from it.
pub trait TrackLocal: fmt::Debug + Send + Sync {
    /// id is the unique identifier for this Track. A common example would be
    /// 'audio' or 'video' and stream_id would be 'desktop' or 'webcam'.
    fn id(&self) -> &str;

    /// stream_id is the group this track belongs to.
    fn stream_id(&self) -> &str;

    /// kind controls if this TrackLocal is audio or video
    fn kind(&self) -> RTPCodecType;

    fn as_any(&self) -> &dyn Any;
}

/// TrackLocalStatic is a TrackLocal with fixed identity, for sources whose
/// media is fed to the engine out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackLocalStatic {
    id: String,
    stream_id: String,
    kind: RTPCodecType,
}

impl TrackLocalStatic {
    pub fn new(id: String, stream_id: String, kind: RTPCodecType) -> Self {
        TrackLocalStatic {
            id,
            stream_id,
            kind,
        }
    }
}

impl TrackLocal for TrackLocalStatic {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn stream_id(&self) -> &str {
        self.stream_id.as_str()
    }

    fn kind(&self) -> RTPCodecType {
        self.kind
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
