use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// ErrorKind groups [`Error`] variants by who has to act on them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A missing, unknown or malformed argument. The caller must fix the call.
    InvalidInput,

    /// The track or receiver id is already active on the handler.
    DuplicateRegistration,

    /// The handler or its transport session has been closed.
    InvalidState,

    /// The transport engine (or the listener's connect step) rejected the operation.
    EngineFailure,
}

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// ErrUnknownType indicates an error with Unknown info.
    #[error("unknown")]
    ErrUnknownType,

    /// ErrTrackNil indicates a send-side operation was called without a track.
    #[error("track must not be nil")]
    ErrTrackNil,

    /// ErrExistingTrack indicates that the track is already being sent.
    #[error("track already exists")]
    ErrExistingTrack,

    /// ErrTrackNotFound indicates that the track is not being sent by this handler.
    #[error("track not found")]
    ErrTrackNotFound,

    /// ErrTrackKindMismatch indicates a replacement track of a different media kind.
    #[error("replacement track kind does not match")]
    ErrTrackKindMismatch,

    /// ErrReceiverIdEmpty indicates a receive-side operation was called without an id.
    #[error("receiver id must not be empty")]
    ErrReceiverIdEmpty,

    /// ErrExistingReceiver indicates that the receiver id is already in use.
    #[error("receiver already exists")]
    ErrExistingReceiver,

    /// ErrReceiverNotFound indicates that no receiver is registered under the id.
    #[error("receiver not found")]
    ErrReceiverNotFound,

    /// ErrSpatialLayerOutOfRange indicates a spatial layer above the last
    /// encoding the track is sent with.
    #[error("spatial layer out of range")]
    ErrSpatialLayerOutOfRange,

    /// ErrRtpParametersNoEncodings indicates receive parameters without any encoding.
    #[error("rtp parameters must contain at least one encoding")]
    ErrRtpParametersNoEncodings,

    /// ErrNoRtpParametersForKind indicates that the handler was not configured
    /// with RTP parameters for the track's media kind.
    #[error("no rtp parameters configured for media kind")]
    ErrNoRtpParametersForKind,

    /// ErrNoCodecsAvailable indicates that negotiation left no usable codec.
    #[error("operation failed no codecs are available")]
    ErrNoCodecsAvailable,

    /// ErrRegisterHeaderExtensionNoFreeID indicates that there was no extension ID available which
    /// in turn means that all 14 available id(1..=14) has been used.
    #[error("no header extension ID was free to use(this means the maximum of 14 extensions have been registered)")]
    ErrRegisterHeaderExtensionNoFreeID,

    /// ErrNoTurnCredentials indicates that a TURN server URL was provided
    /// without required credentials.
    #[error("turn server credentials required")]
    ErrNoTurnCredentials,

    /// ErrTurnCredentials indicates that provided TURN credentials are partial
    /// or malformed.
    #[error("invalid turn server credentials")]
    ErrTurnCredentials,

    /// ErrHandlerClosed indicates an operation executed after the handler
    /// or its transport session has been closed.
    #[error("handler closed")]
    ErrHandlerClosed,

    /// ErrConnectAborted is returned to callers that were waiting on a
    /// connect attempt started by another operation when that attempt failed.
    #[error("transport connect aborted")]
    ErrConnectAborted,

    /// ErrEngine carries a diagnostic from the transport engine.
    #[error("engine: {0}")]
    ErrEngine(String),

    #[error("{0}")]
    Ice(#[from] ice::Error),

    #[error("json: {0}")]
    Json(String),

    #[allow(non_camel_case_types)]
    #[error("{0}")]
    new(String),
}

impl Error {
    /// kind classifies the error for callers that only care whether to fix
    /// their input, drop a duplicate, or surface an engine failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ErrExistingTrack | Error::ErrExistingReceiver => {
                ErrorKind::DuplicateRegistration
            }
            Error::ErrHandlerClosed => ErrorKind::InvalidState,
            Error::ErrUnknownType
            | Error::ErrTrackNil
            | Error::ErrTrackNotFound
            | Error::ErrTrackKindMismatch
            | Error::ErrSpatialLayerOutOfRange
            | Error::ErrReceiverIdEmpty
            | Error::ErrReceiverNotFound
            | Error::ErrRtpParametersNoEncodings
            | Error::ErrNoRtpParametersForKind
            | Error::ErrRegisterHeaderExtensionNoFreeID
            | Error::ErrNoTurnCredentials
            | Error::ErrTurnCredentials
            | Error::Ice(_)
            | Error::Json(_) => ErrorKind::InvalidInput,
            Error::ErrNoCodecsAvailable
            | Error::ErrConnectAborted
            | Error::ErrEngine(_)
            | Error::new(_) => ErrorKind::EngineFailure,
        }
    }

    /// is_usage_error reports whether the caller can correct the failure by
    /// changing its arguments.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidInput | ErrorKind::DuplicateRegistration
        )
    }
}

// serde_json::Error is not PartialEq, keep its message only.
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl PartialEq<ice::Error> for Error {
    fn eq(&self, other: &ice::Error) -> bool {
        if let Error::Ice(e) = self {
            return e == other;
        }
        false
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::new(errs_strs.join("\n")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_kind() {
        let tests = vec![
            (Error::ErrTrackNil, ErrorKind::InvalidInput),
            (Error::ErrTrackNotFound, ErrorKind::InvalidInput),
            (Error::ErrReceiverNotFound, ErrorKind::InvalidInput),
            (Error::ErrExistingTrack, ErrorKind::DuplicateRegistration),
            (Error::ErrExistingReceiver, ErrorKind::DuplicateRegistration),
            (Error::ErrHandlerClosed, ErrorKind::InvalidState),
            (Error::ErrConnectAborted, ErrorKind::EngineFailure),
            (
                Error::ErrEngine("ice rejected".to_owned()),
                ErrorKind::EngineFailure,
            ),
            (Error::Ice(ice::Error::ErrSchemeType), ErrorKind::InvalidInput),
        ];

        for (err, expected_kind) in tests {
            assert_eq!(err.kind(), expected_kind, "{err:?}");
        }
    }

    #[test]
    fn test_flatten_errs() {
        assert!(flatten_errs(Vec::<Error>::new()).is_ok());

        let result = flatten_errs(vec![
            Error::ErrEngine("first".to_owned()),
            Error::ErrEngine("second".to_owned()),
        ]);
        assert_eq!(
            result,
            Err(Error::new("engine: first\nengine: second".to_owned()))
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: Error = serde_json::from_str::<u32>("not a number")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().starts_with("json: "));
    }
}
