//! The ways the tracking-to-renderer pipeline can go wrong.

use crate::pose_decoder::NatNetVersion;
use std::{borrow::Cow, error::Error, fmt, io};

/// Returned by a [`TrackingSource`](crate::tracking_source::TrackingSource)
/// when it could not produce a pose.
#[derive(Debug)]
pub enum TrackingError {
    /// Nothing has arrived yet. Try again shortly.
    Unavailable,

    /// A frame arrived but did not contain the requested rigid body, e.g.
    /// because it is occluded. Try again shortly.
    MissingRigidBody(usize),

    /// The receive was cancelled by the user; the bridge should stop.
    Interrupted,

    /// The source reported a protocol version we cannot read.
    UnsupportedVersion(NatNetVersion),

    /// Data arrived but could not be decoded.
    Malformed(String),

    /// The source has no more data and never will, e.g. the end of a
    /// recording.
    Closed,

    /// Any other io failure on the underlying socket or file.
    Io(io::Error),
}

impl TrackingError {
    /// True for the conditions the bridge loop retries after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TrackingError::Unavailable | TrackingError::MissingRigidBody(_)
        )
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TrackingError as TE;
        let msg = match self {
            TE::Unavailable => Cow::from("no tracking data available yet"),
            TE::MissingRigidBody(id) => Cow::from(format!("rigid body {id} not in frame")),
            TE::Interrupted => Cow::from("interrupted"),
            TE::UnsupportedVersion(v) => Cow::from(format!("unsupported NatNet version {v}")),
            TE::Malformed(msg) => Cow::from(format!("malformed tracking data: {msg}")),
            TE::Closed => Cow::from("tracking source closed"),
            TE::Io(error) => Cow::from(format!("io error: {error}")),
        };

        write!(f, "{}", msg)
    }
}

impl Error for TrackingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrackingError::Io(error) => Some(error),
            _ => None,
        }
    }
}

// Socket read timeouts show up as `WouldBlock` or `TimedOut` depending on the
// platform; both only mean that nothing has arrived yet.
impl From<io::Error> for TrackingError {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            // A signal cutting a read short says nothing about the stream.
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                TrackingError::Unavailable
            }
            io::ErrorKind::UnexpectedEof => TrackingError::Closed,
            _ => TrackingError::Io(value),
        }
    }
}

/// Returned by a [`RendererConnection`](crate::renderer::RendererConnection)
/// when a message could not be delivered.
#[derive(Debug)]
pub enum RendererError {
    /// Connecting to the renderer failed.
    Connect {
        #[allow(missing_docs)]
        addr: String,
        #[allow(missing_docs)]
        error: io::Error,
    },

    /// Writing a message failed, e.g. the connection was reset.
    Write(io::Error),
}

impl fmt::Display for RendererError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RendererError::Connect { addr, error } => {
                write!(f, "could not connect to renderer at {addr}: {error}")
            }
            RendererError::Write(error) => write!(f, "renderer write failed: {error}"),
        }
    }
}

impl Error for RendererError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RendererError::Connect { error, .. } => Some(error),
            RendererError::Write(error) => Some(error),
        }
    }
}

impl From<io::Error> for RendererError {
    fn from(value: io::Error) -> Self {
        Self::Write(value)
    }
}

/// Every renderer failure of one send step. A bridge that writes to more
/// than one renderer keeps going after the first failure, so there can be
/// several.
#[derive(Debug)]
pub struct SendError {
    #[allow(missing_docs)]
    pub failures: Vec<RendererError>,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msgs: Vec<String> = self.failures.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

impl Error for SendError {}

impl From<RendererError> for SendError {
    fn from(value: RendererError) -> Self {
        Self {
            failures: vec![value],
        }
    }
}

/// Why a bridge stopped, if it did not stop because it was asked to.
#[derive(Debug)]
pub enum BridgeError {
    /// The tracking source failed in a way that retrying will not fix.
    Tracking(TrackingError),

    /// The bridge thread panicked.
    Panicked,

    /// `start()` was called on a bridge that was already started.
    AlreadyStarted,

    /// Setting the bridge up failed before it ever ran.
    Renderer(RendererError),

    /// The configuration the bridge was to be set up from is unusable.
    Config(ConfigError),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::Tracking(error) => write!(f, "tracking failed: {error}"),
            BridgeError::Panicked => write!(f, "bridge thread panicked"),
            BridgeError::AlreadyStarted => write!(f, "bridge already started"),
            BridgeError::Renderer(error) => write!(f, "{error}"),
            BridgeError::Config(error) => write!(f, "{error}"),
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BridgeError::Tracking(error) => Some(error),
            BridgeError::Renderer(error) => Some(error),
            BridgeError::Config(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TrackingError> for BridgeError {
    fn from(value: TrackingError) -> Self {
        Self::Tracking(value)
    }
}

impl From<RendererError> for BridgeError {
    fn from(value: RendererError) -> Self {
        Self::Renderer(value)
    }
}

impl From<ConfigError> for BridgeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Returned when a configuration file cannot be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the file failed.
    IoError(io::Error),

    /// The file is not valid RON for a [`Config`](crate::config::Config).
    RonSpannedError(ron::de::SpannedError),

    /// Serializing a configuration failed.
    RonError(ron::Error),

    /// The values parse but make no sense together.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
            CE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            CE::Invalid(msg) => Cow::from(format!("invalid configuration: {}", msg)),
        };

        write!(f, "{}", msg)
    }
}

impl Error for ConfigError {}
