//! The XML requests understood by the SoundScape Renderer's network
//! interface. Each [`SsrRequest`] encodes to exactly one message; the
//! end-of-message terminator is added by the connection that sends it.
//!
//! ```text
//! <request><source new="true" id="3" port="0"></source></request>
//! <request><source id="3" name="SourceMotive3"><position x="1.00" y="0.50"/></source></request>
//! <request><source id="3"><orientation azimuth="45.00"/></source></request>
//! <request><reference><position x="1.00" y="0.50"/></reference></request>
//! <request><reference><orientation azimuth="90.00"/></reference></request>
//! ```
//!
//! Coordinates and angles always carry two decimals; the renderer setups
//! this talks to expect exactly that.

use std::fmt::{self, Display};

/// Identifies a source inside the renderer. Chosen by the caller and reused
/// for every later update of the same source.
pub type SourceId = u32;

/// Degrees, counterclockwise, 0 pointing along the renderer's +x axis.
pub type Degrees = f64;

/// One request to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SsrRequest {
    /// Registers a new point source.
    CreateSource {
        #[allow(missing_docs)]
        id: SourceId,
    },
    /// Moves an existing source, in meters.
    SourcePosition {
        #[allow(missing_docs)]
        id: SourceId,
        #[allow(missing_docs)]
        x: f64,
        #[allow(missing_docs)]
        y: f64,
    },
    /// Rotates an existing source.
    SourceOrientation {
        #[allow(missing_docs)]
        id: SourceId,
        #[allow(missing_docs)]
        azimuth: Degrees,
    },
    /// Moves the renderer's reference point, i.e. the listener.
    ReferencePosition {
        #[allow(missing_docs)]
        x: f64,
        #[allow(missing_docs)]
        y: f64,
    },
    /// Rotates the renderer's reference.
    ReferenceOrientation {
        #[allow(missing_docs)]
        azimuth: Degrees,
    },
}

impl SsrRequest {
    /// Builds the XML text of the request, without terminator.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl Display for SsrRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SsrRequest::CreateSource { id } => write!(
                f,
                "<request><source new=\"true\" id=\"{id}\" port=\"0\"></source></request>"
            ),
            SsrRequest::SourcePosition { id, x, y } => write!(
                f,
                "<request><source id=\"{id}\" name=\"SourceMotive{id}\">\
                 <position x=\"{x:.2}\" y=\"{y:.2}\"/></source></request>"
            ),
            SsrRequest::SourceOrientation { id, azimuth } => write!(
                f,
                "<request><source id=\"{id}\">\
                 <orientation azimuth=\"{azimuth:.2}\"/></source></request>"
            ),
            SsrRequest::ReferencePosition { x, y } => write!(
                f,
                "<request><reference><position x=\"{x:.2}\" y=\"{y:.2}\"/></reference></request>"
            ),
            SsrRequest::ReferenceOrientation { azimuth } => write!(
                f,
                "<request><reference><orientation azimuth=\"{azimuth:.2}\"/></reference></request>"
            ),
        }
    }
}
