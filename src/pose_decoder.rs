//! Decodes the line-based text form of tracking packets.
//!
//! The binary NatNet stream is decoded elsewhere; whatever does that
//! forwards each packet as one line of text, which is also the format of
//! recorded takes:
//!
//! ```text
//! +VERSION:3.0.0.0
//! +FRAME:<timestamp>,<timecode>,<latency>;<id>,<x>,<y>,<z>,<qw>,<qx>,<qy>,<qz>;...
//! ```
//!
//! A frame carries zero or more rigid bodies, each separated by `;`.

use crate::error::TrackingError;
use crate::pose::{Pose, Position, TimeData};
use crate::quaternion::Quaternion;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i32, multispace0, u32, u8},
    combinator::{all_consuming, map},
    error::Error,
    multi::many0,
    number::complete::double,
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};
use std::fmt::{self, Display};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// NatNet major versions whose streams we know how to read.
pub const SUPPORTED_MAJOR_VERSIONS: RangeInclusive<u8> = 2..=4;

/// A NatNet protocol version, `major.minor.build.revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NatNetVersion(pub [u8; 4]);

impl NatNetVersion {
    #[allow(missing_docs)]
    pub fn major(&self) -> u8 {
        self.0[0]
    }

    /// Whether the major version is in [`SUPPORTED_MAJOR_VERSIONS`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_MAJOR_VERSIONS.contains(&self.major())
    }
}

impl Display for NatNetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// One rigid body inside a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    /// The id assigned by the tracking software
    pub id: i32,
    #[allow(missing_docs)]
    pub position: Position,
    #[allow(missing_docs)]
    pub orientation: Quaternion,
}

/// Every rigid body seen at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    #[allow(missing_docs)]
    pub time: TimeData,
    #[allow(missing_docs)]
    pub rigid_bodies: Vec<RigidBody>,
}

impl Frame {
    /// The pose of the rigid body at `index` in this frame. This is the
    /// position in the frame, not the id the tracking software assigned.
    pub fn rigid_body(&self, index: usize) -> Result<Pose, TrackingError> {
        self.rigid_bodies
            .get(index)
            .map(|rb| Pose {
                position: rb.position,
                orientation: rb.orientation,
                time: self.time,
            })
            .ok_or(TrackingError::MissingRigidBody(index))
    }
}

/// Anything a tracking stream can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingPacket {
    /// Sent by the tracking software when a client connects.
    Version(NatNetVersion),
    #[allow(missing_docs)]
    Frame(Frame),
}

fn parse_version(s: &str) -> IResult<&str, NatNetVersion> {
    map(
        preceded(
            tag("+VERSION:"),
            tuple((
                u8,
                preceded(char('.'), u8),
                preceded(char('.'), u8),
                preceded(char('.'), u8),
            )),
        ),
        |(a, b, c, d)| NatNetVersion([a, b, c, d]),
    )(s)
}

fn parse_rigid_body(s: &str) -> IResult<&str, RigidBody> {
    map(
        tuple((
            preceded(char(';'), i32),
            preceded(char(','), double),
            preceded(char(','), double),
            preceded(char(','), double),
            preceded(char(','), double),
            preceded(char(','), double),
            preceded(char(','), double),
            preceded(char(','), double),
        )),
        |(id, x, y, z, qw, qx, qy, qz)| RigidBody {
            id,
            position: Position::new(x, y, z),
            orientation: Quaternion::new(qw, qx, qy, qz),
        },
    )(s)
}

fn parse_frame(s: &str) -> IResult<&str, Frame> {
    map(
        tuple((
            preceded(tag("+FRAME:"), double),
            preceded(char(','), u32),
            preceded(char(','), double),
            many0(parse_rigid_body),
        )),
        |(timestamp, timecode, latency, rigid_bodies)| Frame {
            time: TimeData {
                timestamp,
                timecode,
                latency,
            },
            rigid_bodies,
        },
    )(s)
}

fn parse_packet(s: &str) -> IResult<&str, TrackingPacket> {
    all_consuming(delimited(
        multispace0,
        alt((
            map(parse_version, TrackingPacket::Version),
            map(parse_frame, TrackingPacket::Frame),
        )),
        multispace0,
    ))(s)
}

impl FromStr for TrackingPacket {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_packet(s).finish() {
            Ok((_remaining, packet)) => Ok(packet),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

impl Display for TrackingPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingPacket::Version(v) => write!(f, "+VERSION:{v}"),
            TrackingPacket::Frame(frame) => {
                let TimeData {
                    timestamp,
                    timecode,
                    latency,
                } = frame.time;
                write!(f, "+FRAME:{timestamp},{timecode},{latency}")?;
                for rb in &frame.rigid_bodies {
                    let (p, q) = (rb.position, rb.orientation);
                    write!(
                        f,
                        ";{},{},{},{},{},{},{},{}",
                        rb.id, p.x, p.y, p.z, q.w, q.x, q.y, q.z
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Decodes one packet, turning parse failures into
/// [`TrackingError::Malformed`].
pub fn decode(line: &str) -> Result<TrackingPacket, TrackingError> {
    line.parse::<TrackingPacket>()
        .map_err(|e| TrackingError::Malformed(format!("{:?} at {:?}", e.code, e.input)))
}
