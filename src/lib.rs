//! opti-ssr connects an OptiTrack optical tracking system to the
//! [SoundScape Renderer](http://spatialaudio.net/ssr/) (SSR), so that a
//! tracked rigid body steers the rendered scene in real time.
//!
//! Two bridges are provided:
//!
//! - [`HeadTracker`](head_tracker::HeadTracker) uses the rigid body as a
//!   head tracker for binaural synthesis, turning the renderer's reference
//!   with the listener's head.
//! - [`LocalWfs`](local_wfs::LocalWfs) implements local sound field
//!   synthesis: a circular array of virtual sources on one renderer, and the
//!   reference of a second renderer, follow the listener around the room.
//!
//! Both run the same loop in [`bridge`]: receive a pose from a
//! [`TrackingSource`](tracking_source::TrackingSource), keep it in a bounded
//! [`HistoryBuffer`](history::HistoryBuffer), and send the resulting
//! [`SsrRequest`](ssr_message::SsrRequest)s over a
//! [`RendererConnection`](renderer::RendererConnection).
//!
//! The `opti-ssr` binary runs a bridge from the command line, the `monitor`
//! binary runs one behind a terminal dashboard.

#![warn(missing_docs)]
pub mod args;
pub mod bridge;
pub mod calibration;
pub mod config;
pub mod dummy_source;
pub mod error;
pub mod euler;
pub mod geometry;
pub mod gui;
pub mod head_tracker;
pub mod history;
pub mod local_wfs;
pub mod pose;
pub mod pose_decoder;
pub mod quaternion;
pub mod renderer;
pub mod replay_source;
pub mod session;
pub mod ssr_message;
pub mod tracking_source;
pub mod udp_source;
