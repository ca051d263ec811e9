//! Turns a configuration into a running bridge, and gives the front ends
//! one handle to steer it with, whichever variant it is.

use crate::args::{BridgeArgs, CommandTask, SourceKind};
use crate::bridge::{BridgeRunner, BridgeState, StatsSnapshot};
use crate::calibration::SharedCalibration;
use crate::config::{frame_interval, Config};
use crate::dummy_source::DummySource;
use crate::error::{BridgeError, ConfigError};
use crate::geometry::{circular_array, planar, Point};
use crate::head_tracker::{calibrate_to_latest, reference_azimuth, HeadTracker};
use crate::local_wfs::LocalWfs;
use crate::pose::Pose;
use crate::renderer::{DryRun, RendererConnection, SsrClient};
use crate::replay_source::ReplaySource;
use crate::tracking_source::TrackingSource;
use crate::udp_source::UdpSource;
use log::{info, warn};
use std::{fmt, str::FromStr};

/// Any tracking source.
pub type BoxedSource = Box<dyn TrackingSource>;
/// Any renderer connection.
pub type BoxedRenderer = Box<dyn RendererConnection>;

/// Opens the tracking source chosen on the command line.
pub fn open_source(args: &BridgeArgs, config: &Config) -> Result<BoxedSource, BridgeError> {
    let tracking = &config.tracking;
    if args.source != SourceKind::Udp {
        frame_interval(args.rate)?;
    }
    let source: BoxedSource = match args.source {
        SourceKind::Udp => Box::new(UdpSource::bind(
            tracking.port,
            tracking.multicast_addr()?,
            tracking.unicast_addr()?,
            tracking.receive_timeout(),
        )?),
        SourceKind::Dummy => Box::new(DummySource::builder().rate(args.rate).build()?),
        SourceKind::Replay => {
            let path = args.replay_file.as_ref().ok_or_else(|| {
                ConfigError::Invalid("--source replay needs a --replay-file".to_owned())
            })?;
            Box::new(ReplaySource::open(path, args.rate, args.looping)?)
        }
    };
    Ok(source)
}

/// Connects to the renderer at `addr`, or fakes one if `dry_run` is set.
pub fn open_renderer(
    addr: &str,
    config: &Config,
    dry_run: bool,
) -> Result<BoxedRenderer, BridgeError> {
    if dry_run {
        info!("Dry run, not connecting to {}", addr);
        return Ok(Box::new(DryRun::new(addr)));
    }
    Ok(Box::new(SsrClient::connect(
        addr,
        &config.renderer.terminator,
        config.renderer.write_timeout(),
    )?))
}

/// One of the two bridges, wrapped in its runner.
pub enum Session {
    #[allow(missing_docs)]
    HeadTracker {
        runner: BridgeRunner<HeadTracker<BoxedSource, BoxedRenderer>>,
        calibration: SharedCalibration,
    },
    #[allow(missing_docs)]
    LocalWfs {
        runner: BridgeRunner<LocalWfs<BoxedSource, BoxedRenderer, BoxedRenderer>>,
        num_sources: usize,
        radius: f64,
    },
}

impl Session {
    /// Opens everything the command line asks for. The bridge is not
    /// started yet.
    pub fn open(args: &BridgeArgs) -> Result<Self, BridgeError> {
        let config = args.to_config()?;
        let source = open_source(args, &config)?;
        let ssr = open_renderer(&config.renderer.addr(), &config, args.dry_run)?;
        match args.command {
            CommandTask::HeadTracker => Ok(Self::head_tracker(source, ssr, &config)),
            CommandTask::LocalWfs(_) => {
                let ssr2 = open_renderer(&config.renderer.second_addr(), &config, args.dry_run)?;
                Self::local_wfs(source, ssr, ssr2, &config)
            }
        }
    }

    /// A head tracking session over already opened endpoints.
    pub fn head_tracker(source: BoxedSource, ssr: BoxedRenderer, config: &Config) -> Self {
        let tracker = HeadTracker::new(source, ssr, config.tracking.rigid_body);
        let calibration = tracker.calibration();
        Self::HeadTracker {
            runner: BridgeRunner::new(
                tracker,
                config.bridge.history_capacity,
                config.bridge.backoff(),
            ),
            calibration,
        }
    }

    /// A local sound field synthesis session over already opened endpoints.
    /// Creates the virtual sources right away.
    pub fn local_wfs(
        source: BoxedSource,
        ssr: BoxedRenderer,
        ssr2: BoxedRenderer,
        config: &Config,
    ) -> Result<Self, BridgeError> {
        let array = &config.array;
        let wfs = LocalWfs::new(
            source,
            ssr,
            ssr2,
            array.sources,
            array.radius,
            config.tracking.rigid_body,
        )?;
        Ok(Self::LocalWfs {
            runner: BridgeRunner::new(wfs, config.bridge.history_capacity, config.bridge.backoff()),
            num_sources: array.sources,
            radius: array.radius,
        })
    }

    #[allow(missing_docs)]
    pub fn start(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::HeadTracker { runner, .. } => runner.start(),
            Self::LocalWfs { runner, .. } => runner.start(),
        }
    }

    /// Stops the bridge and reports why it ended.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::HeadTracker { runner, .. } => runner.stop(),
            Self::LocalWfs { runner, .. } => runner.stop(),
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> BridgeState {
        match self {
            Self::HeadTracker { runner, .. } => runner.state(),
            Self::LocalWfs { runner, .. } => runner.state(),
        }
    }

    /// True once the bridge thread has exited on its own or was stopped.
    pub fn is_finished(&self) -> bool {
        self.state() == BridgeState::Stopped
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        match self {
            Self::HeadTracker { runner, .. } => runner.name(),
            Self::LocalWfs { runner, .. } => runner.name(),
        }
    }

    #[allow(missing_docs)]
    pub fn stats(&self) -> StatsSnapshot {
        match self {
            Self::HeadTracker { runner, .. } => runner.stats(),
            Self::LocalWfs { runner, .. } => runner.stats(),
        }
    }

    /// How many samples the history holds, and how many it can hold.
    pub fn history_fill(&self) -> (usize, usize) {
        match self {
            Self::HeadTracker { runner, .. } => {
                (runner.history().len(), runner.history().capacity())
            }
            Self::LocalWfs { runner, .. } => (runner.history().len(), runner.history().capacity()),
        }
    }

    /// The newest pose as the tracking system reported it.
    pub fn latest_pose(&self) -> Option<Pose> {
        match self {
            Self::HeadTracker { runner, .. } => runner.history().latest().map(|s| s.raw),
            Self::LocalWfs { runner, .. } => runner.history().latest(),
        }
    }

    /// One line describing the newest sample.
    pub fn latest_summary(&self) -> Option<String> {
        match self {
            Self::HeadTracker { runner, .. } => runner.history().latest().map(|s| s.to_string()),
            Self::LocalWfs { runner, .. } => runner
                .history()
                .latest()
                .map(|p| format!("listener at {}", planar(&p.position))),
        }
    }

    /// Where the virtual sources currently are. Empty for a head tracker.
    pub fn array_points(&self) -> Vec<Point> {
        match self {
            Self::HeadTracker { .. } => Vec::new(),
            Self::LocalWfs {
                runner,
                num_sources,
                radius,
            } => match runner.history().latest() {
                Some(pose) => circular_array(planar(&pose.position), *num_sources, *radius),
                None => Vec::new(),
            },
        }
    }

    /// The azimuth last sent to the renderer, for a head tracker.
    pub fn azimuth(&self) -> Option<f64> {
        match self {
            Self::HeadTracker { runner, .. } => runner
                .history()
                .latest()
                .map(|s| reference_azimuth(&s.angles)),
            Self::LocalWfs { .. } => None,
        }
    }

    /// Makes the newest pose the head tracker's rest pose. Returns that
    /// pose, or `None` if there is nothing to calibrate to.
    pub fn calibrate(&self) -> Option<Pose> {
        match self {
            Self::HeadTracker {
                runner,
                calibration,
            } => {
                let pose = calibrate_to_latest(runner.history(), calibration);
                if pose.is_none() {
                    warn!("{} : nothing received yet, cannot calibrate.", runner.name());
                }
                pose
            }
            Self::LocalWfs { runner, .. } => {
                warn!("{} : only head trackers are calibrated.", runner.name());
                None
            }
        }
    }

    /// Forgets the head tracker's calibration.
    pub fn reset_calibration(&self) {
        if let Self::HeadTracker { calibration, .. } = self {
            calibration.reset();
        }
    }

    /// Handles one interactive command. Returns `false` once the session
    /// should end.
    pub fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Calibrate => {
                self.calibrate();
            }
            Command::Reset => self.reset_calibration(),
            Command::Status => info!("{}", self),
            Command::Quit => return false,
        }
        true
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        let (len, cap) = self.history_fill();
        write!(
            f,
            "{} [{}] received {}, retries {}, send failures {}, history {}/{}",
            self.name(),
            self.state(),
            stats.received,
            stats.retries,
            stats.send_failures,
            len,
            cap
        )?;
        if let Some(latest) = self.latest_summary() {
            write!(f, ", {}", latest)?;
        }
        Ok(())
    }
}

/// What a user can type while a bridge runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `c`: calibrate to the current pose
    Calibrate,
    /// `r`: forget the calibration
    Reset,
    /// `s`: log the bridge status
    Status,
    /// `q`: stop and exit
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "c" | "calibrate" => Ok(Command::Calibrate),
            "r" | "reset" => Ok(Command::Reset),
            "s" | "status" => Ok(Command::Status),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command {other:?}, expected c, r, s or q")),
        }
    }
}
