// Commandline argument parser using clap for opti-ssr

use crate::config::Config;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct BridgeArgs {
    #[command(subcommand, long_about)]
    /// Which bridge to run, head tracking or local sound field synthesis
    pub command: CommandTask,

    /// RON configuration file. Flags given here override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Where the poses come from
    #[arg(long = "source", value_enum, default_value_t = SourceKind::Udp)]
    pub source: SourceKind,

    /// Recorded tracking data to play back, for `--source replay`
    #[arg(long = "replay-file")]
    pub replay_file: Option<PathBuf>,

    /// Frames per second for the dummy and replay sources
    #[arg(long = "rate", default_value_t = 120.0)]
    pub rate: f64,

    /// Start over at the end of the replay file
    #[arg(long = "loop")]
    pub looping: bool,

    /// Log the renderer messages instead of connecting to a renderer
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Host running the renderer(s)
    #[arg(long = "ssr-ip")]
    pub ssr_ip: Option<String>,

    /// Port of the (first) renderer
    #[arg(long = "ssr-port")]
    pub ssr_port: Option<u16>,

    /// Port of the second renderer, for local sound field synthesis
    #[arg(long = "ssr-port2")]
    pub ssr_port2: Option<u16>,

    /// Appended to every renderer message
    #[arg(long = "terminator")]
    pub terminator: Option<String>,

    /// Interface to receive tracking data on
    #[arg(long = "opti-unicast-ip")]
    pub unicast_ip: Option<String>,

    /// Multicast group of the tracking system
    #[arg(long = "opti-multicast-ip")]
    pub multicast_ip: Option<String>,

    /// Receive tracking data as plain unicast, without joining a group
    #[arg(long = "no-multicast", conflicts_with = "multicast_ip")]
    pub no_multicast: bool,

    /// Port of the tracking system's data stream
    #[arg(long = "opti-port")]
    pub opti_port: Option<u16>,

    /// Give up on a single receive after this many milliseconds
    #[arg(long = "timeout")]
    pub timeout_ms: Option<u64>,

    /// Index of the tracked rigid body in each frame
    #[arg(short = 'b', long = "rigid-body")]
    pub rigid_body: Option<usize>,

    /// Number of samples kept in the history
    #[arg(long = "history")]
    pub history_capacity: Option<usize>,

    /// Pause after a receive that found nothing, in milliseconds
    #[arg(long = "backoff")]
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Turn the renderer's reference with the listener's head
    #[command(about)]
    HeadTracker,

    /// Move a circular array of virtual sources with the listener
    #[command(about)]
    LocalWfs(LocalWfsCommand),
}

#[derive(Debug, Args, Clone)]
#[command(about)]
pub struct LocalWfsCommand {
    /// Number of virtual sources in the array
    #[arg(short = 'n', long = "sources")]
    pub sources: Option<usize>,

    /// Radius of the array, in meters
    #[arg(short = 'r', long = "radius")]
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// The tracking system's network stream
    Udp,
    /// A synthetic rigid body walking in circles
    Dummy,
    /// A file of recorded datagrams
    Replay,
}

impl BridgeArgs {
    /// Overrides the values of `config` with every flag that was given.
    pub fn apply(&self, config: &mut Config) {
        let renderer = &mut config.renderer;
        override_with(&mut renderer.ip, &self.ssr_ip);
        override_with(&mut renderer.port, &self.ssr_port);
        override_with(&mut renderer.second_port, &self.ssr_port2);
        override_with(&mut renderer.terminator, &self.terminator);

        let tracking = &mut config.tracking;
        if self.unicast_ip.is_some() {
            tracking.unicast_ip = self.unicast_ip.clone();
        }
        if self.no_multicast {
            tracking.multicast_ip = None;
        } else if self.multicast_ip.is_some() {
            tracking.multicast_ip = self.multicast_ip.clone();
        }
        override_with(&mut tracking.port, &self.opti_port);
        override_with(&mut tracking.receive_timeout_ms, &self.timeout_ms);
        override_with(&mut tracking.rigid_body, &self.rigid_body);

        override_with(&mut config.bridge.history_capacity, &self.history_capacity);
        override_with(&mut config.bridge.backoff_ms, &self.backoff_ms);

        if let CommandTask::LocalWfs(wfs) = &self.command {
            override_with(&mut config.array.sources, &wfs.sources);
            override_with(&mut config.array.radius, &wfs.radius);
        }
    }

    /// Loads the configuration file, if any, and applies the flags on top.
    pub fn to_config(&self) -> Result<Config, crate::error::ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

fn override_with<T: Clone>(value: &mut T, flag: &Option<T>) {
    if let Some(v) = flag {
        *value = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> BridgeArgs {
        BridgeArgs::try_parse_from(std::iter::once("opti-ssr").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn no_flags_keeps_the_defaults() {
        let args = parse(&["head-tracker"]);
        assert_eq!(args.to_config().unwrap(), Config::default());
        assert_eq!(args.source, SourceKind::Udp);
        assert!(!args.dry_run);
    }

    #[test]
    fn flags_override_the_config() {
        let args = parse(&[
            "--ssr-ip",
            "10.0.0.3",
            "--ssr-port",
            "5000",
            "--no-multicast",
            "-b",
            "2",
            "local-wfs",
            "-n",
            "16",
            "-r",
            "1.5",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.renderer.addr(), "10.0.0.3:5000");
        assert_eq!(config.tracking.multicast_ip, None);
        assert_eq!(config.tracking.rigid_body, 2);
        assert_eq!(config.array.sources, 16);
        assert_eq!(config.array.radius, 1.5);
    }

    #[test]
    fn array_flags_only_belong_to_local_wfs() {
        assert!(BridgeArgs::try_parse_from(["opti-ssr", "head-tracker", "-n", "3"]).is_err());
    }

    #[test]
    fn file_values_survive_unless_overridden() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(renderer: (ip: \"render-host\", port: 4000))").unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        let config = parse(&["-c", &path, "--ssr-port", "4001", "head-tracker"])
            .to_config()
            .unwrap();
        assert_eq!(config.renderer.addr(), "render-host:4001");
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let args = parse(&["local-wfs", "--radius=-2"]);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn choosing_a_source() {
        let args = parse(&["--source", "replay", "--replay-file", "take.txt", "--loop", "head-tracker"]);
        assert_eq!(args.source, SourceKind::Replay);
        assert!(args.looping);
        assert_eq!(args.replay_file, Some(PathBuf::from("take.txt")));
    }
}
