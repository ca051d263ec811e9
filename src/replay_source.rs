//! Plays back a recorded take, one packet line at a time.

use crate::error::TrackingError;
use crate::pose::Pose;
use crate::pose_decoder::decode;
use crate::tracking_source::{pacing, PacketFilter, TrackingSource};
use log::info;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::{Duration, Instant},
};

/// A [`TrackingSource`] reading packet lines from a file, paced to a fixed
/// frame rate. When the take runs out it either starts over or reports
/// [`TrackingError::Closed`].
#[derive(Debug)]
pub struct ReplaySource {
    lines: Vec<String>,
    cursor: usize,
    looping: bool,
    interval: Duration,
    next_due: Option<Instant>,
    filter: PacketFilter,
}

impl ReplaySource {
    /// Loads a take from `path`, played at `rate` frames per second.
    pub fn open(path: impl AsRef<Path>, rate: f64, looping: bool) -> Result<Self, TrackingError> {
        let file = File::open(path.as_ref()).map_err(TrackingError::Io)?;
        let source = Self::from_reader(BufReader::new(file), rate, looping)?;
        info!(
            "Loaded {} packets from {}",
            source.lines.len(),
            path.as_ref().display()
        );
        Ok(source)
    }

    /// Loads a take from anything line-readable. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn from_reader(
        reader: impl BufRead,
        rate: f64,
        looping: bool,
    ) -> Result<Self, TrackingError> {
        let lines = reader
            .lines()
            .collect::<Result<Vec<String>, _>>()
            .map_err(TrackingError::Io)?
            .into_iter()
            .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            .collect();
        let interval = pacing(rate)?;

        Ok(Self {
            lines,
            cursor: 0,
            looping,
            interval,
            next_due: None,
            filter: PacketFilter::new(),
        })
    }

    fn next_line(&mut self) -> Result<&str, TrackingError> {
        if self.cursor >= self.lines.len() {
            if !self.looping || self.lines.is_empty() {
                return Err(TrackingError::Closed);
            }
            self.cursor = 0;
        }
        self.cursor += 1;
        Ok(&self.lines[self.cursor - 1])
    }

    fn wait_for_next_frame(&mut self) {
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                spin_sleep::sleep(due - now);
            }
        }
        self.next_due = Some(self.next_due.map_or(now, |due| due.max(now)) + self.interval);
    }
}

impl TrackingSource for ReplaySource {
    fn get_rigid_body(&mut self, rb_id: usize) -> Result<Pose, TrackingError> {
        // A looping take without a single pose in it would never return.
        for _ in 0..self.lines.len() {
            let packet = decode(self.next_line()?)?;
            match self.filter.handle(packet, rb_id)? {
                Some(pose) => {
                    self.wait_for_next_frame();
                    return Ok(pose);
                }
                None => continue,
            }
        }
        Err(TrackingError::Closed)
    }
}
