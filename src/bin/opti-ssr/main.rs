//! Runs a bridge headless, steered by commands on stdin.

use clap::Parser;
use log::{error, info, warn};
use opti_ssr::{
    args::BridgeArgs,
    error::BridgeError,
    session::{Command, Session},
};
use std::{
    io,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

// Example:
// cargo run --bin opti-ssr --
//                          --ssr-ip   192.168.0.10
//                          --rigid-body 0 local-wfs
//                          -n         32
//                          -r         0.75

fn main() {
    env_logger::init();
    let args = BridgeArgs::parse();

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &BridgeArgs) -> Result<(), BridgeError> {
    let mut session = Session::open(args)?;
    session.start()?;
    info!("Type c to calibrate, r to reset the calibration, s for the status and q to quit.");

    // Reading stdin blocks, so it gets a thread of its own and the main
    // thread can notice a bridge that ended on its own.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut stdin_open = true;
    while !session.is_finished() {
        if !stdin_open {
            thread::sleep(Duration::from_millis(200));
            continue;
        }
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match line.parse::<Command>() {
                Ok(command) => {
                    if !session.handle(command) {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            // Without a terminal, run until the bridge stops by itself.
            Err(RecvTimeoutError::Disconnected) => stdin_open = false,
        }
    }

    let res = session.stop();
    info!("{}", session);
    res
}
