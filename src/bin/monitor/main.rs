use clap::Parser;
use log::error;
use opti_ssr::{args::BridgeArgs, gui::monitor, gui::GuiError, session::Session};
use std::time::Duration;

fn main() {
    env_logger::init();
    let args = BridgeArgs::parse();

    if let Err(e) = run(&args) {
        error!("{e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &BridgeArgs) -> Result<(), GuiError> {
    let mut session = Session::open(args)?;
    session.start()?;

    let shown = monitor(&mut session, Duration::from_millis(100));
    session.stop()?;
    shown
}
