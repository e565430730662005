use anyhow::Result;
use beacon_core::{Call, CommandQueue};
use clap::Args;
use tracing::debug;

use super::session::{HostArgs, Session};

#[derive(Debug, Args)]
pub struct TriggerArgs {
    /// Event name, e.g. "Signup" or "Outbound Link"
    pub name: String,

    #[command(flatten)]
    pub host: HostArgs,
}

pub async fn run(args: TriggerArgs) -> Result<()> {
    let session = Session::open(&args.host, CommandQueue::new())?;

    let name = args.name.clone();
    session.call(
        Call::new("trigger")
            .arg(args.name)
            .with_callback(move || debug!(event = %name, "Event finished")),
    )?;

    session.finish().await
}
