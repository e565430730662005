use anyhow::Result;
use beacon_core::{Call, CommandQueue};
use clap::Args;
use tracing::debug;

use super::session::{HostArgs, Session};

#[derive(Debug, Args)]
pub struct PageArgs {
    #[command(flatten)]
    pub host: HostArgs,

    /// Navigate to PATH after the page view (repeatable); each navigation records another page view
    #[arg(long = "navigate", value_name = "PATH")]
    pub navigate: Vec<String>,
}

pub async fn run(args: PageArgs) -> Result<()> {
    let session = Session::open(&args.host, CommandQueue::new())?;

    if !args.navigate.is_empty() {
        session.call(Call::new("trackPushState"))?;
    }
    session.call(Call::new("page").with_callback(|| debug!("Page view finished")))?;
    for path in &args.navigate {
        session.navigate(path)?;
    }

    session.finish().await
}
