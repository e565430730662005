//! Replay a captured command queue.
//!
//! The queue file holds the calls a page made before the agent loaded, in
//! the same shape the page would have buffered them:
//!
//! ```json
//! [["configure", "trackAcquisition", true], ["trackPushState"], ["page"]]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use beacon_core::CommandQueue;
use clap::Args;
use tracing::info;

use super::session::{HostArgs, Session};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON file holding the queued calls
    pub queue: PathBuf,

    /// Navigate to PATH after replaying (repeatable)
    #[arg(long = "navigate", value_name = "PATH")]
    pub navigate: Vec<String>,

    #[command(flatten)]
    pub host: HostArgs,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let queue = load_queue(&args.queue)?;
    info!(calls = queue.len(), "Replaying queue");

    let session = Session::open(&args.host, queue)?;
    for path in &args.navigate {
        session.navigate(path)?;
    }

    session.finish().await
}

fn load_queue(path: &Path) -> Result<CommandQueue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    CommandQueue::from_json(&content)
        .with_context(|| format!("Invalid command queue in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        replay: ReplayArgs,
    }

    #[test]
    fn parses_queue_path_and_navigation() {
        let cli =
            TestCli::try_parse_from(["test", "queue.json", "--navigate", "/docs"]).unwrap();
        assert_eq!(cli.replay.queue, PathBuf::from("queue.json"));
        assert_eq!(cli.replay.navigate, vec!["/docs"]);
    }

    #[test]
    fn load_queue_reads_calls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, r#"[["configure", "domain", "a.com"], ["page"]]"#).unwrap();

        let queue = load_queue(&path).unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn load_queue_reports_bad_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(load_queue(&missing).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"page": true}"#).unwrap();
        let err = load_queue(&bad).unwrap_err();
        assert!(err.to_string().contains("Invalid command queue"));
    }
}
