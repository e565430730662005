use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use beacon_core::attribution::COOKIE_NAME;
use beacon_core::{AttributionRecord, AttributionStore, Cookie, FileCookieJar};
use clap::Args;

use crate::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct AttributionArgs {
    /// Cookie jar file (overrides config)
    #[arg(long)]
    pub cookie_jar: Option<PathBuf>,
}

pub fn run(args: AttributionArgs) -> Result<()> {
    let path = match args.cookie_jar {
        Some(path) => path,
        None => ConfigLoader::load()?.storage.cookie_jar,
    };

    match stored_attribution(&path)? {
        Some((record, cookie)) => {
            println!(
                "Initial referrer: {}",
                record.initial_referrer.as_deref().unwrap_or("(none)")
            );
            println!(
                "Initial source:   {}",
                record.initial_source.as_deref().unwrap_or("(none)")
            );
            if let Some(expires) = cookie.expires {
                println!("Expires:          {}", expires);
            }
        }
        None => println!("No attribution recorded in {}", path.display()),
    }
    Ok(())
}

fn stored_attribution(path: &Path) -> Result<Option<(AttributionRecord, Cookie)>> {
    let jar = FileCookieJar::load(path)
        .with_context(|| format!("Failed to open cookie jar {}", path.display()))?;
    let Some(record) = AttributionStore::new(&jar).read() else {
        return Ok(None);
    };
    let cookie = jar
        .cookies()
        .into_iter()
        .find(|cookie| cookie.name == COOKIE_NAME)
        .context("attribution cookie disappeared")?;
    Ok(Some((record, cookie)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_jar_has_no_attribution() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        assert!(stored_attribution(&path).unwrap().is_none());
    }

    #[test]
    fn reads_record_written_by_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        {
            let jar = FileCookieJar::load(&path).unwrap();
            AttributionStore::new(&jar).get_or_create(Some("https://google.com/"), Some("ads"));
        }

        let (record, cookie) = stored_attribution(&path).unwrap().unwrap();
        assert_eq!(record.initial_referrer.as_deref(), Some("https://google.com/"));
        assert_eq!(record.initial_source.as_deref(), Some("ads"));
        assert!(cookie.expires.is_some());
    }

    #[test]
    fn corrupt_jar_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(stored_attribution(&path).is_err());
    }
}
