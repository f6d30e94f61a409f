//! Command-line arguments for the terminal reader.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hn_core::StoryFeed;

fn parse_feed(s: &str) -> Result<StoryFeed, String> {
    StoryFeed::parse(s).ok_or_else(|| format!("unknown feed `{s}` (new, top, best, ask, show, job)"))
}

/// Read Hacker News from the terminal
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "hn-reader", version)]
pub struct Args {
    /// Configuration file (default: <config dir>/hn-reader/config.json)
    #[arg(short, long, env = "HN_READER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Story listing: new, top, best, ask, show or job (overrides config file)
    #[arg(short, long, env = "HN_READER_FEED", value_parser = parse_feed)]
    pub feed: Option<StoryFeed>,

    /// Rows to display (overrides config file)
    #[arg(short, long)]
    pub rows: Option<usize>,

    /// Seconds to wait for rows to load
    #[arg(short, long = "wait", default_value_t = 15)]
    pub wait_secs: u64,

    /// Open the story at ROW in the browser once loaded
    #[arg(short, long, value_name = "ROW")]
    pub open: Option<usize>,
}

impl Args {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("hn-reader").chain(raw.iter().copied()))
    }

    #[test]
    fn parses_all_flags() {
        let args = parse(&[
            "--feed", "show", "--rows", "5", "--wait", "3", "--open", "2", "--config", "/tmp/c.json",
        ])
        .unwrap();

        assert_eq!(args.feed, Some(StoryFeed::Show));
        assert_eq!(args.rows, Some(5));
        assert_eq!(args.wait(), Duration::from_secs(3));
        assert_eq!(args.open, Some(2));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.json")));
    }

    #[test]
    fn accepts_equals_and_short_forms() {
        let args = parse(&["--rows=5", "-f", "top", "-o", "20"]).unwrap();

        assert_eq!(args.rows, Some(5));
        assert_eq!(args.feed, Some(StoryFeed::Top));
        assert_eq!(args.open, Some(20));
        assert_eq!(args.wait(), Duration::from_secs(15));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--rows"]).is_err());
        assert!(parse(&["--rows", "many"]).is_err());
        assert!(parse(&["--feed", "frontpage"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
