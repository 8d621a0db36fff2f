use std::path::PathBuf;

use clap::Parser;

/// Run submissions through a bounded-concurrency priority queue.
///
/// Each item is parsed as JSON when possible, else taken as a string, so
/// URLs and plain words both work. URL-like strings and objects with a
/// `url` field are fetched; everything else passes through unchanged.
#[derive(Parser, Debug)]
#[command(name = "taskq", about = "Bounded-concurrency priority task queue")]
pub struct CliArgs {
    /// Raw submissions
    pub items: Vec<String>,

    /// JSON file: an array of submissions, or of {"submission", "priority"} entries
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Priority for ITEMS (higher runs first)
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub priority: i64,

    /// Tasks executed concurrently per batch (overrides TASKQ_MAX)
    #[arg(long)]
    pub max: Option<usize>,

    /// Delay between batches in milliseconds (overrides TASKQ_INTERVAL_MS)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Env profile: `{PROFILE}_TASKQ_MAX` etc. are read before the plain keys
    #[arg(long, env = "TASKQ_PROFILE", default_value = "")]
    pub profile: String,

    /// Path to a TOML config file with `interval_ms` and `max`
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print each settled batch to stderr
    #[arg(long)]
    pub progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_items_and_flags() {
        let args = CliArgs::try_parse_from([
            "taskq",
            "--priority",
            "-2",
            "--progress",
            "example.com",
            "42",
        ])
        .unwrap();
        assert_eq!(args.items, vec!["example.com", "42"]);
        assert_eq!(args.priority, -2);
        assert!(args.progress);
        assert!(args.file.is_none());
    }

    #[test]
    fn profile_flag_is_accepted() {
        let args = CliArgs::try_parse_from(["taskq", "--profile", "prod", "--max", "3"]).unwrap();
        assert_eq!(args.profile, "prod");
        assert_eq!(args.max, Some(3));
    }
}
