use clap::Parser;
use mdx_fmt::batch::{collect_files, run_batch, BatchSummary, RunMode};
use mdx_fmt::error::Result;
use mdx_fmt::formatter::{format_source, FormatOptions};
use mdx_fmt::settings::RuleSettings;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// Files need formatting, or some files failed.
    pub const VIOLATIONS_FOUND: i32 = 1;
    pub const TOOL_ERROR: i32 = 2;
}

/// Selective formatter for MDX and Markdown documents.
#[derive(Parser, Debug)]
#[command(name = "mdx-fmt", author, version, about, long_about = None)]
struct Cli {
    /// Files, directories or glob patterns. Defaults to every .md/.mdx file.
    #[arg(conflicts_with = "stdin")]
    patterns: Vec<String>,

    /// Format standard input and print the result to standard output
    #[arg(long, conflicts_with = "write")]
    stdin: bool,

    /// Additional glob patterns to skip
    #[arg(long, value_name = "GLOB", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Write formatted output back to the files
    #[arg(short, long, conflicts_with = "check")]
    write: bool,

    /// Exit with status 1 if any file would change
    #[arg(short, long)]
    check: bool,

    /// Settings file. Defaults to .mdx-fmt.toml in the working directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of files formatted at once. Defaults to the number of CPUs
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Validate component tags first and report files that fail
    #[arg(long)]
    strict: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Show debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.write {
            RunMode::Write
        } else if self.check {
            RunMode::Check
        } else {
            RunMode::DryRun
        }
    }

    fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }
}

fn load_settings(cli: &Cli, root: &Path) -> Result<RuleSettings> {
    match &cli.config {
        Some(path) => RuleSettings::load(path),
        None => RuleSettings::discover(root),
    }
}

fn print_summary(summary: &BatchSummary, mode: RunMode) {
    let verb = match mode {
        RunMode::Write => "formatted",
        RunMode::Check | RunMode::DryRun => "would change",
    };
    println!(
        "{} file(s) checked: {} {}, {} unchanged, {} failed",
        summary.total(),
        summary.changed,
        verb,
        summary.unchanged,
        summary.errored
    );
}

/// Format standard input to standard output. With `--check` nothing is
/// printed and the exit status tells whether the input would change.
async fn run_stdin(cli: &Cli, settings: RuleSettings) -> Result<i32> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let options = FormatOptions {
        mdx: None,
        strict: cli.strict,
        settings: Some(settings),
    };
    let output = format_source(&input, &options)?;

    if cli.check {
        let changed = output != input;
        if changed {
            log::info!("<stdin> would change");
        }
        return Ok(if changed {
            exit_codes::VIOLATIONS_FOUND
        } else {
            exit_codes::SUCCESS
        });
    }

    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.as_bytes()).await?;
    stdout.flush().await?;
    Ok(exit_codes::SUCCESS)
}

async fn run(cli: Cli) -> Result<i32> {
    let root = std::env::current_dir()?;
    let settings = load_settings(&cli, &root)?;
    if cli.stdin {
        return run_stdin(&cli, settings).await;
    }
    let files = collect_files(&root, &cli.patterns, &cli.ignore)?;
    if files.is_empty() {
        log::warn!("No Markdown or MDX files found");
        return Ok(exit_codes::SUCCESS);
    }
    let jobs = cli.jobs();
    log::debug!("Formatting {} file(s) with {} job(s)", files.len(), jobs);

    let mode = cli.mode();
    let options = Arc::new(FormatOptions {
        mdx: None,
        strict: cli.strict,
        settings: Some(settings),
    });
    let summary = run_batch(files, mode, options, jobs).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, mode);
    }

    let code = if summary.errored > 0 || (mode == RunMode::Check && summary.changed > 0) {
        exit_codes::VIOLATIONS_FOUND
    } else {
        exit_codes::SUCCESS
    };
    Ok(code)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            log::error!("{}", e);
            process::exit(exit_codes::TOOL_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdin_flag() {
        let cli = Cli::try_parse_from(["mdx-fmt", "--stdin", "--check"]).unwrap();
        assert!(cli.stdin);
        assert_eq!(cli.mode(), RunMode::Check);
    }

    #[test]
    fn test_stdin_conflicts_with_files_and_write() {
        assert!(Cli::try_parse_from(["mdx-fmt", "--stdin", "docs"]).is_err());
        assert!(Cli::try_parse_from(["mdx-fmt", "--stdin", "--write"]).is_err());
    }
}
