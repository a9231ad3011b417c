use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use harvest::config::Config;
use harvest::crawler::FetchOptions;
use harvest::Harvest;

#[derive(Parser)]
#[command(name = "harvest", version)]
#[command(about = "Run a Harvest web scraping script")]
struct Cli {
    /// Path to the script to run
    script: PathBuf,

    /// Show debug diagnostics and trace evaluation
    #[arg(long)]
    debug: bool,

    /// Maximum requests in flight during batch operations
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Retries after a transport failure
    #[arg(long, default_value_t = 3)]
    retries: u32,

    #[arg(long, default_value = "Harvest Crawler/1.0")]
    user_agent: String,

    /// Extra request header, as `Name: value`
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

impl Cli {
    fn config(&self) -> Result<Config, anyhow::Error> {
        let mut fetch = FetchOptions {
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
            max_retries: self.retries,
            ..FetchOptions::default()
        };

        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("header '{header}' is not of the form 'Name: value'"))?;
            fetch.headers.insert(name.trim().to_owned(), value.trim().to_owned());
        }

        Ok(Config::default()
            .with_fetch_options(fetch)
            .with_concurrency(self.concurrency)
            .with_debug(self.debug))
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HARVEST_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut harvest = Harvest::new(&cli.config()?)?;
    harvest.run_file(&cli.script.to_string_lossy())?;

    // Indicate an error in the exit code.
    if harvest.had_error() {
        std::process::exit(65);
    }
    if harvest.had_runtime_error() {
        std::process::exit(70);
    }

    Ok(())
}
