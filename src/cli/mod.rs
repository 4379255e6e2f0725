//! CLI argument parsing and run wiring

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use swarm_bench_core::{OrchestratorBuilder, RampConfig, RunConfig, RunSummary, ShutdownSignal};
use swarm_bench_ui::{format_runtime, run_dashboard_or_log, run_log_presenter, DashboardContext};
use swarm_bench_vendors::{ProxyList, SimulatedBackend, SimulationConfig};

/// How often the log presenter prints a summary line
const PRESENTER_INTERVAL: Duration = Duration::from_secs(5);

/// swarm-bench - ramp up and hold many concurrent client sessions
#[derive(Parser, Debug)]
#[command(name = "swarm-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target link or name (prompted for when omitted)
    #[arg(short, long, env = "SWARM_TARGET")]
    pub target: Option<String>,

    /// Number of sessions to start (prompted for when omitted)
    #[arg(short = 'n', long, env = "SWARM_SESSIONS")]
    pub sessions: Option<usize>,

    /// Start sessions in batches with a pause between them
    #[arg(long)]
    pub slow: bool,

    /// Sessions per batch in slow mode
    #[arg(long, default_value = "100")]
    pub batch_size: usize,

    /// Seconds between batches in slow mode
    #[arg(long, default_value = "30")]
    pub batch_delay: u64,

    /// Disable the dashboard and log progress instead
    #[arg(long)]
    pub no_dashboard: bool,

    /// Routing path file, one `host:port:user:pass` per line
    #[arg(short, long, default_value = "proxies.txt")]
    pub proxies: PathBuf,

    /// JSON run configuration; flags given on the command line take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for jitter and simulated failures
    #[arg(long, env = "SWARM_SEED")]
    pub seed: Option<u64>,

    /// Stop the run after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Simulated credential rejection probability (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    pub credential_failure_rate: f64,

    /// Simulated dial refusal probability (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    pub dial_failure_rate: f64,

    /// Simulated keepalive send failure probability (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    pub send_failure_rate: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Whether to draw the dashboard
    ///
    /// Output that is not a terminal gets log lines instead.
    pub fn use_dashboard(&self, stdout_is_terminal: bool) -> bool {
        !self.no_dashboard && stdout_is_terminal
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self, dashboard: bool) -> &'static str {
        if self.verbose {
            "debug"
        } else if dashboard {
            "warn"
        } else {
            "info"
        }
    }

    /// Run the sessions described by the CLI arguments
    pub async fn run(&self, dashboard: bool) -> Result<()> {
        // 1. Load routing paths
        let routes = ProxyList::load(&self.proxies)
            .with_context(|| format!("Failed to load proxies from: {}", self.proxies.display()))?;

        // 2. Ask for whatever the flags left out
        let mut input = io::stdin().lock();
        let mut output = io::stdout();
        let target_name = match self.target {
            Some(ref target) => extract_target_name(target),
            None => extract_target_name(&prompt(&mut input, &mut output, "Target link or name: ")?),
        };
        if target_name.is_empty() {
            bail!("Target name must not be empty");
        }
        let sessions = match self.sessions {
            Some(n) => n,
            None => parse_sessions(&prompt(&mut input, &mut output, "How many sessions to start: ")?)?,
        };
        drop(input);

        // 3. Build the orchestrator
        let config = self.run_config(sessions)?;
        let backend = Arc::new(SimulatedBackend::new(self.simulation_config()));
        let orchestrator = OrchestratorBuilder::new()
            .config(config)
            .provider(backend.clone())
            .transport(backend.clone())
            .routes(Arc::new(routes))
            .verbose(!dashboard || self.verbose)
            .build()
            .context("Invalid run configuration")?;

        if !dashboard {
            self.print_banner(&target_name, orchestrator.config());
        }

        // 4. Resolve the target
        println!("Resolving target: {}...", target_name);
        let target_id = orchestrator
            .resolve_target(&target_name)
            .await
            .with_context(|| format!("Failed to resolve target: {}", target_name))?;

        // 5. Start presentation
        let done = ShutdownSignal::new();
        let presenter = if dashboard {
            tokio::spawn(run_dashboard_or_log(
                orchestrator.aggregator(),
                DashboardContext {
                    target_name: target_name.clone(),
                    target_id,
                },
                orchestrator.shutdown_signal(),
                done.clone(),
                PRESENTER_INTERVAL,
            ))
        } else {
            tokio::spawn(run_log_presenter(
                orchestrator.aggregator(),
                done.clone(),
                PRESENTER_INTERVAL,
            ))
        };

        // 6. Run until every session has exited
        let result = orchestrator
            .run_until(target_id, self.duration.map(Duration::from_secs))
            .await;

        done.trigger();
        let presented = presenter.await;

        let summary = result.context("Run failed")?;
        print_summary(&summary);
        tracing::info!(
            open_connections = backend.counters().open(),
            "All sessions stopped. Exiting."
        );

        presented.context("Presentation task panicked")?;
        Ok(())
    }

    /// Build the run configuration from `--config` and the flags
    pub fn run_config(&self, sessions: usize) -> Result<RunConfig> {
        let mut config = match self.config {
            Some(ref path) => load_config(path)?,
            None => RunConfig::default(),
        };

        config.total_sessions = sessions;
        if self.slow {
            config.ramp = RampConfig::Batched {
                batch_size: self.batch_size,
                batch_delay_secs: self.batch_delay,
            };
        }
        if let Some(seed) = self.seed {
            config.session.seed = Some(seed);
        }

        config.validate().context("Invalid run configuration")?;
        Ok(config)
    }

    /// Simulated backend settings from the flags
    pub fn simulation_config(&self) -> SimulationConfig {
        let config = SimulationConfig::default()
            .with_credential_failure_rate(self.credential_failure_rate)
            .with_dial_failure_rate(self.dial_failure_rate)
            .with_send_failure_rate(self.send_failure_rate);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    fn print_banner(&self, target_name: &str, config: &RunConfig) {
        println!("\n{}", "=".repeat(70));
        println!("   swarm-bench");
        println!("{}", "=".repeat(70));
        println!();
        println!("Configuration:");
        println!("  Target:       {}", target_name);
        println!("  Sessions:     {}", config.total_sessions);
        match config.ramp {
            RampConfig::Immediate => println!("  Ramp-up:      immediate"),
            RampConfig::Batched {
                batch_size,
                batch_delay_secs,
            } => println!(
                "  Ramp-up:      batches of {} every {}s",
                batch_size, batch_delay_secs
            ),
        }
        println!("  Routes:       {}", self.proxies.display());
        println!("{}", "=".repeat(70));
        println!();
    }
}

/// Read a JSON `RunConfig`
fn load_config(path: &Path) -> Result<RunConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Print `label` and read one trimmed line
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).context("Failed to read input")? == 0 {
        bail!("Unexpected end of input");
    }
    Ok(line.trim().to_string())
}

fn parse_sessions(input: &str) -> Result<usize> {
    let sessions: usize = input
        .trim()
        .parse()
        .with_context(|| format!("Invalid number of sessions: {}", input))?;
    if sessions == 0 {
        bail!("Number of sessions must be greater than 0");
    }
    Ok(sessions)
}

/// Reduce a target link to its name
///
/// `https://host/some/lobby?x=1` becomes `lobby`; a bare name is returned trimmed.
pub fn extract_target_name(input: &str) -> String {
    let input = input.trim();
    let path = input
        .split_once("://")
        .map_or(input, |(_, rest)| rest)
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.snapshot.stats;
    println!("\n{}", "=".repeat(70));
    println!("   Final Summary");
    println!("{}", "=".repeat(70));
    println!("  Total Sessions:          {}", stats.total);
    println!("  Successfully Connected:  {}", stats.counts.connected);
    println!("  Failed:                  {}", summary.failed);
    println!("  Cancelled:               {}", summary.cancelled);
    if summary.panicked > 0 {
        println!("  Panicked:                {}", summary.panicked);
    }
    if summary.ramp_interrupted {
        println!(
            "  Not Started:             {}",
            stats.total.saturating_sub(summary.launched)
        );
    }
    println!("  Total Attempts:          {}", stats.total_attempts);
    println!("  Success Rate:            {:.1}%", summary.success_rate());
    println!("  Runtime:                 {}", format_runtime(summary.elapsed));
    println!("{}", "=".repeat(70));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("swarm-bench").chain(args.iter().copied()))
    }

    #[test]
    fn test_extract_target_name() {
        assert_eq!(extract_target_name("lobby"), "lobby");
        assert_eq!(extract_target_name("  lobby \n"), "lobby");
        assert_eq!(extract_target_name("https://example.com/lobby"), "lobby");
        assert_eq!(extract_target_name("https://example.com/rooms/lobby/"), "lobby");
        assert_eq!(extract_target_name("example.com/lobby?ref=home#top"), "lobby");
        assert_eq!(extract_target_name(""), "");
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&[]);
        assert_eq!(cli.batch_size, 100);
        assert_eq!(cli.batch_delay, 30);
        assert_eq!(cli.proxies, PathBuf::from("proxies.txt"));
        assert!(!cli.slow);
        assert_eq!(cli.log_filter(cli.use_dashboard(true)), "warn");
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(cli(&["--no-dashboard"]).log_filter(false), "info");
        assert_eq!(cli(&["--no-dashboard", "-v"]).log_filter(false), "debug");
    }

    #[test]
    fn test_dashboard_needs_a_terminal() {
        let default = cli(&[]);
        assert!(default.use_dashboard(true));
        assert!(!default.use_dashboard(false));
        assert_eq!(default.log_filter(default.use_dashboard(false)), "info");
        assert!(!cli(&["--no-dashboard"]).use_dashboard(true));
    }

    #[test]
    fn test_run_config_slow_mode() {
        let config = cli(&["--slow", "--batch-size", "3", "--batch-delay", "5", "--seed", "9"])
            .run_config(7)
            .unwrap();
        assert_eq!(config.total_sessions, 7);
        assert_eq!(
            config.ramp,
            RampConfig::Batched {
                batch_size: 3,
                batch_delay_secs: 5
            }
        );
        assert_eq!(config.session.seed, Some(9));
        assert_eq!(config.ramp_plan().unwrap().total(), 7);
    }

    #[test]
    fn test_run_config_rejects_zero() {
        assert!(cli(&[]).run_config(0).is_err());
        assert!(cli(&["--slow", "--batch-size", "0"]).run_config(5).is_err());
    }

    #[test]
    fn test_run_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"total_sessions": 1, "session": {{"max_attempts": 3}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = cli(&["--config", &path]).run_config(4).unwrap();
        assert_eq!(config.total_sessions, 4);
        assert_eq!(config.session.max_attempts, 3);
        assert_eq!(config.ramp, RampConfig::Immediate);
    }

    #[test]
    fn test_prompt_and_parse_sessions() {
        let mut input = Cursor::new(b"https://example.com/lobby\n 12 \n".to_vec());
        let mut output = Vec::new();

        let target = prompt(&mut input, &mut output, "Target: ").unwrap();
        let sessions = prompt(&mut input, &mut output, "Sessions: ").unwrap();

        assert_eq!(extract_target_name(&target), "lobby");
        assert_eq!(parse_sessions(&sessions).unwrap(), 12);
        assert_eq!(String::from_utf8(output).unwrap(), "Target: Sessions: ");
        assert!(prompt(&mut input, &mut Vec::new(), "again: ").is_err());
    }

    #[test]
    fn test_parse_sessions_rejects_bad_input() {
        assert!(parse_sessions("0").is_err());
        assert!(parse_sessions("-3").is_err());
        assert!(parse_sessions("many").is_err());
    }

    #[test]
    fn test_simulation_config_seeded() {
        let config = cli(&["--dial-failure-rate", "0.25", "--seed", "3"]).simulation_config();
        assert_eq!(config.dial_failure_rate, 0.25);
        assert_eq!(config.seed, Some(3));
    }
}
