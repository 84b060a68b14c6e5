// src/main.rs

use clap::Parser;
use colored::Colorize;
use dispatch_runtime::agent::{self, AutoConfirm, Confirmer, RunReport, StdinConfirmer};
use dispatch_runtime::config::Config;
use dispatch_runtime::error::Result;
use dispatch_runtime::memory::{ConsoleSink, Verbalizer};
use dispatch_runtime::protocol::Resolution;
use dispatch_runtime::protocol::resolver::Resolver;
use dispatch_runtime::tools::{DryRunRunner, HostRunner, ProcessRunner, Toolbox};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const EXIT_WORDS: [&str; 5] = ["exit", "quit", "退出", "再见", "拜拜"];

/// Turn spoken or typed requests into host actions.
#[derive(Parser, Debug)]
#[command(name = "dispatch", version, about)]
struct Cli {
    /// Utterance to resolve and run
    #[arg(short, long)]
    text: Option<String>,

    /// Print host commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Resolve with the keyword rules only
    #[arg(long)]
    no_llm: bool,

    /// Read utterances from stdin until EOF or an exit word
    #[arg(short = 'l', long = "loop")]
    interactive: bool,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

struct Session {
    resolver: Resolver,
    toolbox: Toolbox,
    config: Config,
    confirmer: Box<dyn Confirmer>,
    use_model: bool,
}

impl Session {
    fn handle(&mut self, text: &str) {
        let resolution = match self.resolver.resolve(text, self.use_model) {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("Could not resolve utterance: {}", e);
                println!("{} {}", "✗".red().bold(), e.to_string().red());
                return;
            }
        };

        print_resolution(&resolution);

        let verbalizer = Verbalizer::new(self.config.language);
        let report = agent::Controller::new(resolution, self.config.confirmation)
            .with_verbalizer(verbalizer)
            .run(&self.toolbox, self.confirmer.as_mut(), &mut ConsoleSink);

        print_report(&report);
    }
}

fn print_resolution(resolution: &Resolution) {
    let label = if resolution.is_plan() { "Plan" } else { "Step" };
    println!("{}", format!("--- {label} ---").bold());
    for (i, step) in resolution.steps().iter().enumerate() {
        let params = serde_json::to_string(&step.parameters).unwrap_or_default();
        let mut line = format!("{}. {} {}", i + 1, step.action, params);
        if step.is_risky() {
            line.push_str(&format!(" [{:?}: {}]", step.risk.level, step.risk.reason));
        }
        println!("{line}");
    }
}

fn print_report(report: &RunReport) {
    println!("{}", "--- Report ---".bold());
    println!("state: {}", report.final_state);
    for (i, outcome) in report.outcomes.iter().enumerate() {
        let mark = if outcome.succeeded { "✓".green() } else { "✗".red() };
        println!("{mark} {}. {}", i + 1, outcome.message);
    }
    if let Some(stopped) = report.stopped_message() {
        println!("{}", stopped.yellow());
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dispatch_runtime={}", config.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn log_config_sources(config: &Config) {
    match &config.source {
        Some(path) => info!(path = %path.display(), "loaded config file"),
        None => info!("no config file, using defaults"),
    }
    if let Some(env_file) = &config.env_file {
        debug!(path = %env_file.display(), "loaded .env");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config);
    log_config_sources(&config);

    let resolver = Resolver::from_config(&config)?;
    let runner: Rc<dyn HostRunner> = if cli.dry_run {
        Rc::new(DryRunRunner::new())
    } else {
        Rc::new(ProcessRunner)
    };
    let toolbox = Toolbox::standard(runner, &config.search_url);
    let confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirmer)
    };

    let mut session = Session {
        use_model: !cli.no_llm && resolver.has_model(),
        resolver,
        toolbox,
        config,
        confirmer,
    };

    if let Some(text) = &cli.text {
        session.handle(text);
    }

    if cli.interactive || cli.text.is_none() {
        run_loop(&mut session)?;
    }

    Ok(())
}

fn run_loop(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            break;
        }

        session.handle(input);
    }
    Ok(())
}
