//! Out-of-order CPU timing simulator CLI.
//!
//! This binary builds a configuration, runs one simulation and reports the result.
//! It performs:
//! 1. **Configuration:** Defaults, optionally overlaid by a JSON file, then by flags.
//! 2. **Run:** Prints `Beginning simulation!`, runs to the first exit condition and
//!    prints `Exiting @ tick <N> because <cause>`.
//! 3. **Reporting:** Optional statistics sections; the process exit code follows the
//!    workload's exit code, or is non-zero on errors, faults and limits.

use std::path::PathBuf;
use std::{fs, process};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use o3sim_core::config::Config;
use o3sim_core::sim::Simulator;

#[derive(Parser, Debug)]
#[command(
    name = "o3sim",
    author,
    version,
    about = "Event-driven out-of-order CPU and cache hierarchy timing simulator",
    long_about = "Runs a workload on one or more out-of-order CPUs with private L1I/L1D/L2 caches.\n\nExamples:\n  o3sim\n  o3sim --binary /bin/echo --options \"Hello gem5 pipeline\"\n  o3sim --binary program.json --cpus 2 --threads 2 --stats summary"
)]
struct Cli {
    /// JSON configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workload: a JSON micro-ISA program, or any other path for the built-in echo.
    #[arg(short, long)]
    binary: Option<String>,

    /// Workload arguments, split on whitespace.
    #[arg(short, long)]
    options: Option<String>,

    /// Number of CPUs.
    #[arg(long)]
    cpus: Option<usize>,

    /// Hardware threads per CPU.
    #[arg(long)]
    threads: Option<usize>,

    /// CPU and cache clock (e.g. "1GHz").
    #[arg(long)]
    clock: Option<String>,

    /// Size of the memory range (e.g. "8192MiB").
    #[arg(long)]
    mem_size: Option<String>,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Stop once a thread commits this many instructions.
    #[arg(long)]
    max_insts: Option<u64>,

    /// Print statistics; optionally only the named sections (comma separated).
    #[arg(long, num_args = 0..=1, default_missing_value = "", value_name = "SECTIONS")]
    stats: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn build_config(cli: &Cli) -> Result<Config, String> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(binary) = &cli.binary {
        config.binary_path.clone_from(binary);
    }
    if let Some(options) = &cli.options {
        config.arguments = options.split_whitespace().map(str::to_string).collect();
    }
    if let Some(cpus) = cli.cpus {
        config.cpu_count = cpus;
    }
    if let Some(threads) = cli.threads {
        config.threads_per_cpu = threads;
    }
    if let Some(clock) = &cli.clock {
        config.clock.clone_from(clock);
    }
    if let Some(size) = &cli.mem_size {
        config.memory_size.clone_from(size);
    }
    if cli.max_ticks.is_some() {
        config.limits.max_ticks = cli.max_ticks;
    }
    if cli.max_insts.is_some() {
        config.limits.max_insts = cli.max_insts;
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(2);
    });
    debug!(?config, "configuration");

    let mut sim = Simulator::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(2);
    });

    println!("Beginning simulation!");
    let report = match sim.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error @ tick {}: {e}", sim.queue.now());
            process::exit(3);
        }
    };

    if let Some(output) = sim.output() {
        print!("{output}");
    }
    println!("Exiting @ tick {} because {}", report.final_tick, report.cause);

    if let Some(sections) = &cli.stats {
        let sections: Vec<String> = sections
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        sim.print_stats(&sections);
    }

    process::exit(report.process_exit_code());
}
