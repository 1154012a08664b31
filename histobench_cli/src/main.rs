use anyhow::{Context, Result};
use clap::Parser;
use histobench::{
    BenchmarkResult, Calculation, Channel, ChannelsLoaded, EngineConfig, EngineError,
    EngineErrorClass, HistogramSession, Strategy,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "histobench")]
#[command(version, about = "Per-channel image histograms and counting-kernel benchmarks", long_about = None)]
struct Cli {
    /// Image to analyze (png, jpg, bmp, ...)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Number of parallel tasks [default: hardware concurrency, or HISTOBENCH_WORKERS]
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Counting kernel: "scalar" or "unrolled" [default: scalar, or HISTOBENCH_STRATEGY]
    #[arg(short, long, value_name = "KERNEL")]
    strategy: Option<Strategy>,

    /// Compare both kernels instead of printing histograms
    #[arg(short, long)]
    benchmark: bool,

    /// Runs per kernel when benchmarking [default: 10, or HISTOBENCH_ITERATIONS]
    #[arg(short = 'n', long, value_name = "N")]
    iterations: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    // --- 1. Argument Parsing & Setup ---
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:?}");
            ExitCode::from(exit_status(&error))
        }
    }
}

/// 2 for bad settings, 3 for bad input, 4 for engine failures, 1 otherwise.
fn exit_status(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<EngineError>().map(EngineError::class) {
        Some(EngineErrorClass::InvalidConfig) => 2,
        Some(EngineErrorClass::InvalidInput) => 3,
        Some(EngineErrorClass::Fatal) => 4,
        None => 1,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = EngineConfig::from_env().context("reading HISTOBENCH_* environment")?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(iterations) = cli.iterations {
        config.iterations = iterations;
    }

    log::debug!("configuration: {config:?}");

    // --- 2. Session & Image Loading ---
    let mut session = HistogramSession::new(config).context("invalid configuration")?;
    let loaded = session
        .load_image(&cli.image)
        .with_context(|| format!("File unsupported: {}", cli.image.display()))?;
    if !cli.json {
        println!("{}", loaded_message(&cli.image, &loaded));
    }

    // --- 3. Calculation or Benchmark ---
    if cli.benchmark {
        let result = session.run_benchmark().context("benchmark failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_benchmark(&result);
        }
    } else {
        let calculation = session.calculate().context("histogram calculation failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&calculation)?);
        } else {
            print_calculation(&calculation);
        }
    }

    Ok(())
}

fn tasks(workers: usize) -> &'static str {
    if workers == 1 { "task" } else { "tasks" }
}

fn loaded_message(path: &Path, loaded: &ChannelsLoaded) -> String {
    format!(
        "Loading image \"{}\" ({} x {}) Total {} pixels",
        path.display(),
        loaded.width,
        loaded.height,
        loaded.pixels
    )
}

fn calculation_message(calculation: &Calculation) -> String {
    format!(
        "Histograms calculated successfully (using {} {}, elapsed: {} ms).",
        calculation.workers,
        tasks(calculation.workers),
        calculation.elapsed.as_millis()
    )
}

fn benchmark_lines(result: &BenchmarkResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Benchmark ({} iterations, {} {}):",
        result.iterations,
        result.workers,
        tasks(result.workers)
    )];
    lines.extend(
        Strategy::ALL
            .iter()
            .map(|&strategy| format!("{}: {} ms", strategy.name(), result.elapsed(strategy).as_millis())),
    );
    if let Some(ratio) = result.ratio() {
        lines.push(format!("scalar / unrolled = {ratio:.2}"));
    }
    lines
}

fn print_calculation(calculation: &Calculation) {
    println!("{}", calculation_message(calculation));
    println!("Kernel: {}", calculation.strategy);
    for channel in Channel::ALL {
        let Some(histogram) = calculation.histograms.get(channel) else {
            continue;
        };
        let used = histogram.bins().iter().filter(|&&count| count > 0).count();
        match histogram.peak() {
            Some(peak) => println!(
                "  {:<9} samples: {:>10}  levels used: {:>3}  peak: {:>3} ({} samples)",
                channel.name(),
                histogram.total(),
                used,
                peak,
                histogram[peak]
            ),
            None => println!("  {:<9} empty", channel.name()),
        }
    }
}

fn print_benchmark(result: &BenchmarkResult) {
    for line in benchmark_lines(result) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histobench::{HistogramBundle, KernelError};
    use std::time::Duration;

    #[test]
    fn loaded_message_names_path_size_and_pixels() {
        let loaded = ChannelsLoaded { width: 640, height: 480, pixels: 307_200 };
        assert_eq!(
            loaded_message(Path::new("shots/cat.png"), &loaded),
            "Loading image \"shots/cat.png\" (640 x 480) Total 307200 pixels"
        );
    }

    #[test]
    fn calculation_message_pluralizes_tasks() {
        let mut calculation = Calculation {
            elapsed: Duration::from_millis(42),
            workers: 1,
            strategy: Strategy::Unrolled,
            histograms: HistogramBundle::default(),
        };
        assert_eq!(
            calculation_message(&calculation),
            "Histograms calculated successfully (using 1 task, elapsed: 42 ms)."
        );

        calculation.workers = 8;
        assert_eq!(
            calculation_message(&calculation),
            "Histograms calculated successfully (using 8 tasks, elapsed: 42 ms)."
        );
    }

    #[test]
    fn benchmark_lines_list_both_kernels() {
        let result = BenchmarkResult {
            iterations: 10,
            workers: 4,
            scalar_elapsed: Duration::from_millis(300),
            unrolled_elapsed: Duration::from_millis(150),
        };
        assert_eq!(
            benchmark_lines(&result),
            [
                "Benchmark (10 iterations, 4 tasks):",
                "scalar: 300 ms",
                "unrolled: 150 ms",
                "scalar / unrolled = 2.00",
            ]
        );
    }

    #[test]
    fn exit_status_follows_error_class() {
        let config = anyhow::Error::new(EngineError::InvalidConfig("zero workers".into()))
            .context("invalid configuration");
        assert_eq!(exit_status(&config), 2);

        let input = anyhow::Error::new(EngineError::InvalidInput("no image loaded".into()));
        assert_eq!(exit_status(&input), 3);

        let kernel = anyhow::Error::new(EngineError::Kernel {
            channel: Channel::Red,
            source: KernelError::EmptyInput,
        })
        .context("histogram calculation failed");
        assert_eq!(exit_status(&kernel), 4);

        assert_eq!(exit_status(&anyhow::anyhow!("serialization failed")), 1);
    }
}
