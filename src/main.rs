use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use log::info;

use aiger_synth::aiger::Circuit;
use aiger_synth::synthesis::{synthesize, Realizability, SynthesisConfig};

#[derive(Debug, Parser)]
#[command(author, version, about = "BDD-based safety synthesis for AIGER circuits")]
struct Cli {
    /// Input specification in ASCII AIGER format.
    #[arg(value_name = "AIGER")]
    aiger: PathBuf,

    /// Output file for the synthesized circuit (stdout if omitted).
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// BDD size (in bits, so the actual size is `2^size` nodes).
    #[arg(long, value_name = "INT", default_value = "20")]
    size: usize,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    let level = match args.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    // Logs go to stderr: stdout may carry the synthesized circuit.
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let mut circuit = Circuit::load(&args.aiger)
        .wrap_err_with(|| format!("Failed to read {}", args.aiger.display()))?;
    info!(
        "Loaded {}: {} inputs, {} latches, {} gates",
        args.aiger.display(),
        circuit.inputs().len(),
        circuit.latches().len(),
        circuit.ands().len()
    );

    let config = SynthesisConfig { storage_bits: args.size };
    let res = synthesize(&mut circuit, &config)?;

    if res == Realizability::Realizable {
        match &args.out {
            Some(path) => circuit
                .save(path)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?,
            None => {
                let mut stdout = std::io::stdout().lock();
                circuit.write_to(&mut stdout)?;
                stdout.flush()?;
            }
        }
    }

    info!("Total time: {:.2} s", time_total.elapsed().as_secs_f64());
    std::process::exit(res.exit_code());
}
