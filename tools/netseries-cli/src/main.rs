use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use netseries_cli::{
    load_config, parse_list, parse_range, preview_csv, render_dot, run_generate, synth_csv,
    validate_file, RunOptions,
};
use netseries_core::ResolveOrder;
use structopt::StructOpt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(StructOpt, Debug)]
#[structopt(name = "netseries", about = "Synthetic network time-series generator")]
struct Opt {
    /// Log debug output (same as RUST_LOG=debug for this tool)
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Generate every super node of a configuration into CSV files
    Generate {
        /// Input configuration (YAML) file
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        /// Output directory for generated series
        #[structopt(parse(from_os_str), short = "o", long = "out", default_value = "generated")]
        out_dir: PathBuf,

        /// Seed for the noise source
        #[structopt(long)]
        seed: Option<u64>,

        /// Generation order: two-pass or topological
        #[structopt(long, default_value = "two-pass")]
        order: ResolveOrder,

        /// Also write series.json
        #[structopt(long)]
        json: bool,
    },

    /// Check a configuration file and list its violations
    Validate {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },

    /// Synthesize a single curve from control points
    Synth {
        /// Comma separated control points between 0 and 1
        #[structopt(long)]
        points: String,

        /// Comma separated <lower,upper>
        #[structopt(long, default_value = "0,1")]
        range: String,

        #[structopt(long, default_value = "100")]
        samples: usize,

        #[structopt(long, default_value = "0.05")]
        noise: f64,

        #[structopt(long)]
        seed: Option<u64>,
    },

    /// Bezier preview of control points
    Preview {
        #[structopt(long)]
        points: String,

        #[structopt(long, default_value = "200")]
        samples: usize,
    },

    /// Render the dependency graph as Graphviz DOT
    Graph {
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        /// Draw sub nodes and their connections instead of super nodes
        #[structopt(long)]
        subnodes: bool,

        /// Write to a file instead of stdout
        #[structopt(parse(from_os_str), short = "o", long = "out")]
        out: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "netseries_cli=debug,netseries_core=debug"
    } else {
        "netseries_cli=info,netseries_core=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_tracing(opt.verbose);

    match opt.cmd {
        Command::Generate {
            input,
            out_dir,
            seed,
            order,
            json,
        } => {
            let summary = run_generate(
                &input,
                &RunOptions {
                    out_dir,
                    seed,
                    order,
                    json,
                },
            )?;
            for path in &summary.csv_files {
                println!("{}", path.display());
            }
            println!("{}", summary.summary_file.display());
        }
        Command::Validate { input } => {
            let violations = validate_file(&input)?;
            if !violations.is_empty() {
                for v in &violations {
                    eprintln!("- {}", v);
                }
                bail!("{} has {} violation(s)", input.display(), violations.len());
            }
            println!("{} is valid", input.display());
        }
        Command::Synth {
            points,
            range,
            samples,
            noise,
            seed,
        } => {
            let csv = synth_csv(&parse_list(&points)?, parse_range(&range)?, samples, noise, seed)?;
            print!("{}", csv);
        }
        Command::Preview { points, samples } => {
            print!("{}", preview_csv(&parse_list(&points)?, samples)?);
        }
        Command::Graph { input, subnodes, out } => {
            let dot = render_dot(&load_config(&input)?, subnodes)?;
            match out {
                Some(path) => {
                    fs::write(&path, dot).with_context(|| format!("write {}", path.display()))?
                }
                None => print!("{}", dot),
            }
        }
    }
    Ok(())
}
