//! Sweeprun
//!
//! Runs the command of a run plan once per scenario and writes the results.
//!
//! Usage: `sweeprun <plan.yaml> [--serial] [--jobs N] [--list]`

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use sweeprun_tools::plan::Plan;
use sweeprun_tools::Overrides;

#[derive(Parser, Debug)]
#[command(name = "sweeprun")]
#[command(about = "Run a command once per scenario and tabulate what each run printed")]
struct Args {
    /// Path to the run plan (YAML)
    plan: PathBuf,

    /// Run scenarios one after another instead of concurrently
    #[arg(long)]
    serial: bool,

    /// Run in parallel with at most N processes at once, even if the plan
    /// asks for serial execution
    #[arg(long, short = 'j', conflicts_with = "serial")]
    jobs: Option<NonZeroUsize>,

    /// Print the commands that would run and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    sweeprun_tools::init_logging();

    let args = Args::parse();

    let plan = match Plan::load(&args.plan) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to load plan '{}': {}", args.plan.display(), e);
            process::exit(1);
        }
    };

    let sweep = match plan.to_sweep() {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid plan '{}': {}", args.plan.display(), e);
            process::exit(1);
        }
    };
    let sweep = Overrides {
        serial: args.serial,
        jobs: args.jobs,
    }
    .apply(&sweep);

    if args.list {
        match sweep.invocations() {
            Ok(invocations) => {
                for invocation in invocations {
                    println!("{}\t{}", invocation.id, invocation.command_line());
                }
            }
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        }
        return;
    }

    match sweep.run() {
        Ok(table) => info!(
            "Ran {} scenarios, {} fields per record",
            table.records.len(),
            table.fields.len()
        ),
        Err(e) => {
            error!("Sweep failed: {}", e);
            process::exit(1);
        }
    }
}
