//! chipflow - value-routing simulator CLI
//!
//! Commands:
//!   chipflow run <file>            Replay an instruction listing, print sinks
//!   chipflow find <a> <b> <file>   Which bot compares the pair (a, b)?
//!   chipflow demo                  Run the built-in worked example

use std::process;

use serde::Serialize;
use tracing::{error, info};

use chipflow::driver::{Outcome, Simulation};
use chipflow::instructions::Program;
use chipflow::network::{NetworkConfig, NodeId, NodeKind};
use chipflow::observer::{EventLog, PairFinder};

const DEMO_LISTING: &str = "\
value 5 goes to bot 2
bot 2 gives low to bot 1 and high to bot 0
value 3 goes to bot 1
bot 1 gives low to output 1 and high to bot 0
bot 0 gives low to output 2 and high to output 0
value 2 goes to bot 2
";

#[derive(Debug, Serialize)]
struct RunSummary {
    events: usize,
    bots: usize,
    outputs: usize,
    sinks: Vec<SinkSummary>,
}

#[derive(Debug, Serialize)]
struct SinkSummary {
    output: NodeId,
    values: Vec<u32>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match args.first().map(String::as_str) {
        Some("run") if args.len() == 2 => cmd_run(&args[1]),
        Some("find") if args.len() == 4 => cmd_find(&args[1], &args[2], &args[3]),
        Some("demo") if args.len() == 1 => cmd_demo(),
        Some("--help") | Some("-h") | Some("help") => {
            print_help();
            0
        }
        _ => {
            print_help();
            2
        }
    };
    process::exit(code);
}

fn print_help() {
    eprintln!("chipflow - value-routing simulator");
    eprintln!("Usage:");
    eprintln!("  chipflow run <file>            Replay a listing and print sink contents");
    eprintln!("  chipflow find <a> <b> <file>   Print the bot that compares the pair (a, b)");
    eprintln!("  chipflow demo                  Run the built-in worked example");
}

fn load_program(path: &str) -> Result<Program, i32> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        error!("cannot read {path}: {e}");
        1
    })?;
    Program::parse(&text).map_err(|e| {
        error!("parse failed, no instructions applied: {e}");
        1
    })
}

fn cmd_run(path: &str) -> i32 {
    let program = match load_program(path) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mut sim = Simulation::new(NetworkConfig::default());
    let mut log = EventLog::new();
    if let Err(e) = sim.run_program(&program, &mut log) {
        error!("run aborted: {e}");
        return 1;
    }

    let diag = sim.network().diagnostics();
    info!(
        wirings = program.wirings.len(),
        assignments = program.assignments.len(),
        events = log.events().len(),
        "replay complete"
    );

    let mut sink_ids: Vec<NodeId> = program
        .wirings
        .iter()
        .flat_map(|w| [w.low, w.high])
        .filter(|r| r.kind == NodeKind::Output)
        .map(|r| r.id)
        .collect();
    sink_ids.sort_unstable();
    sink_ids.dedup();

    let summary = RunSummary {
        events: log.events().len(),
        bots: diag.bots,
        outputs: diag.outputs,
        sinks: sink_ids
            .into_iter()
            .map(|id| SinkSummary {
                output: id,
                values: sim.sink(id).to_vec(),
            })
            .collect(),
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            error!("cannot serialize summary: {e}");
            1
        }
    }
}

fn cmd_find(a: &str, b: &str, path: &str) -> i32 {
    let (Ok(a), Ok(b)) = (a.parse::<u32>(), b.parse::<u32>()) else {
        error!("pair values must be non-negative integers");
        return 2;
    };

    let program = match load_program(path) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mut sim = Simulation::new(NetworkConfig::default());
    let mut finder = PairFinder::new(a, b);
    let outcome = match sim.run_program(&program, &mut finder) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("run aborted: {e}");
            return 1;
        }
    };

    match finder.found() {
        Some(bot) => {
            if outcome == Outcome::Interrupted {
                info!(bot, "pair found, replay stopped early");
            }
            println!("{bot}");
            0
        }
        None => {
            info!("no bot compared ({a}, {b})");
            1
        }
    }
}

fn cmd_demo() -> i32 {
    let program = Program::parse(DEMO_LISTING).expect("built-in listing parses");

    let mut sim = Simulation::new(NetworkConfig::default());
    let mut finder = PairFinder::new(2, 5);
    sim.run_program(&program, &mut finder)
        .expect("built-in listing is acyclic");

    match finder.found() {
        Some(bot) => println!("pair (2, 5) compared by bot {bot}"),
        None => println!("pair (2, 5) never compared"),
    }

    let mut sim = Simulation::new(NetworkConfig::default());
    let mut log = EventLog::new();
    sim.run_program(&program, &mut log)
        .expect("built-in listing is acyclic");
    for id in 0..3 {
        println!("output {id}: {:?}", sim.sink(id));
    }
    0
}
