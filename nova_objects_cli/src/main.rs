// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
mod logger;
mod scenarios;
mod tree;

use clap::{Parser as ClapParser, Subcommand};
use logger::ConsoleLogger;
use nova_objects::ecmascript::execution::{Agent, JsError, JsResult, Options};

/// Drives the Nova object model through transition, deprecation and
/// normalization scenarios
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "nova_objects")]
#[command(about = "Explore hidden-class transitions and property storage", long_about = None)]
struct Cli {
    /// Log object model events; repeat for traces
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log every Map that is created, deprecated or normalized
    #[arg(long, global = true)]
    trace_maps: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Adds many distinct properties to objects sharing one root Map
    Fanout {
        /// Number of objects, each getting its own first property
        #[arg(short, long, default_value_t = 64)]
        width: usize,

        /// Properties added to every object after the first
        #[arg(short, long, default_value_t = 2)]
        depth: usize,

        /// Transition array capacity
        #[arg(long)]
        max_transitions: Option<usize>,
    },

    /// Deprecates a Map by widening a field and migrates its instances
    Deprecate {
        /// Properties per object
        #[arg(short, long, default_value_t = 6)]
        properties: usize,

        /// Objects sharing the deprecated Map
        #[arg(short, long, default_value_t = 8)]
        count: usize,
    },

    /// Moves an object to dictionary mode and back
    Normalize {
        /// Properties on the object
        #[arg(short, long, default_value_t = 10)]
        properties: usize,

        /// Drop the in-object slots while in dictionary mode
        #[arg(long)]
        clear_in_object: bool,
    },

    /// Prints the transition tree built by objects of the given shapes
    Tree {
        /// Shapes written as `name=value,name=value`
        #[arg(default_values_t = ["x=1,y=2".to_string(), "x=1,z=true".to_string(), "x=1.5".to_string()])]
        shapes: Vec<String>,
    },
}

fn exit_with_exception(agent: &mut Agent, error: JsError) -> ! {
    let message = error
        .message(agent)
        .unwrap_or_else(|| "unknown exception".to_string());
    eprintln!("Uncaught exception: {message}");
    std::process::exit(1);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    ConsoleLogger::install(args.verbose)?;

    let mut options = Options {
        trace_maps: args.trace_maps,
        ..Default::default()
    };
    if let Command::Fanout {
        max_transitions: Some(limit),
        ..
    } = args.command
    {
        options.max_number_of_transitions = limit;
    }
    let mut agent = Agent::new(options);

    let result: JsResult<()> = match args.command {
        Command::Fanout { width, depth, .. } => scenarios::fanout(&mut agent, width, depth),
        Command::Deprecate { properties, count } => {
            scenarios::deprecate(&mut agent, properties, count)
        }
        Command::Normalize {
            properties,
            clear_in_object,
        } => scenarios::normalize(&mut agent, properties, clear_in_object),
        Command::Tree { shapes } => scenarios::tree(&mut agent, &shapes),
    };
    if let Err(error) = result {
        exit_with_exception(&mut agent, error);
    }
    Ok(())
}
