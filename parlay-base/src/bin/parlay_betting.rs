//! Code of a binary printing the serialized betting context on the standard
//! output in (serde) JSON format.
#[macro_use]
extern crate parlay_base;

use parlay_base::applications::betting::create_betting_graph;
use parlay_base::errors::Result;
use parlay_base::graphs::create_context;

use parlay_utils::execute_main::execute_main;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about=None)]
struct Args {
    /// number of bettors
    #[clap(short, long, value_parser, default_value_t = 3)]
    bettors: u64,
    /// number of events
    #[clap(short, long, value_parser, default_value_t = 4)]
    events: u64,
}

fn main() {
    // Initialize a logger that collects information about errors and panics within Parlay.
    // This information can be accessed via RUST_LOG.
    env_logger::init();
    // Execute Parlay code such that all the internal errors are properly formatted and logged.
    execute_main(|| -> Result<()> {
        let args = Args::parse();
        if args.bettors == 0 {
            return Err(runtime_error!(
                "A betting computation without bettors reveals nothing useful"
            ));
        }
        let context = create_context()?;
        let graph = create_betting_graph(&context, args.bettors, args.events)?;
        context.set_main_graph(graph.clone())?;
        assert_eq!(graph, context.get_main_graph()?);
        context.finalize()?;
        println!("{}", serde_json::to_string(&context)?);
        Ok(())
    });
}
