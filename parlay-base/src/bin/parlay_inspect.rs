//! Code of a binary printing statistics on a given serialized context.
extern crate parlay_base;

use parlay_base::errors::Result;
use parlay_base::graphs::{Context, Graph, Operation};

use parlay_utils::execute_main::execute_main;

use std::collections::HashMap;
use std::fs;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about=None)]
struct Args {
    /// path to the serialized context in JSON format
    #[clap(value_parser)]
    context_path: String,
}

fn print_graph_stats(context: &Context, graph: &Graph) -> Result<()> {
    println!("Graph {}:", graph.get_id());
    println!("  Nodes: {}", graph.get_num_nodes());

    let mut operation_counts = HashMap::<String, u64>::new();
    for node in graph.get_nodes() {
        *operation_counts
            .entry(node.get_operation().to_string())
            .or_insert(0) += 1;
    }
    let mut sorted_counts: Vec<(String, u64)> = operation_counts.into_iter().collect();
    sorted_counts.sort();
    println!("  Operations:");
    for (operation, count) in sorted_counts {
        println!("    {operation}: {count}");
    }

    println!("  Inputs:");
    for node in graph.get_nodes() {
        if let Operation::Input(t, party_id) = node.get_operation() {
            let name = node
                .get_name()?
                .unwrap_or_else(|| "<unnamed>".to_owned());
            let party = context.get_party_by_id(party_id)?;
            println!("    {name}: {t} from {party}");
        }
    }

    println!("  Outputs:");
    for output in graph.get_outputs() {
        println!(
            "    {}: {} to {}",
            output.get_name(),
            output.get_node().get_type()?,
            output.get_party()
        );
    }
    Ok(())
}

fn main() {
    env_logger::init();
    execute_main(|| -> Result<()> {
        let args = Args::parse();
        let serialized_context = fs::read_to_string(&args.context_path)?;
        let context = serde_json::from_str::<Context>(&serialized_context)?;

        let parties = context.get_parties();
        println!("Parties: {}", parties.len());
        for party in &parties {
            println!("  {} (id {})", party.get_name(), party.get_id());
        }

        let main_graph_id = context.get_main_graph().map(|g| g.get_id()).ok();
        for graph in context.get_graphs() {
            print_graph_stats(&context, &graph)?;
            if Some(graph.get_id()) == main_graph_id {
                println!("  (main graph)");
            }
        }
        Ok(())
    });
}
