use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::debug;

use protosax::error::GenError;
use protosax::graph::ParseGraph;
use protosax::loader::load_schema;
use protosax::pool::DescriptorPool;
use protosax::generate_parser;

#[derive(Parser)]
#[command(name = "protosax")]
#[command(
    about = "Generate a streaming JSON-to-message parser from a proto schema",
    long_about = None
)]
struct Cli {
    /// Input `.proto` schema file
    idl_path: PathBuf,

    /// Rust path of the module providing the generated message types
    /// (e.g. `crate::pb`)
    messages_path: String,

    /// Fully-qualified root message name (e.g. `some.ns.MyMessage`)
    message_name: String,

    /// Directory the two generated source files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Print the decorated parse graph to stderr
    #[arg(long)]
    dump_graph: bool,
}

fn run(cli: &Cli) -> Result<(), GenError> {
    let mut pool = DescriptorPool::new();
    let (_file, root) = load_schema(&mut pool, &cli.idl_path, &cli.message_name)?;
    let graph = ParseGraph::build(&pool, root)?;
    debug!("graph has {} states", graph.total_states());

    if cli.dump_graph {
        eprint!("{}", graph.dump());
    }

    let emitted = generate_parser(&pool, &graph, &cli.messages_path)?;
    emitted.write_to(&cli.out_dir)?;
    println!("{}", emitted.api_file_name);
    println!("{}", emitted.sax_file_name);
    Ok(())
}

fn main() {
    env_logger::init();
    // clap exits with 2 on bad usage by default; every failure here is 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };
    if let Err(err) = run(&cli) {
        eprintln!("{}", err);
        process::exit(1);
    }
}
