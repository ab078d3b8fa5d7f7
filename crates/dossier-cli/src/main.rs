mod assemble_cmd;
mod cli;
mod envcfg;
mod foliate_cmd;
mod repair_links_cmd;
mod searchable_cmd;
mod shared;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        cli::Commands::Assemble {
            ref manifest,
            ref output,
            keep_toc,
            keep_work,
            no_headers,
            no_fojas,
            json,
        } => assemble_cmd::run(
            manifest, output, keep_toc, keep_work, no_headers, no_fojas, json,
        ),
        cli::Commands::Searchable {
            ref file,
            ref output,
            force,
            strict,
        } => searchable_cmd::run(file, output.as_deref(), force, strict),
        cli::Commands::Foliate {
            ref file,
            ref output,
            skip,
            start,
            every_page,
            ref prefix,
        } => foliate_cmd::run(
            file,
            output.as_deref(),
            skip,
            start,
            every_page,
            prefix.as_deref(),
        ),
        cli::Commands::RepairLinks {
            ref file,
            ref map,
            ref output,
        } => repair_links_cmd::run(file, map.as_deref(), output.as_deref()),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
