//! Binary entrypoint for the formport CLI.
//!
//! Commands:
//! - `init` - write a starter `formport.toml`
//! - `import <file> [--replace]` - load a JSON container dump into the record store
//! - `export <container> <file>` - write a stored container as JSON
//! - `convert [--dry-run]` - run every conversion pass and save the output container
//! - `status` - list stored containers and their record counts
//!
//! See the library crate docs for module-level details: `formport::`.
use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use formport::config::Config;
use formport::convert::directives::{read_directive_file, speak_as_actors};
use formport::convert::{run_conversion, BuildDirCompiler, ConversionReport, TargetRoles};
use formport::logutil::init_logging;
use formport::records::{
    export_container_json, import_container_json, Container, RecordStore, StoreError,
};

#[derive(Parser)]
#[command(name = "formport")]
#[command(about = "Migrate game-data records to a successor format, carrying scripts and AI packages across")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "formport.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Import a JSON container dump into the record store
    Import {
        /// Dump file written by `export` or by an external extractor
        file: String,
        /// Drop an existing container of the same name first
        #[arg(long)]
        replace: bool,
    },
    /// Export a stored container as JSON
    Export {
        container: String,
        file: String,
    },
    /// Run the conversion and save the output container
    Convert {
        /// Run every pass but do not write the output container
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored containers
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => None,
        _ => Some(Config::load(&cli.config)?),
    };
    init_logging(config.as_ref().map(|cfg| &cfg.logging), cli.verbose);

    match (cli.command, config) {
        (Commands::Init, _) => {
            Config::create_default(&cli.config)?;
            info!("Configuration file created at {}", cli.config);
        }
        (Commands::Import { file, replace }, Some(config)) => {
            let store = RecordStore::open(&config.store.db_path)?;
            let mut container = import_container_json(&file)?;
            if store.contains(&container.name)? {
                if !replace {
                    return Err(anyhow!(
                        "container {} already exists; pass --replace to overwrite it",
                        container.name
                    ));
                }
                store.drop_container(&container.name)?;
                warn!("replaced existing container {}", container.name);
            }
            let written = store.save_container(&mut container)?;
            println!("Imported {} records into {}", written, container.name);
        }
        (Commands::Export { container, file }, Some(config)) => {
            let store = RecordStore::open(&config.store.db_path)?;
            let loaded = store.load_container(&container)?;
            export_container_json(&loaded, &file)?;
            println!("Exported {} records from {} to {}", loaded.len(), loaded.name, file);
        }
        (Commands::Convert { dry_run }, Some(config)) => {
            convert(&config, dry_run)?;
        }
        (Commands::Status, Some(config)) => {
            let store = RecordStore::open(&config.store.db_path)?;
            let names = store.list_containers()?;
            if names.is_empty() {
                println!("No containers stored in {}", config.store.db_path);
            }
            for name in names {
                let container = store.load_container(&name)?;
                println!(
                    "{:<32} load order {:>3}  {:>8} records",
                    name,
                    container.load_order,
                    container.len()
                );
            }
        }
        (_, None) => return Err(anyhow!("configuration not loaded")),
    }

    Ok(())
}

fn convert(config: &Config, dry_run: bool) -> Result<()> {
    info!("Starting formport v{}", env!("CARGO_PKG_VERSION"));
    let store = RecordStore::open(&config.store.db_path)?;
    let legacy = store.load_collection(config.legacy.containers.as_slice())?;
    let mut target = store.load_collection(&[&config.target.base, &config.target.master])?;

    let output = match store.load_container(&config.target.output) {
        Ok(container) => container,
        Err(StoreError::NotFound(_)) => {
            info!("creating output container {}", config.target.output);
            Container::new(&config.target.output, config.target.output_load_order)
        }
        Err(e) => return Err(e.into()),
    };
    target.add_container(output);
    let roles = TargetRoles::find(
        &target,
        &config.target.base,
        &config.target.master,
        &config.target.output,
    )?;

    let actors = match &config.directives.file {
        Some(path) => speak_as_actors(&read_directive_file(path)?),
        None => Vec::new(),
    };
    let mut compiler = BuildDirCompiler::new(&config.scripts.build_dir);
    let report = run_conversion(&legacy, &mut target, &roles, &mut compiler, &actors)?;
    print_summary(&report);

    if dry_run {
        println!("Dry run: output container not written");
        return Ok(());
    }
    let container = target
        .container_mut(roles.output)
        .ok_or_else(|| anyhow!("output container {} missing", config.target.output))?;
    let written = store.save_container(container)?;
    println!("Wrote {} records to {}", written, container.name);
    Ok(())
}

fn print_summary(report: &ConversionReport) {
    println!(
        "Converted {} records, created {}, skipped {}",
        report.converted,
        report.created,
        report.skipped.len()
    );
    let mut by_category = BTreeMap::new();
    for skip in &report.skipped {
        *by_category.entry(skip.category).or_insert(0usize) += 1;
    }
    for (category, count) in by_category {
        println!("  {:<4} {} skipped", category.code(), count);
    }
}
