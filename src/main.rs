mod aggregate;
mod catalog;
mod error;
mod export;
mod index;
mod interactive;
mod models;
mod session;
mod tracker;

use anyhow::{bail, Context, Result};
use catalog::PracticeCatalog;
use clap::{Arg, ArgAction, Command};
use log::{debug, info, warn};
use models::Config;
use session::AllocationSession;
use std::fs::File;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("place-allocator")
        .version("0.1")
        .about("Defines places from GP practices within an ICS and calculates relative need indices")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .value_name("ICS")
                .help("ICS to define places in (overrides the configuration)"),
        )
        .arg(
            Arg::new("groups")
                .short('g')
                .long("groups")
                .value_name("FILE")
                .help("Two-column CSV of place name and practice (overrides the configuration)"),
        )
        .arg(
            Arg::new("list-regions")
                .long("list-regions")
                .action(ArgAction::SetTrue)
                .help("List the ICSs in the practice data and exit"),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .action(ArgAction::SetTrue)
                .help("Define places one at a time from a console prompt"),
        )
        .arg(
            Arg::new("list-available")
                .long("list-available")
                .action(ArgAction::SetTrue)
                .help("List the practices of the selected ICS and exit"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map_or("config.toml", String::as_str);

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please edit {} and set your ICS and data paths, then run the program again.", config_file);
        return Ok(());
    };
    if let Some(region) = matches.get_one::<String>("region") {
        config.region = region.clone();
    }
    if let Some(groups) = matches.get_one::<String>("groups") {
        config.groups_path = Some(groups.clone());
    }

    println!("📂 Reading practice data from: {}", config.catalog_path);
    let catalog = PracticeCatalog::load(&config.catalog_path, &config.columns).map_err(|err| {
        let problem = if err.is_data_load() { "unusable" } else { "inconsistent" };
        anyhow::Error::new(err).context(format!("Practice data in {} is {}", config.catalog_path, problem))
    })?;
    if catalog.is_empty() {
        bail!("No practices found in {}", config.catalog_path);
    }
    let regions = catalog.regions();
    info!("loaded {} practices across {} regions", catalog.len(), regions.len());

    if matches.get_flag("list-regions") {
        for region in regions {
            println!("{}", region);
        }
        return Ok(());
    }

    let output_dir = config.output_directory.as_deref().unwrap_or("output");

    if matches.get_flag("interactive") {
        return interactive::run(&catalog, Some(config.region.clone()), output_dir);
    }

    let region = config.region.trim().to_string();
    if region.is_empty() {
        println!("❌ Error: region is empty in configuration file");
        println!("   Please edit {} or pass --region (see --list-regions)", config_file);
        return Ok(());
    }
    if !regions.contains(&region.as_str()) {
        bail!("ICS `{}` is not in the practice data (see --list-regions)", region);
    }

    let mut session = AllocationSession::new(&catalog);

    if matches.get_flag("list-available") {
        for practice in session.available(&region) {
            println!("{}", practice.id);
        }
        return Ok(());
    }

    let groups_path = config.groups_path.as_deref().unwrap_or("groups.csv");

    println!("🏥 ICS: {} ({} practices)", region, session.available(&region).len());
    println!("📄 Reading place groups from: {}", groups_path);
    let groups_file = File::open(groups_path)
        .with_context(|| format!("Failed to open groups file: {}", groups_path))?;
    let selections = export::read_groups(groups_file)
        .with_context(|| format!("Failed to read groups file: {}", groups_path))?;

    for selection in selections {
        let name = selection.name.clone();
        let size = selection.practices.len();
        match session.add_place(&region, selection) {
            Ok(()) => {
                debug!("added place {} with {} practices", name, size);
                println!("   ✅ {}: {} practices", name, size);
            }
            Err(e) => {
                warn!("skipping place {}: {}", name, e);
                println!("   ❌ {}: {}", name, e);
            }
        }
    }

    if session.rows().is_empty() {
        println!("❌ No places could be defined from {}", groups_path);
        return Ok(());
    }

    export::print_summary(&session);

    let (results_path, groups_out) = export::save_session(&session, &region, output_dir)?;
    println!("\n✅ Need indices calculated!");
    println!("📂 Allocations: {}", results_path.display());
    println!("📂 Groups: {}", groups_out.display());
    println!(
        "ℹ️  {} practices assigned, {} of {} remain unassigned",
        session.tracker().claimed_count(),
        session.available(&region).len(),
        region
    );
    Ok(())
}
