//! pmapctl: operator tool for platform mapping files.
//!
//! Validates a mapping, resolves programming plans, lists ports, dumps the
//! core pin map and merges mapping fragments.

mod writer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use pmap_core::{
    program_ports, LoaderConfig, MappingSnapshot, MappingStore, PortProfileResolver,
    RawPlatformMapping, ResolveRequest, TransceiverFactor,
};
use pmap_types::{PortId, ProfileId};

use crate::writer::JsonPlanWriter;

/// Platform mapping inspection and resolution
#[derive(Parser, Debug)]
#[command(name = "pmapctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Platform mapping JSON file
    #[arg(short, long)]
    mapping: PathBuf,

    /// Loader configuration TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the mapping
    Validate,

    /// Resolve the programming plan for a port and profile
    Resolve {
        /// Port id or name (e.g. 1 or eth1/1/1)
        #[arg(long)]
        port: String,

        /// Profile id
        #[arg(long)]
        profile: ProfileId,

        /// Cable length in meters reported by the transceiver
        #[arg(long = "cable-length")]
        cable_lengths: Vec<f64>,

        /// Media interface code reported by the transceiver
        #[arg(long)]
        media_interface_code: Option<i32>,

        /// Transceiver management interface code
        #[arg(long)]
        management_interface: Option<i32>,
    },

    /// List ports with their supported profiles
    Ports,

    /// Dump the core pin mapping of controlling ports for one profile
    CorePins {
        /// Profile id
        #[arg(long)]
        profile: ProfileId,
    },

    /// Merge mapping fragments into the base mapping
    Merge {
        /// Fragments to merge, in order
        #[arg(required = true)]
        fragments: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Initialize tracing/logging.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<LoaderConfig> {
    match path {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(LoaderConfig::default()),
    }
}

fn load_raw(path: &Path) -> Result<RawPlatformMapping> {
    RawPlatformMapping::from_path(path).with_context(|| format!("loading {}", path.display()))
}

fn parse_port(resolver: &PortProfileResolver, port: &str) -> Result<PortId> {
    match port.parse::<PortId>() {
        Ok(id) => Ok(id),
        Err(_) => Ok(resolver.snapshot().topology().port_by_name(port)?),
    }
}

fn validate(snapshot: &MappingSnapshot) {
    println!(
        "OK: {} ports, {} chips, {} profiles, {} override rules",
        snapshot.topology().len(),
        snapshot.chips().len(),
        snapshot.catalog().len(),
        snapshot.overrides().len()
    );
    for (port, profile, reason) in snapshot.quarantined() {
        println!("quarantined: port {} profile {}: {}", port, profile, reason);
    }
}

fn list_ports(resolver: &PortProfileResolver) -> Result<()> {
    let snapshot = resolver.snapshot();
    println!(
        "{:<6} {:<14} {:<5} {:<11} {:<6} {:<8} PROFILES",
        "ID", "NAME", "CTRL", "TYPE", "LANES", "MAX"
    );
    for port in snapshot.topology().ports() {
        let profiles = snapshot.catalog().supported_profiles(port.id)?;
        let profiles: Vec<String> = profiles.iter().map(ToString::to_string).collect();
        println!(
            "{:<6} {:<14} {:<5} {:<11} {:<6} {:<8} {}",
            port.id.to_string(),
            port.name,
            port.controlling_port.to_string(),
            port.port_type.to_string(),
            port.lanes.len(),
            resolver.max_speed(port.id)?.to_string(),
            profiles.join(",")
        );
    }
    Ok(())
}

fn core_pins(resolver: &PortProfileResolver, profile: ProfileId) -> Result<()> {
    let snapshot = resolver.snapshot();
    let mut requests = Vec::new();
    for port in snapshot.topology().ports() {
        if snapshot.catalog().lookup_port_profile_entry(port.id, profile).is_ok() {
            requests.push((port.id, profile));
        }
    }
    debug!(ports = requests.len(), "Resolving core pin mapping");
    let mapping = resolver.core_pin_mapping(&requests)?;
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let raw = load_raw(&args.mapping)?;

    if let Command::Merge { fragments, output } = &args.command {
        let mut merged = raw;
        for fragment in fragments {
            merged
                .merge(load_raw(fragment)?)
                .with_context(|| format!("merging {}", fragment.display()))?;
        }
        // Refuse to write a mapping that would not load.
        MappingSnapshot::build(&merged, &config).context("merged mapping is invalid")?;
        std::fs::write(output, merged.to_json_pretty()?)
            .with_context(|| format!("writing {}", output.display()))?;
        info!(output = %output.display(), "Wrote merged mapping");
        return Ok(());
    }

    let store = MappingStore::new(&raw, config).context("building mapping snapshot")?;
    let resolver = store.resolver();

    match args.command {
        Command::Validate => validate(resolver.snapshot()),
        Command::Resolve {
            port,
            profile,
            cable_lengths,
            media_interface_code,
            management_interface,
        } => {
            let port = parse_port(&resolver, &port)?;
            let mut request = ResolveRequest::new(port, profile);
            if !cable_lengths.is_empty()
                || media_interface_code.is_some()
                || management_interface.is_some()
            {
                request = request.with_transceiver(TransceiverFactor {
                    cable_lengths,
                    media_interface_code,
                    management_interface,
                });
            }
            let mut writer = JsonPlanWriter::new(std::io::stdout().lock());
            program_ports(&resolver, &[request], &mut writer)?;
        }
        Command::Ports => list_ports(&resolver)?,
        Command::CorePins { profile } => core_pins(&resolver, profile)?,
        Command::Merge { .. } => bail!("merge is handled before the snapshot is built"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("pmapctl failed: {:#}", e);
            for issue in e
                .chain()
                .filter_map(|cause| cause.downcast_ref::<pmap_core::MappingError>())
                .flat_map(|err| err.issues())
            {
                eprintln!("  - {}", issue);
            }
            ExitCode::FAILURE
        }
    }
}
