use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use tryon_contracts::events::EventWriter;
use tryon_contracts::{instruction_for, GarmentVariant, ImageSlot};
use tryon_engine::{
    new_session_id, EngineConfig, GeminiClient, ImageSource, Outcome, Status, TryOnController,
};

#[derive(Debug, Parser)]
#[command(name = "tryon-rs", version, about = "Virtual try-on with a generative image model")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dress the person in the given clothing and save the result
    TryOn(TryOnArgs),
    /// Print the instruction sent with a garment variant
    Instruction(InstructionArgs),
}

#[derive(Debug, Parser)]
struct TryOnArgs {
    #[arg(long)]
    person: PathBuf,
    #[arg(
        long,
        conflicts_with_all = ["top", "bottom"],
        required_unless_present_all = ["top", "bottom"]
    )]
    clothing: Option<PathBuf>,
    #[arg(long, requires = "bottom")]
    top: Option<PathBuf>,
    #[arg(long, requires = "top")]
    bottom: Option<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
}

impl TryOnArgs {
    fn variant(&self) -> GarmentVariant {
        if self.clothing.is_some() {
            GarmentVariant::Single
        } else {
            GarmentVariant::TopAndBottom
        }
    }

    fn slot_paths(&self) -> Vec<(ImageSlot, PathBuf)> {
        [
            (ImageSlot::Person, Some(&self.person)),
            (ImageSlot::Clothing, self.clothing.as_ref()),
            (ImageSlot::Top, self.top.as_ref()),
            (ImageSlot::Bottom, self.bottom.as_ref()),
        ]
        .into_iter()
        .filter_map(|(slot, path)| path.map(|path| (slot, path.clone())))
        .collect()
    }
}

#[derive(Debug, Parser)]
struct InstructionArgs {
    #[arg(long, default_value = "single", value_parser = parse_variant)]
    variant: GarmentVariant,
}

fn parse_variant(raw: &str) -> Result<GarmentVariant, String> {
    GarmentVariant::parse(raw).ok_or_else(|| format!("unknown variant '{raw}' (single, top-bottom)"))
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("tryon-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::TryOn(args) => run_try_on(args),
        Command::Instruction(args) => {
            println!("{}", instruction_for(args.variant));
            Ok(0)
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_try_on(args: TryOnArgs) -> Result<i32> {
    // No credential, no client: refuse before anything else happens.
    let config = EngineConfig::from_env().context("cannot start without configuration")?;
    let client = GeminiClient::new(config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(try_on(args, client))
}

async fn try_on(args: TryOnArgs, client: GeminiClient) -> Result<i32> {
    let mut controller = TryOnController::new(args.variant(), Arc::new(client));
    if let Some(events_path) = args.events.as_ref() {
        let session_id = new_session_id();
        tracing::info!(session_id = %session_id, path = %events_path.display(), "writing session events");
        controller = controller.with_events(EventWriter::new(events_path, session_id));
    }
    let controller = Arc::new(controller);

    let mut loads = JoinSet::new();
    for (slot, path) in args.slot_paths() {
        let controller = controller.clone();
        loads.spawn(async move {
            let source = ImageSource::from_path(path);
            controller.load_image(slot, &source).await
        });
    }
    while let Some(joined) = loads.join_next().await {
        if let Err(err) = joined.context("image load task panicked")? {
            tracing::debug!(error = %err, "slot load failed");
        }
    }

    let before = controller.snapshot();
    for slot in args.slot_paths().into_iter().map(|(slot, _)| slot) {
        if let Some(message) = before.slot_error(slot) {
            eprintln!("{message}");
        }
    }

    let status = match controller.trigger().await {
        Ok(status) => status,
        Err(rejected) => {
            eprintln!("{rejected}");
            return Ok(2);
        }
    };

    let session = controller.snapshot();
    match (status, session.outcome()) {
        (Status::Succeeded, Some(Outcome::Image(image))) => {
            let bytes = image.decode_bytes()?;
            if let Some(parent) = args.out.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&args.out, &bytes)
                .with_context(|| format!("failed to write {}", args.out.display()))?;
            println!(
                "saved {} ({}, {} bytes)",
                args.out.display(),
                image.media_type,
                bytes.len()
            );
            Ok(0)
        }
        (Status::Failed, Some(Outcome::Error(message))) => {
            eprintln!("{message}");
            Ok(1)
        }
        (status, _) => bail!("try-on ended in unexpected state {status:?}"),
    }
}
