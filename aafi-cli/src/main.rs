//! AAFI CLI Tool
//!
//! Command-line interface for inspecting the audio timeline of decoded AAF files.

use aafi_core::{AafIface, AudioTrack, Interpolation, ItemKind, JsonDecoder, ResolveOptions};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aafi")]
#[command(about = "AAFI - Simplified audio timelines from AAF compositions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Number given to the first track without a physical track number
    #[arg(long, global = true, default_value = "1")]
    first_track: u32,

    /// Curve of transitions that carry no level parameter
    #[arg(long, global = true, value_enum, default_value = "linear")]
    fade_curve: FadeCurve,
}

#[derive(Subcommand)]
enum Commands {
    /// Print composition, tracks and essences
    Info {
        /// Decoded object store (JSON dump)
        input: PathBuf,

        /// Print every item instead of the first 10 per track
        #[arg(long)]
        all: bool,
    },

    /// Write the resolved timeline as JSON
    Export {
        /// Decoded object store (JSON dump)
        input: PathBuf,

        /// Output JSON file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FadeCurve {
    Linear,
    Log,
    Power,
    Constant,
}

impl From<FadeCurve> for Interpolation {
    fn from(curve: FadeCurve) -> Self {
        match curve {
            FadeCurve::Linear => Interpolation::Linear,
            FadeCurve::Log => Interpolation::Log,
            FadeCurve::Power => Interpolation::Power,
            FadeCurve::Constant => Interpolation::Constant,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aafi_core=info,aafi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let options = ResolveOptions {
        first_track_number: cli.first_track,
        default_interpolation: cli.fade_curve.into(),
    };

    match cli.command {
        Commands::Info { input, all } => {
            let iface = load(input, options)?;
            print_info(&iface, all);
        }
        Commands::Export { input, output } => export(input, output, options)?,
    }

    Ok(())
}

fn load(input: PathBuf, options: ResolveOptions) -> Result<AafIface> {
    let mut iface = AafIface::with_options(None, options).context("Failed to create interface")?;
    iface
        .load_file(&JsonDecoder, &input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    tracing::info!(
        "Resolved {} tracks and {} essences",
        iface.audio().track_count(),
        iface.audio().essence_count()
    );
    Ok(iface)
}

fn export(input: PathBuf, output: PathBuf, options: ResolveOptions) -> Result<()> {
    let iface = load(input, options)?;

    let comments: Vec<_> = iface.comments().collect();
    let document = serde_json::json!({
        "composition": iface.composition_name(),
        "comments": comments,
        "audio": iface.audio(),
    });

    let file = File::create(&output).context("Failed to create output file")?;
    serde_json::to_writer_pretty(BufWriter::new(file), &document)
        .context("Failed to write timeline")?;

    println!(
        "Exported {} tracks and {} essences to {}",
        iface.audio().track_count(),
        iface.audio().essence_count(),
        output.display()
    );
    Ok(())
}

fn print_info(iface: &AafIface, all: bool) {
    let audio = iface.audio();

    println!("\n=== Composition ===");
    println!("Name: {}", iface.composition_name().unwrap_or("(unnamed)"));
    if let Some(tc) = audio.tc {
        println!(
            "Start timecode: {} @ {} fps{}",
            tc.start,
            tc.fps,
            if tc.drop { " drop-frame" } else { "" }
        );
    }
    for comment in iface.comments() {
        println!(
            "  {}: {}",
            comment.name.as_deref().unwrap_or(""),
            comment.text.as_deref().unwrap_or("")
        );
    }
    println!("Tracks: {}", audio.track_count());
    println!("Essences: {}", audio.essence_count());

    println!("\n=== Tracks ===");
    for track in audio.tracks() {
        print_track(track, all);
    }

    println!("\n=== Essences ===");
    for essence in audio.essences() {
        println!(
            "  [{}] {} {:?}, {} Hz, {} bit, {} ch, {} clips{}",
            essence.id.0,
            essence.unique_file_name.as_deref().unwrap_or("(unnamed)"),
            essence.essence_type,
            essence.format.samples_per_sec,
            essence.format.bits_per_sample,
            essence.format.channels,
            essence.sub_clip_count,
            if essence.is_embedded { ", embedded" } else { "" }
        );
        if let Some(file) = &essence.original_file {
            println!("      {}", file);
        }
    }
}

fn print_track(track: &AudioTrack, all: bool) {
    let rate = track
        .edit_rate
        .map(|r| r.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!(
        "  Track {} \"{}\" @ {} edit units/s, {} items",
        track.number,
        track.name.as_deref().unwrap_or(""),
        rate,
        track.len()
    );

    let limit = if all { usize::MAX } else { 10 };
    for item in track.items().take(limit) {
        match item.kind() {
            ItemKind::Clip => {
                if let Some(clip) = item.as_clip() {
                    println!(
                        "    [{}] Clip {} to {} (offset {}){}{}",
                        item.index(),
                        clip.pos,
                        clip.end(),
                        clip.essence_offset,
                        if item.fade_in().is_some() { " fade-in" } else { "" },
                        if item.fade_out().is_some() { " fade-out" } else { "" }
                    );
                }
            }
            ItemKind::Transition => {
                if let Some(trans) = item.as_transition() {
                    println!(
                        "    [{}] {:?} len {} cut {} ({:?})",
                        item.index(),
                        trans.kind,
                        trans.len,
                        trans.cut_pt,
                        trans.interpolation
                    );
                }
            }
        }
    }
    if track.len() > limit {
        println!("    ... and {} more items", track.len() - limit);
    }
}
