#![deny(clippy::all, clippy::pedantic)]
//! # Dynamics Runtime
//!
//! Headless driver for the dynamics crate. Builds a small character
//! hierarchy, attaches a structure from a recipe (a built-in ponytail unless
//! `--recipe` is given) and plays frames through the manager the way a host
//! engine would: physics ticks, a frame callback, then post-simulation.
//!
//! Logging goes through `tracing`; set `RUST_LOG` to adjust verbosity.

mod app;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use dynamics::{ComputeMethod, UpdateMethod};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dynamics_runtime", about = "Play a dynamics structure on a swaying character")]
struct Args {
    /// Recipe JSON to load instead of the built-in ponytail.
    #[arg(long)]
    recipe: Option<PathBuf>,

    /// Number of frames to play.
    #[arg(long, default_value_t = 300)]
    frames: u32,

    /// Frame time in seconds.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Collision backend; overrides the recipe.
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Update cadence; overrides the recipe.
    #[arg(long, value_enum)]
    update: Option<Update>,

    /// Seconds of prewarm before the first frame; overrides the recipe.
    #[arg(long)]
    prewarm: Option<f32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    SingleThread,
    ParallelJobs,
    GpuKernel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Update {
    FixedCadence,
    PerFrame,
    SpecifiedFps,
}

impl From<Backend> for ComputeMethod {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::SingleThread => Self::SingleThread,
            Backend::ParallelJobs => Self::ParallelJobs,
            Backend::GpuKernel => Self::GpuKernel,
        }
    }
}

impl From<Update> for UpdateMethod {
    fn from(update: Update) -> Self {
        match update {
            Update::FixedCadence => Self::FixedCadence,
            Update::PerFrame => Self::PerFrame,
            Update::SpecifiedFps => Self::SpecifiedFps,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let options = app::Options {
        recipe: args.recipe,
        frames: args.frames,
        dt: args.dt,
        compute_method: args.backend.map(Into::into),
        update_method: args.update.map(Into::into),
        prewarm: args.prewarm,
    };
    let summary = app::run(&options)?;
    tracing::info!(
        frames = summary.frames,
        steps = summary.steps,
        tip = ?summary.tip,
        "playback finished"
    );
    Ok(())
}
