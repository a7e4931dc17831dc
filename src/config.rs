use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::controller::{FrameSelection, RunPlan, StepMode};
use crate::emulator::Model;
use crate::export::Format;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde::Deserialize;

/// Cycles in one DMG frame at single speed.
pub const CYCLES_PER_FRAME: u32 = 70224;

/// Frame budget for cycle stepping, in the unit the core's `step` reports.
/// SameBoy counts 8 MiHz ticks, two per DMG cycle.
#[cfg(feature = "sameboy")]
pub const DEFAULT_CYCLES_PER_FRAME: u32 = 2 * CYCLES_PER_FRAME;
#[cfg(not(feature = "sameboy"))]
pub const DEFAULT_CYCLES_PER_FRAME: u32 = CYCLES_PER_FRAME;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stepping {
    /// Run the core until it signals vblank
    #[default]
    Frame,
    /// Step the core for a fixed number of cycles per frame
    Cycles,
}

#[derive(Parser, Debug)]
#[command(version, about = "Render Game Boy frames headlessly and dump the pixels")]
pub struct Args {
    /// Cartridge ROM to load
    pub rom: PathBuf,

    /// Number of frames to emulate
    pub frames: u32,

    /// Directory for frame files. Without it, RGB555 frames are written to stdout
    pub output_dir: Option<PathBuf>,

    /// Dump hardware registers and VRAM to stderr after the last frame
    #[arg(long)]
    pub debug: bool,

    /// Which frames to export [default: all with a directory, final on stdout]
    #[arg(long, value_enum)]
    pub select: Option<FrameSelection>,

    /// File formats written per exported frame [default: rgba,ppm]
    #[arg(long, value_enum, value_delimiter = ',')]
    pub format: Vec<Format>,

    #[arg(long, value_enum)]
    pub model: Option<Model>,

    /// Start straight from the cartridge instead of the embedded boot ROM
    #[arg(long)]
    pub no_boot_rom: bool,

    #[arg(long, value_enum)]
    pub step: Option<Stepping>,

    /// Core cycles per frame in cycle stepping, counted in the unit the core
    /// reports (SameBoy: 8 MiHz ticks) [default: one DMG frame]
    #[arg(long)]
    pub cycles_per_frame: Option<u32>,

    /// Stop after this many core cycles in cycle stepping
    #[arg(long)]
    pub cycle_ceiling: Option<u64>,

    #[arg(long, default_value = "gb-headless.toml")]
    pub config: PathBuf,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: Model,
    pub boot_rom: bool,
    pub step: Stepping,
    pub cycles_per_frame: u32,
    pub cycle_ceiling: Option<u64>,
    pub select: Option<FrameSelection>,
    pub formats: Option<Vec<Format>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Model::default(),
            boot_rom: true,
            step: Stepping::default(),
            cycles_per_frame: DEFAULT_CYCLES_PER_FRAME,
            cycle_ceiling: None,
            select: None,
            formats: None,
        }
    }
}

impl Config {
    pub fn new(path: &Path) -> Result<Self> {
        let config = match File::open(path) {
            Ok(mut file) => {
                let mut toml = String::new();
                file.read_to_string(&mut toml)?;
                toml::from_str(&toml).with_context(|| format!("{}", path.display()))?
            }
            Err(e) => {
                info!("{}: {e}", path.display());
                info!("Using default config.");
                Config::default()
            }
        };
        Ok(config)
    }

    /// Command-line flags win over the file.
    pub fn plan(&self, args: &Args) -> RunPlan {
        let default_selection = if args.output_dir.is_some() {
            FrameSelection::All
        } else {
            FrameSelection::Final
        };
        let step = match args.step.unwrap_or(self.step) {
            Stepping::Frame => StepMode::Frame,
            Stepping::Cycles => StepMode::Cycles {
                per_frame: args.cycles_per_frame.unwrap_or(self.cycles_per_frame),
            },
        };
        RunPlan {
            frames: args.frames,
            model: args.model.unwrap_or(self.model),
            boot_rom: self.boot_rom && !args.no_boot_rom,
            step,
            cycle_ceiling: args.cycle_ceiling.or(self.cycle_ceiling),
            selection: args.select.or(self.select).unwrap_or(default_selection),
            debug: args.debug,
        }
    }

    pub fn formats(&self, args: &Args) -> Vec<Format> {
        if !args.format.is_empty() {
            return args.format.clone();
        }
        self.formats
            .clone()
            .unwrap_or_else(|| vec![Format::Rgba, Format::Ppm])
    }
}
