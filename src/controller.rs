use std::path::Path;

use crate::bootrom::BOOT_ROM;
use crate::emulator::{Core, Model};
use crate::debug;
use crate::export::Exporter;
use crate::frame::{encode_rgb, FrameBuffer};

use anyhow::{bail, Result};
use clap::ValueEnum;
use log::{info, warn};
use serde::Deserialize;

pub const EDGE_HEAD: u32 = 2;
pub const EDGE_TAIL: u32 = 10;

/// Which of the emulated frames get handed to the exporter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSelection {
    /// Every frame
    All,
    /// Only the last frame
    Final,
    /// The first two and the last ten frames
    Edges,
}

impl FrameSelection {
    /// `index` is 1-based.
    pub fn selects(self, index: u32, total: u32) -> bool {
        match self {
            FrameSelection::All => true,
            FrameSelection::Final => index == total,
            FrameSelection::Edges => {
                index <= EDGE_HEAD || index > total.saturating_sub(EDGE_TAIL)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepMode {
    /// Let the core run until it reports vblank.
    Frame,
    /// Step the core until `per_frame` of its cycles have elapsed.
    Cycles { per_frame: u32 },
}

#[derive(Clone, Debug)]
pub struct RunPlan {
    pub frames: u32,
    pub model: Model,
    pub boot_rom: bool,
    pub step: StepMode,
    /// Only honored in `StepMode::Cycles`.
    pub cycle_ceiling: Option<u64>,
    pub selection: FrameSelection,
    pub debug: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Loaded,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_run: u32,
    pub frames_exported: u32,
    pub ceiling_hit: bool,
}

pub struct RunController<C: Core> {
    core: C,
    plan: RunPlan,
    frame: FrameBuffer,
    state: RunState,
    cycles: u64,
}

impl<C: Core> RunController<C> {
    pub fn new(core: C, plan: RunPlan) -> Self {
        Self {
            core,
            plan,
            frame: FrameBuffer::new(),
            state: RunState::Uninitialized,
            cycles: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn load(&mut self, rom: &Path) -> Result<()> {
        if self.state != RunState::Uninitialized {
            bail!("Cannot load a ROM while {:?}", self.state);
        }
        let result = self.init_and_load(rom);
        self.state = if result.is_ok() {
            RunState::Loaded
        } else {
            RunState::Failed
        };
        result
    }

    fn init_and_load(&mut self, rom: &Path) -> Result<()> {
        self.core.init(self.plan.model)?;
        self.core.set_rgb_encoder(encode_rgb);
        if self.plan.boot_rom {
            self.core.load_boot_rom(&BOOT_ROM);
        }
        self.core
            .load_rom(rom)
            .map_err(|e| e.context(format!("Failed to load ROM: {}", rom.display())))
    }

    pub fn run(&mut self, exporter: &mut Exporter) -> Result<RunSummary> {
        if self.state != RunState::Loaded {
            bail!("Cannot run while {:?}", self.state);
        }
        self.state = RunState::Running;

        let total = self.plan.frames;
        info!("Running emulator for {total} frames...");
        let mut summary = RunSummary::default();
        for index in 1..=total {
            self.advance();
            summary.frames_run = index;

            // a ceiling hit makes this frame the last one the policy sees
            let cut_short = index < total && self.ceiling_reached();
            let last = if cut_short { index } else { total };

            if self.plan.selection.selects(index, last) {
                info!("Saving frame {index}...");
                if let Err(e) = exporter.export(&self.frame, index) {
                    self.state = RunState::Failed;
                    return Err(e);
                }
                summary.frames_exported += 1;
            }

            if cut_short {
                warn!("Maximum cycles reached after {index} of {total} frames");
                summary.ceiling_hit = true;
                break;
            }
        }

        if self.plan.debug {
            eprint!("{}", debug::report(&mut self.core));
        }
        self.state = RunState::Done;
        Ok(summary)
    }

    /// Runs one whole frame. The ceiling is only checked between frames, so
    /// the buffer never holds a half-drawn frame.
    fn advance(&mut self) {
        match self.plan.step {
            StepMode::Frame => self.core.run_frame(&mut self.frame),
            StepMode::Cycles { per_frame } => {
                let mut elapsed = 0;
                while elapsed < per_frame as u64 {
                    // a core reporting zero-cycle steps would never finish the frame
                    let cycles = (self.core.step(&mut self.frame) as u64).max(1);
                    elapsed += cycles;
                    self.cycles += cycles;
                }
            }
        }
    }

    fn ceiling_reached(&self) -> bool {
        match self.plan.step {
            StepMode::Frame => false,
            StepMode::Cycles { .. } => self
                .plan
                .cycle_ceiling
                .is_some_and(|ceiling| self.cycles >= ceiling),
        }
    }
}
