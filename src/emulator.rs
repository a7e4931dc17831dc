use std::path::Path;

use crate::frame::{FrameBuffer, RgbEncoder};

use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;

/// Hardware revision the core emulates. Discriminants are SameBoy's model ids.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum Model {
    #[default]
    DmgB = 0x002,
    Sgb = 0x004,
    Mgb = 0x100,
    CgbE = 0x205,
}

/// Everything the harness needs from an emulation library.
pub trait Core {
    fn init(&mut self, model: Model) -> Result<()>;
    fn set_rgb_encoder(&mut self, encoder: RgbEncoder);
    fn load_boot_rom(&mut self, rom: &[u8]);
    fn load_rom(&mut self, path: &Path) -> Result<()>;

    /// Runs until the next vblank, rendering into `frame`.
    fn run_frame(&mut self, frame: &mut FrameBuffer);

    /// Runs a single core step and returns the cycles it took, in the core's own units.
    fn step(&mut self, frame: &mut FrameBuffer) -> u32;

    fn read_memory(&mut self, addr: u16) -> u8;

    /// Number of regular vblanks observed since `init`.
    fn vblanks(&self) -> u64;
}

impl<C: Core + ?Sized> Core for Box<C> {
    fn init(&mut self, model: Model) -> Result<()> {
        (**self).init(model)
    }

    fn set_rgb_encoder(&mut self, encoder: RgbEncoder) {
        (**self).set_rgb_encoder(encoder)
    }

    fn load_boot_rom(&mut self, rom: &[u8]) {
        (**self).load_boot_rom(rom)
    }

    fn load_rom(&mut self, path: &Path) -> Result<()> {
        (**self).load_rom(path)
    }

    fn run_frame(&mut self, frame: &mut FrameBuffer) {
        (**self).run_frame(frame)
    }

    fn step(&mut self, frame: &mut FrameBuffer) -> u32 {
        (**self).step(frame)
    }

    fn read_memory(&mut self, addr: u16) -> u8 {
        (**self).read_memory(addr)
    }

    fn vblanks(&self) -> u64 {
        (**self).vblanks()
    }
}
