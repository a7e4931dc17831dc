use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::frame::{channels, FrameBuffer, HEIGHT, WIDTH};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, error, warn};
use serde::Deserialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Raw RGBA8888, no header
    Rgba,
    /// Plain (P3) PPM text
    Ppm,
    /// Packed little-endian RGB555, no header
    Rgb555,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Rgba => "rgba",
            Format::Ppm => "ppm",
            Format::Rgb555 => "rgb555",
        }
    }
}

pub fn frame_file_name(format: Format, index: u32) -> String {
    format!("frame_{index:04}.{}", format.extension())
}

pub fn write_rgba<W: Write>(frame: &FrameBuffer, out: &mut W) -> io::Result<()> {
    for &pixel in frame.pixels() {
        out.write_all(&channels(pixel))?;
    }
    Ok(())
}

pub fn write_ppm<W: Write>(frame: &FrameBuffer, out: &mut W) -> io::Result<()> {
    writeln!(out, "P3")?;
    writeln!(out, "{WIDTH} {HEIGHT}")?;
    writeln!(out, "255")?;
    for row in frame.rows() {
        for &pixel in row {
            let [r, g, b, _] = channels(pixel);
            write!(out, "{r} {g} {b} ")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Scales an 8-bit channel down to 5 bits, truncating.
pub fn quantize5(channel: u8) -> u16 {
    channel as u16 * 31 / 255
}

/// `0rrrrrgggggbbbbb`, bit 15 always clear.
pub fn pack_rgb555(pixel: u32) -> u16 {
    let [r, g, b, _] = channels(pixel);
    (quantize5(r) << 10) | (quantize5(g) << 5) | quantize5(b)
}

pub fn write_rgb555<W: Write>(frame: &FrameBuffer, out: &mut W) -> io::Result<()> {
    for &pixel in frame.pixels() {
        out.write_all(&pack_rgb555(pixel).to_le_bytes())?;
    }
    out.flush()
}

fn write_format<W: Write>(format: Format, frame: &FrameBuffer, out: &mut W) -> io::Result<()> {
    match format {
        Format::Rgba => write_rgba(frame, out),
        Format::Ppm => write_ppm(frame, out),
        Format::Rgb555 => write_rgb555(frame, out),
    }
}

pub fn save_frame(dir: &Path, format: Format, frame: &FrameBuffer, index: u32) -> Result<PathBuf> {
    let path = dir.join(frame_file_name(format, index));
    let file = File::create(&path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    let mut out = BufWriter::new(file);
    write_format(format, frame, &mut out)
        .and_then(|_| out.flush())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub enum Sink {
    Directory(PathBuf),
    Stream(Box<dyn Write>),
}

pub struct Exporter {
    sink: Sink,
    formats: Vec<Format>,
}

impl Exporter {
    /// Writes one file per format per frame into `dir`, creating it if needed.
    pub fn directory(dir: PathBuf, formats: Vec<Format>) -> Self {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create {}: {e}", dir.display());
        }
        Self {
            sink: Sink::Directory(dir),
            formats,
        }
    }

    /// Streams packed RGB555 frames back to back into `out`.
    pub fn stream(out: Box<dyn Write>) -> Self {
        Self {
            sink: Sink::Stream(out),
            formats: vec![Format::Rgb555],
        }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// File failures are logged and skipped. A failing stream is returned as an error.
    pub fn export(&mut self, frame: &FrameBuffer, index: u32) -> Result<()> {
        match &mut self.sink {
            Sink::Directory(dir) => {
                for &format in &self.formats {
                    if let Err(e) = save_frame(dir, format, frame, index) {
                        error!("{e:#}");
                    }
                }
            }
            Sink::Stream(out) => {
                write_rgb555(frame, out)
                    .with_context(|| format!("Failed to stream frame {index}"))?;
                debug!("Streamed frame {index} ({} bytes)", WIDTH * HEIGHT * 2);
            }
        }
        Ok(())
    }
}
