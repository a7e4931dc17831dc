mod bootrom;
mod config;
mod controller;
mod debug;
mod emulator;
mod export;
mod frame;
#[cfg(feature = "sameboy")]
mod sameboy;
mod utils;

use std::io;

use crate::config::{Args, Config};
use crate::controller::{RunController, RunSummary};
use crate::emulator::Core;
use crate::export::{Exporter, Sink};

use anyhow::Result;
use clap::Parser;
use log::info;

#[cfg(feature = "sameboy")]
fn open_core() -> Result<Box<dyn Core>> {
    Ok(Box::new(sameboy::SameBoy::new()?))
}

#[cfg(not(feature = "sameboy"))]
fn open_core() -> Result<Box<dyn Core>> {
    anyhow::bail!("No emulation core compiled in; rebuild with `--features sameboy`")
}

/// clap exits with 2 on usage errors; this harness reports them as 1.
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

/// Loads the ROM before anything is written, so a bad ROM leaves no output behind.
fn run<C: Core>(args: &Args, config: &Config, core: C) -> Result<RunSummary> {
    let mut controller = RunController::new(core, config.plan(args));
    controller.load(&args.rom)?;

    let mut exporter = match &args.output_dir {
        Some(dir) => Exporter::directory(dir.clone(), config.formats(args)),
        None => Exporter::stream(Box::new(io::stdout().lock())),
    };
    let summary = controller.run(&mut exporter)?;

    match exporter.sink() {
        Sink::Directory(dir) => info!(
            "Generated {} frames in {} ({} exported)",
            summary.frames_run,
            dir.display(),
            summary.frames_exported
        ),
        Sink::Stream(_) => info!(
            "Generated {} frames ({} streamed)",
            summary.frames_run, summary.frames_exported
        ),
    }
    Ok(summary)
}

fn main() -> Result<()> {
    let args = Args::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(usage_exit_code(&e));
    });
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::new(&args.config)?;
    run(&args, &config, open_core()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::fake::FakeCore;
    use crate::export::tests::temp_dir;
    use std::fs;

    fn parse(argv: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("gb-headless").chain(argv.iter().copied()))
    }

    #[test]
    fn usage_errors_exit_with_one() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
        let err = parse(&["game.gb", "ten"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn help_and_version_exit_with_zero() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);
        let err = parse(&["--version"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);
    }

    #[test]
    fn missing_rom_leaves_no_output_dir() {
        let dir = temp_dir("main_missing");
        let rom = dir.join("nope.gb");
        let out = dir.join("out");
        let args = parse(&[rom.to_str().unwrap(), "3", out.to_str().unwrap()]).unwrap();

        let err = run(&args, &Config::default(), FakeCore::new()).unwrap_err();
        assert!(format!("{err}").starts_with("Failed to load ROM: "));
        assert!(!out.exists());
    }

    #[test]
    fn run_writes_frames_into_output_dir() {
        let dir = temp_dir("main_run");
        fs::create_dir_all(&dir).unwrap();
        let rom = dir.join("test.gb");
        fs::write(&rom, vec![0u8; 0x8000]).unwrap();
        let out = dir.join("nested").join("out");
        let args = parse(&[rom.to_str().unwrap(), "2", out.to_str().unwrap()]).unwrap();

        let summary = run(&args, &Config::default(), FakeCore::new()).unwrap();
        assert_eq!(summary.frames_run, 2);
        assert_eq!(summary.frames_exported, 2);
        for name in ["frame_0001.rgba", "frame_0002.rgba", "frame_0001.ppm", "frame_0002.ppm"] {
            assert!(out.join(name).is_file(), "{name}");
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
