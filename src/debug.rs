use std::fmt::Write;
use std::ops::Range;

use crate::emulator::Core;
use crate::utils::BitExtract;

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;

#[derive(Copy, Clone, Debug, Primitive)]
pub enum Register {
    IF = 0xff0f,
    LCDC = 0xff40,
    STAT = 0xff41,
    SCY = 0xff42,
    SCX = 0xff43,
    LY = 0xff44,
    LYC = 0xff45,
    BGP = 0xff47,
    OBP0 = 0xff48,
    OBP1 = 0xff49,
    WY = 0xff4a,
    WX = 0xff4b,
    IE = 0xffff,
}

const IO_PAGE: Range<u32> = 0xff00..0x10000;
const TILE_DATA: Range<u16> = 0x8000..0x8010;
const BG_MAP: Range<u16> = 0x9800..0x9820;

/// Renders registers and the first tile/map bytes. Only reads memory.
pub fn report(core: &mut dyn Core) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- registers (vblanks: {}) ---", core.vblanks());
    for addr in IO_PAGE {
        let addr = addr as u16;
        let Some(reg) = Register::from_u16(addr) else {
            continue;
        };
        let val = core.read_memory(addr);
        let _ = write!(out, "{:<4} ${addr:04x} = {val:02x}", format!("{reg:?}"));
        match reg {
            Register::LCDC => {
                let _ = write!(
                    out,
                    "  lcd={} win={} obj={} bg={}",
                    on_off(val.bit(7)),
                    on_off(val.bit(5)),
                    on_off(val.bit(1)),
                    on_off(val.bit(0)),
                );
            }
            Register::STAT => {
                let _ = write!(out, "  mode={} lyc={}", val & 0b11, val.bit(2) as u8);
            }
            _ => (),
        }
        out.push('\n');
    }
    dump(&mut out, core, "tile data", TILE_DATA);
    dump(&mut out, core, "bg map", BG_MAP);
    out
}

fn dump(out: &mut String, core: &mut dyn Core, label: &str, range: Range<u16>) {
    let _ = writeln!(out, "--- {label} ${:04x}..${:04x} ---", range.start, range.end);
    let bytes: Vec<u8> = range.clone().map(|addr| core.read_memory(addr)).collect();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "${:04x}: {hex}", range.start as usize + 16 * row);
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::fake::FakeCore;

    #[test]
    fn register_lookup() {
        assert!(matches!(Register::from_u16(0xff40), Some(Register::LCDC)));
        assert!(matches!(Register::from_u16(0xffff), Some(Register::IE)));
        assert!(Register::from_u16(0xff46).is_none());
    }

    #[test]
    fn report_lists_registers_and_windows() {
        let mut core = FakeCore::new();
        core.memory.insert(0xff40, 0x91);
        core.memory.insert(0xff41, 0x85);
        core.memory.insert(0x8000, 0x3c);

        let text = report(&mut core);
        let lines: Vec<&str> = text.lines().collect();

        assert!(text.contains("LCDC $ff40 = 91  lcd=on win=off obj=off bg=on"));
        assert!(text.contains("STAT $ff41 = 85  mode=1 lyc=1"));
        assert!(text.contains("IE   $ffff = 00"));
        assert!(!text.contains("$ff46"));
        assert!(lines.contains(&"$8000: 3c 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00"));
        assert!(lines.contains(&"$9810: 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00"));
        // 1 header + 13 registers + (1 + 1) tile data + (1 + 2) bg map
        assert_eq!(lines.len(), 19);
    }
}
