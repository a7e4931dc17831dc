/// Size of the DMG boot ROM mapped at 0x0000.
pub const SIZE: usize = 0x100;

const PROGRAM: [u8; 25] = [
    0x31, 0xfe, 0xff, // ld sp, $fffe
    0x3e, 0x91, // ld a, $91
    0xe0, 0x40, // ldh [LCDC], a
    0x3e, 0xfc, // ld a, $fc
    0xe0, 0x47, // ldh [BGP], a
    0x01, 0xb0, 0x01, // ld bc, $01b0
    0xc5, // push bc
    0xf1, // pop af
    0x01, 0x13, 0x00, // ld bc, $0013
    0x11, 0xd8, 0x00, // ld de, $00d8
    0x21, 0x4d, 0x01, // ld hl, $014d
];

/// `ldh [$ff50], a` in the last two bytes, so pc falls through to 0x0100.
const UNMAP: [u8; 2] = [0xe0, 0x50];

/// Minimal boot program: post-boot register state, no logo check.
pub static BOOT_ROM: [u8; SIZE] = build();

const fn build() -> [u8; SIZE] {
    let mut rom = [0u8; SIZE];
    let mut i = 0;
    while i < PROGRAM.len() {
        rom[i] = PROGRAM[i];
        i += 1;
    }
    rom[SIZE - 2] = UNMAP[0];
    rom[SIZE - 1] = UNMAP[1];
    rom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_rom_shape() {
        assert_eq!(BOOT_ROM.len(), 0x100);
        assert_eq!(&BOOT_ROM[..3], &[0x31, 0xfe, 0xff]);
        assert_eq!(&BOOT_ROM[0xfe..], &[0xe0, 0x50]);
    }

    #[test]
    fn nop_slide_reaches_unmap() {
        assert!(BOOT_ROM[PROGRAM.len()..0xfe].iter().all(|&b| b == 0x00));
    }
}
