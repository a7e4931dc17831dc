pub const WIDTH: usize = 160;
pub const HEIGHT: usize = 144;
pub const PIXELS: usize = WIDTH * HEIGHT;

/// Signature of the color encoder handed to the core.
pub type RgbEncoder = fn(u8, u8, u8) -> u32;

/// Packs a color as `RRGGBBAA` with alpha fixed at `0xff`.
pub fn encode_rgb(r: u8, g: u8, b: u8) -> u32 {
    u32::from_be_bytes([r, g, b, 0xff])
}

/// Splits a packed pixel back into `[r, g, b, a]`.
pub fn channels(pixel: u32) -> [u8; 4] {
    pixel.to_be_bytes()
}

/// Row-major 160x144 buffer of encoded pixels.
pub struct FrameBuffer {
    pixels: Box<[u32]>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; PIXELS].into_boxed_slice(),
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[cfg(any(test, feature = "sameboy"))]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.pixels.chunks_exact(WIDTH)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
