//! Binding to the SameBoy emulation library over its C ABI.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::path::Path;
use std::ptr;

use crate::emulator::{Core, Model};
use crate::frame::{encode_rgb, FrameBuffer, RgbEncoder};

use anyhow::{bail, Context, Result};
use log::{debug, info};

#[repr(C)]
struct GbGameboy {
    _private: [u8; 0],
}

const VBLANK_TYPE_NORMAL_FRAME: c_uint = 0;

type VblankCallback = extern "C" fn(*mut GbGameboy, c_uint);
type RgbEncodeCallback = extern "C" fn(*mut GbGameboy, u8, u8, u8) -> u32;
type LogCallback = extern "C" fn(*mut GbGameboy, *const c_char, c_uint);

#[link(name = "sameboy")]
extern "C" {
    fn GB_alloc() -> *mut GbGameboy;
    fn GB_dealloc(gb: *mut GbGameboy);
    fn GB_init(gb: *mut GbGameboy, model: c_uint) -> *mut GbGameboy;
    fn GB_free(gb: *mut GbGameboy);
    fn GB_set_user_data(gb: *mut GbGameboy, data: *mut c_void);
    fn GB_get_user_data(gb: *mut GbGameboy) -> *mut c_void;
    fn GB_set_vblank_callback(gb: *mut GbGameboy, callback: VblankCallback);
    fn GB_set_rgb_encode_callback(gb: *mut GbGameboy, callback: RgbEncodeCallback);
    fn GB_set_log_callback(gb: *mut GbGameboy, callback: LogCallback);
    fn GB_set_pixels_output(gb: *mut GbGameboy, output: *mut u32);
    fn GB_load_boot_rom_from_buffer(gb: *mut GbGameboy, buffer: *const u8, size: usize);
    fn GB_load_rom(gb: *mut GbGameboy, path: *const c_char) -> c_int;
    fn GB_run(gb: *mut GbGameboy) -> c_uint;
    fn GB_run_frame(gb: *mut GbGameboy) -> u64;
    fn GB_read_memory(gb: *mut GbGameboy, addr: u16) -> u8;
}

/// State the C callbacks reach through the core's user data pointer.
struct Callbacks {
    encoder: RgbEncoder,
    vblanks: u64,
}

/// Owns the heap `Callbacks` handed to the core. Once leaked into a raw
/// pointer it is only ever touched through that pointer, so the copy the
/// core holds stays valid across every later write.
struct UserData(*mut Callbacks);

impl UserData {
    fn new() -> Self {
        Self(Box::into_raw(Box::new(Callbacks {
            encoder: encode_rgb,
            vblanks: 0,
        })))
    }

    fn as_ptr(&self) -> *mut c_void {
        self.0.cast()
    }

    fn set_encoder(&mut self, encoder: RgbEncoder) {
        // Safety: `self.0` came from `Box::into_raw` and is freed only in `drop`.
        unsafe { (*self.0).encoder = encoder };
    }

    fn vblanks(&self) -> u64 {
        // Safety: as in `set_encoder`.
        unsafe { (*self.0).vblanks }
    }
}

impl Drop for UserData {
    fn drop(&mut self) {
        // Safety: reclaims the box leaked in `new`, exactly once.
        drop(unsafe { Box::from_raw(self.0) });
    }
}

/// # Safety
/// `data` must be null or the pointer of a live `UserData`.
unsafe fn user_callbacks<'a>(data: *mut c_void) -> Option<&'a mut Callbacks> {
    data.cast::<Callbacks>().as_mut()
}

fn callbacks<'a>(gb: *mut GbGameboy) -> Option<&'a mut Callbacks> {
    // Safety: user data is either null or the pointer of the `UserData` owned
    // by the `SameBoy` driving this call.
    unsafe { user_callbacks(GB_get_user_data(gb)) }
}

extern "C" fn on_vblank(gb: *mut GbGameboy, kind: c_uint) {
    if kind == VBLANK_TYPE_NORMAL_FRAME {
        if let Some(callbacks) = callbacks(gb) {
            callbacks.vblanks += 1;
        }
    }
}

extern "C" fn on_rgb_encode(gb: *mut GbGameboy, r: u8, g: u8, b: u8) -> u32 {
    match callbacks(gb) {
        Some(callbacks) => (callbacks.encoder)(r, g, b),
        None => encode_rgb(r, g, b),
    }
}

extern "C" fn on_log(_gb: *mut GbGameboy, line: *const c_char, _attributes: c_uint) {
    if line.is_null() {
        return;
    }
    // Safety: SameBoy hands over a NUL-terminated string valid for this call.
    let line = unsafe { CStr::from_ptr(line) }.to_string_lossy();
    let line = line.trim_end();
    if !line.is_empty() {
        info!(target: "sameboy", "{line}");
    }
}

pub struct SameBoy {
    gb: *mut GbGameboy,
    user_data: UserData,
    initialized: bool,
}

impl SameBoy {
    pub fn new() -> Result<Self> {
        // Safety: plain allocation, checked for null below.
        let gb = unsafe { GB_alloc() };
        if gb.is_null() {
            bail!("Failed to allocate SameBoy instance");
        }
        Ok(Self {
            gb,
            user_data: UserData::new(),
            initialized: false,
        })
    }

    /// Points the core's pixel output at `frame` only for the duration of `f`.
    fn with_output<T>(&mut self, frame: &mut FrameBuffer, f: impl FnOnce(*mut GbGameboy) -> T) -> T {
        // Safety: `frame` outlives the call, and the pointer is cleared before
        // the borrow ends, so the core never holds a dangling output buffer.
        unsafe {
            GB_set_pixels_output(self.gb, frame.pixels_mut().as_mut_ptr());
            let result = f(self.gb);
            GB_set_pixels_output(self.gb, ptr::null_mut());
            result
        }
    }
}

impl Core for SameBoy {
    fn init(&mut self, model: Model) -> Result<()> {
        if self.initialized {
            bail!("SameBoy instance already initialized");
        }
        // Safety: `gb` came from `GB_alloc`, and the user data outlives the
        // core because `Drop` frees the core before its fields.
        unsafe {
            if GB_init(self.gb, model as c_uint).is_null() {
                bail!("SameBoy rejected model {model:?}");
            }
            self.initialized = true;
            GB_set_user_data(self.gb, self.user_data.as_ptr());
            GB_set_vblank_callback(self.gb, on_vblank);
            GB_set_rgb_encode_callback(self.gb, on_rgb_encode);
            GB_set_log_callback(self.gb, on_log);
        }
        debug!("SameBoy initialized as {model:?}");
        Ok(())
    }

    fn set_rgb_encoder(&mut self, encoder: RgbEncoder) {
        self.user_data.set_encoder(encoder);
        if self.initialized {
            // Safety: re-registering makes the core rebuild its palettes with the new encoder.
            unsafe { GB_set_rgb_encode_callback(self.gb, on_rgb_encode) };
        }
    }

    fn load_boot_rom(&mut self, rom: &[u8]) {
        // Safety: the core copies the buffer before returning.
        unsafe { GB_load_boot_rom_from_buffer(self.gb, rom.as_ptr(), rom.len()) };
    }

    fn load_rom(&mut self, path: &Path) -> Result<()> {
        let c_path = CString::new(path.as_os_str().as_encoded_bytes())
            .with_context(|| format!("ROM path contains a NUL byte: {}", path.display()))?;
        // Safety: `c_path` is a valid NUL-terminated string for the whole call.
        if unsafe { GB_load_rom(self.gb, c_path.as_ptr()) } != 0 {
            bail!("SameBoy could not load {}", path.display());
        }
        Ok(())
    }

    fn run_frame(&mut self, frame: &mut FrameBuffer) {
        // Safety: see `with_output`.
        self.with_output(frame, |gb| unsafe { GB_run_frame(gb) });
    }

    fn step(&mut self, frame: &mut FrameBuffer) -> u32 {
        // Safety: see `with_output`.
        self.with_output(frame, |gb| unsafe { GB_run(gb) })
    }

    fn read_memory(&mut self, addr: u16) -> u8 {
        // Safety: reads go through the core's own memory map.
        unsafe { GB_read_memory(self.gb, addr) }
    }

    fn vblanks(&self) -> u64 {
        self.user_data.vblanks()
    }
}

impl Drop for SameBoy {
    fn drop(&mut self) {
        // Safety: `gb` is only freed here, once.
        unsafe {
            if self.initialized {
                GB_free(self.gb);
            }
            GB_dealloc(self.gb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_channels(r: u8, g: u8, b: u8) -> u32 {
        encode_rgb(b, g, r)
    }

    #[test]
    fn user_data_pointer_survives_updates() {
        let mut user_data = UserData::new();
        let data = user_data.as_ptr();

        user_data.set_encoder(swap_channels);
        let callbacks = unsafe { user_callbacks(data) }.unwrap();
        assert_eq!((callbacks.encoder)(1, 2, 3), 0x030201ff);
        callbacks.vblanks += 2;
        assert_eq!(user_data.vblanks(), 2);

        user_data.set_encoder(encode_rgb);
        let callbacks = unsafe { user_callbacks(data) }.unwrap();
        assert_eq!((callbacks.encoder)(1, 2, 3), 0x010203ff);
    }

    #[test]
    fn null_user_data_has_no_callbacks() {
        assert!(unsafe { user_callbacks(ptr::null_mut()) }.is_none());
    }
}
