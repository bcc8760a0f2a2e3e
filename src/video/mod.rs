//! Pixel format conversion
//!
//! The core renders 320×240 words of packed RGB555 with a transparency flag
//! in bit 15. Displays take RGB565:
//!
//! ```text
//! native:  T RRRRR GGGGG BBBBB
//! display:   RRRRR GGGGGG BBBBB
//! ```
//!
//! Transparent pixels become black. Green widens from 5 to 6 bits by a plain
//! left shift (the low bit is always 0).

use crate::{PipelineError, Result};

/// Display width in pixels
pub const DISPLAY_WIDTH: usize = 320;

/// Display height in pixels
pub const DISPLAY_HEIGHT: usize = 240;

/// Pixels per frame
pub const FRAME_PIXELS: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;

/// Native transparency flag
pub const TRANSPARENT_BIT: u16 = 0x8000;

/// Display value emitted for transparent pixels
pub const TRANSPARENT_BLACK: u16 = 0x0000;

/// Convert one native RGB555 word to display RGB565
#[inline]
pub const fn convert_pixel(native: u16) -> u16 {
    if native & TRANSPARENT_BIT != 0 {
        return TRANSPARENT_BLACK;
    }
    let r = (native >> 10) & 0x1F;
    let g = (native >> 5) & 0x1F;
    let b = native & 0x1F;
    (r << 11) | ((g << 1) << 5) | b
}

/// Convert a native frame into a caller-owned display buffer.
///
/// # Errors
///
/// Returns `Other` if the buffers differ in length.
pub fn convert_frame(native: &[u16], display: &mut [u16]) -> Result<()> {
    if native.len() != display.len() {
        return Err(PipelineError::Other(format!(
            "Frame size mismatch: {} native pixels, {} display pixels",
            native.len(),
            display.len()
        )));
    }

    for (dst, &src) in display.iter_mut().zip(native) {
        *dst = convert_pixel(src);
    }
    Ok(())
}

/// Convert a native frame into a newly allocated display buffer
pub fn convert(native: &[u16]) -> Vec<u16> {
    native.iter().map(|&px| convert_pixel(px)).collect()
}

/// Serialize display words as little-endian bytes for byte-oriented surfaces
pub fn write_le_bytes(display: &[u16], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(display.len() * 2);
    for px in display {
        out.extend_from_slice(&px.to_le_bytes());
    }
}

/// Display surface receiving converted frames
pub trait VideoSink {
    /// Present one RGB565 frame of `DISPLAY_WIDTH × DISPLAY_HEIGHT` pixels
    fn present(&mut self, frame: &[u16]);
}

/// Display that ignores frames (headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl VideoSink for NullDisplay {
    fn present(&mut self, _frame: &[u16]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_conversions() {
        assert_eq!(convert_pixel(0x0000), 0x0000);
        // Pure red
        assert_eq!(convert_pixel(0b0_11111_00000_00000), 0b11111_000000_00000);
        // Pure green: 5-bit 31 becomes 6-bit 62, not 63
        assert_eq!(convert_pixel(0b0_00000_11111_00000), 0b00000_111110_00000);
        // Pure blue
        assert_eq!(convert_pixel(0b0_00000_00000_11111), 0b00000_000000_11111);
        // White
        assert_eq!(convert_pixel(0x7FFF), 0xFFDF);
    }

    #[test]
    fn test_transparent_is_black_regardless_of_colour() {
        for low in [0x0000u16, 0x7FFF, 0x1234, 0x7C00, 0x03E0] {
            assert_eq!(convert_pixel(TRANSPARENT_BIT | low), TRANSPARENT_BLACK);
        }
    }

    #[test]
    fn test_field_isolation() {
        for v in 0..32u16 {
            assert_eq!(convert_pixel(v << 10), v << 11);
            assert_eq!(convert_pixel(v << 5), (v << 1) << 5);
            assert_eq!(convert_pixel(v), v);
        }
    }

    #[test]
    fn test_convert_frame_in_place_buffer() {
        let native = vec![0x7C00u16; FRAME_PIXELS];
        let mut display = vec![0u16; FRAME_PIXELS];
        convert_frame(&native, &mut display).unwrap();
        assert!(display.iter().all(|&px| px == 0xF800));
        assert_eq!(convert(&native), display);
    }

    #[test]
    fn test_convert_frame_size_mismatch() {
        let mut display = vec![0u16; 10];
        assert!(convert_frame(&[0u16; 11], &mut display).is_err());
    }

    #[test]
    fn test_le_bytes() {
        let mut bytes = Vec::new();
        write_le_bytes(&[0xF800, 0x001F], &mut bytes);
        assert_eq!(bytes, vec![0x00, 0xF8, 0x1F, 0x00]);
    }
}
