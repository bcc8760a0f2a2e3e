//! ROM image checks run before the core sees the data

use crate::{PipelineError, Result};

/// System ROM (BIOS) size: 1 Mi 16-bit words
pub const SYSTEM_ROM_SIZE: usize = 2 * 1024 * 1024;

/// Largest cartridge image: 4 Mi 16-bit words
pub const MAX_CART_ROM_SIZE: usize = 8 * 1024 * 1024;

/// Validate a cartridge and optional system ROM.
///
/// An empty BIOS slice counts as absent. Returns the BIOS to hand to the core.
pub fn validate_images<'a>(bios: Option<&'a [u8]>, rom: &[u8]) -> Result<Option<&'a [u8]>> {
    if rom.is_empty() {
        return Err(PipelineError::RomError("Cartridge ROM is required".into()));
    }
    if rom.len() > MAX_CART_ROM_SIZE {
        return Err(PipelineError::RomError(format!(
            "Cartridge ROM is {} bytes, maximum is {MAX_CART_ROM_SIZE}",
            rom.len()
        )));
    }

    match bios.filter(|bios| !bios.is_empty()) {
        Some(bios) if bios.len() != SYSTEM_ROM_SIZE => Err(PipelineError::RomError(format!(
            "System ROM is {} bytes, expected {SYSTEM_ROM_SIZE}",
            bios.len()
        ))),
        other => Ok(other),
    }
}
