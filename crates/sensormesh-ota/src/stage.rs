//! Firmware staging capability.
//!
//! The updater never touches the active image region: blocks are written to
//! a reserved staging area and the bootloader performs the atomic swap on
//! the next boot. This trait is that staging area; the node runtime injects
//! the hardware-backed implementation, tests use [`RamStage`].

extern crate alloc;
use alloc::vec::Vec;

use sensormesh_core::constants::FIRMWARE_BLOCK_SIZE;

/// Write/read access to the staged image region.
pub trait FirmwareStage {
    /// Store one 16-byte block at `index * FIRMWARE_BLOCK_SIZE`.
    fn write_block(&mut self, index: u16, data: &[u8; FIRMWARE_BLOCK_SIZE]);

    /// Read back one staged block.
    fn read_block(&self, index: u16) -> [u8; FIRMWARE_BLOCK_SIZE];
}

/// Compute the CRC over the first `blocks` staged blocks.
pub fn staged_crc<S: FirmwareStage + ?Sized>(stage: &S, blocks: u16) -> u16 {
    let mut crc = 0xFFFF;
    for index in 0..blocks {
        for byte in stage.read_block(index) {
            crc = crate::crc::crc16_update(crc, byte);
        }
    }
    crc
}

/// Heap-backed staging area for the host runtime and tests.
#[derive(Debug, Default)]
pub struct RamStage {
    image: Vec<u8>,
}

impl RamStage {
    pub fn new() -> Self {
        RamStage { image: Vec::new() }
    }

    /// The staged image bytes written so far.
    #[must_use]
    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

impl FirmwareStage for RamStage {
    fn write_block(&mut self, index: u16, data: &[u8; FIRMWARE_BLOCK_SIZE]) {
        let offset = index as usize * FIRMWARE_BLOCK_SIZE;
        if self.image.len() < offset + FIRMWARE_BLOCK_SIZE {
            self.image.resize(offset + FIRMWARE_BLOCK_SIZE, 0xFF);
        }
        self.image[offset..offset + FIRMWARE_BLOCK_SIZE].copy_from_slice(data);
    }

    fn read_block(&self, index: u16) -> [u8; FIRMWARE_BLOCK_SIZE] {
        let offset = index as usize * FIRMWARE_BLOCK_SIZE;
        let mut out = [0xFFu8; FIRMWARE_BLOCK_SIZE];
        if let Some(slice) = self.image.get(offset..offset + FIRMWARE_BLOCK_SIZE) {
            out.copy_from_slice(slice);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;

    #[test]
    fn test_write_read_roundtrip() {
        let mut stage = RamStage::new();
        stage.write_block(0, &[0x11; FIRMWARE_BLOCK_SIZE]);
        stage.write_block(2, &[0x33; FIRMWARE_BLOCK_SIZE]);

        assert_eq!(stage.read_block(0), [0x11; FIRMWARE_BLOCK_SIZE]);
        assert_eq!(stage.read_block(1), [0xFF; FIRMWARE_BLOCK_SIZE]);
        assert_eq!(stage.read_block(2), [0x33; FIRMWARE_BLOCK_SIZE]);
    }

    #[test]
    fn test_blocks_land_at_fixed_offsets() {
        let mut stage = RamStage::new();
        stage.write_block(1, &[0xAB; FIRMWARE_BLOCK_SIZE]);
        assert_eq!(stage.image().len(), 2 * FIRMWARE_BLOCK_SIZE);
        assert_eq!(stage.image()[FIRMWARE_BLOCK_SIZE], 0xAB);
    }

    #[test]
    fn test_staged_crc_matches_flat_buffer() {
        let mut stage = RamStage::new();
        let mut flat = Vec::new();
        for i in 0..4u16 {
            let block = [i as u8; FIRMWARE_BLOCK_SIZE];
            stage.write_block(i, &block);
            flat.extend_from_slice(&block);
        }
        assert_eq!(staged_crc(&stage, 4), crc16(&flat));
    }
}
