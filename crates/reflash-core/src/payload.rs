//! Firmware image and transfer block generation.
//!
//! The image is partitioned into contiguous blocks of at most
//! [`BLOCK_PAYLOAD_SIZE`] bytes, each carrying a rolling one-byte sequence
//! counter. The counter cycles `1, 2, .., 255, 0, 1, ..` — after 0xFF it
//! wraps to 0x00, not back to 0x01.

use std::path::Path;

/// Fixed TransferData block payload size.
pub const BLOCK_PAYLOAD_SIZE: usize = 240;

/// Immutable firmware image, loaded fully before orchestration begins.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    data: Vec<u8>,
}

impl FirmwareImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            data: std::fs::read(path)?,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate the image as sequence-numbered transfer blocks.
    pub fn blocks(&self, start_counter: u8) -> BlockChunker<'_> {
        BlockChunker::new(&self.data, start_counter)
    }

    /// Number of blocks the transfer will take.
    pub fn total_blocks(&self) -> usize {
        self.data.len().div_ceil(BLOCK_PAYLOAD_SIZE)
    }
}

/// One transfer block: sequence counter plus a borrowed slice of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBlock<'a> {
    pub counter: u8,
    pub data: &'a [u8],
}

/// Iterator yielding the image's transfer blocks in order, the last block
/// possibly shorter than the fixed size.
#[derive(Debug)]
pub struct BlockChunker<'a> {
    data: &'a [u8],
    offset: usize,
    counter: u8,
}

impl<'a> BlockChunker<'a> {
    pub fn new(data: &'a [u8], start_counter: u8) -> Self {
        Self {
            data,
            offset: 0,
            counter: start_counter,
        }
    }
}

impl<'a> Iterator for BlockChunker<'a> {
    type Item = TransferBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let remaining = self.data.len() - self.offset;
        let block_len = remaining.min(BLOCK_PAYLOAD_SIZE);
        let block = TransferBlock {
            counter: self.counter,
            data: &self.data[self.offset..self.offset + block_len],
        };

        self.offset += block_len;
        self.counter = self.counter.wrapping_add(1);
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_exact_and_residual() {
        let image = FirmwareImage::from_bytes((0..=255u8).cycle().take(1234).collect());
        assert_eq!(image.total_blocks(), 6);

        let blocks: Vec<_> = image.blocks(1).collect();
        assert_eq!(blocks.len(), 6);
        let lengths: Vec<usize> = blocks.iter().map(|b| b.data.len()).collect();
        assert_eq!(lengths, vec![240, 240, 240, 240, 240, 34]);
        let counters: Vec<u8> = blocks.iter().map(|b| b.counter).collect();
        assert_eq!(counters, vec![1, 2, 3, 4, 5, 6]);

        // No byte duplicated or omitted.
        let reassembled: Vec<u8> = blocks.iter().flat_map(|b| b.data.iter().copied()).collect();
        assert_eq!(reassembled, image.bytes());
    }

    #[test]
    fn test_aligned_image_has_full_final_block() {
        let image = FirmwareImage::from_bytes(vec![0xAB; 480]);
        let blocks: Vec<_> = image.blocks(1).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].data.len(), 240);
    }

    #[test]
    fn test_empty_image_yields_no_blocks() {
        let image = FirmwareImage::from_bytes(Vec::new());
        assert_eq!(image.total_blocks(), 0);
        assert!(image.blocks(1).next().is_none());
    }

    #[test]
    fn test_counter_wraps_to_zero() {
        // 257 blocks starting at 1: counters must run 1..=255, 0, 1.
        let image = FirmwareImage::from_bytes(vec![0; 257 * BLOCK_PAYLOAD_SIZE]);
        let counters: Vec<u8> = image.blocks(1).map(|b| b.counter).collect();
        assert_eq!(counters.len(), 257);
        assert_eq!(counters[0], 1);
        assert_eq!(counters[253], 254);
        assert_eq!(counters[254], 255);
        assert_eq!(counters[255], 0);
        assert_eq!(counters[256], 1);
    }
}
