//! Bitmap buffer for raster laser lines.

use heapless::Vec;

use crate::error::ProtocolError;

/// Default bitmap capacity in 32-bit words (2048 pixels at 1 bpp).
pub const DEFAULT_BITMAP_WORDS: usize = 64;

/// Packed pixel row modulating the laser along one line.
///
/// Pixels are stored most significant bit first within each word. Only the
/// first `width` bits are meaningful; reading past them yields laser-off.
#[derive(Debug, Clone)]
pub struct BitmapBuffer<const WORDS: usize = DEFAULT_BITMAP_WORDS> {
    words: Vec<u32, WORDS>,
    bpp: u8,
    width: u32,
    size_words: u32,
}

impl<const WORDS: usize> Default for BitmapBuffer<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const WORDS: usize> BitmapBuffer<WORDS> {
    /// Empty buffer with zero width.
    pub const fn new() -> Self {
        Self {
            words: Vec::new(),
            bpp: 1,
            width: 0,
            size_words: 0,
        }
    }

    /// Start a new upload from the header, discarding previous contents.
    ///
    /// Returns the number of data words the upload expects.
    pub fn begin(&mut self, bpp: i32, width: i32) -> Result<u32, ProtocolError> {
        if !(1..=32).contains(&bpp) {
            return Err(ProtocolError::InvalidBitsPerPixel(bpp));
        }
        let width = width.max(0) as u32;
        let bits = u64::from(width) * bpp as u64;
        let size_words = (bits + 31) / 32;
        if size_words > WORDS as u64 {
            return Err(ProtocolError::BitmapTooLarge {
                words: size_words.min(u64::from(u32::MAX)) as u32,
                capacity: WORDS as u32,
            });
        }

        self.words.clear();
        self.bpp = bpp as u8;
        self.width = width;
        self.size_words = size_words as u32;
        Ok(self.size_words)
    }

    /// Append one data word. Returns `true` once the upload is complete.
    pub fn push_word(&mut self, word: u32) -> bool {
        if !self.is_complete() {
            // Capacity was checked against size_words in begin()
            let _ = self.words.push(word);
        }
        self.is_complete()
    }

    /// All words announced by the header have arrived.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.words.len() as u32 >= self.size_words
    }

    /// Copy another buffer's header and data into this one.
    pub fn copy_from<const OTHER: usize>(&mut self, other: &BitmapBuffer<OTHER>) {
        self.words.clear();
        for &word in other.words.iter().take(WORDS) {
            let _ = self.words.push(word);
        }
        self.bpp = other.bpp;
        self.width = other.width;
        self.size_words = self.words.len() as u32;
    }

    /// Pixel at `index`, `false` beyond the declared width or received data.
    #[inline]
    pub fn bit(&self, index: u32) -> bool {
        if index >= self.width {
            return false;
        }
        match self.words.get((index / 32) as usize) {
            Some(word) => word & (0x8000_0000 >> (index % 32)) != 0,
            None => false,
        }
    }

    /// Declared width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Declared bits per pixel.
    #[inline]
    pub fn bpp(&self) -> u8 {
        self.bpp
    }

    /// Data words announced by the header.
    #[inline]
    pub fn size_words(&self) -> u32 {
        self.size_words
    }

    /// Received data words.
    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}
