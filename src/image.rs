//! Deterministic swatch image generation
//!
//! Produces a 128x128 indexed PNG with a two-entry palette: the colour
//! itself and a contrast ink. The canvas is filled with the colour, so the
//! output is a pure function of the [`ColorCode`] and content addressing
//! gives the same CID for every render.
//!
//! The encoder writes the PNG chunks directly. Compression level and
//! filter type are fixed; nothing here reads the clock, the environment or
//! a random source.

use crate::color::ColorCode;
use crate::error::{SwatchError, SwatchResult};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Canvas width and height in pixels
pub const SWATCH_SIZE: u32 = 128;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// One bit per pixel is enough for a two-entry palette
const BIT_DEPTH: u8 = 1;
const COLOR_TYPE_INDEXED: u8 = 3;
const FILTER_NONE: u8 = 0;
const ZLIB_LEVEL: u32 = 9;

/// Eight pixels of palette index 0 (the background) packed into one byte
const BACKGROUND_BYTE: u8 = 0x00;

/// Source of swatch image bytes
///
/// Implementations must be pure functions of the colour: the same code
/// always yields the same bytes, and so the same CID.
pub trait ProduceImage: Send + Sync {
    fn produce(&self, color: &ColorCode) -> SwatchResult<Vec<u8>>;
}

/// Renders swatch images
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageGenerator;

impl ImageGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the swatch for `color` as PNG bytes
    pub fn produce(&self, color: &ColorCode) -> SwatchResult<Vec<u8>> {
        let (r, g, b) = color.rgb();
        let (ir, ig, ib) = contrast_ink(r, g, b);

        let mut header = Vec::with_capacity(13);
        header.extend_from_slice(&SWATCH_SIZE.to_be_bytes());
        header.extend_from_slice(&SWATCH_SIZE.to_be_bytes());
        header.extend_from_slice(&[BIT_DEPTH, COLOR_TYPE_INDEXED, 0, 0, 0]);

        let palette = [r, g, b, ir, ig, ib];
        let pixels = compress_scanlines(&scanlines())?;

        let mut png = Vec::with_capacity(PNG_SIGNATURE.len() + pixels.len() + 64);
        png.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut png, b"IHDR", &header);
        write_chunk(&mut png, b"PLTE", &palette);
        write_chunk(&mut png, b"IDAT", &pixels);
        write_chunk(&mut png, b"IEND", &[]);

        Ok(png)
    }
}

impl ProduceImage for ImageGenerator {
    fn produce(&self, color: &ColorCode) -> SwatchResult<Vec<u8>> {
        ImageGenerator::produce(self, color)
    }
}

/// Black on light backgrounds, white on dark ones (BT.601 luma)
fn contrast_ink(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
    if luma >= 128 {
        (0x00, 0x00, 0x00)
    } else {
        (0xFF, 0xFF, 0xFF)
    }
}

/// Raw filtered image data: each row is a filter byte then packed indices
fn scanlines() -> Vec<u8> {
    let row_bytes = (SWATCH_SIZE as usize * BIT_DEPTH as usize).div_ceil(8);
    let mut raw = Vec::with_capacity((row_bytes + 1) * SWATCH_SIZE as usize);
    for _ in 0..SWATCH_SIZE {
        raw.push(FILTER_NONE);
        raw.extend(std::iter::repeat_n(BACKGROUND_BYTE, row_bytes));
    }
    raw
}

fn compress_scanlines(raw: &[u8]) -> SwatchResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(ZLIB_LEVEL));
    encoder
        .write_all(raw)
        .map_err(|e| SwatchError::GenerationFailure(format!("compressing pixels: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| SwatchError::GenerationFailure(format!("finishing zlib stream: {}", e)))
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    let mut crc = crc32fast::Hasher::new();
    crc.update(kind);
    crc.update(data);

    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
}
