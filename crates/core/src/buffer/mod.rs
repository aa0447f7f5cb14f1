use crate::{Result, VisFxError};

/// Packs 8-bit channels into a `0xAARRGGBB` pixel.
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Splits a `0xAARRGGBB` pixel into `[a, r, g, b]`.
#[inline]
pub fn unpack_argb(pixel: u32) -> [u8; 4] {
    pixel.to_be_bytes()
}

/// Width x height image of packed ARGB pixels stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl ImageBuffer {
    /// Creates an opaque black image.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0xFF00_0000)
    }

    pub fn filled(width: usize, height: usize, pixel: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(VisFxError::InvalidInput(
                "pixel count does not match image dimensions",
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u32) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Colour ramp with a grid overlay; handy as a synthetic input frame.
    pub fn test_pattern(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = if (x / 16 + y / 16) % 2 == 0 { 0xC0 } else { 0x40 };
            pack_argb(0xFF, r, g, b)
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, pixel: u32) {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.pixels[y * self.width + x] = pixel;
    }

    pub fn row(&self, y: usize) -> &[u32] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Copies the image into straight RGBA bytes, e.g. for encoding.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            let [a, r, g, b] = unpack_argb(pixel);
            bytes.extend_from_slice(&[r, g, b, a]);
        }
        bytes
    }
}
