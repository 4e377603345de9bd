//! Accumulation framebuffer
//!
//! Each pixel keeps the running mean of every color sample added to it and
//! the number of samples, so passes can keep refining an image without the
//! sample history.

use cgmath::{Vector3, Zero};
use std::ops::Range;

/// Linear RGB radiance
pub type Color = Vector3<f32>;

/// Running mean of color samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub color: Color,
    pub weight: u32,
}

impl Default for Pixel {
    fn default() -> Self {
        Self {
            color: Color::zero(),
            weight: 0,
        }
    }
}

impl Pixel {
    /// Fold one sample into the mean
    #[inline]
    pub fn add(&mut self, color: Color) {
        let weight = self.weight as f32;
        self.color = (self.color * weight + color) / (weight + 1.0);
        self.weight += 1;
    }

    pub fn is_sampled(&self) -> bool {
        self.weight > 0
    }
}

/// Fixed-size 2D grid of pixels, row-major with y growing downwards
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Add one sample to pixel `(x, y)`. Out-of-range coordinates are a caller
    /// bug: asserted in debug builds and ignored otherwise.
    #[inline]
    pub fn add_sample(&mut self, x: u32, y: u32, color: Color) {
        debug_assert!(
            x < self.width && y < self.height,
            "sample ({}, {}) outside {}x{} framebuffer",
            x,
            y,
            self.width,
            self.height
        );
        if let Some(index) = self.index(x, y) {
            self.pixels[index].add(color);
        }
    }

    /// Current mean color and sample count of pixel `(x, y)`
    pub fn read(&self, x: u32, y: u32) -> Option<Pixel> {
        self.index(x, y).map(|index| self.pixels[index])
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Mutable rows `rows.start..rows.end`, for handing disjoint bands to workers
    pub fn rows_mut(&mut self, rows: Range<u32>) -> &mut [Pixel] {
        let end = rows.end.min(self.height) as usize * self.width as usize;
        let start = (rows.start as usize * self.width as usize).min(end);
        &mut self.pixels[start..end]
    }

    /// Number of pixels with at least one sample
    pub fn sampled_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_sampled()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    fn c(r: f32, g: f32, b: f32) -> Color {
        Color::new(r, g, b)
    }

    #[test]
    fn test_mean_is_arithmetic_mean() {
        let samples = [c(1.0, 0.0, 0.0), c(0.0, 2.0, 0.0), c(0.5, 0.5, 3.0), c(0.1, 0.2, 0.3)];
        let mut pixel = Pixel::default();
        for s in &samples {
            pixel.add(*s);
        }
        let expected = samples.iter().fold(Color::zero(), |acc, s| acc + *s) / samples.len() as f32;
        assert_eq!(pixel.weight, 4);
        assert!((pixel.color - expected).magnitude() < 1e-6);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let samples = [c(0.9, 0.1, 0.4), c(0.2, 0.7, 0.0), c(1.5, 0.3, 0.8), c(0.0, 0.0, 1.0), c(0.3, 0.3, 0.3)];
        let mut forward = Pixel::default();
        let mut backward = Pixel::default();
        for s in samples.iter() {
            forward.add(*s);
        }
        for s in samples.iter().rev() {
            backward.add(*s);
        }
        assert_eq!(forward.weight, backward.weight);
        assert!((forward.color - backward.color).magnitude() < 1e-6);
    }

    #[test]
    fn test_unsampled_pixels_are_zero() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.add_sample(1, 2, c(1.0, 1.0, 1.0));
        assert_eq!(fb.sampled_count(), 1);

        let untouched = fb.read(0, 0).expect("in bounds");
        assert_eq!(untouched.weight, 0);
        assert_eq!(untouched.color, Color::zero());
        assert_eq!(fb.read(1, 2).expect("in bounds").weight, 1);
        assert!(fb.read(4, 0).is_none());
        assert!(fb.read(0, 3).is_none());
    }

    #[test]
    fn test_rows_mut_clamps_to_height() {
        let mut fb = FrameBuffer::new(3, 3);
        fb.add_sample(0, 1, c(1.0, 0.0, 0.0));

        assert_eq!(fb.rows_mut(1..2).len(), 3);
        assert_eq!(fb.rows_mut(1..5).len(), 6);
        fb.rows_mut(2..3)[1].add(c(1.0, 1.0, 1.0));

        assert_eq!(fb.read(1, 2).expect("in bounds").weight, 1);
        assert_eq!(fb.read(0, 1).expect("in bounds").color, c(1.0, 0.0, 0.0));
        assert_eq!(fb.sampled_count(), 2);
    }
}
