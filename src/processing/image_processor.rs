use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use image::imageops::{resize, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use log::{debug, warn};

/// Narrower scans are upscaled before thresholding
const MIN_OCR_WIDTH: u32 = 800;
const MAX_UPSCALE_FACTOR: f32 = 4.0;
/// Upscaling never produces more pixels than this
const MAX_UPSCALED_PIXELS: u64 = 40_000_000;

// Gaussian adaptive threshold: 11x11 block (sigma 2.0), constant 2
const ADAPTIVE_BLOCK_SIGMA: f32 = 2.0;
const ADAPTIVE_CONSTANT: i16 = 2;
// 5x5 Gaussian ahead of Otsu
const OTSU_BLUR_SIGMA: f32 = 1.1;
const CLAHE_GRID: u32 = 8;
const CLAHE_CLIP_LIMIT: f32 = 2.0;

/// One cleaned raster ready for OCR
#[derive(Debug, Clone)]
pub struct ImageVariant {
    pub name: &'static str,
    pub image: GrayImage,
}

/// ImageProcessor turns a photographed prescription into up to three
/// binarized or contrast-enhanced grayscale variants.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode and preprocess. An unreadable file yields no variants; a
    /// variant whose filter fails is skipped. When every filter fails the
    /// plain grayscale image is returned on its own.
    pub fn preprocess<P: AsRef<Path>>(image_path: P) -> Vec<ImageVariant> {
        let image_path = image_path.as_ref();
        let decoded = match image::open(image_path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Failed to decode image {:?}: {}", image_path, e);
                return Vec::new();
            }
        };
        Self::preprocess_gray(Self::upscale_if_small(decoded.to_luma8()))
    }

    pub fn preprocess_gray(gray: GrayImage) -> Vec<ImageVariant> {
        let filters: [(&'static str, fn(&GrayImage) -> GrayImage); 3] = [
            ("adaptive_gaussian", Self::denoise_adaptive_threshold),
            ("otsu", Self::blur_otsu_threshold),
            ("clahe", |img: &GrayImage| Self::clahe(img, CLAHE_GRID, CLAHE_CLIP_LIMIT)),
        ];

        let mut variants = Vec::with_capacity(filters.len());
        for (name, filter) in filters {
            match catch_unwind(AssertUnwindSafe(|| filter(&gray))) {
                Ok(image) => {
                    debug!("Preprocessing variant {} ready ({}x{})", name, image.width(), image.height());
                    variants.push(ImageVariant { name, image });
                }
                Err(_) => warn!("Preprocessing variant {} failed, skipping", name),
            }
        }

        if variants.is_empty() {
            variants.push(ImageVariant { name: "grayscale", image: gray });
        }
        variants
    }

    fn upscale_if_small(gray: GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || width >= MIN_OCR_WIDTH {
            return gray;
        }
        let scale = (MIN_OCR_WIDTH as f32 / width as f32).min(MAX_UPSCALE_FACTOR);
        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        if new_width as u64 * new_height as u64 > MAX_UPSCALED_PIXELS {
            debug!("Skipping upscale of {}x{} image", width, height);
            return gray;
        }
        resize(&gray, new_width, new_height, FilterType::CatmullRom)
    }

    /// 3x3 median denoise followed by Gaussian-weighted adaptive thresholding.
    fn denoise_adaptive_threshold(gray: &GrayImage) -> GrayImage {
        let denoised = median_filter(gray, 1, 1);
        Self::adaptive_gaussian_threshold(&denoised, ADAPTIVE_BLOCK_SIGMA, ADAPTIVE_CONSTANT)
    }

    /// A pixel becomes white when it is brighter than its Gaussian-weighted
    /// neighbourhood minus `constant`.
    pub fn adaptive_gaussian_threshold(gray: &GrayImage, sigma: f32, constant: i16) -> GrayImage {
        let local_mean = gaussian_blur_f32(gray, sigma);
        let (width, height) = gray.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            let value = gray.get_pixel(x, y)[0] as i16;
            let cutoff = local_mean.get_pixel(x, y)[0] as i16 - constant;
            Luma([if value > cutoff { 255u8 } else { 0u8 }])
        })
    }

    fn blur_otsu_threshold(gray: &GrayImage) -> GrayImage {
        let blurred = gaussian_blur_f32(gray, OTSU_BLUR_SIGMA);
        let level = otsu_level(&blurred);
        threshold(&blurred, level)
    }

    /// Contrast-limited adaptive histogram equalization with bilinear
    /// blending between neighbouring tile mappings.
    pub fn clahe(gray: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return gray.clone();
        }
        let grid_x = grid.clamp(1, width);
        let grid_y = grid.clamp(1, height);
        let tile_w = (width + grid_x - 1) / grid_x;
        let tile_h = (height + grid_y - 1) / grid_y;

        let mut luts = vec![[0u8; 256]; (grid_x * grid_y) as usize];
        for ty in 0..grid_y {
            for tx in 0..grid_x {
                let x0 = tx * tile_w;
                let y0 = ty * tile_h;
                let x1 = (x0 + tile_w).min(width);
                let y1 = (y0 + tile_h).min(height);
                luts[(ty * grid_x + tx) as usize] = Self::tile_lut(gray, x0, y0, x1, y1, clip_limit);
            }
        }

        let axis = |pos: u32, tile: u32, count: u32| -> (usize, usize, f32) {
            let t = (pos as f32 + 0.5) / tile as f32 - 0.5;
            let lo = t.floor().clamp(0.0, (count - 1) as f32);
            let hi = (lo + 1.0).min((count - 1) as f32);
            let frac = (t - lo).clamp(0.0, 1.0);
            (lo as usize, hi as usize, frac)
        };

        ImageBuffer::from_fn(width, height, |x, y| {
            let value = gray.get_pixel(x, y)[0] as usize;
            let (x_lo, x_hi, ax) = axis(x, tile_w, grid_x);
            let (y_lo, y_hi, ay) = axis(y, tile_h, grid_y);
            let at = |tx: usize, ty: usize| luts[ty * grid_x as usize + tx][value] as f32;
            let top = at(x_lo, y_lo) * (1.0 - ax) + at(x_hi, y_lo) * ax;
            let bottom = at(x_lo, y_hi) * (1.0 - ax) + at(x_hi, y_hi) * ax;
            Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
        })
    }

    fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
        let mut lut = [0u8; 256];
        let area = ((x1.saturating_sub(x0)) * (y1.saturating_sub(y0))) as usize;
        if area == 0 {
            for (i, slot) in lut.iter_mut().enumerate() {
                *slot = i as u8;
            }
            return lut;
        }

        let mut histogram = [0usize; 256];
        for y in y0..y1 {
            for x in x0..x1 {
                histogram[gray.get_pixel(x, y)[0] as usize] += 1;
            }
        }

        // Clip and hand the excess back to every bin evenly
        let limit = ((clip_limit * area as f32 / 256.0) as usize).max(1);
        let mut excess = 0usize;
        for count in histogram.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }
        let bonus = excess / 256;
        let remainder = excess % 256;
        for (i, count) in histogram.iter_mut().enumerate() {
            *count += bonus + usize::from(i < remainder);
        }

        let scale = 255.0 / area as f32;
        let mut cumulative = 0usize;
        for (i, count) in histogram.iter().enumerate() {
            cumulative += count;
            lut[i] = (cumulative as f32 * scale).round().min(255.0) as u8;
        }
        lut
    }
}
