//! Aspect-preserving scale, center crop and RGB565 packing of source images.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use super::color::{rgb565_bytes, rgb888_to_rgb565};

/// How a source image is resized and cropped to fill the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub resized_width: u32,
    pub resized_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
}

impl CropPlan {
    /// The part of a `src_width`x`src_height` source that stays visible
    /// under this plan, as `(x, y, width, height)` in source pixels.
    pub fn source_region(
        &self,
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    ) -> (u32, u32, u32, u32) {
        let axis = |crop: u32, visible: u32, resized: u32, src: u32| {
            let scale = src as f64 / resized.max(1) as f64;
            let len = ((visible.min(resized) as f64 * scale).round() as u32)
                .max(1)
                .min(src);
            let start = ((crop as f64 * scale).round() as u32).min(src - len);
            (start, len)
        };
        let (x, width) = axis(self.crop_x, dst_width, self.resized_width, src_width);
        let (y, height) = axis(self.crop_y, dst_height, self.resized_height, src_height);
        (x, y, width, height)
    }
}

/// Computes the cover-and-crop plan for a `src` image on a `dst` panel.
///
/// A relatively wider source is scaled to the panel height and cropped
/// horizontally; otherwise (including equal aspect) it is scaled to the
/// panel width and cropped vertically. Crops are centered, rounding down.
pub fn plan(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> CropPlan {
    let aspect = src_width as f64 / src_height as f64;
    let screen_aspect = dst_width as f64 / dst_height as f64;

    if aspect > screen_aspect {
        let resized_width = (dst_height as f64 * aspect).round() as u32;
        CropPlan {
            resized_width,
            resized_height: dst_height,
            crop_x: resized_width.saturating_sub(dst_width) / 2,
            crop_y: 0,
        }
    } else {
        let resized_height = (dst_width as f64 / aspect).round() as u32;
        CropPlan {
            resized_width: dst_width,
            resized_height,
            crop_x: 0,
            crop_y: resized_height.saturating_sub(dst_height) / 2,
        }
    }
}

/// Renders any image to a `width`x`height` RGB565 byte stream.
pub fn render(image: &DynamicImage, width: u16, height: u16) -> Vec<u8> {
    render_rgb(&image.to_rgb8(), width, height)
}

/// Renders an RGB8 image to a `width`x`height` RGB565 byte stream.
///
/// The output is always exactly `width * height * 2` bytes; a degenerate
/// source yields a black frame.
pub fn render_rgb(image: &RgbImage, width: u16, height: u16) -> Vec<u8> {
    let (width, height) = (width as u32, height as u32);
    let mut out = Vec::with_capacity(width as usize * height as usize * 2);

    if image.width() == 0 || image.height() == 0 || width == 0 || height == 0 {
        out.resize(width as usize * height as usize * 2, 0);
        return out;
    }

    // Crop in source space, then scale the visible region to the panel.
    let plan = plan(image.width(), image.height(), width, height);
    let (x, y, crop_width, crop_height) =
        plan.source_region(image.width(), image.height(), width, height);
    let visible = imageops::crop_imm(image, x, y, crop_width, crop_height).to_image();
    let resized = imageops::resize(&visible, width, height, FilterType::CatmullRom);

    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        out.extend_from_slice(&rgb565_bytes(rgb888_to_rgb565(r, g, b)));
    }
    out
}
