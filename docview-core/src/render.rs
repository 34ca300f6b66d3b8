use anyhow::Result;
use rayon::prelude::*;
use tracing::instrument;

use crate::config::Rgb;
use crate::document::{DocumentHandle, PageSize, Rectangle, RenderImage};
use crate::view::Rotation;

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Duotone endpoints used when recoloring is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecolorPalette {
    pub dark: Rgb,
    pub light: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub page: usize,
    pub scale_percent: u32,
    pub rotation: Rotation,
    pub recolor: Option<RecolorPalette>,
}

/// Canvas dimensions for a page: scaled, and swapped for quarter turns.
pub fn canvas_size(size: PageSize, scale_percent: u32, rotation: Rotation) -> (u32, u32) {
    let s = f64::from(scale_percent) / 100.0;
    let width = (size.width * s) as u32;
    let height = (size.height * s) as u32;
    if rotation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

/// Renders one page. Without a document, or with a page outside it, nothing
/// is drawn and `Ok(None)` is returned.
#[instrument(skip(document))]
pub fn render(document: Option<&DocumentHandle>, params: RenderParams) -> Result<Option<RenderImage>> {
    let Some(document) = document else {
        return Ok(None);
    };
    if params.page >= document.page_count() {
        return Ok(None);
    }

    let size = document.page_size(params.page)?;
    let (width, height) = canvas_size(size, params.scale_percent, params.rotation);
    let source = document.rasterize(params.page, f64::from(params.scale_percent) / 100.0)?;

    let mut canvas = RenderImage::filled(width, height, WHITE);
    blit_rotated(&source, &mut canvas, params.rotation);
    if let Some(palette) = params.recolor {
        recolor(&mut canvas, palette);
    }
    Ok(Some(canvas))
}

/// Target of source pixel (sx, sy) on a `cw`x`ch` canvas. Equivalent to
/// translating by (width, 0), (width, height) or (0, height) and then rotating
/// by 90, 180 or 270 degrees.
fn rotated_target(sx: u32, sy: u32, cw: u32, ch: u32, rotation: Rotation) -> Option<(u32, u32)> {
    let (x, y) = match rotation {
        Rotation::Deg0 => (Some(sx), Some(sy)),
        Rotation::Deg90 => (cw.checked_sub(1 + sy), Some(sx)),
        Rotation::Deg180 => (cw.checked_sub(1 + sx), ch.checked_sub(1 + sy)),
        Rotation::Deg270 => (Some(sy), ch.checked_sub(1 + sx)),
    };
    match (x?, y?) {
        (x, y) if x < cw && y < ch => Some((x, y)),
        _ => None,
    }
}

fn blit_rotated(source: &RenderImage, canvas: &mut RenderImage, rotation: Rotation) {
    let cw = canvas.width;
    let ch = canvas.height;
    let source_stride = source.width as usize * 4;
    let canvas_stride = cw as usize * 4;
    for sy in 0..source.height {
        for sx in 0..source.width {
            let Some((dx, dy)) = rotated_target(sx, sy, cw, ch, rotation) else {
                continue;
            };
            let src = sy as usize * source_stride + sx as usize * 4;
            let dst = dy as usize * canvas_stride + dx as usize * 4;
            if let (Some(from), true) = (source.pixels.get(src..src + 4), dst + 4 <= canvas.pixels.len()) {
                canvas.pixels[dst..dst + 4].copy_from_slice(from);
            }
        }
    }
}

/// Maps each pixel's mean intensity onto the line between `dark` (mean 0) and
/// `light` (mean 255). Alpha is left untouched.
pub fn recolor(image: &mut RenderImage, palette: RecolorPalette) {
    let dark = [palette.dark.r, palette.dark.g, palette.dark.b];
    let light = [palette.light.r, palette.light.g, palette.light.b];
    let slope: [f32; 3] =
        std::array::from_fn(|c| (f32::from(light[c]) - f32::from(dark[c])) / 255.0);

    image.pixels.par_chunks_exact_mut(4).for_each(|pixel| {
        let mean = (u32::from(pixel[0]) + u32::from(pixel[1]) + u32::from(pixel[2])) / 3;
        for c in 0..3 {
            let value = slope[c] * mean as f32 + f32::from(dark[c]) + 0.5;
            pixel[c] = value.clamp(0.0, 255.0) as u8;
        }
    });
}

/// Converts `rect` from page space to canvas space in place.
pub fn remap_rectangle(rect: &mut Rectangle, size: PageSize, scale: f64, rotation: Rotation) {
    let Rectangle { x1, y1, x2, y2 } = *rect;
    let (w, h, s) = (size.width, size.height, scale);
    *rect = match rotation {
        Rotation::Deg0 => Rectangle::new(x1 * s, (h - y1) * s, x2 * s, (h - y2) * s),
        Rotation::Deg90 => Rectangle::new(y2 * s, x1 * s, y1 * s, x2 * s),
        Rotation::Deg180 => Rectangle::new((w - x2) * s, y2 * s, (w - x1) * s, y1 * s),
        Rotation::Deg270 => Rectangle::new((h - y1) * s, (w - x2) * s, (h - y2) * s, (w - x1) * s),
    };
}

/// Blends `color` over the canvas-space rectangle. Corners may come in any
/// order; the area is clipped to the image.
pub fn paint_highlight(image: &mut RenderImage, rect: &Rectangle, color: Rgb, alpha: f32) {
    let clip = |v: f64, max: u32| v.max(0.0).min(f64::from(max)) as u32;
    let x0 = clip(rect.x1.min(rect.x2), image.width);
    let x1 = clip(rect.x1.max(rect.x2).ceil(), image.width);
    let y0 = clip(rect.y1.min(rect.y2), image.height);
    let y1 = clip(rect.y1.max(rect.y2).ceil(), image.height);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let width = image.width as usize;
    let color = [color.r, color.g, color.b];
    for y in y0..y1 {
        let row_start = y as usize * width * 4;
        for x in x0..x1 {
            let idx = row_start + x as usize * 4;
            blend_pixel(&mut image.pixels[idx..idx + 4], color, alpha);
        }
    }
}

fn blend_pixel(pixel: &mut [u8], color: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    for c in 0..3 {
        pixel[c] = (f32::from(pixel[c]) * inv + f32::from(color[c]) * alpha)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
}

/// Remaps each page-space region and paints it over `image`.
pub fn paint_regions(
    image: &mut RenderImage,
    regions: &[Rectangle],
    size: PageSize,
    scale_percent: u32,
    rotation: Rotation,
    color: Rgb,
    alpha: f32,
) {
    let scale = f64::from(scale_percent) / 100.0;
    for region in regions {
        let mut rect = *region;
        remap_rectangle(&mut rect, size, scale, rotation);
        paint_highlight(image, &rect, color, alpha);
    }
}
