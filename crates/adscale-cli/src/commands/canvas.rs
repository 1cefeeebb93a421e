use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const COLOR_BACKGROUND: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);
pub const COLOR_GRID: Rgba<u8> = Rgba([0xDD, 0xDD, 0xDD, 0xFF]);
pub const COLOR_GRID_DASHED: Rgba<u8> = Rgba([0xB0, 0xB0, 0xB0, 0xB3]);
pub const COLOR_TEXT_PRIMARY: Rgba<u8> = Rgba([0x26, 0x26, 0x26, 0xFF]);
pub const COLOR_TEXT_SECONDARY: Rgba<u8> = Rgba([0x55, 0x55, 0x55, 0xFF]);
pub const COLOR_AXIS: Rgba<u8> = Rgba([0x80, 0x80, 0x80, 0xFF]);
pub const COLOR_BLUE: Rgba<u8> = Rgba([0x1F, 0x4E, 0xC8, 0xFF]);
pub const COLOR_GREEN: Rgba<u8> = Rgba([0x1A, 0x8A, 0x2E, 0xFF]);
pub const COLOR_RED: Rgba<u8> = Rgba([0xD0, 0x21, 0x21, 0xFF]);
pub const COLOR_BAR: Rgba<u8> = Rgba([0x4C, 0x72, 0xB0, 0xFF]);

pub const FONT_ENV_VAR: &str = "ADSCALE_FONT";

const SYSTEM_FONT_PATHS: [&str; 8] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Find a usable TrueType font: the configured path, then `ADSCALE_FONT`,
/// then well-known system locations.
pub fn load_font(configured: Option<&Path>) -> Option<FontArc> {
    let env_path = std::env::var_os(FONT_ENV_VAR).map(PathBuf::from);

    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(env_path)
        .chain(SYSTEM_FONT_PATHS.iter().map(PathBuf::from))
        .find_map(|path| {
            let font = fs::read(&path)
                .ok()
                .and_then(|bytes| FontArc::try_from_vec(bytes).ok());
            if font.is_some() {
                debug!("Using font {}", path.display());
            }
            font
        })
}

/// An RGBA drawing surface. Text calls are no-ops when no font is loaded.
pub struct Canvas {
    image: RgbaImage,
    font: Option<FontArc>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, font: Option<FontArc>) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, COLOR_BACKGROUND),
            font,
        }
    }

    pub fn width(&self) -> i32 {
        self.image.width() as i32
    }

    pub fn height(&self) -> i32 {
        self.image.height() as i32
    }

    #[cfg(test)]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save(&self, path: &Path) -> image::ImageResult<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgba<u8>) {
        for py in y..(y + height) {
            for px in x..(x + width) {
                blend_pixel(&mut self.image, px, py, color);
            }
        }
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba<u8>, thickness: i32) {
        let half = thickness / 2;
        let vertical = (to.0 - from.0).abs() < (to.1 - from.1).abs();
        for offset in -half..(thickness - half) {
            let o = offset as f32;
            let (a, b) = if vertical {
                ((from.0 + o, from.1), (to.0 + o, to.1))
            } else {
                ((from.0, from.1 + o), (to.0, to.1 + o))
            };
            draw_line_segment_mut(&mut self.image, a, b, color);
        }
    }

    /// Straight line broken into `dash`-long strokes separated by `gap`.
    #[allow(clippy::too_many_arguments)]
    pub fn dashed_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Rgba<u8>,
        thickness: i32,
        dash: f32,
        gap: f32,
    ) {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON || dash <= 0.0 {
            return;
        }

        let (ux, uy) = (dx / length, dy / length);
        let mut start = 0.0f32;
        while start < length {
            let end = (start + dash).min(length);
            self.line(
                (from.0 + ux * start, from.1 + uy * start),
                (from.0 + ux * end, from.1 + uy * end),
                color,
                thickness,
            );
            start = end + gap;
        }
    }

    /// Polyline through `points`, dashed when `dash` is set.
    ///
    /// The dash pattern restarts per segment, which is indistinguishable at
    /// daily resolution.
    pub fn polyline(
        &mut self,
        points: &[(f32, f32)],
        color: Rgba<u8>,
        thickness: i32,
        dash: Option<(f32, f32)>,
    ) {
        for pair in points.windows(2) {
            match dash {
                Some((on, off)) => self.dashed_line(pair[0], pair[1], color, thickness, on, off),
                None => self.line(pair[0], pair[1], color, thickness),
            }
        }
    }

    pub fn circle(&mut self, center: (i32, i32), radius: i32, color: Rgba<u8>) {
        draw_filled_circle_mut(&mut self.image, center, radius, color);
    }

    /// Filled box with a rounded outline, used for annotation labels.
    #[allow(clippy::too_many_arguments)]
    pub fn rounded_box(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        radius: i32,
        fill: Rgba<u8>,
        border: Rgba<u8>,
    ) {
        if width <= 0 || height <= 0 {
            return;
        }

        for py in y..(y + height) {
            for px in x..(x + width) {
                let cx = px as f32 + 0.5;
                let cy = py as f32 + 0.5;
                if !point_in_rounded_rect(
                    cx,
                    cy,
                    x as f32,
                    y as f32,
                    width as f32,
                    height as f32,
                    radius as f32,
                ) {
                    continue;
                }

                let inner = point_in_rounded_rect(
                    cx,
                    cy,
                    (x + 1) as f32,
                    (y + 1) as f32,
                    (width - 2) as f32,
                    (height - 2) as f32,
                    (radius - 1).max(0) as f32,
                );
                blend_pixel(&mut self.image, px, py, if inner { fill } else { border });
            }
        }
    }

    pub fn text_width(&self, font_size: f32, text: &str) -> f32 {
        self.font
            .as_ref()
            .map_or(0.0, |font| measure_text_width(font, font_size, text))
    }

    pub fn text(&mut self, x: i32, baseline_y: i32, font_size: f32, color: Rgba<u8>, text: &str) {
        if let Some(font) = &self.font {
            draw_text_mut_baseline(&mut self.image, font, font_size, color, x, baseline_y, text);
        }
    }

    pub fn text_centered(
        &mut self,
        center_x: i32,
        baseline_y: i32,
        font_size: f32,
        color: Rgba<u8>,
        text: &str,
    ) {
        let width = self.text_width(font_size, text);
        self.text(
            center_x - (width / 2.0).round() as i32,
            baseline_y,
            font_size,
            color,
            text,
        );
    }

    pub fn text_right(
        &mut self,
        right_x: i32,
        baseline_y: i32,
        font_size: f32,
        color: Rgba<u8>,
        text: &str,
    ) {
        let width = self.text_width(font_size, text);
        self.text(
            right_x - width.ceil() as i32,
            baseline_y,
            font_size,
            color,
            text,
        );
    }

    /// Text rotated 90° counter-clockwise, reading bottom to top.
    ///
    /// `(center_x, bottom_y)` is where the end of the first character sits: the
    /// text is horizontally centered on `center_x` and rises from `bottom_y`.
    pub fn text_vertical(
        &mut self,
        center_x: i32,
        bottom_y: i32,
        font_size: f32,
        color: Rgba<u8>,
        text: &str,
    ) {
        let Some(font) = &self.font else {
            return;
        };

        let scaled = font.as_scaled(PxScale::from(font_size));
        let ascent = scaled.ascent().ceil() as i32;
        let line_height = (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32;
        let text_width = measure_text_width(font, font_size, text).ceil().max(1.0) as u32;

        let mut strip = RgbaImage::from_pixel(text_width, line_height, Rgba([0, 0, 0, 0]));
        draw_text_mut_baseline(&mut strip, font, font_size, color, 0, ascent, text);
        let rotated = imageops::rotate270(&strip);

        let left = center_x - rotated.width() as i32 / 2;
        let top = bottom_y - rotated.height() as i32;
        for (dx, dy, pixel) in rotated.enumerate_pixels() {
            blend_pixel(&mut self.image, left + dx as i32, top + dy as i32, *pixel);
        }
    }

    /// Height a vertical label of `text` occupies.
    pub fn text_vertical_extent(&self, font_size: f32, text: &str) -> i32 {
        self.text_width(font_size, text).ceil() as i32
    }
}

fn draw_text_mut_baseline(
    canvas: &mut RgbaImage,
    font: &FontArc,
    font_size: f32,
    color: Rgba<u8>,
    x: i32,
    baseline_y: i32,
    text: &str,
) {
    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let mut caret_x = x as f32;
    let baseline = baseline_y as f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = prev_glyph {
            caret_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, point(caret_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                blend_pixel_with_coverage(canvas, px, py, color, coverage);
            });
        }

        caret_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }
}

fn measure_text_width(font: &FontArc, font_size: f32, text: &str) -> f32 {
    let scaled_font = font.as_scaled(PxScale::from(font_size));
    let mut width = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width
}

fn point_in_rounded_rect(
    px: f32,
    py: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    radius: f32,
) -> bool {
    if width <= 0.0 || height <= 0.0 {
        return false;
    }

    let r = radius.max(0.0).min(width / 2.0).min(height / 2.0);
    if r <= 0.0 {
        return px >= x && px < x + width && py >= y && py < y + height;
    }

    let nearest_x = px.clamp(x + r, x + width - r);
    let nearest_y = py.clamp(y + r, y + height - r);
    let dx = px - nearest_x;
    let dy = py - nearest_y;
    dx * dx + dy * dy <= r * r
}

fn blend_pixel_with_coverage(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    color: Rgba<u8>,
    coverage: f32,
) {
    let mut src = color;
    src.0[3] = ((src.0[3] as f32) * coverage.clamp(0.0, 1.0)).round() as u8;
    blend_pixel(canvas, x, y, src);
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, src: Rgba<u8>) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }

    let src_alpha = src.0[3] as f32 / 255.0;
    if src_alpha <= 0.0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_alpha = dst.0[3] as f32 / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    for channel in 0..3 {
        let src_channel = src.0[channel] as f32 / 255.0;
        let dst_channel = dst.0[channel] as f32 / 255.0;
        let out_channel =
            (src_channel * src_alpha + dst_channel * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        dst.0[channel] = (out_channel * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    dst.0[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}
