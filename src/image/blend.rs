//! Scaled image blending.

use super::{draw::ClipCircle, Color, Image, Rect};

/// A blending operation that alpha-blends a region of one image onto a region of another, scaling
/// with nearest-neighbor sampling.
///
/// Returned by [`blend`]. The operation is performed when the guard is dropped.
pub struct Blend<'a> {
    dest: &'a mut Image,
    dest_rect: Rect,
    src: &'a Image,
    src_rect: Rect,
    clip: &'a [ClipCircle],
}

impl<'a> Blend<'a> {
    /// Restricts writes to the intersection of `clip`.
    pub fn clip(&mut self, clip: &'a [ClipCircle]) -> &mut Self {
        self.clip = clip;
        self
    }
}

impl Drop for Blend<'_> {
    fn drop(&mut self) {
        if !self.dest_rect.is_drawable() || !self.src_rect.is_drawable() {
            return;
        }
        let Some(src_rect) = self.src_rect.intersection(&self.src.rect()) else {
            return;
        };
        let Some(visible) = self.dest_rect.intersection(&self.dest.rect()) else {
            return;
        };

        // Only pixels whose center falls inside `dest_rect` are written.
        let x0 = (visible.x() - 0.5).ceil().max(0.0) as u32;
        let y0 = (visible.y() - 0.5).ceil().max(0.0) as u32;
        let x1 = ((visible.right() - 0.5).ceil().max(0.0) as u32).min(self.dest.width());
        let y1 = ((visible.bottom() - 0.5).ceil().max(0.0) as u32).min(self.dest.height());

        let sx = self.src_rect.width() / self.dest_rect.width();
        let sy = self.src_rect.height() / self.dest_rect.height();
        let max_x = src_rect.right().ceil() as u32 - 1;
        let max_y = src_rect.bottom().ceil() as u32 - 1;
        let min_x = src_rect.x().floor() as u32;
        let min_y = src_rect.y().floor() as u32;

        for dest_y in y0..y1 {
            for dest_x in x0..x1 {
                if !super::draw::unclipped(self.clip, dest_x as i32, dest_y as i32) {
                    continue;
                }

                let u = (dest_x as f32 + 0.5 - self.dest_rect.x()) * sx + self.src_rect.x();
                let v = (dest_y as f32 + 0.5 - self.dest_rect.y()) * sy + self.src_rect.y();
                let src_x = (u.max(0.0) as u32).clamp(min_x, max_x);
                let src_y = (v.max(0.0) as u32).clamp(min_y, max_y);

                let src_pix = self.src.get(src_x, src_y);
                let dest_pix = self.dest.get(dest_x, dest_y);
                self.dest.set(dest_x, dest_y, blend_alpha(dest_pix, src_pix));
            }
        }
    }
}

/// Draws the `src_rect` region of `src` into the `dest_rect` region of `dest`.
///
/// Both rectangles are in the pixel space of their respective image. Parts of `dest_rect` outside
/// of `dest` are discarded. Nothing is drawn if either rectangle is not
/// [drawable][Rect::is_drawable].
pub fn blend<'a>(dest: &'a mut Image, dest_rect: Rect, src: &'a Image, src_rect: Rect) -> Blend<'a> {
    Blend {
        dest,
        dest_rect,
        src,
        src_rect,
        clip: &[],
    }
}

fn blend_alpha(dest: Color, src: Color) -> Color {
    fn blend_color(dest: f32, src: f32, dest_alpha: f32, src_alpha: f32, result_alpha: f32) -> f32 {
        (src * src_alpha + dest * dest_alpha * (1.0 - src_alpha)) / result_alpha
    }

    match src.a() {
        0 => return dest,
        255 => return src,
        _ => {}
    }

    let dest = LinearColor::new(dest);
    let src = LinearColor::new(src);

    let result_alpha = src.a() + dest.a() * (1.0 - src.a());
    let r = blend_color(dest.r(), src.r(), dest.a(), src.a(), result_alpha);
    let g = blend_color(dest.g(), src.g(), dest.a(), src.a(), result_alpha);
    let b = blend_color(dest.b(), src.b(), dest.a(), src.a(), result_alpha);

    LinearColor([r, g, b, result_alpha]).to_color()
}

struct LinearColor([f32; 4]);

impl LinearColor {
    fn new(color: Color) -> Self {
        fn to_rgb(srgb: f32) -> f32 {
            if srgb <= 0.04045 {
                srgb / 12.92
            } else {
                ((srgb + 0.055) / 1.055).powf(2.4)
            }
        }

        let (r, g, b, a) = (color.r(), color.g(), color.b(), color.a());
        let (r, g, b, a) = (f32::from(r), f32::from(g), f32::from(b), f32::from(a));
        let (r, g, b, a) = (r / 255.0, g / 255.0, b / 255.0, a / 255.0);

        Self([to_rgb(r), to_rgb(g), to_rgb(b), a])
    }

    fn to_color(&self) -> Color {
        fn to_srgb(rgb: f32) -> f32 {
            if rgb <= 0.0031308 {
                rgb * 12.92
            } else {
                1.055 * rgb.powf(1.0 / 2.4) - 0.055
            }
        }

        let (r, g, b) = (to_srgb(self.r()), to_srgb(self.g()), to_srgb(self.b()));
        let q = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;

        Color([q(r), q(g), q(b), q(self.a())])
    }

    fn r(&self) -> f32 {
        self.0[0]
    }

    fn g(&self) -> f32 {
        self.0[1]
    }

    fn b(&self) -> f32 {
        self.0[2]
    }

    fn a(&self) -> f32 {
        self.0[3]
    }
}
