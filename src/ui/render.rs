//! Software rendering primitives for the softbuffer framebuffer.
//! Pixels are `u32` in `0x00RRGGBB`; colours passed in are RGBA tuples.

pub type Rgba = (u8, u8, u8, u8);

pub const BG_COLOR: Rgba = (31, 31, 31, 255);
pub const WHITE: Rgba = (255, 255, 255, 255);
pub const ERROR_RED: Rgba = (255, 80, 80, 255);

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// 5x7 bitmap font for ASCII 32..=127, one byte per column, LSB = top row.
static FONT_5X7: [[u8; 5]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x5F, 0x00, 0x00], [0x00, 0x07, 0x00, 0x07, 0x00], [0x14, 0x7F, 0x14, 0x7F, 0x14], //  !"#
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], [0x23, 0x13, 0x08, 0x64, 0x62], [0x36, 0x49, 0x55, 0x22, 0x50], [0x00, 0x05, 0x03, 0x00, 0x00], // $%&'
    [0x00, 0x1C, 0x22, 0x41, 0x00], [0x00, 0x41, 0x22, 0x1C, 0x00], [0x14, 0x08, 0x3E, 0x08, 0x14], [0x08, 0x08, 0x3E, 0x08, 0x08], // ()*+
    [0x00, 0x50, 0x30, 0x00, 0x00], [0x08, 0x08, 0x08, 0x08, 0x08], [0x00, 0x60, 0x60, 0x00, 0x00], [0x20, 0x10, 0x08, 0x04, 0x02], // ,-./
    [0x3E, 0x51, 0x49, 0x45, 0x3E], [0x00, 0x42, 0x7F, 0x40, 0x00], [0x42, 0x61, 0x51, 0x49, 0x46], [0x21, 0x41, 0x45, 0x4B, 0x31], // 0123
    [0x18, 0x14, 0x12, 0x7F, 0x10], [0x27, 0x45, 0x45, 0x45, 0x39], [0x3C, 0x4A, 0x49, 0x49, 0x30], [0x01, 0x71, 0x09, 0x05, 0x03], // 4567
    [0x36, 0x49, 0x49, 0x49, 0x36], [0x06, 0x49, 0x49, 0x29, 0x1E], [0x00, 0x36, 0x36, 0x00, 0x00], [0x00, 0x56, 0x36, 0x00, 0x00], // 89:;
    [0x08, 0x14, 0x22, 0x41, 0x00], [0x14, 0x14, 0x14, 0x14, 0x14], [0x00, 0x41, 0x22, 0x14, 0x08], [0x02, 0x01, 0x51, 0x09, 0x06], // <=>?
    [0x3E, 0x41, 0x5D, 0x55, 0x1E], [0x7E, 0x11, 0x11, 0x11, 0x7E], [0x7F, 0x49, 0x49, 0x49, 0x36], [0x3E, 0x41, 0x41, 0x41, 0x22], // @ABC
    [0x7F, 0x41, 0x41, 0x22, 0x1C], [0x7F, 0x49, 0x49, 0x49, 0x41], [0x7F, 0x09, 0x09, 0x09, 0x01], [0x3E, 0x41, 0x49, 0x49, 0x7A], // DEFG
    [0x7F, 0x08, 0x08, 0x08, 0x7F], [0x00, 0x41, 0x7F, 0x41, 0x00], [0x20, 0x40, 0x41, 0x3F, 0x01], [0x7F, 0x08, 0x14, 0x22, 0x41], // HIJK
    [0x7F, 0x40, 0x40, 0x40, 0x40], [0x7F, 0x02, 0x0C, 0x02, 0x7F], [0x7F, 0x04, 0x08, 0x10, 0x7F], [0x3E, 0x41, 0x41, 0x41, 0x3E], // LMNO
    [0x7F, 0x09, 0x09, 0x09, 0x06], [0x3E, 0x41, 0x51, 0x21, 0x5E], [0x7F, 0x09, 0x19, 0x29, 0x46], [0x46, 0x49, 0x49, 0x49, 0x31], // PQRS
    [0x01, 0x01, 0x7F, 0x01, 0x01], [0x3F, 0x40, 0x40, 0x40, 0x3F], [0x1F, 0x20, 0x40, 0x20, 0x1F], [0x3F, 0x40, 0x38, 0x40, 0x3F], // TUVW
    [0x63, 0x14, 0x08, 0x14, 0x63], [0x07, 0x08, 0x70, 0x08, 0x07], [0x61, 0x51, 0x49, 0x45, 0x43], [0x00, 0x7F, 0x41, 0x41, 0x00], // XYZ[
    [0x02, 0x04, 0x08, 0x10, 0x20], [0x00, 0x41, 0x41, 0x7F, 0x00], [0x04, 0x02, 0x01, 0x02, 0x04], [0x40, 0x40, 0x40, 0x40, 0x40], // \\]^_
    [0x00, 0x01, 0x02, 0x04, 0x00], [0x20, 0x54, 0x54, 0x54, 0x78], [0x7F, 0x48, 0x44, 0x44, 0x38], [0x38, 0x44, 0x44, 0x44, 0x20], // `abc
    [0x38, 0x44, 0x44, 0x48, 0x7F], [0x38, 0x54, 0x54, 0x54, 0x18], [0x08, 0x7E, 0x09, 0x01, 0x02], [0x0C, 0x52, 0x52, 0x52, 0x3E], // defg
    [0x7F, 0x08, 0x04, 0x04, 0x78], [0x00, 0x44, 0x7D, 0x40, 0x00], [0x20, 0x40, 0x44, 0x3D, 0x00], [0x7F, 0x10, 0x28, 0x44, 0x00], // hijk
    [0x00, 0x41, 0x7F, 0x40, 0x00], [0x7C, 0x04, 0x18, 0x04, 0x78], [0x7C, 0x08, 0x04, 0x04, 0x78], [0x38, 0x44, 0x44, 0x44, 0x38], // lmno
    [0x7C, 0x14, 0x14, 0x14, 0x08], [0x08, 0x14, 0x14, 0x18, 0x7C], [0x7C, 0x08, 0x04, 0x04, 0x08], [0x48, 0x54, 0x54, 0x54, 0x20], // pqrs
    [0x04, 0x3F, 0x44, 0x40, 0x20], [0x3C, 0x40, 0x40, 0x20, 0x7C], [0x1C, 0x20, 0x40, 0x20, 0x1C], [0x3C, 0x40, 0x30, 0x40, 0x3C], // tuvw
    [0x44, 0x28, 0x10, 0x28, 0x44], [0x0C, 0x50, 0x50, 0x50, 0x3C], [0x44, 0x64, 0x54, 0x4C, 0x44], [0x00, 0x08, 0x36, 0x41, 0x00], // xyz{
    [0x00, 0x00, 0x7F, 0x00, 0x00], [0x00, 0x41, 0x36, 0x08, 0x00], [0x10, 0x08, 0x08, 0x10, 0x08], [0x00, 0x00, 0x00, 0x00, 0x00], // |}~ 
];

pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

fn blend(dst: &mut u32, (r, g, b, a): Rgba) {
    if a == 255 {
        *dst = rgb(r, g, b);
        return;
    }
    let a = a as u32;
    let old = *dst;
    let mix = |src: u8, shift: u32| -> u8 {
        let d = (old >> shift) & 0xFF;
        ((src as u32 * a + d * (255 - a)) / 255) as u8
    };
    *dst = rgb(mix(r, 16), mix(g, 8), mix(b, 0));
}

/// A framebuffer borrowed for one frame.
pub struct Canvas<'a> {
    pub buf: &'a mut [u32],
    pub width: u32,
    pub height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(buf: &'a mut [u32], width: u32, height: u32) -> Self {
        Self { buf, width, height }
    }

    pub fn clear(&mut self, (r, g, b, _): Rgba) {
        self.buf.fill(rgb(r, g, b));
    }

    fn pixel_mut(&mut self, x: i32, y: i32) -> Option<&mut u32> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        self.buf.get_mut((y as u32 * self.width + x as u32) as usize)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgba) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                if let Some(px) = self.pixel_mut(x + dx, y + dy) {
                    blend(px, color);
                }
            }
        }
    }

    /// Outline of the rectangle, `thickness` pixels wide, drawn inside it.
    pub fn stroke_rect(&mut self, x: i32, y: i32, w: u32, h: u32, thickness: u32, color: Rgba) {
        let t = thickness.min(w / 2).min(h / 2).max(1);
        let inner_h = h.saturating_sub(2 * t);
        self.fill_rect(x, y, w, t, color);
        self.fill_rect(x, y + h as i32 - t as i32, w, t, color);
        self.fill_rect(x, y + t as i32, t, inner_h, color);
        self.fill_rect(x + w as i32 - t as i32, y + t as i32, t, inner_h, color);
    }

    fn draw_char(&mut self, ch: char, x: i32, y: i32, scale: u32, color: Rgba) {
        let Some(glyph) = (ch as u32).checked_sub(32).and_then(|i| FONT_5X7.get(i as usize))
        else {
            return;
        };
        for (col, bits) in glyph.iter().enumerate() {
            for row in 0..GLYPH_H {
                if bits & (1 << row) == 0 {
                    continue;
                }
                let px = x + (col as u32 * scale) as i32;
                let py = y + (row * scale) as i32;
                self.fill_rect(px, py, scale, scale, color);
            }
        }
    }

    /// Draw `text` starting at (x, y). Returns the x after the last glyph.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, scale: u32, color: Rgba) -> i32 {
        let mut cx = x;
        for ch in text.chars() {
            self.draw_char(ch, cx, y, scale, color);
            cx += ((GLYPH_W + 1) * scale) as i32;
        }
        cx
    }

    /// Nearest-neighbour blit of an RGBA8 image scaled by `scale` with its
    /// top-left corner at (x0, y0).
    pub fn blit_scaled(&mut self, src: &[u8], src_w: u32, src_h: u32, x0: f32, y0: f32, scale: f32) {
        if src_w == 0 || src_h == 0 || scale <= 0.0 {
            return;
        }
        let dx_start = x0.max(0.0) as u32;
        let dy_start = y0.max(0.0) as u32;
        let dx_end = ((x0 + src_w as f32 * scale).ceil().max(0.0) as u32).min(self.width);
        let dy_end = ((y0 + src_h as f32 * scale).ceil().max(0.0) as u32).min(self.height);
        let inv = 1.0 / scale;

        for dy in dy_start..dy_end {
            let sy = ((dy as f32 - y0) * inv) as u32;
            if sy >= src_h {
                continue;
            }
            for dx in dx_start..dx_end {
                let sx = ((dx as f32 - x0) * inv) as u32;
                if sx >= src_w {
                    continue;
                }
                let si = (sy as usize * src_w as usize + sx as usize) * 4;
                let Some(p) = src.get(si..si + 4) else { continue };
                if p[3] == 0 {
                    continue;
                }
                let di = dy as usize * self.width as usize + dx as usize;
                blend(&mut self.buf[di], (p[0], p[1], p[2], p[3]));
            }
        }
    }
}

pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * (GLYPH_W + 1) * scale
}

pub fn line_height(scale: u32) -> i32 {
    (GLYPH_H * scale + 4) as i32
}

pub fn fit_scale(img_w: f32, img_h: f32, win_w: f32, win_h: f32) -> f32 {
    (win_w / img_w).min(win_h / img_h)
}
