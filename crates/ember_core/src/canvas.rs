//! Canvas abstraction handed to scene nodes during a frame
//!
//! The engine never draws by itself; it passes a [`Canvas`] from the active
//! surface to the root's subtree. [`PixelCanvas`] is the CPU implementation
//! used by the software surface, headless rendering and screenshots.

use crate::geometry::{Affine2D, Color, Rect, Size};

/// Drawing target for one frame
pub trait Canvas: Send {
    /// Backing size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Push the current transform and opacity
    fn save(&mut self);

    /// Pop to the last saved transform and opacity
    fn restore(&mut self);

    /// Pre-multiply the current transform
    fn concat(&mut self, transform: &Affine2D);

    /// Multiply the current opacity
    fn multiply_opacity(&mut self, opacity: f32);

    /// Fill the whole target, ignoring transform and opacity
    fn clear(&mut self, color: Color);

    /// Fill a rect in local coordinates
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Copy out the composed pixels, if this canvas can be read back
    fn snapshot(&self) -> Option<Snapshot>;

    fn translate(&mut self, dx: f32, dy: f32) {
        self.concat(&Affine2D::translation(dx, dy));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.concat(&Affine2D::scale(sx, sy));
    }

    /// True when there is nothing to draw into
    fn is_empty(&self) -> bool {
        let (w, h) = self.size();
        w == 0 || h == 0
    }
}

/// RGBA8 copy of a composed frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8, row-major, no padding
    pub pixels: Vec<u8>,
}

impl Snapshot {
    /// Read one pixel; `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

#[derive(Clone, Copy, Debug)]
struct CanvasState {
    transform: Affine2D,
    opacity: f32,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            transform: Affine2D::IDENTITY,
            opacity: 1.0,
        }
    }
}

/// CPU raster canvas
///
/// Rects are filled by their transformed axis-aligned bounds, which is exact
/// for translate/scale chains.
#[derive(Clone, Debug)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    state: CanvasState,
    stack: Vec<CanvasState>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            state: CanvasState::default(),
            stack: Vec::new(),
        }
    }

    /// Reallocate the backing buffer; contents are cleared
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width as usize) * (height as usize) * 4];
    }

    /// Reset transform/opacity state before a new frame
    pub fn reset_state(&mut self) {
        self.state = CanvasState::default();
        self.stack.clear();
    }

    pub fn logical_size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn blend(&mut self, x: u32, y: u32, src: [f32; 4]) {
        let i = ((y * self.width + x) * 4) as usize;
        let dst = &mut self.pixels[i..i + 4];
        let sa = src[3];
        if sa >= 1.0 {
            for c in 0..3 {
                dst[c] = (src[c].clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            dst[3] = 255;
            return;
        }
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            dst.copy_from_slice(&[0, 0, 0, 0]);
            return;
        }
        for c in 0..3 {
            let d = dst[c] as f32 / 255.0;
            let v = (src[c] * sa + d * da * (1.0 - sa)) / out_a;
            dst[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        dst[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

impl Canvas for PixelCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        } else {
            tracing::trace!("PixelCanvas::restore with empty stack");
        }
    }

    fn concat(&mut self, transform: &Affine2D) {
        self.state.transform = self.state.transform.then(transform);
    }

    fn multiply_opacity(&mut self, opacity: f32) {
        self.state.opacity *= opacity.clamp(0.0, 1.0);
    }

    fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba8();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let alpha = color.a * self.state.opacity;
        if alpha <= 0.0 || self.width == 0 || self.height == 0 {
            return;
        }
        let device = self.state.transform.transform_rect(rect);
        let bounds = Rect::new(0.0, 0.0, self.width as f32, self.height as f32);
        let Some(clip) = device.intersection(&bounds) else {
            return;
        };
        let x0 = clip.x().floor().max(0.0) as u32;
        let y0 = clip.y().floor().max(0.0) as u32;
        let x1 = (clip.right().ceil() as u32).min(self.width);
        let y1 = (clip.bottom().ceil() as u32).min(self.height);
        let src = [color.r, color.g, color.b, alpha];
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, src);
            }
        }
    }

    fn snapshot(&self) -> Option<Snapshot> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(Snapshot {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        })
    }
}
