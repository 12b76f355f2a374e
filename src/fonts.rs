//! Fonts - Measuring and Rasterizing Text
//!
//! Sizes are em sizes in pixels, the way FreeType point sizes behave, so a
//! layout written against the old tool keeps its proportions.

use rusttype::{point, Font, Scale};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::layout::{Face, FontFiles};

#[derive(Debug, Error)]
pub enum FontError {
    #[error("Failed to read font {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not a TrueType/OpenType font: {}", .0.display())]
    Parse(PathBuf),
}

/// Size of a line of text. The line box starts at the draw origin and the
/// baseline sits `ascent` pixels below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
    pub ascent: f32,
}

pub trait Typeface {
    fn measure(&self, text: &str, size: f32) -> TextExtent;

    /// Calls `plot(x, y, coverage)` for every pixel the text touches when its
    /// line box starts at `origin`. Pixels may fall outside any canvas.
    fn rasterize(&self, text: &str, size: f32, origin: (f32, f32), plot: &mut dyn FnMut(i32, i32, f32));
}

pub struct TrueTypeFace {
    path: PathBuf,
    font: Font<'static>,
}

impl TrueTypeFace {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let data = fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Font::try_from_vec(data).ok_or_else(|| FontError::Parse(path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), glyphs = font.glyph_count(), "Loaded font");
        Ok(Self {
            path: path.to_path_buf(),
            font,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// rusttype scales by ascent - descent, so convert from em size.
    fn scale(&self, size: f32) -> Scale {
        let v = self.font.v_metrics_unscaled();
        let units_per_em = f32::from(self.font.units_per_em());
        Scale::uniform(size * (v.ascent - v.descent) / units_per_em)
    }
}

impl Typeface for TrueTypeFace {
    fn measure(&self, text: &str, size: f32) -> TextExtent {
        let scale = self.scale(size);
        let v = self.font.v_metrics(scale);
        let width = self
            .font
            .layout(text, scale, point(0.0, v.ascent))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);

        TextExtent {
            width,
            height: v.ascent - v.descent,
            ascent: v.ascent,
        }
    }

    fn rasterize(&self, text: &str, size: f32, origin: (f32, f32), plot: &mut dyn FnMut(i32, i32, f32)) {
        let scale = self.scale(size);
        let v = self.font.v_metrics(scale);
        let start = point(origin.0, origin.1 + v.ascent);

        for glyph in self.font.layout(text, scale, start) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    plot(bb.min.x + gx as i32, bb.min.y + gy as i32, coverage);
                });
            }
        }
    }
}

/// The loaded title and label faces.
pub struct FontSet {
    title: Box<dyn Typeface>,
    label: Box<dyn Typeface>,
}

impl FontSet {
    pub fn new(title: impl Typeface + 'static, label: impl Typeface + 'static) -> Self {
        Self {
            title: Box::new(title),
            label: Box::new(label),
        }
    }

    pub fn load(files: &FontFiles) -> Result<Self, FontError> {
        Ok(Self::new(
            TrueTypeFace::load(files.path(Face::Title))?,
            TrueTypeFace::load(files.path(Face::Label))?,
        ))
    }

    pub fn face(&self, face: Face) -> &dyn Typeface {
        match face {
            Face::Title => self.title.as_ref(),
            Face::Label => self.label.as_ref(),
        }
    }
}
