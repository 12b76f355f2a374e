//! Title Screen Composer - Single Entry Point
//!
//! Load the template, plan every run, draw, encode once, then write.
//! Nothing touches the output files until the final PNG bytes exist.

use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fonts::{FontError, FontSet, TextExtent};
use crate::hashing::{pixel_digest, sha256_hex};
use crate::layout::{FontSlot, GroupAlignment, InlineCentering, LayoutError, TextRun, TitleScreenLayout};
use crate::validation::{PlacementValidator, PlacementViolation};
use crate::STAMPER_VERSION;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Failed to load template {}: {source}", .path.display())]
    TemplateLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Font(#[from] FontError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Failed to encode title screen: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A run with its text resolved and its origin computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedRun {
    pub group: String,
    pub text: String,
    pub font: FontSlot,
    pub extent: TextExtent,
    /// Top-left of the line box.
    pub x: f32,
    pub y: f32,
}

impl PlacedRun {
    pub fn right(&self) -> f32 {
        self.x + self.extent.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.extent.height
    }

    pub fn overlaps(&self, other: &PlacedRun) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

/// What a finished stamp produced.
#[derive(Debug, Clone, Serialize)]
pub struct StampReport {
    pub version: String,
    pub stamper_version: String,
    pub template: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub size: [u32; 2],
    pub png_sha256: String,
    pub pixel_sha256: String,
    pub placements: Vec<PlacedRun>,
    pub violations: Vec<PlacementViolation>,
}

/// Composed pixels before anything is written.
pub struct Rendered {
    pub image: DynamicImage,
    pub placements: Vec<PlacedRun>,
    pub violations: Vec<PlacementViolation>,
}

pub fn confirmation_message(version: &str) -> String {
    format!("The title screen image was updated to version: {}", version)
}

/// Left edge that centers `width` on `anchor_x`.
pub fn centered_x(anchor_x: i32, width: f32) -> f32 {
    anchor_x as f32 - width / 2.0
}

pub struct TitleScreenComposer {
    layout: TitleScreenLayout,
    fonts: FontSet,
    validator: PlacementValidator,
}

impl TitleScreenComposer {
    /// Loads both font files named by the layout.
    pub fn new(layout: TitleScreenLayout) -> Result<Self, ComposeError> {
        layout.validate()?;
        let fonts = FontSet::load(&layout.fonts)?;
        Self::with_fonts(layout, fonts)
    }

    pub fn with_fonts(layout: TitleScreenLayout, fonts: FontSet) -> Result<Self, ComposeError> {
        layout.validate()?;
        Ok(Self {
            layout,
            fonts,
            validator: PlacementValidator::new(),
        })
    }

    pub fn layout(&self) -> &TitleScreenLayout {
        &self.layout
    }

    /// Resolve, measure and position every run. No I/O.
    pub fn plan(&self, version: &str) -> Vec<PlacedRun> {
        let mut placed = vec![];
        // Width of the last stacked line, for InlineCentering::PrecedingLine.
        let mut last_line_width = 0.0_f32;

        for group in &self.layout.groups {
            let measured: Vec<(&TextRun, String, TextExtent)> = group
                .runs
                .iter()
                .map(|run| {
                    let text = run.resolve(version);
                    let extent = self.fonts.face(run.font.face).measure(&text, run.font.size);
                    (run, text, extent)
                })
                .collect();

            let [anchor_x, anchor_y] = group.anchor;
            match group.alignment {
                GroupAlignment::Stacked => {
                    for (run, text, extent) in measured {
                        last_line_width = extent.width;
                        placed.push(PlacedRun {
                            group: group.name.clone(),
                            text,
                            font: run.font,
                            extent,
                            x: centered_x(anchor_x, extent.width) + run.offset[0] as f32,
                            y: (anchor_y + run.offset[1]) as f32,
                        });
                    }
                }
                GroupAlignment::Inline { centering } => {
                    let width = match centering {
                        InlineCentering::Measured => inline_width(&measured),
                        InlineCentering::PrecedingLine => last_line_width,
                    };
                    let left = centered_x(anchor_x, width);
                    let min_dx = measured.iter().map(|(run, _, _)| run.offset[0]).min().unwrap_or(0);
                    for (run, text, extent) in measured {
                        placed.push(PlacedRun {
                            group: group.name.clone(),
                            text,
                            font: run.font,
                            extent,
                            x: left + (run.offset[0] - min_dx) as f32,
                            y: (anchor_y + run.offset[1]) as f32,
                        });
                    }
                }
            }
        }

        for run in &placed {
            debug!(group = %run.group, text = %run.text, x = run.x, y = run.y, width = run.extent.width, "Placed run");
        }
        placed
    }

    /// Load the template and draw onto it. Writes nothing.
    pub fn render(&self, version: &str) -> Result<Rendered, ComposeError> {
        let template = image::open(&self.layout.template).map_err(|source| ComposeError::TemplateLoad {
            path: self.layout.template.clone(),
            source,
        })?;
        let keep_alpha = template.color().has_alpha();
        let mut canvas = template.to_rgba8();

        let placements = self.plan(version);
        let violations = self.validator.validate(&placements, [canvas.width(), canvas.height()]);
        for v in &violations {
            warn!(rule = %v.rule, group = %v.group, text = %v.text, "{}", v.message);
        }

        for run in &placements {
            let face = self.fonts.face(run.font.face);
            face.rasterize(&run.text, run.font.size, (run.x, run.y), &mut |x, y, coverage| {
                blend(&mut canvas, x, y, self.layout.color, coverage);
            });
        }

        let image = if keep_alpha {
            DynamicImage::ImageRgba8(canvas)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        };

        Ok(Rendered {
            image,
            placements,
            violations,
        })
    }

    /// Stamp `version` onto the template and write both title screens.
    pub fn compose(&self, version: &str) -> Result<StampReport, ComposeError> {
        let rendered = self.render(version)?;
        let png = encode_png(&rendered.image)?;

        let outputs = self.layout.outputs.all();
        for path in outputs {
            fs::write(path, &png).map_err(|source| ComposeError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), bytes = png.len(), "Wrote title screen");
        }

        Ok(StampReport {
            version: version.to_string(),
            stamper_version: STAMPER_VERSION.to_string(),
            template: self.layout.template.clone(),
            outputs: outputs.iter().map(|p| p.to_path_buf()).collect(),
            size: [rendered.image.width(), rendered.image.height()],
            png_sha256: sha256_hex(&png),
            pixel_sha256: pixel_digest(&rendered.image),
            placements: rendered.placements,
            violations: rendered.violations,
        })
    }
}

/// Horizontal span of an inline group, from its leftmost offset to the
/// furthest right edge.
fn inline_width(measured: &[(&TextRun, String, TextExtent)]) -> f32 {
    let Some(min_dx) = measured.iter().map(|(run, _, _)| run.offset[0]).min() else {
        return 0.0;
    };
    measured
        .iter()
        .map(|(run, _, extent)| (run.offset[0] - min_dx) as f32 + extent.width)
        .fold(0.0, f32::max)
}

fn blend(canvas: &mut RgbaImage, x: i32, y: i32, color: [u8; 3], coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage == 0.0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let inv = 1.0 - coverage;
    for c in 0..3 {
        dst.0[c] = (color[c] as f32 * coverage + dst.0[c] as f32 * inv).round() as u8;
    }
    dst.0[3] = (dst.0[3] as f32 + (255.0 - dst.0[3] as f32) * coverage).round() as u8;
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ComposeError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(ComposeError::Encode)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::Typeface;
    use crate::layout::{Face, LARGE_FONT, SMALL_FONT, URL_FONT};
    use image::Rgba;
    use std::path::Path;

    /// Every glyph is a solid box `0.6 * size` wide and `size` tall.
    struct BlockFace;

    impl Typeface for BlockFace {
        fn measure(&self, text: &str, size: f32) -> TextExtent {
            TextExtent {
                width: text.chars().count() as f32 * size * 0.6,
                height: size,
                ascent: size * 0.8,
            }
        }

        fn rasterize(&self, text: &str, size: f32, origin: (f32, f32), plot: &mut dyn FnMut(i32, i32, f32)) {
            for (i, _) in text.chars().enumerate() {
                let left = origin.0 + i as f32 * size * 0.6;
                for x in left.floor() as i32..(left + size * 0.6).floor() as i32 {
                    for y in origin.1.floor() as i32..(origin.1 + size).floor() as i32 {
                        plot(x, y, 1.0);
                    }
                }
            }
        }
    }

    fn composer() -> TitleScreenComposer {
        TitleScreenComposer::with_fonts(
            TitleScreenLayout::for_project(Path::new("/proj")),
            FontSet::new(BlockFace, BlockFace),
        )
        .unwrap()
    }

    fn group<'a>(placed: &'a [PlacedRun], name: &str) -> Vec<&'a PlacedRun> {
        placed.iter().filter(|r| r.group == name).collect()
    }

    #[test]
    fn test_confirmation_message() {
        assert_eq!(
            confirmation_message("1.2.3"),
            "The title screen image was updated to version: 1.2.3"
        );
    }

    #[test]
    fn test_stacked_lines_center_on_own_width() {
        let placed = composer().plan("1.0.0");
        let title = group(&placed, "title");
        assert_eq!(title.len(), 2);

        let achievement = 11.0 * 11.0 * 0.6;
        assert_eq!(title[0].text, "Achievement");
        assert_eq!(title[0].x, 415.0 - achievement / 2.0);
        assert_eq!(title[0].y, 210.0);

        let randomizer = 10.0 * 11.0 * 0.6;
        assert_eq!(title[1].x, 415.0 - randomizer / 2.0);
        assert_eq!(title[1].y, 220.0);
    }

    #[test]
    fn test_inline_group_shares_one_origin() {
        let placed = composer().plan("1.2.3");
        let version = group(&placed, "version");
        assert_eq!(version[0].text, "V");
        assert_eq!(version[0].font, SMALL_FONT);
        assert_eq!(version[1].text, "1.2.3");
        assert_eq!(version[1].font, LARGE_FONT);

        let width = 10.0 + 5.0 * 9.0 * 0.6;
        assert_eq!(version[0].x, 420.0 - width / 2.0);
        assert_eq!(version[1].x, version[0].x + 10.0);
        assert_eq!(version[0].y, 240.0);
        assert_eq!(version[1].y, 234.0);
    }

    #[test]
    fn test_preceding_line_centering_reuses_title_width() {
        let mut layout = TitleScreenLayout::for_project(Path::new("/proj"));
        layout.groups[1].alignment = GroupAlignment::Inline {
            centering: InlineCentering::PrecedingLine,
        };
        let composer = TitleScreenComposer::with_fonts(layout, FontSet::new(BlockFace, BlockFace)).unwrap();

        let randomizer = BlockFace.measure("Randomizer", URL_FONT.size).width;
        for version in ["1", "1.2.3", "10.20.30-rc.1+build"] {
            let placed = composer.plan(version);
            let v = group(&placed, "version");
            assert_eq!(v[0].x, 420.0 - randomizer / 2.0);
        }
    }

    #[test]
    fn test_inline_width_ignores_leading_offset() {
        let a = TextRun::new("V", SMALL_FONT, [4, 0]);
        let b = TextRun::new("{version}", LARGE_FONT, [14, 0]);
        let measured = vec![
            (&a, "V".to_string(), TextExtent { width: 3.0, height: 6.0, ascent: 5.0 }),
            (&b, "1".to_string(), TextExtent { width: 5.0, height: 9.0, ascent: 7.0 }),
        ];
        assert_eq!(inline_width(&measured), 15.0);
        assert_eq!(inline_width(&[]), 0.0);
    }

    #[test]
    fn test_blend_coverage() {
        let mut canvas = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        blend(&mut canvas, 0, 0, [67, 93, 145], 1.0);
        blend(&mut canvas, 1, 0, [67, 93, 145], 0.5);
        blend(&mut canvas, 5, 5, [0, 0, 0], 1.0);
        blend(&mut canvas, -1, 0, [0, 0, 0], 1.0);

        assert_eq!(canvas.get_pixel(0, 0), &Rgba([67, 93, 145, 255]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgba([161, 174, 200, 255]));
    }

    #[test]
    fn test_blend_raises_alpha_on_transparent() {
        let mut canvas = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        blend(&mut canvas, 0, 0, [67, 93, 145], 1.0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([67, 93, 145, 255]));
    }

    #[test]
    fn test_with_fonts_rejects_invalid_layout() {
        let mut layout = TitleScreenLayout::for_project(Path::new("/proj"));
        layout.outputs.stop_playing = layout.outputs.normal.clone();
        let err = TitleScreenComposer::with_fonts(layout, FontSet::new(BlockFace, BlockFace)).err().unwrap();
        assert!(matches!(err, ComposeError::Layout(_)));

        let mut layout = TitleScreenLayout::for_project(Path::new("/proj"));
        layout.outputs.normal = layout.template.clone();
        let err = TitleScreenComposer::with_fonts(layout, FontSet::new(BlockFace, BlockFace)).err().unwrap();
        assert!(err.to_string().contains("template"));
    }

    #[test]
    fn test_plan_uses_assigned_faces() {
        let placed = composer().plan("2");
        let faces: Vec<Face> = placed.iter().map(|r| r.font.face).collect();
        assert_eq!(faces, vec![Face::Label, Face::Label, Face::Title, Face::Title, Face::Label]);
    }
}
