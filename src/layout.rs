//! Layout System - Where Every Label Goes
//!
//! The built-in layout reproduces the mod's title screen. A JSON file with the
//! same shape can replace it without touching code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Substituted with the version string inside run text.
pub const VERSION_PLACEHOLDER: &str = "{version}";

pub const TITLE_COLOR: [u8; 3] = [67, 93, 145];

pub const LARGE_FONT: FontSlot = FontSlot { face: Face::Title, size: 9.0 };
pub const SMALL_FONT: FontSlot = FontSlot { face: Face::Title, size: 6.0 };
pub const URL_FONT: FontSlot = FontSlot { face: Face::Label, size: 11.0 };
pub const ALPHA_FONT: FontSlot = FontSlot { face: Face::Label, size: 14.0 };

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Failed to read layout {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse layout {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid layout: {0}")]
    Invalid(String),
}

/// The two font families used on the title screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Title,
    Label,
}

/// A face at one em size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSlot {
    pub face: Face,
    pub size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontFiles {
    pub title: PathBuf,
    pub label: PathBuf,
}

impl FontFiles {
    pub fn path(&self, face: Face) -> &Path {
        match face {
            Face::Title => &self.title,
            Face::Label => &self.label,
        }
    }
}

/// Both files receive the same composed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPaths {
    /// The normal title screen.
    pub normal: PathBuf,
    /// The "Stop Playing!" title screen.
    pub stop_playing: PathBuf,
}

impl OutputPaths {
    pub fn all(&self) -> [&Path; 2] {
        [&self.normal, &self.stop_playing]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub font: FontSlot,
    /// Manual nudge from the group's computed origin.
    #[serde(default)]
    pub offset: [i32; 2],
}

impl TextRun {
    pub fn new(text: &str, font: FontSlot, offset: [i32; 2]) -> Self {
        Self {
            text: text.to_string(),
            font,
            offset,
        }
    }

    /// Run text with the version substituted in.
    pub fn resolve(&self, version: &str) -> String {
        self.text.replace(VERSION_PLACEHOLDER, version)
    }
}

/// Which width an inline group is centered on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InlineCentering {
    /// The group's own measured extent.
    #[default]
    Measured,
    /// The width of the last line of the preceding stacked group. Reproduces
    /// the historical title screen pixel for pixel.
    PrecedingLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum GroupAlignment {
    /// Every run is centered on its own measured width.
    Stacked,
    /// Runs keep their relative offsets and share one centering width.
    Inline {
        #[serde(default)]
        centering: InlineCentering,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGroup {
    pub name: String,
    pub anchor: [i32; 2],
    pub alignment: GroupAlignment,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleScreenLayout {
    pub template: PathBuf,
    pub outputs: OutputPaths,
    pub fonts: FontFiles,
    pub color: [u8; 3],
    pub groups: Vec<TextGroup>,
}

impl TitleScreenLayout {
    /// The mod's title screen, with every path rooted at `project_dir`.
    pub fn for_project(project_dir: &Path) -> Self {
        let fonts_dir = project_dir.join("scripts").join("fonts");
        let main_menu_dir = project_dir
            .join("mod")
            .join("resources")
            .join("gfx")
            .join("ui")
            .join("main menu");

        Self {
            template: main_menu_dir.join("titlemenu-template.png"),
            outputs: OutputPaths {
                normal: main_menu_dir.join("titlemenu.png"),
                stop_playing: main_menu_dir.join("titlemenu_2.png"),
            },
            fonts: FontFiles {
                title: fonts_dir.join("jelly-crazies.ttf"),
                label: fonts_dir.join("vera.ttf"),
            },
            color: TITLE_COLOR,
            groups: default_groups(),
        }
    }

    /// Load a JSON layout. Relative paths resolve against `project_dir`.
    pub fn load_from_file(path: &Path, project_dir: &Path) -> Result<Self, LayoutError> {
        let content = fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let layout: Self = serde_json::from_str(&content).map_err(|source| LayoutError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let layout = layout.rooted_at(project_dir);
        layout.validate()?;
        Ok(layout)
    }

    fn rooted_at(mut self, project_dir: &Path) -> Self {
        // join() keeps absolute paths as they are
        self.template = project_dir.join(&self.template);
        self.outputs.normal = project_dir.join(&self.outputs.normal);
        self.outputs.stop_playing = project_dir.join(&self.outputs.stop_playing);
        self.fonts.title = project_dir.join(&self.fonts.title);
        self.fonts.label = project_dir.join(&self.fonts.label);
        self
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.outputs.normal == self.outputs.stop_playing {
            return Err(LayoutError::Invalid(
                "normal and stop-playing outputs must be different files".into(),
            ));
        }
        if self.outputs.all().contains(&self.template.as_path()) {
            return Err(LayoutError::Invalid(
                "an output path would overwrite the template".into(),
            ));
        }
        for group in &self.groups {
            if group.runs.is_empty() {
                return Err(LayoutError::Invalid(format!("group '{}' has no runs", group.name)));
            }
            if let Some(run) = group.runs.iter().find(|r| !(r.font.size > 0.0)) {
                return Err(LayoutError::Invalid(format!(
                    "run '{}' in group '{}' has font size {}",
                    run.text, group.name, run.font.size
                )));
            }
        }
        Ok(())
    }
}

fn default_groups() -> Vec<TextGroup> {
    vec![
        TextGroup {
            name: "title".to_string(),
            anchor: [415, 210],
            alignment: GroupAlignment::Stacked,
            runs: vec![
                TextRun::new("Achievement", URL_FONT, [0, 0]),
                TextRun::new("Randomizer", URL_FONT, [0, 10]),
            ],
        },
        TextGroup {
            name: "version".to_string(),
            anchor: [420, 240],
            alignment: GroupAlignment::Inline {
                centering: InlineCentering::Measured,
            },
            runs: vec![
                TextRun::new("V", SMALL_FONT, [0, 0]),
                TextRun::new(VERSION_PLACEHOLDER, LARGE_FONT, [10, -6]),
            ],
        },
        TextGroup {
            name: "status".to_string(),
            anchor: [415, 255],
            alignment: GroupAlignment::Stacked,
            runs: vec![TextRun::new("ALPHA", ALPHA_FONT, [0, 0])],
        },
    ]
}
