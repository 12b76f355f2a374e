//! titlestamp - Title Screen Version Stamper
//!
//! Stamps the mod title, the current version and a status label onto the
//! title screen template and writes the normal and "Stop Playing!" screens.
//!
//! # Guarantees
//! 1. Every run starts from the unmodified template
//! 2. Both outputs receive the same bytes
//! 3. Nothing is written until drawing and encoding have succeeded

pub mod layout;
pub mod fonts;
pub mod validation;
pub mod hashing;
pub mod version;
pub mod compose;

pub use layout::{Face, FontSlot, GroupAlignment, InlineCentering, TextGroup, TextRun, TitleScreenLayout};
pub use fonts::{FontSet, TextExtent, TrueTypeFace, Typeface};
pub use validation::{PlacementRule, PlacementValidator, PlacementViolation};
pub use hashing::{pixel_digest, sha256_hex};
pub use version::{is_semver, version_from_package_json};
pub use compose::{confirmation_message, ComposeError, PlacedRun, StampReport, TitleScreenComposer};

pub const STAMPER_VERSION: &str = env!("CARGO_PKG_VERSION");
