//! Placement Validation - Rule/Policy Separation
//!
//! Rules inspect planned runs and produce structured violations.
//! Violations never block a stamp: the composer logs them and clips.

use serde::Serialize;

use crate::compose::PlacedRun;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementViolation {
    pub rule: String,
    pub group: String,
    pub text: String,
    pub message: String,
    /// x, y, width, height of the offending line box.
    pub bounds: [f32; 4],
}

impl PlacementViolation {
    fn new(rule: &str, run: &PlacedRun, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            group: run.group.clone(),
            text: run.text.clone(),
            message,
            bounds: [run.x, run.y, run.extent.width, run.extent.height],
        }
    }
}

/// Placement rule trait - produces violations
pub trait PlacementRule {
    fn name(&self) -> &'static str;
    fn check(&self, placed: &[PlacedRun], canvas: [u32; 2]) -> Vec<PlacementViolation>;
}

// --- Concrete Rules ---

/// Text must land inside the template.
pub struct CanvasBoundsRule;

impl PlacementRule for CanvasBoundsRule {
    fn name(&self) -> &'static str { "canvas_bounds" }

    fn check(&self, placed: &[PlacedRun], canvas: [u32; 2]) -> Vec<PlacementViolation> {
        let [width, height] = canvas;
        placed
            .iter()
            .filter(|run| {
                run.x < 0.0
                    || run.y < 0.0
                    || run.right() > width as f32
                    || run.bottom() > height as f32
            })
            .map(|run| {
                PlacementViolation::new(
                    self.name(),
                    run,
                    format!("Text leaves the {}x{} template and will be clipped", width, height),
                )
            })
            .collect()
    }
}

/// Runs from different groups must not cover each other.
pub struct GroupOverlapRule;

impl PlacementRule for GroupOverlapRule {
    fn name(&self) -> &'static str { "group_overlap" }

    fn check(&self, placed: &[PlacedRun], _canvas: [u32; 2]) -> Vec<PlacementViolation> {
        let mut violations = vec![];
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                if a.group != b.group && a.overlaps(b) {
                    violations.push(PlacementViolation::new(
                        self.name(),
                        b,
                        format!("Overlaps '{}' from group '{}'", a.text, a.group),
                    ));
                }
            }
        }
        violations
    }
}

/// Validator runs every rule over a plan
pub struct PlacementValidator {
    rules: Vec<Box<dyn PlacementRule>>,
}

impl PlacementValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(CanvasBoundsRule), Box::new(GroupOverlapRule)],
        }
    }

    pub fn validate(&self, placed: &[PlacedRun], canvas: [u32; 2]) -> Vec<PlacementViolation> {
        self.rules
            .iter()
            .flat_map(|rule| rule.check(placed, canvas))
            .collect()
    }
}

impl Default for PlacementValidator {
    fn default() -> Self {
        Self::new()
    }
}
