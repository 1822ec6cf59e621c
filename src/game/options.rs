//! Entity Options
//!
//! Every field is optional so three layers can be merged key by key:
//! factory defaults, then the options a kind was registered with, then the
//! parameters passed at the call site. A later layer wins for every field it
//! sets and leaves the others alone.
//!
//! Options are also readable from RON, so kinds can be tuned from data files:
//!
//! ```ron
//! (width: 2.0, color: 0xFF0000, fixed: true)
//! ```

use serde::{Deserialize, Serialize};

pub const WHITE: u32 = 0xFFFFFF;
pub const RED: u32 = 0xFF0000;
pub const GREEN: u32 = 0x00FF00;
pub const BLUE: u32 = 0x0000FF;
pub const YELLOW: u32 = 0xFFFF00;

/// Layered creation options for a box, sphere, trigger or actor.
///
/// Fields that make no sense for a factory are ignored by it (a sphere never
/// reads `width`, a box never reads `radius`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityOptions {
    pub position: Option<[f32; 3]>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub depth: Option<f32>,
    pub radius: Option<f32>,
    /// 0xRRGGBB
    pub color: Option<u32>,
    pub texture_path: Option<String>,
    /// Texture repeat along u and v
    pub texture_size: Option<[f32; 2]>,
    pub debug_color: Option<u32>,
    pub show_debug: Option<bool>,
    /// Make the body static after creation
    pub fixed: Option<bool>,
    pub is_sensor: Option<bool>,
    /// Key other kinds use to pick a collision handler for this entity
    pub collision_key: Option<String>,
    pub tag: Option<String>,
}

impl EntityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `over` on top of `self`: fields set in `over` win.
    pub fn merge(&self, over: &EntityOptions) -> EntityOptions {
        EntityOptions {
            position: over.position.or(self.position),
            width: over.width.or(self.width),
            height: over.height.or(self.height),
            depth: over.depth.or(self.depth),
            radius: over.radius.or(self.radius),
            color: over.color.or(self.color),
            texture_path: over.texture_path.clone().or_else(|| self.texture_path.clone()),
            texture_size: over.texture_size.or(self.texture_size),
            debug_color: over.debug_color.or(self.debug_color),
            show_debug: over.show_debug.or(self.show_debug),
            fixed: over.fixed.or(self.fixed),
            is_sensor: over.is_sensor.or(self.is_sensor),
            collision_key: over.collision_key.clone().or_else(|| self.collision_key.clone()),
            tag: over.tag.clone().or_else(|| self.tag.clone()),
        }
    }

    /// `defaults < class < params`
    pub fn layered(defaults: &EntityOptions, class: &EntityOptions, params: &EntityOptions) -> EntityOptions {
        defaults.merge(class).merge(params)
    }

    /// Parse options from RON. Plain values are accepted for optional
    /// fields and unknown fields are skipped.
    pub fn from_ron_str(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(s)
    }

    // =========================================================================
    // Builder setters
    // =========================================================================

    pub fn position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Some([x, y, z]);
        self
    }

    pub fn size(mut self, width: f32, height: f32, depth: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self.depth = Some(depth);
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn texture(mut self, path: impl Into<String>, repeat: [f32; 2]) -> Self {
        self.texture_path = Some(path.into());
        self.texture_size = Some(repeat);
        self
    }

    pub fn debug(mut self, show: bool, color: u32) -> Self {
        self.show_debug = Some(show);
        self.debug_color = Some(color);
        self
    }

    pub fn fixed(mut self, fixed: bool) -> Self {
        self.fixed = Some(fixed);
        self
    }

    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = Some(is_sensor);
        self
    }

    pub fn collision_key(mut self, key: impl Into<String>) -> Self {
        self.collision_key = Some(key.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    // =========================================================================
    // Resolved accessors (used by factories after merging)
    // =========================================================================

    pub fn position_or_origin(&self) -> [f32; 3] {
        self.position.unwrap_or([0.0, 0.0, 0.0])
    }

    pub fn box_size(&self) -> [f32; 3] {
        [
            self.width.unwrap_or(1.0),
            self.height.unwrap_or(1.0),
            self.depth.unwrap_or(1.0),
        ]
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_merge() {
        let defaults = EntityOptions::new().color(WHITE).fixed(false);
        let class = EntityOptions::new().color(RED);
        let params = EntityOptions::new().fixed(true);

        let merged = EntityOptions::layered(&defaults, &class, &params);
        assert_eq!(merged.color, Some(RED));
        assert_eq!(merged.fixed, Some(true));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = EntityOptions::new().size(2.0, 3.0, 4.0).tag("crate");
        let over = EntityOptions::new().radius(0.5);

        let merged = base.merge(&over);
        assert_eq!(merged.box_size(), [2.0, 3.0, 4.0]);
        assert_eq!(merged.radius, Some(0.5));
        assert_eq!(merged.tag.as_deref(), Some("crate"));
    }

    #[test]
    fn test_empty_layers_fall_back() {
        let merged = EntityOptions::layered(&EntityOptions::new(), &EntityOptions::new(), &EntityOptions::new());
        assert_eq!(merged, EntityOptions::default());
        assert_eq!(merged.position_or_origin(), [0.0, 0.0, 0.0]);
        assert_eq!(merged.box_size(), [1.0, 1.0, 1.0]);
        assert!(!merged.is_fixed());
    }

    #[test]
    fn test_from_ron() {
        let opts = EntityOptions::from_ron_str(
            "(width: 2.0, color: 0xFF0000, fixed: true, collision_key: \"hazard\", wobble: 3)",
        )
        .unwrap();

        assert_eq!(opts.width, Some(2.0));
        assert_eq!(opts.color, Some(RED));
        assert_eq!(opts.fixed, Some(true));
        assert_eq!(opts.collision_key.as_deref(), Some("hazard"));
        assert_eq!(opts.height, None);
    }

    #[test]
    fn test_from_ron_rejects_garbage() {
        assert!(EntityOptions::from_ron_str("(width: \"wide\")").is_err());
    }
}
