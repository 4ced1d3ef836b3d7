//! Runtime panel layout specification.
//!
//! Panel JSON follows a versioned schema (`lcdseg.panel.v1`): a list of
//! per-digit records (bounding box plus optional shape knobs), a global
//! threshold fraction, and an optional frame rotation. Layouts can also be
//! assembled in code through [`PanelLayoutBuilder`].

use std::path::Path;

use crate::geometry::Point;
use crate::template::{ConfigError, DigitTemplate, ShapeParams};

const PANEL_SCHEMA_V1: &str = "lcdseg.panel.v1";

const DEFAULT_THRESHOLD: f32 = 0.5;

/// Configuration of a single digit cell.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DigitConfig {
    /// Bounding box diagonal `[x0, y0, x1, y1]` in frame pixels.
    pub bbox: [i32; 4],
    /// Proportional segment placement knobs.
    #[serde(default)]
    pub params: ShapeParams,
    /// A priori known character (e.g. a leading `1` the LCD can only ever
    /// display); the digit decodes to it regardless of samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<char>,
    /// Whether the cell carries a decimal-point sample site.
    #[serde(default)]
    pub decimal_point: bool,
}

/// Runtime panel layout used by the decoder.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelLayout {
    schema: String,
    /// Free-form panel name for logs and info output.
    pub name: String,
    /// Global threshold fraction `t ∈ (0, 1)`: a segment is "on" when its
    /// sample exceeds `min + t·(max − min)`.
    #[serde(default = "PanelLayout::default_threshold")]
    pub threshold: f32,
    /// Clockwise frame rotation in degrees applied before sampling.
    #[serde(default)]
    pub rotation_deg: f64,
    /// Digit cells in display order, most significant first.
    pub digits: Vec<DigitConfig>,
}

impl PanelLayout {
    fn default_threshold() -> f32 {
        DEFAULT_THRESHOLD
    }

    /// Parse and validate a layout from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let layout: PanelLayout = serde_json::from_str(json)
            .map_err(|e| ConfigError::Layout(format!("invalid JSON: {}", e)))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load and validate a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Layout(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Serialize the layout back to pretty JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Layout(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.schema != PANEL_SCHEMA_V1 {
            return Err(ConfigError::Layout(format!(
                "unsupported schema {:?}, expected {:?}",
                self.schema, PANEL_SCHEMA_V1
            )));
        }
        if self.digits.is_empty() {
            return Err(ConfigError::Layout("no digits configured".to_string()));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ConfigError::Layout(format!(
                "threshold {} outside (0, 1)",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Number of configured digit cells.
    pub fn digit_count(&self) -> usize {
        self.digits.len()
    }

    /// Build the digit templates for this layout.
    ///
    /// Fails on the first digit whose geometry is impossible; the decoder is
    /// never constructed in a half-valid state.
    pub(crate) fn build_templates(&self) -> Result<Vec<DigitTemplate>, ConfigError> {
        self.validate()?;
        self.digits
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let [x0, y0, x1, y1] = d.bbox;
                DigitTemplate::new(
                    i,
                    (Point::new(x0, y0), Point::new(x1, y1)),
                    d.params,
                    d.fixed,
                    d.decimal_point,
                )
            })
            .collect()
    }
}

/// Explicit builder for assembling a layout in code.
///
/// ```
/// use lcdseg::PanelLayoutBuilder;
///
/// let layout = PanelLayoutBuilder::new("test-meter")
///     .digit([0, 0, 30, 56])
///     .digit_with([40, 0, 70, 56], Default::default(), true)
///     .fixed_digit([80, 0, 110, 56], '1')
///     .threshold(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(layout.digit_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct PanelLayoutBuilder {
    name: String,
    threshold: f32,
    rotation_deg: f64,
    digits: Vec<DigitConfig>,
}

impl PanelLayoutBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            threshold: DEFAULT_THRESHOLD,
            rotation_deg: 0.0,
            digits: Vec::new(),
        }
    }

    /// Append a plain digit cell with default shape parameters.
    pub fn digit(mut self, bbox: [i32; 4]) -> Self {
        self.digits.push(DigitConfig {
            bbox,
            params: ShapeParams::default(),
            fixed: None,
            decimal_point: false,
        });
        self
    }

    /// Append a digit cell with explicit shape parameters and decimal point.
    pub fn digit_with(mut self, bbox: [i32; 4], params: ShapeParams, decimal_point: bool) -> Self {
        self.digits.push(DigitConfig {
            bbox,
            params,
            fixed: None,
            decimal_point,
        });
        self
    }

    /// Append a fixed digit cell that always reports `ch`.
    pub fn fixed_digit(mut self, bbox: [i32; 4], ch: char) -> Self {
        self.digits.push(DigitConfig {
            bbox,
            params: ShapeParams::default(),
            fixed: Some(ch),
            decimal_point: false,
        });
        self
    }

    /// Set the global threshold fraction.
    pub fn threshold(mut self, t: f32) -> Self {
        self.threshold = t;
        self
    }

    /// Set the clockwise frame rotation in degrees.
    pub fn rotation_deg(mut self, deg: f64) -> Self {
        self.rotation_deg = deg;
        self
    }

    /// Validate and produce the layout.
    pub fn build(self) -> Result<PanelLayout, ConfigError> {
        let layout = PanelLayout {
            schema: PANEL_SCHEMA_V1.to_string(),
            name: self.name,
            threshold: self.threshold,
            rotation_deg: self.rotation_deg,
            digits: self.digits,
        };
        layout.validate()?;
        // Surface geometry errors at build time, not first decode.
        layout.build_templates()?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "schema": "lcdseg.panel.v1",
            "name": "heatpump-lcd",
            "threshold": 0.5,
            "rotation_deg": 0.0,
            "digits": [
                { "bbox": [10, 10, 40, 66] },
                { "bbox": [50, 10, 80, 66], "decimal_point": true },
                { "bbox": [90, 10, 120, 66], "fixed": "1" }
            ]
        }"#
        .to_string()
    }

    #[test]
    fn parse_and_build_templates() {
        let layout = PanelLayout::from_json_str(&sample_json()).unwrap();
        assert_eq!(layout.digit_count(), 3);
        let templates = layout.build_templates().unwrap();
        assert!(templates[0].dp.is_none());
        assert!(templates[1].dp.is_some());
        assert_eq!(templates[2].fixed, Some('1'));
    }

    #[test]
    fn schema_mismatch_rejected() {
        let json = sample_json().replace("lcdseg.panel.v1", "lcdseg.panel.v9");
        let err = PanelLayout::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Layout(_)));
    }

    #[test]
    fn unknown_fields_rejected() {
        let json = sample_json().replace("\"name\"", "\"bogus\": 1, \"name\"");
        assert!(PanelLayout::from_json_str(&json).is_err());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let json = sample_json().replace("\"threshold\": 0.5", "\"threshold\": 1.5");
        let err = PanelLayout::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Layout(_)));
    }

    #[test]
    fn builder_rejects_bad_geometry() {
        let err = PanelLayoutBuilder::new("broken")
            .digit([10, 10, 10, 66])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyBbox { digit: 0 });
    }

    #[test]
    fn json_round_trip() {
        let layout = PanelLayout::from_json_str(&sample_json()).unwrap();
        let again = PanelLayout::from_json_str(&layout.to_json_string().unwrap()).unwrap();
        assert_eq!(again.digit_count(), layout.digit_count());
        assert_eq!(again.threshold, layout.threshold);
    }
}
