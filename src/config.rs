//! Tunables for routing, edge appearance and drag handling.
//!
//! Every section deserializes with defaults filled in, so a host can ship a
//! partial JSON document and only override what it cares about.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Control-point placement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Straight stub leaving a port before the first turn.
    pub length_from_port: f32,
    /// Diameter used both for the stub and for corner rounding.
    pub turn_diameter: f32,
    /// Anchor distance at which the stub reaches its full length.
    pub full_offset_distance: f32,
    /// Minimum distance of a reverse route's middle leg below the higher node's top.
    pub reverse_top_margin: f32,
    /// Maximum distance of a reverse route's middle leg below the lower node's top.
    pub reverse_bottom_margin: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            length_from_port: 12.0,
            turn_diameter: 20.0,
            full_offset_distance: 150.0,
            reverse_top_margin: 20.0,
            reverse_bottom_margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeAppearance {
    pub edge_width: f32,
    /// Narrowest on-screen stroke, regardless of zoom.
    pub min_edge_width: f32,
    pub cap_radius: f32,
    /// Half-width of the clickable band around an edge.
    pub intercept_width: f32,
}

impl Default for EdgeAppearance {
    fn default() -> Self {
        Self {
            edge_width: 2.0,
            min_edge_width: 1.75,
            cap_radius: 4.0,
            intercept_width: 6.0,
        }
    }
}

impl EdgeAppearance {
    /// Stroke width in graph units that keeps at least `min_edge_width` on screen.
    pub fn effective_stroke_width(&self, scale: f32) -> f32 {
        if scale > 0.0 && self.edge_width * scale < self.min_edge_width {
            self.min_edge_width / scale
        } else {
            self.edge_width
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Pointer travel required before an offered drag counts as started.
    pub threshold: f32,
    /// Radius used to resolve a port under the pointer.
    pub port_hit_radius: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            port_hit_radius: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub routing: RoutingConfig,
    pub edge: EdgeAppearance,
    pub drag: DragConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("routing.full_offset_distance", self.routing.full_offset_distance),
            ("edge.edge_width", self.edge.edge_width),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Validation {
                    field,
                    message: format!("must be positive, got {value}"),
                });
            }
        }

        let non_negative = [
            ("routing.length_from_port", self.routing.length_from_port),
            ("routing.turn_diameter", self.routing.turn_diameter),
            ("edge.min_edge_width", self.edge.min_edge_width),
            ("edge.cap_radius", self.edge.cap_radius),
            ("edge.intercept_width", self.edge.intercept_width),
            ("drag.threshold", self.drag.threshold),
            ("drag.port_hit_radius", self.drag.port_hit_radius),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Validation {
                    field,
                    message: format!("must not be negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}
