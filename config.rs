/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! View settings, loadable from TOML.
//!
//! Every field has a default, so an empty file (or a file naming only the
//! settings it cares about) is valid:
//!
//! ```toml
//! hover_delay_ms = 250
//! auto_add_nodes = false
//!
//! [layout]
//! max_iterations = 500
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Delay before a hover preview opens.
    pub hover_delay_ms: u64,
    /// Delay before a preview closes once the pointer has left its anchor.
    pub popup_grace_ms: u64,
    /// Duration of the active-file framing animation.
    pub camera_animation_ms: u64,
    /// Edges with a context excerpt get hover previews too.
    pub hover_edges: bool,
    /// Opening a document not in the graph expands it into the graph.
    pub auto_add_nodes: bool,
    /// One edge per linked document pair instead of one per link.
    pub merge_edges: bool,
    /// Extension for documents created from unresolved nodes.
    pub new_document_extension: String,
    pub layout: LayoutParams,
    pub camera: CameraSettings,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            hover_delay_ms: 500,
            popup_grace_ms: 300,
            camera_animation_ms: 300,
            hover_edges: true,
            auto_add_nodes: true,
            merge_edges: true,
            new_document_extension: "md".to_string(),
            layout: LayoutParams::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl ViewSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the camera or layout cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.layout.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }

    pub fn popup_grace(&self) -> Duration {
        Duration::from_millis(self.popup_grace_ms)
    }

    pub fn camera_animation(&self) -> Duration {
        Duration::from_millis(self.camera_animation_ms)
    }

    /// File name for a new document backing `local_id`.
    pub fn new_document_name(&self, local_id: &str) -> String {
        let extension = self.new_document_extension.trim_start_matches('.');
        if extension.is_empty() {
            local_id.to_string()
        } else {
            format!("{local_id}.{extension}")
        }
    }
}

/// Parameters of a layout run. Identical parameters on every restart keep
/// repeated restarts converging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Step budget of one run.
    pub max_iterations: u32,
    /// A run settles once no node moves further than this in one step.
    pub convergence_threshold: f32,
    pub ideal_edge_length: f32,
    /// Pull toward the origin, keeps disconnected parts in view.
    pub gravity: f32,
    /// Per-step temperature multiplier, in (0, 1).
    pub cooling: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            convergence_threshold: 0.05,
            ideal_edge_length: 80.0,
            gravity: 0.02,
            cooling: 0.95,
        }
    }
}

impl LayoutParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cooling > 0.0 && self.cooling < 1.0) {
            return Err(invalid(format!("layout.cooling must be in (0, 1), got {}", self.cooling)));
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold >= 0.0) {
            return Err(invalid(format!(
                "layout.convergence_threshold must be non-negative, got {}",
                self.convergence_threshold
            )));
        }
        if !(self.ideal_edge_length.is_finite() && self.ideal_edge_length > 0.0) {
            return Err(invalid(format!(
                "layout.ideal_edge_length must be positive, got {}",
                self.ideal_edge_length
            )));
        }
        if !(self.gravity.is_finite() && self.gravity >= 0.0) {
            return Err(invalid(format!("layout.gravity must be non-negative, got {}", self.gravity)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub fit_padding: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            fit_padding: 40.0,
        }
    }
}

impl CameraSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(invalid(format!("camera.min_zoom must be positive, got {}", self.min_zoom)));
        }
        if !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom) {
            return Err(invalid(format!(
                "camera.max_zoom ({}) must not be below camera.min_zoom ({})",
                self.max_zoom, self.min_zoom
            )));
        }
        if !(self.fit_padding.is_finite() && self.fit_padding >= 0.0) {
            return Err(invalid(format!(
                "camera.fit_padding must be non-negative, got {}",
                self.fit_padding
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}
