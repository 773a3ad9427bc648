// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, ScanError};
use crate::types::{DocumentType, MAX_IMAGE_DIMENSION};

/// Tunable scanner settings.
///
/// Missing fields in a JSON file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Upper bound on either dimension of a rectified image (default 2000).
    pub max_output_dimension: u32,
    /// Pointer hit radius for corner handles, in display pixels (default 50).
    pub hit_radius: f64,
    /// Fractional inset of the default selection from each edge (default 0.1).
    pub default_inset: f64,
    /// JPEG quality used when encoding a fresh rectification (1-100).
    pub rectify_quality: u8,
    /// JPEG quality used when re-encoding after a rotation (1-100).
    pub rotate_quality: u8,
    /// Relative pivot threshold below which the homography system is singular.
    pub singular_epsilon: f64,
    /// Encoded output format.
    pub output_format: DocumentType,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_output_dimension: 2000,
            hit_radius: 50.0,
            default_inset: 0.1,
            rectify_quality: 100,
            rotate_quality: 85,
            singular_epsilon: 1e-10,
            output_format: DocumentType::Jpeg,
        }
    }
}

impl ScannerConfig {
    /// Reject values the scanner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_IMAGE_DIMENSION).contains(&self.max_output_dimension) {
            return Err(ScanError::Config(format!(
                "max_output_dimension must be in 1..={MAX_IMAGE_DIMENSION}, got {}",
                self.max_output_dimension
            )));
        }
        if !(self.hit_radius > 0.0 && self.hit_radius.is_finite()) {
            return Err(ScanError::Config(format!(
                "hit_radius must be a positive number, got {}",
                self.hit_radius
            )));
        }
        if !(0.0..0.5).contains(&self.default_inset) {
            return Err(ScanError::Config(format!(
                "default_inset must be in [0, 0.5), got {}",
                self.default_inset
            )));
        }
        for (name, quality) in [
            ("rectify_quality", self.rectify_quality),
            ("rotate_quality", self.rotate_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ScanError::Config(format!("{name} must be in 1..=100, got {quality}")));
            }
        }
        if !(self.singular_epsilon > 0.0 && self.singular_epsilon < 1.0) {
            return Err(ScanError::Config(format!(
                "singular_epsilon must be in (0, 1), got {}",
                self.singular_epsilon
            )));
        }
        Ok(())
    }

    /// Load and validate a JSON config file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        debug!(?config, "Scanner config loaded");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
