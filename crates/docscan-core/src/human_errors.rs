// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for technicians working in the field.
//
// Every technical error is mapped to a plain sentence with a clear next step:
// adjust the corners, take the photo again, or wait and retry.

use crate::error::ScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Storage blip or background task hiccup. Trying again may work.
    Transient,
    /// User must do something (move a corner, retake the photo).
    ActionRequired,
    /// Cannot be fixed by retrying (broken configuration or bad input file).
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the caller may simply try the same operation again.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanError` into a `HumanError` suitable for display.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        // -- Geometry --
        ScanError::DegenerateGeometry(_) => HumanError {
            message: "The corners don't outline a document.".into(),
            suggestion: "Drag the four circles onto the four corners of the page so that no three of them sit on a straight line, then scan again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::ViewportUnavailable { .. } => HumanError {
            message: "The preview isn't ready yet.".into(),
            suggestion: "Wait for the photo to appear on screen, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::EmptyImage => HumanError {
            message: "This photo is empty.".into(),
            suggestion: "Take the photo again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::InvalidCorner(_) => HumanError {
            message: "That corner couldn't be moved.".into(),
            suggestion: "Touch one of the four circles and drag it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Images --
        ScanError::ImageDecode(_) => HumanError {
            message: "This photo couldn't be opened.".into(),
            suggestion: "The file may be damaged or in an unusual format. Take the photo again, or save it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::ImageEncode(_) => HumanError {
            message: "The scanned page couldn't be saved.".into(),
            suggestion: "Try scanning again. If this keeps happening, your device may be low on memory.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::Worker(_) => HumanError {
            message: "Scanning stopped unexpectedly.".into(),
            suggestion: "Press scan again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Storage --
        ScanError::Storage(_) => HumanError {
            message: "The scanned page couldn't be uploaded.".into(),
            suggestion: "Check your connection and try again. The scan is still on this device.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::RecordNotFound { key, .. } => HumanError {
            message: "The work order for this scan no longer exists.".into(),
            suggestion: format!("Refresh the list and check that order {key} is still assigned to you."),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Config(detail) => HumanError {
            message: "The scanner settings are invalid.".into(),
            suggestion: format!("Fix the settings file and try again. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or copy the file to a different location first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ScanError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}
