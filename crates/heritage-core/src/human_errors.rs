// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for archivists and record-room staff.
//
// Every technical error is mapped to plain language with a clear suggestion.
// The severity drives how the front-end presents it.

use crate::error::HeritageError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Try the same document again; it may work.
    Transient,
    /// The user must change something (settings, file, installed models).
    ActionRequired,
    /// This input cannot be processed as-is.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether re-running the same request may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `HeritageError` into a `HumanError`.
pub fn humanize_error(err: &HeritageError) -> HumanError {
    match err {
        HeritageError::UnsupportedFormat(detail) => HumanError {
            message: "This file type can't be digitized.".into(),
            suggestion: format!(
                "Please upload a JPEG, PNG or TIFF photograph of the record. ({detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        HeritageError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The file may be damaged or incomplete. Try exporting the scan again as a JPEG or PNG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        HeritageError::RecognitionFailure { detail, .. } => humanize_recognition_failure(detail),

        HeritageError::EngineUnavailable(_) => HumanError {
            message: "The selected text recognition engine isn't installed.".into(),
            suggestion: "Choose a different engine in the settings, or ask your administrator to install it.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        HeritageError::ModelLoad(_) => HumanError {
            message: "The text recognition models couldn't be loaded.".into(),
            suggestion: "The model files may be missing or damaged. Download them again and restart the application.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        HeritageError::InvalidConfig(detail) => HumanError {
            message: "One of the processing settings isn't valid.".into(),
            suggestion: format!("Check the settings and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        HeritageError::DeadlineExceeded { .. } => HumanError {
            message: "Processing this document took too long.".into(),
            suggestion: "Try a smaller or clearer photograph, or turn off advanced preprocessing for clean scans.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        HeritageError::Cancelled { .. } => HumanError {
            message: "Processing was cancelled.".into(),
            suggestion: "Start processing again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        HeritageError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The application doesn't have permission to read that file.".into(),
                    suggestion: "Check the file permissions, or copy the file to a different folder first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        HeritageError::Serialization(_) => HumanError {
            message: "The application had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Engine failures are mostly resource problems; malformed buffers are not
/// worth retrying.
fn humanize_recognition_failure(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("memory") || lower.contains("alloc") {
        HumanError {
            message: "The computer ran out of memory while reading the text.".into(),
            suggestion: "Close other programs, or try a lower-resolution photograph of the record.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("image source") || lower.contains("dimension") || lower.contains("empty image") {
        HumanError {
            message: "The image couldn't be prepared for text recognition.".into(),
            suggestion: "The photograph may be empty or too small. Try photographing the record again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else {
        HumanError {
            message: "Text recognition didn't work on this record.".into(),
            suggestion: "Try photographing the document again with better lighting, making sure the writing is in focus.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
