//! Status enums for executions, samples and export jobs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Created, samples allocated, not yet started.
    NotStarted,
    /// Operators are working on samples.
    InProgress,
    /// Temporarily halted; resumable.
    Paused,
    /// Finished with frozen statistics.
    Completed,
    /// Aborted because of a failure.
    Failed,
    /// Abandoned before completion.
    Cancelled,
}

impl ExecutionStatus {
    /// Returns `true` if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` while operators may record work.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Pass/fail verdict derived from the completed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// No sample has completed yet.
    #[default]
    Pending,
    /// Every completed sample passed.
    Passed,
    /// No completed sample passed.
    Failed,
    /// Some passed, some did not.
    Partial,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Passed => write!(f, "PASSED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// Lifecycle status of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleStatus {
    /// Not yet picked up by an operator.
    Pending,
    /// Being processed.
    InProgress,
    /// Processed, quality recorded.
    Completed,
    /// Processing failed.
    Failed,
    /// Deliberately not processed.
    Skipped,
}

impl SampleStatus {
    /// Returns `true` if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns `true` if the sample counts towards execution progress.
    #[must_use]
    pub const fn counts_as_done(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Quality verdict attached to a completed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleQuality {
    /// Within specification.
    Pass,
    /// Out of specification.
    Fail,
    /// Within specification with reservations.
    Warning,
}

impl fmt::Display for SampleQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

impl FromStr for SampleQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            "warning" => Ok(Self::Warning),
            "" => Err(Error::missing("quality")),
            other => Err(Error::invalid(
                "quality",
                format!("'{other}' is not one of pass, fail, warning"),
            )),
        }
    }
}

/// Lifecycle status of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    /// Requested, waiting for the renderer.
    Pending,
    /// Renderer is producing the file.
    InProgress,
    /// File is available.
    Completed,
    /// Renderer gave up.
    Failed,
    /// Deadline passed before completion.
    Expired,
}

impl ExportStatus {
    /// Returns `true` if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl FromStr for ExportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(Error::invalid(
                "status",
                format!("'{other}' is not a valid export status"),
            )),
        }
    }
}

/// File format an export renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportFormat {
    /// Portable document.
    Pdf,
    /// Spreadsheet workbook.
    Excel,
    /// Comma-separated values.
    Csv,
    /// JSON document.
    Json,
}

impl ExportFormat {
    /// Lowercased format name, used as the file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Excel => write!(f, "EXCEL"),
            Self::Csv => write!(f, "CSV"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PDF" => Ok(Self::Pdf),
            "EXCEL" => Ok(Self::Excel),
            "CSV" => Ok(Self::Csv),
            "JSON" => Ok(Self::Json),
            "" => Err(Error::missing("format")),
            other => Err(Error::invalid(
                "format",
                format!("'{other}' is not one of PDF, EXCEL, CSV, JSON"),
            )),
        }
    }
}
