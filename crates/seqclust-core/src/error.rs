// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised while building a sequence view or fitting a segmentation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SegError {
    /// A segment has, or would end up with, zero members.
    #[error("empty cluster: segment {segment} has no members")]
    EmptyCluster { segment: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
}

impl SegError {
    pub fn empty_cluster(segment: usize) -> Self {
        Self::EmptyCluster { segment }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    /// Stable machine-readable code for structured error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyCluster { .. } => "empty_cluster",
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
        }
    }
}
