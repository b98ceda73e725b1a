// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//! Static asset collection error types

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StaticFilesError {
    SourceMissing(PathBuf),
    ReadFailed(PathBuf, std::io::Error),
    WriteFailed(PathBuf, std::io::Error),
    ManifestFailed(String),
}

impl fmt::Display for StaticFilesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticFilesError::SourceMissing(path) => {
                write!(f, "Static source directory not found: {}", path.display())
            }
            StaticFilesError::ReadFailed(path, e) => {
                write!(f, "Failed to read {}: {}", path.display(), e)
            }
            StaticFilesError::WriteFailed(path, e) => {
                write!(f, "Failed to write {}: {}", path.display(), e)
            }
            StaticFilesError::ManifestFailed(msg) => write!(f, "Manifest generation failed: {}", msg),
        }
    }
}

impl std::error::Error for StaticFilesError {}
