// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//! Mail transport error types

use std::fmt;

#[derive(Debug)]
pub enum MailError {
    TransportInit(String),
    InvalidAddress(String),
    BuildFailed(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::TransportInit(msg) => write!(f, "SMTP transport init failed: {}", msg),
            MailError::InvalidAddress(addr) => write!(f, "Invalid email address: {}", addr),
            MailError::BuildFailed(msg) => write!(f, "Message build failed: {}", msg),
        }
    }
}

impl std::error::Error for MailError {}
