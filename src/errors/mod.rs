//! Error types for the settings consumers

mod mail;
mod static_files;

pub use mail::MailError;
pub use static_files::StaticFilesError;
