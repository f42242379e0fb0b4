//! Smaily Connect Handlers

pub mod settings;

pub use settings::{CredentialsForm, SettingsError, SettingsHandler};
