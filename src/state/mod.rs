/// State management module
///
/// This module handles the data the list is built from:
/// - Image file enumeration (catalog.rs)
/// - Shared data structures (data.rs)
/// - Persistent user settings (settings.rs)

pub mod catalog;
pub mod data;
pub mod settings;
