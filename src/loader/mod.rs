/// Lazy image loading module
///
/// This module handles:
/// - Tracking which catalog entries have records (coordinator.rs)
/// - Decoding images off the UI thread (decode.rs)
/// - Cooperative cancellation of decodes (cancel.rs)

pub mod cancel;
pub mod coordinator;
pub mod decode;

pub use coordinator::ImageLoadCoordinator;
pub use decode::{LoadOutcome, LoadRequest};
