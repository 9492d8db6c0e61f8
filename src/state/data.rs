/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the catalog, the loader and the list rows.
use chrono::{DateTime, Duration, Local};
use iced::widget::image::Handle;
use std::path::PathBuf;

/// One image file found by the catalog
///
/// The index is the file's identity for the current catalog generation.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    /// Position in the catalog (0-based)
    pub index: usize,
    /// Full path to the image file
    pub path: PathBuf,
    /// When the file was created (falls back to modification time)
    pub created_at: DateTime<Local>,
}

impl FileDescriptor {
    /// Human readable name: the filename without its extension
    pub fn display_name(&self) -> String {
        self.path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Time elapsed between creation and `now`
    pub fn age(&self, now: DateTime<Local>) -> Duration {
        now.signed_duration_since(self.created_at)
    }

    /// Age formatted for display, e.g. "3d 04:05:06"
    pub fn age_label(&self, now: DateTime<Local>) -> String {
        format_age(self.age(now))
    }
}

/// Format an elapsed duration as days plus hh:mm:ss
///
/// Negative durations (clock skew, files from the future) are shown as zero.
pub fn format_age(age: Duration) -> String {
    let total = age.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// A decoded image ready to be drawn
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// GPU-uploadable handle (cheap to clone, shares the pixel buffer)
    pub handle: Handle,
}

impl DecodedImage {
    /// Wrap raw RGBA8 pixels
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            handle: Handle::from_rgba(width, height, pixels),
        }
    }

    /// Width divided by height (1.0 for degenerate images)
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Where an image record is in its load lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    Loading,
    Loaded,
    Failed,
}

/// A lazily loaded image, owned by the load coordinator
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Same as the descriptor's catalog index
    pub id: usize,
    pub descriptor: FileDescriptor,
    /// Present once the decode finished successfully
    pub image: Option<DecodedImage>,
    pub state: LoadState,
}

impl ImageRecord {
    pub fn new(descriptor: FileDescriptor) -> Self {
        Self {
            id: descriptor.index,
            descriptor,
            image: None,
            state: LoadState::NotStarted,
        }
    }
}
