use chrono::{DateTime, Local};

use crate::state::data::{DecodedImage, FileDescriptor, ImageRecord, LoadState};

/// What a row shows for the image it is bound to
#[derive(Debug, Clone, PartialEq)]
pub struct RowBinding {
    pub id: usize,
    pub name: String,
    pub file: FileDescriptor,
}

impl RowBinding {
    /// Age of the file at `now`; the view calls this on every draw
    pub fn age_label(&self, now: DateTime<Local>) -> String {
        self.file.age_label(now)
    }
}

/// A recyclable list row.
///
/// Rows are bound to one catalog index at a time and rebound whenever the
/// visible window moves. A row polls its record on every `tick` and swaps
/// its placeholder for the image once the decode has finished.
#[derive(Debug)]
pub struct RowWidget {
    height: f32,
    top_border: f32,
    bottom_border: f32,
    /// Anchored y of the row's center (0 = viewport center, y up)
    position: f32,
    active: bool,
    binding: Option<RowBinding>,
    state: LoadState,
    has_rendered_image: bool,
    image: Option<DecodedImage>,
}

impl RowWidget {
    /// Create a row for a viewport of the given height.
    ///
    /// The borders extend one row height past each edge of the viewport so
    /// a row switches on slightly before it scrolls into view.
    pub fn new(height: f32, viewport_height: f32) -> Self {
        let half = viewport_height / 2.0;
        Self {
            height,
            top_border: half + height,
            bottom_border: -half - height,
            position: 0.0,
            active: true,
            binding: None,
            state: LoadState::NotStarted,
            has_rendered_image: false,
            image: None,
        }
    }

    /// Bind the row to the record for `id`
    pub fn bind(&mut self, id: usize, record: &ImageRecord) {
        let same_id = self.bound_id() == Some(id);
        if !same_id {
            self.image = None;
        }

        self.binding = Some(RowBinding {
            id,
            name: record.descriptor.display_name(),
            file: record.descriptor.clone(),
        });
        self.state = record.state;
        self.has_rendered_image = false;
    }

    /// Per-frame update.
    ///
    /// `record` is the coordinator's current record for the bound id, if it
    /// still has one. Returns `true` when the row started showing an image.
    pub fn tick(&mut self, record: Option<&ImageRecord>) -> bool {
        let Some(bound) = self.bound_id() else {
            return false;
        };
        let Some(record) = record.filter(|record| record.id == bound) else {
            return false;
        };

        self.state = record.state;
        if self.has_rendered_image || record.state != LoadState::Loaded {
            return false;
        }

        match &record.image {
            Some(image) => {
                self.image = Some(image.clone());
                self.has_rendered_image = true;
                true
            }
            None => false,
        }
    }

    /// Move the row and switch it on or off depending on whether it is
    /// near the viewport
    pub fn set_position(&mut self, y: f32) {
        self.position = y;
        self.active = y < self.top_border && y > self.bottom_border;
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn binding(&self) -> Option<&RowBinding> {
        self.binding.as_ref()
    }

    pub fn bound_id(&self) -> Option<usize> {
        self.binding.as_ref().map(|binding| binding.id)
    }

    #[cfg(test)]
    pub fn has_rendered_image(&self) -> bool {
        self.has_rendered_image
    }

    /// Image currently shown instead of the placeholder
    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        self.image.as_ref().map(DecodedImage::aspect_ratio)
    }

    /// Load state of the bound record as of the last bind or tick
    pub fn load_state(&self) -> LoadState {
        self.state
    }

    /// Whether the row still expects an image to show up
    pub fn is_waiting(&self) -> bool {
        self.binding.is_some()
            && !self.has_rendered_image
            && matches!(
                self.state,
                LoadState::NotStarted | LoadState::Loading | LoadState::Loaded
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn record(id: usize, state: LoadState) -> ImageRecord {
        let mut record = ImageRecord::new(FileDescriptor {
            index: id,
            path: PathBuf::from(format!("/photos/pic_{}.png", id)),
            created_at: Local::now(),
        });
        record.state = state;
        if state == LoadState::Loaded {
            record.image = Some(DecodedImage::from_rgba(3, 2, vec![0; 24]));
        }
        record
    }

    #[test]
    fn test_bind_shows_metadata() {
        let mut row = RowWidget::new(100.0, 550.0);
        row.bind(4, &record(4, LoadState::Loading));

        let binding = row.binding().unwrap();
        assert_eq!(binding.id, 4);
        assert_eq!(binding.name, "pic_4");
        assert_eq!(binding.file.index, 4);
        assert!(!row.has_rendered_image());
        assert!(row.is_waiting());
    }

    #[test]
    fn test_age_label_follows_the_clock() {
        let mut old = record(5, LoadState::Loading);
        old.descriptor.created_at = Local.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let mut row = RowWidget::new(100.0, 550.0);
        row.bind(5, &old);
        let binding = row.binding().unwrap();

        // Same binding, later clock: the label moves on without a rebind
        let first = Local.with_ymd_and_hms(2024, 3, 1, 8, 0, 30).unwrap();
        let later = Local.with_ymd_and_hms(2024, 3, 2, 9, 1, 2).unwrap();
        assert_eq!(binding.age_label(first), "00:00:30");
        assert_eq!(binding.age_label(later), "1d 01:01:02");
    }

    #[test]
    fn test_tick_renders_once_loaded() {
        let mut row = RowWidget::new(100.0, 550.0);
        row.bind(1, &record(1, LoadState::Loading));

        assert!(!row.tick(Some(&record(1, LoadState::Loading))));
        assert!(row.image().is_none());

        assert!(row.tick(Some(&record(1, LoadState::Loaded))));
        assert!(row.has_rendered_image());
        assert_eq!(row.aspect_ratio(), Some(1.5));

        // Already rendered, nothing more to do
        assert!(!row.tick(Some(&record(1, LoadState::Loaded))));
        assert!(!row.is_waiting());
    }

    #[test]
    fn test_tick_ignores_other_records() {
        let mut row = RowWidget::new(100.0, 550.0);
        assert!(!row.tick(Some(&record(1, LoadState::Loaded))));

        row.bind(2, &record(2, LoadState::Loading));
        assert!(!row.tick(Some(&record(1, LoadState::Loaded))));
        assert!(!row.tick(None));
        assert!(row.image().is_none());
    }

    #[test]
    fn test_failed_record_keeps_placeholder() {
        let mut row = RowWidget::new(100.0, 550.0);
        row.bind(2, &record(2, LoadState::Loading));

        assert!(!row.tick(Some(&record(2, LoadState::Failed))));
        assert_eq!(row.load_state(), LoadState::Failed);
        assert!(row.image().is_none());
        assert!(!row.is_waiting());
    }

    #[test]
    fn test_rebinding_resets_image() {
        let mut row = RowWidget::new(100.0, 550.0);
        row.bind(1, &record(1, LoadState::Loaded));
        row.tick(Some(&record(1, LoadState::Loaded)));

        // Same id keeps the picture while it is re-rendered
        row.bind(1, &record(1, LoadState::Loaded));
        assert!(!row.has_rendered_image());
        assert!(row.image().is_some());
        assert!(row.tick(Some(&record(1, LoadState::Loaded))));

        // New id goes back to the placeholder
        row.bind(9, &record(9, LoadState::Loading));
        assert!(row.image().is_none());
    }

    #[test]
    fn test_visibility_follows_position() {
        // viewport 550 => borders at 375 and -375
        let mut row = RowWidget::new(100.0, 550.0);

        row.set_position(225.0);
        assert!(row.is_active());
        row.set_position(374.0);
        assert!(row.is_active());
        row.set_position(375.0);
        assert!(!row.is_active());
        row.set_position(-400.0);
        assert!(!row.is_active());

        // Inactive rows still take bindings
        row.bind(0, &record(0, LoadState::Loading));
        assert_eq!(row.bound_id(), Some(0));
        row.set_position(0.0);
        assert!(row.is_active());
    }
}
