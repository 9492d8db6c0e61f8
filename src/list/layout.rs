use crate::state::settings::Settings;

/// Geometry of the virtual list, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListLayout {
    pub row_height: f32,
    pub row_spacing: f32,
    /// Height of the visible area the rows are drawn into
    pub viewport_height: f32,
    /// Rows kept in the pool beyond the ones that fit on screen
    pub preload_rows: usize,
}

impl ListLayout {
    pub fn from_settings(settings: &Settings, viewport_height: f32) -> Self {
        Self {
            row_height: settings.row_height,
            row_spacing: settings.row_spacing,
            viewport_height,
            preload_rows: settings.preload_rows,
        }
    }

    /// Distance between the centers of two neighbouring rows
    pub fn stride(&self) -> f32 {
        self.row_height + self.row_spacing
    }

    /// Number of rows needed to cover the viewport
    pub fn visible_rows(&self) -> usize {
        let stride = self.stride();
        if stride <= 0.0 || self.viewport_height <= 0.0 {
            return 0;
        }
        (self.viewport_height / stride).ceil() as usize
    }

    /// Rows to create for a catalog of `total` images
    pub fn pool_size(&self, total: usize) -> usize {
        self.visible_rows().saturating_add(self.preload_rows).min(total)
    }

    /// Anchored y of the top-most row before any scrolling
    pub fn first_row_position(&self) -> f32 {
        self.viewport_height / 2.0 - self.row_height / 2.0
    }

    /// The top-most row is recycled once its center rises above this line
    /// (its bottom edge has left the viewport)
    pub fn recycle_top(&self) -> f32 {
        self.viewport_height / 2.0 + self.row_height / 2.0
    }

    /// The bottom-most row of a pool of `pool_size` rows is recycled once
    /// its center drops to this line
    pub fn recycle_bottom(&self, pool_size: usize) -> f32 {
        self.recycle_top() - pool_size as f32 * self.stride()
    }

    /// Total scrollable height for `total` rows
    pub fn content_height(&self, total: usize) -> f32 {
        total as f32 * self.stride()
    }
}
