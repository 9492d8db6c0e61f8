use std::collections::VecDeque;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info};

use super::layout::ListLayout;
use super::row::RowWidget;
use crate::loader::{ImageLoadCoordinator, LoadOutcome, LoadRequest};

/// Drives a fixed pool of rows over an arbitrarily long image catalog.
///
/// Rows live in an arena (`rows`) that is only rebuilt on reset or
/// relayout. Their top-to-bottom order is kept separately in `order`;
/// scrolling rotates that deque instead of creating or destroying rows.
///
/// Positions use the row's center, with 0 at the middle of the viewport
/// and y pointing up. Scrolling toward the end of the list moves rows up.
#[derive(Debug)]
pub struct VirtualScrollController {
    layout: ListLayout,
    loader: ImageLoadCoordinator,
    rows: Vec<RowWidget>,
    /// Slot indices into `rows`, top-most first
    order: VecDeque<usize>,
    /// Catalog index shown by the top-most row
    first_visible: usize,
    total: usize,
    /// Pixels scrolled from the top of the content
    scroll_offset: f32,
}

impl VirtualScrollController {
    pub fn new(layout: ListLayout, loader: ImageLoadCoordinator) -> Self {
        let mut controller = Self {
            layout,
            loader,
            rows: Vec::new(),
            order: VecDeque::new(),
            first_visible: 0,
            total: 0,
            scroll_offset: 0.0,
        };
        controller.rebuild();
        controller
    }

    /// Setup plus initial population
    fn rebuild(&mut self) {
        self.build_pool();
        self.refresh_window();
        info!(
            total = self.total,
            pool = self.order.len(),
            visible = self.visible_count(),
            "list populated"
        );
    }

    /// Create the rows and lay them out from the top of the list
    fn build_pool(&mut self) {
        self.total = self.loader.total();
        self.scroll_offset = 0.0;
        self.first_visible = 0;

        let pool_size = self.layout.pool_size(self.total);
        self.rows = (0..pool_size)
            .map(|_| RowWidget::new(self.layout.row_height, self.layout.viewport_height))
            .collect();
        self.order = (0..pool_size).collect();

        let top = self.layout.first_row_position();
        let stride = self.layout.stride();
        for (k, &slot) in self.order.iter().enumerate() {
            self.rows[slot].set_position(top - k as f32 * stride);
        }
    }

    /// Load the current window, evict everything else and rebind every row
    fn refresh_window(&mut self) {
        let pool_size = self.order.len();
        if pool_size == 0 {
            return;
        }

        let start = self.first_visible.min(self.total - pool_size);
        self.loader.ensure_range(start, pool_size);
        self.loader.evict_outside_range(start, pool_size);

        for (k, &slot) in self.order.iter().enumerate() {
            let id = start + k;
            if let Some(record) = self.loader.get_or_load(id) {
                self.rows[slot].bind(id, record);
            }
        }
    }

    /// Scroll to an absolute offset (pixels from the top of the content)
    pub fn scroll_to(&mut self, offset: f32) -> usize {
        let offset = offset.clamp(0.0, self.scroll_range());
        self.scroll_by(offset - self.scroll_offset)
    }

    /// Scroll to a fraction of the scrollable range: 0.0 is the top,
    /// 1.0 the bottom
    pub fn scroll_to_relative(&mut self, relative: f32) -> usize {
        let relative = if relative.is_finite() {
            relative.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.scroll_to(relative * self.scroll_range())
    }

    /// Scroll by `delta` pixels; positive scrolls toward the end of the list.
    ///
    /// Returns the number of rows recycled.
    pub fn scroll_by(&mut self, delta: f32) -> usize {
        let recycled = self.apply_scroll(delta);
        if recycled > 0 {
            debug!(recycled, first_visible = self.first_visible, "window moved");
            self.refresh_window();
        }
        recycled
    }

    /// Move the rows without touching the loader
    fn apply_scroll(&mut self, delta: f32) -> usize {
        let stride = self.layout.stride();
        if self.order.is_empty() || delta == 0.0 || !delta.is_finite() || stride <= 0.0 {
            return 0;
        }
        self.scroll_offset += delta;

        // At most one row crosses a border per stride, so walk in stride steps
        let mut remaining = delta;
        let mut recycled = 0;
        while remaining != 0.0 {
            let step = remaining.clamp(-stride, stride);
            remaining -= step;
            recycled += if step > 0.0 {
                self.move_up(step)
            } else {
                self.move_down(-step)
            };
        }
        recycled
    }

    /// Rows move up the screen; the top-most row wraps to the bottom once
    /// it has left the viewport
    fn move_up(&mut self, delta: f32) -> usize {
        self.translate(delta);

        let limit = self.layout.recycle_top();
        let stride = self.layout.stride();
        let mut recycled = 0;

        while self.first_visible + self.order.len() < self.total {
            let (Some(&head), Some(&tail)) = (self.order.front(), self.order.back()) else {
                break;
            };
            if self.rows[head].position() <= limit {
                break;
            }

            let y = self.rows[tail].position() - stride;
            self.order.rotate_left(1);
            self.rows[head].set_position(y);
            self.first_visible += 1;
            recycled += 1;
        }
        recycled
    }

    /// Rows move down the screen; the bottom-most row wraps to the top once
    /// the pool has slid a full stride below the viewport top
    fn move_down(&mut self, delta: f32) -> usize {
        self.translate(-delta);

        let limit = self.layout.recycle_bottom(self.order.len());
        let stride = self.layout.stride();
        let mut recycled = 0;

        while self.first_visible > 0 {
            let (Some(&head), Some(&tail)) = (self.order.front(), self.order.back()) else {
                break;
            };
            if self.rows[tail].position() > limit {
                break;
            }

            let y = self.rows[head].position() + stride;
            self.order.rotate_right(1);
            self.rows[tail].set_position(y);
            self.first_visible -= 1;
            recycled += 1;
        }
        recycled
    }

    fn translate(&mut self, dy: f32) {
        for &slot in &self.order {
            let y = self.rows[slot].position() + dy;
            self.rows[slot].set_position(y);
        }
    }

    /// Per-frame update: rows pick up images that finished decoding.
    ///
    /// Returns `true` if any row changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        for row in &mut self.rows {
            if let Some(id) = row.bound_id() {
                changed |= row.tick(self.loader.get_record(id));
            }
        }
        changed
    }

    /// Whether some row is still waiting for its image
    pub fn needs_frames(&self) -> bool {
        self.rows.iter().any(RowWidget::is_waiting)
    }

    /// Loads the host has to run in the background
    pub fn take_load_requests(&mut self) -> Vec<LoadRequest> {
        self.loader.take_requests()
    }

    /// Hand a finished load back to the loader
    pub fn complete(&mut self, outcome: LoadOutcome) -> bool {
        self.loader.complete(outcome)
    }

    /// Cancel everything, rescan the catalog and rebuild the pool
    pub fn reset(&mut self) {
        self.loader.reset();
        self.rebuild();
    }

    /// Like `reset`, but scanning another directory
    pub fn reset_with_root(&mut self, root: impl Into<PathBuf>) {
        self.loader.reset_with_root(root);
        self.rebuild();
    }

    /// Rebuild the pool for a new viewport height, keeping the scroll offset
    /// and the loaded records
    pub fn relayout(&mut self, viewport_height: f32) {
        if viewport_height == self.layout.viewport_height || !viewport_height.is_finite() {
            return;
        }

        let offset = self.scroll_offset;
        self.layout.viewport_height = viewport_height.max(0.0);
        self.build_pool();
        let offset = offset.clamp(0.0, self.scroll_range());
        self.apply_scroll(offset);
        self.refresh_window();
        debug!(viewport_height, pool = self.order.len(), "list relayout");
    }

    pub fn layout(&self) -> &ListLayout {
        &self.layout
    }

    pub fn loader(&self) -> &ImageLoadCoordinator {
        &self.loader
    }

    /// Number of images in the catalog
    pub fn total(&self) -> usize {
        self.total
    }

    #[cfg(test)]
    pub fn pool_size(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    /// Rows that fit on screen
    pub fn visible_count(&self) -> usize {
        self.layout.visible_rows().min(self.total)
    }

    /// Catalog indices currently bound to the pool
    pub fn window(&self) -> Range<usize> {
        let pool_size = self.order.len();
        let start = self.first_visible.min(self.total.saturating_sub(pool_size));
        start..start + pool_size
    }

    #[cfg(test)]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn content_height(&self) -> f32 {
        self.layout.content_height(self.total)
    }

    /// How far the content can scroll
    pub fn scroll_range(&self) -> f32 {
        (self.content_height() - self.layout.viewport_height).max(0.0)
    }

    /// Rows from top to bottom
    pub fn rows_in_order(&self) -> impl Iterator<Item = &RowWidget> + '_ {
        self.order.iter().map(move |&slot| &self.rows[slot])
    }

    /// Bound id of each row, top to bottom
    #[cfg(test)]
    pub fn bound_ids(&self) -> Vec<Option<usize>> {
        self.rows_in_order().map(RowWidget::bound_id).collect()
    }

    /// Arena slots in display order
    #[cfg(test)]
    fn slots(&self) -> Vec<usize> {
        self.order.iter().copied().collect()
    }
}
