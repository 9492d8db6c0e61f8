use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::cancel::CancelFlag;
use super::decode::{LoadError, LoadOutcome, LoadRequest, LoadTicket};
use crate::state::catalog::ImageCatalog;
use crate::state::data::{ImageRecord, LoadState};

/// Bookkeeping for one in-flight load
#[derive(Debug)]
struct LoadTask {
    serial: u64,
    cancel: CancelFlag,
}

/// Owns the catalog and the lazily created image records.
///
/// The coordinator never runs a decode itself. Loads it starts are queued
/// as `LoadRequest`s which the host drains with `take_requests` and runs in
/// the background; finished loads are handed back through `complete`.
/// All windows are half-open: `[start, start + count)`.
#[derive(Debug)]
pub struct ImageLoadCoordinator {
    catalog: ImageCatalog,
    records: BTreeMap<usize, ImageRecord>,
    // Invariant: id in tasks => records[id].state == Loading
    tasks: HashMap<usize, LoadTask>,
    queued: Vec<LoadRequest>,
    generation: u64,
    next_serial: u64,
    max_dimension: u32,
}

impl ImageLoadCoordinator {
    pub fn new(catalog: ImageCatalog, max_dimension: u32) -> Self {
        Self {
            catalog,
            records: BTreeMap::new(),
            tasks: HashMap::new(),
            queued: Vec::new(),
            generation: 0,
            next_serial: 0,
            max_dimension,
        }
    }

    /// Number of images in the catalog
    pub fn total(&self) -> usize {
        self.catalog.count()
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of loads started and not yet completed or cancelled
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Ids of every record currently held, ascending
    #[cfg(test)]
    pub fn tracked_ids(&self) -> Vec<usize> {
        self.records.keys().copied().collect()
    }

    /// Clamp `[start, start + count)` to the catalog
    fn clamp_range(&self, start: usize, count: usize) -> std::ops::Range<usize> {
        let total = self.total();
        let start = start.min(total);
        let end = start.saturating_add(count).min(total);
        start..end
    }

    /// Make sure every index in the window is loading or done.
    ///
    /// Returns the number of loads started. Indices that are already
    /// `Loading`, `Loaded` or `Failed` are left alone, so calling this again
    /// with an overlapping window never starts a second load for an id.
    pub fn ensure_range(&mut self, start: usize, count: usize) -> usize {
        let mut started = 0;
        for id in self.clamp_range(start, count) {
            if self.start_load(id) {
                started += 1;
            }
        }
        started
    }

    /// Create the record for `id` if needed and start its load
    fn start_load(&mut self, id: usize) -> bool {
        let Some(descriptor) = self.catalog.get(id) else {
            return false;
        };

        let record = self
            .records
            .entry(id)
            .or_insert_with(|| ImageRecord::new(descriptor.clone()));

        if record.state != LoadState::NotStarted {
            return false;
        }

        // Refuse to double up even if the bookkeeping was somehow out of sync
        if self.tasks.contains_key(&id) {
            warn!(id, "load already in flight, not starting another");
            record.state = LoadState::Loading;
            return false;
        }

        self.next_serial += 1;
        let ticket = LoadTicket {
            id,
            generation: self.generation,
            serial: self.next_serial,
        };
        let cancel = CancelFlag::new();

        record.state = LoadState::Loading;
        self.tasks.insert(
            id,
            LoadTask {
                serial: ticket.serial,
                cancel: cancel.clone(),
            },
        );
        self.queued.push(LoadRequest {
            ticket,
            path: descriptor.path.clone(),
            max_dimension: self.max_dimension,
            cancel,
        });

        debug!(id, serial = ticket.serial, "load started");
        true
    }

    /// Drop every record outside `[start, start + count)`.
    ///
    /// Loads still in flight for dropped records are cancelled; their
    /// completions will be ignored. Returns the number of records removed.
    pub fn evict_outside_range(&mut self, start: usize, count: usize) -> usize {
        let end = start.saturating_add(count);
        let evicted: Vec<usize> = self
            .records
            .keys()
            .copied()
            .filter(|id| *id < start || *id >= end)
            .collect();

        for id in &evicted {
            self.records.remove(id);
            if let Some(task) = self.tasks.remove(id) {
                task.cancel.cancel();
                debug!(id = *id, serial = task.serial, "load cancelled by eviction");
            }
        }

        if !evicted.is_empty() {
            // Requests never handed to the host don't need to run at all
            self.queued.retain(|request| !request.cancel.is_cancelled());
        }

        evicted.len()
    }

    pub fn get_record(&self, id: usize) -> Option<&ImageRecord> {
        self.records.get(&id)
    }

    /// Start loading `id` if needed and return its record.
    ///
    /// `None` only when `id` is outside the catalog.
    pub fn get_or_load(&mut self, id: usize) -> Option<&ImageRecord> {
        self.ensure_range(id, 1);
        self.records.get(&id)
    }

    /// Hand the queued loads to the caller, who must run them
    pub fn take_requests(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.queued)
    }

    /// Apply a finished load.
    ///
    /// Returns `false` (and changes nothing) when the load was cancelled,
    /// belongs to an older generation, or no longer matches the task
    /// registered for its id.
    pub fn complete(&mut self, outcome: LoadOutcome) -> bool {
        let LoadOutcome { ticket, result } = outcome;

        if ticket.generation != self.generation {
            debug!(id = ticket.id, "dropping result from an older catalog generation");
            return false;
        }

        match self.tasks.get(&ticket.id) {
            Some(task) if task.serial == ticket.serial => {}
            _ => {
                debug!(id = ticket.id, serial = ticket.serial, "dropping stale result");
                return false;
            }
        }

        if matches!(result, Err(LoadError::Cancelled)) {
            return false;
        }

        self.tasks.remove(&ticket.id);
        let Some(record) = self.records.get_mut(&ticket.id) else {
            // Can't happen while the task invariant holds
            warn!(id = ticket.id, "task without a record");
            return false;
        };

        match result {
            Ok(image) => {
                debug!(id = ticket.id, width = image.width, height = image.height, "image loaded");
                record.image = Some(image);
                record.state = LoadState::Loaded;
            }
            Err(LoadError::Missing(path)) => {
                debug!(path = %path.display(), "image vanished before decode");
                record.state = LoadState::Failed;
            }
            Err(e) => {
                warn!("⚠️  {}", e);
                record.state = LoadState::Failed;
            }
        }

        true
    }

    /// Cancel everything, forget every record and rescan the catalog
    pub fn reset(&mut self) {
        self.cancel_all();
        self.catalog.rebuild();
        info!(generation = self.generation, total = self.total(), "🔄 loader reset");
    }

    /// Like `reset`, but scan a different root directory
    pub fn reset_with_root(&mut self, root: impl Into<PathBuf>) {
        self.cancel_all();
        self.catalog.set_root(root);
        info!(generation = self.generation, total = self.total(), "🔄 loader reset");
    }

    fn cancel_all(&mut self) {
        for task in self.tasks.values() {
            task.cancel.cancel();
        }
        self.tasks.clear();
        self.records.clear();
        self.queued.clear();
        self.generation += 1;
    }
}
