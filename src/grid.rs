// GridView: filter -> sort -> window over an immutable record set

use std::time::Instant;
use tracing::{debug, info};

use crate::config::GridConfig;
use crate::debounce::Debouncer;
use crate::filter::{Constraint, FilterSpec, filter_indices};
use crate::record::Record;
use crate::sort::{SortDirection, SortSpec, sort_indices};
use crate::viewport::{Viewport, ViewportState, Window, page_window, total_pages};

/// How the ordered rows are cut into what gets rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Scroll-driven virtualization
    Virtual,
    /// Fixed-size pages
    Paged { page_size: usize },
}

/// One table header cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: &'static str,
    pub label: &'static str,
    pub sortable: bool,
    /// Set only on the column that is currently sorted
    pub indicator: Option<SortDirection>,
}

type RowCallback<R> = Box<dyn FnMut(&R)>;

/// State holder for one table
///
/// Owns the filter, sort and viewport state; the derived row order is
/// recomputed on every state transition. Records are never modified.
pub struct GridView<R: Record> {
    records: Vec<R>,
    filter: FilterSpec,
    sort: SortSpec,
    /// Positions into `records`, filtered then sorted
    order: Vec<usize>,
    viewport: Viewport,
    mode: WindowMode,
    page: usize,
    search_input: Debouncer<String>,
    on_row_activate: Option<RowCallback<R>>,
}

impl<R: Record> GridView<R> {
    pub fn new(records: Vec<R>, config: &GridConfig) -> Self {
        let state = ViewportState::new(config.row_height, config.overscan);
        let mode = match config.page_size {
            Some(page_size) => WindowMode::Paged {
                page_size: page_size.max(1),
            },
            None => WindowMode::Virtual,
        };

        info!(
            collection = R::collection_name(),
            count = records.len(),
            ?mode,
            "Opening grid"
        );

        let mut grid = Self {
            records,
            filter: FilterSpec::default(),
            sort: R::default_sort(),
            order: Vec::new(),
            viewport: Viewport::new(state, config.measure_epsilon),
            mode,
            page: 0,
            search_input: Debouncer::new(config.debounce()),
            on_row_activate: None,
        };
        grid.refilter();
        grid
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Rows left after filtering
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rows in the source, before filtering
    pub fn total(&self) -> usize {
        self.records.len()
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Replace the whole filter spec
    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.search_input.cancel();
        self.filter = spec;
        self.refilter();
    }

    /// Set one column's constraint, leaving the others alone
    pub fn set_constraint(&mut self, field: &str, constraint: Constraint) {
        self.filter.set(field, constraint);
        self.refilter();
    }

    pub fn clear_constraint(&mut self, field: &str) {
        if self.filter.clear(field).is_some() {
            self.refilter();
        }
    }

    pub fn reset_filters(&mut self) {
        self.search_input.cancel();
        self.filter.reset();
        self.refilter();
    }

    /// Record a keystroke in the search box; applied by a later `tick`
    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search_input.push(text.into(), now);
    }

    /// Apply debounced input that has come due; true if the view changed
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search_input.poll(now) {
            Some(text) => self.apply_search(text),
            None => false,
        }
    }

    pub fn has_pending_search(&self) -> bool {
        self.search_input.is_pending()
    }

    /// When pending search input comes due; the host's next `tick` should not be later
    pub fn search_deadline(&self) -> Option<Instant> {
        self.search_input.deadline()
    }

    /// Enter in the search box: apply pending input without waiting
    pub fn commit_search(&mut self) -> bool {
        match self.search_input.flush() {
            Some(text) => self.apply_search(text),
            None => false,
        }
    }

    /// Apply a search query immediately; true if it differed from the current one
    pub fn apply_search(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.filter.search {
            return false;
        }
        self.filter.search = text;
        self.refilter();
        true
    }

    // ========================================================================
    // Sorting
    // ========================================================================

    /// Header click on `key`; returns false for unknown or non-sortable columns
    pub fn set_sort(&mut self, key: &str) -> bool {
        match R::column(key) {
            Some(column) if column.sortable => {
                self.sort.toggle(key);
                self.resort();
                true
            }
            _ => {
                debug!(key, collection = R::collection_name(), "set_sort: column not sortable");
                false
            }
        }
    }

    /// Direction glyph state for a column: only the sorted column has one
    pub fn sort_indicator(&self, column: &str) -> Option<SortDirection> {
        (self.sort.key == column).then_some(self.sort.direction)
    }

    pub fn headers(&self) -> Vec<Header> {
        R::columns()
            .iter()
            .map(|c| Header {
                name: c.name,
                label: c.label,
                sortable: c.sortable,
                indicator: if c.sortable { self.sort_indicator(c.name) } else { None },
            })
            .collect()
    }

    // ========================================================================
    // Viewport and paging
    // ========================================================================

    /// Scroll event; never resets the position itself
    pub fn on_scroll(&mut self, offset: f64) -> Window {
        self.viewport.scroll_to(offset);
        self.window()
    }

    /// Container size change
    pub fn resize(&mut self, container_height: f64) -> Window {
        self.viewport.resize(container_height);
        self.window()
    }

    /// Measured height of a rendered row
    pub fn calibrate(&mut self, measured_row_height: f64) -> bool {
        self.viewport.calibrate(measured_row_height)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        match self.mode {
            WindowMode::Paged { page_size } => total_pages(self.len(), page_size),
            WindowMode::Virtual => 1,
        }
    }

    /// Jump to a zero-based page, clamped to the last one
    pub fn set_page(&mut self, page: usize) -> Window {
        self.page = page.min(self.total_pages() - 1);
        self.window()
    }

    pub fn next_page(&mut self) -> Window {
        self.set_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> Window {
        self.set_page(self.page.saturating_sub(1))
    }

    /// Switch to paged mode with a new size, back on the first page
    pub fn set_page_size(&mut self, page_size: usize) -> Window {
        self.mode = WindowMode::Paged {
            page_size: page_size.max(1),
        };
        self.page = 0;
        self.window()
    }

    /// Switch to scroll-driven virtualization, back at the top
    pub fn set_virtual(&mut self) -> Window {
        self.mode = WindowMode::Virtual;
        self.page = 0;
        self.viewport.reset_scroll();
        self.window()
    }

    /// Rows to render right now
    pub fn window(&self) -> Window {
        match self.mode {
            WindowMode::Virtual => self.viewport.window(),
            WindowMode::Paged { page_size } => {
                page_window(self.len(), self.page, page_size, self.viewport.state().row_height())
            }
        }
    }

    /// `(position, record)` pairs for the current window
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &R)> + '_ {
        self.window()
            .range()
            .map(move |position| (position, &self.records[self.order[position]]))
    }

    /// Record at a position in the filtered, sorted view
    pub fn row(&self, position: usize) -> Option<&R> {
        self.order.get(position).map(|&i| &self.records[i])
    }

    // ========================================================================
    // Host callbacks
    // ========================================================================

    pub fn set_on_row_activate<F>(&mut self, callback: F)
    where
        F: FnMut(&R) + 'static,
    {
        self.on_row_activate = Some(Box::new(callback));
    }

    /// Row click: hand the record to the host; the grid itself doesn't change
    pub fn activate(&mut self, position: usize) -> bool {
        let Some(&index) = self.order.get(position) else {
            return false;
        };
        match self.on_row_activate.as_mut() {
            Some(callback) => {
                callback(&self.records[index]);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Recompute
    // ========================================================================

    fn refilter(&mut self) {
        self.order = filter_indices(&self.records, &self.filter);
        self.resort();
    }

    fn resort(&mut self) {
        sort_indices(&self.records, &mut self.order, &self.sort);
        self.page = 0;
        self.viewport.set_len(self.order.len());
        self.viewport.reset_scroll();
        debug!(
            collection = R::collection_name(),
            rows = self.order.len(),
            sort = %self.sort.key,
            direction = %self.sort.direction,
            "Grid view recomputed"
        );
    }
}
