// Viewport virtualization: which rows to materialize for a scroll position

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

pub const DEFAULT_ROW_HEIGHT: f64 = 48.0;
pub const DEFAULT_OVERSCAN: usize = 8;
/// Smallest row-height change (px) that triggers a re-layout
pub const DEFAULT_MEASURE_EPSILON: f64 = 0.5;
/// Page sizes offered by the paginated table
pub const PAGE_SIZES: [usize; 3] = [10, 20, 50];

/// Live geometry of a scrollable table body
///
/// `row_height` is always positive and finite; offsets and heights are never
/// negative. Setters normalize bad measurements instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    scroll_offset: f64,
    container_height: f64,
    row_height: f64,
    overscan: usize,
}

impl ViewportState {
    pub fn new(row_height: f64, overscan: usize) -> Self {
        let mut state = Self {
            scroll_offset: 0.0,
            container_height: 0.0,
            row_height: DEFAULT_ROW_HEIGHT,
            overscan,
        };
        state.set_row_height(row_height);
        state
    }

    pub fn with_container_height(mut self, height: f64) -> Self {
        self.set_container_height(height);
        self
    }

    pub fn with_scroll_offset(mut self, offset: f64) -> Self {
        self.set_scroll_offset(offset);
        self
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn container_height(&self) -> f64 {
        self.container_height
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Returns false (and keeps the old height) for non-positive or non-finite input
    pub fn set_row_height(&mut self, height: f64) -> bool {
        if height.is_finite() && height > 0.0 {
            self.row_height = height;
            true
        } else {
            false
        }
    }

    pub fn set_container_height(&mut self, height: f64) {
        self.container_height = non_negative(height);
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = non_negative(offset);
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_HEIGHT, DEFAULT_OVERSCAN)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

/// A contiguous run of rows to render, plus the spacer heights around it
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    /// Height standing in for rows `[0, start)`
    pub top_spacer: f64,
    /// Height standing in for rows `[end, len)`
    pub bottom_spacer: f64,
}

impl Window {
    fn spanning(start: usize, end: usize, len: usize, row_height: f64) -> Self {
        Self {
            start,
            end,
            top_spacer: start as f64 * row_height,
            bottom_spacer: (len - end) as f64 * row_height,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }
}

/// Rows to materialize for `len` rows under the given geometry
///
/// `start = clamp(floor(offset / h) - overscan, 0, len)` and
/// `end = clamp(start + ceil(height / h) + 2 * overscan, 0, len)`. With zero
/// overscan and a fractional offset that end can stop one row short, so it is
/// pushed out to the last partially visible row. A container that hasn't been
/// measured yet gets an empty window at the first visible row.
pub fn compute_window(len: usize, state: &ViewportState) -> Window {
    let row_height = state.row_height;
    let first_visible = (state.scroll_offset / row_height).floor() as usize;

    if state.container_height <= 0.0 {
        let start = first_visible.min(len);
        return Window::spanning(start, start, len, row_height);
    }

    let visible_rows = (state.container_height / row_height).ceil() as usize;
    let start = first_visible.saturating_sub(state.overscan).min(len);
    let formula_end = start
        .saturating_add(visible_rows)
        .saturating_add(state.overscan.saturating_mul(2));
    let touched_end = ((state.scroll_offset + state.container_height) / row_height).ceil() as usize;
    let end = formula_end.max(touched_end).min(len);

    Window::spanning(start, end, len, row_height)
}

/// Number of pages for `len` rows; never less than one
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Rows on a zero-based page, clamped to the last page
///
/// Pagination is windowing with a fixed window size and no scroll-driven
/// movement; spacers are reported the same way so totals still add up.
pub fn page_window(len: usize, page: usize, page_size: usize, row_height: f64) -> Window {
    let size = page_size.max(1);
    let page = page.min(total_pages(len, size) - 1);
    let start = (page * size).min(len);
    let end = (start + size).min(len);
    Window::spanning(start, end, len, row_height)
}

/// Stateful viewport that keeps its window in sync with measurements
#[derive(Debug, Clone)]
pub struct Viewport {
    state: ViewportState,
    len: usize,
    epsilon: f64,
    window: Window,
}

impl Viewport {
    pub fn new(state: ViewportState, epsilon: f64) -> Self {
        let mut viewport = Self {
            state,
            len: 0,
            epsilon: non_negative(epsilon),
            window: Window::default(),
        };
        viewport.recompute();
        viewport
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full scrollable height of all rows
    pub fn total_height(&self) -> f64 {
        self.len as f64 * self.state.row_height
    }

    pub fn max_scroll(&self) -> f64 {
        (self.total_height() - self.state.container_height).max(0.0)
    }

    /// New row count; scroll is pulled back inside the shorter content
    pub fn set_len(&mut self, len: usize) -> Window {
        self.len = len;
        let clamped = self.state.scroll_offset.min(self.max_scroll());
        self.state.set_scroll_offset(clamped);
        self.recompute()
    }

    pub fn resize(&mut self, container_height: f64) -> Window {
        self.state.set_container_height(container_height);
        self.recompute()
    }

    /// Move to `offset`, clamped to `[0, max_scroll]`
    pub fn scroll_to(&mut self, offset: f64) -> Window {
        let clamped = non_negative(offset).min(self.max_scroll());
        self.state.set_scroll_offset(clamped);
        self.recompute()
    }

    pub fn reset_scroll(&mut self) -> Window {
        self.scroll_to(0.0)
    }

    /// Feed a measured row height
    ///
    /// Returns true when the height moved by more than the epsilon and the
    /// window was re-derived. The scroll position keeps the same first row.
    pub fn calibrate(&mut self, measured: f64) -> bool {
        if !measured.is_finite() || measured <= 0.0 {
            debug!(measured, "viewport: ignoring invalid row measurement");
            return false;
        }
        let current = self.state.row_height;
        if (measured - current).abs() <= self.epsilon {
            return false;
        }

        let first_row = self.state.scroll_offset / current;
        self.state.set_row_height(measured);
        let offset = (first_row * measured).min(self.max_scroll());
        self.state.set_scroll_offset(offset);
        self.recompute();
        debug!(from = current, to = measured, "viewport: recalibrated row height");
        true
    }

    fn recompute(&mut self) -> Window {
        self.window = compute_window(self.len, &self.state);
        self.window
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportState::default(), DEFAULT_MEASURE_EPSILON)
    }
}
