use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;
use web_time::Instant;

use crate::config::ViewerConfig;
use crate::enums::ViewerEvent;
use crate::error::ViewerError;
use crate::region_stats::{RegionStatistics, region_stats};
use crate::selection::{SelectionController, SelectionRect, SelectionState};
use crate::slice::Slice;
use crate::slice_store::{SliceStore, Study};
use crate::window_mapper::{WindowMapper, WindowSetting};
use crate::worker::BackgroundWorker;

/// Pointer-move handling slower than one 60 Hz frame is reported.
const INTERACTIVE_BUDGET: Duration = Duration::from_millis(16);

/// Selection rectangle plus its statistics, ready to be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub rect: SelectionRect,
    pub statistics: RegionStatistics,
    pub generation: u64,
}

/// Everything the display collaborator needs to paint the current view.
#[derive(Debug, Clone)]
pub struct Frame {
    pub display: GrayImage,
    pub overlay: Option<Overlay>,
    pub generation: u64,
}

/// Raw value under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelProbe {
    pub x: usize,
    pub y: usize,
    pub value: i32,
}

/// Outcome of [`ViewerSession::handle`].
#[derive(Debug, Clone)]
pub enum ViewerUpdate {
    /// The whole view changed and must be repainted.
    Frame(Frame),
    /// Only the selection overlay changed; `None` removes it.
    Overlay(Option<Overlay>),
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    session: usize,
    series: usize,
    slice: usize,
}

/// Interactive state of one viewer: loaded study, current position,
/// window and region selection.
///
/// Every navigation discards the selection, since a rectangle only has a
/// meaning in the coordinate space of the slice it was drawn on, and marks
/// jobs still running on the session's [`BackgroundWorker`] as stale. Failed
/// operations leave the state untouched.
#[derive(Debug)]
pub struct ViewerSession {
    config: ViewerConfig,
    store: SliceStore,
    mapper: WindowMapper,
    window: WindowSetting,
    cursor: Option<Cursor>,
    selection: SelectionController,
    generation: u64,
    worker: BackgroundWorker,
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerSession {
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::default())
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        Self {
            mapper: WindowMapper::new(config.display_max),
            window: config.default_window,
            config,
            store: SliceStore::new(),
            cursor: None,
            selection: SelectionController::default(),
            generation: 0,
            worker: BackgroundWorker::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Replace the loaded study and move to its first slice.
    ///
    /// Returns the session keys in listing order.
    pub fn load_study(&mut self, study: Study) -> Vec<String> {
        self.store.load(study);
        self.advance_generation();
        self.cursor = (!self.store.is_empty()).then_some(Cursor {
            session: 0,
            series: 0,
            slice: 0,
        });
        let (width, height) = self
            .current_slice()
            .map(|slice| slice.dim())
            .unwrap_or_default();
        self.selection.reset(width, height);

        let keys = self.store.study().session_keys();
        log::info!(
            "Loaded study with {} session(s), {} slice(s)",
            keys.len(),
            self.store.study().slice_count()
        );
        keys
    }

    pub fn session_keys(&self) -> Vec<String> {
        self.store.study().session_keys()
    }

    /// Series keys of the current session.
    pub fn series_keys(&self) -> Result<Vec<String>, ViewerError> {
        let cursor = self.cursor()?;
        Ok(self.store.session(cursor.session)?.series_keys())
    }

    /// Labels of the slices in the current series, in display order.
    pub fn slice_labels(&self) -> Result<Vec<String>, ViewerError> {
        let cursor = self.cursor()?;
        let series = self.store.series(cursor.session, cursor.series)?;
        Ok(series
            .slices()
            .iter()
            .map(|slice| slice.label().to_string())
            .collect())
    }

    /// Number of slices in the current series.
    pub fn series_len(&self) -> Result<usize, ViewerError> {
        let cursor = self.cursor()?;
        Ok(self.store.series(cursor.session, cursor.series)?.len())
    }

    pub fn current_session_key(&self) -> Option<&str> {
        let cursor = self.cursor.as_ref()?;
        self.store.session(cursor.session).ok().map(|s| s.key())
    }

    pub fn current_series_key(&self) -> Option<&str> {
        let cursor = self.cursor.as_ref()?;
        self.store
            .series(cursor.session, cursor.series)
            .ok()
            .map(|s| s.key())
    }

    pub fn current_slice_index(&self) -> Option<usize> {
        self.cursor.map(|cursor| cursor.slice)
    }

    pub fn current_slice(&self) -> Result<Arc<Slice>, ViewerError> {
        let cursor = self.cursor()?;
        self.store
            .slice(cursor.session, cursor.series, cursor.slice)
            .cloned()
    }

    pub fn window(&self) -> WindowSetting {
        self.window
    }

    pub fn selection(&self) -> Option<SelectionRect> {
        self.selection.rect()
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    /// Counter of view changes; output tagged with an older value is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn select_session(&mut self, key: &str) -> Result<Frame, ViewerError> {
        let session = self.store.session_position(key)?;
        log::debug!("session changed to `{key}`");
        self.navigate(Cursor {
            session,
            series: 0,
            slice: 0,
        })
    }

    pub fn select_series(&mut self, key: &str) -> Result<Frame, ViewerError> {
        let cursor = self.cursor()?;
        let series = self.store.series_position(cursor.session, key)?;
        log::debug!("series changed to `{key}`");
        self.navigate(Cursor {
            series,
            slice: 0,
            ..cursor
        })
    }

    pub fn select_slice(&mut self, index: usize) -> Result<Frame, ViewerError> {
        let cursor = self.cursor()?;
        log::debug!("slice changed to {index}");
        self.navigate(Cursor {
            slice: index,
            ..cursor
        })
    }

    /// Change the window, clamped to the configured ranges. The selection is kept.
    pub fn set_window(&mut self, level: i32, width: i32) -> Result<Frame, ViewerError> {
        self.cursor()?;
        self.window = self.config.clamp_window(level, width);
        log::debug!("window set to {:?}", self.window);
        self.render()
    }

    /// Fit the window to the value range of the current slice.
    pub fn auto_window(&mut self) -> Result<Frame, ViewerError> {
        let window = WindowSetting::from_value_range(self.current_slice()?.value_range());
        self.set_window(window.level, window.width)
    }

    pub fn pointer_down(&mut self, x: i32, y: i32) -> Result<Option<Overlay>, ViewerError> {
        let slice = self.current_slice()?;
        match self.selection.pointer_down(x, y) {
            Some(rect) => self.overlay_for(&slice, rect).map(Some),
            None => Ok(None),
        }
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) -> Result<Option<Overlay>, ViewerError> {
        let slice = self.current_slice()?;
        let Some(rect) = self.selection.pointer_move(x, y) else {
            return Ok(None);
        };

        let started = Instant::now();
        let overlay = self.overlay_for(&slice, rect)?;
        let elapsed = started.elapsed();
        if elapsed > INTERACTIVE_BUDGET {
            log::warn!(
                "Region statistics for {}x{} took {elapsed:?}",
                rect.width(),
                rect.height()
            );
        }
        Ok(Some(overlay))
    }

    pub fn pointer_up(&mut self, x: i32, y: i32) -> Result<Option<Overlay>, ViewerError> {
        let slice = self.current_slice()?;
        match self.selection.pointer_up(x, y) {
            Some(rect) => self.overlay_for(&slice, rect).map(Some),
            None => Ok(None),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.advance_generation();
    }

    /// Worker whose outstanding jobs are discarded whenever this session
    /// navigates, loads a study or clears its selection.
    pub fn worker(&self) -> &BackgroundWorker {
        &self.worker
    }

    /// Compute the statistics of the current selection on the session's
    /// worker. Returns `Ok(None)` when nothing is selected; the future
    /// resolves to `Ok(None)` if the view changed before it finished.
    pub fn submit_region_stats(
        &self,
    ) -> Result<
        Option<impl Future<Output = Result<Option<RegionStatistics>, ViewerError>> + Send + use<>>,
        ViewerError,
    > {
        let slice = self.current_slice()?;
        let Some(rect) = self.selection.rect() else {
            return Ok(None);
        };
        let pending = self.worker.submit(move || region_stats(&slice, rect));
        Ok(Some(async move {
            match pending.await? {
                Some(stats) => stats.map(Some),
                None => Ok(None),
            }
        }))
    }

    /// Raw value under the pointer, if it is over the current slice.
    pub fn probe(&self, x: i32, y: i32) -> Option<PixelProbe> {
        let slice = self.current_slice().ok()?;
        if !slice.contains(x, y) {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        slice
            .value_at(x, y)
            .map(|value| PixelProbe { x, y, value })
    }

    /// Window the current slice and attach the selection overlay, if any.
    ///
    /// A selection whose statistics cannot be computed is cleared, so the
    /// state never holds a rectangle that is not displayed.
    pub fn render(&mut self) -> Result<Frame, ViewerError> {
        let slice = self.current_slice()?;
        let display = self.mapper.render(&slice, self.window);
        let overlay = match self.selection.rect() {
            Some(rect) => match self.overlay_for(&slice, rect) {
                Ok(overlay) => Some(overlay),
                Err(err) => {
                    log::warn!("Dropping selection overlay: {err}");
                    self.clear_selection();
                    None
                }
            },
            None => None,
        };
        Ok(Frame {
            display,
            overlay,
            generation: self.generation,
        })
    }

    /// Apply one UI event. Errors are logged and leave the view unchanged.
    pub fn handle(&mut self, event: ViewerEvent) -> ViewerUpdate {
        let result = match event {
            ViewerEvent::PointerDown { x, y } => {
                self.pointer_down(x, y).map(Self::overlay_update)
            }
            ViewerEvent::PointerMove { x, y } => {
                self.pointer_move(x, y).map(Self::overlay_update)
            }
            ViewerEvent::PointerUp { x, y } => self.pointer_up(x, y).map(Self::overlay_update),
            ViewerEvent::SliceIndexChanged(index) => {
                self.select_slice(index).map(ViewerUpdate::Frame)
            }
            ViewerEvent::SessionChanged(key) => {
                self.select_session(&key).map(ViewerUpdate::Frame)
            }
            ViewerEvent::SeriesChanged(key) => self.select_series(&key).map(ViewerUpdate::Frame),
            ViewerEvent::WindowChanged { level, width } => {
                self.set_window(level, width).map(ViewerUpdate::Frame)
            }
            ViewerEvent::ClearSelection => {
                let had_selection = self.selection.rect().is_some();
                self.clear_selection();
                Ok(if had_selection {
                    ViewerUpdate::Overlay(None)
                } else {
                    ViewerUpdate::Unchanged
                })
            }
        };

        result.unwrap_or_else(|err| {
            log::warn!("Ignoring event: {err}");
            ViewerUpdate::Unchanged
        })
    }

    fn overlay_update(overlay: Option<Overlay>) -> ViewerUpdate {
        match overlay {
            Some(overlay) => ViewerUpdate::Overlay(Some(overlay)),
            None => ViewerUpdate::Unchanged,
        }
    }

    fn cursor(&self) -> Result<Cursor, ViewerError> {
        self.cursor.ok_or(ViewerError::EmptyStudy)
    }

    fn navigate(&mut self, cursor: Cursor) -> Result<Frame, ViewerError> {
        let (width, height) = self
            .store
            .slice(cursor.session, cursor.series, cursor.slice)?
            .dim();
        self.cursor = Some(cursor);
        self.selection.reset(width, height);
        self.advance_generation();
        self.render()
    }

    fn advance_generation(&mut self) {
        self.generation += 1;
        self.worker.invalidate();
    }

    fn overlay_for(&self, slice: &Slice, rect: SelectionRect) -> Result<Overlay, ViewerError> {
        Ok(Overlay {
            rect,
            statistics: region_stats(slice, rect)?,
            generation: self.generation,
        })
    }
}
