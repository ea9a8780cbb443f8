use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notes::NoteStore;
use crate::pagination::{self, DisplayMode};

/// Fixed autoplay cadence, shared with the export artifact's embedded script.
pub const AUTOPLAY_INTERVAL: Duration = Duration::from_millis(3500);

pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 2.5;

/// Transient navigation/display state for one open document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerState {
    pub current_index: usize,
    pub display_mode: DisplayMode,
    pub zoom: f32,
    pub autoplay: bool,
    pub thumbnail_rail_visible: bool,
    pub search_query: String,
}

impl ViewerState {
    fn initial() -> Self {
        Self {
            current_index: 0,
            display_mode: DisplayMode::Spread,
            zoom: ZOOM_MIN,
            autoplay: false,
            thumbnail_rail_visible: false,
            search_query: String::new(),
        }
    }
}

/// Everything the viewer can be asked to do. Events are applied in dispatch
/// order against the latest committed state; there is no coalescing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    Next,
    Prev,
    JumpTo { index: usize },
    ToggleDisplayMode,
    SetZoom { zoom: f32 },
    ToggleAutoplay,
    /// One autoplay timer tick. Fired by the host timer; ignored while
    /// autoplay is off (a tick may race a toggle, harmlessly).
    AutoplayTick,
    ToggleThumbnailRail,
    SelectThumbnail { index: usize },
    SetSearchQuery { query: String },
    /// The platform's fullscreen state as observed by the host, including
    /// externally triggered exits (escape key); the session resynchronizes.
    FullscreenChanged { fullscreen: bool },
    OpenNote { index: usize },
    SaveNote { text: String },
    CancelNote,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteEditor {
    pub page_index: usize,
    /// Whether a persisted entry existed when the editor opened. Saving an
    /// empty draft over nothing must not create a "cleared" entry.
    had_existing: bool,
}

/// The live viewer: the pagination engine composed with the annotation
/// store, autoplay, zoom, numeric search, the thumbnail rail and the
/// fullscreen flag. Single-threaded; owned by exactly one session at a time.
#[derive(Debug)]
pub struct ViewerSession {
    total: usize,
    state: ViewerState,
    fullscreen: bool,
    notes: NoteStore,
    note_editor: Option<NoteEditor>,
}

impl ViewerSession {
    pub fn new(total: usize, notes: NoteStore) -> Self {
        Self {
            total,
            state: ViewerState::initial(),
            fullscreen: false,
            notes,
            note_editor: None,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn note_editor(&self) -> Option<&NoteEditor> {
        self.note_editor.as_ref()
    }

    pub fn note(&self, page_index: usize) -> Option<&str> {
        self.notes.get(page_index)
    }

    pub fn can_go_next(&self) -> bool {
        pagination::can_go_next(self.state.current_index, self.total, self.state.display_mode)
    }

    pub fn can_go_prev(&self) -> bool {
        pagination::can_go_prev(self.state.current_index)
    }

    /// Ascending 1-based page numbers whose decimal representation contains
    /// the current query as a substring. Empty query matches nothing.
    pub fn search_matches(&self) -> Vec<usize> {
        search_matches(&self.state.search_query, self.total)
    }

    pub fn apply(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::Next => {
                self.state.current_index =
                    pagination::next(self.state.current_index, self.total, self.state.display_mode);
            }
            ViewerEvent::Prev => {
                self.state.current_index =
                    pagination::prev(self.state.current_index, self.total, self.state.display_mode);
            }
            ViewerEvent::JumpTo { index } => {
                self.state.current_index =
                    pagination::jump_to(index, self.total, self.state.display_mode);
            }
            ViewerEvent::ToggleDisplayMode => {
                self.state.display_mode = self.state.display_mode.toggled();
                // Re-snap immediately so the state is always render-ready:
                // an odd index entering spread mode moves to its pair start.
                self.state.current_index = pagination::jump_to(
                    self.state.current_index,
                    self.total,
                    self.state.display_mode,
                );
            }
            ViewerEvent::SetZoom { zoom } => {
                self.state.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
            }
            ViewerEvent::ToggleAutoplay => {
                self.state.autoplay = !self.state.autoplay;
            }
            ViewerEvent::AutoplayTick => {
                if !self.state.autoplay {
                    return;
                }
                if self.can_go_next() {
                    self.state.current_index = pagination::next(
                        self.state.current_index,
                        self.total,
                        self.state.display_mode,
                    );
                } else {
                    // The boundary tick disables autoplay instead of
                    // advancing; there is no wrap-around.
                    self.state.autoplay = false;
                }
            }
            ViewerEvent::ToggleThumbnailRail => {
                self.state.thumbnail_rail_visible = !self.state.thumbnail_rail_visible;
            }
            ViewerEvent::SelectThumbnail { index } => {
                self.state.current_index =
                    pagination::jump_to(index, self.total, self.state.display_mode);
                self.state.thumbnail_rail_visible = false;
            }
            ViewerEvent::SetSearchQuery { query } => {
                self.state.search_query = query;
            }
            ViewerEvent::FullscreenChanged { fullscreen } => {
                self.fullscreen = fullscreen;
            }
            ViewerEvent::OpenNote { index } => {
                if index >= self.total {
                    tracing::warn!(index, total = self.total, "note target out of range");
                    return;
                }
                self.note_editor = Some(NoteEditor {
                    page_index: index,
                    had_existing: self.notes.get(index).is_some(),
                });
            }
            ViewerEvent::SaveNote { text } => {
                let Some(editor) = self.note_editor.take() else {
                    return;
                };
                // Closing an untouched empty editor must not materialize an
                // empty-string entry where none existed.
                if text.is_empty() && !editor.had_existing {
                    return;
                }
                self.notes.set(editor.page_index, text);
            }
            ViewerEvent::CancelNote => {
                self.note_editor = None;
            }
        }
    }
}

pub fn search_matches(query: &str, total: usize) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    (1..=total)
        .filter(|page| page.to_string().contains(query))
        .collect()
}
