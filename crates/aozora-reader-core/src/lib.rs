//! aozora-reader-core: line pairing, annotation and session logic for a
//! bilingual annotated reader, with no platform dependencies.
//!
//! This crate provides:
//! - Annotation transforms (ruby, indentation, headings, links)
//! - `LineModel` - parallel original/translated rows per container
//! - `RenderedContainer` - full rebuilds of a container into blocks and HTML
//! - `EditOverlay` and the edit commit protocol
//! - `BookmarkSet` and the two-mode `BookmarkNavigator`
//! - `ReaderSession` - input events in, effects out

pub mod annotation;
pub mod bookmark;
pub mod document;
pub mod edit;
pub mod error;
pub mod line_model;
pub mod overlay;
pub mod page;
pub mod persist;
pub mod popup;
pub mod render;
pub mod session;

pub use annotation::{
    IndentInfo, convert_ruby_to_html, convert_urls_to_links, extract_indent_info,
    strip_heading_directive,
};
pub use bookmark::{BookmarkNavigator, BookmarkSet, Direction, NavMode};
pub use document::{ContainerSource, Metadata, ReaderDocument};
pub use edit::{CommitOutcome, EditDraft, commit_edit};
pub use error::{ReaderError, Result};
pub use line_model::{ContainerKind, LineCache, LineModel, LinePair};
pub use overlay::{EXPORT_FILE_NAME, EditOverlay, OverlayChange};
pub use page::{FEATURE_FRAGMENT_FILE, PageView, render_page};
pub use persist::{
    FontSize, KeyValueStore, MemoryStore, PersistedState, StorageKeys, apply_persistence,
};
pub use popup::{MenuAction, MenuItems, Point, PopupState, Rect, Size, Viewport};
pub use render::{Block, BlockKind, RenderedContainer, RowSide, row_id};
pub use session::{
    BookmarkListing, ClickTarget, Effect, Hit, InputEvent, MessageAction, ReaderSession, Region,
    RevertTarget,
};
pub use smol_str::SmolStr;
