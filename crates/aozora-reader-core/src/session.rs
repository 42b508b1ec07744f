//! The reader session: all mutable state plus the event dispatcher.
//!
//! A host (browser glue, the CLI) turns its own events into [`InputEvent`]s,
//! calls [`ReaderSession::dispatch`], and applies the returned [`Effect`]s.
//! The session itself performs no I/O.

use std::fmt::Write as _;

use markdown_weaver_escape::escape_html;
use smol_str::SmolStr;

use crate::bookmark::{BookmarkNavigator, BookmarkSet, Direction, NavMode};
use crate::document::{Metadata, ReaderDocument};
use crate::edit::{self, CommitOutcome, EditDraft};
use crate::error::{ReaderError, Result};
use crate::line_model::{ContainerKind, LineCache, LineModel};
use crate::overlay::{EXPORT_FILE_NAME, EditOverlay};
use crate::page::{self, PageView};
use crate::persist::{FontSize, KeyValueStore, PersistedState, StorageKeys};
use crate::popup::{
    MenuAction, MenuItems, MenuTarget, Point, PopupState, Rect, Size, TooltipTarget, Transient,
    Viewport, place_context_menu, place_tooltip,
};
use crate::render::{RenderedContainer, RowSide, parse_row_id, row_id, row_number_from_id};

pub const NO_BOOKMARKS_MESSAGE: &str = "ブックマークがありません。";
pub const NO_CONTENTS_MESSAGE: &str = "参照できる章がありません。";
pub const EDIT_DATA_HEADING: &str = "編集内容ファイルの保存/読み込み";
pub const RESET_CONFIRM_MESSAGE: &str =
    "初期状態に戻すと変更内容が消えます。\n先に保存してから戻す事をお勧めします。";
pub const INVALID_IMPORT_MESSAGE: &str = "編集内容のファイルが有効なファイルではありません。";
pub const IMPORT_READ_FAILED_MESSAGE: &str = "ファイルの読み込み中にエラーが発生しました。";

/// Part of the page an event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    Main,
    Footer,
    /// Inside the context menu.
    ContextMenu,
    /// Inside the tooltip currently shown.
    Tooltip,
    /// Inside a modal dialog.
    Modal,
    #[default]
    Other,
}

/// The element under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hit {
    pub element_id: Option<SmolStr>,
    pub region: Region,
}

impl Hit {
    pub fn new(element_id: Option<&str>, region: Region) -> Self {
        Self {
            element_id: element_id.map(SmolStr::new),
            region,
        }
    }

    /// Main-body row this hit is over, if any.
    pub fn main_row(&self) -> Option<u32> {
        if self.region != Region::Main {
            return None;
        }
        let row = row_number_from_id(self.element_id.as_deref()?);
        (row > 0).then_some(row)
    }

    fn container(&self) -> Option<ContainerKind> {
        match self.region {
            Region::Main => Some(ContainerKind::Main),
            Region::Footer => Some(ContainerKind::Footer),
            _ => None,
        }
    }
}

/// A click and the bounding box of the clicked element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClickTarget {
    pub hit: Hit,
    /// Client-space bounding box of the clicked element.
    pub rect: Rect,
}

/// Host-measured popup dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupLayout {
    pub menu: Size,
    pub tooltip: Size,
    /// Computed font size of the popups, in pixels.
    pub font_size: f64,
}

impl Default for PopupLayout {
    fn default() -> Self {
        Self {
            menu: Size::new(200.0, 280.0),
            tooltip: Size::new(320.0, 80.0),
            font_size: 16.0,
        }
    }
}

/// Edit dialog revert buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertTarget {
    Original,
    Translated,
}

/// Buttons of the edit data message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAction {
    SaveEdits,
    LoadEdits,
    ResetEdits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageButton {
    /// 1-based position in the button bar.
    pub id: u8,
    pub label: &'static str,
    pub action: MessageAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBox {
    pub heading: &'static str,
    pub message: Option<String>,
    pub buttons: Vec<MessageButton>,
}

impl MessageBox {
    /// The save / load / reset box offered from the menu.
    pub fn edit_data() -> Self {
        let buttons = [
            ("保存する", MessageAction::SaveEdits),
            ("読み込み", MessageAction::LoadEdits),
            ("初期状態に戻す", MessageAction::ResetEdits),
        ]
        .into_iter()
        .zip(1..)
        .map(|((label, action), id)| MessageButton { id, label, action })
        .collect();
        Self {
            heading: EDIT_DATA_HEADING,
            message: None,
            buttons,
        }
    }
}

/// One bookmark in the bookmark list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEntry {
    pub row: u32,
    pub target_id: SmolStr,
    pub text: String,
    /// The most recently visited bookmark.
    pub primary: bool,
}

impl BookmarkEntry {
    pub fn label(&self) -> String {
        format!("{} : {}", self.row, self.text)
    }
}

/// One heading in the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsEntry {
    pub target_id: SmolStr,
    pub html: String,
}

/// Contents of the bookmark list modal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookmarkListing {
    pub bookmarks: Vec<BookmarkEntry>,
    pub contents: Vec<ContentsEntry>,
}

impl BookmarkListing {
    /// `<li>` items for the bookmark list.
    pub fn bookmarks_html(&self) -> String {
        if self.bookmarks.is_empty() {
            return format!("<li class=\"empty\">{NO_BOOKMARKS_MESSAGE}</li>");
        }
        let mut html = String::new();
        for entry in &self.bookmarks {
            let class = if entry.primary { " class=\"primary\"" } else { "" };
            let _ = write!(html, "<li data-target=\"{}\"{class}>", entry.target_id);
            let _ = escape_html(&mut html, &entry.label());
            html.push_str("</li>");
        }
        html
    }

    /// `<li>` items for the table of contents.
    pub fn contents_html(&self) -> String {
        if self.contents.is_empty() {
            return format!("<li class=\"empty\">{NO_CONTENTS_MESSAGE}</li>");
        }
        self.contents
            .iter()
            .map(|entry| format!("<li data-target=\"{}\">{}</li>", entry.target_id, entry.html))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The header fragment finished loading.
    FragmentLoaded { html: String },
    FragmentFailed { path: String, reason: String },
    MouseMove { position: Point, hit: Hit },
    Click { target: ClickTarget, position: Point },
    /// The platform's own context menu was requested.
    NativeContextMenu,
    KeyDown {
        key: SmolStr,
        alt: bool,
        shift: bool,
    },
    MenuAction(MenuAction),
    BookmarkListItem { target_id: SmolStr },
    BookmarkListClosed,
    EditDraftChanged { text: String },
    EditRevert(RevertTarget),
    EditDialogClosed,
    MessageBoxButton(MessageAction),
    MessageBoxClosed,
    ImportFileRead { contents: String },
    ImportFileFailed { reason: String },
    ResetConfirmed,
    ViewportChanged(Viewport),
    Layout(PopupLayout),
}

/// Something the host must do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace a container's children.
    ReplaceContainer { kind: ContainerKind, html: String },
    /// Replace the main-body element with this id.
    ReplaceBlock { id: SmolStr, html: String },
    /// Insert markup before the main-body element with this id.
    InsertBefore { before_id: SmolStr, html: String },
    AppendToHeader { html: String },
    /// Full navigation to the page with this fragment.
    Navigate { fragment: Option<SmolStr> },
    ShowTooltip {
        container: ContainerKind,
        original_id: SmolStr,
        position: Point,
    },
    MoveTooltip { position: Point },
    HideTooltip {
        container: ContainerKind,
        original_id: SmolStr,
    },
    ShowContextMenu { position: Point, items: MenuItems },
    HideContextMenu,
    ShowBookmarkList(BookmarkListing),
    HideBookmarkList,
    ShowEditDialog { row: u32, text: String },
    SetEditDialogText { text: String },
    HideEditDialog,
    ShowMessageBox(MessageBox),
    HideMessageBox,
    SetFontSize { from: FontSize, to: FontSize },
    Persist { key: String, value: String },
    RemoveKey { key: String },
    Download { filename: String, contents: String },
    OpenFilePicker,
    Confirm { message: String },
    Alert { message: String },
}

/// One open document and everything the reader tracks about it.
#[derive(Debug, Clone)]
pub struct ReaderSession {
    keys: StorageKeys,
    metadata: Metadata,
    cache: LineCache,
    main_model: LineModel,
    footer_model: LineModel,
    main: RenderedContainer,
    footer: RenderedContainer,
    overlay: EditOverlay,
    bookmarks: BookmarkSet,
    navigator: BookmarkNavigator,
    popups: PopupState,
    font_size: FontSize,
    viewport: Viewport,
    layout: PopupLayout,
    pointer: Point,
    hover: Hit,
    keyboard_menu: bool,
    features_ready: bool,
    header_fragment: Option<String>,
    draft: Option<EditDraft>,
    /// Document-space box of the tooltip's trigger.
    tooltip_anchor: Option<Rect>,
}

impl ReaderSession {
    /// Build a session from the embedded document and persisted state.
    pub fn load(doc: &ReaderDocument, keys: StorageKeys, store: &mut impl KeyValueStore) -> Result<Self> {
        let state = PersistedState::load(store, &keys)?;
        let mut cache = LineCache::new();
        let main_model = resolve_model(&mut cache, doc, ContainerKind::Main)
            .unwrap_or_else(|| LineModel::empty(ContainerKind::Main));
        let footer_model = resolve_model(&mut cache, doc, ContainerKind::Footer)
            .unwrap_or_else(|| LineModel::empty(ContainerKind::Footer));

        let main = RenderedContainer::build(&main_model, &state.overlay);
        let footer = RenderedContainer::build(&footer_model, &EditOverlay::new());

        let mut bookmarks = state.bookmarks;
        if !main_model.is_empty() {
            let before = bookmarks.len();
            bookmarks.retain(|row| main.primary_index(*row).is_some());
            if bookmarks.len() != before {
                tracing::debug!(
                    target: "aozora::session",
                    dropped = before - bookmarks.len(),
                    "dropped bookmarks on rows without an element"
                );
            }
        }

        tracing::info!(
            target: "aozora::session",
            namespace = keys.namespace(),
            rows = main_model.len(),
            edits = state.overlay.len(),
            bookmarks = bookmarks.len(),
            font_size = state.font_size.level(),
            "session loaded"
        );

        Ok(Self {
            keys,
            metadata: doc.metadata.clone(),
            cache,
            main_model,
            footer_model,
            main,
            footer,
            overlay: state.overlay,
            bookmarks,
            navigator: BookmarkNavigator::new(),
            popups: PopupState::new(),
            font_size: state.font_size,
            viewport: Viewport::default(),
            layout: PopupLayout::default(),
            pointer: Point::default(),
            hover: Hit::default(),
            keyboard_menu: false,
            features_ready: false,
            header_fragment: None,
            draft: None,
            tooltip_anchor: None,
        })
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn main_model(&self) -> &LineModel {
        &self.main_model
    }

    pub fn main(&self) -> &RenderedContainer {
        &self.main
    }

    pub fn footer(&self) -> &RenderedContainer {
        &self.footer
    }

    pub fn overlay(&self) -> &EditOverlay {
        &self.overlay
    }

    pub fn bookmarks(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    pub fn navigator(&self) -> &BookmarkNavigator {
        &self.navigator
    }

    pub fn popups(&self) -> &PopupState {
        &self.popups
    }

    pub fn font_size(&self) -> FontSize {
        self.font_size
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn features_ready(&self) -> bool {
        self.features_ready
    }

    /// Whole page as currently rendered.
    pub fn page_html(&self) -> String {
        page::render_page(&PageView {
            metadata: &self.metadata,
            main: &self.main,
            footer: &self.footer,
            bookmarks: &self.bookmarks,
            font_size: self.font_size,
            header_fragment: self.header_fragment.as_deref(),
        })
    }

    /// Apply one input event.
    pub fn dispatch(&mut self, event: InputEvent) -> Vec<Effect> {
        tracing::trace!(target: "aozora::session", ?event, "dispatch");
        match event {
            InputEvent::FragmentLoaded { html } => {
                self.features_ready = true;
                self.header_fragment = Some(html.clone());
                vec![Effect::AppendToHeader { html }]
            }
            InputEvent::FragmentFailed { path, reason } => {
                let err = ReaderError::FragmentLoad { path, reason };
                tracing::error!(target: "aozora::session", %err, "menu and dialogs unavailable");
                Vec::new()
            }
            InputEvent::MouseMove { position, hit } => {
                self.pointer = position;
                self.hover = hit;
                Vec::new()
            }
            InputEvent::Click { target, position } => self.on_click(target, position),
            InputEvent::NativeContextMenu => {
                let mut effects = Vec::new();
                if self.popups.is_menu_open() {
                    self.close_transient(&mut effects);
                }
                effects
            }
            InputEvent::ViewportChanged(viewport) => self.on_viewport_changed(viewport),
            InputEvent::Layout(layout) => {
                self.layout = layout;
                Vec::new()
            }
            event if !self.features_ready => {
                tracing::debug!(
                    target: "aozora::session",
                    ?event,
                    "header fragment not loaded, ignoring event"
                );
                Vec::new()
            }
            InputEvent::KeyDown { key, alt, shift } => self.on_key_down(&key, alt, shift),
            InputEvent::MenuAction(action) => self.on_menu_action(action),
            InputEvent::BookmarkListItem { target_id } => {
                let mut effects = vec![Effect::Navigate {
                    fragment: Some(target_id),
                }];
                self.close_bookmark_list(&mut effects);
                self.close_transient(&mut effects);
                effects
            }
            InputEvent::BookmarkListClosed => {
                let mut effects = Vec::new();
                self.close_bookmark_list(&mut effects);
                effects
            }
            InputEvent::EditDraftChanged { text } => {
                if let Some(draft) = self.draft.as_mut() {
                    draft.text = text;
                }
                Vec::new()
            }
            InputEvent::EditRevert(target) => {
                let Some(draft) = self.draft.as_mut() else {
                    return Vec::new();
                };
                match target {
                    RevertTarget::Original => draft.revert_to_original(&self.main_model),
                    RevertTarget::Translated => draft.revert_to_translated(&self.main_model),
                }
                vec![Effect::SetEditDialogText {
                    text: draft.text.clone(),
                }]
            }
            InputEvent::EditDialogClosed => self.close_edit_dialog(),
            InputEvent::MessageBoxButton(action) => self.on_message_box_button(action),
            InputEvent::MessageBoxClosed => {
                self.popups.message_box = false;
                vec![Effect::HideMessageBox]
            }
            InputEvent::ImportFileRead { contents } => self.import_edits(&contents),
            InputEvent::ImportFileFailed { reason } => {
                tracing::error!(target: "aozora::session", %reason, "reading edit data file failed");
                vec![Effect::Alert {
                    message: IMPORT_READ_FAILED_MESSAGE.to_string(),
                }]
            }
            InputEvent::ResetConfirmed => self.reset_edits(),
        }
    }

    fn on_click(&mut self, target: ClickTarget, position: Point) -> Vec<Effect> {
        let mut effects = Vec::new();
        match target.hit.region {
            // Menu and modal contents report their own events.
            Region::ContextMenu | Region::Modal => return effects,
            Region::Tooltip => {
                if self.popups.is_tooltip_open() {
                    self.close_transient(&mut effects);
                }
                return effects;
            }
            _ => {}
        }

        if let Some(tooltip) = self.tooltip_target(&target.hit) {
            let was_open = self.popups.tooltip() == Some(&tooltip);
            self.close_transient(&mut effects);
            if !was_open {
                self.show_tooltip(tooltip, target.rect, &mut effects);
            }
            return effects;
        }

        if self.popups.is_tooltip_open() {
            self.close_transient(&mut effects);
        }

        if let Some(row) = self.marker_zone_row(&target, position) {
            match self.toggle_bookmark(row) {
                Ok(toggled) => effects.extend(toggled),
                Err(err) => tracing::error!(target: "aozora::session", %err, "marker click"),
            }
            return effects;
        }

        if !self.features_ready {
            return effects;
        }

        if self.popups.is_menu_open() {
            self.close_transient(&mut effects);
        } else {
            self.open_menu(position, target.hit, &mut effects);
        }
        effects
    }

    /// The tooltip a click on a translated-side element toggles.
    fn tooltip_target(&self, hit: &Hit) -> Option<TooltipTarget> {
        let container = hit.container()?;
        let trigger_id = hit.element_id.clone()?;
        let (row, side) = parse_row_id(&trigger_id)?;
        if side != RowSide::Translated {
            return None;
        }

        let original_id = row_id(row, RowSide::Original);
        let rendered = match container {
            ContainerKind::Main => &self.main,
            ContainerKind::Footer => &self.footer,
        };
        if !rendered.contains_id(&original_id) {
            let err = ReaderError::MissingElement(original_id.to_string());
            tracing::error!(target: "aozora::session", %err, "tooltip content not found");
            return None;
        }
        Some(TooltipTarget {
            container,
            original_id,
            trigger_id,
        })
    }

    fn show_tooltip(&mut self, tooltip: TooltipTarget, trigger: Rect, effects: &mut Vec<Effect>) {
        let position = place_tooltip(trigger, self.layout.tooltip, self.layout.font_size, &self.viewport);
        self.tooltip_anchor = Some(Rect {
            left: trigger.left + self.viewport.scroll_x,
            top: trigger.top + self.viewport.scroll_y,
            ..trigger
        });
        effects.push(Effect::ShowTooltip {
            container: tooltip.container,
            original_id: tooltip.original_id.clone(),
            position,
        });
        self.popups.show_tooltip(tooltip);
    }

    /// Bookmarked row whose marker (left of the element) was clicked.
    fn marker_zone_row(&self, target: &ClickTarget, position: Point) -> Option<u32> {
        let (row, side) = parse_row_id(target.hit.element_id.as_deref()?)?;
        let hit_marker = target.hit.region == Region::Main
            && side.is_primary()
            && self.bookmarks.contains(row)
            && position.x <= target.rect.left;
        hit_marker.then_some(row)
    }

    fn open_menu(&mut self, position: Point, hit: Hit, effects: &mut Vec<Effect>) {
        let (point, hit) = if std::mem::take(&mut self.keyboard_menu) {
            (self.pointer, self.hover.clone())
        } else {
            (position, hit)
        };

        let target = MenuTarget {
            row: hit.main_row().unwrap_or(0),
            element_id: hit.element_id,
        };
        let items = MenuItems::for_target(&target, self.bookmarks.contains(target.row));
        let position = place_context_menu(point, self.layout.menu, self.layout.font_size, &self.viewport);
        self.close_transient(effects);
        self.popups.open_menu(target);
        effects.push(Effect::ShowContextMenu { position, items });
    }

    fn close_transient(&mut self, effects: &mut Vec<Effect>) {
        match self.popups.close_transient() {
            Transient::None => {}
            Transient::Tooltip(tooltip) => {
                self.tooltip_anchor = None;
                effects.push(Effect::HideTooltip {
                    container: tooltip.container,
                    original_id: tooltip.original_id,
                });
            }
            Transient::ContextMenu(_) => effects.push(Effect::HideContextMenu),
        }
    }

    fn close_bookmark_list(&mut self, effects: &mut Vec<Effect>) {
        if std::mem::take(&mut self.popups.bookmark_list) {
            effects.push(Effect::HideBookmarkList);
        }
    }

    fn on_viewport_changed(&mut self, viewport: Viewport) -> Vec<Effect> {
        self.viewport = viewport;
        let Some(anchor) = self.tooltip_anchor.filter(|_| self.popups.is_tooltip_open()) else {
            return Vec::new();
        };
        let trigger = Rect {
            left: anchor.left - viewport.scroll_x,
            top: anchor.top - viewport.scroll_y,
            ..anchor
        };
        let position = place_tooltip(trigger, self.layout.tooltip, self.layout.font_size, &viewport);
        vec![Effect::MoveTooltip { position }]
    }

    fn on_key_down(&mut self, key: &str, alt: bool, shift: bool) -> Vec<Effect> {
        let is_b = key.eq_ignore_ascii_case("b");
        let mut effects = Vec::new();
        if key == "Escape" {
            self.close_transient(&mut effects);
            self.close_bookmark_list(&mut effects);
        } else if alt && is_b {
            effects.extend(self.navigate(Direction::Next));
            effects.push(self.show_bookmark_list());
        } else if shift && is_b {
            effects.extend(self.navigate(Direction::Previous));
            effects.push(self.show_bookmark_list());
        } else if key == "b" {
            if let Some(row) = self.hover.main_row() {
                match self.toggle_bookmark(row) {
                    Ok(toggled) => effects.extend(toggled),
                    Err(err) => tracing::error!(target: "aozora::session", %err, "bookmark key"),
                }
            }
        } else if key == "ContextMenu" {
            self.keyboard_menu = true;
        }
        effects
    }

    fn on_menu_action(&mut self, action: MenuAction) -> Vec<Effect> {
        let Some(target) = self.popups.menu_target().cloned() else {
            tracing::debug!(target: "aozora::session", ?action, "menu action with no menu open");
            return Vec::new();
        };

        let mut effects = Vec::new();
        match action {
            MenuAction::ToggleBookmark if target.is_row() => match self.toggle_bookmark(target.row) {
                Ok(toggled) => effects.extend(toggled),
                Err(err) => tracing::error!(target: "aozora::session", %err, "menu bookmark"),
            },
            MenuAction::OpenBookmarkList => effects.push(self.show_bookmark_list()),
            MenuAction::EditSentence if target.is_row() => {
                match EditDraft::open(&self.main_model, &self.overlay, target.row) {
                    Ok(draft) => {
                        effects.push(Effect::ShowEditDialog {
                            row: draft.row,
                            text: draft.text.clone(),
                        });
                        self.draft = Some(draft);
                        self.popups.edit_dialog = true;
                    }
                    Err(err) => tracing::error!(target: "aozora::session", %err, "open edit dialog"),
                }
            }
            MenuAction::EditData => {
                self.popups.message_box = true;
                effects.push(Effect::ShowMessageBox(MessageBox::edit_data()));
            }
            MenuAction::ChangeFontSize => {
                effects.extend(self.cycle_font_size());
                effects.push(Effect::Navigate {
                    fragment: target.element_id.clone(),
                });
            }
            MenuAction::ToggleBookmark | MenuAction::EditSentence | MenuAction::Close => {}
        }

        if !action.keeps_menu_open() {
            self.close_transient(&mut effects);
        }
        effects
    }

    fn close_edit_dialog(&mut self) -> Vec<Effect> {
        self.popups.edit_dialog = false;
        let mut effects = vec![Effect::HideEditDialog];
        let Some(draft) = self.draft.take() else {
            return effects;
        };
        match self.commit_edit(draft.row, &draft.text) {
            Ok(committed) => effects.extend(committed),
            Err(err) => tracing::error!(target: "aozora::session", %err, "commit edit"),
        }
        effects
    }

    fn on_message_box_button(&mut self, action: MessageAction) -> Vec<Effect> {
        self.popups.message_box = false;
        let mut effects = vec![Effect::HideMessageBox];
        match action {
            MessageAction::SaveEdits => match self.export_edits() {
                Ok(download) => effects.push(download),
                Err(err) => tracing::error!(target: "aozora::session", %err, "export edits"),
            },
            MessageAction::LoadEdits => effects.push(Effect::OpenFilePicker),
            MessageAction::ResetEdits => effects.push(Effect::Confirm {
                message: RESET_CONFIRM_MESSAGE.to_string(),
            }),
        }
        effects
    }

    fn show_bookmark_list(&mut self) -> Effect {
        self.popups.bookmark_list = true;
        Effect::ShowBookmarkList(self.bookmark_listing())
    }

    /// Flip a main-body row's bookmark and persist the set.
    pub fn toggle_bookmark(&mut self, row: u32) -> Result<Vec<Effect>> {
        let index = self.main.primary_index(row).ok_or(ReaderError::NoSuchRow(row))?;
        let bookmarked = self.bookmarks.toggle(row);
        let block = self.main.block(index).ok_or(ReaderError::NoSuchRow(row))?;
        let id = block.id().ok_or(ReaderError::NoSuchRow(row))?;

        tracing::info!(target: "aozora::session", row, bookmarked, "toggled bookmark");

        Ok(vec![
            Effect::ReplaceBlock {
                id,
                html: block.to_html(bookmarked),
            },
            Effect::Persist {
                key: self.keys.bookmark_rows(),
                value: self.bookmarks.encode(),
            },
        ])
    }

    /// Commit edited text for a main-body row.
    pub fn commit_edit(&mut self, row: u32, text: &str) -> Result<Vec<Effect>> {
        let outcome = edit::commit_edit(&mut self.main, &self.main_model, &mut self.overlay, row, text)?;
        let CommitOutcome::Applied(applied) = outcome else {
            return Ok(Vec::new());
        };

        let mut effects = Vec::new();
        let block = self
            .main
            .block(applied.index)
            .ok_or(ReaderError::NoSuchRow(row))?;
        effects.push(Effect::ReplaceBlock {
            id: applied.previous_id,
            html: block.to_html(self.bookmarks.contains(row)),
        });
        if let Some(original) = applied.inserted_original.and_then(|i| self.main.block(i)) {
            if let Some(before_id) = block.id() {
                effects.push(Effect::InsertBefore {
                    before_id,
                    html: original.to_html(false),
                });
            }
        }
        effects.push(self.persist_overlay()?);
        Ok(effects)
    }

    /// Jump to the next or previous bookmark.
    pub fn navigate(&mut self, direction: Direction) -> Vec<Effect> {
        let mode = if self.popups.bookmark_list {
            NavMode::List
        } else {
            NavMode::Cursor {
                row_under_cursor: self.hover.main_row(),
            }
        };
        match self.navigator.step(&self.bookmarks, mode, direction) {
            Some(row) => self.jump_to_row(row).into_iter().collect(),
            None => Vec::new(),
        }
    }

    fn jump_to_row(&self, row: u32) -> Option<Effect> {
        match self.main.jump_target(row) {
            Some(id) => Some(Effect::Navigate { fragment: Some(id) }),
            None => {
                let err = ReaderError::NoSuchRow(row);
                tracing::error!(target: "aozora::session", %err, "bookmark jump target missing");
                None
            }
        }
    }

    /// Replace the overlay with imported edit data and rebuild.
    ///
    /// Malformed data raises an alert and leaves the session untouched.
    pub fn import_edits(&mut self, json: &str) -> Vec<Effect> {
        let overlay = match EditOverlay::from_json(json) {
            Ok(overlay) => overlay,
            Err(err) => {
                tracing::error!(target: "aozora::session", %err, "rejecting edit data import");
                return vec![Effect::Alert {
                    message: INVALID_IMPORT_MESSAGE.to_string(),
                }];
            }
        };

        tracing::info!(target: "aozora::session", edits = overlay.len(), "imported edit data");
        self.overlay = overlay;
        let mut effects = Vec::new();
        match self.persist_overlay() {
            Ok(persist) => effects.push(persist),
            Err(err) => tracing::error!(target: "aozora::session", %err, "persist imported edits"),
        }
        effects.extend(self.rebuild());
        effects
    }

    /// Drop every edit and rebuild.
    pub fn reset_edits(&mut self) -> Vec<Effect> {
        tracing::info!(target: "aozora::session", edits = self.overlay.len(), "resetting edits");
        self.overlay.clear();
        let mut effects = vec![Effect::RemoveKey {
            key: self.keys.mod_rows(),
        }];
        effects.extend(self.rebuild());
        effects
    }

    /// The overlay as an export download.
    pub fn export_edits(&self) -> Result<Effect> {
        Ok(Effect::Download {
            filename: EXPORT_FILE_NAME.to_string(),
            contents: self.overlay.to_export_json()?,
        })
    }

    /// Step the font size and persist it.
    pub fn cycle_font_size(&mut self) -> Vec<Effect> {
        let from = self.font_size;
        let to = from.cycle();
        self.font_size = to;
        vec![
            Effect::SetFontSize { from, to },
            Effect::Persist {
                key: self.keys.font_size(),
                value: to.level().to_string(),
            },
        ]
    }

    /// Full rebuild of both containers from the current state.
    pub fn rebuild(&mut self) -> Vec<Effect> {
        self.main = RenderedContainer::build(&self.main_model, &self.overlay);
        self.footer = RenderedContainer::build(&self.footer_model, &EditOverlay::new());
        self.navigator.reset();
        vec![
            Effect::ReplaceContainer {
                kind: ContainerKind::Main,
                html: self.main.to_html(&self.bookmarks),
            },
            Effect::ReplaceContainer {
                kind: ContainerKind::Footer,
                html: page::footer_html(&self.footer, &self.metadata),
            },
        ]
    }

    /// Re-read line sources from a document and rebuild.
    ///
    /// Main-body blocks that are now missing fall back to the lines of the
    /// last successful load. A container whose sides disagree keeps its
    /// previous lines.
    pub fn reload(&mut self, doc: &ReaderDocument) -> Vec<Effect> {
        if let Some(model) = resolve_model(&mut self.cache, doc, ContainerKind::Main) {
            self.main_model = model;
        }
        if let Some(model) = resolve_model(&mut self.cache, doc, ContainerKind::Footer) {
            self.footer_model = model;
        }
        self.rebuild()
    }

    /// Bookmark and table-of-contents entries for the list modal.
    pub fn bookmark_listing(&self) -> BookmarkListing {
        let last = self.navigator.last_index();
        let bookmarks = self
            .bookmarks
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let block = self.main.primary_block(row)?;
                Some(BookmarkEntry {
                    row,
                    target_id: block.id()?,
                    text: block.plain_text(),
                    primary: last == Some(index),
                })
            })
            .collect();
        let contents = self
            .main
            .headings()
            .filter_map(|block| {
                Some(ContentsEntry {
                    target_id: block.id()?,
                    html: block.inner_html.clone(),
                })
            })
            .collect();
        BookmarkListing {
            bookmarks,
            contents,
        }
    }

    fn persist_overlay(&self) -> Result<Effect> {
        Ok(Effect::Persist {
            key: self.keys.mod_rows(),
            value: self.overlay.to_json()?,
        })
    }
}

fn resolve_model(cache: &mut LineCache, doc: &ReaderDocument, kind: ContainerKind) -> Option<LineModel> {
    let source = doc.source(kind);
    match cache.resolve(kind, source.original(), source.translated()) {
        Ok(model) => Some(model),
        Err(err) => {
            tracing::warn!(target: "aozora::session", %err, "skipping container render");
            None
        }
    }
}
