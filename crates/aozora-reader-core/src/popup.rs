//! Popup state and placement.
//!
//! The tooltip (original text over a translated row) and the context menu are
//! transient and mutually exclusive. The bookmark list, edit dialog and
//! message box are modals tracked alongside them.
//!
//! Geometry is in CSS pixels. Client coordinates are relative to the
//! viewport; placement results are document coordinates (scroll applied).

use smol_str::SmolStr;

use crate::line_model::ContainerKind;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Bounding box in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Visible window size and scroll offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// Margin kept between the context menu and the viewport's right/bottom edge.
const MENU_EDGE_MARGIN: f64 = 5.0;

/// Document position for the context menu opened at `click`.
///
/// The menu sits slightly left of and below the pointer. If it would run off
/// the right or bottom edge it is pinned just inside that edge, and it never
/// starts above or left of the scroll origin.
pub fn place_context_menu(click: Point, menu: Size, font_size: f64, viewport: &Viewport) -> Point {
    let mut x = click.x + viewport.scroll_x - font_size * 2.0;
    let mut y = click.y + viewport.scroll_y + font_size;

    if click.x + menu.width > viewport.width {
        x = viewport.width - menu.width - MENU_EDGE_MARGIN + viewport.scroll_x;
    }
    if click.y + menu.height > viewport.height {
        y = viewport.height - menu.height - MENU_EDGE_MARGIN + viewport.scroll_y;
    }

    Point::new(x.max(viewport.scroll_x), y.max(viewport.scroll_y))
}

/// Document position for a tooltip above `trigger`.
pub fn place_tooltip(trigger: Rect, tooltip: Size, font_size: f64, viewport: &Viewport) -> Point {
    let top = trigger.top + viewport.scroll_y - tooltip.height - font_size;
    let left = trigger.left + viewport.scroll_x - font_size;

    let padding = font_size;
    let mut left = left.max(padding);
    if left + tooltip.width + padding > viewport.width {
        left = viewport.width - tooltip.width - padding * 3.0;
    }
    let top = top.max(viewport.scroll_y + padding);

    Point::new(left, top)
}

/// The element a context menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuTarget {
    pub element_id: Option<SmolStr>,
    /// Main-body row under the menu; 0 when the target is not a row.
    pub row: u32,
}

impl MenuTarget {
    pub fn is_row(&self) -> bool {
        self.row > 0
    }
}

/// Which menu entries are offered for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItems {
    pub bookmark: bool,
    /// The bookmark entry shows the "set" state.
    pub bookmarked: bool,
    pub edit: bool,
}

impl MenuItems {
    pub fn for_target(target: &MenuTarget, bookmarked: bool) -> Self {
        let is_row = target.is_row();
        Self {
            bookmark: is_row,
            bookmarked: is_row && bookmarked,
            edit: is_row,
        }
    }
}

/// Context menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ToggleBookmark,
    OpenBookmarkList,
    EditSentence,
    EditData,
    ChangeFontSize,
    Close,
}

impl MenuAction {
    /// Parse a `data-action` attribute value.
    pub fn from_action_name(name: &str) -> Option<Self> {
        Some(match name {
            "bookmark-set-un-set" => Self::ToggleBookmark,
            "bookmark-list-open" => Self::OpenBookmarkList,
            "edit-sentence" => Self::EditSentence,
            "modified-list-load-or-save" => Self::EditData,
            "change-font-size" => Self::ChangeFontSize,
            "close" => Self::Close,
            _ => return None,
        })
    }

    /// Actions that leave the menu open afterwards.
    pub fn keeps_menu_open(&self) -> bool {
        matches!(
            self,
            Self::OpenBookmarkList | Self::EditSentence | Self::EditData | Self::ChangeFontSize
        )
    }
}

/// A translated row whose original text is shown as a tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipTarget {
    pub container: ContainerKind,
    /// The original-side element shown as the tooltip.
    pub original_id: SmolStr,
    /// The translated-side element the tooltip belongs to.
    pub trigger_id: SmolStr,
}

/// Transient popup: at most one of these is visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transient {
    #[default]
    None,
    Tooltip(TooltipTarget),
    ContextMenu(MenuTarget),
}

/// Everything that can be open at once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopupState {
    transient: Transient,
    pub bookmark_list: bool,
    pub edit_dialog: bool,
    pub message_box: bool,
}

impl PopupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tooltip(&self) -> Option<&TooltipTarget> {
        match &self.transient {
            Transient::Tooltip(target) => Some(target),
            _ => None,
        }
    }

    pub fn menu_target(&self) -> Option<&MenuTarget> {
        match &self.transient {
            Transient::ContextMenu(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_target().is_some()
    }

    pub fn is_tooltip_open(&self) -> bool {
        self.tooltip().is_some()
    }

    /// Show a tooltip, replacing whatever transient was open.
    pub fn show_tooltip(&mut self, target: TooltipTarget) -> Transient {
        std::mem::replace(&mut self.transient, Transient::Tooltip(target))
    }

    /// Open the context menu, replacing whatever transient was open.
    pub fn open_menu(&mut self, target: MenuTarget) -> Transient {
        std::mem::replace(&mut self.transient, Transient::ContextMenu(target))
    }

    /// Close the open transient, returning what was closed.
    pub fn close_transient(&mut self) -> Transient {
        std::mem::take(&mut self.transient)
    }
}
