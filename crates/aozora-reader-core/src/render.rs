//! Rendering of a container's rows into blocks and HTML.
//!
//! A container is rebuilt wholesale from the line model and edit overlay;
//! there is no diffing. The bookmark set is projected on at serialization
//! time, so the same blocks can be written out again after a bookmark toggle
//! without a rebuild.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::{SmolStr, format_smolstr};

use crate::annotation::{convert_ruby_to_html, extract_indent_info, paragraph_markup, split_heading};
use crate::bookmark::BookmarkSet;
use crate::line_model::{ContainerKind, LineModel};
use crate::overlay::EditOverlay;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

pub const ORIGINAL_TEXT_CLASS: &str = "original-text";
pub const TRANSLATED_TEXT_CLASS: &str = "translated-text";
pub const BOOKMARK_CLASS: &str = "bookmark";

/// Which side of a row a block shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowSide {
    /// Original and translated are identical: one block, `row-N`.
    Merged,
    /// Original half of a split row: `original-row-N`.
    Original,
    /// Translated half of a split row: `translated-row-N`.
    Translated,
}

impl RowSide {
    /// Side that carries the bookmark marker and is the jump target.
    pub fn is_primary(&self) -> bool {
        matches!(self, RowSide::Merged | RowSide::Translated)
    }
}

/// Element identifier for a row side.
pub fn row_id(row: u32, side: RowSide) -> SmolStr {
    match side {
        RowSide::Merged => format_smolstr!("row-{}", row),
        RowSide::Original => format_smolstr!("original-row-{}", row),
        RowSide::Translated => format_smolstr!("translated-row-{}", row),
    }
}

/// Row number from an identifier ending in `row-N`; 0 when there is none.
pub fn row_number_from_id(id: &str) -> u32 {
    id.rfind("row-")
        .and_then(|idx| id[idx + 4..].parse().ok())
        .unwrap_or(0)
}

/// Parse an identifier back into row and side.
pub fn parse_row_id(id: &str) -> Option<(u32, RowSide)> {
    let (side, rest) = if let Some(rest) = id.strip_prefix("original-row-") {
        (RowSide::Original, rest)
    } else if let Some(rest) = id.strip_prefix("translated-row-") {
        (RowSide::Translated, rest)
    } else if let Some(rest) = id.strip_prefix("row-") {
        (RowSide::Merged, rest)
    } else {
        return None;
    };
    let row = rest.parse().ok().filter(|row| *row > 0)?;
    Some((row, side))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    /// Blank row, rendered as `<br>` with no identifier.
    Break,
}

/// One rendered element of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Row number; 0 for breaks.
    pub row: u32,
    pub side: RowSide,
    /// `text-indent` in `em`.
    pub text_indent: Option<u32>,
    pub inner_html: String,
}

impl Block {
    pub fn line_break() -> Self {
        Self {
            kind: BlockKind::Break,
            row: 0,
            side: RowSide::Merged,
            text_indent: None,
            inner_html: String::new(),
        }
    }

    /// Run a line through the heading, indent, ruby and link pipeline.
    pub fn build(row: u32, side: RowSide, text: &str) -> Self {
        let (stripped, is_heading) = split_heading(text);
        let (text_indent, body) = match extract_indent_info(&stripped) {
            Some(info) => (info.amount, info.cleaned_line),
            None => (None, stripped),
        };

        // Headings get ruby but are never linked.
        let (kind, inner_html) = if is_heading {
            (BlockKind::Heading, convert_ruby_to_html(&body))
        } else {
            (BlockKind::Paragraph, paragraph_markup(&body))
        };

        Self {
            kind,
            row,
            side,
            text_indent,
            inner_html,
        }
    }

    pub fn id(&self) -> Option<SmolStr> {
        match self.kind {
            BlockKind::Break => None,
            _ => Some(row_id(self.row, self.side)),
        }
    }

    pub fn is_break(&self) -> bool {
        self.kind == BlockKind::Break
    }

    fn tag(&self) -> &'static str {
        match self.kind {
            BlockKind::Paragraph => "p",
            BlockKind::Heading => "h2",
            BlockKind::Break => "br",
        }
    }

    /// Inner text with markup removed.
    pub fn plain_text(&self) -> String {
        TAG_RE.replace_all(&self.inner_html, "").into_owned()
    }

    /// Serialize the block, marking it if its row is bookmarked.
    pub fn to_html(&self, bookmarked: bool) -> String {
        let mut html = String::new();
        self.write_html(&mut html, bookmarked);
        html
    }

    fn write_html(&self, out: &mut String, bookmarked: bool) {
        if self.is_break() {
            out.push_str("<br>");
            return;
        }

        let tag = self.tag();
        let mut classes: Vec<&str> = Vec::new();
        match self.side {
            RowSide::Original => classes.push(ORIGINAL_TEXT_CLASS),
            RowSide::Translated => classes.push(TRANSLATED_TEXT_CLASS),
            RowSide::Merged => {}
        }
        if bookmarked && self.side.is_primary() {
            classes.push(BOOKMARK_CLASS);
        }

        let _ = write!(out, "<{tag} id=\"{}\"", row_id(self.row, self.side));
        if !classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", classes.join(" "));
        }
        if self.side == RowSide::Translated {
            let _ = write!(
                out,
                " data-original-target=\"{}\"",
                row_id(self.row, RowSide::Original)
            );
        }
        if let Some(indent) = self.text_indent {
            let _ = write!(out, " style=\"text-indent: {indent}em\"");
        }
        let _ = write!(out, ">{}</{tag}>", self.inner_html);
    }
}

/// Rows of one container in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContainer {
    kind: ContainerKind,
    blocks: Vec<Block>,
}

impl RenderedContainer {
    pub fn empty(kind: ContainerKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
        }
    }

    /// Full rebuild from the line model and overlay.
    pub fn build(model: &LineModel, overlay: &EditOverlay) -> Self {
        let mut blocks = Vec::with_capacity(model.len());
        for pair in model.pairs() {
            let edited = overlay.get(pair.row);
            if pair.is_blank() && edited.is_none() {
                blocks.push(Block::line_break());
                continue;
            }

            if pair.is_unchanged() && edited.is_none() {
                blocks.push(Block::build(pair.row, RowSide::Merged, pair.translated));
            } else {
                blocks.push(Block::build(pair.row, RowSide::Original, pair.original));
                blocks.push(Block::build(
                    pair.row,
                    RowSide::Translated,
                    edited.unwrap_or(pair.translated),
                ));
            }
        }

        tracing::debug!(
            target: "aozora::render",
            container = %model.kind(),
            rows = model.len(),
            blocks = blocks.len(),
            "rebuilt container"
        );

        Self {
            kind: model.kind(),
            blocks,
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    /// Insert a block before the block at `index`.
    pub fn insert(&mut self, index: usize, block: Block) {
        self.blocks.insert(index, block);
    }

    /// Position of the block with this exact identifier.
    pub fn position_of_id(&self, id: &str) -> Option<usize> {
        let (row, side) = parse_row_id(id)?;
        self.blocks
            .iter()
            .position(|b| !b.is_break() && b.row == row && b.side == side)
    }

    /// Position of a row's primary block: translated half, else the merged block.
    pub fn primary_index(&self, row: u32) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| !b.is_break() && b.row == row && b.side == RowSide::Translated)
            .or_else(|| {
                self.blocks
                    .iter()
                    .position(|b| !b.is_break() && b.row == row && b.side == RowSide::Merged)
            })
    }

    pub fn primary_block(&self, row: u32) -> Option<&Block> {
        self.primary_index(row).and_then(|i| self.blocks.get(i))
    }

    /// Identifier to jump to for a row.
    pub fn jump_target(&self, row: u32) -> Option<SmolStr> {
        self.primary_block(row).and_then(Block::id)
    }

    /// Whether an identifier names an element of this container.
    pub fn contains_id(&self, id: &str) -> bool {
        self.position_of_id(id).is_some()
    }

    /// Headings that are not the original half of a split row.
    pub fn headings(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Heading && b.side != RowSide::Original)
    }

    /// Serialize every block, projecting the bookmark set onto primary blocks.
    pub fn to_html(&self, bookmarks: &BookmarkSet) -> String {
        let mut html = String::new();
        for block in &self.blocks {
            block.write_html(&mut html, bookmarks.contains(block.row));
            html.push('\n');
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(original: &str, translated: &str) -> LineModel {
        LineModel::from_sources(ContainerKind::Main, original, translated).unwrap()
    }

    #[test]
    fn test_row_ids() {
        assert_eq!(row_id(3, RowSide::Merged), "row-3");
        assert_eq!(row_id(3, RowSide::Original), "original-row-3");
        assert_eq!(row_id(3, RowSide::Translated), "translated-row-3");
        assert_eq!(row_number_from_id("translated-row-42"), 42);
        assert_eq!(row_number_from_id("DC.Rights-title"), 0);
        assert_eq!(parse_row_id("original-row-7"), Some((7, RowSide::Original)));
        assert_eq!(parse_row_id("row-0"), None);
    }

    #[test]
    fn test_unchanged_row_is_merged() {
        let container = RenderedContainer::build(&model("同じ", "同じ"), &EditOverlay::new());
        assert_eq!(container.blocks().len(), 1);
        assert_eq!(
            container.to_html(&BookmarkSet::new()),
            "<p id=\"row-1\">同じ</p>\n"
        );
    }

    #[test]
    fn test_changed_row_is_split() {
        let container = RenderedContainer::build(&model("古文", "現代文"), &EditOverlay::new());
        insta::assert_snapshot!(
            container.to_html(&BookmarkSet::new()).trim_end(),
            @r#"
        <p id="original-row-1" class="original-text">古文</p>
        <p id="translated-row-1" class="translated-text" data-original-target="original-row-1">現代文</p>
        "#
        );
    }

    #[test]
    fn test_blank_row_is_break() {
        let container = RenderedContainer::build(&model("a\n\nb", "a\n\nb"), &EditOverlay::new());
        let html = container.to_html(&BookmarkSet::new());
        assert_eq!(html, "<p id=\"row-1\">a</p>\n<br>\n<p id=\"row-3\">b</p>\n");
    }

    #[test]
    fn test_overlay_forces_split_and_wins() {
        let mut overlay = EditOverlay::new();
        overlay.insert(1, "直した");
        overlay.insert(2, "空行に追記");
        let container = RenderedContainer::build(&model("同じ\n", "同じ\n"), &overlay);
        // Trailing blank line is trimmed away, so only row 1 exists.
        assert_eq!(container.blocks().len(), 2);
        assert_eq!(container.blocks()[1].inner_html, "直した");

        let container = RenderedContainer::build(&model("a\n\nb", "a\n\nb"), &overlay);
        let row2 = container.primary_block(2).unwrap();
        assert_eq!(row2.side, RowSide::Translated);
        assert_eq!(row2.inner_html, "空行に追記");
    }

    #[test]
    fn test_bookmark_projection() {
        let container = RenderedContainer::build(&model("古\n同", "新\n同"), &EditOverlay::new());
        let bookmarks: BookmarkSet = [1, 2].into_iter().collect();
        let html = container.to_html(&bookmarks);
        assert!(html.contains("<p id=\"original-row-1\" class=\"original-text\">"));
        assert!(html.contains("class=\"translated-text bookmark\""));
        assert!(html.contains("<p id=\"row-2\" class=\"bookmark\">"));
    }

    #[test]
    fn test_heading_indent_and_ruby() {
        let block = Block::build(
            5,
            RowSide::Merged,
            "［＃２字下げ］第一章　羅生門《らしょうもん》［＃「第一章」は中見出し］",
        );
        assert_eq!(block.kind, BlockKind::Heading);
        assert_eq!(block.text_indent, Some(2));
        assert_eq!(
            block.to_html(false),
            "<h2 id=\"row-5\" style=\"text-indent: 2em\">第一章　<ruby><rb>羅生門</rb><rp>（</rp><rt>らしょうもん</rt><rp>）</rp></ruby></h2>"
        );
    }

    #[test]
    fn test_unusable_indent_directive_is_dropped() {
        let block = Block::build(1, RowSide::Merged, "［＃〇字下げ］本文");
        assert_eq!(block.text_indent, None);
        assert_eq!(block.to_html(false), "<p id=\"row-1\">本文</p>");
    }

    #[test]
    fn test_headings_are_not_linked() {
        let block = Block::build(1, RowSide::Merged, "https://example.com/［＃見出しは中見出し］");
        assert_eq!(block.inner_html, "https://example.com/");
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut overlay = EditOverlay::new();
        overlay.insert(2, "改");
        let m = model("一\n二\n\n四《よん》", "一\nに\n\n四《よん》");
        let bookmarks: BookmarkSet = [2, 4].into_iter().collect();
        let first = RenderedContainer::build(&m, &overlay).to_html(&bookmarks);
        let second = RenderedContainer::build(&m, &overlay).to_html(&bookmarks);
        assert_eq!(first, second);
    }

    #[test]
    fn test_jump_target_prefers_translated() {
        let container = RenderedContainer::build(&model("古\n同", "新\n同"), &EditOverlay::new());
        assert_eq!(container.jump_target(1).as_deref(), Some("translated-row-1"));
        assert_eq!(container.jump_target(2).as_deref(), Some("row-2"));
        assert_eq!(container.jump_target(3), None);
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let block = Block::build(1, RowSide::Merged, "漢字《かんじ》です");
        assert_eq!(block.plain_text(), "漢字（かんじ）です");
    }
}
