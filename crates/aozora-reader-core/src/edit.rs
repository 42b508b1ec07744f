//! Committing user edits of a translated line.
//!
//! A commit mutates the rendered main container in place instead of
//! rebuilding it. A merged row that receives its first edit is split: the
//! existing block becomes the translated half and a freshly built original
//! half is inserted in front of it. The split stays until the next full
//! rebuild, even if a later commit reverts the text.

use smol_str::SmolStr;

use crate::annotation::{extract_indent_info, paragraph_markup, split_heading};
use crate::error::{ReaderError, Result};
use crate::line_model::LineModel;
use crate::overlay::{EditOverlay, OverlayChange};
use crate::render::{Block, RenderedContainer, RowSide};

/// What a commit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The text matched the current baseline; nothing changed.
    Unchanged,
    Applied(AppliedEdit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub row: u32,
    /// Identifier the target block had before the commit.
    pub previous_id: SmolStr,
    /// Index of the target block after the commit.
    pub index: usize,
    /// Index of the inserted original half, when the row was split.
    pub inserted_original: Option<usize>,
    pub overlay: OverlayChange,
}

/// Text currently shown for a row: the overlay entry, else the stored line.
pub fn baseline_text<'a>(model: &'a LineModel, overlay: &'a EditOverlay, row: u32) -> Option<&'a str> {
    overlay.get(row).or_else(|| model.translated(row))
}

/// Apply committed text to a main-body row.
pub fn commit_edit(
    container: &mut RenderedContainer,
    model: &LineModel,
    overlay: &mut EditOverlay,
    row: u32,
    text: &str,
) -> Result<CommitOutcome> {
    let mut index = container.primary_index(row).ok_or(ReaderError::NoSuchRow(row))?;
    let stored_translated = model.translated(row).ok_or(ReaderError::NoSuchRow(row))?;
    let stored_original = model.original(row).ok_or(ReaderError::NoSuchRow(row))?;

    let (stripped, _) = split_heading(text);
    let baseline = baseline_text(model, overlay, row).unwrap_or(stored_translated);
    if baseline == stripped {
        tracing::debug!(target: "aozora::edit", row, "commit matches baseline, nothing to do");
        return Ok(CommitOutcome::Unchanged);
    }

    let (text_indent, body) = match extract_indent_info(&stripped) {
        Some(info) => (info.amount, info.cleaned_line),
        None => (None, stripped),
    };
    let inner_html = paragraph_markup(&body);

    let previous = container
        .block(index)
        .ok_or(ReaderError::NoSuchRow(row))?;
    let previous_id = previous.id().ok_or(ReaderError::NoSuchRow(row))?;

    let mut inserted_original = None;
    if previous.side == RowSide::Merged {
        if let Some(block) = container.block_mut(index) {
            block.side = RowSide::Translated;
        }
        container.insert(index, Block::build(row, RowSide::Original, stored_original));
        inserted_original = Some(index);
        index += 1;
        tracing::debug!(target: "aozora::edit", row, "split merged row on first edit");
    }

    let change = overlay.record(row, text, stored_translated);

    let block = container
        .block_mut(index)
        .ok_or(ReaderError::NoSuchRow(row))?;
    block.inner_html = inner_html;
    block.text_indent = text_indent;

    tracing::info!(target: "aozora::edit", row, ?change, "committed edit");

    Ok(CommitOutcome::Applied(AppliedEdit {
        row,
        previous_id,
        index,
        inserted_original,
        overlay: change,
    }))
}

/// The edit dialog's working copy for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub row: u32,
    pub text: String,
}

impl EditDraft {
    /// Open a draft prefilled with the row's current baseline text.
    pub fn open(model: &LineModel, overlay: &EditOverlay, row: u32) -> Result<Self> {
        let text = baseline_text(model, overlay, row).ok_or(ReaderError::NoSuchRow(row))?;
        Ok(Self {
            row,
            text: text.to_string(),
        })
    }

    /// Replace the draft with the stored original line.
    pub fn revert_to_original(&mut self, model: &LineModel) {
        if let Some(text) = model.original(self.row) {
            self.text = text.to_string();
        }
    }

    /// Replace the draft with the stored translated line.
    pub fn revert_to_translated(&mut self, model: &LineModel) {
        if let Some(text) = model.translated(self.row) {
            self.text = text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::BookmarkSet;
    use crate::line_model::ContainerKind;

    fn setup(original: &str, translated: &str) -> (LineModel, RenderedContainer, EditOverlay) {
        let model = LineModel::from_sources(ContainerKind::Main, original, translated).unwrap();
        let overlay = EditOverlay::new();
        let container = RenderedContainer::build(&model, &overlay);
        (model, container, overlay)
    }

    #[test]
    fn test_unchanged_commit_is_noop() {
        let (model, mut container, mut overlay) = setup("古", "新");
        let before = container.clone();
        let outcome = commit_edit(&mut container, &model, &mut overlay, 1, "新").unwrap();
        assert_eq!(outcome, CommitOutcome::Unchanged);
        assert_eq!(container, before);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_first_edit_splits_merged_row() {
        let (model, mut container, mut overlay) = setup("同じ", "同じ");
        let outcome = commit_edit(&mut container, &model, &mut overlay, 1, "違う").unwrap();
        let CommitOutcome::Applied(applied) = outcome else {
            panic!("expected an applied edit");
        };
        assert_eq!(applied.previous_id, "row-1");
        assert_eq!(applied.inserted_original, Some(0));
        assert_eq!(applied.index, 1);
        assert_eq!(overlay.get(1), Some("違う"));
        assert_eq!(
            container.to_html(&BookmarkSet::new()),
            "<p id=\"original-row-1\" class=\"original-text\">同じ</p>\n\
             <p id=\"translated-row-1\" class=\"translated-text\" data-original-target=\"original-row-1\">違う</p>\n"
        );
    }

    #[test]
    fn test_revert_keeps_split_shape() {
        let (model, mut container, mut overlay) = setup("同じ", "同じ");
        commit_edit(&mut container, &model, &mut overlay, 1, "違う").unwrap();
        let outcome = commit_edit(&mut container, &model, &mut overlay, 1, "同じ").unwrap();
        let CommitOutcome::Applied(applied) = outcome else {
            panic!("expected an applied edit");
        };
        assert_eq!(applied.overlay, OverlayChange::Removed);
        assert_eq!(applied.inserted_original, None);
        assert!(overlay.is_empty());
        assert_eq!(container.blocks().len(), 2);
        assert_eq!(container.blocks()[1].side, RowSide::Translated);
        assert_eq!(container.blocks()[1].inner_html, "同じ");
    }

    #[test]
    fn test_commit_applies_indent_and_markup() {
        let (model, mut container, mut overlay) = setup("古", "新");
        commit_edit(
            &mut container,
            &model,
            &mut overlay,
            1,
            "［＃１字下げ］漢字《かんじ》 https://example.com/",
        )
        .unwrap();
        let block = container.primary_block(1).unwrap();
        assert_eq!(block.text_indent, Some(1));
        assert!(block.inner_html.starts_with("<ruby><rb>漢字</rb>"));
        assert!(block.inner_html.contains("<a href='https://example.com/'"));
        assert_eq!(
            overlay.get(1),
            Some("［＃１字下げ］漢字《かんじ》 https://example.com/")
        );
    }

    #[test]
    fn test_commit_on_blank_row_is_rejected() {
        let (model, mut container, mut overlay) = setup("a\n\nb", "a\n\nb");
        assert!(matches!(
            commit_edit(&mut container, &model, &mut overlay, 2, "x"),
            Err(ReaderError::NoSuchRow(2))
        ));
        assert!(matches!(
            commit_edit(&mut container, &model, &mut overlay, 9, "x"),
            Err(ReaderError::NoSuchRow(9))
        ));
    }

    #[test]
    fn test_draft_prefill_and_revert() {
        let (model, _, mut overlay) = setup("古文", "現代文");
        let mut draft = EditDraft::open(&model, &overlay, 1).unwrap();
        assert_eq!(draft.text, "現代文");

        overlay.insert(1, "手直し");
        let mut edited = EditDraft::open(&model, &overlay, 1).unwrap();
        assert_eq!(edited.text, "手直し");
        edited.revert_to_translated(&model);
        assert_eq!(edited.text, "現代文");

        draft.revert_to_original(&model);
        assert_eq!(draft.text, "古文");
    }
}
