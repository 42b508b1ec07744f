//! Page shell: title, author, header fragment, main body and footer.

use std::fmt::Write as _;

use markdown_weaver_escape::escape_html;

use crate::annotation::convert_urls_to_links;
use crate::bookmark::BookmarkSet;
use crate::document::Metadata;
use crate::persist::FontSize;
use crate::render::RenderedContainer;

/// File name of the header fragment loaded next to the document.
pub const FEATURE_FRAGMENT_FILE: &str = "feature-content.html";

/// Dublin Core fields listed under the footer, with their labels.
pub const FOOTER_FIELDS: [(&str, &str); 5] = [
    ("DC.Rights", "権利"),
    ("DC.Contributor", "訳者（機械翻訳による）"),
    ("DC.Description", "説明"),
    ("DC.Date", "最終更新日"),
    ("DC.Relation", "関係資料"),
];

/// Borrowed view of everything the page shows.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub metadata: &'a Metadata,
    pub main: &'a RenderedContainer,
    pub footer: &'a RenderedContainer,
    pub bookmarks: &'a BookmarkSet,
    pub font_size: FontSize,
    /// Header fragment markup, when it loaded.
    pub header_fragment: Option<&'a str>,
}

/// Definition list of the document's Dublin Core fields.
///
/// Fields missing from the metadata are skipped.
pub fn metadata_list_html(metadata: &Metadata) -> String {
    let mut html = String::from("<dl>");
    for (name, label) in FOOTER_FIELDS {
        let content = match metadata.require(name) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(target: "aozora::page", %err, "skipping footer field");
                continue;
            }
        };
        let _ = write!(
            html,
            "<dt id=\"{name}-title\">{label}</dt><dd id=\"{name}-document\">{}</dd>",
            convert_urls_to_links(content)
        );
    }
    html.push_str("</dl>");
    html
}

/// Footer rows followed by a break and the metadata list.
///
/// The footer never carries bookmarks.
pub fn footer_html(footer: &RenderedContainer, metadata: &Metadata) -> String {
    let mut html = footer.to_html(&BookmarkSet::new());
    html.push_str("<br>\n");
    html.push_str(&metadata_list_html(metadata));
    html.push('\n');
    html
}

/// Complete page markup.
pub fn render_page(view: &PageView<'_>) -> String {
    let title = view.metadata.title().unwrap_or_default();
    let author = view.metadata.author().unwrap_or_default();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n");
    for (name, content) in view.metadata.iter() {
        html.push_str("<meta name=\"");
        let _ = escape_html(&mut html, name);
        html.push_str("\" content=\"");
        let _ = escape_html(&mut html, content);
        html.push_str("\">\n");
    }
    html.push_str("<title>");
    let _ = escape_html(&mut html, title);
    html.push_str("</title>\n</head>\n");

    let _ = writeln!(html, "<body class=\"{}\">", view.font_size.class_name());
    html.push_str("<header>\n<h1>");
    let _ = escape_html(&mut html, title);
    html.push_str("</h1>\n<p class=\"author\">");
    let _ = escape_html(&mut html, author);
    html.push_str("</p>\n");
    if let Some(fragment) = view.header_fragment {
        html.push_str(fragment);
        if !fragment.ends_with('\n') {
            html.push('\n');
        }
    }
    html.push_str("</header>\n<main>\n");
    html.push_str(&view.main.to_html(view.bookmarks));
    html.push_str("</main>\n<footer>\n");
    html.push_str(&footer_html(view.footer, view.metadata));
    html.push_str("</footer>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_model::{ContainerKind, LineModel};
    use crate::overlay::EditOverlay;

    fn metadata() -> Metadata {
        let mut metadata = Metadata::default();
        metadata.insert("DC.Title", "羅生門 <新訳>");
        metadata.insert("author", "芥川龍之介");
        metadata.insert("DC.Rights", "パブリックドメイン");
        metadata.insert("DC.Relation", "https://www.aozora.gr.jp/cards/000879/");
        metadata
    }

    #[test]
    fn test_metadata_list_skips_missing_fields() {
        insta::assert_snapshot!(metadata_list_html(&metadata()), @r#"<dl><dt id="DC.Rights-title">権利</dt><dd id="DC.Rights-document">パブリックドメイン</dd><dt id="DC.Relation-title">関係資料</dt><dd id="DC.Relation-document"><a href='https://www.aozora.gr.jp/cards/000879/' target='_blank' rel='noopener noreferrer'>https://www.aozora.gr.jp/cards/000879/</a></dd></dl>"#);
    }

    #[test]
    fn test_page_shell() {
        let metadata = metadata();
        let model = LineModel::from_sources(ContainerKind::Main, "一", "一").unwrap();
        let main = RenderedContainer::build(&model, &EditOverlay::new());
        let footer = RenderedContainer::empty(ContainerKind::Footer);
        let bookmarks: BookmarkSet = [1].into_iter().collect();
        let html = render_page(&PageView {
            metadata: &metadata,
            main: &main,
            footer: &footer,
            bookmarks: &bookmarks,
            font_size: FontSize::new(4),
            header_fragment: Some("<nav id=\"customContextMenu\"></nav>"),
        });

        assert!(html.contains("<title>羅生門 &lt;新訳&gt;</title>"));
        assert!(html.contains("<body class=\"size4\">"));
        assert!(html.contains("<p class=\"author\">芥川龍之介</p>\n<nav id=\"customContextMenu\"></nav>\n</header>"));
        assert!(html.contains("<main>\n<p id=\"row-1\" class=\"bookmark\">一</p>\n</main>"));
        assert!(html.contains("<footer>\n<br>\n<dl>"));
    }
}
