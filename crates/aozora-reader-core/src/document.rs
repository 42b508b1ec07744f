//! Extraction of the embedded document: metadata and per-container sources.
//!
//! The reader's input is a static page whose `<main>` and `<footer>` each hold
//! a `pre.original-pre` and a `pre.translated-pre` block. Only these blocks and
//! the `<meta>` tags are read; everything else in the page is ignored.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ReaderError, Result};
use crate::line_model::ContainerKind;

static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#,
    )
    .unwrap()
});

static MAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main>").unwrap());

static FOOTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<footer\b[^>]*>(.*?)</footer>").unwrap());

static PRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b([^>]*)>(.*?)</pre>").unwrap());

pub const ORIGINAL_PRE_CLASS: &str = "original-pre";
pub const TRANSLATED_PRE_CLASS: &str = "translated-pre";

/// `<meta name=... content=...>` pairs, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Like [`get`](Self::get) but reports a missing tag as an error.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ReaderError::MissingElement(format!("meta[name='{name}']")))
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(name.into(), content.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.get("DC.Title")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("author")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Raw inner markup of a container's two preformatted blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSource {
    pub original: Option<String>,
    pub translated: Option<String>,
}

impl ContainerSource {
    pub fn new(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            original: Some(original.into()),
            translated: Some(translated.into()),
        }
    }

    fn from_section(section: &str) -> Self {
        let mut source = Self::default();
        for caps in PRE_RE.captures_iter(section) {
            let classes = attributes(&caps[1])
                .into_iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("class"))
                .map(|(_, value)| value)
                .unwrap_or_default();
            let body = caps[2].to_string();
            let class_list: Vec<&str> = classes.split_ascii_whitespace().collect();
            if class_list.contains(&ORIGINAL_PRE_CLASS) {
                source.original.get_or_insert(body);
            } else if class_list.contains(&TRANSLATED_PRE_CLASS) {
                source.translated.get_or_insert(body);
            }
        }
        source
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn translated(&self) -> Option<&str> {
        self.translated.as_deref()
    }
}

/// Everything the reader takes from the embedded page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderDocument {
    pub metadata: Metadata,
    pub main: ContainerSource,
    pub footer: ContainerSource,
}

impl ReaderDocument {
    /// Pull metadata and container sources out of a page.
    ///
    /// Missing sections are logged and come back empty.
    pub fn parse(html: &str) -> Self {
        let mut metadata = Metadata::default();
        for caps in META_RE.captures_iter(html) {
            let attrs = attributes(&caps[1]);
            let find = |key: &str| {
                attrs
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(key))
                    .map(|(_, value)| value.clone())
            };
            if let (Some(name), Some(content)) = (find("name"), find("content")) {
                metadata.insert(name, content);
            }
        }

        let main = section(html, &MAIN_RE, ContainerKind::Main);
        let footer = section(html, &FOOTER_RE, ContainerKind::Footer);

        tracing::debug!(
            target: "aozora::document",
            meta = metadata.entries.len(),
            main_original = main.original.is_some(),
            main_translated = main.translated.is_some(),
            "parsed document"
        );

        Self {
            metadata,
            main,
            footer,
        }
    }

    pub fn source(&self, kind: ContainerKind) -> &ContainerSource {
        match kind {
            ContainerKind::Main => &self.main,
            ContainerKind::Footer => &self.footer,
        }
    }
}

fn section(html: &str, re: &Regex, kind: ContainerKind) -> ContainerSource {
    match re.captures(html) {
        Some(caps) => ContainerSource::from_section(&caps[1]),
        None => {
            let err = ReaderError::MissingElement(kind.tag().to_string());
            tracing::error!(target: "aozora::document", %err, "container not found");
            ContainerSource::default()
        }
    }
}

fn attributes(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (caps[1].to_string(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="utf-8">
<meta name="DC.Title" content="羅生門">
<meta name='author' content='芥川龍之介'>
<meta content="https://www.aozora.gr.jp/" name="DC.Relation">
</head>
<body>
<header></header>
<main>
<pre class="original-pre">
下人《げにん》が
雨やみを待つていた。
</pre>
<pre class="translated-pre">
下人《げにん》が
雨がやむのを待っていた。
</pre>
</main>
<footer>
<pre class="original-pre">底本：</pre>
<pre class="translated-pre">底本：</pre>
</footer>
</body>
</html>"#;

    #[test]
    fn test_parse_metadata() {
        let doc = ReaderDocument::parse(PAGE);
        assert_eq!(doc.metadata.title(), Some("羅生門"));
        assert_eq!(doc.metadata.author(), Some("芥川龍之介"));
        assert_eq!(doc.metadata.get("DC.Relation"), Some("https://www.aozora.gr.jp/"));
        assert!(matches!(
            doc.metadata.require("DC.Rights"),
            Err(ReaderError::MissingElement(_))
        ));
    }

    #[test]
    fn test_parse_containers() {
        let doc = ReaderDocument::parse(PAGE);
        assert_eq!(
            doc.main.original(),
            Some("\n下人《げにん》が\n雨やみを待つていた。\n")
        );
        assert!(doc.main.translated().unwrap().contains("雨がやむのを"));
        assert_eq!(doc.footer.original(), Some("底本："));
        assert_eq!(doc.source(ContainerKind::Footer).translated(), Some("底本："));
    }

    #[test]
    fn test_unquoted_attributes() {
        let doc = ReaderDocument::parse(
            "<meta name=DC.Title content=羅生門>\n<main><pre class=original-pre>古</pre><pre class=translated-pre>新</pre></main>",
        );
        assert_eq!(doc.metadata.title(), Some("羅生門"));
        assert_eq!(doc.main.original(), Some("古"));
        assert_eq!(doc.main.translated(), Some("新"));
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let doc = ReaderDocument::parse("<html><body><p>nothing</p></body></html>");
        assert_eq!(doc.main, ContainerSource::default());
        assert_eq!(doc.footer, ContainerSource::default());
        assert_eq!(doc.metadata.title(), None);
    }
}
