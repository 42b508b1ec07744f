//! Inline annotation transforms.
//!
//! Pure text-to-markup functions applied to every rendered line:
//! - `［＃N字下げ］` indentation directives
//! - `［＃...は中見出し］` heading directives
//! - `漢字《かんじ》` / `｜漢字《かんじ》` ruby annotations
//! - bare `http(s)://` URLs

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

/// URLs shorter than this are left as plain text.
pub const MIN_URL_LEN: usize = 12;

pub static INDENT_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"［＃\s*(\p{N}+)\s*字下げ］").unwrap());

pub static HEADING_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"［＃[^］]*は中見出し］").unwrap());

static VERTICAL_RUBY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"｜(\p{sc=Han}+?)《([\p{sc=Hiragana}\p{sc=Katakana}]+?)》").unwrap()
});

static PLAIN_RUBY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\p{sc=Han}+?)《([\p{sc=Hiragana}\p{sc=Katakana}]+?)》").unwrap()
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>'{}\[\]`:]+").unwrap());

const RUBY_REPLACEMENT: &str = "<ruby><rb>${1}</rb><rp>（</rp><rt>${2}</rt><rp>）</rp></ruby>";

/// Result of pulling an indentation directive out of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentInfo {
    /// Indent width in characters (rendered as `em`). `None` when the
    /// digits do not form a usable integer.
    pub amount: Option<u32>,
    /// The line with the directive removed.
    pub cleaned_line: String,
}

/// Extract a `［＃N字下げ］` directive from a line.
///
/// The digits may be full-width (or any other Unicode number form); they are
/// NFKC-normalized before parsing. Only the first directive is consumed, any
/// further ones stay in `cleaned_line`. A directive whose digits don't parse
/// is still removed, it just carries no amount.
pub fn extract_indent_info(line: &str) -> Option<IndentInfo> {
    let caps = INDENT_DIRECTIVE_RE.captures(line)?;
    let digits: String = caps[1].nfkc().collect();
    let amount = digits.parse::<u32>().ok();
    if amount.is_none() {
        tracing::debug!(
            target: "aozora::annotation",
            digits = %&caps[1],
            "indent directive digits did not parse, dropping amount"
        );
    }

    Some(IndentInfo {
        amount,
        cleaned_line: INDENT_DIRECTIVE_RE.replacen(line, 1, "").into_owned(),
    })
}

/// Remove every heading directive from a line.
pub fn strip_heading_directive(line: &str) -> Cow<'_, str> {
    HEADING_DIRECTIVE_RE.replace_all(line, "")
}

/// Strip heading directives, reporting whether the line was a heading.
pub fn split_heading(line: &str) -> (String, bool) {
    match strip_heading_directive(line) {
        Cow::Borrowed(_) => (line.to_string(), false),
        Cow::Owned(stripped) => {
            let is_heading = stripped != line;
            (stripped, is_heading)
        }
    }
}

/// Convert ruby notation into `<ruby>` markup.
///
/// The vertical-bar form is handled first so that an explicitly delimited
/// base is not picked up a second time by the plain form.
pub fn convert_ruby_to_html(line: &str) -> String {
    let processed = VERTICAL_RUBY_RE.replace_all(line, RUBY_REPLACEMENT);
    PLAIN_RUBY_RE
        .replace_all(&processed, RUBY_REPLACEMENT)
        .into_owned()
}

/// Wrap bare `http(s)://` URLs in anchors.
pub fn convert_urls_to_links(text: &str) -> String {
    URL_RE
        .replace_all(text, |caps: &Captures| link_url(&caps[0]))
        .into_owned()
}

fn link_url(matched: &str) -> String {
    let mut balance: i32 = 0;
    let mut cut = None;
    for (idx, c) in matched.char_indices() {
        match c {
            ')' | '）' => balance -= 1,
            '(' | '（' => balance += 1,
            _ => {}
        }
        // A closer with no opener inside the URL belongs to the surrounding text.
        if balance < 0 {
            cut = Some(idx);
            break;
        }
    }

    let (url, after) = match cut {
        Some(idx) => matched.split_at(idx),
        None => (matched, ""),
    };

    if balance <= 0 && url.chars().count() >= MIN_URL_LEN {
        format!("<a href='{url}' target='_blank' rel='noopener noreferrer'>{url}</a>{after}")
    } else {
        matched.to_string()
    }
}

/// Full inline pipeline for a paragraph body: ruby, then links.
pub fn paragraph_markup(text: &str) -> String {
    convert_urls_to_links(&convert_ruby_to_html(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_full_width_digit() {
        let info = extract_indent_info("［＃３字下げ］本文").unwrap();
        assert_eq!(info.amount, Some(3));
        assert_eq!(info.cleaned_line, "本文");
    }

    #[test]
    fn test_indent_multi_digit_with_spaces() {
        let info = extract_indent_info("前［＃ １２ 字下げ］後").unwrap();
        assert_eq!(info.amount, Some(12));
        assert_eq!(info.cleaned_line, "前後");
    }

    #[test]
    fn test_indent_only_first_directive_consumed() {
        let info = extract_indent_info("［＃２字下げ］a［＃５字下げ］b").unwrap();
        assert_eq!(info.amount, Some(2));
        assert_eq!(info.cleaned_line, "a［＃５字下げ］b");
    }

    #[test]
    fn test_indent_unparsable_digits_still_stripped() {
        let info = extract_indent_info("［＃〇字下げ］本文").unwrap();
        assert_eq!(info.amount, None);
        assert_eq!(info.cleaned_line, "本文");

        let info = extract_indent_info("［＃９９９９９９９９９９９字下げ］本文").unwrap();
        assert_eq!(info.amount, None);
        assert_eq!(info.cleaned_line, "本文");
    }

    #[test]
    fn test_indent_absent() {
        assert_eq!(extract_indent_info("本文だけ"), None);
        assert_eq!(extract_indent_info("［＃字下げ］"), None);
    }

    #[test]
    fn test_heading_directive() {
        let (text, heading) = split_heading("第一章［＃「第一章」は中見出し］");
        assert!(heading);
        assert_eq!(text, "第一章");

        let (text, heading) = split_heading("ただの文");
        assert!(!heading);
        assert_eq!(text, "ただの文");
    }

    #[test]
    fn test_ruby_plain_form() {
        insta::assert_snapshot!(
            convert_ruby_to_html("私の漢字《かんじ》"),
            @"私の<ruby><rb>漢字</rb><rp>（</rp><rt>かんじ</rt><rp>）</rp></ruby>"
        );
    }

    #[test]
    fn test_ruby_vertical_form_not_double_converted() {
        let out = convert_ruby_to_html("｜東京《トウキョウ》");
        assert_eq!(
            out,
            "<ruby><rb>東京</rb><rp>（</rp><rt>トウキョウ</rt><rp>）</rp></ruby>"
        );
        assert!(!out.contains('｜'));
        assert_eq!(out.matches("<ruby>").count(), 1);
    }

    #[test]
    fn test_ruby_requires_kana_reading() {
        assert_eq!(convert_ruby_to_html("漢字《kanji》"), "漢字《kanji》");
    }

    #[test]
    fn test_url_trailing_paren_excluded() {
        assert_eq!(
            convert_urls_to_links("見よ(http://example.com/page)"),
            "見よ(<a href='http://example.com/page' target='_blank' rel='noopener noreferrer'>http://example.com/page</a>)"
        );
    }

    #[test]
    fn test_url_balanced_parens_kept() {
        let out = convert_urls_to_links("https://en.wikipedia.org/wiki/Rust_(language)");
        assert!(out.contains(">https://en.wikipedia.org/wiki/Rust_(language)</a>"));
    }

    #[test]
    fn test_url_too_short() {
        assert_eq!(convert_urls_to_links("http://x.co"), "http://x.co");
    }

    #[test]
    fn test_url_unclosed_paren_left_plain() {
        assert_eq!(
            convert_urls_to_links("https://example.com/a(b"),
            "https://example.com/a(b"
        );
    }

    #[test]
    fn test_url_stops_at_whitespace() {
        let out = convert_urls_to_links("https://example.com/x y");
        assert!(out.ends_with("</a> y"));
    }

    #[test]
    fn test_paragraph_markup_order() {
        let out = paragraph_markup("漢字《かんじ》 https://example.com/");
        assert!(out.starts_with("<ruby>"));
        assert!(out.contains("<a href='https://example.com/'"));
    }
}
