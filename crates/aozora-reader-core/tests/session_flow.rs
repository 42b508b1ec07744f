// End-to-end reader flow over an embedded document:
// 1. Parse the page and load persisted state (with legacy keys)
// 2. Bookmark, edit and navigate through dispatched events
// 3. Apply storage effects and reload a fresh session from the same store

use aozora_reader_core::{
    ClickTarget, ContainerKind, Effect, Hit, InputEvent, KeyValueStore, MemoryStore, MenuAction,
    Point, ReaderDocument, ReaderSession, Rect, Region, StorageKeys, apply_persistence,
};

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="utf-8">
<meta name="DC.Title" content="羅生門">
<meta name="author" content="芥川龍之介">
<meta name="DC.Rights" content="パブリックドメイン">
<meta name="DC.Relation" content="https://www.aozora.gr.jp/cards/000879/card127.html">
</head>
<body>
<header></header>
<main>
<pre class="original-pre">
羅生門［＃「羅生門」は中見出し］
［＃２字下げ］ある日の暮方の事である。
一人の下人《げにん》が

羅生門の下で雨やみを待っていた。
</pre>
<pre class="translated-pre">
羅生門［＃「羅生門」は中見出し］
［＃２字下げ］ある日の夕暮れのことである。
一人の下人《げにん》が

羅生門の下で雨がやむのを待っていた。
</pre>
</main>
<footer>
<pre class="original-pre">底本：「芥川龍之介全集」</pre>
<pre class="translated-pre">底本：「芥川龍之介全集」</pre>
</footer>
</body>
</html>
"#;

fn keys() -> StorageKeys {
    StorageKeys::for_document("/books/rashomon.html")
}

fn click_row(id: &str) -> InputEvent {
    InputEvent::Click {
        target: ClickTarget {
            hit: Hit::new(Some(id), Region::Main),
            rect: Rect::new(40.0, 200.0, 600.0, 24.0),
        },
        position: Point::new(120.0, 210.0),
    }
}

fn run(session: &mut ReaderSession, store: &mut MemoryStore, event: InputEvent) -> Vec<Effect> {
    let effects = session.dispatch(event);
    apply_persistence(store, &effects).unwrap();
    effects
}

#[test]
fn test_initial_render() {
    let doc = ReaderDocument::parse(PAGE);
    let mut store = MemoryStore::new();
    let session = ReaderSession::load(&doc, keys(), &mut store).unwrap();

    let html = session.page_html();
    assert!(html.contains("<h1>羅生門</h1>"));
    assert!(html.contains("<h2 id=\"row-1\">羅生門</h2>"));
    assert!(html.contains(
        "<p id=\"original-row-2\" class=\"original-text\" style=\"text-indent: 2em\">ある日の暮方の事である。</p>"
    ));
    assert!(html.contains("<p id=\"row-3\">一人の<ruby><rb>下人</rb><rp>（</rp><rt>げにん</rt><rp>）</rp></ruby>が</p>\n<br>\n"));
    assert!(html.contains("<dd id=\"DC.Relation-document\"><a href='https://www.aozora.gr.jp/cards/000879/card127.html'"));
    assert!(html.contains("<body class=\"size3\">"));

    // Same state renders the same bytes.
    assert_eq!(html, session.page_html());
}

#[test]
fn test_state_survives_reload() {
    let doc = ReaderDocument::parse(PAGE);
    let mut store = MemoryStore::new();
    store
        .set("aozoraModernJapaneseTranslation_BookmarkRows", "5")
        .unwrap();

    let mut session = ReaderSession::load(&doc, keys(), &mut store).unwrap();
    assert!(session.bookmarks().contains(5));
    run(
        &mut session,
        &mut store,
        InputEvent::FragmentLoaded {
            html: "<div id=\"customContextMenu\"></div>".into(),
        },
    );

    // Edit the merged third row through the menu.
    run(&mut session, &mut store, click_row("row-3"));
    run(
        &mut session,
        &mut store,
        InputEvent::MenuAction(MenuAction::EditSentence),
    );
    run(
        &mut session,
        &mut store,
        InputEvent::EditDraftChanged {
            text: "ひとりの下人《げにん》が".into(),
        },
    );
    let effects = run(&mut session, &mut store, InputEvent::EditDialogClosed);
    assert!(effects.contains(&Effect::InsertBefore {
        before_id: "translated-row-3".into(),
        html: "<p id=\"original-row-3\" class=\"original-text\">一人の<ruby><rb>下人</rb><rp>（</rp><rt>げにん</rt><rp>）</rp></ruby>が</p>".into(),
    }));

    // Bookmark it via the menu and bump the font size.
    run(&mut session, &mut store, click_row("row-1"));
    run(&mut session, &mut store, click_row("translated-row-3"));
    run(&mut session, &mut store, click_row("row-1"));
    run(
        &mut session,
        &mut store,
        InputEvent::MenuAction(MenuAction::ChangeFontSize),
    );
    let effects = session.toggle_bookmark(3).unwrap();
    apply_persistence(&mut store, &effects).unwrap();

    let html_before = session.main().to_html(session.bookmarks());

    let reloaded = ReaderSession::load(&doc, keys(), &mut store).unwrap();
    assert_eq!(reloaded.bookmarks().encode(), "3,5");
    assert_eq!(reloaded.overlay().get(3), Some("ひとりの下人《げにん》が"));
    assert_eq!(reloaded.font_size().level(), 4);
    assert_eq!(reloaded.main().to_html(reloaded.bookmarks()), html_before);
    assert!(store.get("aozoraModernJapaneseTranslation_BookmarkRows").is_none());
}

#[test]
fn test_import_export_reset_cycle() {
    let doc = ReaderDocument::parse(PAGE);
    let mut store = MemoryStore::new();
    let mut session = ReaderSession::load(&doc, keys(), &mut store).unwrap();

    session.commit_edit(5, "羅生門の下で雨宿りをしていた。").unwrap();
    let Effect::Download { contents, .. } = session.export_edits().unwrap() else {
        panic!("expected a download");
    };

    let effects = session.reset_edits();
    apply_persistence(&mut store, &effects).unwrap();
    assert!(session.overlay().is_empty());
    assert!(store.get(&keys().mod_rows()).is_none());

    let effects = session.import_edits(&contents);
    apply_persistence(&mut store, &effects).unwrap();
    assert_eq!(session.overlay().get(5), Some("羅生門の下で雨宿りをしていた。"));
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::ReplaceContainer { kind: ContainerKind::Main, html } if html.contains("雨宿り")
    )));
}
