use std::io::BufRead;
use std::path::{Path, PathBuf};

use aozora_reader_core::{
    Direction, Effect, FEATURE_FRAGMENT_FILE, Hit, InputEvent, Point,
    ReaderDocument, ReaderSession, Region, RowSide, StorageKeys, apply_persistence, row_id,
};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod store;

use config::ReaderConfig;
use store::{FileStore, default_store_path};

#[derive(Parser)]
#[command(version, about = "Aozora reader - bilingual annotated text viewer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the document page
    document: PathBuf,

    /// Path to the state store file
    #[arg(long, env = "AOZORA_READER_STORE")]
    store: Option<PathBuf>,

    /// Path to a KDL config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Header fragment holding the menu and dialog markup
    #[arg(long)]
    fragment: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the page with current edits and bookmarks applied
    Render {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the translated text of a row
    Edit { row: u32, text: String },
    /// Toggle the bookmark on a row
    Bookmark { row: u32 },
    /// List bookmarks and headings
    Bookmarks,
    /// Jump to the next bookmark
    Next {
        /// Row under the cursor
        #[arg(long)]
        from: Option<u32>,
    },
    /// Jump to the previous bookmark
    Prev {
        /// Row under the cursor
        #[arg(long)]
        from: Option<u32>,
    },
    /// Export edit data as JSON
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace all edits with an exported JSON file
    Import { file: PathBuf },
    /// Drop every edit
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Step the font size
    Font,
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    let config = ReaderConfig::discover(&cli.document, cli.config.as_deref())?;
    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    let html = std::fs::read_to_string(&cli.document).into_diagnostic()?;
    let doc = ReaderDocument::parse(&html);

    let store_path = cli
        .store
        .or(config.store)
        .unwrap_or_else(default_store_path);
    let mut store = FileStore::open(&store_path)?;

    let keys = StorageKeys::for_document(&cli.document);
    let mut session = ReaderSession::load(&doc, keys, &mut store)?;

    let fragment_path = cli
        .fragment
        .or(config.fragment)
        .unwrap_or_else(|| sibling(&cli.document, FEATURE_FRAGMENT_FILE));
    let loaded = match std::fs::read_to_string(&fragment_path) {
        Ok(html) => session.dispatch(InputEvent::FragmentLoaded { html }),
        Err(err) => session.dispatch(InputEvent::FragmentFailed {
            path: fragment_path.display().to_string(),
            reason: err.to_string(),
        }),
    };
    apply_persistence(&mut store, &loaded)?;

    let effects = match cli.command.unwrap_or(Commands::Render { out: None }) {
        Commands::Render { out } => {
            write_output(out.as_deref(), &session.page_html())?;
            Vec::new()
        }
        Commands::Edit { row, text } => session.commit_edit(row, &text)?,
        Commands::Bookmark { row } => {
            let effects = session.toggle_bookmark(row)?;
            let state = if session.bookmarks().contains(row) {
                "added"
            } else {
                "removed"
            };
            println!("bookmark {state}: row {row}");
            effects
        }
        Commands::Bookmarks => {
            let listing = session.bookmark_listing();
            if listing.bookmarks.is_empty() {
                println!("no bookmarks");
            }
            for entry in &listing.bookmarks {
                println!("{}", entry.label());
            }
            for entry in &listing.contents {
                println!("#{}", entry.target_id);
            }
            Vec::new()
        }
        Commands::Next { from } => jump(&mut session, Direction::Next, from),
        Commands::Prev { from } => jump(&mut session, Direction::Previous, from),
        Commands::Export { out } => {
            let Effect::Download { filename, contents } = session.export_edits()? else {
                miette::bail!("export produced no download");
            };
            let path = out.unwrap_or_else(|| PathBuf::from(filename));
            std::fs::write(&path, contents).into_diagnostic()?;
            println!("wrote {}", path.display());
            Vec::new()
        }
        Commands::Import { file } => {
            let contents = std::fs::read_to_string(&file).into_diagnostic()?;
            session.import_edits(&contents)
        }
        Commands::Reset { yes } => {
            if yes || confirm()? {
                session.reset_edits()
            } else {
                Vec::new()
            }
        }
        Commands::Font => {
            let effects = session.cycle_font_size();
            println!("font size {}", session.font_size().level());
            effects
        }
    };

    apply_persistence(&mut store, &effects)?;
    report(&effects)
}

fn jump(session: &mut ReaderSession, direction: Direction, from: Option<u32>) -> Vec<Effect> {
    if let Some(row) = from {
        let id = row_id(row, RowSide::Merged);
        session.dispatch(InputEvent::MouseMove {
            position: Point::default(),
            hit: Hit::new(Some(id.as_str()), Region::Main),
        });
    }
    session.navigate(direction)
}

/// Print what a terminal can show; alerts become errors.
fn report(effects: &[Effect]) -> Result<()> {
    for effect in effects {
        match effect {
            Effect::Navigate {
                fragment: Some(fragment),
            } => println!("#{fragment}"),
            Effect::Alert { message } => return Err(miette::miette!("{message}")),
            _ => {}
        }
    }
    Ok(())
}

fn confirm() -> Result<bool> {
    eprint!("{} [y/N] ", aozora_reader_core::session::RESET_CONFIRM_MESSAGE);
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .into_diagnostic()?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, contents).into_diagnostic(),
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}

fn sibling(document: &Path, name: &str) -> PathBuf {
    document
        .parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["aozora-reader", "book.html", "edit", "3", "新しい文"]).unwrap();
        assert_eq!(cli.document, PathBuf::from("book.html"));
        assert!(matches!(
            cli.command,
            Some(Commands::Edit { row: 3, ref text }) if text == "新しい文"
        ));
    }

    #[test]
    fn test_fragment_defaults_next_to_document() {
        assert_eq!(
            sibling(Path::new("/books/rashomon.html"), FEATURE_FRAGMENT_FILE),
            PathBuf::from("/books/feature-content.html")
        );
    }

    #[test]
    fn test_alert_becomes_error() {
        assert!(report(&[Effect::Alert {
            message: "bad".into()
        }])
        .is_err());
        assert!(report(&[Effect::HideContextMenu]).is_ok());
    }
}
