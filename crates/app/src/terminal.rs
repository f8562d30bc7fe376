//! Line-driven terminal front end.
//!
//! Each input line is either a key (`n`, `space`, `^n`, ...) fed to the
//! orchestrator's keyboard handling, or a named command mapped to a UI
//! action. While a dialog is open, lines fill its inputs one at a time and
//! then pick a button.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use flashcards_core::model::{CardId, DeckId};
use flashcards_core::search;
use flashcards_core::session::Mode;
use services::modal::{Block, CANCEL_ID, DESTRUCTIVE_ID, SUBMIT_ID};
use services::{AppError, Key, KeyPress, NoticeLevel, Orchestrator, UiAction};
use tokio::io::{AsyncBufReadExt, BufReader};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// One parsed line of input outside a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Key(KeyPress),
    Action(UiAction),
    Import(PathBuf),
    Export(PathBuf),
    Decks,
    Info,
    ClearStorage,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let input = match (head, rest) {
        ("q" | "quit" | "exit", "") => Input::Quit,
        ("?" | "help", "") => Input::Help,
        ("space", "") => Input::Key(Key::Space.into()),
        ("esc", "") => Input::Key(Key::Escape.into()),
        ("left", "") => Input::Key(Key::ArrowLeft.into()),
        ("right", "") => Input::Key(Key::ArrowRight.into()),
        ("^n", "") => Input::Key(KeyPress::plain(Key::Char('n')).with_ctrl()),
        ("^k", "") => Input::Key(KeyPress::plain(Key::Char('k')).with_ctrl()),
        ("decks", "") => Input::Decks,
        ("select", id) if !id.is_empty() => Input::Action(UiAction::SelectDeck(DeckId::new(id))),
        ("new-deck", "") => Input::Action(UiAction::NewDeck),
        ("rename", id) if !id.is_empty() => Input::Action(UiAction::RenameDeck(DeckId::new(id))),
        ("delete", id) if !id.is_empty() => Input::Action(UiAction::DeleteDeck(DeckId::new(id))),
        ("new-card", "") => Input::Action(UiAction::NewCard),
        ("edit", "") => Input::Action(UiAction::EditCurrentCard),
        ("edit", id) => Input::Action(UiAction::EditCard(CardId::new(id))),
        ("search", query) => Input::Action(UiAction::SearchInput(query.to_owned())),
        ("clear", "") => Input::Action(UiAction::ClearSearch),
        ("shuffle", "") => Input::Action(UiAction::Shuffle),
        ("next", "") => Input::Action(UiAction::Next),
        ("prev", "") => Input::Action(UiAction::Previous),
        ("flip", "") => Input::Action(UiAction::Flip),
        ("study", "") => Input::Action(UiAction::EnterStudy),
        ("browse", "") => Input::Action(UiAction::ExitStudy),
        ("import", path) if !path.is_empty() => Input::Import(PathBuf::from(path)),
        ("export", "") => Input::Export(PathBuf::from(".")),
        ("export", dir) => Input::Export(PathBuf::from(dir)),
        ("info", "") => Input::Info,
        ("clear-storage", "") => Input::ClearStorage,
        _ => {
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Input::Key(Key::Char(c).into()),
                _ => Input::Unknown(line.to_owned()),
            }
        }
    };
    Some(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Terminal {
    orchestrator: Orchestrator,
    /// Index of the next dialog input to fill; past the end means "pick a button".
    field_cursor: usize,
}

impl Terminal {
    async fn handle_line(&mut self, line: &str) -> Flow {
        if self.orchestrator.modal().is_open() {
            self.dialog_line(line);
            return Flow::Continue;
        }
        self.field_cursor = 0;

        let Some(input) = parse_line(line) else {
            return Flow::Continue;
        };
        match input {
            Input::Quit => return Flow::Quit,
            Input::Help => print_help(),
            Input::Key(press) => {
                // The prompt is not a text field; keys always reach the page.
                self.orchestrator.page_mut().blur();
                if !self.orchestrator.handle_key(press) {
                    println!("(nothing to do for that key here; `help` lists commands)");
                }
            }
            Input::Action(action) => {
                self.orchestrator.dispatch(action);
                self.orchestrator.page_mut().blur();
            }
            Input::Import(path) => match std::fs::read_to_string(&path) {
                Ok(text) => self.orchestrator.dispatch(UiAction::ImportText(text)),
                Err(err) => {
                    log::warn!("cannot read {}: {err}", path.display());
                    self.orchestrator.dispatch(UiAction::ImportUnreadable);
                }
            },
            Input::Export(dir) => self.export_to(&dir),
            Input::Decks => self.print_decks(),
            Input::Info => match self.orchestrator.store().storage_info().await {
                Ok(info) => println!(
                    "stored: {} · {} bytes · {} decks · saved {}",
                    info.exists,
                    info.size_bytes,
                    info.deck_count,
                    info.saved_at
                        .map_or_else(|| "never".to_owned(), |t| t.to_rfc3339())
                ),
                Err(err) => println!("storage unavailable: {err}"),
            },
            Input::ClearStorage => {
                if let Err(err) = self.orchestrator.store_mut().clear_storage().await {
                    println!("could not clear storage: {err}");
                }
            }
            Input::Unknown(text) => println!("unknown command: {text} (try `help`)"),
        }
        Flow::Continue
    }

    fn dialog_line(&mut self, line: &str) {
        let fields: Vec<String> = self
            .orchestrator
            .modal()
            .content()
            .map(|c| c.fields().map(|f| f.id.as_str().to_owned()).collect())
            .unwrap_or_default();

        if let Some(id) = fields.get(self.field_cursor) {
            // An empty line keeps the prefilled value.
            if !line.trim().is_empty() {
                self.orchestrator.set_dialog_value(id, line.trim());
            }
            self.field_cursor += 1;
            return;
        }

        let has_destructive = self
            .orchestrator
            .modal()
            .labels()
            .is_some_and(|(_, _, destructive)| destructive.is_some());
        match line.trim() {
            "" | "y" => self.orchestrator.activate_dialog_control(SUBMIT_ID),
            "c" => self.orchestrator.activate_dialog_control(CANCEL_ID),
            "esc" => {
                self.orchestrator.handle_key(Key::Escape.into());
            }
            "d" if has_destructive => self.orchestrator.activate_dialog_control(DESTRUCTIVE_ID),
            other => println!("unknown choice: {other}"),
        }
        if !self.orchestrator.modal().is_open() {
            self.field_cursor = 0;
        }
    }

    fn export_to(&mut self, dir: &Path) {
        let Some(file) = self.orchestrator.export() else {
            return;
        };
        let path = dir.join(&file.file_name);
        match std::fs::write(&path, file.contents) {
            Ok(()) => println!("wrote {}", path.display()),
            Err(err) => {
                log::error!("cannot write {}: {err}", path.display());
                self.orchestrator
                    .store_mut()
                    .notify(NoticeLevel::Error, "Failed to export decks");
            }
        }
    }

    fn print_decks(&self) {
        let store = self.orchestrator.store();
        if store.decks().is_empty() {
            println!("no decks yet; `new-deck` or ^n creates one");
            return;
        }
        for deck in store.decks() {
            let marker = if store.active_deck_id() == Some(deck.id()) {
                '*'
            } else {
                ' '
            };
            println!(
                "{marker} {:<10} {} ({})",
                deck.id().as_str(),
                deck.name(),
                services::interchange::plural(store.cards(deck.id()).len(), "card")
            );
        }
    }

    fn render(&self) {
        if self.orchestrator.modal().is_open() {
            self.render_dialog();
            return;
        }

        let store = self.orchestrator.store();
        let view = store.view();
        println!();
        match view.deck {
            None => println!("── no deck selected ──"),
            Some(deck) => println!(
                "── {} · {} · {} ──",
                deck.name(),
                services::interchange::plural(view.deck_card_count, "card"),
                match view.mode {
                    Mode::Browse => "browse",
                    Mode::Study => "study",
                }
            ),
        }

        let query = store.pending_search().unwrap_or(view.query);
        if !query.is_empty() {
            println!("search: {query:?} · {}", view.summary);
        }

        match view.mode {
            Mode::Study => match view.card {
                Some(card) => {
                    let (side, text) = if view.flipped {
                        ("Back", card.back())
                    } else {
                        ("Front", card.front())
                    };
                    println!(
                        "[{}/{} · {}%] {side}: {}",
                        view.position,
                        view.total,
                        view.progress_percent,
                        highlighted(text, view.query)
                    );
                }
                None => println!("(no cards to show)"),
            },
            Mode::Browse => {
                if let Some(deck) = view.deck {
                    let result = store.search_result();
                    for card in &result.matched {
                        println!(
                            "  {:<8} {} → {}",
                            card.id().as_str(),
                            highlighted(card.front(), view.query),
                            highlighted(card.back(), view.query)
                        );
                    }
                    if result.matched.is_empty() && store.cards(deck.id()).is_empty() {
                        println!("  (empty deck; `new-card` or ^k adds one)");
                    }
                }
            }
        }

        if let Some(notice) = store.current_notice() {
            println!("[{}] {}", notice.level.as_str(), notice.message);
        }
    }

    fn render_dialog(&self) {
        let modal = self.orchestrator.modal();
        let (Some(title), Some(content), Some((submit, cancel, destructive))) =
            (modal.title(), modal.content(), modal.labels())
        else {
            return;
        };

        println!();
        println!("┌ {title}");
        let mut field_index = 0;
        for block in content.blocks() {
            match block {
                Block::Paragraph(text) => println!("│ {text}"),
                Block::Field(field) => {
                    let marker = if field_index == self.field_cursor { '>' } else { ' ' };
                    let hint = if field.value.is_empty() {
                        field.placeholder.as_deref().unwrap_or("")
                    } else {
                        field.value.as_str()
                    };
                    println!("│{marker} {}: {hint}", field.label);
                    field_index += 1;
                }
            }
        }
        if self.field_cursor >= field_index {
            match destructive {
                Some(label) => println!("└ [Enter] {submit} · [c] {cancel} · [d] {label}"),
                None => println!("└ [Enter] {submit} · [c] {cancel}"),
            }
        } else {
            println!("└ type a value (empty keeps the current one)");
        }
    }
}

/// Wraps the first match of `query` in brackets.
fn highlighted(text: &str, query: &str) -> String {
    match search::highlight(text, query) {
        Some(h) => format!("{}[{}]{}", h.before, h.matched, h.after),
        None => text.to_owned(),
    }
}

fn print_help() {
    println!("keys:     n/right next · p/left previous · f/space flip · s shuffle · esc");
    println!("          ^n new deck · ^k new card");
    println!("decks:    decks · select <id> · new-deck · rename <id> · delete <id>");
    println!("cards:    new-card · edit [card-id]");
    println!("session:  study · browse · next · prev · flip · shuffle");
    println!("search:   search <text> · clear");
    println!("files:    import <file> · export [dir] · info · clear-storage");
    println!("          quit");
}

/// Runs the study loop until `quit` or end of input, then writes any pending
/// changes.
pub async fn run(orchestrator: Orchestrator, dirty: Arc<AtomicBool>) -> Result<(), AppError> {
    let mut terminal = Terminal {
        orchestrator,
        field_cursor: 0,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    println!("flashcards · `help` lists commands");
    loop {
        if dirty.swap(false, Ordering::Relaxed) {
            terminal.render();
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if terminal.handle_line(&line).await == Flow::Quit {
                    break;
                }
                dirty.store(true, Ordering::Relaxed);
            }
            _ = ticker.tick() => {
                terminal.orchestrator.store_mut().tick().await;
            }
        }
    }

    let mut store = terminal.orchestrator.into_store();
    store.flush().await?;
    log::info!("session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_characters_are_keys() {
        assert_eq!(parse_line("n"), Some(Input::Key(Key::Char('n').into())));
        assert_eq!(parse_line(" S "), Some(Input::Key(Key::Char('S').into())));
        assert_eq!(parse_line("space"), Some(Input::Key(Key::Space.into())));
        assert_eq!(
            parse_line("^k"),
            Some(Input::Key(KeyPress::plain(Key::Char('k')).with_ctrl()))
        );
    }

    #[test]
    fn commands_map_to_actions() {
        assert_eq!(
            parse_line("select deck-2"),
            Some(Input::Action(UiAction::SelectDeck(DeckId::new("deck-2"))))
        );
        assert_eq!(
            parse_line("search  hola amigo "),
            Some(Input::Action(UiAction::SearchInput("hola amigo".into())))
        );
        assert_eq!(
            parse_line("edit card-3"),
            Some(Input::Action(UiAction::EditCard(CardId::new("card-3"))))
        );
        assert_eq!(parse_line("export"), Some(Input::Export(PathBuf::from("."))));
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("rename"), Some(Input::Unknown("rename".into())));
    }

    #[test]
    fn highlight_brackets_first_match() {
        assert_eq!(highlighted("Gracias", "ACI"), "Gr[aci]as");
        assert_eq!(highlighted("Hola", ""), "Hola");
    }
}
