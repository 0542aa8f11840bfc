use std::io::{self, Write};
use std::process;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::debug;

use crate::composer::Conversation;
use crate::i18n::{Language, MessageKey, t};

const EXIT_COMMAND: &str = "exit";

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode().context("failed to enter raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

struct BracketedPasteGuard;

impl BracketedPasteGuard {
    fn enable() -> Result<Self> {
        let mut stdout = io::stdout();
        execute!(stdout, EnableBracketedPaste)?;
        Ok(Self)
    }
}

impl Drop for BracketedPasteGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, DisableBracketedPaste);
    }
}

/// Raw mode is only held while a line is being edited, so a Ctrl+C during a
/// remote call arrives as SIGINT. The handler also covers `kill -INT`.
fn install_interrupt_handler(farewell: &'static str) -> Result<()> {
    ctrlc::set_handler(move || {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, DisableBracketedPaste);
        let _ = write!(stdout, "\r\n{farewell}\r\n");
        let _ = stdout.flush();
        process::exit(0);
    })
    .context("failed to install interrupt handler")
}

#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// The buffer changed and the prompt line needs repainting.
    Redraw,
    Submit(String),
    Terminate,
    Ignore,
}

/// Applies one key press to the line buffer.
pub fn handle_key(buf: &mut String, key: KeyEvent) -> KeyAction {
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return KeyAction::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => KeyAction::Submit(std::mem::take(buf)),
        KeyCode::Char('c') if ctrl => KeyAction::Terminate,
        KeyCode::Char('d') if ctrl && buf.is_empty() => KeyAction::Terminate,
        KeyCode::Backspace => {
            if buf.pop().is_some() {
                KeyAction::Redraw
            } else {
                KeyAction::Ignore
            }
        }
        KeyCode::Char(c) if !ctrl => {
            buf.push(c);
            KeyAction::Redraw
        }
        _ => KeyAction::Ignore,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Exit,
    /// The reply, or the error message shown in its place.
    Reply(String),
}

pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(EXIT_COMMAND)
}

/// Handles one submitted line. The exit sentinel never reaches the composer;
/// `before_send` runs only when a request is about to go out.
pub fn handle_line(
    conversation: &mut Conversation,
    line: &str,
    before_send: impl FnOnce(),
) -> LineOutcome {
    if is_exit_command(line) {
        return LineOutcome::Exit;
    }
    before_send();
    match conversation.compose_and_send(line) {
        Ok(reply) => LineOutcome::Reply(reply),
        Err(err) => {
            debug!(error = ?err, "exchange failed");
            LineOutcome::Reply(err.user_message())
        }
    }
}

fn prompt(buf: &str, lang: &Language) {
    let prompt_text = t(lang, MessageKey::PromptUser);
    print!("\r\x1b[2K{prompt_text}{buf}");
    io::stdout().flush().ok();
}

/// Reads one line in raw mode. `None` means the user asked to terminate.
fn read_line(lang: &Language) -> Result<Option<String>> {
    let _raw_guard = RawModeGuard::enable()?;
    let _paste_guard = BracketedPasteGuard::enable()?;
    let mut buf = String::new();

    prompt(&buf, lang);

    loop {
        let evt = event::read().context("failed to read terminal event")?;
        match evt {
            Event::Key(key) => match handle_key(&mut buf, key) {
                KeyAction::Redraw => prompt(&buf, lang),
                KeyAction::Submit(line) => {
                    print!("\r\n");
                    io::stdout().flush().ok();
                    return Ok(Some(line));
                }
                KeyAction::Terminate => {
                    print!("\r\n");
                    io::stdout().flush().ok();
                    return Ok(None);
                }
                KeyAction::Ignore => {}
            },
            Event::Paste(pasted) => {
                let normalized = pasted.replace(['\r', '\n'], " ");
                buf.push_str(&normalized);
                prompt(&buf, lang);
            }
            _ => {}
        }
    }
}

pub fn chat_loop(conversation: &mut Conversation, lang: &Language) -> Result<()> {
    install_interrupt_handler(t(lang, MessageKey::SessionTerminated))?;

    println!("\n{}\n", t(lang, MessageKey::WelcomeMessage));
    println!("{}\n", t(lang, MessageKey::ExitHint));

    loop {
        let Some(line) = read_line(lang)? else {
            println!("{}", t(lang, MessageKey::SessionTerminated));
            return Ok(());
        };

        let outcome = handle_line(conversation, &line, || {
            println!("{}\n", t(lang, MessageKey::Generating));
        });
        match outcome {
            LineOutcome::Exit => {
                println!("{}", t(lang, MessageKey::Goodbye));
                return Ok(());
            }
            LineOutcome::Reply(text) => {
                println!("{}{}\n", t(lang, MessageKey::PromptAssistant), text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::llm::{CompletionClient, CompletionError};

    struct CountingClient {
        calls: Rc<Cell<usize>>,
    }

    impl CompletionClient for CountingClient {
        fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.set(self.calls.get() + 1);
            Ok("Hi there".to_string())
        }
    }

    fn conversation() -> (Conversation, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let client = CountingClient {
            calls: calls.clone(),
        };
        (Conversation::new(Box::new(client)), calls)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn plain(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_exit_sentinel_any_case() {
        let (mut conversation, calls) = conversation();
        for line in ["exit", "EXIT", "Exit", "eXiT"] {
            let mut announced = false;
            assert_eq!(
                handle_line(&mut conversation, line, || announced = true),
                LineOutcome::Exit
            );
            assert!(!announced);
        }
        assert_eq!(calls.get(), 0);
        assert!(conversation.transcript().is_empty());
    }

    #[test]
    fn test_exit_must_be_whole_line() {
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command("exits"));
        assert!(is_exit_command("exit "));
    }

    #[test]
    fn test_regular_line_gets_reply() {
        let (mut conversation, calls) = conversation();
        let mut announced = false;
        assert_eq!(
            handle_line(&mut conversation, "Hello", || announced = true),
            LineOutcome::Reply("Hi there".to_string())
        );
        assert!(announced);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_blank_line_shows_error_without_call() {
        let (mut conversation, calls) = conversation();
        assert_eq!(
            handle_line(&mut conversation, "  ", || {}),
            LineOutcome::Reply("Error: User input cannot be empty.".to_string())
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_ctrl_c_terminates() {
        let mut buf = "half typed".to_string();
        assert_eq!(handle_key(&mut buf, ctrl('c')), KeyAction::Terminate);

        let mut empty = String::new();
        assert_eq!(handle_key(&mut empty, ctrl('c')), KeyAction::Terminate);
    }

    #[test]
    fn test_ctrl_d_terminates_only_on_empty_line() {
        let mut buf = String::new();
        assert_eq!(handle_key(&mut buf, ctrl('d')), KeyAction::Terminate);

        let mut buf = "abc".to_string();
        assert_eq!(handle_key(&mut buf, ctrl('d')), KeyAction::Ignore);
        assert_eq!(buf, "abc");
    }

    #[test]
    fn test_typing_and_enter_submit_buffer() {
        let mut buf = String::new();
        for c in "Hey".chars() {
            assert_eq!(handle_key(&mut buf, plain(KeyCode::Char(c))), KeyAction::Redraw);
        }
        assert_eq!(handle_key(&mut buf, plain(KeyCode::Backspace)), KeyAction::Redraw);
        assert_eq!(
            handle_key(&mut buf, plain(KeyCode::Enter)),
            KeyAction::Submit("He".to_string())
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_backspace_on_empty_and_release_events_are_ignored() {
        let mut buf = String::new();
        assert_eq!(handle_key(&mut buf, plain(KeyCode::Backspace)), KeyAction::Ignore);

        let mut release = plain(KeyCode::Char('x'));
        release.kind = KeyEventKind::Release;
        assert_eq!(handle_key(&mut buf, release), KeyAction::Ignore);
        assert!(buf.is_empty());
    }
}
