//! Terminal front-end: reads commands from stdin and renders the state
//! snapshots published by the orchestrator.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use super::commands::{Command, SpeakTarget, HELP};
use crate::core::features::speech::{spoken_language, SpeechService};
use crate::core::features::translator::{LanguageSlot, Orchestrator};
use crate::core::languages;
use crate::shared::error::{AppError, AppResult};
use crate::shared::events::AppEvent;
use crate::shared::types::{HistoryItem, TranslatorState};

pub struct Console {
    orchestrator: Orchestrator,
    speech: Arc<SpeechService>,
}

impl Console {
    pub fn new(orchestrator: Orchestrator, speech: Arc<SpeechService>) -> Self {
        Self { orchestrator, speech }
    }

    /// Run until `:quit` or end of input
    pub async fn run(self, events: UnboundedReceiver<AppEvent>) -> AppResult<()> {
        let renderer = tokio::spawn(render_loop(events));
        println!("{}", banner(&self.orchestrator.state()));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(e) = self.handle(command).await {
                        println!("! {}", e);
                    }
                }
                Err(e) => println!("! {}", e),
            }
        }

        renderer.abort();
        tracing::info!("Console closed");
        Ok(())
    }

    async fn handle(&self, command: Command) -> AppResult<()> {
        match command {
            Command::Input(text) => self.orchestrator.on_input_change(text),
            Command::From(name) => self.select(LanguageSlot::Source, &name)?,
            Command::To(name) => self.select(LanguageSlot::Target, &name)?,
            Command::Swap => {
                if !self.orchestrator.swap_languages() {
                    println!("Pick a source language before swapping");
                }
            }
            Command::Clear => self.orchestrator.on_input_change(String::new()),
            Command::Once => self.orchestrator.translate_once().await,
            Command::Say(target) => {
                let (text, language) = speech_text(&self.orchestrator.state(), target);
                let speech = Arc::clone(&self.speech);
                // Plays to completion in the background while editing goes on
                tokio::spawn(async move { speech.speak(&text, language).await });
            }
            Command::History => print_history(&self.orchestrator.history().items()),
            Command::Restore(position) => {
                let items = self.orchestrator.history().items();
                let item = items
                    .get(position - 1)
                    .ok_or_else(|| AppError::Validation(format!("No history entry {}", position)))?;
                self.orchestrator.restore(&item.id);
                println!("{}", item.source_text);
            }
            Command::Forget => {
                self.orchestrator.clear_history();
                println!("History cleared");
            }
            Command::Languages => {
                for lang in languages::source_languages() {
                    println!("  {:<5} {}", lang.code, lang.name);
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    fn select(&self, slot: LanguageSlot, name: &str) -> AppResult<()> {
        let lang = languages::resolve(name)
            .ok_or_else(|| AppError::Validation(format!("Unknown language: {}", name)))?;
        self.orchestrator.on_language_change(slot, lang.code)?;
        println!("{}", banner(&self.orchestrator.state()));
        Ok(())
    }
}

async fn render_loop(mut events: UnboundedReceiver<AppEvent>) {
    let mut renderer = Renderer::default();
    while let Some(event) = events.recv().await {
        match event {
            AppEvent::TranslationUpdated(state) => {
                if let Some(text) = renderer.update(&state) {
                    let mut stdout = std::io::stdout();
                    if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
                        tracing::debug!(error = %e, "Failed to write to stdout");
                    }
                }
            }
            AppEvent::HistoryUpdated(items) => tracing::debug!(entries = items.len(), "History updated"),
        }
    }
}

fn banner(state: &TranslatorState) -> String {
    format!(
        "[{} -> {}] type :help for commands",
        languages::display_name(&state.source_lang),
        languages::display_name(&state.target_lang)
    )
}

/// Turns state snapshots into terminal output. A streaming translation is
/// written as it grows, one suffix at a time, on a line opened with `=>`.
#[derive(Default)]
struct Renderer {
    /// Output already written on the open line
    shown: String,
    open: bool,
    last_settled: Option<String>,
}

impl Renderer {
    /// Text to write for `state`, if anything changed
    fn update(&mut self, state: &TranslatorState) -> Option<String> {
        let mut out = String::new();

        if state.is_translating {
            self.last_settled = None;
            if state.output.is_empty() {
                out.push_str(self.close());
            } else if self.open && state.output.starts_with(&self.shown) {
                out.push_str(&state.output[self.shown.len()..]);
            } else {
                out.push_str(self.close());
                out.push_str("=> ");
                out.push_str(&state.output);
                self.open = true;
            }
            self.shown.clone_from(&state.output);
            return (!out.is_empty()).then_some(out);
        }

        let (line, detected) = match &state.error {
            Some(error) => (Some(format!("! {}\n", error)), String::new()),
            None if state.output.is_empty() => (None, String::new()),
            None => {
                let detected = match &state.detected_language {
                    Some(code) => format!(" (from {})", languages::display_name(code)),
                    None => String::new(),
                };
                (Some(format!("=> {}{}\n", state.output, detected)), detected)
            }
        };

        if self.open {
            if state.error.is_none() && !state.output.is_empty() && state.output == self.shown {
                // Finish the streamed line in place
                self.open = false;
                self.shown.clear();
                self.last_settled = line;
                return Some(format!("{}\n", detected));
            }
            out.push_str(self.close());
        }

        match line {
            Some(line) if self.last_settled.as_ref() != Some(&line) => {
                out.push_str(&line);
                self.last_settled = Some(line);
            }
            Some(_) => {}
            None => self.last_settled = None,
        }
        (!out.is_empty()).then_some(out)
    }

    fn close(&mut self) -> &'static str {
        self.shown.clear();
        if std::mem::take(&mut self.open) {
            "\n"
        } else {
            ""
        }
    }
}

/// Text to read aloud and the language to read it in
fn speech_text(state: &TranslatorState, target: SpeakTarget) -> (String, &'static str) {
    match target {
        SpeakTarget::Input => (
            state.input.clone(),
            spoken_language(&state.source_lang, state.detected_language.as_deref()),
        ),
        SpeakTarget::Output => (state.output.clone(), spoken_language(&state.target_lang, None)),
    }
}

fn print_history(items: &[HistoryItem]) {
    if items.is_empty() {
        println!("History is empty");
        return;
    }
    for (position, item) in items.iter().enumerate() {
        println!(
            "{:>2}. {} [{} -> {}] {} => {}",
            position + 1,
            item.timestamp.format("%H:%M"),
            item.result.source_language,
            item.result.target_language,
            item.source_text.replace('\n', " "),
            item.translated_text().replace('\n', " ")
        );
    }
}
