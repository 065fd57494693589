//! Interactive review session for a document on disk
//!
//! Line-oriented: each command acts on the engine, and engine events are
//! printed as they arrive. Completions are applied while waiting for input.

use chrono::{DateTime, Utc};
use daemon_ai_core::{
    config::AppConfig,
    engine::{EngineEvent, Highlight, Outcome, SuggestionEngine},
    error::Result,
    Daemon, Document, EngineError, HttpCollaborator, NewDaemon, Suggestion, SuggestionId,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

enum Flow {
    Continue,
    Quit,
}

struct Session {
    engine: SuggestionEngine,
    daemons: Vec<Daemon>,
    path: PathBuf,
}

/// Run the review session for `path`
pub async fn run(path: PathBuf, config: AppConfig) -> Result<()> {
    let document = if path.exists() {
        Document::open(&path)?
    } else {
        info!("{} does not exist yet; starting empty", path.display());
        Document::new("")
    };

    let backend = Arc::new(HttpCollaborator::new(&config)?);
    let engine = SuggestionEngine::new(backend.clone(), backend, document);
    let mut events = engine.subscribe();
    let mut session = Session {
        engine,
        daemons: Vec::new(),
        path,
    };

    println!();
    println!("Daemon AI - {}", session.path.display());
    println!("════════════════════════════════════════════════════════════");
    println!("Backend:   {}", config.api_base);
    println!("Commands:  help, daemons, ask <daemon>, next, prev, apply, quit");
    println!("════════════════════════════════════════════════════════════");
    session.refresh_daemons().await;
    session.print_daemons();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&session.engine)?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Flow::Quit = session.execute(line.trim()).await? {
                    break;
                }
            }
            Some(outcome) = session.engine.next_completion(), if session.engine.pending() > 0 => {
                debug!("Completion handled: {:?}", outcome);
                println!();
                if let Outcome::Added(_) = outcome {
                    session.print_selected();
                }
            }
        }
        print_events(&mut events);
    }

    if session.engine.document().is_dirty() {
        println!("Unsaved changes discarded (use 'write' to save)");
    }
    if session.engine.pending() > 0 {
        debug!("Leaving {} request(s) unanswered", session.engine.pending());
    }
    Ok(())
}

impl Session {
    async fn execute(&mut self, input: &str) -> Result<Flow> {
        let (command, argument) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "" => {}
            "help" => show_help(),
            "quit" | "exit" => return Ok(Flow::Quit),
            "daemons" => {
                self.refresh_daemons().await;
                self.print_daemons();
            }
            "ask" => self.ask(argument),
            "list" => self.print_queue(),
            "show" => self.print_selected(),
            "text" => println!("{}", self.engine.document().text()),
            "next" => {
                self.engine.select_next();
                self.print_selected();
            }
            "prev" => {
                self.engine.select_previous();
                self.print_selected();
            }
            "apply" => self.on_selected(|engine, id| engine.apply_suggestion(id)),
            "reject" => self.on_selected(|engine, id| engine.reject_suggestion(id).map(drop)),
            "dismiss" => self.on_selected(|engine, id| engine.dismiss_suggestion(id).map(drop)),
            "answer" => self.on_selected(|engine, id| engine.request_answer(id)),
            "clear" => {
                let removed = self.engine.clear();
                println!("Cleared {} suggestion(s)", removed);
            }
            "wait" => {
                let outcomes = self.engine.settle().await;
                println!("{} result(s) received", outcomes.len());
            }
            "reload" => self.reload()?,
            "write" => {
                self.engine.document_mut().save_as(&self.path)?;
                println!("✓ Wrote {}", self.path.display());
            }
            "add" => self.add_daemon(argument).await,
            "delete" => self.delete_daemon(argument).await,
            other => println!("Unknown command '{}' (try 'help')", other),
        }
        Ok(Flow::Continue)
    }

    async fn refresh_daemons(&mut self) {
        match self.engine.list_daemons().await {
            Ok(daemons) => self.daemons = daemons,
            Err(e) => {
                warn!("Could not list daemons: {}", e);
                println!("✗ {}", describe(&e));
            }
        }
    }

    /// Daemon by 1-based number or id
    fn find_daemon(&self, key: &str) -> Option<&Daemon> {
        match key.parse::<usize>() {
            Ok(n) if n >= 1 => self.daemons.get(n - 1),
            _ => self.daemons.iter().find(|d| d.id == key),
        }
    }

    fn ask(&mut self, argument: &str) {
        if argument == "all" {
            for daemon in self.daemons.clone() {
                self.engine.request_suggestion(daemon);
            }
            println!("Asked {} daemon(s)", self.daemons.len());
            return;
        }
        match self.find_daemon(argument).cloned() {
            Some(daemon) => {
                println!("Asking {}...", daemon.name);
                self.engine.request_suggestion(daemon);
            }
            None => println!("No daemon '{}' (see 'daemons')", argument),
        }
    }

    fn on_selected<F>(&mut self, action: F)
    where
        F: FnOnce(&mut SuggestionEngine, SuggestionId) -> std::result::Result<(), EngineError>,
    {
        let Some(id) = self.engine.selected().map(|s| s.id()) else {
            println!("No suggestion selected");
            return;
        };
        if let Err(e) = action(&mut self.engine, id) {
            println!("✗ {}", describe(&e));
        }
    }

    /// Pick up edits made to the file outside this session
    fn reload(&mut self) -> Result<()> {
        let text = std::fs::read_to_string(&self.path)?;
        self.engine.sync_document(&text);
        println!(
            "Reloaded {} (revision {})",
            self.path.display(),
            self.engine.document().revision()
        );
        Ok(())
    }

    async fn add_daemon(&mut self, argument: &str) {
        let Some((name, prompt)) = argument.split_once('|') else {
            println!("Usage: add <name> | <prompt>");
            return;
        };
        match self.engine.create_daemon(NewDaemon::new(name.trim(), prompt.trim())).await {
            Ok(daemon) => {
                println!("✓ Added {} ({})", daemon.name, daemon.id);
                self.refresh_daemons().await;
            }
            Err(e) => println!("✗ {}", describe(&e)),
        }
    }

    async fn delete_daemon(&mut self, argument: &str) {
        let Some(id) = self.find_daemon(argument).map(|d| d.id.clone()) else {
            println!("No daemon '{}' (see 'daemons')", argument);
            return;
        };
        match self.engine.delete_daemon(&id).await {
            Ok(removed) => {
                println!("✓ Deleted {} ({} suggestion(s) removed)", id, removed.len());
                self.refresh_daemons().await;
            }
            Err(e) => println!("✗ {}", describe(&e)),
        }
    }

    fn print_daemons(&self) {
        if self.daemons.is_empty() {
            println!("No daemons available");
            return;
        }
        for (i, daemon) in self.daemons.iter().enumerate() {
            println!("  {}. {} [{}] {}", i + 1, daemon.name, daemon.id, daemon.color);
        }
    }

    fn print_queue(&self) {
        let selected = self.engine.selected().map(|s| s.id());
        for suggestion in self.engine.suggestions() {
            let marker = if Some(suggestion.id()) == selected { ">" } else { " " };
            let stale = if suggestion.is_outdated() { " (outdated)" } else { "" };
            println!(
                "{} {} {}: {}{}",
                marker,
                suggestion.id(),
                suggestion.daemon_name,
                suggestion.question,
                stale
            );
        }
    }

    fn print_selected(&self) {
        let Some(suggestion) = self.engine.selected() else {
            println!("No suggestions");
            return;
        };
        if let Some((n, m)) = self.engine.position() {
            println!(
                "[{} of {}] {} ({})",
                n,
                m,
                suggestion.daemon_name,
                age(suggestion.created_at, Utc::now())
            );
        }
        println!("  {}", suggestion.question);
        if let Some(highlight) = self.engine.highlight() {
            println!(
                "  at {}..{}: \"{}\"{}",
                highlight.start,
                highlight.end,
                highlight.text,
                span_marker(&highlight, suggestion)
            );
        }
        if let Some(fix) = &suggestion.suggested_fix {
            println!("  suggested: {}", fix);
        }
    }
}

fn prompt(engine: &SuggestionEngine) -> io::Result<()> {
    let pending = engine.pending();
    if pending > 0 {
        print!("daemon-ai ({} pending)> ", pending);
    } else {
        print!("daemon-ai> ");
    }
    io::stdout().flush()
}

fn print_events(events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        let event = match events.try_recv() {
            Ok(event) => event,
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Missed {} engine event(s)", skipped);
                continue;
            }
            Err(_) => break,
        };
        match event {
            EngineEvent::RequestFailed { daemon_id, message } => {
                println!("✗ {}: {}", daemon_id, message)
            }
            EngineEvent::ApplyStarted { id } => println!("Applying {}...", id),
            EngineEvent::ApplyFailed { id, message } => {
                println!("✗ Apply {} failed: {}", id, message)
            }
            EngineEvent::ApplyDiscarded { id } => {
                println!("Rewrite for {} arrived too late and was discarded", id)
            }
            EngineEvent::DocumentReplaced { revision } => {
                println!("✓ Document rewritten (revision {})", revision)
            }
            EngineEvent::SuggestionsOutdated { ids } => {
                println!("{} other suggestion(s) are now outdated", ids.len())
            }
            EngineEvent::AnswerReady { id, answer } => println!("{}: {}", id, answer),
            EngineEvent::AnswerFailed { id, message } => {
                println!("✗ Answer for {}: {}", id, message)
            }
            EngineEvent::Notice { message } => println!("{}", message),
            EngineEvent::SuggestionAdded { .. }
            | EngineEvent::SuggestionRemoved { .. }
            | EngineEvent::SelectionChanged { .. } => {}
        }
    }
}

/// Staleness note for a highlight
fn span_marker(highlight: &Highlight, suggestion: &Suggestion) -> &'static str {
    match (highlight.is_outdated, highlight.matches_span(suggestion)) {
        (true, true) => " (outdated)",
        (true, false) => " (outdated, text changed under span)",
        (false, true) => "",
        (false, false) => " (text changed under span)",
    }
}

/// Coarse "how long ago" for a suggestion
fn age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(created_at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{}s ago", secs),
        60..=3599 => format!("{}m ago", secs / 60),
        _ => format!("{}h ago", secs / 3600),
    }
}

fn describe(error: &EngineError) -> String {
    match error {
        EngineError::Collaborator(e) => e.user_message(),
        other => other.to_string(),
    }
}

fn show_help() {
    println!("Daemons:");
    println!("  daemons               List daemons");
    println!("  ask <n|id|all>        Request a suggestion");
    println!("  add <name> | <prompt> Create a daemon");
    println!("  delete <n|id>         Delete a daemon and its suggestions");
    println!("Suggestions:");
    println!("  list, show            Queue overview / selected suggestion");
    println!("  next, prev            Move the selection");
    println!("  apply                 Rewrite the document around the selection");
    println!("  reject, dismiss       Drop the selection");
    println!("  answer                Ask the daemon to elaborate");
    println!("  clear                 Drop every suggestion");
    println!("  wait                  Wait for outstanding requests");
    println!("Document:");
    println!("  text                  Print the document");
    println!("  reload                Re-read the file after editing it elsewhere");
    println!("  write                 Save the document");
    println!("  quit");
}
