//! Main event loop for the TUI, plus the terminal and signal plumbing the
//! login form shares with it.

use crate::app::{App, AppEvent};
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::ops::{Deref, DerefMut};
use std::sync::Once;
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

use super::events::handle_app_event;
use super::input::handle_input;
use super::render::render;
use super::sync;

const TICK: Duration = Duration::from_millis(250);

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

// ============================================================================
// Terminal
// ============================================================================

static PANIC_HOOK: Once = Once::new();

/// Raw-mode alternate screen, left again when dropped.
///
/// Dropping restores the terminal on every exit path, `?` included. The
/// panic hook covers unwinding past it.
pub(super) struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    pub(super) fn enter() -> Result<Self> {
        PANIC_HOOK.call_once(|| {
            let original_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |panic_info| {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                original_hook(panic_info);
            }));
        });

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Deref for TerminalGuard {
    type Target = Terminal<CrosstermBackend<Stdout>>;

    fn deref(&self) -> &Self::Target {
        &self.terminal
    }
}

impl DerefMut for TerminalGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "Failed to leave raw mode");
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::warn!(error = %e, "Failed to leave alternate screen");
        }
        let _ = self.terminal.show_cursor();
    }
}

// ============================================================================
// Signals
// ============================================================================

/// SIGTERM and SIGINT as one future. Never fires off unix.
pub(super) struct ShutdownSignals {
    #[cfg(unix)]
    term: Signal,
    #[cfg(unix)]
    int: Signal,
}

impl ShutdownSignals {
    pub(super) fn install() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            term: signal(SignalKind::terminate())?,
            #[cfg(unix)]
            int: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next shutdown signal and return its name.
    #[cfg(unix)]
    pub(super) async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.term.recv() => "SIGTERM",
            _ = self.int.recv() => "SIGINT",
        }
    }

    #[cfg(not(unix))]
    pub(super) async fn recv(&mut self) -> &'static str {
        std::future::pending().await
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Runs the TUI until the user quits or a shutdown signal arrives.
///
/// Sources, in priority order: signals, terminal input, background task
/// results, and a 250ms tick that drives the auto-refresh timer. Only
/// redraws when something changed.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut signals = ShutdownSignals::install()?;
    let mut terminal = TerminalGuard::enter()?;
    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    loop {
        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        // Results first, so typing cannot starve them.
        while let Ok(event) = event_rx.try_recv() {
            handle_app_event(app, event, &event_tx);
            app.needs_redraw = true;
        }

        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
        }

        tokio::select! {
            biased;

            name = signals.recv() => {
                tracing::info!(signal = name, "Shutting down");
                break;
            }

            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    app.needs_redraw = true;
                    if let Action::Quit = handle_input(app, key.code, key.modifiers, &event_tx) {
                        break;
                    }
                }
                Some(Ok(Event::Resize(..))) => app.needs_redraw = true,
                Some(Ok(_)) => {}
                Some(Err(e)) => tracing::warn!(error = %e, "Terminal input error"),
                None => break,
            },

            Some(event) = event_rx.recv() => {
                handle_app_event(app, event, &event_tx);
                app.needs_redraw = true;
            }

            _ = tick.tick() => sync::on_tick(app, &event_tx),
        }
    }

    Ok(())
}
