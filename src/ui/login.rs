//! First-run login form.
//!
//! Shown when no stored session exists. Runs its own small event loop and
//! hands back a signed-in client, or `None` if the user cancels.

use crate::discourse::{ClientError, DiscourseClient};
use crate::theme::Palette;
use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use secrecy::SecretString;
use tokio::sync::mpsc;

use super::helpers::{catch_task_panic, centered_rect};
use super::loop_runner::{ShutdownSignals, TerminalGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Url,
    Username,
    Password,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Url => Field::Username,
            Field::Username => Field::Password,
            Field::Password => Field::Url,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FormAction {
    None,
    Submit,
    Cancel,
}

struct LoginForm {
    url: String,
    username: String,
    password: String,
    focus: Field,
    submitting: bool,
    error: Option<String>,
}

impl LoginForm {
    fn new(url: Option<String>) -> Self {
        let focus = if url.is_some() {
            Field::Username
        } else {
            Field::Url
        };
        Self {
            url: url.unwrap_or_default(),
            username: String::new(),
            password: String::new(),
            focus,
            submitting: false,
            error: None,
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> FormAction {
        if code == KeyCode::Esc
            || (modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c'))
        {
            return FormAction::Cancel;
        }
        if self.submitting {
            return FormAction::None;
        }

        match code {
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::Enter if self.focus == Field::Password => return FormAction::Submit,
            KeyCode::Enter => self.focus = self.focus.next(),
            KeyCode::Backspace => {
                self.field_mut().pop();
            }
            KeyCode::Char(c) => self.field_mut().push(c),
            _ => {}
        }
        FormAction::None
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Url => &mut self.url,
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }

    /// Check all fields are present before any network call.
    fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("Forum URL is required".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("Username is required".to_string());
        }
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(())
    }
}

type LoginResult = (DiscourseClient, Result<(), ClientError>);

/// Run the login form until a login succeeds or the user cancels.
///
/// `make_client` builds a client for the entered URL; it is called once per
/// attempt so a corrected URL takes effect.
pub async fn run_login<F>(initial_url: Option<String>, make_client: F) -> Result<Option<DiscourseClient>>
where
    F: Fn(&str) -> Result<DiscourseClient, ClientError>,
{
    let mut signals = ShutdownSignals::install()?;
    let mut terminal = TerminalGuard::enter()?;
    let mut events = crossterm::event::EventStream::new();
    let (tx, mut rx) = mpsc::channel::<LoginResult>(1);

    let palette = Palette::default();
    let mut form = LoginForm::new(initial_url);

    let outcome = loop {
        terminal.draw(|f| render(f, &form, &palette))?;

        tokio::select! {
            name = signals.recv() => {
                tracing::info!(signal = name, "Login interrupted");
                break None;
            }

            maybe_event = events.next() => {
                let key = match maybe_event {
                    Some(Ok(Event::Key(key))) => key,
                    None => break None,
                    _ => continue,
                };
                match form.handle_key(key.code, key.modifiers) {
                    FormAction::Cancel => break None,
                    FormAction::Submit => submit(&mut form, &make_client, &tx),
                    FormAction::None => {}
                }
            }

            Some((client, result)) = rx.recv() => {
                form.submitting = false;
                match result {
                    Ok(()) => break Some(client),
                    Err(e) => {
                        tracing::warn!(error = %e, "Login failed");
                        form.password.clear();
                        form.error = Some(login_error_message(&e));
                    }
                }
            }
        }
    };

    drop(terminal);
    Ok(outcome)
}

fn submit<F>(form: &mut LoginForm, make_client: &F, tx: &mpsc::Sender<LoginResult>)
where
    F: Fn(&str) -> Result<DiscourseClient, ClientError>,
{
    if let Err(msg) = form.validate() {
        form.error = Some(msg);
        return;
    }
    let client = match make_client(form.url.trim()) {
        Ok(client) => client,
        Err(e) => {
            form.error = Some(e.to_string());
            return;
        }
    };

    form.submitting = true;
    form.error = None;
    let username = form.username.trim().to_string();
    let password = SecretString::from(form.password.clone());
    let tx = tx.clone();

    tokio::spawn(async move {
        let result = match catch_task_panic(client.login(&username, &password)).await {
            Ok(result) => result,
            Err(panic) => Err(ClientError::Auth(format!("login task panicked: {}", panic))),
        };
        if let Err(e) = tx.send((client, result)).await {
            tracing::warn!(error = %e, "Failed to send login result (receiver dropped)");
        }
    });
}

fn login_error_message(e: &ClientError) -> String {
    match e {
        ClientError::Auth(reason) => format!("Login rejected: {}", reason),
        ClientError::Protocol { status: 403, .. } => {
            "Login rejected (403). Check your credentials.".to_string()
        }
        other => other.to_string(),
    }
}

fn render(f: &mut Frame, form: &LoginForm, palette: &Palette) {
    let area = centered_rect(60, 60, f.area());
    if area.width < 30 || area.height < 14 {
        f.render_widget(Paragraph::new("Terminal too small for the login form"), f.area());
        return;
    }
    f.render_widget(Clear, area);

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_focused)
        .title(Span::styled(" Sign in to a Discourse forum ", palette.title));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let masked = "*".repeat(form.password.chars().count());
    let fields = [
        (Field::Url, "Forum URL", form.url.as_str()),
        (Field::Username, "Username or email", form.username.as_str()),
        (Field::Password, "Password", masked.as_str()),
    ];
    for (area, (field, label, value)) in rows.iter().zip(fields) {
        let focused = form.focus == field && !form.submitting;
        let border = if focused {
            palette.border_focused
        } else {
            palette.border
        };
        let cursor = if focused { "_" } else { "" };
        f.render_widget(
            Paragraph::new(format!("{}{}", value, cursor)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ", label)),
            ),
            *area,
        );
    }

    let footer = if form.submitting {
        Line::from(Span::styled("Signing in...", palette.metadata))
    } else if let Some(error) = form.error.as_deref() {
        Line::from(Span::styled(error.to_string(), palette.error))
    } else {
        Line::from(Span::styled(
            "Tab next field | Enter on password to sign in | Esc quit",
            palette.metadata,
        ))
    };
    f.render_widget(Paragraph::new(footer), rows[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(form: &mut LoginForm, s: &str) {
        for c in s.chars() {
            form.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn test_prefilled_url_focuses_username() {
        let form = LoginForm::new(Some("forum.example.com".into()));
        assert_eq!(form.focus, Field::Username);
        assert_eq!(LoginForm::new(None).focus, Field::Url);
    }

    #[test]
    fn test_enter_advances_then_submits() {
        let mut form = LoginForm::new(None);
        type_str(&mut form, "forum.example.com");
        assert_eq!(form.handle_key(KeyCode::Enter, KeyModifiers::NONE), FormAction::None);
        type_str(&mut form, "alice");
        form.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        type_str(&mut form, "hunter2");
        assert_eq!(form.handle_key(KeyCode::Enter, KeyModifiers::NONE), FormAction::Submit);

        assert_eq!(form.url, "forum.example.com");
        assert_eq!(form.username, "alice");
        assert_eq!(form.password, "hunter2");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut form = LoginForm::new(Some("forum.example.com".into()));
        assert_eq!(form.validate().unwrap_err(), "Username is required");
        type_str(&mut form, "bob");
        assert_eq!(form.validate().unwrap_err(), "Password is required");
    }

    #[test]
    fn test_edits_ignored_while_submitting() {
        let mut form = LoginForm::new(Some("x".into()));
        form.submitting = true;
        type_str(&mut form, "zzz");
        assert!(form.username.is_empty());
        assert_eq!(form.handle_key(KeyCode::Esc, KeyModifiers::NONE), FormAction::Cancel);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            login_error_message(&ClientError::Auth("Incorrect password".into())),
            "Login rejected: Incorrect password"
        );
    }
}
