use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::backend::Backend;
use crate::history::HistoryLog;
use crate::identity::{department_index, Identity, DEPARTMENTS};
use crate::runtime::SecondPacer;
use crate::session::{SessionPhase, TestSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Department,
    RegistrationNumber,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            Self::Name => Self::Department,
            Self::Department => Self::RegistrationNumber,
            Self::RegistrationNumber => Self::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Name => Self::RegistrationNumber,
            Self::Department => Self::Name,
            Self::RegistrationNumber => Self::Department,
        }
    }
}

/// Registration form shown before the first test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityForm {
    pub name: String,
    pub department: Option<usize>,
    pub registration_number: String,
    pub focus: FormField,
}

impl Default for IdentityForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            department: None,
            registration_number: String::new(),
            focus: FormField::Name,
        }
    }
}

impl IdentityForm {
    pub fn prefilled(
        name: Option<String>,
        department: Option<&str>,
        registration_number: Option<String>,
    ) -> Self {
        Self {
            name: name.unwrap_or_default(),
            department: department.and_then(department_index),
            registration_number: registration_number.unwrap_or_default(),
            focus: FormField::Name,
        }
    }

    pub fn department_name(&self) -> &'static str {
        self.department.map(|i| DEPARTMENTS[i]).unwrap_or("")
    }

    pub fn to_identity(&self) -> Identity {
        Identity::new(
            self.name.clone(),
            self.department_name(),
            self.registration_number.clone(),
        )
    }

    fn cycle_department(&mut self, forward: bool) {
        let n = DEPARTMENTS.len();
        self.department = Some(match (self.department, forward) {
            (None, true) => 0,
            (None, false) => n - 1,
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
        });
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Name => Some(&mut self.name),
            FormField::RegistrationNumber => Some(&mut self.registration_number),
            FormField::Department => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App<B: Backend> {
    pub session: TestSession<B>,
    pub form: IdentityForm,
    pub status: Option<String>,
    history: Option<HistoryLog>,
    logged_sessions: u64,
    pacer: SecondPacer,
}

impl<B: Backend> App<B> {
    pub fn new(session: TestSession<B>, form: IdentityForm, history: Option<HistoryLog>) -> Self {
        Self {
            session,
            form,
            status: None,
            history,
            logged_sessions: 0,
            pacer: SecondPacer::new(Instant::now()),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> AppAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return AppAction::Quit,
            KeyCode::Char('c') if ctrl => return AppAction::Quit,
            KeyCode::Char('e') if ctrl => {
                if self.session.phase().is_running() {
                    match self.session.end_test() {
                        Ok(()) => self.status = Some("test ended early".to_string()),
                        Err(e) => self.status = Some(e.to_string()),
                    }
                }
                self.sync_history();
                return AppAction::Continue;
            }
            _ => {}
        }

        let timer_was_active = self.session.timer_active();

        if self.session.needs_identity() {
            self.on_form_key(key);
        } else {
            match self.session.phase() {
                SessionPhase::FirstHalfActive | SessionPhase::SecondHalfActive => {
                    let result = match key.code {
                        KeyCode::Char(c) if !ctrl => Some(self.session.type_char(c)),
                        KeyCode::Backspace => Some(self.session.backspace()),
                        _ => None,
                    };
                    if let Some(Err(e)) = result {
                        self.status = Some(e.to_string());
                    }
                }
                SessionPhase::Break => {}
                SessionPhase::Completed | SessionPhase::AwaitingIdentity => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char('r')) {
                        self.status = self.session.restart().err().map(|e| e.to_string());
                    }
                }
            }
        }

        if !timer_was_active && self.session.timer_active() {
            self.pacer.reset(now);
        }
        self.sync_history();
        AppAction::Continue
    }

    fn on_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.form.focus = self.form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus = self.form.focus.prev(),
            KeyCode::Left if self.form.focus == FormField::Department => {
                self.form.cycle_department(false)
            }
            KeyCode::Right | KeyCode::Char(' ') if self.form.focus == FormField::Department => {
                self.form.cycle_department(true)
            }
            KeyCode::Backspace => {
                if let Some(text) = self.form.focused_text() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.form.focused_text() {
                    text.push(c);
                }
            }
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    pub fn submit_form(&mut self) {
        match self.session.submit_identity(self.form.to_identity()) {
            Ok(()) => self.status = None,
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Feed every whole second that elapsed up to `now` into the session
    pub fn on_tick(&mut self, now: Instant) {
        for _ in 0..self.pacer.due(now) {
            self.session.tick();
        }
        self.sync_history();
    }

    fn sync_history(&mut self) {
        let finished = self.session.finished_sessions();
        if finished == self.logged_sessions {
            return;
        }
        self.logged_sessions = finished;

        if let (Some(history), Some(record)) = (&self.history, self.session.last_record()) {
            if let Err(e) = history.append(record) {
                warn!(path = %history.path().display(), error = %e, "failed to append history");
            }
        }
    }
}
