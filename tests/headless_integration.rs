use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use halftype::app::{App, AppAction, IdentityForm};
use halftype::backend::RecordingBackend;
use halftype::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use halftype::session::{SessionConfig, SessionPhase, TestSession};
use halftype::settings::Settings;

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn prefilled_app(backend: RecordingBackend) -> App<RecordingBackend> {
    App::new(
        TestSession::new(backend, SessionConfig { cadence_secs: 1 }),
        IdentityForm::prefilled(
            Some("Ada".into()),
            Some("Computer Science and Engineering"),
            Some("1805001".into()),
        ),
        None,
    )
}

// Headless integration using the internal runtime + App without a TTY.
// Keys go through Runner/TestEventSource; seconds are fed by explicit instants.
#[test]
fn headless_typing_flow_completes_both_halves() {
    let backend = RecordingBackend::new(Settings::new(30, 1).unwrap()).with_texts(["hi", "yo"]);
    let mut app = prefilled_app(backend);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
        .unwrap();
    for c in "hi".chars() {
        tx.send(key(c)).unwrap();
    }

    let start = Instant::now();
    for _ in 0..20u32 {
        match runner.step() {
            AppEvent::Key(k) => {
                app.on_key(k, start);
            }
            AppEvent::Tick | AppEvent::Resize => break,
        }
    }
    assert_eq!(app.session.phase(), SessionPhase::Break);

    // one second of break
    app.on_tick(start + Duration::from_millis(1_010));
    assert_eq!(app.session.phase(), SessionPhase::SecondHalfActive);
    assert_eq!(app.session.reference_text(), "yo");

    for c in "yo".chars() {
        tx.send(key(c)).unwrap();
    }
    for _ in 0..20u32 {
        if let AppEvent::Key(k) = runner.step() {
            app.on_key(k, start + Duration::from_secs(2));
        } else {
            break;
        }
    }

    assert_eq!(app.session.phase(), SessionPhase::Completed);
    let record = app.session.last_record().unwrap();
    assert_eq!(record.first_half.mistakes, 0);
    assert_eq!(record.second_half.unwrap().mistakes, 0);
    assert_eq!(record.total_characters_typed, 4);
}

#[test]
fn headless_timed_half_runs_out() {
    let backend =
        RecordingBackend::new(Settings::new(2, 5).unwrap()).with_texts(["a long enough text"]);
    let mut app = prefilled_app(backend);
    app.submit_form();

    let start = Instant::now();
    app.on_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE), start);

    let (_tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(10)),
    );

    let mut elapsed = Duration::ZERO;
    for _ in 0..50u32 {
        if let AppEvent::Tick = runner.step() {
            elapsed += Duration::from_millis(100);
            app.on_tick(start + elapsed);
        }
        if app.session.phase() == SessionPhase::Break {
            break;
        }
    }

    assert_eq!(app.session.phase(), SessionPhase::Break);
    assert_eq!(app.session.time_left(), 5);
    assert_eq!(app.session.first_half().unwrap().time_spent, 2);
}

#[test]
fn headless_escape_quits() {
    let mut app = prefilled_app(RecordingBackend::new(Settings::default()));
    let action = app.on_key(
        KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
        Instant::now(),
    );
    assert_eq!(action, AppAction::Quit);
}
