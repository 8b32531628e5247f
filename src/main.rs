use std::io::{self, stdin, Write};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend as TermBackend, CrosstermBackend},
    Terminal,
};
use tracing::info;

use halftype::{
    app::{App, AppAction, IdentityForm},
    backend::{Backend, HttpBackend},
    config::{Config, ConfigStore, FileConfigStore},
    history::HistoryLog,
    identity::{department_index, DEPARTMENTS},
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::{SessionConfig, TestSession},
    settings::Settings,
    TICK_RATE_MS,
};

/// two-half timed typing test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing test split into two halves with a break in between. Reference text and timing come from the results backend, and every finished session is reported back to it."
)]
pub struct Cli {
    /// base url of the results backend
    #[clap(long, env = "HALFTYPE_API_URL")]
    api_url: Option<String>,

    /// seconds between progress samples
    #[clap(long)]
    cadence: Option<u64>,

    /// pre-fill the name field
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// pre-fill the department field
    #[clap(short = 'd', long)]
    department: Option<String>,

    /// pre-fill the registration number field
    #[clap(short = 'r', long)]
    registration_number: Option<String>,

    /// do not append finished sessions to the local history file
    #[clap(long)]
    no_history: bool,

    /// log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// show or change the half and break durations on the backend
    Settings {
        #[clap(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum SettingsAction {
    /// print the current durations
    Show,
    /// store new durations (seconds)
    Set {
        #[clap(long)]
        half_time: u64,
        #[clap(long)]
        break_time: u64,
    },
}

impl Cli {
    /// Stored config with command line overrides applied
    fn resolve(&self, stored: Config) -> Config {
        Config {
            api_url: self.api_url.clone().unwrap_or(stored.api_url),
            sample_cadence_secs: self.cadence.unwrap_or(stored.sample_cadence_secs),
            keep_history: stored.keep_history && !self.no_history,
            ..stored
        }
    }

    fn check_department(&self) -> anyhow::Result<()> {
        match self.department.as_deref() {
            Some(d) if department_index(d).is_none() => bail!(
                "unknown department '{d}', expected one of: {}",
                DEPARTMENTS.iter().join(", ")
            ),
            _ => Ok(()),
        }
    }

    fn identity_form(&self) -> IdentityForm {
        IdentityForm::prefilled(
            self.name.clone(),
            self.department.as_deref(),
            self.registration_number.clone(),
        )
    }
}

fn run_settings<B: Backend, W: Write>(
    backend: &B,
    action: &SettingsAction,
    out: &mut W,
) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = backend
                .fetch_settings()
                .context("could not fetch settings")?;
            writeln!(out, "half time:  {}s", settings.half_time)?;
            writeln!(out, "break time: {}s", settings.break_time)?;
        }
        SettingsAction::Set {
            half_time,
            break_time,
        } => {
            let settings = Settings::new(*half_time, *break_time)?;
            backend
                .save_settings(&settings)
                .context("could not save settings")?;
            info!(half_time, break_time, "settings saved");
            writeln!(
                out,
                "saved: half time {}s, break time {}s",
                settings.half_time, settings.break_time
            )?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    let config = cli.resolve(FileConfigStore::new().load());
    let backend = HttpBackend::with_timeout(
        &config.api_url,
        Duration::from_millis(config.request_timeout_ms),
    )
    .with_context(|| format!("cannot use backend at {}", config.api_url))?;

    if let Some(Command::Settings { action }) = &cli.command {
        return run_settings(&backend, action, &mut io::stdout());
    }

    cli.check_department()?;
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let session = TestSession::new(
        backend,
        SessionConfig {
            cadence_secs: config.sample_cadence_secs,
        },
    );
    let history = config.keep_history.then(HistoryLog::new).flatten();
    let mut app = App::new(session, cli.identity_form(), history);
    info!(api_url = %config.api_url, "starting session");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<T: TermBackend, B: Backend>(
    terminal: &mut Terminal<T>,
    app: &mut App<B>,
) -> anyhow::Result<()> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    loop {
        match runner.step() {
            AppEvent::Tick => app.on_tick(Instant::now()),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if app.on_key(key, Instant::now()) == AppAction::Quit {
                    break;
                }
            }
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
