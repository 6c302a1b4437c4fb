use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use desk_logging::{desk_info, parse_level};
use docdesk_core::{update, AppState, AppViewModel, Msg};
use docdesk_engine::{EngineHandle, LocalStore};

use super::config::{AppConfig, CONFIG_FILENAME};
use super::effects::EffectRunner;
use super::input::{self, Command};
use super::logging;
use super::persistence::SessionPersistence;
use super::render;

/// Everything the main loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Msg(Msg),
    Command(Command),
    /// Informational line printed as-is.
    Notice(String),
    InputClosed,
}

pub fn run_app() -> anyhow::Result<()> {
    let config = AppConfig::load(Path::new(CONFIG_FILENAME))?
        .with_env(|name| std::env::var(name).ok());
    logging::initialize(config.log_destination, parse_level(&config.log_level));
    desk_info!(
        "Starting docdesk against {} (data in {:?})",
        config.api_base_url,
        config.data_dir
    );

    let store = LocalStore::new(&config.data_dir);
    let engine = EngineHandle::new(config.api_settings()?, store.clone())
        .context("starting engine")?;
    let (event_tx, event_rx) = mpsc::channel();
    let runner = EffectRunner::new(engine, SessionPersistence::new(store), event_tx.clone());

    spawn_ticker(event_tx.clone(), config.tick_interval());
    spawn_stdin_reader(event_tx.clone());
    runner.restore_user();
    let _ = event_tx.send(AppEvent::Msg(Msg::Started));

    println!("docdesk: type `help` for commands");
    let state = AppState::with_selection_limits(config.min_selection, config.max_selection);
    let mut shell = Shell::new(state, runner);
    while let Ok(event) = event_rx.recv() {
        if !shell.handle(event) {
            break;
        }
    }
    shell.dispatch(Msg::AnalysisClosed);
    desk_info!("docdesk stopped");
    Ok(())
}

struct Shell {
    state: AppState,
    runner: EffectRunner,
    last_screen: String,
    last_status: Option<String>,
}

impl Shell {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state,
            runner,
            last_screen: String::new(),
            last_status: None,
        }
    }

    /// Returns false once the shell should exit.
    fn handle(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Msg(msg) => self.dispatch(msg),
            AppEvent::Command(Command::Dispatch(msgs)) => {
                for msg in msgs {
                    self.dispatch(msg);
                }
            }
            AppEvent::Command(Command::Login { email, password }) => {
                self.runner.login(email, password)
            }
            AppEvent::Command(Command::Logout) => self.runner.logout(),
            AppEvent::Command(Command::Help) => println!("{}", input::HELP),
            AppEvent::Command(Command::Quit) | AppEvent::InputClosed => return false,
            AppEvent::Notice(text) => println!("{text}"),
        }
        true
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        for toast in self.runner.run(effects) {
            println!("{}", render::render_toast(&toast));
        }
        if state.consume_dirty() {
            self.present(&state.view());
        }
        self.state = state;
    }

    fn present(&mut self, view: &AppViewModel) {
        let screen = render::render_screen(view);
        if screen != self.last_screen {
            println!("{screen}");
            self.last_screen = screen;
        }
        let status = render::render_status(view);
        if status != self.last_status {
            if let Some(line) = &status {
                println!("{line}");
            }
            self.last_status = status;
        }
    }
}

/// Feeds wall-clock time into the state machine to drive progress ramps.
fn spawn_ticker(events: mpsc::Sender<AppEvent>, interval: Duration) {
    thread::spawn(move || {
        let mut last = Instant::now();
        loop {
            thread::sleep(interval);
            let now = Instant::now();
            let elapsed = now.duration_since(last).as_millis();
            let elapsed_ms = u64::try_from(elapsed).unwrap_or(u64::MAX);
            last = now;
            if events.send(AppEvent::Msg(Msg::Tick { elapsed_ms })).is_err() {
                break;
            }
        }
    });
}

fn spawn_stdin_reader(events: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let event = match input::parse_command(&line, Utc::now()) {
                Ok(command) => AppEvent::Command(command),
                Err(reason) => AppEvent::Notice(reason),
            };
            if events.send(event).is_err() {
                return;
            }
        }
        let _ = events.send(AppEvent::InputClosed);
    });
}
