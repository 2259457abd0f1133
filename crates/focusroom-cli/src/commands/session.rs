use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use focusroom_core::session::{ManualClock, ManualTicker, Ticker};
use focusroom_core::{
    Collaborators, Config, Event, SessionConfig, SessionDriver, SessionMode, SessionState,
    SessionStateMachine,
};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use crate::console::{ConsoleBlocker, ConsoleRecorder};

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Pomodoro,
    DeepWork,
    Flow,
    Custom,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Pomodoro => SessionMode::Pomodoro,
            ModeArg::DeepWork => SessionMode::DeepWork,
            ModeArg::Flow => SessionMode::Flow,
            ModeArg::Custom => SessionMode::Custom,
        }
    }
}

#[derive(Args)]
pub struct SessionOptions {
    /// Session mode
    #[arg(long, value_enum, default_value = "pomodoro")]
    mode: ModeArg,
    /// Focus length in minutes (defaults to the configured value)
    #[arg(long)]
    focus_min: Option<u64>,
    /// Break length in minutes, 0 for none
    #[arg(long)]
    break_min: Option<u64>,
    /// Linked task ID to ask about after the session
    #[arg(long)]
    task: Option<String>,
    /// Title shown while apps are blocked
    #[arg(long)]
    title: Option<String>,
    /// Do not block apps
    #[arg(long)]
    no_blocking: bool,
    /// Require confirmation to cancel
    #[arg(long)]
    deep_focus: bool,
    /// Take offered breaks and keep cycling
    #[arg(long)]
    take_breaks: bool,
}

impl SessionOptions {
    fn session_config(
        &self,
        config: &Config,
    ) -> Result<SessionConfig, Box<dyn std::error::Error>> {
        let mode = SessionMode::from(self.mode);
        let mut session = config.session_config(mode)?;
        if let Some(minutes) = self.focus_min {
            if !mode.counts_up() {
                session.focus_duration_seconds = minutes_to_seconds("--focus-min", minutes)?;
            }
        }
        if let Some(minutes) = self.break_min {
            session = session.with_break(minutes_to_seconds("--break-min", minutes)?);
        }
        if let Some(task) = &self.task {
            session = session.with_linked_task(task.clone());
        }
        if let Some(title) = &self.title {
            session = session.with_title(title.clone());
        }
        if self.no_blocking {
            session = session.with_app_blocking(false);
        }
        if self.deep_focus {
            session = session.with_deep_focus(true);
        }
        session.validate()?;
        Ok(session)
    }
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in real time; Ctrl-C cancels
    Run {
        #[command(flatten)]
        options: SessionOptions,
    },
    /// Run a session against a simulated clock and print every event
    Simulate {
        #[command(flatten)]
        options: SessionOptions,
        /// Simulated seconds to run (defaults to one focus plus one break)
        #[arg(long)]
        ticks: Option<u64>,
        /// Pause at this second
        #[arg(long)]
        pause_at: Option<u64>,
        /// Seconds to stay paused
        #[arg(long, default_value = "0")]
        pause_for: u64,
        /// Adjust time at this second
        #[arg(long)]
        adjust_at: Option<u64>,
        /// Seconds to add (negative to remove)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        adjust_by: i64,
        /// Cancel at this second
        #[arg(long)]
        cancel_at: Option<u64>,
        /// Finish early at this second
        #[arg(long)]
        finish_at: Option<u64>,
        /// Also print tick events
        #[arg(long)]
        show_ticks: bool,
    },
}

fn minutes_to_seconds(flag: &str, minutes: u64) -> Result<u64, Box<dyn std::error::Error>> {
    minutes
        .checked_mul(60)
        .ok_or_else(|| format!("{flag} {minutes} is out of range").into())
}

/// Scripted commands for a simulation, keyed by simulated second.
struct Script {
    ticks: u64,
    pause_at: Option<u64>,
    resume_at: Option<u64>,
    adjust_at: Option<u64>,
    adjust_by: i64,
    cancel_at: Option<u64>,
    finish_at: Option<u64>,
    take_breaks: bool,
    show_ticks: bool,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    match action {
        SessionAction::Run { options } => {
            let session = options.session_config(&config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_live(session, options.take_breaks))
        }
        SessionAction::Simulate {
            options,
            ticks,
            pause_at,
            pause_for,
            adjust_at,
            adjust_by,
            cancel_at,
            finish_at,
            show_ticks,
        } => {
            let session = options.session_config(&config)?;
            let default_ticks = if session.mode.counts_up() {
                3600
            } else {
                session
                    .focus_duration_seconds
                    .saturating_add(session.break_duration_seconds)
            };
            let resume_at = pause_at
                .map(|at| {
                    at.checked_add(pause_for)
                        .ok_or_else(|| format!("--pause-at {at} --pause-for {pause_for} is out of range"))
                })
                .transpose()?;
            let script = Script {
                ticks: ticks.unwrap_or(default_ticks),
                pause_at,
                resume_at,
                adjust_at,
                adjust_by,
                cancel_at,
                finish_at,
                take_breaks: options.take_breaks,
                show_ticks,
            };
            simulate(session, &script)
        }
    }
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

fn flush(
    rx: &mut broadcast::Receiver<Event>,
    show_ticks: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match rx.try_recv() {
            Ok(Event::Ticked { .. }) if !show_ticks => {}
            Ok(event) => print_event(&event)?,
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
            Err(_) => return Ok(()),
        }
    }
}

fn simulate(session: SessionConfig, script: &Script) -> Result<(), Box<dyn std::error::Error>> {
    let clock = ManualClock::default();
    let ticker = ManualTicker::new();
    let collaborators = Collaborators::new(Arc::new(ConsoleBlocker), Arc::new(ConsoleRecorder))
        .with_ticker(ticker.clone())
        .with_wall_clock(clock.clone());
    let mut machine = SessionStateMachine::new(session, collaborators)?;
    let mut rx = machine.subscribe();

    machine.start();
    flush(&mut rx, script.show_ticks)?;

    for second in 1..=script.ticks {
        clock.advance_secs(1);

        if script.pause_at == Some(second) {
            machine.pause();
        }
        if script.resume_at == Some(second) {
            machine.resume();
        }
        if script.adjust_at == Some(second) {
            machine.adjust_time(script.adjust_by);
        }
        if script.cancel_at == Some(second) {
            machine.end(false);
        }
        if script.finish_at == Some(second) {
            machine.end(true);
        }
        if ticker.is_running() {
            machine.tick();
        }

        if machine.state() == SessionState::Completed && script.take_breaks {
            machine.start_break();
        }
        flush(&mut rx, script.show_ticks)?;

        let done = match machine.state() {
            SessionState::Idle | SessionState::Canceled => true,
            SessionState::Completed => !script.take_breaks,
            SessionState::Running | SessionState::Paused => false,
        };
        if done {
            break;
        }
    }

    if let Some(task_id) = machine.pending_task_prompt() {
        eprintln!("was task {task_id} completed?");
    }
    println!("{}", serde_json::to_string_pretty(&machine.snapshot())?);
    Ok(())
}

async fn run_live(
    session: SessionConfig,
    take_breaks: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = SessionDriver::spawn(
        session,
        Arc::new(ConsoleBlocker),
        Arc::new(ConsoleRecorder),
    )?;
    let mut rx = driver.subscribe();
    driver.start();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(event) => {
                    print_event(&event)?;
                    match event {
                        Event::BreakOffered { .. } if take_breaks => {
                            driver.start_break();
                        }
                        Event::BreakOffered { .. } => {
                            driver.reset();
                        }
                        Event::TaskCompletionPrompt { task_id, .. } => {
                            eprintln!("was task {task_id} completed?");
                        }
                        Event::BlockingStatusChanged { status, .. } => {
                            if let Some(notice) = status.notice() {
                                eprintln!("{notice}");
                            }
                        }
                        Event::SessionCanceled { .. } | Event::SessionReset { .. } => break,
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if driver.lock().requires_cancel_confirmation() {
                    eprintln!("deep focus session canceled");
                }
                driver.end(false);
            }
        }
    }

    driver.settle().await;
    println!("{}", serde_json::to_string_pretty(&driver.snapshot())?);
    Ok(())
}
