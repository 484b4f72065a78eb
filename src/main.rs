mod anthropic;
mod app;
mod client;
mod config;
mod exchange;
mod form;
mod logging;
mod prompt;
mod ui;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{DefaultTerminal, Terminal};
use tracing::{debug, info, warn};

use crate::anthropic::AnthropicClient;
use crate::app::App;
use crate::config::{Config, LoadedConfig};
use crate::exchange::{DetailLevel, GenerationError, GenerationResult, PromptExchange, Tone};
use crate::form::{FormAction, handle_form_input};

/// Turn a rough goal into three optimized, reusable AI prompts.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Generate once for this goal and print the result instead of opening the UI
    #[arg(long)]
    goal: Option<String>,

    /// Tone of the generated prompts (defaults to the configured tone)
    #[arg(long, value_enum)]
    tone: Option<Tone>,

    /// Detail level of the generated prompts (defaults to the configured level)
    #[arg(long, value_enum)]
    detail: Option<DetailLevel>,

    /// Print the result as JSON
    #[arg(long, requires = "goal")]
    json: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let start_time = Instant::now();

    // Initialize logging before anything else
    let (session_id, log_directory, logging_error, reload_handle, _guard) = match logging::init()
    {
        Ok(ctx) => (
            Some(ctx.session_id),
            Some(ctx.log_directory),
            None,
            Some(ctx.reload_handle),
            Some(ctx._guard),
        ),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            (None, None, Some(e.message), None, None)
        }
    };

    let loaded_config = config::load_config();
    debug!(
        config_path = %loaded_config.config_path.display(),
        status = ?loaded_config.status,
        "config_loaded"
    );

    if let Some(handle) = &reload_handle
        && let Err(e) = logging::set_level(handle, &loaded_config.config.logging.level)
    {
        warn!(error = %e, "log_level_rejected");
    }
    if let Some(dir) = &log_directory {
        logging::cleanup_old_logs(dir);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let exchange = build_exchange(&loaded_config.config)?;

    let result = match cli.goal {
        Some(goal) => {
            let tone = cli.tone.unwrap_or(loaded_config.config.defaults.tone);
            let detail = cli.detail.unwrap_or(loaded_config.config.defaults.detail);
            run_headless(&runtime, &exchange, &goal, tone, detail, cli.json)
        }
        None => run_tui(
            session_id.clone(),
            log_directory,
            logging_error,
            loaded_config,
            exchange,
            runtime.handle().clone(),
        )
        .map(|()| ExitCode::SUCCESS),
    };

    // Log session end
    if let Some(sid) = session_id {
        let duration = start_time.elapsed();
        info!(
            session_id = %sid,
            duration_secs = duration.as_secs_f64(),
            "session_end"
        );
    }

    result
}

fn build_exchange(config: &Config) -> Result<PromptExchange> {
    let client = AnthropicClient::new(
        config.api.base_url.clone(),
        config.api_key(),
        config.timeout(),
    )
    .context("failed to create API client")?;
    Ok(PromptExchange::new(
        Arc::new(client),
        config.exchange_settings(),
    ))
}

fn run_headless(
    runtime: &tokio::runtime::Runtime,
    exchange: &PromptExchange,
    goal: &str,
    tone: Tone,
    detail: DetailLevel,
    json: bool,
) -> Result<ExitCode> {
    let outcome = runtime.block_on(exchange.generate(goal, tone, detail));
    let succeeded = report_outcome(
        outcome,
        json,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Writes candidates (or JSON) to `out`, or the user-facing error to `err`.
/// Returns whether generation succeeded.
fn report_outcome(
    outcome: Result<GenerationResult, GenerationError>,
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<bool> {
    match outcome {
        Ok(result) => {
            if json {
                serde_json::to_writer_pretty(&mut *out, &result)?;
                writeln!(out)?;
            } else {
                write_candidates(out, &result)?;
            }
            Ok(true)
        }
        Err(e) => {
            warn!(error = %e, "headless_generation_failed");
            writeln!(err, "{}", e.user_message())?;
            Ok(false)
        }
    }
}

fn write_candidates(out: &mut impl Write, result: &GenerationResult) -> io::Result<()> {
    for (i, prompt) in result.prompts().iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "Prompt {}: {}", i + 1, prompt.title)?;
        writeln!(out, "{}", prompt.content)?;
    }
    Ok(())
}

fn run_tui(
    session_id: Option<String>,
    log_directory: Option<PathBuf>,
    logging_error: Option<String>,
    loaded_config: LoadedConfig,
    exchange: PromptExchange,
    runtime: tokio::runtime::Handle,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let terminal = Terminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

    let app = App::new(
        session_id,
        log_directory,
        logging_error,
        loaded_config,
        exchange,
        runtime,
    );
    let result = run_app(terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;

    result
}

fn run_app(mut terminal: DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        // Pick up a finished generation, if any
        app.poll_generation();

        terminal.draw(|f| ui::draw_ui(f, &mut app))?;

        // Short timeout so the spinner keeps moving while a call is in flight
        if !crossterm::event::poll(Duration::from_millis(50))? {
            continue;
        }
        let event = crossterm::event::read()?;

        // Handle popup dismissal first
        if app.show_already_running_popup {
            if let Event::Key(key) = event
                && (key.code == KeyCode::Enter || key.code == KeyCode::Esc)
            {
                app.show_already_running_popup = false;
            }
            continue;
        }

        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
                    return Ok(());
                }

                match handle_form_input(&mut app.form, key.code, key.modifiers) {
                    FormAction::Submit => app.start_generation(),
                    FormAction::None => {}
                    FormAction::Unhandled => match key.code {
                        KeyCode::Char('q') if !ctrl => return Ok(()),
                        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
                        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
                        KeyCode::Char('u') if ctrl => {
                            app.scroll_up(app.main_pane_height / 2);
                        }
                        KeyCode::Char('d') if ctrl => {
                            app.scroll_down(app.main_pane_height / 2);
                        }
                        KeyCode::PageUp => app.scroll_up(app.main_pane_height),
                        KeyCode::PageDown => app.scroll_down(app.main_pane_height),
                        _ => {}
                    },
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.scroll_up(3),
                MouseEventKind::ScrollDown => app.scroll_down(3),
                _ => {}
            },
            Event::Resize(_, _) => {
                // Terminal resized, will be handled in next draw
            }
            _ => {}
        }
    }
}
