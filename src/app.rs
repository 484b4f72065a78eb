//! Application state and core logic.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use ratatui::style::Color;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use tracing::{debug, info, warn};

use crate::client::ServiceError;
use crate::config::{ConfigLoadStatus, LoadedConfig};
use crate::exchange::{
    ExchangeState, GenerationError, GenerationRequest, GenerationResult, PromptExchange,
};
use crate::form::GoalForm;
use crate::ui;

/// What a finished generation task sends back to the UI loop.
pub type GenerationOutcome = Result<GenerationResult, GenerationError>;

impl ExchangeState {
    pub fn border_type(&self) -> BorderType {
        match self {
            ExchangeState::Idle | ExchangeState::Succeeded => BorderType::Rounded,
            ExchangeState::InFlight | ExchangeState::Failed => BorderType::Double,
        }
    }

    /// Returns the color for this state, pulsing while a call is in flight.
    pub fn pulsing_color(&self, frame_count: u64) -> Color {
        match self {
            ExchangeState::Idle => Color::Cyan,
            ExchangeState::InFlight => {
                if (frame_count / 10).is_multiple_of(2) {
                    Color::Yellow
                } else {
                    Color::Rgb(128, 128, 0)
                }
            }
            ExchangeState::Succeeded => Color::Green,
            ExchangeState::Failed => Color::Red,
        }
    }
}

/// Main application state.
pub struct App {
    pub state: ExchangeState,
    pub form: GoalForm,
    /// Rendered content of the results pane.
    pub output_lines: Vec<Line<'static>>,
    pub scroll_offset: u16,
    pub show_already_running_popup: bool,
    pub main_pane_height: u16,
    pub main_pane_width: u16,
    /// Session ID for this invocation.
    pub session_id: Option<String>,
    /// Directory where logs are written.
    pub log_directory: Option<PathBuf>,
    /// Error that occurred during logging initialization.
    pub logging_error: Option<String>,
    pub config_path: PathBuf,
    pub config_load_status: ConfigLoadStatus,
    /// Model identifier shown in the results pane title.
    pub model: String,
    /// Incremented each time a generation is started.
    pub generation_count: u64,
    /// When the current (or last) generation started.
    pub run_start_time: Option<Instant>,
    /// How long the last finished generation took.
    pub last_run_duration: Option<Duration>,
    /// Frame counter for animations (incremented each render cycle).
    pub frame_count: u64,
    exchange: PromptExchange,
    runtime: tokio::runtime::Handle,
    result_receiver: Option<Receiver<GenerationOutcome>>,
}

impl App {
    pub fn new(
        session_id: Option<String>,
        log_directory: Option<PathBuf>,
        logging_error: Option<String>,
        loaded_config: LoadedConfig,
        exchange: PromptExchange,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let config = loaded_config.config;
        Self {
            state: ExchangeState::Idle,
            form: GoalForm::new(config.defaults.tone, config.defaults.detail),
            output_lines: ui::welcome_lines(),
            scroll_offset: 0,
            show_already_running_popup: false,
            main_pane_height: 0,
            main_pane_width: 0,
            session_id,
            log_directory,
            logging_error,
            config_path: loaded_config.config_path,
            config_load_status: loaded_config.status,
            model: config.api.model,
            generation_count: 0,
            run_start_time: None,
            last_run_duration: None,
            frame_count: 0,
            exchange,
            runtime,
            result_receiver: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.state == ExchangeState::InFlight
    }

    pub fn visual_line_count(&self) -> u16 {
        if self.main_pane_width == 0 {
            return 0;
        }
        let paragraph = Paragraph::new(self.output_lines.clone())
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        paragraph.line_count(self.main_pane_width) as u16
    }

    pub fn max_scroll(&self) -> u16 {
        self.visual_line_count()
            .saturating_sub(self.main_pane_height)
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        let max = self.max_scroll();
        self.scroll_offset = (self.scroll_offset.saturating_add(amount)).min(max);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    /// Validate the form and, if the goal is usable, spawn one exchange.
    ///
    /// Blank goals are reported without touching the network. A second
    /// request while one is in flight raises the "already running" notice.
    pub fn start_generation(&mut self) {
        if self.is_in_flight() {
            self.show_already_running_popup = true;
            return;
        }

        let request = match GenerationRequest::new(
            self.form.goal.clone(),
            self.form.tone,
            self.form.detail,
        ) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "generation_rejected");
                self.fail(&e);
                return;
            }
        };

        self.generation_count += 1;
        info!(generation = self.generation_count, "generation_requested");

        let (tx, rx) = mpsc::channel();
        let exchange = self.exchange.clone();
        self.runtime.spawn(async move {
            let outcome = exchange.execute(&request).await;
            // Receiver is gone if the UI quit mid-call
            let _ = tx.send(outcome);
        });

        self.result_receiver = Some(rx);
        self.state = ExchangeState::InFlight;
        self.run_start_time = Some(Instant::now());
        self.last_run_duration = None;
        self.output_lines = ui::in_flight_lines();
        self.scroll_to_top();
    }

    /// Collect the outcome of the in-flight exchange, if it has finished.
    pub fn poll_generation(&mut self) {
        let Some(rx) = &self.result_receiver else {
            return;
        };

        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                warn!("generation_task_vanished");
                Err(GenerationError::ServiceCall(ServiceError::Network(
                    "generation task ended without a result".to_string(),
                )))
            }
        };

        self.result_receiver = None;
        self.last_run_duration = self.run_start_time.map(|t| t.elapsed());
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: GenerationOutcome) {
        match outcome {
            Ok(result) => {
                info!(
                    generation = self.generation_count,
                    elapsed_ms = self.last_run_duration.map(|d| d.as_millis() as u64),
                    "generation_displayed"
                );
                self.state = ExchangeState::Succeeded;
                self.output_lines = ui::result_lines(&result);
            }
            Err(e) => self.fail(&e),
        }
        self.scroll_to_top();
    }

    fn fail(&mut self, error: &GenerationError) {
        self.state = ExchangeState::Failed;
        self.output_lines = ui::error_lines(&error.user_message());
    }
}
