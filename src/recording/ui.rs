//! Terminal user interface for the ask flow.
//!
//! Renders one screen per session phase: a hint screen while idle, a live
//! volume display while recording, a progress sweep while the upload is in
//! flight, and the transcript with the assistant's answer once the reply
//! lands. Key presses are translated into session events and handed to the
//! reducer, which decides whether the corresponding control is enabled.

use crossterm::{
    event::{self, Event as TermEvent, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    widgets::{Block, Padding, Paragraph, Sparkline, Wrap},
};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

use crate::recording::session;

const BG: Color = Color::Rgb(0, 0, 0);
const FG: Color = Color::Rgb(206, 224, 220);
const ACCENT: Color = Color::Rgb(185, 207, 212);
const DIM: Color = Color::Rgb(100, 100, 100);
const QUESTION_FG: Color = Color::Rgb(180, 180, 180);
const FAILURE_FG: Color = Color::Rgb(255, 120, 120);

/// Width of the progress sweep shown while waiting for the server.
const SWEEP_WIDTH: usize = 24;

/// A key press translated for the ask flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Feed this event to the session reducer.
    Session(session::Event),
    /// Play the answer audio again (answer screen only).
    Replay,
}

/// Terminal UI for the ask workflow.
///
/// Displays real-time volume levels and recording duration while capturing,
/// and the question/answer text once the assistant has replied.
pub struct OvaTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    volume_history: Vec<u64>,
    last_sample_time: Instant,
    sample_interval: Duration,
    last_peak: u8,
    terminal_width: usize,
    sample_rate: u32,
    peak_hold: u8,
    peak_hold_time: Instant,
    peak_volume_threshold: u8,
    reference_level_db: i8,
    recording_start: Instant,
    pause_total: Duration,
    pause_started: Option<Instant>,
    waiting_tick: u64,
}

impl OvaTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new(
        sample_rate: u32,
        peak_volume_threshold: u8,
        reference_level_db: i8,
    ) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let size = terminal.size()?;
        let terminal_width = size.width as usize;

        let now = Instant::now();
        Ok(OvaTui {
            terminal,
            volume_history: vec![0u64; terminal_width],
            last_sample_time: now,
            sample_interval: Duration::from_millis(50),
            last_peak: 0,
            terminal_width,
            sample_rate,
            peak_hold: 0,
            peak_hold_time: now,
            peak_volume_threshold,
            reference_level_db,
            recording_start: now,
            pause_total: Duration::ZERO,
            pause_started: None,
            waiting_tick: 0,
        })
    }

    /// Resets per-session display state when a new capture starts.
    pub fn begin_session(&mut self) {
        self.volume_history = vec![0u64; self.terminal_width];
        let now = Instant::now();
        self.last_sample_time = now;
        self.recording_start = now;
        self.pause_total = Duration::ZERO;
        self.pause_started = None;
        self.last_peak = 0;
        self.peak_hold = 0;
        self.peak_hold_time = now;
        self.waiting_tick = 0;
    }

    /// Updates pause bookkeeping so the duration display excludes paused time.
    pub fn note_pause_toggled(&mut self, paused: bool) {
        if paused {
            self.pause_started = Some(Instant::now());
        } else if let Some(started) = self.pause_started.take() {
            self.pause_total += started.elapsed();
        }
    }

    /// Polls for a key press and translates it for the ask flow.
    ///
    /// Returns `None` when no key was pressed within the poll interval or the
    /// key has no meaning here. The reducer is responsible for ignoring
    /// events whose control is disabled in the current state.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn poll_input(&mut self) -> anyhow::Result<Option<Input>> {
        if event::poll(Duration::from_millis(50))? {
            if let TermEvent::Key(key) = event::read()? {
                let input = match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        Some(Input::Session(session::Event::QuitRequested))
                    }
                    KeyCode::Char('r') => Some(Input::Session(session::Event::RecordPressed)),
                    KeyCode::Enter => Some(Input::Session(session::Event::StopPressed)),
                    KeyCode::Char(' ') => Some(Input::Session(session::Event::PausePressed)),
                    KeyCode::Esc => Some(Input::Session(session::Event::CancelPressed)),
                    KeyCode::Char('q') => Some(Input::Session(session::Event::QuitRequested)),
                    KeyCode::Char('p') => Some(Input::Replay),
                    _ => None,
                };
                if let Some(ref input) = input {
                    tracing::debug!("Key {:?} mapped to {:?}", key.code, input);
                }
                return Ok(input);
            }
        }
        Ok(None)
    }

    /// Renders the idle screen shown before the first recording.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render_idle(&mut self) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

            let [header, body, footer] = layout_regions(area);

            frame.render_widget(logo_paragraph(), header);

            let hint = Paragraph::new("Press r to ask a question.")
                .style(Style::default().fg(FG).bg(BG))
                .alignment(Alignment::Center);
            frame.render_widget(hint, centered_line(body));

            frame.render_widget(footer_paragraph("r record, esc/q exit"), footer);
        })?;
        Ok(())
    }

    /// Renders the live volume display while capturing.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render_recording(&mut self, samples: &[i16], paused: bool) -> anyhow::Result<()> {
        let current_volume = self.calculate_volume(samples);

        // Only advance the waveform while actually capturing
        if !paused && self.last_sample_time.elapsed() >= self.sample_interval {
            self.volume_history.push(current_volume as u64);

            if self.volume_history.len() > self.terminal_width {
                self.volume_history.remove(0);
            }

            self.last_sample_time = Instant::now();
        }

        let size = self.terminal.size()?;
        let current_width = size.width as usize;

        if current_width != self.terminal_width {
            self.terminal_width = current_width;
            while self.volume_history.len() > self.terminal_width {
                self.volume_history.remove(0);
            }
            while self.volume_history.len() < self.terminal_width {
                self.volume_history.insert(0, 0);
            }
        }

        // Pull these out before the draw closure to avoid borrow issues
        let peak_hold = self.peak_hold;
        let last_peak = self.last_peak;
        let peak_volume_threshold = self.peak_volume_threshold;
        let recording_duration = self.recording_duration();

        self.terminal.draw(|frame| {
            let area = frame.area();

            let footer_height = 1;

            let content_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(footer_height),
            };

            let top_area_height = content_area.height / 3 * 2;

            let top_area = Rect {
                x: content_area.x,
                y: content_area.y,
                width: content_area.width,
                height: top_area_height,
            };

            let top_sparkline = Sparkline::default()
                .data(&self.volume_history)
                .max(80)
                .style(Style::default().bg(BG).fg(FG));

            frame.render_widget(top_sparkline, top_area);

            let bottom_area = Rect {
                x: content_area.x,
                y: content_area.y + top_area_height,
                width: content_area.width,
                height: content_area.height.saturating_sub(top_area_height),
            };

            let inverted_data: Vec<u64> = self
                .volume_history
                .iter()
                .map(|&v| 100_u64.saturating_sub(v))
                .collect();

            let bottom_sparkline = Sparkline::default()
                .data(&inverted_data)
                .max(80)
                .style(Style::default().bg(ACCENT).fg(BG));

            frame.render_widget(bottom_sparkline, bottom_area);

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(footer_height),
                width: area.width,
                height: footer_height,
            };

            // When paused, show zeros for meters
            let (display_peak, display_volume) = if paused {
                (0u8, 0u8)
            } else {
                (peak_hold, last_peak)
            };

            let peak_style = if display_peak >= peak_volume_threshold {
                Style::default().bg(Color::Red).fg(Color::Rgb(255, 255, 255))
            } else {
                Style::default()
            };

            let duration_secs = recording_duration.as_secs();
            let minutes = duration_secs / 60;
            let secs = duration_secs % 60;

            let indicator = if paused {
                Span::styled("⏸ ", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("● ", Style::default().fg(Color::Red))
            };

            let status_line = Line::from(vec![
                indicator,
                Span::raw(format!("{minutes}:{secs:02}")),
                Span::raw(" / "),
                Span::raw(format!("{display_volume}%")),
                Span::raw(" / "),
                Span::styled(format!("{display_peak}%"), peak_style),
                Span::styled(
                    "   enter send, space pause, esc cancel",
                    Style::default().fg(DIM),
                ),
            ]);

            let footer =
                Paragraph::new(status_line).style(Style::default().fg(ACCENT).bg(BG));

            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Renders one frame of the upload progress sweep.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render_waiting(&mut self) -> anyhow::Result<()> {
        self.waiting_tick = self.waiting_tick.wrapping_add(1);
        let sweep = sweep_line(SWEEP_WIDTH, self.waiting_tick);

        self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

            let [header, body, footer] = layout_regions(area);

            frame.render_widget(logo_paragraph(), header);

            let lines = vec![
                Line::styled("Waiting for the assistant", Style::default().fg(FG)),
                Line::raw(""),
                Line::styled(sweep, Style::default().fg(ACCENT)),
            ];
            let progress = Paragraph::new(lines)
                .style(Style::default().bg(BG))
                .alignment(Alignment::Center);
            frame.render_widget(progress, centered_lines(body, 3));

            frame.render_widget(footer_paragraph("r ask again, q exit"), footer);
        })?;
        Ok(())
    }

    /// Renders the transcript and the assistant's answer.
    ///
    /// `answer_secs` is the duration of the synthesized speech, shown next to
    /// the answer when the reply carried playable audio.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render_answer(
        &mut self,
        transcript: &str,
        answer: &str,
        answer_secs: Option<f32>,
    ) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

            let [header, body, footer] = layout_regions(area);

            frame.render_widget(logo_paragraph(), header);

            let mut lines = vec![
                Line::from(vec![
                    Span::styled("Q ", Style::default().fg(DIM)),
                    Span::styled(transcript.to_string(), Style::default().fg(QUESTION_FG)),
                ]),
                Line::raw(""),
                Line::from(vec![
                    Span::styled("A ", Style::default().fg(DIM)),
                    Span::styled(answer.to_string(), Style::default().fg(FG)),
                ]),
            ];
            if let Some(secs) = answer_secs {
                lines.push(Line::raw(""));
                lines.push(Line::styled(
                    format!("♪ {secs:.1}s"),
                    Style::default().fg(DIM),
                ));
            }

            let text = Paragraph::new(lines)
                .style(Style::default().bg(BG))
                .wrap(Wrap { trim: false });
            frame.render_widget(text, body);

            frame.render_widget(
                footer_paragraph("r ask again, p replay, esc/q exit"),
                footer,
            );
        })?;
        Ok(())
    }

    /// Renders the failure screen shown when an upload or the server fails.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render_failure(&mut self, message: &str) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

            let [header, body, footer] = layout_regions(area);

            frame.render_widget(logo_paragraph(), header);

            let text = Paragraph::new(message.to_string())
                .style(Style::default().fg(FAILURE_FG).bg(BG))
                .wrap(Wrap { trim: false });
            frame.render_widget(text, body);

            frame.render_widget(footer_paragraph("r try again, esc/q exit"), footer);
        })?;
        Ok(())
    }

    /// Calculates current volume in percentage and updates peak hold tracking.
    ///
    /// Converts RMS (Root Mean Square) audio samples to dBFS and normalizes
    /// to a 0-100% scale based on the configured reference level. Also tracks
    /// the maximum volume seen in the last 3 seconds for the peak indicator.
    fn calculate_volume(&mut self, samples: &[i16]) -> u8 {
        if samples.is_empty() {
            return 0;
        }

        let normalized = rms_volume_percent(samples, self.sample_rate, self.reference_level_db);

        self.last_peak = normalized;

        if normalized > self.peak_hold || self.peak_hold_time.elapsed().as_secs() >= 3 {
            self.peak_hold = normalized;
            self.peak_hold_time = Instant::now();
        }

        normalized
    }

    /// Elapsed recording time, excluding paused duration.
    fn recording_duration(&self) -> Duration {
        let total_elapsed = self.recording_start.elapsed();
        let mut pause_time = self.pause_total;

        if let Some(started) = self.pause_started {
            pause_time += started.elapsed();
        }

        total_elapsed.saturating_sub(pause_time)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Splits the frame into logo header, body, and a one-line footer.
fn layout_regions(area: Rect) -> [Rect; 3] {
    let outer = Block::default()
        .padding(Padding::new(2, 2, 1, 0))
        .inner(area);
    Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(outer)
}

/// One-line region vertically centered inside `area`.
fn centered_line(area: Rect) -> Rect {
    centered_lines(area, 1)
}

/// Region of `height` lines vertically centered inside `area`.
fn centered_lines(area: Rect, height: u16) -> Rect {
    let top = area.height.saturating_sub(height) / 2;
    Rect {
        x: area.x,
        y: area.y + top,
        width: area.width,
        height: height.min(area.height),
    }
}

fn logo_paragraph() -> Paragraph<'static> {
    Paragraph::new(crate::ui::LOGO).style(Style::default().fg(FG).bg(BG))
}

fn footer_paragraph(hints: &str) -> Paragraph<'_> {
    Paragraph::new(hints).style(Style::default().fg(DIM).bg(BG))
}

/// RMS of the most recent ~50ms of samples, normalized to a 0-100 scale
/// against the reference level. The window is never empty: at least one
/// sample is measured even at sample rates below 20Hz.
fn rms_volume_percent(samples: &[i16], sample_rate: u32, reference_level_db: i8) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let window = std::cmp::min(sample_rate / 20, samples.len() as u32).max(1) as usize;
    let recent_samples = &samples[samples.len() - window..];

    let sum_of_squares: i64 = recent_samples.iter().map(|&x| (x as i64).pow(2)).sum();
    let mean_square = sum_of_squares / recent_samples.len() as i64;
    let rms = (mean_square as f32).sqrt();

    let db_fs = if rms > 0.0 {
        20.0 * (rms / 32767.0).log10()
    } else {
        -160.0
    };

    let min_db = reference_level_db as f32 - 40.0;
    ((db_fs - min_db) / 40.0 * 100.0).clamp(4.0, 100.0) as u8
}

/// A dot track with one bright marker sweeping back and forth.
fn sweep_line(width: usize, tick: u64) -> String {
    if width < 2 {
        return "●".to_string();
    }
    let span = (width - 1) as u64;
    let phase = tick % (span * 2);
    let pos = if phase < span { phase } else { span * 2 - phase } as usize;

    let mut line = String::with_capacity(width * 3);
    for i in 0..width {
        line.push(if i == pos { '●' } else { '·' });
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_marker_bounces_between_ends() {
        let width = 5;
        let positions: Vec<usize> = (0..10)
            .map(|tick| sweep_line(width, tick).chars().position(|c| c == '●'))
            .map(|p| p.unwrap())
            .collect();

        assert_eq!(positions[0], 0);
        assert_eq!(positions[4], 4);
        // After reaching the right edge the marker turns around
        assert_eq!(positions[5], 3);
        assert_eq!(positions[8], 0);
        // And starts climbing again
        assert_eq!(positions[9], 1);
    }

    #[test]
    fn sweep_line_has_requested_width() {
        for width in [2usize, 8, 24] {
            assert_eq!(sweep_line(width, 7).chars().count(), width);
        }
    }

    #[test]
    fn narrow_sweep_degrades_to_single_marker() {
        assert_eq!(sweep_line(1, 42), "●");
        assert_eq!(sweep_line(0, 42), "●");
    }

    #[test]
    fn full_scale_signal_meters_at_maximum() {
        let samples = vec![i16::MAX; 1600];
        assert_eq!(rms_volume_percent(&samples, 16000, -20), 100);
    }

    #[test]
    fn silence_meters_at_the_floor() {
        let samples = vec![0i16; 1600];
        assert_eq!(rms_volume_percent(&samples, 16000, -20), 4);
    }

    #[test]
    fn tiny_sample_rates_still_meter_one_sample() {
        // sample_rate / 20 rounds to zero below 20Hz; the window must
        // still cover at least one sample instead of dividing by zero
        for rate in [0u32, 1, 19] {
            let level = rms_volume_percent(&[i16::MAX, 0, i16::MAX], rate, -20);
            assert!(level >= 4);
        }
    }

    #[test]
    fn window_never_exceeds_the_buffer() {
        // Fewer samples than the 50ms window: the whole buffer is measured
        let level = rms_volume_percent(&[1000, -1000], 48000, -20);
        assert!((4..=100).contains(&level));
    }
}
