use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::Frame;

use crate::error::Result;
use crate::settings::Settings;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const BOLD: Style = Style::new().add_modifier(Modifier::BOLD);

const FALLBACK_ACCENT: Color = Color::Rgb(0xDD, 0x13, 0x3D);

/// Parse "#RRGGBB" into a terminal colour.
pub fn hex_color(raw: &str) -> Option<Color> {
    let hex = raw.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Chart colours taken from the settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub accent: Color,
    pub slices: Vec<Color>,
}

impl Palette {
    pub fn from_settings(settings: &Settings) -> Self {
        let accent = hex_color(&settings.accent_color).unwrap_or(FALLBACK_ACCENT);
        let mut slices: Vec<Color> = settings.pie_colors.iter().filter_map(|c| hex_color(c)).collect();
        if slices.is_empty() {
            slices.push(accent);
        }
        Self { accent, slices }
    }

    /// Colour of the `i`th pie slice; the scheme repeats when exhausted.
    pub fn slice(&self, i: usize) -> Color {
        self.slices[i % self.slices.len()]
    }
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

/// Points of a pie chart on a unit disc, grouped by slice. Slices start at 12
/// o'clock and run clockwise; `step` is the grid spacing.
pub fn pie_points(values: &[u64], step: f64) -> Vec<Vec<(f64, f64)>> {
    let total: u64 = values.iter().sum();
    let mut slices = vec![Vec::new(); values.len()];
    if total == 0 || step <= 0.0 {
        return slices;
    }
    let mut bounds = Vec::with_capacity(values.len());
    let mut acc = 0u64;
    for v in values {
        acc += v;
        bounds.push(acc as f64 / total as f64);
    }

    let n = (2.0 / step).ceil() as i64;
    for i in 0..=n {
        for j in 0..=n {
            let x = -1.0 + i as f64 * step;
            let y = -1.0 + j as f64 * step;
            if x * x + y * y > 1.0 {
                continue;
            }
            // fraction of a full turn measured clockwise from the top
            let turn = x.atan2(y).rem_euclid(std::f64::consts::TAU) / std::f64::consts::TAU;
            let slice = bounds
                .iter()
                .position(|b| turn < *b)
                .unwrap_or(values.len() - 1);
            slices[slice].push((x, y));
        }
    }
    slices
}

// ---------------------------------------------------------------------------
// Report view infrastructure
// ---------------------------------------------------------------------------

pub enum ReportViewAction {
    Continue,
    Close,
    /// Inputs changed; the loop calls `reload` before the next draw.
    Reload,
}

pub trait ReportView {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, code: KeyCode) -> ReportViewAction;
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Run an interactive ratatui report view. Sets up the terminal, event loop,
/// and panic hook, then restores the terminal on exit.
pub fn run_report_view(view: &mut dyn ReportView) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| view.draw(frame)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                match view.handle_key(key.code) {
                    ReportViewAction::Close => break Ok(()),
                    ReportViewAction::Reload => {
                        if let Err(e) = view.reload() {
                            break Err(e);
                        }
                    }
                    ReportViewAction::Continue => {}
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}
