use chrono::{Months, NaiveDate};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Points},
        Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table,
    },
    Frame,
};

use crate::cli::{Session, SourceArgs, NOTHING_TO_REPORT};
use crate::domains::FilterDomains;
use crate::error::Result;
use crate::filters::{toggle, FilterSelection, YearChoice};
use crate::fmt::{count, percent};
use crate::models::Dataset;
use crate::reports::{self, ReportViews, ShareRow};
use crate::tui::{
    pie_points, run_report_view, wrap_text, Palette, ReportView, ReportViewAction, BOLD,
    FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE,
};

const SIDEBAR_WIDTH: u16 = 34;
const PIE_STEP: f64 = 0.025;
const AGE_STEP: i64 = 5;

// ---------------------------------------------------------------------------
// Widgets and panels
// ---------------------------------------------------------------------------

/// Filter widget with keyboard focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    StartDate,
    EndDate,
    Segments,
    OnboardingTypes,
    AgeMin,
    AgeMax,
    Years,
    GenerationSegments,
}

const FOCUS_ORDER: [Focus; 8] = [
    Focus::StartDate,
    Focus::EndDate,
    Focus::Segments,
    Focus::OnboardingTypes,
    Focus::AgeMin,
    Focus::AgeMax,
    Focus::Years,
    Focus::GenerationSegments,
];

impl Focus {
    fn label(self) -> &'static str {
        match self {
            Focus::StartDate => "Start date",
            Focus::EndDate => "End date",
            Focus::Segments => "Market segment",
            Focus::OnboardingTypes => "Onboarding type",
            Focus::AgeMin => "Age from",
            Focus::AgeMax => "Age to",
            Focus::Years => "Trend years",
            Focus::GenerationSegments => "Generation view segments",
        }
    }

    fn position(self) -> usize {
        FOCUS_ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        FOCUS_ORDER[(self.position() + 1) % FOCUS_ORDER.len()]
    }

    fn prev(self) -> Self {
        FOCUS_ORDER[(self.position() + FOCUS_ORDER.len() - 1) % FOCUS_ORDER.len()]
    }

    fn is_list(self) -> bool {
        matches!(
            self,
            Focus::Segments | Focus::OnboardingTypes | Focus::Years | Focus::GenerationSegments
        )
    }

    fn hint(self) -> &'static str {
        match self {
            Focus::StartDate | Focus::EndDate => "\u{2190}/\u{2192}=day  -/+=month  Home/End=bound",
            Focus::AgeMin | Focus::AgeMax => "\u{2190}/\u{2192}=\u{00b1}1  -/+=\u{00b1}5",
            _ => "\u{2191}/\u{2193}=move  Space=toggle  a=all  n=none",
        }
    }
}

/// Report panels, in the order they are stacked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Panel {
    Overview,
    Segments,
    Monthly,
    Generations,
    AttachRate,
}

const PANELS: [Panel; 5] = [
    Panel::Overview,
    Panel::Segments,
    Panel::Monthly,
    Panel::Generations,
    Panel::AttachRate,
];

/// Lay panels out top to bottom starting at `offset`. The last panel that
/// fits partially is clipped; panels below it are skipped.
fn stack_panels(area: Rect, heights: &[u16], offset: usize) -> Vec<(usize, Rect)> {
    let mut out = Vec::new();
    let mut y = area.y;
    let bottom = area.y + area.height;
    for (i, h) in heights.iter().enumerate().skip(offset) {
        if y >= bottom {
            break;
        }
        let height = (*h).min(bottom - y);
        out.push((i, Rect::new(area.x, y, area.width, height)));
        y += height;
    }
    out
}

/// First sidebar line to show so that `focus_line` stays on screen.
fn sidebar_offset(focus_line: usize, visible: usize) -> u16 {
    let offset = (focus_line + 1).saturating_sub(visible.max(1));
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn shift_date(date: NaiveDate, days: i64, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted
        .and_then(|d| d.checked_add_signed(chrono::Duration::days(days)))
        .unwrap_or(date)
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct Dashboard<'a> {
    dataset: &'a Dataset,
    domains: &'a FilterDomains,
    generation_defaults: Vec<String>,
    selection: FilterSelection,
    views: ReportViews,
    focus: Focus,
    cursor: usize,
    panel_offset: usize,
    palette: Palette,
    title: String,
    note: String,
}

impl<'a> Dashboard<'a> {
    pub fn new(
        dataset: &'a Dataset,
        domains: &'a FilterDomains,
        generation_defaults: Vec<String>,
        palette: Palette,
        title: String,
        note: String,
    ) -> Self {
        let selection = FilterSelection::defaults(domains, &generation_defaults);
        let views = reports::compute(dataset, &selection, &domains.trend_years);
        Self {
            dataset,
            domains,
            generation_defaults,
            selection,
            views,
            focus: Focus::StartDate,
            cursor: 0,
            panel_offset: 0,
            palette,
            title,
            note,
        }
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn views(&self) -> &ReportViews {
        &self.views
    }

    fn recompute(&mut self) {
        self.views = reports::compute(self.dataset, &self.selection, &self.domains.trend_years);
    }

    // -- editing ------------------------------------------------------------

    fn list_len(&self) -> usize {
        match self.focus {
            Focus::Segments | Focus::GenerationSegments => self.domains.segments.len(),
            Focus::OnboardingTypes => self.domains.onboarding_types.len(),
            Focus::Years => self.domains.year_choices().len(),
            _ => 0,
        }
    }

    fn toggle_at(&mut self, idx: usize) {
        match self.focus {
            Focus::Segments => {
                if let Some(s) = self.domains.segments.get(idx) {
                    toggle(&mut self.selection.segments, s.clone());
                }
            }
            Focus::GenerationSegments => {
                if let Some(s) = self.domains.segments.get(idx) {
                    toggle(&mut self.selection.generation_segments, s.clone());
                }
            }
            Focus::OnboardingTypes => {
                if let Some(t) = self.domains.onboarding_types.get(idx) {
                    toggle(&mut self.selection.onboarding_types, t.clone());
                }
            }
            Focus::Years => {
                if let Some(c) = self.domains.year_choices().get(idx) {
                    toggle(&mut self.selection.years, *c);
                }
            }
            _ => {}
        }
    }

    fn set_all(&mut self, on: bool) {
        match self.focus {
            Focus::Segments => {
                self.selection.segments = if on {
                    self.domains.segments.iter().cloned().collect()
                } else {
                    Default::default()
                };
            }
            Focus::GenerationSegments => {
                self.selection.generation_segments = if on {
                    self.domains.segments.iter().cloned().collect()
                } else {
                    Default::default()
                };
            }
            Focus::OnboardingTypes => {
                self.selection.onboarding_types = if on {
                    self.domains.onboarding_types.iter().cloned().collect()
                } else {
                    Default::default()
                };
            }
            Focus::Years => {
                self.selection.years = if on {
                    self.domains.year_choices().into_iter().collect()
                } else {
                    Default::default()
                };
            }
            _ => {}
        }
    }

    /// Returns true when the selection changed.
    fn edit_list(&mut self, code: KeyCode) -> bool {
        let len = self.list_len();
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(len.saturating_sub(1));
                false
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.toggle_at(self.cursor);
                true
            }
            KeyCode::Char('a') => {
                self.set_all(true);
                true
            }
            KeyCode::Char('n') => {
                self.set_all(false);
                true
            }
            _ => false,
        }
    }

    fn edit_date(&mut self, code: KeyCode) -> bool {
        let (days, months) = match code {
            KeyCode::Left => (-1, 0),
            KeyCode::Right => (1, 0),
            KeyCode::Char('-') => (0, -1),
            KeyCode::Char('+') | KeyCode::Char('=') => (0, 1),
            KeyCode::Home | KeyCode::End => (0, 0),
            _ => return false,
        };
        let first = self.domains.first_date;
        let last = self.domains.last_date;
        let before = (self.selection.start, self.selection.end);
        if self.focus == Focus::StartDate {
            let target = match code {
                KeyCode::Home => first,
                KeyCode::End => self.selection.end,
                _ => shift_date(self.selection.start, days, months),
            };
            self.selection.start = target.clamp(first, self.selection.end);
        } else {
            let target = match code {
                KeyCode::Home => self.selection.start,
                KeyCode::End => last,
                _ => shift_date(self.selection.end, days, months),
            };
            self.selection.end = target.clamp(self.selection.start, last);
        }
        before != (self.selection.start, self.selection.end)
    }

    fn edit_age(&mut self, code: KeyCode) -> bool {
        let delta = match code {
            KeyCode::Left => -1,
            KeyCode::Right => 1,
            KeyCode::Char('-') => -AGE_STEP,
            KeyCode::Char('+') | KeyCode::Char('=') => AGE_STEP,
            _ => return false,
        };
        let before = (self.selection.age_min, self.selection.age_max);
        if self.focus == Focus::AgeMin {
            self.selection.age_min =
                (self.selection.age_min + delta).clamp(self.domains.age_min(), self.selection.age_max);
        } else {
            self.selection.age_max =
                (self.selection.age_max + delta).clamp(self.selection.age_min, self.domains.age_max());
        }
        before != (self.selection.age_min, self.selection.age_max)
    }

    // -- drawing ------------------------------------------------------------

    fn panel_height(&self, panel: Panel) -> u16 {
        let rows = match panel {
            Panel::Overview => return 14,
            Panel::Segments => self.views.segments.len() as u16 + 6,
            Panel::Monthly => self.views.monthly.len() as u16 + 4,
            Panel::Generations => self.views.generations.len() as u16 * 2 + 2,
            Panel::AttachRate => 6,
        };
        rows.max(8)
    }

    /// Sidebar lines plus the index of the line holding the focused row.
    fn sidebar_lines(&self) -> (Vec<Line<'static>>, usize) {
        let mut lines: Vec<Line> = Vec::new();
        let mut focus_line = 0;
        for focus in FOCUS_ORDER {
            let focused = focus == self.focus;
            if focused {
                focus_line = lines.len();
            }
            let marker = if focused { ">" } else { " " };
            let title_style = if focused { SELECTED_STYLE } else { BOLD };
            match focus {
                Focus::StartDate | Focus::EndDate => {
                    let value = if focus == Focus::StartDate {
                        self.selection.start
                    } else {
                        self.selection.end
                    };
                    lines.push(Line::from(vec![
                        Span::styled(format!("{marker} {:<12}", focus.label()), title_style),
                        Span::raw(value.format("%d %b %Y").to_string()),
                    ]));
                }
                Focus::AgeMin | Focus::AgeMax => {
                    let value = if focus == Focus::AgeMin {
                        self.selection.age_min
                    } else {
                        self.selection.age_max
                    };
                    lines.push(Line::from(vec![
                        Span::styled(format!("{marker} {:<12}", focus.label()), title_style),
                        Span::raw(value.to_string()),
                        Span::styled(
                            format!("  ({}-{})", self.domains.age_min(), self.domains.age_max()),
                            FOOTER_STYLE,
                        ),
                    ]));
                }
                _ => {
                    lines.push(Line::from(Span::styled(
                        format!("{marker} {}", focus.label()),
                        title_style,
                    )));
                    for (i, (label, checked)) in self.list_items(focus).into_iter().enumerate() {
                        let check = if checked { "[x]" } else { "[ ]" };
                        let style = if focused && i == self.cursor {
                            focus_line = lines.len();
                            SELECTED_STYLE
                        } else {
                            Style::default()
                        };
                        lines.push(Line::from(Span::styled(format!("   {check} {label}"), style)));
                    }
                }
            }
        }
        (lines, focus_line)
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect) {
        let (lines, focus_line) = self.sidebar_lines();
        let block = Block::default()
            .title(" Filters ")
            .borders(Borders::ALL)
            .border_style(FOOTER_STYLE);
        let visible = block.inner(area).height as usize;
        let offset = sidebar_offset(focus_line, visible);
        frame.render_widget(Paragraph::new(lines).block(block).scroll((offset, 0)), area);
    }

    fn list_items(&self, focus: Focus) -> Vec<(String, bool)> {
        match focus {
            Focus::Segments => self
                .domains
                .segments
                .iter()
                .map(|s| (s.clone(), self.selection.segments.contains(s)))
                .collect(),
            Focus::GenerationSegments => self
                .domains
                .segments
                .iter()
                .map(|s| (s.clone(), self.selection.generation_segments.contains(s)))
                .collect(),
            Focus::OnboardingTypes => self
                .domains
                .onboarding_types
                .iter()
                .map(|t| (t.clone(), self.selection.onboarding_types.contains(t)))
                .collect(),
            Focus::Years => self
                .domains
                .year_choices()
                .into_iter()
                .map(|c: YearChoice| (self.domains.year_choice_label(c), self.selection.years.contains(&c)))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn panel_block(title: String) -> Block<'static> {
        Block::default()
            .title(Span::styled(title, BOLD))
            .borders(Borders::ALL)
            .border_style(FOOTER_STYLE)
    }

    fn draw_overview(&self, frame: &mut Frame, area: Rect) {
        let block = Self::panel_block(" 01. Account per retail segment ".to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let values: Vec<u64> = self.dataset.overview.iter().map(|s| s.accounts).collect();
        let total = self.dataset.overview_total();
        if total == 0 {
            frame.render_widget(Paragraph::new(" No overview data."), inner);
            return;
        }

        let pie_width = (inner.height * 2).min(inner.width / 2);
        let [pie_area, legend_area] =
            Layout::horizontal([Constraint::Length(pie_width), Constraint::Fill(1)]).areas(inner);

        let slices = pie_points(&values, PIE_STEP);
        let canvas = Canvas::default()
            .marker(symbols::Marker::Braille)
            .x_bounds([-1.05, 1.05])
            .y_bounds([-1.05, 1.05])
            .paint(|ctx| {
                for (i, points) in slices.iter().enumerate() {
                    ctx.draw(&Points {
                        coords: points.as_slice(),
                        color: self.palette.slice(i),
                    });
                }
            });
        frame.render_widget(canvas, pie_area);

        let name_width = self
            .dataset
            .overview
            .iter()
            .map(|s| s.segment.len())
            .max()
            .unwrap_or(10);
        let mut lines = vec![Line::from("")];
        for (i, slice) in self.dataset.overview.iter().enumerate() {
            let share = slice.accounts as f64 / total as f64 * 100.0;
            lines.push(Line::from(vec![
                Span::styled(" \u{25a0} ", Style::default().fg(self.palette.slice(i))),
                Span::raw(format!("{:<width$}  ", slice.segment, width = name_width)),
                Span::raw(format!("{:>8}  ", count(slice.accounts as usize))),
                Span::styled(percent(share), FOOTER_STYLE),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), legend_area);
    }

    fn count_table(&self, header: [&'static str; 2], rows: Vec<(String, usize)>) -> Table<'static> {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|(label, n)| Row::new(vec![Cell::from(label), Cell::from(count(n))]))
            .collect();
        Table::new(rows, [Constraint::Fill(1), Constraint::Length(10)])
            .header(
                Row::new(header)
                    .style(Style::new().fg(Color::DarkGray).add_modifier(Modifier::BOLD))
                    .bottom_margin(1),
            )
            .column_spacing(2)
    }

    fn accent_bar(&self, label: String, value: u64, text: String) -> Bar<'static> {
        Bar::default()
            .value(value)
            .label(Line::from(label))
            .text_value(text)
            .style(Style::default().fg(self.palette.accent))
            .value_style(Style::default().fg(Color::White).bg(self.palette.accent))
    }

    fn horizontal_chart(&self, bars: Vec<Bar<'static>>) -> BarChart<'static> {
        BarChart::default()
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(1)
            .data(BarGroup::default().bars(&bars))
    }

    fn draw_segments(&self, frame: &mut Frame, area: Rect) {
        let block = Self::panel_block(" 02. A breakdown of account opening ".to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [total_area, body] =
            Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).areas(inner);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw(" Number of Accounts: "),
                Span::styled(count(self.views.total_accounts), HEADER_STYLE),
            ])),
            total_area,
        );

        if self.views.segments.is_empty() {
            frame.render_widget(Paragraph::new(format!(" {NOTHING_TO_REPORT}")), body);
            return;
        }

        let [table_area, chart_area] =
            Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(body);
        let rows = self
            .views
            .segments
            .iter()
            .map(|s| (s.label.clone(), s.count))
            .collect();
        frame.render_widget(
            self.count_table(["Market Segment", "Accounts"], rows),
            table_area,
        );

        let bars = self
            .views
            .segments
            .iter()
            .map(|s| self.accent_bar(s.label.clone(), s.count as u64, count(s.count)))
            .collect();
        frame.render_widget(self.horizontal_chart(bars), chart_area);
    }

    fn draw_monthly(&self, frame: &mut Frame, area: Rect) {
        let years: Vec<String> = self
            .selection
            .years
            .iter()
            .map(|c| self.domains.year_choice_label(*c))
            .collect();
        let block = Self::panel_block(format!(
            " 03. Monthly account opening ({}) ",
            if years.is_empty() { "no years".to_string() } else { years.join(", ") }
        ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.views.monthly.is_empty() {
            frame.render_widget(Paragraph::new(format!(" {NOTHING_TO_REPORT}")), inner);
            return;
        }

        let [table_area, chart_area] =
            Layout::horizontal([Constraint::Length(32), Constraint::Fill(1)]).areas(inner);
        let rows = self
            .views
            .monthly
            .iter()
            .map(|m| (m.label.clone(), m.count))
            .collect();
        frame.render_widget(
            self.count_table(["Month and Year", "Accounts"], rows),
            table_area,
        );

        let bars: Vec<Bar> = self
            .views
            .monthly
            .iter()
            .map(|m| {
                // "Feb 22" fits under a narrow bar
                let short = NaiveDate::from_ymd_opt(m.year, m.month, 1)
                    .map(|d| d.format("%b %y").to_string())
                    .unwrap_or_else(|| m.label.clone());
                self.accent_bar(short, m.count as u64, m.count.to_string())
            })
            .collect();
        let slots = self.views.monthly.len().max(1) as u16;
        let bar_width = (chart_area.width / slots).saturating_sub(1).clamp(1, 6);
        let chart = BarChart::default()
            .bar_width(bar_width)
            .bar_gap(1)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, chart_area);
    }

    fn share_bars(&self, rows: &[ShareRow]) -> Vec<Bar<'static>> {
        rows.iter()
            .map(|r| {
                // tenths of a percent keep small shares visible
                let value = (r.percent * 10.0).round() as u64;
                self.accent_bar(r.label.clone(), value, percent(r.percent))
            })
            .collect()
    }

    fn draw_shares(&self, frame: &mut Frame, area: Rect, title: String, rows: &[ShareRow]) {
        let block = Self::panel_block(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if rows.is_empty() {
            frame.render_widget(Paragraph::new(format!(" {NOTHING_TO_REPORT}")), inner);
            return;
        }
        let chart = self.horizontal_chart(self.share_bars(rows)).max(1000);
        frame.render_widget(chart, inner);
    }

    fn draw_panel(&self, frame: &mut Frame, panel: Panel, area: Rect) {
        let segments = self
            .selection
            .generation_segments
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        match panel {
            Panel::Overview => self.draw_overview(frame, area),
            Panel::Segments => self.draw_segments(frame, area),
            Panel::Monthly => self.draw_monthly(frame, area),
            Panel::Generations => self.draw_shares(
                frame,
                area,
                format!(" 04. Generation breakdown ({segments}) "),
                &self.views.generations,
            ),
            Panel::AttachRate => self.draw_shares(
                frame,
                area,
                format!(" 05. Juice usage ({segments}) "),
                &self.views.attach_rate,
            ),
        }
    }
}

impl ReportView for Dashboard<'_> {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let (note, note_lines) = if self.note.is_empty() {
            (String::new(), 0)
        } else {
            wrap_text(&self.note, area.width.saturating_sub(2) as usize)
        };

        let [header_area, note_area, sep_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(note_lines),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.title)).style(HEADER_STYLE),
            header_area,
        );
        if note_lines > 0 {
            let lines: Vec<Line> = note.lines().map(|l| Line::from(format!(" {l}"))).collect();
            frame.render_widget(Paragraph::new(lines).style(FOOTER_STYLE), note_area);
        }
        frame.render_widget(
            Paragraph::new("\u{2501}".repeat(area.width as usize)).style(FOOTER_STYLE),
            sep_area,
        );

        let [sidebar_area, content_area] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
                .areas(body_area);
        self.draw_sidebar(frame, sidebar_area);

        let heights: Vec<u16> = PANELS.iter().map(|p| self.panel_height(*p)).collect();
        for (i, rect) in stack_panels(content_area, &heights, self.panel_offset) {
            self.draw_panel(frame, PANELS[i], rect);
        }

        frame.render_widget(
            Paragraph::new(format!(
                " {}  Tab=next filter  PgUp/PgDn=scroll  r=reset  q=quit",
                self.focus.hint()
            ))
            .style(FOOTER_STYLE),
            footer_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ReportViewAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ReportViewAction::Close,
            KeyCode::Tab => {
                self.focus = self.focus.next();
                self.cursor = 0;
                return ReportViewAction::Continue;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                self.cursor = 0;
                return ReportViewAction::Continue;
            }
            KeyCode::PageDown | KeyCode::Char('J') => {
                self.panel_offset = (self.panel_offset + 1).min(PANELS.len() - 1);
                return ReportViewAction::Continue;
            }
            KeyCode::PageUp | KeyCode::Char('K') => {
                self.panel_offset = self.panel_offset.saturating_sub(1);
                return ReportViewAction::Continue;
            }
            KeyCode::Char('r') => {
                self.selection = FilterSelection::defaults(self.domains, &self.generation_defaults);
                return ReportViewAction::Reload;
            }
            _ => {}
        }

        let changed = match self.focus {
            f if f.is_list() => self.edit_list(code),
            Focus::StartDate | Focus::EndDate => self.edit_date(code),
            _ => self.edit_age(code),
        };
        if changed {
            ReportViewAction::Reload
        } else {
            ReportViewAction::Continue
        }
    }

    fn reload(&mut self) -> Result<()> {
        self.recompute();
        Ok(())
    }
}

pub fn run(source: &SourceArgs) -> Result<()> {
    let session = Session::open(source)?;
    let mut dashboard = Dashboard::new(
        &session.dataset,
        &session.domains,
        session.settings.generation_default_segments.clone(),
        Palette::from_settings(&session.settings),
        session.settings.title.clone(),
        session.settings.note.clone(),
    );
    run_report_view(&mut dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::derive;
    use crate::models::fixtures::{dataset, date, record};
    use crate::settings::Settings;
    use ratatui::{backend::TestBackend, Terminal};

    fn fixture() -> (Dataset, FilterDomains) {
        let mut rows = vec![
            record("MASS", 20, date(2022, 1, 4)),
            record("MASS", 30, date(2022, 2, 10)),
            record("PRESTIGE", 40, date(2023, 5, 31)),
        ];
        rows[1].onboarding_type = "Online".into();
        rows[2].days_to_subscription = Some(4);
        let ds = dataset(rows);
        let domains = derive(&ds, &[2022, 2023]).unwrap();
        (ds, domains)
    }

    fn dashboard<'a>(ds: &'a Dataset, domains: &'a FilterDomains) -> Dashboard<'a> {
        Dashboard::new(
            ds,
            domains,
            vec!["MASS".into()],
            Palette::from_settings(&Settings::default()),
            "Onboarding".into(),
            "Last updated 26 June 2023.".into(),
        )
    }

    /// Feed a key the way the event loop does.
    fn press(d: &mut Dashboard, code: KeyCode) {
        if let ReportViewAction::Reload = d.handle_key(code) {
            d.reload().unwrap();
        }
    }

    #[test]
    fn test_initial_views_cover_everything() {
        let (ds, domains) = fixture();
        let d = dashboard(&ds, &domains);
        assert_eq!(d.views().total_accounts, 3);
        assert_eq!(d.views().generation_total, 2);
    }

    #[test]
    fn test_toggling_segment_recomputes() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        press(&mut d, KeyCode::Tab);
        press(&mut d, KeyCode::Tab);
        assert_eq!(d.focus, Focus::Segments);
        // cursor on MASS (first seen)
        press(&mut d, KeyCode::Char(' '));
        assert!(!d.selection().segments.contains("MASS"));
        assert_eq!(d.views().total_accounts, 1);
        press(&mut d, KeyCode::Char('a'));
        assert_eq!(d.views().total_accounts, 3);
        press(&mut d, KeyCode::Char('n'));
        assert_eq!(d.views().total_accounts, 0);
        assert!(d.views().segments.is_empty());
    }

    #[test]
    fn test_dates_are_clamped_to_domain_and_each_other() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        press(&mut d, KeyCode::Left);
        assert_eq!(d.selection().start, date(2022, 1, 4));
        press(&mut d, KeyCode::Char('+'));
        assert_eq!(d.selection().start, date(2022, 2, 4));
        assert_eq!(d.views().total_accounts, 2);
        press(&mut d, KeyCode::End);
        assert_eq!(d.selection().start, d.selection().end);

        press(&mut d, KeyCode::Tab);
        press(&mut d, KeyCode::Right);
        assert_eq!(d.selection().end, date(2023, 5, 31));
        press(&mut d, KeyCode::Home);
        assert_eq!(d.selection().end, d.selection().start);
    }

    #[test]
    fn test_age_range_is_clamped() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        for _ in 0..4 {
            press(&mut d, KeyCode::Tab);
        }
        assert_eq!(d.focus, Focus::AgeMin);
        press(&mut d, KeyCode::Char('+'));
        press(&mut d, KeyCode::Char('+'));
        assert_eq!(d.selection().age_min, 30);
        assert_eq!(d.views().total_accounts, 2);
        for _ in 0..10 {
            press(&mut d, KeyCode::Char('+'));
        }
        assert_eq!(d.selection().age_min, 40);
        press(&mut d, KeyCode::Tab);
        press(&mut d, KeyCode::Left);
        assert_eq!(d.selection().age_max, 40);
    }

    #[test]
    fn test_year_selection_filters_trend() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        for _ in 0..6 {
            press(&mut d, KeyCode::Tab);
        }
        assert_eq!(d.focus, Focus::Years);
        press(&mut d, KeyCode::Char('n'));
        assert!(d.views().monthly.is_empty());
        // "2023"
        press(&mut d, KeyCode::Down);
        press(&mut d, KeyCode::Char(' '));
        assert_eq!(d.views().monthly.len(), 1);
        assert_eq!(d.views().monthly[0].label, "May 2023");
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        press(&mut d, KeyCode::Char('+'));
        assert_ne!(d.views().total_accounts, 3);
        press(&mut d, KeyCode::Char('r'));
        assert_eq!(d.views().total_accounts, 3);
        assert_eq!(
            d.selection(),
            &FilterSelection::defaults(&domains, &["MASS".to_string()])
        );
    }

    #[test]
    fn test_navigation_keys_do_not_reload() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        assert!(matches!(d.handle_key(KeyCode::Tab), ReportViewAction::Continue));
        assert!(matches!(d.handle_key(KeyCode::PageDown), ReportViewAction::Continue));
        assert_eq!(d.panel_offset, 1);
        assert!(matches!(d.handle_key(KeyCode::Char('q')), ReportViewAction::Close));
    }

    #[test]
    fn test_stack_panels_clips_and_skips() {
        let area = Rect::new(0, 0, 80, 20);
        let placed = stack_panels(area, &[8, 8, 8, 8], 0);
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[2].1.height, 4);
        let placed = stack_panels(area, &[8, 8, 8, 8], 2);
        assert_eq!(placed.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_shift_date_month_end() {
        assert_eq!(shift_date(date(2022, 1, 31), 0, 1), date(2022, 2, 28));
        assert_eq!(shift_date(date(2022, 3, 1), -1, 0), date(2022, 2, 28));
        assert_eq!(shift_date(date(2022, 3, 31), 0, -1), date(2022, 2, 28));
    }

    #[test]
    fn test_draw_renders_panels_in_order() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        let mut terminal = Terminal::new(TestBackend::new(140, 80)).unwrap();
        terminal.draw(|frame| d.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>() + "\n")
            .collect();
        let order: Vec<usize> = ["01. Account", "02. A breakdown", "03. Monthly", "04. Generation", "05. Juice"]
            .iter()
            .map(|t| text.find(t).unwrap_or_else(|| panic!("{t} not drawn")))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("Number of Accounts: 3"));
    }

    #[test]
    fn test_draw_with_empty_restriction() {
        let (ds, domains) = fixture();
        let mut d = dashboard(&ds, &domains);
        press(&mut d, KeyCode::Tab);
        press(&mut d, KeyCode::Tab);
        press(&mut d, KeyCode::Char('n'));
        for _ in 0..5 {
            press(&mut d, KeyCode::Tab);
        }
        // on the generation segments list
        assert_eq!(d.focus, Focus::GenerationSegments);
        press(&mut d, KeyCode::Char('n'));
        let mut terminal = Terminal::new(TestBackend::new(140, 80)).unwrap();
        terminal.draw(|frame| d.draw(frame)).unwrap();
        assert!(d.views().generations.is_empty());
        assert!(d.views().attach_rate.is_empty());
    }

    fn wide_fixture() -> (Dataset, FilterDomains) {
        let rows = (0..6)
            .map(|i| {
                let mut r = record(&format!("S{}", i + 1), 20 + i as i64, date(2022, 1 + i as u32, 3));
                r.onboarding_type = format!("T{}", i % 4 + 1);
                r
            })
            .collect();
        let ds = dataset(rows);
        let domains = derive(&ds, &[2022, 2023]).unwrap();
        (ds, domains)
    }

    /// Text of the sidebar column after drawing on a `width` x `height` terminal.
    fn sidebar_text(d: &mut Dashboard, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| d.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| {
                row.iter()
                    .take(SIDEBAR_WIDTH as usize)
                    .map(|c| c.symbol())
                    .collect::<String>()
                    + "\n"
            })
            .collect()
    }

    #[test]
    fn test_sidebar_offset() {
        assert_eq!(sidebar_offset(0, 18), 0);
        assert_eq!(sidebar_offset(17, 18), 0);
        assert_eq!(sidebar_offset(18, 18), 1);
        assert_eq!(sidebar_offset(26, 18), 9);
        assert_eq!(sidebar_offset(5, 0), 5);
    }

    #[test]
    fn test_focused_widget_stays_visible_on_small_terminal() {
        let (ds, domains) = wide_fixture();
        let mut d = dashboard(&ds, &domains);
        assert!(sidebar_text(&mut d, 80, 24).contains("Start date"));

        for _ in 0..7 {
            press(&mut d, KeyCode::Tab);
        }
        assert_eq!(d.focus, Focus::GenerationSegments);
        let text = sidebar_text(&mut d, 80, 24);
        assert!(text.contains("Generation view segments"), "{text}");
        assert!(text.contains("[x] S1"), "{text}");

        for _ in 0..5 {
            press(&mut d, KeyCode::Down);
        }
        let text = sidebar_text(&mut d, 80, 24);
        assert!(text.contains("Generation view segments"), "{text}");
        assert!(text.contains("[x] S6"), "{text}");

        // back to the top widget once focus wraps around
        press(&mut d, KeyCode::Tab);
        assert!(sidebar_text(&mut d, 80, 24).contains("Start date"));
    }
}
