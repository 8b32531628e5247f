pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, FormField};
use crate::backend::Backend;
use crate::record::HalfStats;
use crate::session::SessionPhase;
use charting::{compute_chart_params, format_clock, format_label};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl<B: Backend> Widget for &App<B> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);

        let session = &self.session;
        if session.needs_identity() {
            render_form(self, chunks[0], buf);
        } else {
            match session.phase() {
                SessionPhase::FirstHalfActive | SessionPhase::SecondHalfActive => {
                    render_typing(self, chunks[0], buf)
                }
                SessionPhase::Break => render_break(self, chunks[0], buf),
                SessionPhase::Completed | SessionPhase::AwaitingIdentity => {
                    render_results(self, chunks[0], buf)
                }
            }
        }

        let footer = match &self.status {
            Some(msg) => Span::styled(msg.clone(), Style::default().fg(Color::Yellow)),
            None => Span::styled(legend(self), italic()),
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

fn legend<B: Backend>(app: &App<B>) -> &'static str {
    if app.session.needs_identity() {
        return "(tab) next field / (←/→) department / (enter) start / (esc)ape";
    }
    match app.session.phase() {
        SessionPhase::FirstHalfActive | SessionPhase::SecondHalfActive | SessionPhase::Break => {
            "(ctrl+e) end test / (esc)ape"
        }
        SessionPhase::Completed | SessionPhase::AwaitingIdentity => "(r)estart / (esc)ape",
    }
}

fn render_form<B: Backend>(app: &App<B>, area: Rect, buf: &mut Buffer) {
    let form = &app.form;
    let field = |label: &str, value: &str, which: FormField| {
        let focused = form.focus == which;
        let marker = if focused { "> " } else { "  " };
        let value_style = if focused {
            bold().add_modifier(Modifier::UNDERLINED)
        } else {
            bold()
        };
        Line::from(vec![
            Span::styled(format!("{marker}{label:<22}"), dim_bold()),
            Span::styled(value.to_string(), value_style),
        ])
    };

    let department = match form.department {
        Some(_) => form.department_name(),
        None => "(select with ←/→)",
    };
    let lines = vec![
        Line::from(Span::styled(
            "Enter your details",
            bold().fg(Color::Cyan),
        )),
        Line::from(""),
        field("Name", &form.name, FormField::Name),
        field("Department", department, FormField::Department),
        field(
            "Registration number",
            &form.registration_number,
            FormField::RegistrationNumber,
        ),
    ];

    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(lines).render(chunks[1], buf);
}

fn render_typing<B: Backend>(app: &App<B>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let reference: Vec<char> = session.reference_text().chars().collect();
    let input: Vec<char> = session.input_text().chars().collect();

    let green_bold_style = bold().fg(Color::Green);
    let red_bold_style = bold().fg(Color::Red);
    let underlined_dim_bold_style = dim_bold().add_modifier(Modifier::UNDERLINED);

    let mut spans: Vec<Span> = reference
        .iter()
        .zip(input.iter())
        .map(|(&expected, &typed)| {
            if typed == expected {
                Span::styled(expected.to_string(), green_bold_style)
            } else {
                Span::styled(
                    match typed {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                )
            }
        })
        .collect();

    if let Some(cursor) = reference.get(input.len()) {
        spans.push(Span::styled(cursor.to_string(), underlined_dim_bold_style));
    }
    let rest: String = reference.iter().skip(input.len() + 1).collect();
    spans.push(Span::styled(rest, dim_bold()));

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_width = session.reference_text().width();
    let prompt_occupied_lines = if prompt_width <= max_chars_per_line as usize {
        1
    } else {
        ((prompt_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(area.height.saturating_sub(prompt_occupied_lines + 2) / 2),
            Constraint::Length(2),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Min(0),
        ])
        .split(area);

    let clock = if session.timer_active() {
        format!("{} left", format_clock(session.time_left()))
    } else {
        format!("{} · start typing to begin", format_clock(session.time_left()))
    };
    let header = format!(
        "{}   {}   {}/{} chars   {} mistakes",
        session.phase(),
        clock,
        session.characters_typed(),
        reference.len(),
        session.mistakes()
    );
    Paragraph::new(Span::styled(header, dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_occupied_lines == 1 {
            // short prompts read better centered
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);
}

fn half_line(label: &str, half: Option<HalfStats>) -> String {
    match half {
        Some(h) => format!(
            "{label}: {} chars   {} mistakes   {}s",
            h.characters_typed, h.mistakes, h.time_spent
        ),
        None => format!("{label}: not reached"),
    }
}

fn render_break<B: Backend>(app: &App<B>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let lines = vec![
        Line::from(Span::styled("break", bold().fg(Color::Cyan))),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "second half starts in {}",
                format_clock(session.time_left())
            ),
            bold(),
        )),
        Line::from(Span::styled(
            half_line("first half", session.first_half()),
            dim_bold(),
        )),
    ];

    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

fn render_results<B: Backend>(app: &App<B>, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let Some(record) = session.last_record() else {
        Paragraph::new(Span::styled("press (r) to start a new test", bold()))
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let (first, second) = match session.last_metrics() {
        Some(m) => (
            m.first_half.characters_series(),
            m.second_half
                .as_ref()
                .map(|l| l.characters_series())
                .unwrap_or_default(),
        ),
        None => (Vec::new(), Vec::new()),
    };
    let (overall_duration, highest) =
        compute_chart_params(&[first.as_slice(), second.as_slice()], record.half_time as f64);

    let datasets = vec![
        Dataset::default()
            .name("first half")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&first),
        Dataset::default()
            .name("second half")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Cyan))
            .graph_type(GraphType::Line)
            .data(&second),
    ];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("chars")
                .bounds([0.0, highest])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(format_label(highest), bold()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        half_line("first half", Some(record.first_half)),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        half_line("second half", record.second_half),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let ended = if record.ended_early { "   (ended early)" } else { "" };
    Paragraph::new(Span::styled(
        format!(
            "{} chars   {} mistakes   {:.0} cpm{ended}",
            record.total_characters_typed,
            record.total_mistakes,
            record.characters_per_minute()
        ),
        bold().fg(Color::Green),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    let persisted = match session.persistence() {
        Some(report) if report.is_ok() => {
            Span::styled("results saved", italic().fg(Color::Cyan))
        }
        Some(report) => {
            let reason = report
                .test_error
                .as_deref()
                .or(report.metrics_error.as_deref())
                .unwrap_or("unknown error");
            Span::styled(format!("results not saved: {reason}"), italic().fg(Color::Red))
        }
        None => Span::raw(""),
    };
    Paragraph::new(persisted)
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}
