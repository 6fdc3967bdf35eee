//! Widget builders for the derived dashboard series.

use gamelog_core::{
    models::{DeveloperScore, GameRecord},
    stats::shorten_platform,
    MetascoreBadge, SeriesPoint,
};
use ratatui::{
    layout::Constraint,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
};

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub danger: Color,
    pub warning: Color,
    pub success: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            danger: Color::Red,
            warning: Color::Yellow,
            success: Color::Green,
        }
    }
}

/// Bar chart over integer counts.
pub fn count_chart<'a>(title: &'a str, series: &[SeriesPoint], theme: &Theme) -> BarChart<'a> {
    let bars: Vec<Bar> = series
        .iter()
        .map(|point| {
            Bar::default()
                .label(Line::from(point.label.clone()))
                .value(point.value)
        })
        .collect();
    chart(title, &bars, theme.accent)
}

/// Bar chart over averages or percentages, labelled with one decimal.
pub fn average_chart<'a>(
    title: &'a str,
    series: &[SeriesPoint<f64>],
    color: Color,
) -> BarChart<'a> {
    let bars: Vec<Bar> = series
        .iter()
        .map(|point| {
            Bar::default()
                .label(Line::from(point.label.clone()))
                .value(point.value.max(0.0).round() as u64)
                .text_value(format!("{:.1}", point.value))
        })
        .collect();
    chart(title, &bars, color)
}

fn chart<'a>(title: &'a str, bars: &[Bar<'a>], color: Color) -> BarChart<'a> {
    let block = Block::default().borders(Borders::ALL).title(title);
    BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(bars))
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
}

/// Placeholder shown instead of an empty chart.
pub fn empty_panel<'a>(title: &'a str, message: &'a str, theme: &Theme) -> Paragraph<'a> {
    Paragraph::new(Line::from(message))
        .style(Style::default().fg(theme.muted))
        .block(Block::default().borders(Borders::ALL).title(title))
}

/// Ranked developers in backend order.
pub fn developer_table<'a>(developers: &[DeveloperScore], theme: &Theme) -> Table<'a> {
    let header = Row::new(["Developer", "Avg", "Games"])
        .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = developers
        .iter()
        .map(|dev| {
            Row::new([
                Cell::from(dev.developer.clone()),
                Cell::from(format!("{:.1}", dev.avg_metascore)),
                Cell::from(dev.count.to_string()),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Top Developers by Avg Metascore"),
    )
}

/// Full games table with placeholders and tier-coloured scores.
pub fn games_table<'a>(games: &[GameRecord], theme: &Theme) -> Table<'a> {
    let header = Row::new([
        "#",
        "Title",
        "Platform",
        "Completed On",
        "Hours",
        "Category",
        "Developer",
        "Metascore",
    ])
    .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = games
        .iter()
        .map(|game| {
            let badge = MetascoreBadge::from_score(game.metascore);
            let score_style = badge
                .tier
                .and_then(|tier| parse_hex_color(tier.color()))
                .map(|color| Style::default().fg(color).add_modifier(Modifier::BOLD))
                .unwrap_or_else(|| Style::default().fg(theme.muted));
            Row::new([
                Cell::from(game.position().to_string()),
                Cell::from(game.title.clone()),
                Cell::from(shorten_platform(game.platform_label()).to_string()),
                Cell::from(game.completed_label()),
                Cell::from(game.hours_label()),
                Cell::from(game.category_label().to_string()),
                Cell::from(game.developer_label().to_string()),
                Cell::from(badge.text).style(score_style),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(18),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(18),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Games ({})", games.len())),
    )
    .highlight_style(Style::default().bg(theme.selection_bg))
}

pub fn parse_hex_color(input: &str) -> Option<Color> {
    let trimmed = input.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}
