// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Process-wide style table. Built once, immutable.

use ratatui::style::{Color, Modifier, Style};

use crate::feeds::Severity;

pub const TITLE: Style = Style::new().fg(Color::LightCyan).add_modifier(Modifier::BOLD);
pub const SUBTITLE: Style = Style::new().fg(Color::DarkGray);
pub const HEADER_BG: Style = Style::new().bg(Color::Rgb(18, 22, 32));

pub const ACTIVE_TAB: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::LightCyan)
    .add_modifier(Modifier::BOLD);
pub const INACTIVE_TAB: Style = Style::new().fg(Color::Gray);

pub const SECTION_HEADER: Style = Style::new()
    .fg(Color::LightCyan)
    .add_modifier(Modifier::BOLD);
pub const SUB_SECTION_HEADER: Style = Style::new()
    .fg(Color::Cyan)
    .add_modifier(Modifier::BOLD);
pub const TABLE_HEADER: Style = Style::new()
    .fg(Color::Gray)
    .add_modifier(Modifier::BOLD);
pub const DIVIDER: Style = Style::new().fg(Color::DarkGray);
pub const MUTED: Style = Style::new().fg(Color::DarkGray);
pub const ERROR: Style = Style::new().fg(Color::LightRed);
pub const WARNING: Style = Style::new().fg(Color::Yellow);

pub const POSITIVE: Style = Style::new().fg(Color::LightGreen);
pub const NEGATIVE: Style = Style::new().fg(Color::LightRed);
pub const NEUTRAL: Style = Style::new().fg(Color::Yellow);
pub const SYMBOL: Style = Style::new().fg(Color::LightYellow).add_modifier(Modifier::BOLD);

pub const NEWS_TITLE: Style = Style::new().fg(Color::White);
pub const SELECTED_ROW: Style = Style::new().bg(Color::Rgb(40, 48, 64));
pub const SELECTED_TITLE: Style = Style::new()
    .fg(Color::LightCyan)
    .add_modifier(Modifier::BOLD);
pub const SOURCE: Style = Style::new().fg(Color::Cyan);
pub const AGE: Style = Style::new().fg(Color::DarkGray);

pub const BRIEF_TITLE: Style = Style::new()
    .fg(Color::LightMagenta)
    .add_modifier(Modifier::BOLD);
pub const BRIEF_META: Style = Style::new().fg(Color::DarkGray);
pub const THREAT_ITEM: Style = Style::new().fg(Color::LightYellow);

pub const WEATHER_TEMP: Style = Style::new()
    .fg(Color::LightYellow)
    .add_modifier(Modifier::BOLD);
pub const WEATHER_DESC: Style = Style::new().fg(Color::Cyan);

pub const QUADRANT_TITLE: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::Cyan)
    .add_modifier(Modifier::BOLD);

pub const CRITICAL: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Red)
    .add_modifier(Modifier::BOLD);
pub const HIGH: Style = Style::new().fg(Color::LightRed);
pub const MEDIUM: Style = Style::new().fg(Color::Yellow);
pub const LOW: Style = Style::new().fg(Color::LightBlue);
pub const INFO: Style = Style::new().fg(Color::DarkGray);

pub const FOOTER: Style = Style::new().fg(Color::DarkGray);
pub const FOOTER_STATUS: Style = Style::new().fg(Color::LightGreen);

/// Badge style for a severity tier.
pub fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => CRITICAL,
        Severity::High => HIGH,
        Severity::Medium => MEDIUM,
        Severity::Low => LOW,
        Severity::Info => INFO,
    }
}

/// Bar/score color for a 0–100 country risk score.
pub fn risk_score_style(score: u8) -> Style {
    match score {
        75..=u8::MAX => CRITICAL,
        50..=74 => HIGH,
        25..=49 => MEDIUM,
        _ => LOW,
    }
}

/// Color for a 0.0–1.0 market probability.
pub fn probability_style(probability: f64) -> Style {
    if probability >= 0.66 {
        POSITIVE
    } else if probability <= 0.33 {
        NEGATIVE
    } else {
        NEUTRAL
    }
}
