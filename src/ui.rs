use ratatui::{
    Terminal, TerminalOptions, Viewport,
    backend::CrosstermBackend,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{self, Stdout};

use crate::countdown::Remaining;
use crate::error::TerminalError;
use crate::timer::Phase;

pub const THEMES: &[&str] = &["default", "nord", "dracula", "gruvbox", "solarized"];
const HELP_KEYS: [(&str, &str); 4] = [("P", "ause"), ("+", "1Minute"), ("N", "ext"), ("Q", "uit")];

// ============================================================================
// Status Line
// ============================================================================

/// What the status line shows on each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub phase: Phase,
    pub remaining: Remaining,
    /// Show the key help (interactive mode only).
    pub interactive: bool,
}

fn clock_text(r: Remaining) -> String {
    format!("{:2}:{:02}", r.minutes, r.seconds)
}

pub trait Renderer {
    /// Overwrites the status line. Failures are the renderer's problem.
    fn render(&mut self, status: &Status);
}

// ============================================================================
// Themes
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    work_color: Color,
    short_break_color: Color,
    long_break_color: Color,
    paused_color: Color,
    accent_color: Color,
}

impl Theme {
    fn phase_color(&self, phase: Phase) -> Color {
        match phase {
            Phase::Work => self.work_color,
            Phase::ShortBreak => self.short_break_color,
            Phase::LongBreak => self.long_break_color,
            Phase::Paused => self.paused_color,
        }
    }
}

pub fn get_theme(name: &str) -> Theme {
    match name {
        "nord" => Theme {
            work_color: Color::Rgb(136, 192, 255),
            short_break_color: Color::Rgb(255, 20, 60),
            long_break_color: Color::Rgb(0, 255, 100),
            paused_color: Color::Rgb(235, 203, 139),
            accent_color: Color::Rgb(255, 100, 255),
        },
        "dracula" => Theme {
            work_color: Color::Rgb(189, 147, 249),
            short_break_color: Color::Rgb(255, 0, 85),
            long_break_color: Color::Rgb(0, 255, 0),
            paused_color: Color::Rgb(241, 250, 140),
            accent_color: Color::Rgb(255, 0, 255),
        },
        "gruvbox" => Theme {
            work_color: Color::Rgb(254, 128, 25),
            short_break_color: Color::Rgb(255, 50, 0),
            long_break_color: Color::Rgb(255, 255, 0),
            paused_color: Color::Rgb(250, 189, 47),
            accent_color: Color::Rgb(255, 150, 0),
        },
        "solarized" => Theme {
            work_color: Color::Rgb(42, 161, 152),
            short_break_color: Color::Rgb(255, 0, 0),
            long_break_color: Color::Rgb(150, 255, 0),
            paused_color: Color::Rgb(181, 137, 0),
            accent_color: Color::Rgb(255, 200, 0),
        },
        _ => Theme {
            work_color: Color::Rgb(100, 181, 246),
            short_break_color: Color::Rgb(255, 0, 100),
            long_break_color: Color::Rgb(0, 255, 150),
            paused_color: Color::Yellow,
            accent_color: Color::Rgb(255, 100, 0),
        },
    }
}

/// `<phase padded to 15> | <M:SS>`, followed by the key help in interactive mode.
pub fn status_line(status: &Status, theme: &Theme) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!("{:15}", status.phase),
            Style::default().fg(theme.phase_color(status.phase)).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(clock_text(status.remaining), Style::default().add_modifier(Modifier::BOLD)),
    ];

    if status.interactive {
        spans.push(Span::raw("    "));
        for (i, (key, rest)) in HELP_KEYS.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::raw("["));
            spans.push(Span::styled(
                *key,
                Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(format!("]{}", rest), Style::default().fg(Color::DarkGray)));
        }
    }

    Line::from(spans)
}

// ============================================================================
// Terminal Renderer
// ============================================================================

/// One-line inline viewport that is redrawn in place on every tick.
pub struct TerminalStatus {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    theme: Theme,
}

impl TerminalStatus {
    pub fn new(theme: Theme) -> Result<Self, TerminalError> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::with_options(backend, TerminalOptions { viewport: Viewport::Inline(1) })
            .map_err(TerminalError::Display)?;
        Ok(Self { terminal, theme })
    }

    /// Gives the cursor back and leaves the last status on screen.
    pub fn finish(mut self) {
        if let Err(e) = self.terminal.show_cursor() {
            log::warn!("Failed to show cursor: {}", e);
        }
        println!();
    }
}

impl Renderer for TerminalStatus {
    fn render(&mut self, status: &Status) {
        let line = status_line(status, &self.theme);
        if let Err(e) = self.terminal.draw(|f| f.render_widget(Paragraph::new(line), f.size())) {
            log::warn!("Status render failed: {}", e);
        }
    }
}
