//! Chat bubbles for the terminal.
//!
//! Every bubble is wrapped by `termimad`. User messages are then
//! right-aligned against the terminal edge; bot messages stay left-aligned
//! and get the full markdown skin.

use console::{Alignment, Term, pad_str, style, truncate_str};
use termimad::MadSkin;

/// Left/right margin kept free on each side of a bubble.
const MARGIN: usize = 2;

/// Terminal width assumed when stdout is not a terminal.
const FALLBACK_WIDTH: usize = 80;

/// Terminal bubble renderer.
pub struct ChatRenderer {
    skin: MadSkin,
    term_width: usize,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);

        let term_width = match Term::stdout().size_checked() {
            Some((_rows, cols)) => cols as usize,
            None => FALLBACK_WIDTH,
        };

        Self { skin, term_width }
    }

    /// Print a user bubble flush against the right edge.
    pub fn print_user(&self, text: &str) {
        println!();
        for line in user_bubble(&self.skin, text, self.term_width) {
            println!("{line}");
        }
    }

    /// Print a bot bubble from the left edge.
    pub fn print_bot(&self, text: &str) {
        let width = bubble_width(self.term_width);
        println!();
        println!("{}{}", " ".repeat(MARGIN), style("Bot").cyan().bold());
        let rendered = self.skin.text(text, Some(width)).to_string();
        for line in rendered.lines() {
            println!("{}{line}", " ".repeat(MARGIN));
        }
        println!();
    }

    /// Print an apology bubble. Same placement as a bot reply, dimmed.
    pub fn print_apology(&self, text: &str) {
        println!();
        println!("{}{}", " ".repeat(MARGIN), style("Bot").cyan().bold());
        let rendered = self.skin.text(text, Some(bubble_width(self.term_width))).to_string();
        for line in rendered.lines() {
            println!("{}{}", " ".repeat(MARGIN), style(line.trim_end()).yellow());
        }
        println!();
    }

    /// Print a `/history` line with a role label.
    pub fn print_history_line(&self, label: &str, content: &str) {
        let preview = truncate_str(content, bubble_width(self.term_width), "...");
        println!("{}{} {}", " ".repeat(MARGIN), style(label).bold(), preview);
    }
}

/// Widest a bubble may be for a terminal of `term_width` columns.
pub fn bubble_width(term_width: usize) -> usize {
    (term_width * 2 / 3).clamp(20, 100)
}

/// Lines of a user bubble, each padded so its right edge sits `MARGIN`
/// columns from the terminal edge.
pub fn user_bubble(skin: &MadSkin, text: &str, term_width: usize) -> Vec<String> {
    let edge = term_width.saturating_sub(MARGIN).max(1);
    let label = format!("{}", style("You").green().bold());
    let wrapped = skin.text(text, Some(bubble_width(term_width))).to_string();

    let mut lines = vec![pad_str(&label, edge, Alignment::Right, None).into_owned()];
    lines.extend(
        wrapped
            .lines()
            .map(|line| pad_str(line.trim_end(), edge, Alignment::Right, None).into_owned()),
    );
    lines
}
