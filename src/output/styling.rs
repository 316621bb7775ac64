use console::{style, StyledObject};

use std::fmt::Display;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn cyan(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// A success percentage colored green above 80%, yellow from 50%, red below.
pub fn success_rate(rate: f64) -> StyledObject<String> {
    let styled = style(format!("{rate:.1}%")).bright();
    if rate > 80.0 {
        styled.green()
    } else if rate >= 50.0 {
        styled.yellow()
    } else {
        styled.red()
    }
}

/// Checkmark-suffixed green text for a finished step.
pub fn done(text: impl Display) -> StyledObject<String> {
    style(format!("{text} ✓")).bright().green()
}
