use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use crossterm::style::{Attribute, Color, ContentStyle};
use dialoguer::{Input, Password};

pub trait Console {
    /// Print one line using a style token such as `"bold red"`.
    fn say(&mut self, style: &str, text: &str);

    /// Block until the user enters a line. Empty answers are allowed.
    fn prompt(&mut self, style: &str, label: &str) -> Result<String>;

    /// Like [`prompt`](Self::prompt) but without echoing the answer.
    fn prompt_secret(&mut self, label: &str) -> Result<String>;
}

/// Turn `"bold red"` style tokens into a crossterm style.
/// Unknown tokens are ignored.
pub fn parse_style(spec: &str) -> ContentStyle {
    let mut style = ContentStyle::new();
    for token in spec.split_whitespace() {
        match token.to_ascii_lowercase().as_str() {
            "bold" => style.attributes.set(Attribute::Bold),
            "italic" => style.attributes.set(Attribute::Italic),
            "underline" => style.attributes.set(Attribute::Underlined),
            "dim" => style.attributes.set(Attribute::Dim),
            other => match Color::try_from(other) {
                Ok(color) => style.foreground_color = Some(color),
                Err(()) => tracing::debug!(token = other, "ignoring unknown style token"),
            },
        }
    }
    style
}

/// Stdout with crossterm colors; dialoguer prompts on a terminal, plain
/// line reads when stdin is piped.
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }

    fn read_piped_line(label: &str) -> Result<String> {
        print!("{label}: ");
        io::stdout().flush().context("flushing prompt")?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading answer from stdin")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Console for TerminalConsole {
    fn say(&mut self, style: &str, text: &str) {
        println!("{}", parse_style(style).apply(text));
    }

    fn prompt(&mut self, style: &str, label: &str) -> Result<String> {
        if !io::stdin().is_terminal() {
            return Self::read_piped_line(label);
        }
        let styled = parse_style(style).apply(label).to_string();
        Input::<String>::new()
            .with_prompt(styled)
            .allow_empty(true)
            .interact_text()
            .with_context(|| format!("prompting for '{label}'"))
    }

    fn prompt_secret(&mut self, label: &str) -> Result<String> {
        if !io::stdin().is_terminal() {
            return Self::read_piped_line(label);
        }
        Password::new()
            .with_prompt(label)
            .interact()
            .with_context(|| format!("prompting for '{label}'"))
    }
}
