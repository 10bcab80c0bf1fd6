use std::io::{self, BufRead, Write};

use colored::Colorize;
use console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::error::{Result, UpgradeError};

/// Operator input. Implementations re-prompt on invalid answers rather than
/// failing; only I/O problems (closed stdin, lost terminal) are errors.
pub trait Prompter {
    fn ask(&self, prompt: &str) -> Result<String>;

    fn confirm(&self, prompt: &str) -> Result<bool> {
        confirm_by_text(self, prompt)
    }

    fn choose_from_menu(&self, title: &str, options: &[String]) -> Result<usize> {
        menu_by_number(self, title, options)
    }
}

/// Numbered menu read as text; anything outside `1..=options.len()` re-prompts.
pub fn menu_by_number<P: Prompter + ?Sized>(
    prompter: &P,
    title: &str,
    options: &[String],
) -> Result<usize> {
    loop {
        println!("\n{}", title.cyan());
        for (index, option) in options.iter().enumerate() {
            println!("{}", format!("{}. {}", index + 1, option).yellow());
        }

        let answer = prompter.ask("Enter the number of your choice")?;
        match answer.trim().parse::<usize>() {
            Ok(number) if (1..=options.len()).contains(&number) => return Ok(number - 1),
            _ => println!("{}", "Invalid selection, please try again.".red()),
        }
    }
}

pub fn confirm_by_text<P: Prompter + ?Sized>(prompter: &P, prompt: &str) -> Result<bool> {
    loop {
        let answer = prompter.ask(&format!("{} (y/n)", prompt))?;
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("{}", "Please answer y or n.".red()),
        }
    }
}

/// The single interactive session for a run. Opened once in the command and
/// restored (cursor shown) when dropped.
pub struct ConsolePrompter {
    term: Term,
    theme: ColorfulTheme,
    interactive: bool,
}

impl ConsolePrompter {
    pub fn open() -> Self {
        let term = Term::stderr();
        let interactive = term.is_term();
        Self {
            term,
            theme: ColorfulTheme::default(),
            interactive,
        }
    }
}

fn terminal_error(err: dialoguer::Error) -> UpgradeError {
    UpgradeError::Io(io::Error::new(io::ErrorKind::Other, err))
}

impl Prompter for ConsolePrompter {
    fn ask(&self, prompt: &str) -> Result<String> {
        if self.interactive {
            return Input::<String>::with_theme(&self.theme)
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text_on(&self.term)
                .map_err(terminal_error);
        }

        print!("{}: ", prompt.green());
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(UpgradeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        if !self.interactive {
            return confirm_by_text(self, prompt);
        }
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact_on(&self.term)
            .map_err(terminal_error)
    }

    fn choose_from_menu(&self, title: &str, options: &[String]) -> Result<usize> {
        if !self.interactive {
            return menu_by_number(self, title, options);
        }
        Select::with_theme(&self.theme)
            .with_prompt(title)
            .items(options)
            .default(0)
            .interact_on(&self.term)
            .map_err(terminal_error)
    }
}

impl Drop for ConsolePrompter {
    fn drop(&mut self) {
        if self.interactive {
            let _ = self.term.show_cursor();
        }
    }
}
