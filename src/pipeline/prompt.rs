use crate::errors::{Error, Result};
use console::style;
use dialoguer::{console::Term, theme::ColorfulTheme, Confirm, Input};

/// The questions a guided flow asks and the text it shows in between.
pub(crate) trait Prompter {
    fn intro(&mut self, text: &str) -> Result<()>;

    fn heading(&mut self, text: &str) -> Result<()>;

    fn echo(&mut self, text: &str) -> Result<()>;

    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    /// An empty answer yields `default` when there is one.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;
}

/// Interactive prompts on stderr, so stdout only carries the result.
pub(crate) struct TermPrompter {
    term: Term,
    theme: ColorfulTheme,
}

impl TermPrompter {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            theme: ColorfulTheme::default(),
        }
    }

    fn write_line(&self, line: &str) -> Result<()> {
        self.term
            .write_line(line)
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}

impl Prompter for TermPrompter {
    fn intro(&mut self, text: &str) -> Result<()> {
        self.write_line(&style(text).cyan().to_string())
    }

    fn heading(&mut self, text: &str) -> Result<()> {
        self.write_line(&style(text).bold().to_string())
    }

    fn echo(&mut self, text: &str) -> Result<()> {
        self.write_line(text)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact_on(&self.term)?;
        Ok(answer)
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(accepts_empty_answer(default));
        if let Some(default) = default {
            input = input.default(default.to_string()).show_default(!default.is_empty());
        }
        Ok(input.interact_text_on(&self.term)?)
    }
}

/// Without a default an empty answer is asked again.
fn accepts_empty_answer(default: Option<&str>) -> bool {
    default.is_some()
}
