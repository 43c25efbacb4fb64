//! Console commands
//!
//! Every line typed into the console is either a `:command` or new input
//! text for the live translator.

use crate::shared::error::{AppError, AppResult};

/// Which text `:say` reads aloud
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakTarget {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the input text
    Input(String),
    From(String),
    To(String),
    Swap,
    Clear,
    Once,
    Say(SpeakTarget),
    History,
    /// 1-based position in the history listing
    Restore(usize),
    Forget,
    Languages,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type text to translate it. Use \\n for a line break.
  :from <lang>    source language (code or name, \"auto\" to detect)
  :to <lang>      target language
  :swap           swap languages and texts
  :clear          clear the input
  :once           translate now, reporting the detected language
  :say in|out     read the input or the translation aloud
  :history        list recent translations
  :restore <n>    load entry n from the history
  :forget         clear the history
  :langs          list languages
  :quit           exit
Start a line with :: to translate text beginning with a colon.";

impl Command {
    pub fn parse(line: &str) -> AppResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(literal) = line.strip_prefix("::") {
            return Ok(Command::Input(unescape(&format!(":{}", literal))));
        }
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Command::Input(unescape(line)));
        };

        let mut parts = command.trim().splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        let command = match name.as_str() {
            "from" => Command::From(required(arg, ":from <lang>")?),
            "to" => Command::To(required(arg, ":to <lang>")?),
            "swap" => Command::Swap,
            "clear" => Command::Clear,
            "once" => Command::Once,
            "say" => match arg {
                "" | "out" | "output" => Command::Say(SpeakTarget::Output),
                "in" | "input" => Command::Say(SpeakTarget::Input),
                other => return Err(usage(&format!("unknown text {:?}, use :say in|out", other))),
            },
            "history" | "h" => Command::History,
            "restore" => {
                let position = required(arg, ":restore <n>")?
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| usage(":restore needs a positive number"))?;
                Command::Restore(position)
            }
            "forget" => Command::Forget,
            "langs" | "languages" => Command::Languages,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(usage(&format!("unknown command :{}, try :help", other))),
        };
        Ok(command)
    }
}

fn required(arg: &str, usage_line: &str) -> AppResult<String> {
    if arg.is_empty() {
        return Err(usage(&format!("usage: {}", usage_line)));
    }
    Ok(arg.to_string())
}

fn usage(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

/// Turn `\n` into a line break and `\\` into a backslash
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_input() {
        assert_eq!(Command::parse("Hello").unwrap(), Command::Input("Hello".into()));
        assert_eq!(Command::parse("").unwrap(), Command::Input(String::new()));
        assert_eq!(
            Command::parse(r"Dear Sir,\nThanks. C:\\temp\x").unwrap(),
            Command::Input("Dear Sir,\nThanks. C:\\temp\\x".into())
        );
        assert_eq!(Command::parse("::) smile").unwrap(), Command::Input(":) smile".into()));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(Command::parse(":from  German ").unwrap(), Command::From("German".into()));
        assert_eq!(Command::parse(":to es").unwrap(), Command::To("es".into()));
        assert_eq!(Command::parse(":restore 3").unwrap(), Command::Restore(3));
        assert_eq!(Command::parse(":say in").unwrap(), Command::Say(SpeakTarget::Input));
        assert_eq!(Command::parse(":say").unwrap(), Command::Say(SpeakTarget::Output));
        assert_eq!(Command::parse(":Q").unwrap(), Command::Quit);
    }

    #[test]
    fn malformed_commands_are_rejected() {
        for line in [":to", ":restore 0", ":restore two", ":say sideways", ":dance"] {
            assert!(
                matches!(Command::parse(line), Err(AppError::Validation(_))),
                "{line} should be rejected"
            );
        }
    }
}
