//! Interactive prompts for connection values missing from flags and config.

use anyhow::Result;
use pg_erd::config::PromptField;
use pg_erd::Credentials;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Ask for one connection value on the terminal.
///
/// End of input counts as an empty answer; credential resolution rejects it.
pub fn ask(field: PromptField) -> Result<String> {
    let mut rl = DefaultEditor::new()?;
    match rl.readline(field.prompt()) {
        Ok(line) => Ok(line.trim().to_string()),
        Err(ReadlineError::Eof) => Ok(String::new()),
        Err(ReadlineError::Interrupted) => anyhow::bail!("interrupted"),
        Err(e) => Err(e.into()),
    }
}

/// Ask for the password without echoing it
pub fn password(credentials: &Credentials) -> Result<String> {
    let prompt = format!("Password for {}: ", credentials);
    Ok(rpassword::prompt_password(prompt)?)
}
