//! Hand out codes to a list of recipients.

use miette::Diagnostic;
use thiserror::Error;

use crate::code::Code;
use crate::pool::CodePool;

#[derive(Debug, Error, Diagnostic)]
pub enum AssignError {
    #[error("not enough valid codes: {recipients} recipient(s), {available} code(s) left")]
    #[diagnostic(
        code(codepool::assign::exhausted),
        help("Create a larger pool with `codepool init --total`, or split the recipient list.")
    )]
    NotEnoughCodes { recipients: usize, available: usize },

    #[error("failed to read recipients: {path}")]
    #[diagnostic(
        code(codepool::assign::read),
        help("The recipients file must be plain text with one recipient per line.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One recipient and the code issued to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub recipient: String,
    pub code: Code,
}

/// Parse a recipients list: one per line, blank lines ignored.
pub fn parse_recipients(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a recipients list from a file.
pub fn read_recipients(path: &std::path::Path) -> Result<Vec<String>, AssignError> {
    let text = std::fs::read_to_string(path).map_err(|e| AssignError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_recipients(&text))
}

/// Pair each recipient with a still-valid code, in sorted code order.
///
/// Nothing is paired unless every recipient can get a code.
pub fn pair(recipients: &[String], pool: &CodePool) -> Result<Vec<Assignment>, AssignError> {
    let available: Vec<&Code> = pool.valid_codes().collect();
    if available.len() < recipients.len() {
        return Err(AssignError::NotEnoughCodes {
            recipients: recipients.len(),
            available: available.len(),
        });
    }
    Ok(recipients
        .iter()
        .zip(available)
        .map(|(recipient, code)| Assignment {
            recipient: recipient.clone(),
            code: code.clone(),
        })
        .collect())
}
