//! Windows command-line quoting.
//!
//! Remote hosts split command lines with `CommandLineToArgvW`, so values are
//! quoted with [`shell_escape::windows`] rather than POSIX rules: values with
//! whitespace or double quotes are wrapped in quotes, embedded quotes are
//! backslash-escaped, and backslashes that precede a quote are doubled.

use std::borrow::Cow;

use shell_escape::windows::escape;

/// Quotes a single value so Windows argv parsing yields it unchanged.
///
/// # Examples
///
/// ```
/// # use winstage::quoting::quote;
/// assert_eq!(quote("C:\\staging\\run.ps1"), "C:\\staging\\run.ps1");
/// assert_eq!(quote("C:\\Program Files\\run.ps1"), "\"C:\\Program Files\\run.ps1\"");
/// ```
#[must_use]
pub fn quote(value: &str) -> Cow<'_, str> {
    escape(Cow::Borrowed(value))
}

/// Joins values into a single Windows command line, quoting each one.
#[must_use]
pub fn join<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for value in values {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(quote(value.as_ref()).as_ref());
    }
    line
}
