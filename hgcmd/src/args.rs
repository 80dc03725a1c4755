//! Conditional argv assembly for Mercurial subcommands.
//!
//! Every facade operation builds its request through [`Args`] so that
//! unset or default parameters contribute no tokens at all.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::{Error, Result};

/// Format Mercurial accepts for `--date` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordered argument list for one command, starting with the subcommand.
///
/// Built fresh per command and consumed once by [`Args::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an Args does nothing until .build() is called"]
pub struct Args {
    /// Tokens in argv order.
    tokens: Vec<String>,
}

impl Args {
    /// Starts an argument list with the subcommand name.
    pub fn new(command: &str) -> Self {
        Self {
            tokens: vec![command.to_owned()],
        }
    }

    /// Appends tokens unconditionally.
    pub fn add(&mut self, tokens: &[&str]) -> &mut Self {
        self.tokens.extend(tokens.iter().map(|t| (*t).to_owned()));
        self
    }

    /// Appends `tokens` only if `condition` holds.
    pub fn add_if(&mut self, condition: bool, tokens: &[&str]) -> &mut Self {
        if condition {
            self.add(tokens);
        }
        self
    }

    /// Appends all `values` if none is empty.
    ///
    /// With `strict`, an empty value is an [`Error::InvalidArgument`] naming
    /// it; otherwise the whole group is silently skipped.
    pub fn add_if_non_empty(&mut self, strict: bool, values: &[&str]) -> Result<&mut Self> {
        match values.iter().position(|v| v.is_empty()) {
            None => Ok(self.add(values)),
            Some(_) if !strict => Ok(self),
            Some(0) => Err(Error::InvalidArgument(format!(
                "{}: empty value in position 0",
                self.command()
            ))),
            Some(i) => Err(Error::InvalidArgument(format!(
                "{}: empty value for {}",
                self.command(),
                values[i - 1]
            ))),
        }
    }

    /// Appends `flag value` when `value` is present and non-empty.
    pub fn add_value(&mut self, flag: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            // Non-strict never fails.
            let _ = self.add_if_non_empty(false, &[flag, v]);
        }
        self
    }

    /// Appends `flag` and the date in [`DATE_FORMAT`] when `date` is set.
    pub fn add_date(&mut self, flag: &str, date: Option<NaiveDateTime>) -> &mut Self {
        if let Some(d) = date {
            let formatted = d.format(DATE_FORMAT).to_string();
            self.add(&[flag, &formatted]);
        }
        self
    }

    /// Appends every item, typically positional file arguments.
    pub fn add_all<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tokens
            .extend(items.into_iter().map(|s| s.as_ref().to_owned()));
        self
    }

    /// The subcommand this list was started with.
    pub fn command(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    /// Consumes the builder into the final argv.
    pub fn build(self) -> Vec<String> {
        self.tokens
    }
}

/// Borrows a path as an argument token.
pub(crate) fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::Encoding(format!("{} is not valid UTF-8", path.display())))
}

/// Space-joined rendering, as for a shell command line. No quoting is done.
impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn conditional_flags() {
        let mut a = Args::new("commit");
        a.add_if(true, &["--addremove"]).add_if(false, &["--close-branch"]);
        assert_eq!(a.build(), ["commit", "--addremove"]);
    }

    #[test]
    fn non_empty_lenient_skips_group() {
        let mut a = Args::new("log");
        a.add_if_non_empty(false, &["--user", ""]).unwrap();
        a.add_if_non_empty(false, &["--branch", "default"]).unwrap();
        assert_eq!(a.build(), ["log", "--branch", "default"]);
    }

    #[test]
    fn non_empty_strict_names_flag() {
        let mut a = Args::new("commit");
        let err = a.add_if_non_empty(true, &["--message", ""]).unwrap_err();
        match err {
            Error::InvalidArgument(msg) => assert!(msg.contains("--message"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(a.build(), ["commit"]);
    }

    #[test]
    fn value_none_contributes_nothing() {
        let mut a = Args::new("push");
        a.add_value("--rev", None).add_value("--branch", Some(""));
        assert_eq!(a.build(), ["push"]);
    }

    #[test]
    fn date_formatting() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        let mut a = Args::new("update");
        a.add_date("--date", Some(d)).add_date("--other", None);
        assert_eq!(a.build(), ["update", "--date", "2021-03-04 05:06:07"]);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut a = Args::new("status");
        a.add(&["--quiet"]).add_all(["b.txt", "a.txt"]).add(&["--copies"]);
        assert_eq!(
            a.build(),
            ["status", "--quiet", "b.txt", "a.txt", "--copies"]
        );
    }

    #[test]
    fn display_joins_with_spaces() {
        let mut a = Args::new("clone");
        a.add(&["--noupdate", "src dir", "dest"]);
        assert_eq!(a.to_string(), "clone --noupdate src dir dest");
    }
}
