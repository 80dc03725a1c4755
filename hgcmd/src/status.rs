//! Line-oriented parsing of `status`, `resolve --list`, and `paths` output.

use std::fmt;

use serde::Serialize;

/// File state as reported by `hg status`.
///
/// [`Status::Default`] and [`Status::All`] are client-side filter values:
/// they select which `--<status>` flag (if any) is sent and are never
/// produced by parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No filter.
    #[default]
    Default,
    /// `M`
    Modified,
    /// `A`
    Added,
    /// `R`
    Removed,
    /// `C`
    Clean,
    /// `!`, tracked but missing from the working directory.
    Missing,
    /// `?`, not tracked.
    Unknown,
    /// `I`
    Ignored,
    /// Blank code: copy source of the preceding entry.
    Origin,
    /// `U`
    Conflicted,
    /// Every status; filter value only.
    All,
}

impl Status {
    /// Maps a one-letter status code. Unknown codes yield `None`.
    pub const fn from_code(c: char) -> Option<Self> {
        match c {
            'M' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'R' => Some(Self::Removed),
            'C' => Some(Self::Clean),
            '!' => Some(Self::Missing),
            '?' => Some(Self::Unknown),
            'I' => Some(Self::Ignored),
            ' ' => Some(Self::Origin),
            'U' => Some(Self::Conflicted),
            _ => None,
        }
    }

    /// The one-letter code, `None` for filter-only values.
    pub const fn code(self) -> Option<char> {
        match self {
            Self::Modified => Some('M'),
            Self::Added => Some('A'),
            Self::Removed => Some('R'),
            Self::Clean => Some('C'),
            Self::Missing => Some('!'),
            Self::Unknown => Some('?'),
            Self::Ignored => Some('I'),
            Self::Origin => Some(' '),
            Self::Conflicted => Some('U'),
            Self::Default | Self::All => None,
        }
    }

    /// The `hg status` flag selecting this state, if there is one.
    pub const fn filter_flag(self) -> Option<&'static str> {
        match self {
            Self::All => Some("--all"),
            Self::Modified => Some("--modified"),
            Self::Added => Some("--added"),
            Self::Removed => Some("--removed"),
            Self::Clean => Some("--clean"),
            Self::Missing => Some("--deleted"),
            Self::Unknown => Some("--unknown"),
            Self::Ignored => Some("--ignored"),
            Self::Origin => Some("--copies"),
            Self::Default | Self::Conflicted => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Clean => "clean",
            Self::Missing => "missing",
            Self::Unknown => "unknown",
            Self::Ignored => "ignored",
            Self::Origin => "origin",
            Self::Conflicted => "conflicted",
            Self::All => "all",
        })
    }
}

/// One `hg status` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    /// Path relative to the repository root.
    pub path: String,
    /// Reported state.
    pub status: Status,
}

/// Parses `status` output: `<code><space><path>` per line.
///
/// Unrecognised codes are reported as [`Status::Clean`]. Lines too short
/// to carry a path are skipped.
pub fn parse_status(output: &str) -> Vec<FileStatus> {
    output
        .split('\n')
        .filter_map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let code = line.chars().next()?;
            let path = line.get(2..).filter(|p| !p.is_empty())?;
            Some(FileStatus {
                path: path.to_owned(),
                status: Status::from_code(code).unwrap_or(Status::Clean),
            })
        })
        .collect()
}

/// One `hg resolve --list` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// `true` if marked resolved (`R`), `false` otherwise (`U`).
    pub resolved: bool,
}

/// Parses `resolve --list` output.
pub fn parse_resolve(output: &str) -> Vec<ResolveEntry> {
    output
        .lines()
        .filter_map(|line| {
            let path = line.get(2..)?.trim();
            if path.is_empty() {
                return None;
            }
            Some(ResolveEntry {
                path: path.to_owned(),
                resolved: line.starts_with('R'),
            })
        })
        .collect()
}

/// Parses `paths` output (`name = url` per line), in output order.
pub fn parse_paths(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let (name, url) = line.split_once('=')?;
            Some((name.trim().to_owned(), url.trim().to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let parsed = parse_status("M foo.txt\nA bar.txt\n? baz.txt\n");
        let got: Vec<_> = parsed.iter().map(|e| (e.status, e.path.as_str())).collect();
        assert_eq!(
            got,
            [
                (Status::Modified, "foo.txt"),
                (Status::Added, "bar.txt"),
                (Status::Unknown, "baz.txt"),
            ]
        );
    }

    #[test]
    fn status_keeps_spaces_in_paths() {
        let parsed = parse_status("R dir/with space.txt");
        assert_eq!(parsed[0].path, "dir/with space.txt");
        assert_eq!(parsed[0].status, Status::Removed);
    }

    #[test]
    fn status_copy_origin() {
        let parsed = parse_status("A new.txt\n  old.txt\n");
        assert_eq!(parsed[1].status, Status::Origin);
        assert_eq!(parsed[1].path, "old.txt");
    }

    #[test]
    fn status_unknown_code_is_clean() {
        let parsed = parse_status("X weird.txt\n");
        assert_eq!(parsed[0].status, Status::Clean);
    }

    #[test]
    fn status_skips_short_lines() {
        assert!(parse_status("\n\nM\nM \n").is_empty());
    }

    #[test]
    fn status_handles_crlf() {
        let parsed = parse_status("! gone.txt\r\n");
        assert_eq!(parsed[0].path, "gone.txt");
        assert_eq!(parsed[0].status, Status::Missing);
    }

    #[test]
    fn strict_code_mapping() {
        assert_eq!(Status::from_code('X'), None);
        for s in [Status::Modified, Status::Origin, Status::Conflicted] {
            assert_eq!(Status::from_code(s.code().unwrap_or('X')), Some(s));
        }
        assert_eq!(Status::All.code(), None);
    }

    #[test]
    fn filter_flags() {
        assert_eq!(Status::Default.filter_flag(), None);
        assert_eq!(Status::All.filter_flag(), Some("--all"));
        assert_eq!(Status::Missing.filter_flag(), Some("--deleted"));
    }

    #[test]
    fn resolve_entries() {
        let parsed = parse_resolve("R a.txt\nU b.txt \n");
        assert_eq!(
            parsed,
            [
                ResolveEntry {
                    path: "a.txt".into(),
                    resolved: true
                },
                ResolveEntry {
                    path: "b.txt".into(),
                    resolved: false
                },
            ]
        );
    }

    #[test]
    fn paths_split_on_first_equals() {
        let parsed = parse_paths("default = https://hg.example.com/repo?a=b\nbroken line\n");
        assert_eq!(
            parsed,
            [(
                "default".to_owned(),
                "https://hg.example.com/repo?a=b".to_owned()
            )]
        );
    }
}
