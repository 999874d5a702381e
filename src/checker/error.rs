use std::error::Error;
use std::fmt::Display;

use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    UndeclaredReference,
    UndefinedField,
    TypeMismatch,
    NoMatchingOverload,
    NotAMessageType,
    UnexpectedType,
    IncompatibleTypes,
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueKind::UndeclaredReference => "undeclared-reference",
            IssueKind::UndefinedField => "undefined-field",
            IssueKind::TypeMismatch => "type-mismatch",
            IssueKind::NoMatchingOverload => "no-matching-overload",
            IssueKind::NotAMessageType => "not-a-message-type",
            IssueKind::UnexpectedType => "unexpected-type",
            IssueKind::IncompatibleTypes => "incompatible-types",
        };
        f.write_str(name)
    }
}

/// One compile-time diagnostic with an optional 1-based source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    pub location: Option<(usize, usize)>,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl ToString) -> Issue {
        Issue {
            kind,
            message: message.to_string(),
            location: None,
        }
    }

    pub fn at(kind: IssueKind, message: impl ToString, location: Option<(usize, usize)>) -> Issue {
        Issue {
            kind,
            message: message.to_string(),
            location,
        }
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some((line, column)) => {
                write!(f, "{line}:{column}: {}", self.message)
            }
            None => f.write_str(&self.message),
        }
    }
}

/// Collected diagnostics of one compilation. Any issue marks the
/// compilation failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Issues {
    issues: Vec<Issue>,
}

impl Issues {
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    /// Human-oriented rendering with the offending source line and a caret
    /// marker under the error column.
    pub fn render(&self, source: &str) -> String {
        let lines = source.lines().collect::<Vec<_>>();
        let mut out = String::new();

        for issue in &self.issues {
            out.push_str(&issue.to_string());
            out.push('\n');
            if let Some((line, column)) = issue.location {
                if let Some(text) = lines.get(line - 1) {
                    let marker = " ".repeat(column.saturating_sub(1));
                    out.push_str(&format!(
                        " |{text}\n |{marker}{}\n",
                        format!("^--- {}", issue.kind).red()
                    ));
                }
            }
        }

        out
    }
}

impl Display for Issues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        f.write_str(&rendered)
    }
}

impl Error for Issues {}
