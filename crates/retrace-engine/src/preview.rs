//! Human-auditable previews of what an undo or redo would do

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt;

/// One classified line inside a [`DiffHunk`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLine {
    /// Line present only in the proposed content
    Added(String),
    /// Line present only in the current content
    Removed(String),
    /// Line shared by both sides
    Context(String),
}

/// A contiguous run of line changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// First affected line in the current content (1-based)
    pub old_start: usize,
    /// Number of current-content lines covered
    pub old_count: usize,
    /// First affected line in the proposed content (1-based)
    pub new_start: usize,
    /// Number of proposed-content lines covered
    pub new_count: usize,
    /// Classified lines of the hunk
    pub lines: Vec<DiffLine>,
}

/// The shape of a preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewKind {
    /// Line-level diff between current and proposed content
    Diff {
        /// Change hunks, in file order
        hunks: Vec<DiffHunk>,
    },
    /// Whole-file display, for creations and deletions
    Content {
        /// The file content being created or removed
        content: String,
    },
    /// Textual description, for renames, directories, and commands
    Info {
        /// The description
        message: String,
    },
}

/// A read-only description of what a reversal would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// What the reversal would change
    pub kind: PreviewKind,
    /// Cascade and content-availability caveats the user should see
    pub warnings: Vec<String>,
}

impl Preview {
    /// Diff preview from current content to proposed content
    pub fn diff(current: &str, proposed: &str) -> Self {
        Preview {
            kind: PreviewKind::Diff {
                hunks: diff_hunks(current, proposed),
            },
            warnings: Vec::new(),
        }
    }

    /// Whole-file content preview
    pub fn content(content: impl Into<String>) -> Self {
        Preview {
            kind: PreviewKind::Content {
                content: content.into(),
            },
            warnings: Vec::new(),
        }
    }

    /// Informational preview
    pub fn info(message: impl Into<String>) -> Self {
        Preview {
            kind: PreviewKind::Info {
                message: message.into(),
            },
            warnings: Vec::new(),
        }
    }

    /// Appends a warning, builder-style
    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Added/removed line counts across all hunks; zero for non-diff previews
    pub fn change_counts(&self) -> (usize, usize) {
        let PreviewKind::Diff { hunks } = &self.kind else {
            return (0, 0);
        };
        let mut added = 0;
        let mut removed = 0;
        for hunk in hunks {
            for line in &hunk.lines {
                match line {
                    DiffLine::Added(_) => added += 1,
                    DiffLine::Removed(_) => removed += 1,
                    DiffLine::Context(_) => {}
                }
            }
        }
        (added, removed)
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PreviewKind::Diff { hunks } => {
                for hunk in hunks {
                    writeln!(
                        f,
                        "@@ -{},{} +{},{} @@",
                        hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
                    )?;
                    for line in &hunk.lines {
                        match line {
                            DiffLine::Added(text) => writeln!(f, "+{}", text)?,
                            DiffLine::Removed(text) => writeln!(f, "-{}", text)?,
                            DiffLine::Context(text) => writeln!(f, " {}", text)?,
                        }
                    }
                }
            }
            PreviewKind::Content { content } => writeln!(f, "{}", content)?,
            PreviewKind::Info { message } => writeln!(f, "{}", message)?,
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Shared lines carried on each side of a change run
const CONTEXT_RADIUS: usize = 2;

/// Extracts change hunks between two texts
///
/// Each hunk is a run of inserted/removed lines padded with up to
/// [`CONTEXT_RADIUS`] shared lines on each side; runs whose padding would
/// overlap are merged into one hunk, as in a unified diff.
pub fn diff_hunks(current: &str, proposed: &str) -> Vec<DiffHunk> {
    let diff = TextDiff::from_lines(current, proposed);

    // Materialize every change with the line numbers it starts at.
    let mut old_line = 1usize;
    let mut new_line = 1usize;
    let mut entries: Vec<(ChangeTag, String, usize, usize)> = Vec::new();
    for change in diff.iter_all_changes() {
        let text = change.value().trim_end_matches('\n').to_string();
        entries.push((change.tag(), text, old_line, new_line));
        match change.tag() {
            ChangeTag::Delete => old_line += 1,
            ChangeTag::Insert => new_line += 1,
            ChangeTag::Equal => {
                old_line += 1;
                new_line += 1;
            }
        }
    }

    let changed: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.0 != ChangeTag::Equal)
        .map(|(i, _)| i)
        .collect();
    if changed.is_empty() {
        return Vec::new();
    }

    // Group change runs; runs closer than twice the radius share context
    // lines and collapse into one hunk.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let (mut start, mut end) = (changed[0], changed[0]);
    for &i in &changed[1..] {
        if i - end <= 2 * CONTEXT_RADIUS {
            end = i;
        } else {
            groups.push((start, end));
            start = i;
            end = i;
        }
    }
    groups.push((start, end));

    groups
        .into_iter()
        .map(|(s, e)| {
            let lo = s.saturating_sub(CONTEXT_RADIUS);
            let hi = (e + CONTEXT_RADIUS).min(entries.len() - 1);
            let mut lines = Vec::new();
            let mut old_count = 0;
            let mut new_count = 0;
            for (tag, text, _, _) in &entries[lo..=hi] {
                match tag {
                    ChangeTag::Delete => {
                        old_count += 1;
                        lines.push(DiffLine::Removed(text.clone()));
                    }
                    ChangeTag::Insert => {
                        new_count += 1;
                        lines.push(DiffLine::Added(text.clone()));
                    }
                    ChangeTag::Equal => {
                        old_count += 1;
                        new_count += 1;
                        lines.push(DiffLine::Context(text.clone()));
                    }
                }
            }
            DiffHunk {
                old_start: entries[lo].2,
                old_count,
                new_start: entries[lo].3,
                new_count,
                lines,
            }
        })
        .collect()
}
