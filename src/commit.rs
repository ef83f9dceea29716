//! Commit and push records consumed by the feature aggregators
//!
//! These are the inputs handed over by the history-mining collaborator. The
//! aggregators only need chronological keys, the touched items per dimension,
//! the rename/copy map and the failed tests, so that is all they carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Seconds in one experience bucket
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Kind of entity whose experience is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Author,
    Reviewer,
    File,
    Directory,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Author,
        Dimension::Reviewer,
        Dimension::File,
        Dimension::Directory,
    ];

    /// Whether the dimension counts contributing commits instead of events
    ///
    /// A commit touching ten files must count once toward a directory holding
    /// all ten, so files and directories keep the commit ids themselves.
    pub fn is_complex(self) -> bool {
        matches!(self, Dimension::File | Dimension::Directory)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Author => "author",
            Dimension::Reviewer => "reviewer",
            Dimension::File => "file",
            Dimension::Directory => "directory",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a commit is a regular change or a backout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitType {
    Normal,
    Backout,
}

impl CommitType {
    pub const ALL: [CommitType; 2] = [CommitType::Normal, CommitType::Backout];
}

/// One commit, in push order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Revision hash
    pub node: String,

    pub author: String,

    /// Reviewers (may be empty)
    #[serde(default)]
    pub reviewers: Vec<String>,

    /// Push date as unix seconds
    pub pushdate: i64,

    /// Files touched by the commit
    #[serde(default)]
    pub files: Vec<String>,

    /// Renames and copies recorded by the commit, as (original, copy)
    #[serde(default)]
    pub file_copies: Vec<(String, String)>,

    /// Defect this commit refers to, if any
    #[serde(default)]
    pub bug_id: Option<u64>,

    /// Commit excluded from experience accounting (e.g. bulk updates)
    #[serde(default)]
    pub ignored: bool,

    #[serde(default)]
    pub backout: bool,
}

impl CommitRecord {
    pub fn commit_type(&self) -> CommitType {
        if self.backout {
            CommitType::Backout
        } else {
            CommitType::Normal
        }
    }

    /// Only eligible commits add to experience counters
    pub fn is_eligible(&self) -> bool {
        !self.ignored && self.bug_id.is_some()
    }

    pub fn directories(&self) -> Vec<String> {
        directories_of(&self.files)
    }

    /// Entities touched in `dimension`
    pub fn entities(&self, dimension: Dimension) -> Vec<String> {
        match dimension {
            Dimension::Author => vec![self.author.clone()],
            Dimension::Reviewer => self.reviewers.clone(),
            Dimension::File => self.files.clone(),
            Dimension::Directory => self.directories(),
        }
    }
}

/// One CI push with the items its commits touched and its test outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushRecord {
    /// Revisions in the push, newest first
    pub revisions: Vec<String>,

    /// Files touched by any commit of the push
    #[serde(default)]
    pub files: Vec<String>,

    /// Tests that failed because of this push
    #[serde(default)]
    pub failures: Vec<String>,
}

impl PushRecord {
    /// Distinct file types touched, see [`file_type`]
    pub fn types(&self) -> Vec<String> {
        let types: BTreeSet<String> = self.files.iter().map(|f| file_type(f)).collect();
        types.into_iter().collect()
    }

    pub fn directories(&self) -> Vec<String> {
        directories_of(&self.files)
    }

    pub fn distinct_files(&self) -> Vec<String> {
        let files: BTreeSet<&String> = self.files.iter().collect();
        files.into_iter().cloned().collect()
    }

    pub fn is_failure(&self, test: &str) -> bool {
        self.failures.iter().any(|f| f == test)
    }
}

/// Top-level and second-level directories of the given files
///
/// `a/b/c/file.cpp` contributes `a` and `a/b`; files at the root contribute
/// nothing. The result is sorted and de-duplicated.
///
/// # Example
///
/// ```
/// use testwise::commit::directories_of;
///
/// let dirs = directories_of(&["sw/source/core/doc.cxx".to_string(), "README".to_string()]);
/// assert_eq!(dirs, vec!["sw".to_string(), "sw/source".to_string()]);
/// ```
pub fn directories_of<S: AsRef<str>>(files: &[S]) -> Vec<String> {
    let mut directories = BTreeSet::new();

    for path in files {
        let Some((parent, _)) = path.as_ref().rsplit_once('/') else {
            continue;
        };
        if parent.is_empty() {
            continue;
        }

        let mut parts = parent.splitn(3, '/');
        if let Some(first) = parts.next() {
            directories.insert(first.to_string());
            if let Some(second) = parts.next() {
                directories.insert(format!("{}/{}", first, second));
            }
        }
    }

    directories.into_iter().collect()
}

const TYPES_BY_EXTENSION: &[(&str, &[&str])] = &[
    ("Assembly", &["asm", "S"]),
    ("Javascript", &["js", "jsm", "sjs", "mjs", "jsx"]),
    ("C/C++", &["c", "cpp", "cc", "cxx", "h", "hh", "hpp", "hxx"]),
    ("Objective-C/C++", &["mm", "m"]),
    ("Java", &["java"]),
    ("Python", &["py"]),
    ("Rust", &["rs"]),
    ("Kotlin", &["kt"]),
    ("HTML/XHTML/XUL", &["html", "htm", "xhtml", "xht", "xul"]),
    ("IDL/IPDL/WebIDL", &["idl", "ipdl", "webidl"]),
    ("YAML", &["yaml", "yml"]),
    (
        "Image",
        &[
            "png", "jpg", "jpeg", "gif", "bmp", "ico", "icns", "psd", "tiff", "ttf", "bcmap",
            "webp",
        ],
    ),
    ("Archive", &["zip", "gz", "bz2", "tar", "xpi", "jar"]),
    ("Video", &["mp4", "webm", "ogv", "avi", "mov", "m4s", "mgif"]),
    ("Audio", &["mp3", "ogg", "wav", "flac", "opus"]),
    ("Executable", &["exe", "dll", "so", "class"]),
    ("Document", &["pdf", "doc", "otf"]),
    ("Documentation", &["rst", "md"]),
    ("Build System File", &["build", "mk", "in"]),
];

/// Coarse type of a file, used as the item of the `type` failure scope
///
/// Files under a `qa` directory are tests. Known extensions map to a
/// language or asset family; unknown extensions map to the extension
/// itself (with its dot), and files without one to the empty string.
pub fn file_type(path: &str) -> String {
    if path.split('/').any(|component| component == "qa") {
        return "Test".to_string();
    }

    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return String::new();
    };

    let lowered = ext.to_lowercase();
    TYPES_BY_EXTENSION
        .iter()
        .find(|(_, exts)| exts.iter().any(|e| e.to_lowercase() == lowered))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| format!(".{}", lowered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directories_of_two_levels() {
        let files = vec![
            "a/b/c/d.rs".to_string(),
            "a/x.rs".to_string(),
            "top.rs".to_string(),
        ];
        assert_eq!(directories_of(&files), vec!["a", "a/b"]);
    }

    #[test]
    fn test_directories_of_empty() {
        let files: Vec<String> = Vec::new();
        assert!(directories_of(&files).is_empty());
    }

    #[test]
    fn test_file_type_known_and_unknown() {
        assert_eq!(file_type("sw/source/doc.cxx"), "C/C++");
        assert_eq!(file_type("sw/qa/extras/test.cxx"), "Test");
        assert_eq!(file_type("docs/README.MD"), "Documentation");
        assert_eq!(file_type("config/thing.xcu"), ".xcu");
        assert_eq!(file_type("Makefile"), "");
    }

    #[test]
    fn test_commit_eligibility() {
        let mut commit = CommitRecord {
            node: "abc".to_string(),
            bug_id: Some(1),
            ..Default::default()
        };
        assert!(commit.is_eligible());

        commit.ignored = true;
        assert!(!commit.is_eligible());

        commit.ignored = false;
        commit.bug_id = None;
        assert!(!commit.is_eligible());
    }

    #[test]
    fn test_push_types_are_distinct() {
        let push = PushRecord {
            files: vec!["a/x.cxx".into(), "a/y.hxx".into(), "b/z.py".into()],
            ..Default::default()
        };
        assert_eq!(push.types(), vec!["C/C++", "Python"]);
    }
}
