//! Extension-based classification of remote files
//!
//! Every discovered file is mapped to exactly one [`Action`]. The pointer
//! set is consulted first, so an extension configured in both sets always
//! produces a pointer file.

use std::fmt;

/// What to do with a discovered file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Write a `.strm` pointer file referencing the remote URL
    Pointer,
    /// Download the file byte-for-byte
    FullCopy,
    /// Leave the file alone
    Ignore,
}

impl Action {
    /// Short verb used in log lines and failure messages
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Pointer => "write pointer for",
            Action::FullCopy => "copy",
            Action::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Pointer => "pointer",
            Action::FullCopy => "copy",
            Action::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// Sorted set of extensions, searched with binary search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    exts: Vec<String>,
}

impl ExtensionSet {
    /// Build a set from raw values, taken exactly as given
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exts: Vec<String> = exts.into_iter().map(Into::into).collect();
        exts.sort();
        exts.dedup();
        Self { exts }
    }

    /// Build a set from user input: trims, lower-cases, adds the leading
    /// dot and drops empty items.
    ///
    /// `"MKV, .mp4,,avi"` becomes `[".avi", ".mkv", ".mp4"]`.
    pub fn normalized<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(exts.into_iter().filter_map(|raw| {
            let ext = raw.as_ref().trim().to_lowercase();
            match ext.as_str() {
                "" | "." => None,
                e if e.starts_with('.') => Some(ext),
                _ => Some(format!(".{}", ext)),
            }
        }))
    }

    /// Parse a comma separated list such as `.mkv,.mp4`
    pub fn parse_list(list: &str) -> Self {
        Self::normalized(list.split(','))
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.exts
            .binary_search_by(|probe| probe.as_str().cmp(ext))
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.exts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.exts.iter().map(String::as_str)
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exts.join(","))
    }
}

/// The two configured extension sets plus matching options
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    pointer: ExtensionSet,
    copy: ExtensionSet,
    ignore_case: bool,
}

impl Classifier {
    pub fn new(pointer: ExtensionSet, copy: ExtensionSet) -> Self {
        Self {
            pointer,
            copy,
            ignore_case: false,
        }
    }

    /// Lower-case file extensions before lookup
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn pointer_exts(&self) -> &ExtensionSet {
        &self.pointer
    }

    pub fn copy_exts(&self) -> &ExtensionSet {
        &self.copy
    }

    /// Classify a file name
    pub fn classify(&self, file_name: &str) -> Action {
        let ext = extension(file_name);
        if self.ignore_case {
            self.lookup(&ext.to_lowercase())
        } else {
            self.lookup(ext)
        }
    }

    fn lookup(&self, ext: &str) -> Action {
        if self.pointer.contains(ext) {
            Action::Pointer
        } else if self.copy.contains(ext) {
            Action::FullCopy
        } else {
            Action::Ignore
        }
    }
}

/// Extension of the final path element, from the last `.` to the end
///
/// Returns an empty string when the name has no dot.
pub fn extension(file_name: &str) -> &str {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(idx) => &base[idx..],
        None => "",
    }
}

/// File name with its extension removed
pub fn stem(file_name: &str) -> &str {
    let ext = extension(file_name);
    &file_name[..file_name.len() - ext.len()]
}
