//! Multi-key ordering of listing entries.
//!
//! A sort specification arrives as a comma separated string such as
//! `"type,-size,name"`. It is parsed once into a [`SortSpec`]; unknown keys
//! are dropped rather than failing the request.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};

use crate::messages::DirectoryEntry;

/// Field an entry can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Type,
    Size,
    Modified,
    Extension,
}

impl SortField {
    /// Look up a field by its query-string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "type" => Some(Self::Type),
            "size" => Some(Self::Size),
            "modified" => Some(Self::Modified),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }

    /// Query-string name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::Size => "size",
            Self::Modified => "modified",
            Self::Extension => "extension",
        }
    }

    /// Ascending comparison of two entries on this field.
    pub fn compare(&self, a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
        match self {
            Self::Name => natural_cmp(&a.name, &b.name),
            Self::Extension => natural_cmp(&a.extension, &b.extension),
            // Directories rank below files
            Self::Type => b.kind.is_dir().cmp(&a.kind.is_dir()),
            Self::Size => a.sort_size().cmp(&b.sort_size()),
            Self::Modified => a.modified.cmp(&b.modified),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// A field paired with a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    /// Parse a single token, e.g. `"-size"`.
    fn parse(token: &str) -> Option<Self> {
        let (direction, name) = match token.strip_prefix('-') {
            Some(rest) => (SortDirection::Descending, rest),
            None => (SortDirection::Ascending, token),
        };
        SortField::from_name(name).map(|field| Self { field, direction })
    }

    fn compare(&self, a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
        let ord = self.field.compare(a, b);
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == SortDirection::Descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

/// Ordered list of sort keys, left-to-right priority. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl Default for SortSpec {
    /// Directories first, then by name.
    fn default() -> Self {
        Self {
            keys: vec![SortKey::asc(SortField::Type), SortKey::asc(SortField::Name)],
        }
    }
}

impl SortSpec {
    /// Build a spec from explicit keys, falling back to the default if empty.
    pub fn new(keys: Vec<SortKey>) -> Self {
        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    /// Parse a comma separated spec. Invalid tokens are discarded.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').filter_map(SortKey::parse).collect())
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compare two entries. Ties on every key fall back to name ascending.
    pub fn compare(&self, a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
        self.keys
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| natural_cmp(&a.name, &b.name))
    }

    /// Stable in-place sort.
    pub fn sort(&self, entries: &mut [DirectoryEntry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Case-insensitive natural-order comparison.
///
/// Runs of ASCII digits compare by numeric value, so `"file2"` sorts before
/// `"file10"`. Everything else compares by lowercased character.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_digits(&mut a);
                let rhs = take_digits(&mut b);
                let ord = cmp_digit_runs(&lhs, &rhs);
                if ord.is_ne() {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord.is_ne() {
                    return ord;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

/// Compare two digit runs by value without parsing (runs may overflow u64).
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::EntryKind;

    fn file(name: &str, size: u64, modified: u64) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            kind: EntryKind::File,
            extension: name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .unwrap_or_default(),
            size: Some(size),
            modified,
            permissions: "0644".to_string(),
            downloadable: true,
        }
    }

    fn dir(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            kind: EntryKind::Directory,
            extension: String::new(),
            size: None,
            modified: 0,
            permissions: "0755".to_string(),
            downloadable: false,
        }
    }

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_parse_default_when_empty() {
        assert_eq!(SortSpec::parse(""), SortSpec::default());
        assert_eq!(SortSpec::parse("bogus,-nope"), SortSpec::default());
        assert_eq!(SortSpec::parse("").to_string(), "type,name");
    }

    #[test]
    fn test_parse_directions() {
        let spec = SortSpec::parse("-size,name");
        assert_eq!(
            spec.keys(),
            &[SortKey::desc(SortField::Size), SortKey::asc(SortField::Name)]
        );
    }

    #[test]
    fn test_parse_drops_unknown_tokens() {
        let spec = SortSpec::parse("owner,-modified,,--name,extension");
        assert_eq!(
            spec.keys(),
            &[
                SortKey::desc(SortField::Modified),
                SortKey::asc(SortField::Extension)
            ]
        );
        assert_eq!(spec.to_string(), "-modified,extension");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(SortSpec::parse("NAME"), SortSpec::default());
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_cmp("File10", "file2"), Ordering::Greater);
        assert_eq!(natural_cmp("ABC", "abc"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
        assert_eq!(natural_cmp("img007", "img7"), Ordering::Equal);
        assert_eq!(
            natural_cmp("x99999999999999999999999", "x100000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(natural_cmp("", ""), Ordering::Equal);
    }

    #[test]
    fn test_default_sort_puts_directories_first() {
        let mut entries = vec![file("b.txt", 1, 0), dir("A")];
        SortSpec::parse("not-a-key").sort(&mut entries);
        assert_eq!(names(&entries), vec!["A", "b.txt"]);
    }

    #[test]
    fn test_size_ascending_directory_sentinel() {
        let mut entries = vec![file("a.txt", 100, 0), dir("B")];
        SortSpec::parse("size").sort(&mut entries);
        assert_eq!(names(&entries), vec!["B", "a.txt"]);

        // Zero-byte files still rank after directories
        let mut entries = vec![file("empty", 0, 0), dir("B")];
        SortSpec::parse("size").sort(&mut entries);
        assert_eq!(names(&entries), vec!["B", "empty"]);
    }

    #[test]
    fn test_name_descending_keeps_case_ties_stable() {
        let mut entries = vec![file("b", 1, 0), file("a", 1, 0), file("B", 1, 0)];
        SortSpec::parse("-name").sort(&mut entries);
        assert_eq!(names(&entries), vec!["b", "B", "a"]);
    }

    #[test]
    fn test_tiebreak_is_name_ascending() {
        let mut entries = vec![
            file("c.txt", 10, 0),
            file("a.txt", 10, 0),
            file("b.txt", 10, 0),
        ];
        SortSpec::parse("-size").sort(&mut entries);
        assert_eq!(names(&entries), vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_multi_key() {
        let mut entries = vec![
            file("notes.md", 5, 30),
            file("a.txt", 20, 10),
            dir("src"),
            file("b.txt", 20, 5),
            file("log.txt", 1, 40),
        ];
        SortSpec::parse("type,extension,-size").sort(&mut entries);
        assert_eq!(
            names(&entries),
            vec!["src", "notes.md", "a.txt", "b.txt", "log.txt"]
        );
    }

    #[test]
    fn test_modified_descending() {
        let mut entries = vec![
            file("old", 1, 100),
            file("new", 1, 300),
            file("mid", 1, 200),
        ];
        SortSpec::parse("-modified").sort(&mut entries);
        assert_eq!(names(&entries), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_type_descending_puts_files_first() {
        let mut entries = vec![dir("docs"), file("a.txt", 1, 0)];
        SortSpec::parse("-type").sort(&mut entries);
        assert_eq!(names(&entries), vec!["a.txt", "docs"]);
    }

    #[test]
    fn test_natural_name_order() {
        let mut entries = vec![
            file("file10", 1, 0),
            file("file2", 1, 0),
            file("File1", 1, 0),
        ];
        SortSpec::parse("name").sort(&mut entries);
        assert_eq!(names(&entries), vec!["File1", "file2", "file10"]);
    }
}
