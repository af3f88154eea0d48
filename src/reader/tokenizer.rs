//! Line-oriented document tokenizer.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use crate::config::DEFAULT_SEPARATOR;
use crate::error::ReaderError;
use crate::index::DocTerm;

/// Lazy token stream over any buffered source.
///
/// Lines are pulled one at a time and split on the separator. Empty tokens
/// (repeated separators, blank lines) are skipped.
pub struct Tokens<'a, R> {
    lines: Lines<R>,
    separator: &'a str,
    pending: std::vec::IntoIter<String>,
}

impl<'a, R: BufRead> Tokens<'a, R> {
    /// Create a token stream splitting on `separator`.
    pub fn new(source: R, separator: &'a str) -> Self {
        Self {
            lines: source.lines(),
            separator,
            pending: Vec::new().into_iter(),
        }
    }
}

impl<R: BufRead> Iterator for Tokens<'_, R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.next() {
                return Some(Ok(token));
            }

            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };

            self.pending = line
                .split(self.separator)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
                .into_iter();
        }
    }
}

/// Reads documents and gathers term statistics for a vocabulary.
#[derive(Debug, Clone)]
pub struct TokenizingReader {
    separator: String,
}

impl Default for TokenizingReader {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl TokenizingReader {
    /// Create a reader splitting tokens on `separator`.
    #[must_use]
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Token separator in use.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Read a whole document and count every vocabulary term.
    ///
    /// One `DocTerm` is returned per vocabulary term, including terms that
    /// never occur (occurrences = 0). All share the document's word count.
    /// The file is closed before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be opened or a line cannot
    /// be read.
    pub fn read_terms(
        &self,
        path: &Path,
        vocabulary: &[String],
    ) -> std::result::Result<Vec<DocTerm>, ReaderError> {
        let file = File::open(path).map_err(|source| ReaderError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut counts: HashMap<&str, u64> =
            vocabulary.iter().map(|term| (term.as_str(), 0)).collect();
        let mut word_count = 0_u64;

        for token in Tokens::new(BufReader::new(file), &self.separator) {
            let token = token.map_err(|source| ReaderError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            word_count += 1;
            if let Some(count) = counts.get_mut(token.as_str()) {
                *count += 1;
            }
        }

        tracing::trace!(path = %path.display(), word_count, "Document tokenized");

        Ok(vocabulary
            .iter()
            .map(|term| {
                let occurrences = counts.get(term.as_str()).copied().unwrap_or(0);
                DocTerm::new(term.clone(), path, occurrences, word_count)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn vocab(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn test_tokens_split_lines() {
        let source = Cursor::new("Dummy string\nfor test purposes\n");
        let tokens: Vec<String> = Tokens::new(source, " ").map(Result::unwrap).collect();
        assert_eq!(tokens, vec!["Dummy", "string", "for", "test", "purposes"]);
    }

    #[test]
    fn test_tokens_skip_empty() {
        let source = Cursor::new("a  b\n\n   \nc");
        let tokens: Vec<String> = Tokens::new(source, " ").map(Result::unwrap).collect();
        assert_eq!(tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tokens_custom_separator() {
        let source = Cursor::new("red,green,,blue");
        let tokens: Vec<String> = Tokens::new(source, ",").map(Result::unwrap).collect();
        assert_eq!(tokens, vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_tokens_invalid_utf8_is_error() {
        let source = Cursor::new(vec![0x66_u8, 0x6f, 0xff, 0xfe]);
        let mut tokens = Tokens::new(source, " ");
        assert!(tokens.next().unwrap().is_err());
    }

    #[test]
    fn test_read_terms_counts() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("doc1.txt");
        fs::write(&doc, "Dummy string for test purposes\n").unwrap();

        let reader = TokenizingReader::default();
        let stats = reader
            .read_terms(&doc, &vocab(&["Dummy", "test", "missing"]))
            .unwrap();

        assert_eq!(stats.len(), 3);
        for stat in &stats {
            assert_eq!(stat.word_count(), 5);
            assert_eq!(stat.document(), doc.as_path());
        }
        assert_eq!(stats[0].occurrences(), 1);
        assert_eq!(stats[1].occurrences(), 1);
        assert_eq!(stats[2].occurrences(), 0);
    }

    #[test]
    fn test_read_terms_repeated_and_case_sensitive() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("doc.txt");
        fs::write(&doc, "rust Rust rust\nrust").unwrap();

        let stats = TokenizingReader::default()
            .read_terms(&doc, &vocab(&["rust", "Rust"]))
            .unwrap();

        assert_eq!(stats[0].occurrences(), 3);
        assert_eq!(stats[1].occurrences(), 1);
        assert_eq!(stats[0].word_count(), 4);
    }

    #[test]
    fn test_read_terms_empty_vocabulary() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("doc.txt");
        fs::write(&doc, "some words").unwrap();

        let stats = TokenizingReader::default().read_terms(&doc, &[]).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn test_read_terms_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = TokenizingReader::default()
            .read_terms(&tmp.path().join("gone.txt"), &vocab(&["a"]))
            .unwrap_err();
        assert!(matches!(err, ReaderError::Open { .. }));
    }

    #[test]
    fn test_read_terms_binary_file() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("blob.bin");
        fs::write(&doc, [0xff_u8, 0xfe, 0x00, 0x81]).unwrap();

        let err = TokenizingReader::default()
            .read_terms(&doc, &vocab(&["a"]))
            .unwrap_err();
        assert!(matches!(err, ReaderError::Read { .. }));
    }
}
