//! TF-IDF ranking report.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;

use crate::config::DEFAULT_MAX_RESULTS;
use crate::index::IndexManager;

/// Average TF-IDF of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocScore {
    pub document: PathBuf,
    pub score: f64,
}

impl DocScore {
    /// File name shown in reports, or the full path if it has none.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.document.file_name().map_or_else(
            || self.document.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

/// Ranks documents by average TF-IDF and renders reports.
#[derive(Debug, Clone, Copy)]
pub struct RankingManager {
    max_results: usize,
}

impl Default for RankingManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESULTS)
    }
}

impl RankingManager {
    /// Create a manager whose `render` shows `max_results` documents.
    #[must_use]
    pub const fn new(max_results: usize) -> Self {
        Self { max_results }
    }

    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Top `max_results` documents, best first.
    ///
    /// Ties keep the index's discovery order. Documents not yet indexed
    /// score 0 and are still ranked.
    #[must_use]
    pub fn ranking(&self, max_results: usize, index: &IndexManager) -> Vec<DocScore> {
        let mut scores: Vec<DocScore> = index
            .documents()
            .into_iter()
            .map(|document| {
                let score = index.average_tf_idf(&document);
                DocScore { document, score }
            })
            .collect();

        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(max_results);
        scores
    }

    /// Render the top `max_results` documents as text.
    #[must_use]
    pub fn report(&self, max_results: usize, index: &IndexManager) -> String {
        tracing::debug!(
            max_results,
            terms = ?index.vocabulary(),
            documents = index.size(),
            "Computing TF/IDF ranking"
        );
        let scores = self.ranking(max_results, index);
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
        render(max_results, &scores, &timestamp)
    }

    /// Render a report with this manager's configured result count.
    #[must_use]
    pub fn render(&self, index: &IndexManager) -> String {
        self.report(self.max_results, index)
    }

    /// Write a report to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails.
    pub fn write_report<W: Write>(
        &self,
        max_results: usize,
        index: &IndexManager,
        sink: &mut W,
    ) -> io::Result<()> {
        sink.write_all(self.report(max_results, index).as_bytes())?;
        sink.flush()
    }
}

fn render(max_results: usize, scores: &[DocScore], timestamp: &str) -> String {
    let header = format!("Top {max_results} TF/IDF results [{timestamp}]");
    let ruler = "-".repeat(header.chars().count());

    let mut out = format!("\n{header}\n{ruler}\n");
    for score in scores {
        let _ = writeln!(out, "[{}] {:.4}", score.display_name(), score.score);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocTerm;
    use std::path::Path;

    fn sample_index() -> IndexManager {
        let index = IndexManager::default();
        index.set_vocabulary(["rust", "tokio"]);

        let a = Path::new("/docs/a.txt");
        let b = Path::new("/docs/b.txt");
        let c = Path::new("/docs/c.txt");
        index.insert_stats(a, [DocTerm::new("rust", a, 1, 10)]);
        index.insert_stats(
            b,
            [DocTerm::new("rust", b, 4, 10), DocTerm::new("tokio", b, 2, 10)],
        );
        index.insert_stats(c, [DocTerm::new("other", c, 1, 3)]);
        index
    }

    #[test]
    fn test_render_format() {
        let scores = vec![
            DocScore {
                document: PathBuf::from("/docs/b.txt"),
                score: 0.123_456,
            },
            DocScore {
                document: PathBuf::from("/docs/a.txt"),
                score: 0.0,
            },
        ];
        let text = render(5, &scores, "2020-01-01T10:00:00.000");

        assert_eq!(
            text,
            "\nTop 5 TF/IDF results [2020-01-01T10:00:00.000]\n\
             ----------------------------------------------\n\
             [b.txt] 0.1235\n\
             [a.txt] 0.0000\n"
        );
    }

    #[test]
    fn test_ranking_order() {
        let index = sample_index();
        let ranking = RankingManager::default().ranking(5, &index);

        let names: Vec<String> = ranking.iter().map(DocScore::display_name).collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "c.txt"]);
        assert!(ranking[0].score > ranking[1].score);
        assert!(ranking[2].score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_ranking_limit_and_ties() {
        let index = IndexManager::default();
        index.set_vocabulary(["rust"]);
        for name in ["z.txt", "m.txt", "a.txt"] {
            index.add_document(format!("/docs/{name}"));
        }

        let ranking = RankingManager::default().ranking(2, &index);
        let names: Vec<String> = ranking.iter().map(DocScore::display_name).collect();
        assert_eq!(names, vec!["z.txt", "m.txt"]);
    }

    #[test]
    fn test_report_lines() {
        let index = sample_index();
        let report = RankingManager::new(2).render(&index);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("Top 2 TF/IDF results ["));
        assert_eq!(lines[2].len(), lines[1].len());
        assert!(lines[2].chars().all(|c| c == '-'));
        assert!(lines[3].starts_with("[b.txt] "));
        assert!(lines[4].starts_with("[a.txt] "));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_write_report() {
        let index = sample_index();
        let mut sink = Vec::new();
        RankingManager::default()
            .write_report(1, &index, &mut sink)
            .unwrap();

        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("Top 1 TF/IDF results"));
        assert!(text.contains("[b.txt]"));
        assert!(!text.contains("[a.txt]"));
    }

    #[test]
    fn test_empty_index_report() {
        let report = RankingManager::default().render(&IndexManager::default());
        assert_eq!(report.lines().count(), 3);
    }
}
