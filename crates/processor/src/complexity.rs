//! Weighted complexity score and split suggestions

use std::collections::BTreeMap;

use common::models::{
    ComplexityLevel, FileChangeRecord, PrMetrics, QualityMetrics, SizeCategory, SizeMetrics,
};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: f64 = 0.1;
pub const MAX_SCORE: f64 = 10.0;

/// Sub-score blend weights: base, file type, size, structural, review
const BLEND: [f64; 5] = [0.30, 0.25, 0.20, 0.15, 0.10];

/// Scale applied to per-file structural weights
const STRUCTURAL_SCALE: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct ComplexityConfig {
    /// Keyed by dotted extension; `""` is files without one
    pub file_type_weights: BTreeMap<String, f64>,
    pub size_multipliers: BTreeMap<SizeCategory, f64>,
    pub new_file_weight: f64,
    pub delete_file_weight: f64,
    pub rename_file_weight: f64,
    pub directory_weight: f64,
    pub review_round_penalty: f64,
    pub comment_density_weight: f64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        let file_type_weights = [
            (".go", 1.2),
            (".java", 1.2),
            (".cpp", 1.3),
            (".c", 1.3),
            (".rs", 1.2),
            (".py", 1.1),
            (".ts", 1.1),
            (".js", 1.0),
            (".tsx", 1.0),
            (".jsx", 1.0),
            (".php", 1.0),
            (".rb", 1.0),
            (".swift", 1.1),
            (".kt", 1.1),
            (".html", 0.7),
            (".css", 0.6),
            (".scss", 0.7),
            (".less", 0.7),
            (".json", 0.5),
            (".xml", 0.6),
            (".yaml", 0.5),
            (".yml", 0.5),
            (".md", 0.4),
            (".txt", 0.3),
            (".toml", 0.5),
            (".ini", 0.4),
            (".conf", 0.4),
            ("", 1.0),
        ]
        .into_iter()
        .map(|(ext, w)| (ext.to_string(), w))
        .collect();

        let size_multipliers = BTreeMap::from([
            (SizeCategory::XS, 0.8),
            (SizeCategory::S, 0.9),
            (SizeCategory::M, 1.0),
            (SizeCategory::L, 1.2),
            (SizeCategory::XL, 1.5),
        ]);

        Self {
            file_type_weights,
            size_multipliers,
            new_file_weight: 1.3,
            delete_file_weight: 0.8,
            rename_file_weight: 0.6,
            directory_weight: 0.1,
            review_round_penalty: 0.15,
            comment_density_weight: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    ByDirectory,
    ByFileType,
}

/// A proposed way to break up an oversized PR
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitSuggestion {
    pub kind: SplitKind,
    pub description: String,
    /// Group name -> file paths
    pub groups: BTreeMap<String, Vec<String>>,
}

pub struct ComplexityAnalyzer {
    config: ComplexityConfig,
}

impl Default for ComplexityAnalyzer {
    fn default() -> Self {
        Self::new(ComplexityConfig::default())
    }
}

impl ComplexityAnalyzer {
    pub fn new(config: ComplexityConfig) -> Self {
        Self { config }
    }

    pub fn analyze_complexity(&self, metrics: &PrMetrics) -> f64 {
        self.score(&metrics.size_metrics, &metrics.quality_metrics)
    }

    /// Blended score in [0.1, 10.0]
    pub fn score(&self, size: &SizeMetrics, quality: &QualityMetrics) -> f64 {
        let parts = [
            base_complexity(size),
            self.file_type_complexity(size),
            self.size_complexity(size),
            self.structural_complexity(size),
            self.review_complexity(size, quality),
        ];
        let blended: f64 = parts.iter().zip(BLEND).map(|(p, w)| p * w).sum();
        if blended.is_nan() {
            return MIN_SCORE;
        }
        blended.clamp(MIN_SCORE, MAX_SCORE)
    }

    /// Lines-weighted mean of per-file type weights
    fn file_type_complexity(&self, size: &SizeMetrics) -> f64 {
        let (weighted, lines) = size
            .file_changes
            .iter()
            .fold((0.0, 0i64), |(weighted, lines), f| {
                let changed = f.lines_changed();
                (
                    weighted + self.file_type_weight(&f.file_type) * changed as f64,
                    lines + changed,
                )
            });
        if lines <= 0 {
            return 1.0;
        }
        weighted / lines as f64
    }

    fn size_complexity(&self, size: &SizeMetrics) -> f64 {
        let category = SizeCategory::from_lines_changed(size.lines_changed);
        self.config
            .size_multipliers
            .get(&category)
            .copied()
            .unwrap_or(1.0)
    }

    fn structural_complexity(&self, size: &SizeMetrics) -> f64 {
        let per_file: f64 = size
            .file_changes
            .iter()
            .map(|f| {
                let mut w = 0.0;
                if f.is_new_file {
                    w += self.config.new_file_weight;
                }
                if f.is_deleted {
                    w += self.config.delete_file_weight;
                }
                if f.is_renamed {
                    w += self.config.rename_file_weight;
                }
                w * STRUCTURAL_SCALE
            })
            .sum();
        1.0 + per_file + size.directory_count.max(0) as f64 * self.config.directory_weight
    }

    fn review_complexity(&self, size: &SizeMetrics, quality: &QualityMetrics) -> f64 {
        let mut complexity = 1.0;
        if quality.review_round_count > 1 {
            complexity +=
                (quality.review_round_count - 1) as f64 * self.config.review_round_penalty;
        }
        if size.files_changed > 0 {
            let density = quality.review_comment_count.max(0) as f64 / size.files_changed as f64;
            complexity += density * self.config.comment_density_weight;
        }
        complexity
    }

    /// Weight for a file type, with or without the leading dot
    pub fn file_type_weight(&self, file_type: &str) -> f64 {
        let key = if file_type.is_empty() || file_type.starts_with('.') {
            file_type.to_string()
        } else {
            format!(".{file_type}")
        };
        self.config
            .file_type_weights
            .get(&key)
            .copied()
            .unwrap_or(1.0)
    }

    /// Complexity of one file: log-scaled size times type and operation weights
    pub fn analyze_file_complexity(&self, file: &FileChangeRecord) -> f64 {
        let base = ((file.lines_changed().max(0) + 1) as f64).log10();
        let mut operation = 1.0;
        if file.is_new_file {
            operation *= self.config.new_file_weight;
        }
        if file.is_deleted {
            operation *= self.config.delete_file_weight;
        }
        if file.is_renamed {
            operation *= self.config.rename_file_weight;
        }
        base * self.file_type_weight(&file.file_type) * operation
    }

    pub fn complexity_level(&self, score: f64) -> ComplexityLevel {
        ComplexityLevel::from_score(score)
    }

    /// Split proposals for L/XL PRs, one per grouping with more than one group
    pub fn suggest_optimal_split(&self, metrics: &PrMetrics) -> Vec<SplitSuggestion> {
        if !metrics.is_large_pr() {
            return Vec::new();
        }
        let files = &metrics.size_metrics.file_changes;
        let mut suggestions = Vec::new();

        let by_dir = group_files(files, |f| parent_dir(&f.file_name).to_string());
        if by_dir.len() > 1 {
            suggestions.push(SplitSuggestion {
                kind: SplitKind::ByDirectory,
                description: "Split by directory to limit the blast radius of each change"
                    .to_string(),
                groups: by_dir,
            });
        }

        let by_type = group_files(files, |f| {
            if f.file_type.is_empty() {
                "other".to_string()
            } else {
                f.file_type.clone()
            }
        });
        if by_type.len() > 1 {
            suggestions.push(SplitSuggestion {
                kind: SplitKind::ByFileType,
                description: "Split by file type so each part goes to the right reviewers"
                    .to_string(),
                groups: by_type,
            });
        }

        suggestions
    }
}

fn base_complexity(size: &SizeMetrics) -> f64 {
    let lines = size.lines_changed.max(0) as f64;
    let files = size.files_changed.max(0) as f64;
    (lines + 1.0).log10() * 0.5 + files.sqrt() * 0.3
}

/// Directory part of a path; `"root"` for top-level files
pub fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => "root",
    }
}

fn group_files(
    files: &[FileChangeRecord],
    key: impl Fn(&FileChangeRecord) -> String,
) -> BTreeMap<String, Vec<String>> {
    files.iter().fold(BTreeMap::new(), |mut groups, f| {
        groups
            .entry(key(f))
            .or_insert_with(Vec::new)
            .push(f.file_name.clone());
        groups
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::models::TimeMetrics;

    fn make_file(name: &str, ty: &str, added: i64, new: bool) -> FileChangeRecord {
        FileChangeRecord {
            file_name: name.to_string(),
            file_type: ty.to_string(),
            lines_added: added,
            lines_deleted: 0,
            is_new_file: new,
            is_deleted: false,
            is_renamed: false,
        }
    }

    fn make_metrics(files: Vec<FileChangeRecord>, lines: i64) -> PrMetrics {
        PrMetrics {
            pr_id: "1".to_string(),
            pr_number: 1,
            title: "Test PR".to_string(),
            author: "alice".to_string(),
            repository: "acme/widgets".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap(),
            merged_at: None,
            size_metrics: SizeMetrics {
                lines_added: lines,
                lines_deleted: 0,
                lines_changed: lines,
                files_changed: files.len() as i64,
                file_type_breakdown: BTreeMap::new(),
                directory_count: 1,
                file_changes: files,
            },
            time_metrics: TimeMetrics::default(),
            quality_metrics: QualityMetrics::default(),
            complexity_score: 0.0,
            size_category: SizeCategory::from_lines_changed(lines),
        }
    }

    #[test]
    fn test_degenerate_input_is_clamped() {
        let analyzer = ComplexityAnalyzer::default();
        let mut m = make_metrics(vec![], 0);
        m.size_metrics.directory_count = 0;
        // 0.25 * 1 + 0.2 * 0.8 + 0.15 * 1 + 0.1 * 1
        let score = analyzer.analyze_complexity(&m);
        assert!((score - 0.66).abs() < 1e-9, "{score}");
        assert!(score >= MIN_SCORE);
    }

    #[test]
    fn test_score_blend() {
        let analyzer = ComplexityAnalyzer::default();
        let m = make_metrics(vec![make_file("src/lib.rs", ".rs", 99, false)], 99);
        // base = 0.5 * log10(100) + 0.3 * 1 = 1.3
        // file type 1.2, size S 0.9, structural 1.1, review 1.0
        let expected = 0.3 * 1.3 + 0.25 * 1.2 + 0.2 * 0.9 + 0.15 * 1.1 + 0.1 * 1.0;
        assert!((analyzer.analyze_complexity(&m) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_score_upper_clamp() {
        let analyzer = ComplexityAnalyzer::default();
        let mut m = make_metrics(vec![], 1_000_000);
        m.size_metrics.files_changed = 5_000;
        m.size_metrics.directory_count = 500;
        assert_eq!(analyzer.analyze_complexity(&m), MAX_SCORE);
    }

    #[test]
    fn test_file_type_weight_normalisation() {
        let analyzer = ComplexityAnalyzer::default();
        assert_eq!(analyzer.file_type_weight("rs"), 1.2);
        assert_eq!(analyzer.file_type_weight(".md"), 0.4);
        assert_eq!(analyzer.file_type_weight(".unknownext"), 1.0);
        assert_eq!(analyzer.file_type_weight(""), 1.0);
    }

    #[test]
    fn test_file_complexity() {
        let analyzer = ComplexityAnalyzer::default();
        let file = make_file("src/new.rs", ".rs", 99, true);
        let expected = 2.0 * 1.2 * 1.3;
        assert!((analyzer.analyze_file_complexity(&file) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_split_only_for_large_prs() {
        let analyzer = ComplexityAnalyzer::default();
        let files = vec![
            make_file("api/handler.rs", ".rs", 300, false),
            make_file("web/app.ts", ".ts", 300, false),
            make_file("README", "", 10, false),
        ];
        let large = make_metrics(files.clone(), 610);
        let suggestions = analyzer.suggest_optimal_split(&large);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].kind, SplitKind::ByDirectory);
        assert_eq!(
            suggestions[0].groups.keys().collect::<Vec<_>>(),
            vec!["api", "root", "web"]
        );
        assert!(suggestions[1].groups.contains_key("other"));

        let small = make_metrics(files, 100);
        assert!(analyzer.suggest_optimal_split(&small).is_empty());
    }

    #[test]
    fn test_split_skips_single_group() {
        let analyzer = ComplexityAnalyzer::default();
        let files = vec![
            make_file("src/a.rs", ".rs", 400, false),
            make_file("src/b.rs", ".rs", 400, false),
        ];
        assert!(analyzer
            .suggest_optimal_split(&make_metrics(files, 800))
            .is_empty());
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("a/b/c.rs"), "a/b");
        assert_eq!(parent_dir("c.rs"), "root");
        assert_eq!(parent_dir("/c.rs"), "root");
    }
}
