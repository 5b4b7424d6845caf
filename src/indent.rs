//! Indentation detection.
//!
//! Infers the indentation unit a document already uses from leading
//! whitespace statistics. Frontmatter and fenced code are scanned too, since
//! code samples and YAML usually carry the author's real convention.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentUnit {
    Space,
    Tab,
}

/// Detected indentation convention of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndentProfile {
    pub unit: IndentUnit,
    /// Spaces per level; always 1 for tabs.
    pub size: usize,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Default for IndentProfile {
    fn default() -> Self {
        Self {
            unit: IndentUnit::Space,
            size: 2,
            confidence: 0.0,
        }
    }
}

impl IndentProfile {
    /// Detect the profile of `text`.
    pub fn detect(text: &str) -> Self {
        IndentDetector::new(text).profile()
    }

    /// One level of indentation.
    pub fn indent_string(&self) -> String {
        match self.unit {
            IndentUnit::Tab => "\t".to_string(),
            IndentUnit::Space => " ".repeat(self.size),
        }
    }

    /// Prefix every non-empty line of `text` with `level` indentation units.
    pub fn with_indent(&self, text: &str, level: usize) -> String {
        let prefix = self.indent_string().repeat(level);
        text.split('\n')
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", prefix, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sample {
    unit: IndentUnit,
    size: usize,
}

/// Raw leading-whitespace statistics collected from a document.
#[derive(Debug, Default, Clone)]
pub struct IndentStats {
    pub indented_lines: usize,
    pub tab_lines: usize,
    pub space_lines: usize,
    samples: Vec<Sample>,
}

pub struct IndentDetector {
    stats: IndentStats,
}

impl IndentDetector {
    pub fn new(text: &str) -> Self {
        Self {
            stats: collect_stats(text),
        }
    }

    pub fn stats(&self) -> &IndentStats {
        &self.stats
    }

    pub fn profile(&self) -> IndentProfile {
        let samples = &self.stats.samples;
        if samples.is_empty() {
            return IndentProfile::default();
        }

        let (unit, size) = if self.stats.tab_lines > self.stats.space_lines {
            (IndentUnit::Tab, 1)
        } else {
            let spaces: Vec<usize> = samples
                .iter()
                .filter(|s| s.unit == IndentUnit::Space && s.size > 0)
                .map(|s| s.size)
                .collect();
            let size = if spaces.is_empty() {
                2
            } else {
                common_indent_size(&spaces)
            };
            (IndentUnit::Space, size)
        };

        let confidence = self.confidence(unit, size);
        IndentProfile {
            unit,
            size,
            confidence,
        }
    }

    fn confidence(&self, unit: IndentUnit, size: usize) -> f64 {
        let samples = &self.stats.samples;
        let total = samples.len();

        let mut frequencies: BTreeMap<usize, usize> = BTreeMap::new();
        for sample in samples.iter().filter(|s| s.unit == IndentUnit::Space) {
            *frequencies.entry(sample.size).or_insert(0) += 1;
        }
        let sizes: Vec<usize> = frequencies.keys().copied().collect();

        let mut progression = true;
        let mut nested = false;
        if sizes.len() > 1 {
            let step = sizes[1] - sizes[0];
            if sizes.windows(2).any(|w| w[1] - w[0] != step) || sizes[0] != step {
                progression = false;
            }
            if progression && sizes.len() >= 3 {
                let max = frequencies.values().copied().max().unwrap_or(0);
                let min = frequencies.values().copied().min().unwrap_or(0);
                if max > min * 2 && total < 10 {
                    progression = false;
                } else {
                    nested = true;
                }
            }
        }

        if sizes.len() > 2 && total < 10 && !progression {
            return 0.3;
        }
        if nested && sizes.len() > 2 {
            return 0.95;
        }

        let consistent = samples
            .iter()
            .filter(|s| {
                s.unit == unit
                    && match unit {
                        IndentUnit::Tab => s.size == 1 || s.size == 2,
                        IndentUnit::Space => s.size % size == 0,
                    }
            })
            .count();
        let inconsistent = total - consistent;
        let ratio = consistent as f64 / total as f64;

        let mut confidence = if inconsistent > 0 {
            let bad = inconsistent as f64 / total as f64;
            if bad > 0.2 {
                (ratio * 0.5).min(0.4)
            } else if bad > 0.1 {
                (ratio * 0.8).min(0.7)
            } else {
                ratio.min(0.85)
            }
        } else {
            0.8 + 0.2 * (total as f64 / 5.0).min(1.0)
        };

        if self.stats.tab_lines > 0 && self.stats.space_lines > 0 {
            confidence *= 0.5;
        }
        confidence
    }
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

fn collect_stats(text: &str) -> IndentStats {
    let mut stats = IndentStats::default();
    let mut in_frontmatter = false;

    for (i, line) in text.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "---" {
            if i == 0 {
                in_frontmatter = true;
                continue;
            } else if in_frontmatter {
                in_frontmatter = false;
                continue;
            }
        }
        // fence markers are skipped, their contents still count
        if trimmed.starts_with("```") {
            continue;
        }

        let indent = leading_whitespace(line);
        if indent.is_empty() {
            continue;
        }
        stats.indented_lines += 1;
        if indent.contains('\t') {
            stats.tab_lines += 1;
            stats.samples.push(Sample {
                unit: IndentUnit::Tab,
                size: indent.chars().filter(|&c| c == '\t').count(),
            });
        } else {
            stats.space_lines += 1;
            stats.samples.push(Sample {
                unit: IndentUnit::Space,
                size: indent.len(),
            });
        }
    }
    stats
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Base indent size from observed space runs: the GCD when it explains
/// more than 80% of them, otherwise the most frequent plausible width.
fn common_indent_size(sizes: &[usize]) -> usize {
    let mut frequencies: BTreeMap<usize, usize> = BTreeMap::new();
    for &size in sizes {
        *frequencies.entry(size).or_insert(0) += 1;
    }

    let divisor = sizes.iter().copied().fold(0, gcd);
    if (2..=4).contains(&divisor) {
        let matching: usize = frequencies
            .iter()
            .filter(|(size, _)| *size % divisor == 0)
            .map(|(_, freq)| freq)
            .sum();
        if matching as f64 / sizes.len() as f64 > 0.8 {
            return divisor;
        }
    }

    let distinct: BTreeSet<usize> = frequencies.keys().copied().collect();
    if distinct.len() == 1 && distinct.contains(&4) {
        return 4;
    }
    if distinct.contains(&4) && distinct.contains(&8) && !distinct.contains(&2) {
        return 4;
    }

    let mut best = 2;
    let mut best_freq = 0;
    for (&size, &freq) in &frequencies {
        if (2..=8).contains(&size) && freq > best_freq {
            best_freq = freq;
            best = size;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_indentation() {
        let profile = IndentProfile::detect("# Title\n\nText\n");
        assert_eq!(profile.size, 2);
        assert_eq!(profile.confidence, 0.0);
    }

    #[test]
    fn test_two_space_nested() {
        let text = "<A>\n  <B>\n    <C>\n      x\n    </C>\n  </B>\n</A>\n";
        let profile = IndentProfile::detect(text);
        assert_eq!(profile.unit, IndentUnit::Space);
        assert_eq!(profile.size, 2);
        assert!(profile.confidence >= 0.9);
    }

    #[test]
    fn test_four_space() {
        let text = "```js\nfunction f() {\n    return 1;\n}\n```\n\n- a\n    - b\n";
        let profile = IndentProfile::detect(text);
        assert_eq!(profile.size, 4);
        assert!(profile.confidence >= 0.7);
    }

    #[test]
    fn test_four_and_eight_prefer_four() {
        assert_eq!(common_indent_size(&[4, 8, 4, 8, 4]), 4);
    }

    #[test]
    fn test_gcd_rejected_falls_back_to_frequency() {
        // gcd 1 is outside [2, 4]
        assert_eq!(common_indent_size(&[3, 3, 3, 2]), 3);
    }

    #[test]
    fn test_tabs_win() {
        let text = "a\n\tb\n\t\tc\n\td\n";
        let profile = IndentProfile::detect(text);
        assert_eq!(profile.unit, IndentUnit::Tab);
        assert_eq!(profile.size, 1);
        assert_eq!(profile.indent_string(), "\t");
    }

    #[test]
    fn test_mixed_tabs_and_spaces_halves_confidence() {
        let text = "a\n\tb\n\tc\n  d\n";
        let profile = IndentProfile::detect(text);
        assert_eq!(profile.unit, IndentUnit::Tab);
        assert!(profile.confidence <= 0.5);
    }

    #[test]
    fn test_noisy_small_document_low_confidence() {
        let text = "a\n  b\n     c\n       d\n";
        let profile = IndentProfile::detect(text);
        assert!((profile.confidence - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_frontmatter_markers_ignored() {
        let text = "---\ntags:\n  - a\n  - b\n---\n\nText\n";
        let detector = IndentDetector::new(text);
        assert_eq!(detector.stats().indented_lines, 2);
        assert_eq!(detector.profile().size, 2);
    }

    #[test]
    fn test_with_indent() {
        let profile = IndentProfile {
            unit: IndentUnit::Space,
            size: 2,
            confidence: 1.0,
        };
        assert_eq!(profile.with_indent("a\n\nb", 2), "    a\n\n    b");
    }
}
