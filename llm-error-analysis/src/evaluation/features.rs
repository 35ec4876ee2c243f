//! Surface features extracted from a provider's answer

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::providers::is_sentinel;

const TECHNICAL_KEYWORDS: &[&str] = &[
    "api", "exception", "sql", "timeout", "connection", "database",
    "server", "cache", "token", "request", "response", "authentication",
    "authorization", "bug", "debug", "log", "stack trace", "dependency",
    "module", "framework", "library", "endpoint", "middleware", "error",
    "configuration", "driver", "session", "browser", "element", "selector",
    "null", "pointer", "array", "index", "cast", "argument", "state",
    "assertion", "concurrent", "network", "socket", "dns", "ssl", "tls",
    "firewall", "port", "protocol", "packet", "latency", "bandwidth",
    "memory", "cpu", "disk", "performance", "query", "deadlock", "constraint",
    "csrf", "xss", "injection", "encryption", "version", "deprecated",
    "hata", "veritabanı", "sunucu", "bağlantı", "zaman aşımı", "kimlik doğrulama",
    "yetkilendirme", "günlük", "modül", "kütüphane", "yapılandırma", "sürücü",
    "tarayıcı", "oturum", "dizi", "bellek", "işlemci", "disk", "performans",
    "sorgu", "kilitlenme", "kısıt", "enjeksiyon", "şifreleme", "sürüm",
];

const ERROR_KEYWORDS: &[&str] = &["hata", "error", "kod"];

const SOLUTION_KEYWORDS: &[&str] = &[
    "solution", "fix", "resolve", "solve", "repair", "correct",
    "troubleshoot", "workaround", "approach", "method", "step",
    "çözüm", "düzelt", "çöz", "onar", "yaklaşım", "yöntem", "adım",
];

const CAUSE_KEYWORDS: &[&str] = &[
    "cause", "reason", "because", "due to", "root cause", "origin",
    "neden", "sebep", "çünkü", "nedeniyle", "kaynaklı", "dolayı",
];

const ALTERNATIVE_KEYWORDS: &[&str] = &[
    "alternative", "another", "other method", "different approach",
    "or", "also", "additionally",
    "alternatif", "başka", "diğer", "farklı", "veya", "ayrıca", "ek olarak",
];

const VISUAL_MARKERS: &[&str] = &["✅", "❌", "🔍", "⚠️", "💡", "🚀", "📝", "🎯", "⏱️", "💾"];

/// Countable properties of one response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseFeatures {
    pub word_count: usize,
    pub code_blocks: usize,
    pub headings: usize,
    pub bullet_points: usize,
    pub numbered_lists: usize,
    /// Keyword occurrences, not distinct keywords
    pub technical_terms: usize,
    pub has_error_keyword: bool,
    pub has_solution_keyword: bool,
    pub has_cause_keyword: bool,
    pub has_alternative_keyword: bool,
    pub paragraph_count: usize,
    pub has_visual_markers: bool,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^#+\s").expect("static regex"))
}

fn bullet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*[-*•]\s").expect("static regex"))
}

fn numbered_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s").expect("static regex"))
}

fn sentence_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

/// Extract features; missing and sentinel responses yield all zeros
pub fn extract_features(text: Option<&str>) -> ResponseFeatures {
    let text = match text {
        Some(text) if !text.is_empty() && !is_sentinel(text) => text,
        _ => return ResponseFeatures::default(),
    };
    let lower = text.to_lowercase();

    let sentences: Vec<&str> = sentence_break()
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let avg_sentence_length = if sentences.is_empty() {
        0.0
    } else {
        let words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
        words as f64 / sentences.len() as f64
    };

    ResponseFeatures {
        word_count: text.split_whitespace().count(),
        code_blocks: text.matches("```").count() / 2,
        headings: heading_pattern().find_iter(text).count(),
        bullet_points: bullet_pattern().find_iter(text).count(),
        numbered_lists: numbered_pattern().find_iter(text).count(),
        technical_terms: TECHNICAL_KEYWORDS.iter().map(|kw| lower.matches(kw).count()).sum(),
        has_error_keyword: contains_any(&lower, ERROR_KEYWORDS),
        has_solution_keyword: contains_any(&lower, SOLUTION_KEYWORDS),
        has_cause_keyword: contains_any(&lower, CAUSE_KEYWORDS),
        has_alternative_keyword: contains_any(&lower, ALTERNATIVE_KEYWORDS),
        paragraph_count: text.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
        has_visual_markers: VISUAL_MARKERS.iter().any(|m| text.contains(m)),
        sentence_count: sentences.len(),
        avg_sentence_length,
    }
}

fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED: &str = "## 1. Hatanın Nedeni\n\nBağlantı havuzu tükendiği için sunucu timeout veriyor.\n\n\
## 2. Çözüm Adımları\n\n1. Havuz boyutunu artır.\n2. Sorgu süresini ölç.\n- Log seviyesini düşür\n\n\
```sql\nSHOW PROCESSLIST;\n```\n\n💡 Alternatif olarak okuma replikası ekle!";

    #[test]
    fn test_sentinel_and_missing_are_empty() {
        assert_eq!(extract_features(None), ResponseFeatures::default());
        assert_eq!(extract_features(Some("")), ResponseFeatures::default());
        assert_eq!(
            extract_features(Some("Error: Request failed with status code 500")),
            ResponseFeatures::default()
        );
    }

    #[test]
    fn test_structure_counts() {
        let features = extract_features(Some(STRUCTURED));
        assert_eq!(features.headings, 2);
        assert_eq!(features.numbered_lists, 2);
        assert_eq!(features.bullet_points, 1);
        assert_eq!(features.code_blocks, 1);
        assert_eq!(features.paragraph_count, 6);
        assert!(features.has_visual_markers);
    }

    #[test]
    fn test_keyword_flags() {
        let features = extract_features(Some(STRUCTURED));
        assert!(features.has_error_keyword);
        assert!(features.has_cause_keyword);
        assert!(features.has_solution_keyword);
        assert!(features.has_alternative_keyword);
        assert!(features.technical_terms >= 4);

        let plain = extract_features(Some("Tamam"));
        assert!(!plain.has_cause_keyword);
        assert!(!plain.has_solution_keyword);
        assert_eq!(plain.technical_terms, 0);
    }

    #[test]
    fn test_sentences() {
        let features = extract_features(Some("Bir iki üç. Dört beş! Altı?"));
        assert_eq!(features.word_count, 6);
        assert_eq!(features.sentence_count, 3);
        assert!((features.avg_sentence_length - 2.0).abs() < 1e-9);
    }
}
