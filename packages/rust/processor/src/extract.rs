//! Source, confidence, section, tag and keyword extraction.
//!
//! Each extractor is a pure function over [`OutputContent`]; the heuristics
//! are regex-based rather than real parsing.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use outputkit_shared::{
    OutputContent, OutputType, Sections, UnitScore, normalize_keywords, normalize_tags,
};

// ---------------------------------------------------------------------------
// Source count
// ---------------------------------------------------------------------------

static SOURCE_MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[[^\]]*?\]\((https?://[^)\s]*)\)").expect("valid regex"));

static SOURCE_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(source:(.*?)\)|\[source:(.*?)\]").expect("valid regex")
});

static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://[^\s]+").expect("valid regex"));

static SOURCE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)source:|\*source\*").expect("valid regex"));

/// Count distinct sources cited in the content. `None` when there are none.
///
/// For mappings an explicit `sources` field wins (sequence length, or line
/// count for text); otherwise the string values are scanned.
pub fn count_sources(content: &OutputContent) -> Option<usize> {
    let count = match content {
        OutputContent::Text(text) => count_text_sources(text),
        OutputContent::Mapping(map) => count_mapping_sources(map),
        OutputContent::Sequence(_) => 0,
    };
    (count > 0).then_some(count)
}

fn count_mapping_sources(map: &Map<String, Value>) -> usize {
    match map.get("sources") {
        Some(Value::Array(items)) => return items.len(),
        Some(Value::String(text)) => return text.split('\n').count(),
        _ => {}
    }

    map.values()
        .filter_map(Value::as_str)
        .map(count_text_sources)
        .sum()
}

/// Scan text for citations. Each match is keyed by what it refers to, and
/// consumed so a later, looser pattern cannot count it again: a Markdown link
/// and the bare URL inside it are one source.
fn count_text_sources(text: &str) -> usize {
    let mut sources: BTreeSet<String> = BTreeSet::new();

    for caps in SOURCE_MD_LINK_RE.captures_iter(text) {
        sources.insert(normalize_url(&caps[1]));
    }
    let rest = SOURCE_MD_LINK_RE.replace_all(text, " ");

    for caps in SOURCE_CITATION_RE.captures_iter(&rest) {
        let cited = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str())
            .trim();
        let key = match BARE_URL_RE.find(cited) {
            Some(url) => normalize_url(url.as_str()),
            None => format!("cite:{}", cited.to_lowercase()),
        };
        sources.insert(key);
    }
    let rest = SOURCE_CITATION_RE.replace_all(&rest, " ");

    for url in BARE_URL_RE.find_iter(&rest) {
        sources.insert(normalize_url(url.as_str()));
    }
    let rest = BARE_URL_RE.replace_all(&rest, " ");

    for label in SOURCE_LABEL_RE.find_iter(&rest) {
        sources.insert(format!("label:{}", label.as_str().to_lowercase()));
    }

    sources.len()
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '"', '\''])
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

const CONFIDENCE_KEYS: [&str; 4] = ["confidence", "confidence_score", "certainty", "quality_score"];

static CONFIDENCE_TEXT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)confidence[:\s]+([0-9.]+)",
        r"(?i)certainty[:\s]+([0-9.]+)",
        r"(?i)quality[:\s]+([0-9.]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Find a self-reported confidence, clamped to `[0, 1]`.
pub fn extract_confidence(content: &OutputContent) -> Option<UnitScore> {
    match content {
        OutputContent::Mapping(map) => CONFIDENCE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(Value::as_f64)
            .map(UnitScore::clamped),
        OutputContent::Text(text) => CONFIDENCE_TEXT_RES.iter().find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps[1].parse::<f64>().ok())
                .map(UnitScore::clamped)
        }),
        OutputContent::Sequence(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

/// Known plain-text section labels and the key each maps to.
static TEXT_SECTION_LABELS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)^(?:summary|executive summary)\s*:", "summary"),
        (r"(?i)^(?:introduction|intro)\s*:", "introduction"),
        (r"(?i)^(?:findings|key findings)\s*:", "findings"),
        (r"(?i)^(?:analysis|detailed analysis)\s*:", "analysis"),
        (r"(?i)^recommendations?\s*:", "recommendations"),
        (r"(?i)^conclusions?\s*:", "conclusion"),
        (r"(?i)^(?:sources?|references?)\s*:", "sources"),
    ]
    .into_iter()
    .map(|(p, name)| (Regex::new(p).expect("valid regex"), name))
    .collect()
});

/// Split content into named sections. `None` when nothing was found.
///
/// Markdown splits on headings, JSON mappings are their own sections, plain
/// text splits on known labels. Other types have no sections.
pub fn organize_sections(content: &OutputContent, output_type: OutputType) -> Option<Sections> {
    let sections = match (output_type, content) {
        (OutputType::Markdown, OutputContent::Text(text)) => parse_markdown_sections(text),
        (OutputType::Json, OutputContent::Mapping(map)) => map.clone(),
        (OutputType::Text, OutputContent::Text(text)) => parse_text_sections(text),
        _ => return None,
    };
    (!sections.is_empty()).then_some(sections)
}

/// Each heading opens a section keyed by its lower-cased, underscored title.
/// Text before the first heading is `introduction`.
pub fn parse_markdown_sections(text: &str) -> Sections {
    let mut builder = SectionBuilder::new("introduction");

    for line in text.lines() {
        match HEADING_RE.captures(line) {
            Some(caps) => {
                let key = caps[2].trim().to_lowercase().replace(' ', "_");
                builder.start(key);
            }
            None => builder.push(line),
        }
    }

    builder.finish()
}

/// Lines such as `Summary:` or `Key Findings:` open a section. Text before the
/// first label is `content`. The label line itself is consumed whole; the body
/// starts on the next line.
pub fn parse_text_sections(text: &str) -> Sections {
    let mut builder = SectionBuilder::new("content");

    for line in text.lines() {
        let label = TEXT_SECTION_LABELS
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, name)| *name);

        match label {
            Some(name) => builder.start(name.to_string()),
            None => builder.push(line),
        }
    }

    builder.finish()
}

/// Accumulates lines under the current section key.
///
/// A section is recorded once it has seen at least one line, even a blank
/// one; a repeated key overwrites the earlier body in its original position.
struct SectionBuilder {
    sections: Sections,
    current: String,
    lines: Vec<String>,
}

impl SectionBuilder {
    fn new(first: &str) -> Self {
        Self {
            sections: Map::new(),
            current: first.to_string(),
            lines: Vec::new(),
        }
    }

    fn start(&mut self, key: String) {
        self.flush();
        self.current = key;
    }

    fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn flush(&mut self) {
        if !self.lines.is_empty() {
            let body = self.lines.join("\n").trim().to_string();
            self.sections.insert(self.current.clone(), Value::String(body));
            self.lines.clear();
        }
    }

    fn finish(mut self) -> Sections {
        self.flush();
        self.sections
    }
}

// ---------------------------------------------------------------------------
// Tags and keywords
// ---------------------------------------------------------------------------

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid regex"));

static TAG_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btags?\s*:\s*([^\n]+)").expect("valid regex"));

static KEYWORD_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bkeywords?\s*:\s*([^\n]+)").expect("valid regex"));

static CAPITALIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid regex"));

/// Tags from an explicit `tags` field, or from hashtags and `Tags:` lines.
pub fn extract_tags(content: &OutputContent) -> Vec<String> {
    let mut candidates = Vec::new();

    match content {
        OutputContent::Mapping(map) => candidates.extend(explicit_terms(map.get("tags"))),
        OutputContent::Text(text) => {
            candidates.extend(HASHTAG_RE.captures_iter(text).map(|c| c[1].to_string()));
            candidates.extend(labelled_terms(&TAG_LABEL_RE, text));
        }
        OutputContent::Sequence(_) => {}
    }

    normalize_tags(candidates)
}

/// Keywords from an explicit `keywords` field, or from `Keywords:` lines and
/// capitalized words.
pub fn extract_keywords(content: &OutputContent) -> Vec<String> {
    let mut candidates = Vec::new();

    match content {
        OutputContent::Mapping(map) => candidates.extend(explicit_terms(map.get("keywords"))),
        OutputContent::Text(text) => {
            candidates.extend(labelled_terms(&KEYWORD_LABEL_RE, text));
            candidates.extend(CAPITALIZED_RE.find_iter(text).map(|m| m.as_str().to_string()));
        }
        OutputContent::Sequence(_) => {}
    }

    normalize_keywords(candidates)
}

fn explicit_terms(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => split_commas(s),
        _ => Vec::new(),
    }
}

fn labelled_terms(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .flat_map(|caps| split_commas(&caps[1]))
        .collect()
}

fn split_commas(s: &str) -> Vec<String> {
    s.split(',').map(|t| t.trim().to_string()).collect()
}
