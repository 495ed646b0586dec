//! Core domain types for structured agent outputs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{OutputKitError, Result};

/// Maximum number of tags kept on an output.
pub const MAX_TAGS: usize = 10;

/// Maximum number of keywords kept on an output.
pub const MAX_KEYWORDS: usize = 15;

/// Named sections of an output, in insertion order.
pub type Sections = Map<String, Value>;

// ---------------------------------------------------------------------------
// OutputId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for output identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputId(pub Uuid);

impl OutputId {
    /// Generate a new time-sortable output identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OutputId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OutputId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// OutputType / OutputStatus
// ---------------------------------------------------------------------------

/// Content type of an output, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Text,
    Json,
    Markdown,
    Html,
    Csv,
    Xml,
    Yaml,
}

impl OutputType {
    /// Lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputType {
    type Err = OutputKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "yaml" => Ok(Self::Yaml),
            other => Err(OutputKitError::parse(format!("unknown output type: {other}"))),
        }
    }
}

/// Processing status of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Success,
    Partial,
    Failed,
    Pending,
}

impl OutputStatus {
    /// Lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }

    /// Rank used when combining statuses: lower is worse.
    ///
    /// `failed < pending < partial < success`.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Failed => 0,
            Self::Pending => 1,
            Self::Partial => 2,
            Self::Success => 3,
        }
    }
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UnitScore
// ---------------------------------------------------------------------------

/// A score guaranteed to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct UnitScore(f64);

impl UnitScore {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);

    /// Validate a raw value. Rejects NaN, infinities and anything outside `[0, 1]`.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OutputKitError::validation(format!(
                "score {value} is outside the range [0, 1]"
            )))
        }
    }

    /// Clamp a raw value into range. NaN maps to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// The underlying value.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for UnitScore {
    type Error = OutputKitError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UnitScore> for f64 {
    fn from(score: UnitScore) -> Self {
        score.0
    }
}

impl fmt::Display for UnitScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OutputContent
// ---------------------------------------------------------------------------

/// The payload of an output: free text, a mapping, or a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputContent {
    Text(String),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
}

impl OutputContent {
    /// Wrap an arbitrary JSON value. Scalars other than strings are stringified.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            Value::Array(items) => Self::Sequence(items),
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }

    /// Borrow the text payload, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the mapping payload, if this is a mapping.
    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Whether the payload is a mapping or a sequence.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Text(_))
    }

    /// String coercion used by rules, previews and renderers.
    ///
    /// Text is returned verbatim; structured payloads become compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Mapping(map) => Value::Object(map.clone()).to_string(),
            Self::Sequence(items) => Value::Array(items.clone()).to_string(),
        }
    }

    /// Count words.
    ///
    /// Text is stripped of HTML tags, Markdown links and Markdown punctuation
    /// first. Mappings and sequences sum the words of their direct string
    /// values; nested containers are not visited.
    pub fn word_count(&self) -> usize {
        static HTML_TAG_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
        static MD_LINK_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\[.*?\]\(.*?\)").expect("valid regex"));
        static MD_PUNCT_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"[#*_`]").expect("valid regex"));

        fn string_leaf_words<'a>(values: impl Iterator<Item = &'a Value>) -> usize {
            values
                .filter_map(Value::as_str)
                .map(|s| s.split_whitespace().count())
                .sum()
        }

        match self {
            Self::Text(text) => {
                let clean = HTML_TAG_RE.replace_all(text, "");
                let clean = MD_LINK_RE.replace_all(&clean, "");
                let clean = MD_PUNCT_RE.replace_all(&clean, "");
                clean.split_whitespace().count()
            }
            Self::Mapping(map) => string_leaf_words(map.values()),
            Self::Sequence(items) => string_leaf_words(items.iter()),
        }
    }

    /// Convert into a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Mapping(map) => Value::Object(map.clone()),
            Self::Sequence(items) => Value::Array(items.clone()),
        }
    }
}

impl fmt::Display for OutputContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<&str> for OutputContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for OutputContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Map<String, Value>> for OutputContent {
    fn from(map: Map<String, Value>) -> Self {
        Self::Mapping(map)
    }
}

impl From<Vec<Value>> for OutputContent {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

// ---------------------------------------------------------------------------
// OutputMetadata
// ---------------------------------------------------------------------------

/// Provenance and derived counts for a single output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// ID of the agent that produced the output.
    pub agent_id: String,
    /// Role of the agent.
    pub agent_role: String,
    /// ID of the task that generated the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Name of the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    /// ID of the parent workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// When the output was generated. Fixed at creation.
    timestamp: DateTime<Utc>,
    /// Time taken to generate the output, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// Number of tokens consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    /// Model used for generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Confidence in the output quality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<UnitScore>,
    /// Number of sources cited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_count: Option<usize>,
    /// Word count of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
}

impl OutputMetadata {
    /// Metadata stamped with the current time.
    pub fn new(agent_id: impl Into<String>, agent_role: impl Into<String>) -> Self {
        Self::at(agent_id, agent_role, Utc::now())
    }

    /// Metadata stamped with an explicit creation time.
    pub fn at(
        agent_id: impl Into<String>,
        agent_role: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_role: agent_role.into(),
            task_id: None,
            task_name: None,
            workflow_id: None,
            timestamp,
            execution_time: None,
            tokens_used: None,
            model_used: None,
            confidence_score: None,
            source_count: None,
            word_count: None,
        }
    }

    /// Creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Confidence as a plain float.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence_score.map(UnitScore::get)
    }
}

// ---------------------------------------------------------------------------
// OutputValidation
// ---------------------------------------------------------------------------

/// Immutable validation verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValidation {
    is_valid: bool,
    validation_score: UnitScore,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    requirements_met: BTreeMap<String, bool>,
}

impl OutputValidation {
    /// Build a verdict, scoring requirements with per-name weights.
    ///
    /// The score is the weighted fraction of satisfied requirements; no
    /// requirements at all scores 1.0. Validity is "no errors".
    pub fn from_requirements(
        errors: Vec<String>,
        warnings: Vec<String>,
        requirements_met: BTreeMap<String, bool>,
        weight_of: impl Fn(&str) -> f64,
    ) -> Self {
        let validation_score = if requirements_met.is_empty() {
            UnitScore::ONE
        } else {
            let (met, total) =
                requirements_met
                    .iter()
                    .fold((0.0, 0.0), |(met, total), (name, ok)| {
                        let weight = weight_of(name);
                        (if *ok { met + weight } else { met }, total + weight)
                    });
            if total > 0.0 {
                UnitScore::clamped(met / total)
            } else {
                UnitScore::ZERO
            }
        };

        Self {
            is_valid: errors.is_empty(),
            validation_score,
            errors,
            warnings,
            requirements_met,
        }
    }

    /// True iff there are no errors.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Weighted fraction of satisfied requirements.
    pub fn validation_score(&self) -> f64 {
        self.validation_score.get()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn requirements_met(&self) -> &BTreeMap<String, bool> {
        &self.requirements_met
    }
}

// ---------------------------------------------------------------------------
// StructuredOutput
// ---------------------------------------------------------------------------

/// The canonical, normalized record for one agent's result.
///
/// `id`, `content` and `output_type` are fixed once built. Status and
/// validation change only through the dedicated methods below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    id: OutputId,
    content: OutputContent,
    output_type: OutputType,
    status: OutputStatus,
    metadata: OutputMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation: Option<OutputValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sections: Option<Sections>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    processing_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_details: Option<String>,
}

impl StructuredOutput {
    /// Start building an output with status `success`.
    pub fn builder(
        content: impl Into<OutputContent>,
        output_type: OutputType,
        metadata: OutputMetadata,
    ) -> StructuredOutputBuilder {
        StructuredOutputBuilder {
            content: content.into(),
            output_type,
            metadata,
            status: OutputStatus::Success,
            validation: None,
            sections: None,
            tags: Vec::new(),
            keywords: Vec::new(),
            processing_notes: Vec::new(),
            error_details: None,
        }
    }

    /// A failed text output carrying the error message.
    pub fn failed(
        content: impl Into<String>,
        metadata: OutputMetadata,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "unknown error".to_string()
        } else {
            error
        };

        Self {
            id: OutputId::new(),
            content: OutputContent::Text(content.into()),
            output_type: OutputType::Text,
            status: OutputStatus::Failed,
            metadata,
            validation: None,
            sections: None,
            tags: Vec::new(),
            keywords: Vec::new(),
            processing_notes: Vec::new(),
            error_details: Some(error),
        }
    }

    pub fn id(&self) -> &OutputId {
        &self.id
    }

    pub fn content(&self) -> &OutputContent {
        &self.content
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub fn status(&self) -> OutputStatus {
        self.status
    }

    pub fn metadata(&self) -> &OutputMetadata {
        &self.metadata
    }

    /// Mutable access for metadata filled in after creation.
    pub fn metadata_mut(&mut self) -> &mut OutputMetadata {
        &mut self.metadata
    }

    pub fn validation(&self) -> Option<&OutputValidation> {
        self.validation.as_ref()
    }

    pub fn sections(&self) -> Option<&Sections> {
        self.sections.as_ref()
    }

    /// Number of parsed sections (zero when none).
    pub fn section_count(&self) -> usize {
        self.sections.as_ref().map_or(0, Map::len)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn processing_notes(&self) -> &[String] {
        &self.processing_notes
    }

    pub fn error_details(&self) -> Option<&str> {
        self.error_details.as_deref()
    }

    /// Validation score, if a verdict is attached.
    pub fn validation_score(&self) -> Option<f64> {
        self.validation.as_ref().map(OutputValidation::validation_score)
    }

    /// Attach the latest validation verdict, replacing any earlier one.
    pub fn attach_validation(&mut self, validation: OutputValidation) {
        self.validation = Some(validation);
    }

    /// Downgrade a successful output to partial and record why.
    pub fn downgrade_to_partial(&mut self, note: impl Into<String>) {
        if self.status == OutputStatus::Success {
            self.status = OutputStatus::Partial;
        }
        self.processing_notes.push(note.into());
    }

    /// Append a processing observation.
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.processing_notes.push(note.into());
    }

    /// Full object as a JSON value (timestamps as ISO-8601 strings).
    pub fn to_dict(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Full object as pretty JSON with the given indent width.
    pub fn to_json(&self, indent: usize) -> Result<String> {
        to_json_indented(self, indent)
    }

    /// Compact record for listings.
    pub fn get_summary(&self) -> OutputSummary {
        OutputSummary {
            id: self.id.clone(),
            agent_role: self.metadata.agent_role.clone(),
            status: self.status,
            output_type: self.output_type,
            timestamp: self.metadata.timestamp,
            word_count: self.metadata.word_count,
            validation_score: self.validation_score(),
            tags: self.tags.iter().take(5).cloned().collect(),
            has_errors: self
                .validation
                .as_ref()
                .is_some_and(|v| !v.errors.is_empty()),
        }
    }

    /// Content truncated to `max_length` characters, with `...` when cut.
    pub fn get_content_preview(&self, max_length: usize) -> String {
        truncate_with_ellipsis(&self.content.to_text(), max_length)
    }
}

/// Builder for [`StructuredOutput`].
#[derive(Debug, Clone)]
pub struct StructuredOutputBuilder {
    content: OutputContent,
    output_type: OutputType,
    metadata: OutputMetadata,
    status: OutputStatus,
    validation: Option<OutputValidation>,
    sections: Option<Sections>,
    tags: Vec<String>,
    keywords: Vec<String>,
    processing_notes: Vec<String>,
    error_details: Option<String>,
}

impl StructuredOutputBuilder {
    pub fn status(mut self, status: OutputStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validation(mut self, validation: Option<OutputValidation>) -> Self {
        self.validation = validation;
        self
    }

    pub fn sections(mut self, sections: Option<Sections>) -> Self {
        self.sections = sections;
        self
    }

    /// Tags are lower-cased, `#`-stripped, deduplicated and capped.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Keywords are lower-cased, deduplicated and capped.
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = normalize_keywords(keywords);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.processing_notes.push(note.into());
        self
    }

    pub fn notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.processing_notes.extend(notes);
        self
    }

    pub fn error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }

    /// Finish the output. A `failed` status requires non-empty error details.
    pub fn build(self) -> Result<StructuredOutput> {
        let has_details = self
            .error_details
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        if self.status == OutputStatus::Failed && !has_details {
            return Err(OutputKitError::validation(
                "a failed output must carry error details",
            ));
        }

        Ok(StructuredOutput {
            id: OutputId::new(),
            content: self.content,
            output_type: self.output_type,
            status: self.status,
            metadata: self.metadata,
            validation: self.validation,
            sections: self.sections,
            tags: self.tags,
            keywords: self.keywords,
            processing_notes: self.processing_notes,
            error_details: self.error_details,
        })
    }
}

/// Compact listing view of an output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSummary {
    pub id: OutputId,
    pub agent_role: String,
    pub status: OutputStatus,
    pub output_type: OutputType,
    pub timestamp: DateTime<Utc>,
    pub word_count: Option<usize>,
    pub validation_score: Option<f64>,
    pub tags: Vec<String>,
    pub has_errors: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize tag candidates: trim, strip `#`, lower-case, dedupe, cap at [`MAX_TAGS`].
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize_terms(tags, MAX_TAGS, |t| t.trim().trim_matches('#').trim().to_lowercase())
}

/// Normalize keyword candidates: trim, lower-case, dedupe, cap at [`MAX_KEYWORDS`].
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize_terms(keywords, MAX_KEYWORDS, |k| k.trim().to_lowercase())
}

fn normalize_terms<I, S>(terms: I, cap: usize, clean: impl Fn(&str) -> String) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for term in terms {
        let cleaned = clean(term.as_ref());
        if cleaned.is_empty() || out.contains(&cleaned) {
            continue;
        }
        out.push(cleaned);
        if out.len() == cap {
            break;
        }
    }
    out
}

/// Truncate to `max_chars` characters, appending `...` if anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Title-case a snake_case key: `key_findings` -> `Key Findings`.
///
/// Every letter that follows a non-letter is upper-cased, the rest lower-cased.
pub fn title_case(key: &str) -> String {
    let mut title = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        if prev_alpha {
            title.extend(c.to_lowercase());
        } else {
            title.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    title
}

/// Serialize as pretty JSON with a custom indent width.
pub fn to_json_indented<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| OutputKitError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> StructuredOutput {
        StructuredOutput::builder(
            "# Report\n\nSome findings here.",
            OutputType::Markdown,
            OutputMetadata::new("agent_1", "Researcher"),
        )
        .tags(["#AI", "ai", "Research"])
        .build()
        .expect("build output")
    }

    #[test]
    fn output_id_roundtrip() {
        let id = OutputId::new();
        let parsed: OutputId = id.to_string().parse().expect("parse OutputId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn unit_score_rejects_out_of_range() {
        assert!(UnitScore::new(0.5).is_ok());
        assert!(UnitScore::new(1.5).is_err());
        assert!(UnitScore::new(-0.1).is_err());
        assert!(UnitScore::new(f64::NAN).is_err());
        assert_eq!(UnitScore::clamped(7.0).get(), 1.0);
        assert_eq!(UnitScore::clamped(f64::NAN).get(), 0.0);
    }

    #[test]
    fn unit_score_deserialization_checks_range() {
        assert!(serde_json::from_str::<UnitScore>("0.25").is_ok());
        assert!(serde_json::from_str::<UnitScore>("3.0").is_err());
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&OutputType::Markdown).unwrap(), "\"markdown\"");
        assert_eq!(serde_json::to_string(&OutputStatus::Partial).unwrap(), "\"partial\"");
        assert_eq!("CSV".parse::<OutputType>().unwrap(), OutputType::Csv);
        assert!("pdf".parse::<OutputType>().is_err());
    }

    #[test]
    fn status_rank_orders_worst_first() {
        assert!(OutputStatus::Failed.rank() < OutputStatus::Partial.rank());
        assert!(OutputStatus::Partial.rank() < OutputStatus::Success.rank());
    }

    #[test]
    fn builder_normalizes_tags() {
        let output = sample_output();
        assert_eq!(output.tags(), ["ai", "research"]);
        assert_eq!(output.status(), OutputStatus::Success);
    }

    #[test]
    fn tags_and_keywords_are_capped() {
        let many: Vec<String> = (0..40).map(|i| format!("term{i}")).collect();
        let output = StructuredOutput::builder("x", OutputType::Text, OutputMetadata::new("a", "b"))
            .tags(&many)
            .keywords(&many)
            .build()
            .unwrap();
        assert_eq!(output.tags().len(), MAX_TAGS);
        assert_eq!(output.keywords().len(), MAX_KEYWORDS);
    }

    #[test]
    fn failed_status_requires_details() {
        let result = StructuredOutput::builder("x", OutputType::Text, OutputMetadata::new("a", "b"))
            .status(OutputStatus::Failed)
            .build();
        assert!(result.is_err());

        let failed = StructuredOutput::failed("raw", OutputMetadata::new("a", "b"), "");
        assert_eq!(failed.status(), OutputStatus::Failed);
        assert_eq!(failed.error_details(), Some("unknown error"));
    }

    #[test]
    fn downgrade_only_touches_success() {
        let mut output = sample_output();
        output.downgrade_to_partial("Validation failed with 2 errors");
        assert_eq!(output.status(), OutputStatus::Partial);
        assert_eq!(output.processing_notes().len(), 1);

        let mut failed = StructuredOutput::failed("raw", OutputMetadata::new("a", "b"), "boom");
        failed.downgrade_to_partial("note");
        assert_eq!(failed.status(), OutputStatus::Failed);
    }

    #[test]
    fn to_dict_roundtrips_through_json() {
        let output = sample_output();
        let dict = output.to_dict().unwrap();
        let json = serde_json::to_string(&dict).unwrap();
        let parsed: StructuredOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), output.id());
        assert_eq!(parsed.status(), output.status());
        assert_eq!(parsed.output_type(), output.output_type());
        assert!(dict["metadata"]["timestamp"].is_string());
    }

    #[test]
    fn to_json_respects_indent() {
        let output = sample_output();
        let json = output.to_json(4).unwrap();
        assert!(json.contains("\n    \"id\""));
    }

    #[test]
    fn content_preview_truncates_on_chars() {
        let output = StructuredOutput::builder(
            "héllo wörld, this is long",
            OutputType::Text,
            OutputMetadata::new("a", "b"),
        )
        .build()
        .unwrap();
        assert_eq!(output.get_content_preview(5), "héllo...");
        assert_eq!(output.get_content_preview(500), "héllo wörld, this is long");
    }

    #[test]
    fn summary_reports_first_five_tags() {
        let output = StructuredOutput::builder("x", OutputType::Text, OutputMetadata::new("a", "Writer"))
            .tags(["a", "b", "c", "d", "e", "f", "g"])
            .build()
            .unwrap();
        let summary = output.get_summary();
        assert_eq!(summary.tags.len(), 5);
        assert_eq!(summary.agent_role, "Writer");
        assert!(!summary.has_errors);
        assert_eq!(summary.validation_score, None);
    }

    #[test]
    fn weighted_score_uses_weights() {
        let mut reqs = BTreeMap::new();
        reqs.insert("heavy".to_string(), true);
        reqs.insert("light".to_string(), false);
        let v = OutputValidation::from_requirements(vec![], vec!["w".into()], reqs, |name| {
            if name == "heavy" { 3.0 } else { 1.0 }
        });
        assert!(v.is_valid());
        assert!((v.validation_score() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_requirements_score_one() {
        let v = OutputValidation::from_requirements(vec![], vec![], BTreeMap::new(), |_| 1.0);
        assert_eq!(v.validation_score(), 1.0);
        assert!(v.is_valid());
    }

    #[test]
    fn structured_content_stringifies_as_json() {
        let mut map = Map::new();
        map.insert("k".into(), Value::from("v"));
        let content = OutputContent::Mapping(map);
        assert_eq!(content.to_text(), r#"{"k":"v"}"#);
        assert!(content.is_structured());
        assert_eq!(OutputContent::from_value(Value::from(42)).to_text(), "42");
    }

    #[test]
    fn word_count_strips_markup() {
        let content =
            OutputContent::from("# Title\n\nSome **bold** text and a [link](http://example.com).");
        // the link is dropped whole, the trailing "." survives as a word
        assert_eq!(content.word_count(), 7);
        assert_eq!(OutputContent::from("<p>two words</p>").word_count(), 2);
    }

    #[test]
    fn word_count_structured_is_shallow() {
        let mut map = Map::new();
        map.insert("a".into(), Value::from("one two"));
        map.insert("b".into(), serde_json::json!({"nested": "ignored words"}));
        map.insert("c".into(), Value::from(5));
        assert_eq!(OutputContent::Mapping(map).word_count(), 2);

        let items = vec![Value::from("three little words"), Value::from(7), Value::from("x")];
        assert_eq!(OutputContent::Sequence(items).word_count(), 4);
    }

    #[test]
    fn title_case_keys() {
        assert_eq!(title_case("key_findings"), "Key Findings");
        assert_eq!(title_case("EXECUTIVE_summary"), "Executive Summary");
        assert_eq!(title_case("3rd_party"), "3Rd Party");
    }
}
