//! Declarative output schemas and the reference presets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OutputKitError, Result};
use crate::types::{OutputValidation, StructuredOutput, UnitScore};

// ---------------------------------------------------------------------------
// OutputSchema
// ---------------------------------------------------------------------------

/// Structural and quality expectations for one category of output.
///
/// `required_fields`, `optional_fields`, `field_types` and
/// `format_requirements` are descriptive only; [`OutputSchema::validate_output`]
/// checks word counts, confidence, sources and required sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
    #[serde(default)]
    pub field_types: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_word_count: Option<usize>,
    #[serde(default)]
    pub required_sections: Vec<String>,
    #[serde(default)]
    pub format_requirements: Map<String, Value>,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: UnitScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_sources: Option<usize>,
}

fn default_version() -> String {
    "1.0".into()
}

fn default_min_confidence() -> UnitScore {
    UnitScore::clamped(0.7)
}

impl OutputSchema {
    /// An empty schema that imposes no checks.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: default_version(),
            required_fields: Vec::new(),
            optional_fields: Vec::new(),
            field_types: BTreeMap::new(),
            min_word_count: None,
            max_word_count: None,
            required_sections: Vec::new(),
            format_requirements: Map::new(),
            min_confidence: default_min_confidence(),
            required_sources: None,
        }
    }

    /// Check an output against this schema.
    ///
    /// Each check only fires when the metadata it reads is present and
    /// non-zero. Section checks only run when the output has parsed sections.
    /// The score is the unweighted fraction of satisfied requirements.
    pub fn validate_output(&self, output: &StructuredOutput) -> OutputValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut requirements = BTreeMap::new();
        let metadata = output.metadata();

        let word_count = metadata.word_count.filter(|&wc| wc > 0);

        if let (Some(min), Some(wc)) = (self.min_word_count.filter(|&m| m > 0), word_count) {
            let ok = wc >= min;
            requirements.insert("min_word_count".to_string(), ok);
            if !ok {
                errors.push(format!("Word count {wc} below minimum {min}"));
            }
        }

        if let (Some(max), Some(wc)) = (self.max_word_count.filter(|&m| m > 0), word_count) {
            let ok = wc <= max;
            requirements.insert("max_word_count".to_string(), ok);
            if !ok {
                warnings.push(format!("Word count {wc} exceeds maximum {max}"));
            }
        }

        if let Some(confidence) = metadata.confidence().filter(|&c| c > 0.0) {
            let min = self.min_confidence.get();
            let ok = confidence >= min;
            requirements.insert("min_confidence".to_string(), ok);
            if !ok {
                warnings.push(format!(
                    "Confidence score {confidence} below minimum {min}"
                ));
            }
        }

        if let (Some(required), Some(found)) = (
            self.required_sources.filter(|&r| r > 0),
            metadata.source_count.filter(|&s| s > 0),
        ) {
            let ok = found >= required;
            requirements.insert("required_sources".to_string(), ok);
            if !ok {
                errors.push(format!(
                    "Source count {found} below required {required}"
                ));
            }
        }

        let sections = output.sections().filter(|s| !s.is_empty());
        if let Some(sections) = sections {
            for name in &self.required_sections {
                let ok = sections.contains_key(name);
                requirements.insert(format!("section_{name}"), ok);
                if !ok {
                    errors.push(format!("Required section '{name}' missing"));
                }
            }
        }

        OutputValidation::from_requirements(errors, warnings, requirements, |_| 1.0)
    }

    /// Reference schema for research reports.
    pub fn research() -> Self {
        Self {
            required_fields: strings(&["findings", "sources", "summary"]),
            optional_fields: strings(&["statistics", "quotes", "trends"]),
            min_word_count: Some(500),
            max_word_count: Some(5000),
            required_sections: strings(&["executive_summary", "key_findings", "sources"]),
            required_sources: Some(3),
            ..Self::new("research_output", "Schema for research task outputs")
        }
    }

    /// Reference schema for written content pieces.
    pub fn content() -> Self {
        Self {
            required_fields: strings(&["title", "content", "meta_description"]),
            optional_fields: strings(&["tags", "keywords", "call_to_action"]),
            min_word_count: Some(800),
            max_word_count: Some(3000),
            required_sections: strings(&["introduction", "body", "conclusion"]),
            min_confidence: UnitScore::clamped(0.8),
            ..Self::new("content_output", "Schema for content creation outputs")
        }
    }

    /// Reference schema for analysis reports.
    pub fn analysis() -> Self {
        Self {
            required_fields: strings(&["analysis", "insights", "recommendations"]),
            optional_fields: strings(&["data_points", "charts", "metrics"]),
            min_word_count: Some(300),
            max_word_count: Some(2000),
            required_sections: strings(&["overview", "detailed_analysis", "recommendations"]),
            required_sources: Some(2),
            ..Self::new("analysis_output", "Schema for analytical task outputs")
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// SchemaPreset
// ---------------------------------------------------------------------------

/// Named reference schemas, addressable from config and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPreset {
    Research,
    Content,
    Analysis,
}

impl SchemaPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Content => "content",
            Self::Analysis => "analysis",
        }
    }

    /// Build the schema for this preset.
    pub fn schema(&self) -> OutputSchema {
        match self {
            Self::Research => OutputSchema::research(),
            Self::Content => OutputSchema::content(),
            Self::Analysis => OutputSchema::analysis(),
        }
    }
}

impl fmt::Display for SchemaPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaPreset {
    type Err = OutputKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "research" => Ok(Self::Research),
            "content" => Ok(Self::Content),
            "analysis" => Ok(Self::Analysis),
            other => Err(OutputKitError::config(format!(
                "unknown schema preset: {other} (expected research, content or analysis)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputMetadata, OutputType};

    fn output_with(word_count: Option<usize>, sources: Option<usize>) -> StructuredOutput {
        let mut metadata = OutputMetadata::new("agent_0", "Researcher");
        metadata.word_count = word_count;
        metadata.source_count = sources;
        StructuredOutput::builder("body", OutputType::Text, metadata)
            .build()
            .unwrap()
    }

    #[test]
    fn empty_schema_scores_one() {
        let schema = OutputSchema::new("empty", "no checks");
        let v = schema.validate_output(&output_with(Some(10), None));
        assert!(v.is_valid());
        assert_eq!(v.validation_score(), 1.0);
        assert!(v.requirements_met().is_empty());
    }

    #[test]
    fn research_flags_short_output() {
        let v = OutputSchema::research().validate_output(&output_with(Some(100), Some(1)));
        assert!(!v.is_valid());
        assert_eq!(v.errors().len(), 2);
        assert_eq!(v.requirements_met().get("min_word_count"), Some(&false));
        assert_eq!(v.requirements_met().get("max_word_count"), Some(&true));
        assert!((v.validation_score() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn exceeding_max_is_a_warning() {
        let v = OutputSchema::research().validate_output(&output_with(Some(9000), Some(5)));
        assert!(v.is_valid());
        assert_eq!(v.warnings().len(), 1);
        assert!(v.warnings()[0].contains("exceeds maximum 5000"));
    }

    #[test]
    fn missing_metadata_skips_checks() {
        let v = OutputSchema::analysis().validate_output(&output_with(None, None));
        assert!(v.is_valid());
        assert!(v.requirements_met().is_empty());
    }

    #[test]
    fn low_confidence_warns() {
        let mut output = output_with(None, None);
        output.metadata_mut().confidence_score = Some(UnitScore::new(0.5).unwrap());
        let v = OutputSchema::content().validate_output(&output);
        assert!(v.is_valid());
        assert_eq!(v.requirements_met().get("min_confidence"), Some(&false));
        assert!(v.warnings()[0].starts_with("Confidence score 0.5 below minimum 0.8"));
    }

    #[test]
    fn required_sections_checked_when_present() {
        let mut sections = Map::new();
        sections.insert("executive_summary".into(), Value::from("..."));
        let output = StructuredOutput::builder(
            "x",
            OutputType::Markdown,
            OutputMetadata::new("a", "Researcher"),
        )
        .sections(Some(sections))
        .build()
        .unwrap();

        let v = OutputSchema::research().validate_output(&output);
        assert_eq!(v.requirements_met().get("section_executive_summary"), Some(&true));
        assert_eq!(v.requirements_met().get("section_key_findings"), Some(&false));
        assert!(v.errors().contains(&"Required section 'sources' missing".to_string()));
    }

    #[test]
    fn presets_match_reference_values() {
        let research = OutputSchema::research();
        assert_eq!(research.description, "Schema for research task outputs");
        assert_eq!(research.min_word_count, Some(500));
        assert_eq!(research.max_word_count, Some(5000));
        assert_eq!(research.required_sources, Some(3));
        assert_eq!(research.min_confidence.get(), 0.7);
        assert_eq!(research.required_sections, ["executive_summary", "key_findings", "sources"]);
        assert_eq!(research.required_fields, ["findings", "sources", "summary"]);
        assert_eq!(research.optional_fields, ["statistics", "quotes", "trends"]);

        let content = OutputSchema::content();
        assert_eq!(content.description, "Schema for content creation outputs");
        assert_eq!(content.min_word_count, Some(800));
        assert_eq!(content.max_word_count, Some(3000));
        assert_eq!(content.required_sources, None);
        assert_eq!(content.min_confidence.get(), 0.8);
        assert_eq!(content.required_sections, ["introduction", "body", "conclusion"]);
        assert_eq!(content.required_fields, ["title", "content", "meta_description"]);
        assert_eq!(content.optional_fields, ["tags", "keywords", "call_to_action"]);

        let analysis = OutputSchema::analysis();
        assert_eq!(analysis.description, "Schema for analytical task outputs");
        assert_eq!(analysis.min_word_count, Some(300));
        assert_eq!(analysis.max_word_count, Some(2000));
        assert_eq!(analysis.required_sources, Some(2));
        assert_eq!(analysis.min_confidence.get(), 0.7);
        assert_eq!(analysis.required_sections, ["overview", "detailed_analysis", "recommendations"]);
        assert_eq!(analysis.required_fields, ["analysis", "insights", "recommendations"]);
        assert_eq!(analysis.optional_fields, ["data_points", "charts", "metrics"]);
    }

    #[test]
    fn analysis_accepts_default_confidence() {
        let mut output = output_with(None, None);
        output.metadata_mut().confidence_score = Some(UnitScore::new(0.72).unwrap());
        let v = OutputSchema::analysis().validate_output(&output);
        assert_eq!(v.requirements_met().get("min_confidence"), Some(&true));
        assert!(v.warnings().is_empty());
    }

    #[test]
    fn preset_names_parse() {
        assert_eq!("Research".parse::<SchemaPreset>().unwrap(), SchemaPreset::Research);
        assert_eq!(SchemaPreset::Analysis.schema().required_sources, Some(2));
        assert!("legal".parse::<SchemaPreset>().is_err());
    }
}
