//! Rule-based validation of structured outputs.
//!
//! An [`OutputValidator`] combines an optional [`OutputSchema`], the fixed
//! built-in rule set and caller-supplied custom rules into one
//! [`OutputValidation`] with a weighted score.

mod rules;

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use outputkit_shared::{OutputSchema, OutputValidation, StructuredOutput};

pub use rules::{built_in_rules, business_rule, content_quality_rule};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// The predicate behind a [`ValidationRule`].
///
/// `Ok(true)` passes, `Ok(false)` fails with the rule's message, and `Err`
/// fails with the returned explanation.
pub trait RuleCheck: Send + Sync {
    fn check(&self, output: &StructuredOutput) -> std::result::Result<bool, String>;
}

impl<F> RuleCheck for F
where
    F: Fn(&StructuredOutput) -> std::result::Result<bool, String> + Send + Sync,
{
    fn check(&self, output: &StructuredOutput) -> std::result::Result<bool, String> {
        self(output)
    }
}

/// A named, weighted predicate over a [`StructuredOutput`].
#[derive(Clone)]
pub struct ValidationRule {
    pub name: String,
    pub description: String,
    /// Reported when the predicate returns `false`.
    pub error_message: String,
    /// Failures become warnings unless validation runs in strict mode.
    pub warning_only: bool,
    /// Contribution to the weighted score.
    pub weight: f64,
    check: Arc<dyn RuleCheck>,
}

impl ValidationRule {
    /// A rule with weight 1.0 whose failures are errors.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        error_message: impl Into<String>,
        check: impl RuleCheck + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            error_message: error_message.into(),
            warning_only: false,
            weight: 1.0,
            check: Arc::new(check),
        }
    }

    /// Build a rule from an infallible predicate.
    pub fn from_fn(
        name: impl Into<String>,
        description: impl Into<String>,
        error_message: impl Into<String>,
        check: impl Fn(&StructuredOutput) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            description,
            error_message,
            move |output: &StructuredOutput| -> std::result::Result<bool, String> {
                Ok(check(output))
            },
        )
    }

    pub fn warning_only(mut self) -> Self {
        self.warning_only = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Run the predicate. Returns `(passed, message)`; the message is empty
    /// on success. An error or a panic inside the predicate is a failure.
    pub fn evaluate(&self, output: &StructuredOutput) -> (bool, String) {
        match catch_unwind(AssertUnwindSafe(|| self.check.check(output))) {
            Ok(Ok(true)) => (true, String::new()),
            Ok(Ok(false)) => (false, self.error_message.clone()),
            Ok(Err(e)) => (false, format!("Validation error in {}: {e}", self.name)),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "rule panicked".to_string());
                (false, format!("Validation error in {}: {reason}", self.name))
            }
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("warning_only", &self.warning_only)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates outputs against a schema, the built-in rules and custom rules.
#[derive(Debug, Clone)]
pub struct OutputValidator {
    built_in: Vec<ValidationRule>,
    custom: Vec<ValidationRule>,
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputValidator {
    pub fn new() -> Self {
        Self {
            built_in: built_in_rules(),
            custom: Vec::new(),
        }
    }

    pub fn built_in(&self) -> &[ValidationRule] {
        &self.built_in
    }

    pub fn custom_rules(&self) -> &[ValidationRule] {
        &self.custom
    }

    /// Register a custom rule used whenever a call supplies none.
    pub fn add_custom_rule(&mut self, rule: ValidationRule) {
        info!(rule = %rule.name, "added custom validation rule");
        self.custom.push(rule);
    }

    /// Remove the first custom rule with this name. Returns whether one was removed.
    pub fn remove_custom_rule(&mut self, name: &str) -> bool {
        match self.custom.iter().position(|r| r.name == name) {
            Some(idx) => {
                self.custom.remove(idx);
                info!(rule = name, "removed custom validation rule");
                true
            }
            None => false,
        }
    }

    /// Validate one output.
    ///
    /// Schema checks run first, then the built-in rules, then the custom
    /// rules. `custom_rules` replaces the stored custom set for this call
    /// when non-empty. Failure messages are prefixed with the rule name.
    /// In strict mode warning-only failures are errors.
    #[instrument(skip_all, fields(agent_role = %output.metadata().agent_role, strict_mode = strict_mode))]
    pub fn validate(
        &self,
        output: &StructuredOutput,
        schema: Option<&OutputSchema>,
        custom_rules: Option<&[ValidationRule]>,
        strict_mode: bool,
    ) -> OutputValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut requirements: BTreeMap<String, bool> = BTreeMap::new();

        if let Some(schema) = schema {
            let schema_result = schema.validate_output(output);
            errors.extend_from_slice(schema_result.errors());
            warnings.extend_from_slice(schema_result.warnings());
            requirements.extend(
                schema_result
                    .requirements_met()
                    .iter()
                    .map(|(k, v)| (k.clone(), *v)),
            );
        }

        let custom = match custom_rules {
            Some(rules) if !rules.is_empty() => rules,
            _ => self.custom.as_slice(),
        };

        for rule in self.built_in.iter().chain(custom) {
            let (passed, message) = rule.evaluate(output);
            if !passed {
                let entry = format!("{}: {message}", rule.name);
                if rule.warning_only && !strict_mode {
                    warnings.push(entry);
                } else {
                    errors.push(entry);
                }
            }
            requirements.insert(rule.name.clone(), passed);
        }

        let validation = OutputValidation::from_requirements(errors, warnings, requirements, |name| {
            self.built_in
                .iter()
                .chain(custom)
                .find(|r| r.name == name)
                .map_or(1.0, |r| r.weight)
        });

        debug!(
            is_valid = validation.is_valid(),
            score = validation.validation_score(),
            errors = validation.errors().len(),
            warnings = validation.warnings().len(),
            "validated output"
        );
        validation
    }

    /// Validate each output independently.
    pub fn validate_many(
        &self,
        outputs: &[StructuredOutput],
        schema: Option<&OutputSchema>,
        custom_rules: Option<&[ValidationRule]>,
        strict_mode: bool,
    ) -> Vec<OutputValidation> {
        outputs
            .iter()
            .map(|o| self.validate(o, schema, custom_rules, strict_mode))
            .collect()
    }

    /// Aggregate statistics over several verdicts. `None` for an empty list.
    pub fn summarize(validations: &[OutputValidation]) -> Option<ValidationSummary> {
        if validations.is_empty() {
            return None;
        }

        let total = validations.len();
        let valid_count = validations.iter().filter(|v| v.is_valid()).count();
        let scores: Vec<f64> = validations.iter().map(|v| v.validation_score()).collect();

        Some(ValidationSummary {
            total_validations: total,
            valid_count,
            invalid_count: total - valid_count,
            success_rate: valid_count as f64 / total as f64,
            total_errors: validations.iter().map(|v| v.errors().len()).sum(),
            total_warnings: validations.iter().map(|v| v.warnings().len()).sum(),
            avg_validation_score: scores.iter().sum::<f64>() / total as f64,
            min_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Statistics over a batch of validations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub total_validations: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub success_rate: f64,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub avg_validation_score: f64,
    pub min_score: f64,
    pub max_score: f64,
}
