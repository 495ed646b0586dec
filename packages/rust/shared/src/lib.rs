//! Shared types, error model, and configuration for OutputKit.
//!
//! This crate is the foundation depended on by all other OutputKit crates.
//! It provides:
//! - [`OutputKitError`], the unified error type
//! - The output model ([`StructuredOutput`], [`OutputMetadata`], [`OutputValidation`])
//! - Schemas ([`OutputSchema`], [`SchemaPreset`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AggregationConfig, AppConfig, ContentQualityConfig, DefaultsConfig, FormatterConfig,
    ValidationConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{OutputKitError, Result};
pub use schema::{OutputSchema, SchemaPreset};
pub use types::{
    MAX_KEYWORDS, MAX_TAGS, OutputContent, OutputId, OutputMetadata, OutputStatus, OutputSummary,
    OutputType, OutputValidation, Sections, StructuredOutput, StructuredOutputBuilder, UnitScore,
    normalize_keywords, normalize_tags, title_case, to_json_indented, truncate_with_ellipsis,
};
