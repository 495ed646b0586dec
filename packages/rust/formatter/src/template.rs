//! Named minijinja templates.

use chrono::Utc;
use minijinja::{Environment, context};

use outputkit_shared::{OutputKitError, Result, StructuredOutput};

use crate::FormatOptions;

#[derive(Debug)]
pub(crate) struct TemplateStore {
    env: Environment<'static>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self {
            env: Environment::new(),
        }
    }
}

impl TemplateStore {
    pub(crate) fn add(&mut self, name: String, source: String) -> Result<()> {
        self.env
            .add_template_owned(name, source)
            .map_err(|e| OutputKitError::Template(e.to_string()))
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.env.templates().map(|(name, _)| name.to_string()).collect();
        names.sort();
        names
    }

    /// Render `name` with the output, its parts, the options, and `now`
    /// in the context.
    pub(crate) fn render(
        &self,
        name: &str,
        output: &StructuredOutput,
        options: &FormatOptions,
    ) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| OutputKitError::Template(e.to_string()))?;

        template
            .render(context! {
                output => output.to_dict()?,
                metadata => output.metadata(),
                content => output.content(),
                sections => output.sections(),
                tags => output.tags(),
                keywords => output.keywords(),
                validation => output.validation(),
                options => options,
                now => Utc::now().to_rfc3339(),
            })
            .map_err(|e| OutputKitError::Template(e.to_string()))
    }
}
