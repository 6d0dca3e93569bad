//! Prompt templates for rfpflow generation stages
//!
//! Templates are plain text with `{field}` placeholders. Rendering fills each
//! placeholder from a [`PromptContext`]; a placeholder with no value in the
//! context is a resolution error, never an empty substitution. `{{` and `}}`
//! render as literal braces. Braces that do not wrap an identifier (JSON
//! examples such as `{"vendor": ...}`) are left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .unwrap_or_else(|e| unreachable!("placeholder pattern is valid: {e}"))
});

/// Errors raised while resolving a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Template references fields missing from context: {}", missing.join(", "))]
    MissingFields { missing: Vec<String> },
}

/// Named values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    values: BTreeMap<String, String>,
}

impl PromptContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Placeholder names referenced by `template`, sorted and deduplicated.
///
/// ```rust
/// use rfpflow_prompt_template::placeholders;
///
/// let names = placeholders("Resumo: {rfp_summary} / {vendors_info} / {{literal}}");
/// assert_eq!(names, vec!["rfp_summary".to_string(), "vendors_info".to_string()]);
/// ```
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let names: BTreeSet<String> = PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    names.into_iter().collect()
}

/// Render `template` against `context`.
///
/// # Errors
///
/// Returns [`TemplateError::MissingFields`] listing every placeholder that
/// has no value in `context`.
pub fn render(template: &str, context: &PromptContext) -> Result<String, TemplateError> {
    let missing: Vec<String> = placeholders(template)
        .into_iter()
        .filter(|name| !context.contains(name))
        .collect();
    if !missing.is_empty() {
        return Err(TemplateError::MissingFields { missing });
    }

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| match caps.get(1) {
        Some(name) => context.get(name.as_str()).unwrap_or_default().to_string(),
        None if &caps[0] == "{{" => "{".to_string(),
        None => "}".to_string(),
    });
    Ok(rendered.into_owned())
}

/// Names of the prompts every stage resolves.
pub mod names {
    pub const RFP_ANALYSIS_SYSTEM_ROLE: &str = "rfp_analysis_system_role";
    pub const RFP_ANALYSIS_USER_PROMPT: &str = "rfp_analysis_user_prompt";
    pub const VENDOR_MATCHING_SYSTEM_ROLE: &str = "vendor_matching_system_role";
    pub const VENDOR_MATCHING_USER_PROMPT: &str = "vendor_matching_user_prompt";
    pub const BOM_GENERATION_USER_PROMPT: &str = "bom_generation_user_prompt";
    pub const SCOPE_SUGGESTION_USER_PROMPT: &str = "scope_suggestion_user_prompt";
    pub const TECHNICAL_PROPOSAL_USER_PROMPT: &str = "technical_proposal_user_prompt";
}

/// A prompt shipped with the binary, used to seed the prompt store and as
/// fallback when an admin deletes the stored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinPrompt {
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
}

pub const BUILTIN_PROMPTS: &[BuiltinPrompt] = &[
    BuiltinPrompt {
        name: names::RFP_ANALYSIS_SYSTEM_ROLE,
        description: "System role for RFP analysis. Defines the analyst persona.",
        text: include_str!("../prompts/rfp_analysis_system_role.md"),
    },
    BuiltinPrompt {
        name: names::RFP_ANALYSIS_USER_PROMPT,
        description: "User prompt for RFP analysis. Placeholders: {text}.",
        text: include_str!("../prompts/rfp_analysis_user_prompt.md"),
    },
    BuiltinPrompt {
        name: names::VENDOR_MATCHING_SYSTEM_ROLE,
        description: "System role for vendor matching.",
        text: include_str!("../prompts/vendor_matching_system_role.md"),
    },
    BuiltinPrompt {
        name: names::VENDOR_MATCHING_USER_PROMPT,
        description: "User prompt for vendor matching. Placeholders: {rfp_summary}, {vendors_info}.",
        text: include_str!("../prompts/vendor_matching_user_prompt.md"),
    },
    BuiltinPrompt {
        name: names::BOM_GENERATION_USER_PROMPT,
        description: "User prompt for BoM generation. Placeholders: {rfp_summary}, {vendor_info}.",
        text: include_str!("../prompts/bom_generation_user_prompt.md"),
    },
    BuiltinPrompt {
        name: names::SCOPE_SUGGESTION_USER_PROMPT,
        description: "User prompt for service-scope suggestion. Placeholders: {rfp_summary}.",
        text: include_str!("../prompts/scope_suggestion_user_prompt.md"),
    },
    BuiltinPrompt {
        name: names::TECHNICAL_PROPOSAL_USER_PROMPT,
        description: "User prompt for technical proposals. Placeholders: {rfp_nome}, {arquivos_text}, \
                      {rfp_resumo_ia}, {vendor_info}, {bom_text}, {escopos_text}.",
        text: include_str!("../prompts/technical_proposal_user_prompt.md"),
    },
];

/// Look up a built-in prompt by name.
#[must_use]
pub fn builtin(name: &str) -> Option<&'static BuiltinPrompt> {
    BUILTIN_PROMPTS.iter().find(|p| p.name == name)
}
