//! Test case enumeration.
//!
//! Every enumeration is lazy, finite, and restartable: calling the same
//! function again over the same registry yields the same sequence, in
//! template registration order. Nothing here has side effects.

use crate::template::{Language, RegisteredTemplate, TemplateRegistry};

/// One template at one output length, run against its supported languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub template: String,
    pub output_length: usize,
    pub supported: Vec<Language>,
}

/// One template at one output length, which the listed languages must
/// reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionCase {
    pub template: String,
    pub output_length: usize,
    pub unsupported: Vec<Language>,
}

/// Every registered template paired with every length of `lengths`.
pub fn output_length_cases<'a>(
    registry: &'a TemplateRegistry,
    lengths: &'a [usize],
) -> impl Iterator<Item = TestCase> + 'a {
    registry.iter().flat_map(move |entry| {
        lengths
            .iter()
            .map(move |&output_length| test_case(entry, output_length))
    })
}

/// Every registered template at a single output length.
pub fn supported_cases(
    registry: &TemplateRegistry,
    output_length: usize,
) -> impl Iterator<Item = TestCase> + '_ {
    registry
        .iter()
        .map(move |entry| test_case(entry, output_length))
}

/// Templates whose supported set is a strict subset of the known languages,
/// paired with every length of `lengths`, with the languages left out.
pub fn rejection_cases<'a>(
    registry: &'a TemplateRegistry,
    lengths: &'a [usize],
) -> impl Iterator<Item = RejectionCase> + 'a {
    registry
        .iter()
        .filter_map(move |entry| {
            let unsupported: Vec<Language> = registry
                .languages()
                .iter()
                .filter(|language| !entry.supports(language))
                .cloned()
                .collect();
            (!unsupported.is_empty()).then_some((entry, unsupported))
        })
        .flat_map(move |(entry, unsupported)| {
            lengths.iter().map(move |&output_length| RejectionCase {
                template: entry.template.name.clone(),
                output_length,
                unsupported: unsupported.clone(),
            })
        })
}

/// Languages the multi-key scenario runs against: every known language that
/// supports all of `templates`. Unregistered names do not filter anything;
/// the keyset builder reports them.
pub fn multi_key_languages<'a>(
    registry: &'a TemplateRegistry,
    templates: &'a [String],
) -> impl Iterator<Item = Language> + 'a {
    registry
        .languages()
        .iter()
        .filter(move |language| {
            templates.iter().all(|name| {
                registry
                    .get(name)
                    .map_or(true, |entry| entry.supports(language))
            })
        })
        .cloned()
}

fn test_case(entry: &RegisteredTemplate, output_length: usize) -> TestCase {
    TestCase {
        template: entry.template.name.clone(),
        output_length,
        supported: entry.supported.clone(),
    }
}
