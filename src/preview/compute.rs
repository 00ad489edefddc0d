//! Rule-preview computation.
//!
//! A pure function from the current item batch and the enabled rule subset to
//! proposed names, statuses, and highlight diffs. Per-item rule failures
//! degrade to an `Error` status on the affected items without aborting the
//! batch; only a rule referencing an unknown template fails the whole request.

use crate::error::{RebatchError, Result};
use crate::preview::diff::{diff_segments, HighlightSegment};
use crate::preview::rules::{
    has_episode_title, template_target, ItemStatus, NamedItem, RuleKind, TemplateRegistry,
    TemplateTransform, TransformRule,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Preview outcome for one item.
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub item_id: u64,
    pub proposed_name: String,
    pub status: ItemStatus,
    pub error: Option<String>,
    pub current_segments: Vec<HighlightSegment>,
    pub proposed_segments: Vec<HighlightSegment>,
}

/// Purely derived preview over a batch; recomputed on every rule-set change,
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct PreviewResult {
    pub entries: Vec<PreviewEntry>,
}

/// One rule compiled for repeated application across the batch.
enum Step {
    Literal { search: String, replace: String },
    Pattern { regex: Regex, replace: String },
    Template { transform: Arc<dyn TemplateTransform> },
    /// Pattern failed to compile; every item it touches reports the failure.
    Broken { message: String },
}

struct CompiledRule {
    name: String,
    step: Step,
}

/// Compute the preview for `items` under the ordinal-ordered enabled rules.
pub fn compute_preview(
    items: &[NamedItem],
    rules: &[TransformRule],
    templates: &TemplateRegistry,
) -> Result<PreviewResult> {
    let mut enabled: Vec<&TransformRule> = rules.iter().filter(|rule| rule.enabled).collect();
    enabled.sort_by_key(|rule| rule.ordinal);

    let compiled = compile_rules(&enabled, templates)?;

    // First pass: fold the rules over every name, left to right.
    let mut proposed: Vec<(String, Option<String>)> = Vec::with_capacity(items.len());
    for item in items {
        proposed.push(apply_rules(&item.current_name, &compiled));
    }

    // Second pass: conflicting proposed names become duplicates.
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for ((name, error), _) in proposed.iter().zip(items) {
        if error.is_none() {
            *name_counts.entry(name.as_str()).or_insert(0) += 1;
        }
    }

    let entries = items
        .iter()
        .zip(&proposed)
        .map(|(item, (name, error))| {
            let status = if error.is_some() {
                ItemStatus::Error
            } else if name_counts.get(name.as_str()).copied().unwrap_or(0) > 1 {
                ItemStatus::Duplicate
            } else {
                ItemStatus::Valid
            };
            let (current_segments, proposed_segments) = diff_segments(&item.current_name, name);
            PreviewEntry {
                item_id: item.id,
                proposed_name: name.clone(),
                status,
                error: error.clone(),
                current_segments,
                proposed_segments,
            }
        })
        .collect();

    Ok(PreviewResult { entries })
}

fn compile_rules(rules: &[&TransformRule], templates: &TemplateRegistry) -> Result<Vec<CompiledRule>> {
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        let step = if let Some(target) = template_target(&rule.replace) {
            // An unregistered template is a caller configuration fault, not
            // item data: fail the whole request.
            let transform = templates
                .get(target)
                .ok_or_else(|| RebatchError::UnknownTemplate {
                    name: target.to_string(),
                })?;
            Step::Template {
                transform: Arc::clone(transform),
            }
        } else {
            match rule.kind {
                RuleKind::Literal => Step::Literal {
                    search: rule.search.clone(),
                    replace: rule.replace.clone(),
                },
                RuleKind::Pattern => match Regex::new(&rule.search) {
                    Ok(regex) => Step::Pattern {
                        regex,
                        replace: rule.replace.clone(),
                    },
                    Err(err) => Step::Broken {
                        message: err.to_string(),
                    },
                },
            }
        };
        compiled.push(CompiledRule {
            name: rule.name.clone(),
            step,
        });
    }
    Ok(compiled)
}

/// Fold the compiled rules over one name; each rule consumes the previous
/// rule's output. Returns the proposed name and an optional failure message.
fn apply_rules(name: &str, rules: &[CompiledRule]) -> (String, Option<String>) {
    let mut current = name.to_string();
    for rule in rules {
        match &rule.step {
            Step::Literal { search, replace } => {
                // Replacing an empty needle would insert between every char.
                if !search.is_empty() {
                    current = current.replace(search.as_str(), replace);
                }
            }
            Step::Pattern { regex, replace } => {
                current = regex.replace_all(&current, replace.as_str()).into_owned();
            }
            Step::Template { transform } => {
                match transform.render(&current, has_episode_title(&current)) {
                    Ok(rendered) => current = rendered,
                    Err(message) => {
                        return (current, Some(format!("rule '{}': {message}", rule.name)));
                    }
                }
            }
            Step::Broken { message } => {
                return (current, Some(format!("rule '{}': {message}", rule.name)));
            }
        }
    }
    (current, None)
}
