//! # Variant Resolver
//!
//! Collapses a [`PromptBody`] into the template and variable set that are
//! currently in effect. This is the only place that looks at whether a prompt
//! has variants or steps; everything else asks the resolver.
//!
//! Resolution order:
//!
//! - the active variant is the one named by `active_variation_id`, or the
//!   first variant when that id is unset or stale;
//! - the variant's template falls back to the prompt-level template when
//!   empty, and its variables fall back to the prompt-level variables;
//! - when the active source has steps, the active step's template and
//!   variables take precedence, each falling back the same way when empty.
//!
//! None of these functions fail: missing data resolves to `""` or `&[]`.

use crate::prompt::{Prompt, PromptBody, Step, Variable, Variant};

/// Where the active template or variable set physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Prompt,
    PromptStep(usize),
    Variant(usize),
    VariantStep(usize, usize),
}

pub fn active_variant_index(prompt: &Prompt) -> Option<usize> {
    match &prompt.body {
        PromptBody::Simple(_) => None,
        PromptBody::Variants {
            variations,
            active_variation_id,
            ..
        } => {
            if variations.is_empty() {
                return None;
            }
            let index = active_variation_id
                .as_deref()
                .and_then(|id| variations.iter().position(|v| v.id == id))
                .unwrap_or(0);
            Some(index)
        }
    }
}

pub fn active_variant(prompt: &Prompt) -> Option<&Variant> {
    active_variant_index(prompt).map(|index| &prompt.variations()[index])
}

/// Steps of the active source: the active variant, or the prompt itself.
pub fn active_steps(prompt: &Prompt) -> &[Step] {
    match active_variant(prompt) {
        Some(variant) => &variant.steps,
        None => &prompt.prompt_level().steps,
    }
}

/// The active step index clamped into range, or `None` without steps.
pub fn active_step_index(prompt: &Prompt) -> Option<usize> {
    let steps = active_steps(prompt);
    if steps.is_empty() {
        None
    } else {
        Some(prompt.view.active_step.min(steps.len() - 1))
    }
}

pub fn active_step(prompt: &Prompt) -> Option<&Step> {
    active_step_index(prompt).map(|index| &active_steps(prompt)[index])
}

pub fn active_template(prompt: &Prompt) -> &str {
    let base = &prompt.prompt_level().template;
    let source = match active_variant(prompt) {
        Some(variant) if !variant.template.is_empty() => &variant.template,
        _ => base,
    };

    match active_step(prompt) {
        Some(step) if !step.template.is_empty() => &step.template,
        _ => source,
    }
}

pub fn active_variables(prompt: &Prompt) -> &[Variable] {
    let base = &prompt.prompt_level().variables;
    let source = match active_variant(prompt) {
        Some(variant) if !variant.variables.is_empty() => &variant.variables,
        _ => base,
    };

    match active_step(prompt) {
        Some(step) if !step.variables.is_empty() => &step.variables,
        _ => source,
    }
}

/// Mutable access to the variable set [`active_variables`] returns. Value
/// edits go through here so the compiler and the editor see the same data.
pub fn active_variables_mut(prompt: &mut Prompt) -> &mut Vec<Variable> {
    let slot = variables_slot(prompt);
    match (&mut prompt.body, slot) {
        (PromptBody::Variants { variations, .. }, Slot::Variant(v)) => &mut variations[v].variables,
        (PromptBody::Variants { variations, .. }, Slot::VariantStep(v, s)) => &mut variations[v].steps[s].variables,
        (PromptBody::Simple(body), Slot::PromptStep(s)) | (PromptBody::Variants { fallback: body, .. }, Slot::PromptStep(s)) => {
            &mut body.steps[s].variables
        }
        (PromptBody::Simple(body), _) | (PromptBody::Variants { fallback: body, .. }, _) => &mut body.variables,
    }
}

/// The raw template text of the most specific active source (step, then
/// variant, then prompt), without fallbacks. This is what edit mode edits.
pub fn editable_template(prompt: &Prompt) -> &str {
    let slot = template_slot(prompt);
    match (&prompt.body, slot) {
        (PromptBody::Variants { variations, .. }, Slot::Variant(v)) => &variations[v].template,
        (PromptBody::Variants { variations, .. }, Slot::VariantStep(v, s)) => &variations[v].steps[s].template,
        (PromptBody::Simple(body), Slot::PromptStep(s)) | (PromptBody::Variants { fallback: body, .. }, Slot::PromptStep(s)) => {
            &body.steps[s].template
        }
        (PromptBody::Simple(body), _) | (PromptBody::Variants { fallback: body, .. }, _) => &body.template,
    }
}

pub fn editable_template_mut(prompt: &mut Prompt) -> &mut String {
    let slot = template_slot(prompt);
    match (&mut prompt.body, slot) {
        (PromptBody::Variants { variations, .. }, Slot::Variant(v)) => &mut variations[v].template,
        (PromptBody::Variants { variations, .. }, Slot::VariantStep(v, s)) => &mut variations[v].steps[s].template,
        (PromptBody::Simple(body), Slot::PromptStep(s)) | (PromptBody::Variants { fallback: body, .. }, Slot::PromptStep(s)) => {
            &mut body.steps[s].template
        }
        (PromptBody::Simple(body), _) | (PromptBody::Variants { fallback: body, .. }, _) => &mut body.template,
    }
}

/// Every variable of the prompt across all sets: prompt level, variants and
/// steps, in that order.
pub fn all_variables(prompt: &Prompt) -> Vec<&Variable> {
    let (base, variations) = match &prompt.body {
        PromptBody::Simple(body) => (body, None),
        PromptBody::Variants {
            variations, fallback, ..
        } => (fallback, Some(variations)),
    };

    let mut all: Vec<&Variable> = base.variables.iter().collect();
    all.extend(base.steps.iter().flat_map(|s| &s.variables));
    for variant in variations.into_iter().flatten() {
        all.extend(&variant.variables);
        all.extend(variant.steps.iter().flat_map(|s| &s.variables));
    }
    all
}

pub fn all_variables_mut(prompt: &mut Prompt) -> Vec<&mut Variable> {
    let (base, variations) = match &mut prompt.body {
        PromptBody::Simple(body) => (body, None),
        PromptBody::Variants {
            variations, fallback, ..
        } => (fallback, Some(variations)),
    };

    let mut all: Vec<&mut Variable> = base.variables.iter_mut().collect();
    all.extend(base.steps.iter_mut().flat_map(|s| &mut s.variables));
    for variant in variations.into_iter().flatten() {
        all.extend(&mut variant.variables);
        all.extend(variant.steps.iter_mut().flat_map(|s| &mut s.variables));
    }
    all
}

fn template_slot(prompt: &Prompt) -> Slot {
    match (active_variant_index(prompt), active_step_index(prompt)) {
        (Some(v), Some(s)) => Slot::VariantStep(v, s),
        (Some(v), None) => Slot::Variant(v),
        (None, Some(s)) => Slot::PromptStep(s),
        (None, None) => Slot::Prompt,
    }
}

fn variables_slot(prompt: &Prompt) -> Slot {
    let variant = active_variant_index(prompt);
    let step = active_step(prompt);
    let step_has_variables = step.is_some_and(|s| !s.variables.is_empty());

    match (variant, active_step_index(prompt)) {
        (Some(v), Some(s)) if step_has_variables => Slot::VariantStep(v, s),
        (None, Some(s)) if step_has_variables => Slot::PromptStep(s),
        (Some(v), _) if !prompt.variations()[v].variables.is_empty() => Slot::Variant(v),
        _ => Slot::Prompt,
    }
}
