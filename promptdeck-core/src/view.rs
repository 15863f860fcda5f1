//! # Prompt View State Machine
//!
//! Per-prompt UI state: locked (view mode, with a variables/preview tab) or
//! unlocked (edit mode, editing the raw template). Every transition is a
//! plain function on a `&mut Prompt` that reports what happened; none of
//! them fail, and a transition that isn't legal in the current state is
//! [`Transition::Ignored`].
//!
//! ```text
//!             enable_edit                 save_edit / discard_edit
//!   Locked ---------------> Unlocked ----------------------------> Locked
//!   (Variables <-> Preview)    edit_template, switch_variant
//! ```

use crate::compiler::compile;
use crate::prompt::{ActiveTab, Prompt, PromptBody};
use crate::resolver::{
    active_step_index, active_steps, active_template, active_variables, active_variables_mut, editable_template,
    editable_template_mut,
};
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Not legal in the current state, or nothing to change.
    Ignored,
    /// The user declined a confirmation; state is unchanged.
    Cancelled,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        self == Transition::Applied
    }
}

/// The compiled text of the active template with the current values.
pub fn preview(prompt: &Prompt) -> String {
    compile(active_template(prompt), active_variables(prompt))
}

/// Whether the draft differs from the snapshot taken on entering edit mode.
pub fn has_unsaved_changes(prompt: &Prompt) -> bool {
    match &prompt.view.original_template {
        Some(original) => original != editable_template(prompt),
        None => false,
    }
}

pub fn enable_edit(prompt: &mut Prompt) -> Transition {
    if !prompt.view.locked {
        return Transition::Ignored;
    }

    prompt.view.locked = false;
    if prompt.view.original_template.is_none() {
        prompt.view.original_template = Some(editable_template(prompt).to_string());
    }
    debug!("Prompt '{}' unlocked for editing", prompt.id);
    Transition::Applied
}

pub fn edit_template(prompt: &mut Prompt, text: &str) -> Transition {
    if prompt.view.locked {
        return Transition::Ignored;
    }

    *editable_template_mut(prompt) = text.to_string();
    Transition::Applied
}

/// Commits the draft. Persisting it is the caller's job.
pub fn save_edit(prompt: &mut Prompt) -> Transition {
    if prompt.view.locked {
        return Transition::Ignored;
    }

    prompt.view.original_template = None;
    prompt.view.locked = true;
    debug!("Prompt '{}' saved and locked", prompt.id);
    Transition::Applied
}

/// Restores the snapshot and locks. When the draft has changed, `confirm`
/// is asked first with `(draft, original)`; declining leaves everything as is.
pub fn discard_edit<F>(prompt: &mut Prompt, confirm: F) -> Transition
where
    F: FnOnce(&str, &str) -> bool,
{
    if prompt.view.locked {
        return Transition::Ignored;
    }

    if has_unsaved_changes(prompt) {
        if let Some(original) = prompt.view.original_template.clone() {
            if !confirm(editable_template(prompt), &original) {
                return Transition::Cancelled;
            }
            *editable_template_mut(prompt) = original;
        }
    }

    prompt.view.original_template = None;
    prompt.view.locked = true;
    debug!("Prompt '{}' edits discarded", prompt.id);
    Transition::Applied
}

pub fn switch_tab(prompt: &mut Prompt, tab: ActiveTab) -> Transition {
    if !prompt.view.locked || prompt.view.active_tab == tab {
        return Transition::Ignored;
    }

    prompt.view.active_tab = tab;
    Transition::Applied
}

/// Selects another variant and resets the step to the first one.
///
/// In edit mode the pending draft of the previous variant is dropped without
/// asking and editing continues on the new variant.
pub fn switch_variant(prompt: &mut Prompt, variant_id: &str) -> Transition {
    let PromptBody::Variants { variations, .. } = &prompt.body else {
        return Transition::Ignored;
    };
    if !variations.iter().any(|v| v.id == variant_id) {
        return Transition::Ignored;
    }
    if prompt.active_variation_id() == Some(variant_id) {
        return Transition::Ignored;
    }

    let editing = !prompt.view.locked;
    if editing {
        if has_unsaved_changes(prompt) {
            warn!("Prompt '{}': dropping unsaved draft on variant switch", prompt.id);
        }
        if let Some(original) = prompt.view.original_template.take() {
            *editable_template_mut(prompt) = original;
        }
    }

    if let PromptBody::Variants {
        active_variation_id, ..
    } = &mut prompt.body
    {
        *active_variation_id = Some(variant_id.to_string());
    }
    prompt.view.active_step = 0;

    if editing {
        prompt.view.original_template = Some(editable_template(prompt).to_string());
    }
    Transition::Applied
}

pub fn go_to_step(prompt: &mut Prompt, index: usize) -> Transition {
    if !prompt.view.locked || index >= active_steps(prompt).len() {
        return Transition::Ignored;
    }
    if active_step_index(prompt) == Some(index) {
        return Transition::Ignored;
    }

    prompt.view.active_step = index;
    Transition::Applied
}

pub fn next_step(prompt: &mut Prompt) -> Transition {
    match active_step_index(prompt) {
        Some(current) => go_to_step(prompt, current + 1),
        None => Transition::Ignored,
    }
}

pub fn previous_step(prompt: &mut Prompt) -> Transition {
    match active_step_index(prompt) {
        Some(current) if current > 0 => go_to_step(prompt, current - 1),
        _ => Transition::Ignored,
    }
}

/// Sets the value of `name` in the active variable set.
pub fn set_variable(prompt: &mut Prompt, name: &str, value: &str) -> Transition {
    match active_variables_mut(prompt).iter_mut().find(|v| v.name == name) {
        Some(variable) => {
            variable.value = value.to_string();
            Transition::Applied
        }
        None => Transition::Ignored,
    }
}

/// Empties every value in the active variable set. Locked only.
pub fn clear_values(prompt: &mut Prompt) -> Transition {
    if !prompt.view.locked {
        return Transition::Ignored;
    }

    for variable in active_variables_mut(prompt).iter_mut() {
        variable.value.clear();
    }
    Transition::Applied
}
