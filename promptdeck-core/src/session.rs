//! # Prompt Library Session
//!
//! [`PromptLibrary`] owns the loaded prompts and wires the pure components
//! (resolver, compiler, dependency evaluator, view transitions) to the
//! collaborators: a [`PromptSource`] for write-back, a [`KeyValueStore`] for
//! variable values and usage, and clipboard sinks for copying.
//!
//! Variable values are keyed by prompt id and name. Setting a value updates
//! every variable with that name in the prompt, whichever variant or step
//! set it belongs to, so switching variants never loses what was typed.
//!
//! Subscribers are notified synchronously with the prompt id and a
//! [`ViewEvent`] after each applied change.
//!
//! Values live only in the store. Saving an edit writes the prompt back with
//! the values it was loaded with, never the ones typed since.

use crate::clipboard::{ClipboardError, ClipboardSink, CopyMethod, copy_with_fallback};
use crate::dependency::{compute_visibility, visible_variables};
use crate::kv_store::KeyValueStore;
use crate::prompt::{ActiveTab, Prompt, Variable};
use crate::registry::{PromptFilter, PromptRepository, PromptSource};
use crate::resolver::{active_step_index, active_variables, active_variables_mut, all_variables, all_variables_mut};
use crate::validation::{Severity, ValidationIssue, validate};
use crate::{usage, variable_store, view};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use thiserror::Error;

pub use crate::view::Transition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    VariableChanged { name: String },
    /// Names of the variables hidden after a toggle changed, sorted.
    VisibilityChanged { hidden: Vec<String> },
    TemplateEdited,
    TabSwitched(ActiveTab),
    VariantSwitched { id: String },
    StepChanged(usize),
    LockToggled { locked: bool },
    SaveRequested,
    DiscardRequested,
    VariablesCleared,
    Copied { method: CopyMethod },
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Prompt '{0}' not found")]
    PromptNotFound(String),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

type Listener = Box<dyn FnMut(&str, &ViewEvent)>;

pub struct PromptLibrary<S: PromptSource, K: KeyValueStore> {
    source: S,
    store: K,
    repository: PromptRepository,
    /// Library values of every variable, per prompt, in `all_variables` order.
    defaults: HashMap<String, Vec<String>>,
    issues: Vec<ValidationIssue>,
    listeners: Vec<Listener>,
}

impl<S: PromptSource, K: KeyValueStore> PromptLibrary<S, K> {
    /// Loads every prompt from `source` and hydrates usage and saved
    /// variable values from `store`.
    ///
    /// A source that fails to load yields an empty library. Validation
    /// issues are logged and kept in [`PromptLibrary::issues`].
    pub fn load(source: S, store: K) -> Self {
        let prompts = match source.get_prompts() {
            Ok(prompts) => prompts,
            Err(e) => {
                warn!("Failed to load prompt library, starting empty: {}", e);
                Vec::new()
            }
        };

        let issues = validate(&prompts);
        for issue in &issues {
            match issue.severity {
                Severity::Error => warn!("{}", issue),
                Severity::Warning => info!("{}", issue),
            }
        }

        let mut repository = PromptRepository::new(prompts);
        let mut defaults = HashMap::new();
        for prompt in repository.iter_mut() {
            let values = all_variables(prompt).iter().map(|v| v.value.clone()).collect();
            let id = prompt.id.clone();
            usage::hydrate(&store, prompt);
            variable_store::load(&store, &id, all_variables_mut(prompt));
            defaults.insert(id, values);
        }
        for orphan in variable_store::stored_prompt_ids(&store) {
            if repository.get(&orphan).is_none() {
                info!("Saved values for unknown prompt '{}' are kept but unused", orphan);
            }
        }
        info!("Loaded {} prompt(s)", repository.len());

        PromptLibrary {
            source,
            store,
            repository,
            defaults,
            issues,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&str, &ViewEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, prompt_id: &str, event: ViewEvent) {
        debug!("Prompt '{}': {:?}", prompt_id, event);
        for listener in self.listeners.iter_mut() {
            listener(prompt_id, &event);
        }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn prompt(&self, id: &str) -> Option<&Prompt> {
        self.repository.get(id)
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Prompt> {
        self.repository.iter()
    }

    pub fn categories(&self) -> Vec<String> {
        self.repository.categories()
    }

    pub fn filter(&self, filter: &PromptFilter) -> Vec<&Prompt> {
        self.repository.filter(filter)
    }

    /// The compiled active template; `None` for an unknown id.
    pub fn preview(&self, id: &str) -> Option<String> {
        self.repository.get(id).map(view::preview)
    }

    /// Name to hidden flag for the active variable set.
    pub fn visibility(&self, id: &str) -> Option<HashMap<String, bool>> {
        self.repository.get(id).map(|p| compute_visibility(active_variables(p)))
    }

    /// Sets `name` to `value` and persists the prompt's values right away.
    pub fn set_variable(&mut self, id: &str, name: &str, value: &str) -> Transition {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let before = compute_visibility(active_variables(prompt));
        let is_toggle = active_variables(prompt).iter().any(|v| v.name == name && v.is_toggle());
        if !view::set_variable(prompt, name, value).is_applied() {
            debug!("Prompt '{}' has no active variable '{}'", id, name);
            return Transition::Ignored;
        }

        for variable in all_variables_mut(prompt) {
            if variable.name == name {
                variable.value = value.to_string();
            }
        }
        variable_store::save(&mut self.store, id, all_variables(prompt));

        let after = compute_visibility(active_variables(prompt));
        self.notify(id, ViewEvent::VariableChanged { name: name.to_string() });
        if is_toggle && before != after {
            self.notify(id, ViewEvent::VisibilityChanged { hidden: hidden_names(&after) });
        }
        Transition::Applied
    }

    pub fn switch_tab(&mut self, id: &str, tab: ActiveTab) -> Transition {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let transition = view::switch_tab(prompt, tab);
        if transition.is_applied() {
            self.notify(id, ViewEvent::TabSwitched(tab));
        }
        transition
    }

    pub fn enable_edit(&mut self, id: &str) -> Transition {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let transition = view::enable_edit(prompt);
        if transition.is_applied() {
            self.notify(id, ViewEvent::LockToggled { locked: false });
        }
        transition
    }

    pub fn edit_template(&mut self, id: &str, text: &str) -> Transition {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let transition = view::edit_template(prompt, text);
        if transition.is_applied() {
            self.notify(id, ViewEvent::TemplateEdited);
        }
        transition
    }

    /// Commits the draft, locks the prompt and writes it back to the source.
    ///
    /// The written prompt carries the variable values it was loaded with;
    /// typed values stay in the store. The commit and lock happen even when
    /// the write-back fails; the source's error is returned so callers can
    /// report it.
    pub fn save(&mut self, id: &str) -> Result<Transition, S::Error> {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Ok(Transition::Ignored);
        };
        if !view::save_edit(prompt).is_applied() {
            return Ok(Transition::Ignored);
        }

        let record = with_library_values(prompt, self.defaults.get(id));
        let result = self.source.update_prompt(&record);
        self.notify(id, ViewEvent::SaveRequested);
        self.notify(id, ViewEvent::LockToggled { locked: true });

        match result {
            Ok(_) => {
                info!("Saved prompt '{}'", id);
                Ok(Transition::Applied)
            }
            Err(e) => {
                warn!("Failed to save prompt '{}': {}", id, e);
                Err(e)
            }
        }
    }

    /// Leaves edit mode, restoring the snapshot. See [`view::discard_edit`].
    pub fn discard<F>(&mut self, id: &str, confirm: F) -> Transition
    where
        F: FnOnce(&str, &str) -> bool,
    {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let transition = view::discard_edit(prompt, confirm);
        if transition.is_applied() {
            self.notify(id, ViewEvent::DiscardRequested);
            self.notify(id, ViewEvent::LockToggled { locked: true });
        }
        transition
    }

    /// Selects a variant and hydrates its variable set from the store.
    pub fn switch_variant(&mut self, id: &str, variant_id: &str) -> Transition {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let transition = view::switch_variant(prompt, variant_id);
        if transition.is_applied() {
            variable_store::load(&self.store, id, active_variables_mut(prompt).iter_mut());
            self.notify(id, ViewEvent::VariantSwitched {
                id: variant_id.to_string(),
            });
        }
        transition
    }

    pub fn go_to_step(&mut self, id: &str, index: usize) -> Transition {
        self.step_with(id, |prompt| view::go_to_step(prompt, index))
    }

    pub fn next_step(&mut self, id: &str) -> Transition {
        self.step_with(id, view::next_step)
    }

    pub fn previous_step(&mut self, id: &str) -> Transition {
        self.step_with(id, view::previous_step)
    }

    fn step_with<F>(&mut self, id: &str, step: F) -> Transition
    where
        F: FnOnce(&mut Prompt) -> Transition,
    {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let transition = step(prompt);
        if transition.is_applied() {
            let index = active_step_index(prompt).unwrap_or_default();
            self.notify(id, ViewEvent::StepChanged(index));
        }
        transition
    }

    /// Empties the active variable set and deletes the saved values. Names
    /// shared with other sets are emptied there too.
    pub fn clear_variables(&mut self, id: &str) -> Transition {
        let Some(prompt) = self.repository.get_mut(id) else {
            return Transition::Ignored;
        };

        let names: Vec<String> = active_variables(prompt).iter().map(|v| v.name.clone()).collect();
        if !view::clear_values(prompt).is_applied() {
            return Transition::Ignored;
        }

        for variable in all_variables_mut(prompt) {
            if names.contains(&variable.name) {
                variable.value.clear();
            }
        }
        variable_store::clear(&mut self.store, id);
        self.notify(id, ViewEvent::VariablesCleared);
        Transition::Applied
    }

    /// Compiles the active template and copies it, falling back to the
    /// manual-selection sink. A successful copy counts as one use.
    pub fn copy(
        &mut self,
        id: &str,
        primary: &mut dyn ClipboardSink,
        fallback: &mut dyn ClipboardSink,
        now: DateTime<Utc>,
    ) -> Result<CopyMethod, CopyError> {
        let prompt = self
            .repository
            .get_mut(id)
            .ok_or_else(|| CopyError::PromptNotFound(id.to_string()))?;

        let text = view::preview(prompt);
        let method = copy_with_fallback(&text, primary, fallback)?;
        let usage = usage::record_use(&mut self.store, prompt, now);
        debug!("Prompt '{}' used {} time(s)", id, usage.use_count);

        self.notify(id, ViewEvent::Copied { method });
        Ok(method)
    }
}

/// A copy of `prompt` whose variable values are reset to `defaults`.
fn with_library_values(prompt: &Prompt, defaults: Option<&Vec<String>>) -> Prompt {
    let mut record = prompt.clone();
    let mut defaults = defaults.into_iter().flatten();
    for variable in all_variables_mut(&mut record) {
        variable.value = defaults.next().cloned().unwrap_or_default();
    }
    record
}

fn hidden_names(visibility: &HashMap<String, bool>) -> Vec<String> {
    let mut hidden: Vec<String> = visibility
        .iter()
        .filter(|(_, hidden)| **hidden)
        .map(|(name, _)| name.clone())
        .collect();
    hidden.sort();
    hidden
}

/// The variables of the active set that are currently shown.
pub fn shown_variables(prompt: &Prompt) -> Vec<&Variable> {
    visible_variables(active_variables(prompt))
}
