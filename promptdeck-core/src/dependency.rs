//! # Dependency Evaluator
//!
//! Decides which variables are hidden because of the value of a toggle they
//! depend on. Unresolvable dependencies fail open: the variable is shown.

use crate::prompt::Variable;
use std::collections::HashMap;

/// Maps every variable name in `variables` to whether it is hidden.
pub fn compute_visibility(variables: &[Variable]) -> HashMap<String, bool> {
    variables
        .iter()
        .map(|variable| (variable.name.clone(), is_hidden(variable, variables)))
        .collect()
}

/// Whether `variable` is hidden given the current values in `variables`.
pub fn is_hidden(variable: &Variable, variables: &[Variable]) -> bool {
    let Some(dependency_name) = variable.depends_on.as_deref() else {
        return false;
    };
    let Some(dependency) = variables.iter().find(|v| v.name == dependency_name) else {
        return false;
    };
    if !dependency.is_toggle() {
        return false;
    }

    match variable.hide_when.as_deref() {
        Some(hide_when) => dependency.value == hide_when || (dependency.value.is_empty() && hide_when.is_empty()),
        None => false,
    }
}

/// The variables that are currently shown, in order.
pub fn visible_variables(variables: &[Variable]) -> Vec<&Variable> {
    variables.iter().filter(|v| !is_hidden(v, variables)).collect()
}
