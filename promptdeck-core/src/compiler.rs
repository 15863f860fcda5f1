//! # Template Compiler
//!
//! Substitutes `{{name}}` placeholders with variable values.
//!
//! Expansion is a single left-to-right pass over the template: substituted
//! values are copied to the output verbatim and never scanned again, so a
//! value that itself looks like `{{other}}` stays literal. Placeholders with
//! no matching variable are left in the output untouched.

use crate::parser::parse_placeholder;
use crate::prompt::Variable;
use std::collections::HashMap;

/// Compiles `template` against `variables`.
///
/// Variables marked `hide_in_preview` have their placeholders removed rather
/// than replaced. When two variables share a name the first one wins.
pub fn compile(template: &str, variables: &[Variable]) -> String {
    let mut substitutions: HashMap<&str, &str> = HashMap::with_capacity(variables.len());
    for variable in variables {
        let replacement = if variable.hide_in_preview { "" } else { variable.value.as_str() };
        substitutions.entry(variable.name.as_str()).or_insert(replacement);
    }

    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while !rest.is_empty() {
        if rest.starts_with("{{") {
            if let Ok((remaining, name)) = parse_placeholder(rest) {
                if let Some(replacement) = substitutions.get(name) {
                    output.push_str(replacement);
                    rest = remaining;
                    continue;
                }
            }
            // Not a known placeholder here; a later '{' may still open one.
            output.push('{');
            rest = &rest[1..];
            continue;
        }

        let first = rest.chars().next().map_or(1, char::len_utf8);
        let next = rest[first..].find('{').map_or(rest.len(), |i| i + first);
        output.push_str(&rest[..next]);
        rest = &rest[next..];
    }

    output
}
