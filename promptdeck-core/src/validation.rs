//! # Library Validation
//!
//! Consistency checks run when a library is loaded (and by `promptdeck
//! validate`). Problems are reported, never fixed: the resolver and compiler
//! already have defined fallbacks for each of them.

use crate::parser::placeholder_names;
use crate::prompt::{Prompt, PromptBody, Step, Variable};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    DuplicatePromptId,
    DuplicateVariable { name: String },
    UndefinedPlaceholder { name: String },
    UnusedVariable { name: String },
    DanglingDependency { variable: String, depends_on: String },
    NonToggleDependency { variable: String, depends_on: String },
    StaleActiveVariation { id: String },
    /// A variant-level variable that also exists at prompt level. Both share
    /// one saved value, since values are stored per prompt.
    SharedVariableName { variant: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub prompt_id: String,
    /// Where in the prompt: `prompt`, `variant 'x'`, `variant 'x' step 'y'`.
    pub location: String,
    pub severity: Severity,
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} in prompt '{}' ({}): ", level, self.prompt_id, self.location)?;
        match &self.kind {
            IssueKind::DuplicatePromptId => write!(f, "duplicate prompt id"),
            IssueKind::DuplicateVariable { name } => write!(f, "variable '{}' is defined more than once", name),
            IssueKind::UndefinedPlaceholder { name } => {
                write!(f, "placeholder '{{{{{}}}}}' is used but not defined", name)
            }
            IssueKind::UnusedVariable { name } => write!(f, "variable '{}' is defined but not used", name),
            IssueKind::DanglingDependency { variable, depends_on } => {
                write!(f, "variable '{}' depends on unknown variable '{}'", variable, depends_on)
            }
            IssueKind::NonToggleDependency { variable, depends_on } => {
                write!(f, "variable '{}' depends on '{}', which is not a toggle", variable, depends_on)
            }
            IssueKind::StaleActiveVariation { id } => write!(f, "active variation '{}' does not exist", id),
            IssueKind::SharedVariableName { variant, name } => {
                write!(f, "variant '{}' redefines prompt-level variable '{}'", variant, name)
            }
        }
    }
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|issue| issue.severity == Severity::Error)
}

/// A variable set together with every template that resolves against it.
struct Scope<'a> {
    location: String,
    variables: &'a [Variable],
    templates: Vec<&'a str>,
}

impl<'a> Scope<'a> {
    fn new(location: String, variables: &'a [Variable]) -> Self {
        Scope {
            location,
            variables,
            templates: Vec::new(),
        }
    }
}

struct Source<'a> {
    location: String,
    template: &'a str,
    variables: &'a [Variable],
    steps: &'a [Step],
}

fn scopes(prompt: &Prompt) -> Vec<Scope<'_>> {
    let base = prompt.prompt_level();
    let mut shared = Scope::new("prompt".to_string(), &base.variables);
    let mut scopes = Vec::new();

    let sources: Vec<Source<'_>> = match &prompt.body {
        PromptBody::Simple(body) => vec![Source {
            location: "prompt".to_string(),
            template: &body.template,
            variables: &[],
            steps: &body.steps,
        }],
        PromptBody::Variants { variations, .. } => variations
            .iter()
            .map(|variant| Source {
                location: format!("variant '{}'", variant.id),
                template: if variant.template.is_empty() { &base.template } else { &variant.template },
                variables: &variant.variables,
                steps: &variant.steps,
            })
            .collect(),
    };

    for source in sources {
        let mut own = if source.variables.is_empty() {
            None
        } else {
            Some(Scope::new(source.location.clone(), source.variables))
        };

        let mut templates = Vec::new();
        if source.steps.is_empty() {
            templates.push(source.template);
        }
        for step in source.steps {
            let template = if step.template.is_empty() { source.template } else { step.template.as_str() };
            if step.variables.is_empty() {
                templates.push(template);
            } else {
                let mut step_scope = Scope::new(format!("{} step '{}'", source.location, step.id), &step.variables);
                step_scope.templates.push(template);
                scopes.push(step_scope);
            }
        }

        match own.as_mut() {
            Some(scope) => scope.templates.extend(templates),
            None => shared.templates.extend(templates),
        }
        scopes.extend(own);
    }

    if !shared.variables.is_empty() || !shared.templates.is_empty() {
        scopes.push(shared);
    }
    scopes
}

fn check_scope(prompt_id: &str, scope: &Scope<'_>, issues: &mut Vec<ValidationIssue>) {
    let mut issue = |severity: Severity, kind: IssueKind| {
        issues.push(ValidationIssue {
            prompt_id: prompt_id.to_string(),
            location: scope.location.clone(),
            severity,
            kind,
        });
    };

    let mut defined: HashSet<&str> = HashSet::new();
    for variable in scope.variables {
        if !defined.insert(variable.name.as_str()) {
            issue(Severity::Error, IssueKind::DuplicateVariable { name: variable.name.clone() });
        }
    }

    let mut used: Vec<&str> = Vec::new();
    for template in &scope.templates {
        for name in placeholder_names(template) {
            if !used.contains(&name) {
                used.push(name);
            }
        }
    }

    for name in &used {
        if !defined.contains(name) {
            issue(Severity::Error, IssueKind::UndefinedPlaceholder { name: name.to_string() });
        }
    }

    let mut reported: HashSet<&str> = HashSet::new();
    for variable in scope.variables {
        let name = variable.name.as_str();
        // Toggles and hidden variables gate or annotate rather than substitute.
        let referenced = used.contains(&name) || variable.is_toggle() || variable.hide_in_preview;
        if !referenced && reported.insert(name) {
            issue(Severity::Warning, IssueKind::UnusedVariable { name: variable.name.clone() });
        }

        if let Some(depends_on) = variable.depends_on.as_deref() {
            match scope.variables.iter().find(|v| v.name == depends_on) {
                None => issue(
                    Severity::Warning,
                    IssueKind::DanglingDependency {
                        variable: variable.name.clone(),
                        depends_on: depends_on.to_string(),
                    },
                ),
                Some(dependency) if !dependency.is_toggle() => issue(
                    Severity::Warning,
                    IssueKind::NonToggleDependency {
                        variable: variable.name.clone(),
                        depends_on: depends_on.to_string(),
                    },
                ),
                Some(_) => {}
            }
        }
    }
}

/// Checks a single prompt.
pub fn validate_prompt(prompt: &Prompt) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for scope in scopes(prompt) {
        check_scope(&prompt.id, &scope, &mut issues);
    }

    if let PromptBody::Variants {
        variations,
        active_variation_id,
        fallback,
    } = &prompt.body
    {
        if let Some(id) = active_variation_id {
            if !variations.iter().any(|v| &v.id == id) {
                issues.push(ValidationIssue {
                    prompt_id: prompt.id.clone(),
                    location: "prompt".to_string(),
                    severity: Severity::Warning,
                    kind: IssueKind::StaleActiveVariation { id: id.clone() },
                });
            }
        }

        for variant in variations {
            for variable in &variant.variables {
                if fallback.variables.iter().any(|v| v.name == variable.name) {
                    issues.push(ValidationIssue {
                        prompt_id: prompt.id.clone(),
                        location: format!("variant '{}'", variant.id),
                        severity: Severity::Warning,
                        kind: IssueKind::SharedVariableName {
                            variant: variant.id.clone(),
                            name: variable.name.clone(),
                        },
                    });
                }
            }
        }
    }

    issues
}

/// Checks a whole library, including prompt id uniqueness.
pub fn validate(prompts: &[Prompt]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();

    for prompt in prompts {
        if !seen.insert(prompt.id.as_str()) && reported.insert(prompt.id.as_str()) {
            issues.push(ValidationIssue {
                prompt_id: prompt.id.clone(),
                location: "library".to_string(),
                severity: Severity::Error,
                kind: IssueKind::DuplicatePromptId,
            });
        }
        issues.extend(validate_prompt(prompt));
    }

    issues
}
