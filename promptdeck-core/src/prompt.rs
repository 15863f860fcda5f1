use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keywords that mark a variable as long-form input when no input type is set.
const LONG_FORM_KEYWORDS: &[&str] = &[
    "paste",
    "content",
    "description",
    "details",
    "notes",
    "context",
    "code",
    "essay",
    "article",
    "transcript",
    "draft",
    "list",
    "examples",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Textarea,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Variables,
    Preview,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variable {
    pub name: String,
    pub label: String,
    pub placeholder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// `[off_label, on_label]` for toggles.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_when: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hide_in_preview: bool,
}

impl Variable {
    pub fn new(name: &str) -> Variable {
        Variable {
            name: name.to_string(),
            label: name.to_string(),
            ..Variable::default()
        }
    }

    pub fn with_value(mut self, value: &str) -> Variable {
        self.value = value.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Variable {
        self.label = label.to_string();
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Variable {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn toggle(name: &str, off: &str, on: &str) -> Variable {
        Variable {
            input_type: Some(InputType::Toggle),
            options: vec![off.to_string(), on.to_string()],
            ..Variable::new(name)
        }
    }

    pub fn depending_on(mut self, dependency: &str, hide_when: &str) -> Variable {
        self.depends_on = Some(dependency.to_string());
        self.hide_when = Some(hide_when.to_string());
        self
    }

    pub fn hidden_in_preview(mut self) -> Variable {
        self.hide_in_preview = true;
        self
    }

    /// The effective input type: the explicit one, or a guess from the
    /// options, label and placeholder.
    pub fn input_type(&self) -> InputType {
        if let Some(input_type) = self.input_type {
            return input_type;
        }
        if self.options.len() == 2 {
            return InputType::Toggle;
        }

        let haystack = format!("{} {}", self.label, self.placeholder).to_lowercase();
        if LONG_FORM_KEYWORDS.iter().any(|keyword| haystack.contains(keyword)) {
            InputType::Textarea
        } else {
            InputType::Text
        }
    }

    pub fn is_toggle(&self) -> bool {
        self.input_type() == InputType::Toggle
    }

    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }

    pub fn placeholder_token(&self) -> String {
        format!("{{{{{}}}}}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub template: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
}

impl Step {
    pub fn new(id: &str, name: &str, template: &str) -> Step {
        Step {
            id: id.to_string(),
            name: name.to_string(),
            template: template.to_string(),
            variables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template: String,
    /// Overrides the prompt-level variables when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

impl Variant {
    pub fn new(id: &str, name: &str, template: &str) -> Variant {
        Variant {
            id: id.to_string(),
            name: name.to_string(),
            template: template.to_string(),
            ..Variant::default()
        }
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Variant {
        self.variables = variables;
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Variant {
        self.steps = steps;
        self
    }
}

/// Template text, variables and optional steps of a prompt without variants,
/// or the prompt-level fallback of one with variants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateBody {
    pub template: String,
    pub variables: Vec<Variable>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptBody {
    Simple(TemplateBody),
    Variants {
        variations: Vec<Variant>,
        active_variation_id: Option<String>,
        fallback: TemplateBody,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub use_count: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// In-memory UI state of a prompt. Never written to the library file.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub locked: bool,
    pub active_tab: ActiveTab,
    pub active_step: usize,
    /// Snapshot of the editable template taken when edit mode was entered.
    pub original_template: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            locked: true,
            active_tab: ActiveTab::Variables,
            active_step: 0,
            original_template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PromptRecord", into = "PromptRecord")]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub archived: bool,
    pub body: PromptBody,
    pub usage: Usage,
    pub view: ViewState,
}

impl Prompt {
    pub fn new_simple(id: &str, title: &str, category: &str, template: &str, variables: Vec<Variable>) -> Prompt {
        Prompt {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: category.to_string(),
            archived: false,
            body: PromptBody::Simple(TemplateBody {
                template: template.to_string(),
                variables,
                steps: Vec::new(),
            }),
            usage: Usage::default(),
            view: ViewState::default(),
        }
    }

    /// Builds a prompt whose body is a set of variants. Falls back to a simple
    /// prompt when `variations` is empty.
    pub fn new_with_variations(id: &str, title: &str, category: &str, variations: Vec<Variant>) -> Prompt {
        let mut prompt = Prompt::new_simple(id, title, category, "", Vec::new());
        if !variations.is_empty() {
            prompt.body = PromptBody::Variants {
                active_variation_id: variations.first().map(|v| v.id.clone()),
                variations,
                fallback: TemplateBody::default(),
            };
        }
        prompt
    }

    pub fn with_description(mut self, description: &str) -> Prompt {
        self.description = description.to_string();
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Prompt {
        match &mut self.body {
            PromptBody::Simple(body) => body.steps = steps,
            PromptBody::Variants { fallback, .. } => fallback.steps = steps,
        }
        self
    }

    /// Sets the prompt-level variables (the fallback set for variants).
    pub fn with_variables(mut self, variables: Vec<Variable>) -> Prompt {
        self.prompt_level_mut().variables = variables;
        self
    }

    pub fn prompt_level(&self) -> &TemplateBody {
        match &self.body {
            PromptBody::Simple(body) => body,
            PromptBody::Variants { fallback, .. } => fallback,
        }
    }

    pub fn prompt_level_mut(&mut self) -> &mut TemplateBody {
        match &mut self.body {
            PromptBody::Simple(body) => body,
            PromptBody::Variants { fallback, .. } => fallback,
        }
    }

    pub fn variations(&self) -> &[Variant] {
        match &self.body {
            PromptBody::Simple(_) => &[],
            PromptBody::Variants { variations, .. } => variations,
        }
    }

    pub fn active_variation_id(&self) -> Option<&str> {
        match &self.body {
            PromptBody::Simple(_) => None,
            PromptBody::Variants { active_variation_id, .. } => active_variation_id.as_deref(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.view.locked
    }

    pub fn has_pending_edit(&self) -> bool {
        self.view.original_template.is_some()
    }
}

/// The flat JSON shape of a prompt in the library file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Vec<Variant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_variation_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub archived: bool,
    #[serde(default, skip_serializing)]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing)]
    pub active_tab: Option<ActiveTab>,
    #[serde(default, skip_serializing)]
    pub use_count: u64,
    #[serde(default, skip_serializing)]
    pub last_used: Option<DateTime<Utc>>,
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

impl From<PromptRecord> for Prompt {
    fn from(record: PromptRecord) -> Self {
        let fallback = TemplateBody {
            template: record.template.unwrap_or_default(),
            variables: record.variables.unwrap_or_default(),
            steps: record.steps.unwrap_or_default(),
        };

        let body = match record.variations {
            Some(variations) if !variations.is_empty() => PromptBody::Variants {
                active_variation_id: record
                    .active_variation_id
                    .or_else(|| variations.first().map(|v| v.id.clone())),
                variations,
                fallback,
            },
            _ => PromptBody::Simple(fallback),
        };

        let view = ViewState {
            locked: record.locked.unwrap_or(true),
            active_tab: record.active_tab.unwrap_or_default(),
            ..ViewState::default()
        };

        Prompt {
            id: record.id,
            title: record.title,
            description: record.description,
            category: record.category,
            archived: record.archived,
            body,
            usage: Usage {
                use_count: record.use_count,
                last_used: record.last_used,
            },
            view,
        }
    }
}

impl From<Prompt> for PromptRecord {
    fn from(prompt: Prompt) -> Self {
        let (template, variables, steps, variations, active_variation_id) = match prompt.body {
            PromptBody::Simple(body) => (Some(body.template), non_empty(body.variables), non_empty(body.steps), None, None),
            PromptBody::Variants {
                variations,
                active_variation_id,
                fallback,
            } => (
                Some(fallback.template).filter(|t| !t.is_empty()),
                non_empty(fallback.variables),
                non_empty(fallback.steps),
                Some(variations),
                active_variation_id,
            ),
        };

        PromptRecord {
            id: prompt.id,
            title: prompt.title,
            description: prompt.description,
            category: prompt.category,
            template,
            variables,
            steps,
            variations,
            active_variation_id,
            archived: prompt.archived,
            locked: Some(prompt.view.locked),
            active_tab: Some(prompt.view.active_tab),
            use_count: prompt.usage.use_count,
            last_used: prompt.usage.last_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_simple_prompt() {
        let prompt = Prompt::new_simple("p1", "Greeting", "General", "Hello {{name}}", vec![Variable::new("name")]);

        assert_eq!("p1", prompt.id);
        assert!(prompt.is_locked());
        assert_eq!(ActiveTab::Variables, prompt.view.active_tab);
        assert!(prompt.variations().is_empty());
        assert_eq!("Hello {{name}}", prompt.prompt_level().template);
    }

    #[test]
    fn test_new_with_variations_selects_first() {
        let prompt = Prompt::new_with_variations(
            "p1",
            "Greeting",
            "General",
            vec![Variant::new("a", "A", "A text"), Variant::new("b", "B", "B text")],
        );

        assert_eq!(Some("a"), prompt.active_variation_id());
        assert_eq!(2, prompt.variations().len());
    }

    #[test]
    fn test_new_with_empty_variations_is_simple() {
        let prompt = Prompt::new_with_variations("p1", "Greeting", "General", vec![]);
        assert!(matches!(prompt.body, PromptBody::Simple(_)));
    }

    #[test]
    fn test_input_type_explicit_wins() {
        let mut variable = Variable::new("notes").with_label("Paste your notes");
        variable.input_type = Some(InputType::Text);
        assert_eq!(InputType::Text, variable.input_type());
    }

    #[test]
    fn test_input_type_inferred_textarea() {
        let variable = Variable::new("body").with_label("Article").with_placeholder("Paste the article here");
        assert_eq!(InputType::Textarea, variable.input_type());

        let variable = Variable::new("ctx").with_placeholder("Any extra CONTEXT?");
        assert_eq!(InputType::Textarea, variable.input_type());
    }

    #[test]
    fn test_input_type_inferred_text() {
        let variable = Variable::new("name").with_label("Your name").with_placeholder("Ada");
        assert_eq!(InputType::Text, variable.input_type());
    }

    #[test]
    fn test_input_type_inferred_toggle_from_options() {
        let mut variable = Variable::new("mode");
        variable.options = vec!["off".to_string(), "on".to_string()];
        assert!(variable.is_toggle());
    }

    #[test]
    fn test_placeholder_token() {
        assert_eq!("{{topic}}", Variable::new("topic").placeholder_token());
    }

    #[test]
    fn test_deserialize_simple_record() {
        let json = r#"{
            "id": "p1",
            "title": "Greeting",
            "description": "Says hello",
            "category": "General",
            "template": "Hello {{name}}",
            "variables": [{"name": "name", "label": "Name", "placeholder": "Ada", "hideInPreview": true}]
        }"#;

        let prompt: Prompt = serde_json::from_str(json).unwrap();

        assert_eq!("Greeting", prompt.title);
        assert!(prompt.is_locked());
        match &prompt.body {
            PromptBody::Simple(body) => {
                assert_eq!("Hello {{name}}", body.template);
                assert_eq!(1, body.variables.len());
                assert!(body.variables[0].hide_in_preview);
            }
            _ => panic!("Expected Simple body"),
        }
    }

    #[test]
    fn test_deserialize_variations_defaults_active_to_first() {
        let json = r#"{
            "id": "p2",
            "title": "Essay",
            "category": "Writing",
            "template": "fallback",
            "variations": [
                {"id": "short", "name": "Short", "template": "Short {{topic}}"},
                {"id": "long", "name": "Long", "template": "Long {{topic}}",
                 "variables": [{"name": "topic", "label": "Topic"}]}
            ]
        }"#;

        let prompt: Prompt = serde_json::from_str(json).unwrap();

        assert_eq!(Some("short"), prompt.active_variation_id());
        assert_eq!("fallback", prompt.prompt_level().template);
        assert_eq!(1, prompt.variations()[1].variables.len());
    }

    #[test]
    fn test_deserialize_empty_variations_is_simple() {
        let json = r#"{"id": "p3", "title": "T", "category": "C", "template": "X", "variations": []}"#;
        let prompt: Prompt = serde_json::from_str(json).unwrap();
        assert!(matches!(prompt.body, PromptBody::Simple(_)));
    }

    #[test]
    fn test_serialize_omits_view_state_and_usage() {
        let mut prompt = Prompt::new_simple("p1", "Greeting", "General", "Hello", vec![]);
        prompt.view.locked = false;
        prompt.view.original_template = Some("Hello".to_string());
        prompt.usage.use_count = 4;

        let value = serde_json::to_value(&prompt).unwrap();

        assert_eq!("Hello", value["template"]);
        assert!(value.get("locked").is_none());
        assert!(value.get("activeTab").is_none());
        assert!(value.get("useCount").is_none());
        assert!(value.get("variables").is_none());
        assert!(value.get("originalTemplate").is_none());
    }

    #[test]
    fn test_serialize_variations_round_trip() {
        let prompt = Prompt::new_with_variations(
            "p1",
            "Greeting",
            "General",
            vec![Variant::new("a", "A", "Hi {{name}}").with_variables(vec![Variable::new("name")])],
        );

        let json = serde_json::to_string(&prompt).unwrap();
        let loaded: Prompt = serde_json::from_str(&json).unwrap();

        assert_eq!(prompt.variations(), loaded.variations());
        assert_eq!(Some("a"), loaded.active_variation_id());
        assert!(!json.contains("\"template\":\"\""));
    }

    #[test]
    fn test_variable_serializes_camel_case() {
        let variable = Variable::toggle("mode", "off", "on");
        let dependent = Variable::new("detail").depending_on("mode", "off").hidden_in_preview();

        let json = serde_json::to_string(&vec![variable, dependent]).unwrap();

        assert!(json.contains("\"inputType\":\"toggle\""));
        assert!(json.contains("\"dependsOn\":\"mode\""));
        assert!(json.contains("\"hideWhen\":\"off\""));
        assert!(json.contains("\"hideInPreview\":true"));
    }
}
