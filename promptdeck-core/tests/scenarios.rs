use promptdeck_core::compiler::compile;
use promptdeck_core::file_storage::FileStorage;
use promptdeck_core::kv_store::FileKeyValueStore;
use promptdeck_core::prompt::{Prompt, PromptBody};
use promptdeck_core::registry::PromptSource;
use promptdeck_core::session::{PromptLibrary, Transition};
use std::fs;
use tempfile::TempDir;

const LIBRARY: &str = r#"[
  {
    "id": "p1",
    "title": "Greeting",
    "category": "General",
    "template": "Hello {{name}}, you chose {{opt}}",
    "variables": [
      {"name": "name", "value": "Ada"},
      {"name": "opt", "value": "B", "hideInPreview": true}
    ]
  },
  {
    "id": "x",
    "title": "Plain",
    "category": "General",
    "template": "X"
  },
  {
    "id": "essay",
    "title": "Essay",
    "category": "Writing",
    "variables": [{"name": "topic", "label": "Topic"}],
    "variations": [
      {"id": "short", "name": "Short", "template": "Short essay on {{topic}}"},
      {"id": "long", "name": "Long", "template": "Long essay on {{topic}}", "variables": []}
    ]
  },
  {
    "id": "code review/v2",
    "title": "Code Review",
    "category": "Engineering",
    "template": "Review this {{lang}} change",
    "variables": [{"name": "lang", "label": "Language"}]
  }
]"#;

fn open(dir: &TempDir) -> PromptLibrary<FileStorage, FileKeyValueStore> {
    let storage = FileStorage::new(dir.path().join("prompts.json"));
    let store = FileKeyValueStore::new(dir.path().join("state"));
    PromptLibrary::load(storage, store)
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("prompts.json"), LIBRARY).unwrap();
    dir
}

#[test]
fn test_hidden_variable_is_removed_from_output() {
    let dir = setup();
    let library = open(&dir);

    assert_eq!(Some("Hello Ada, you chose ".to_string()), library.preview("p1"));

    let prompt = library.prompt("p1").unwrap();
    let PromptBody::Simple(body) = &prompt.body else {
        panic!("expected a simple prompt");
    };
    assert_eq!("Hello Ada, you chose ", compile(&body.template, &body.variables));
}

#[test]
fn test_discard_restores_template_and_clears_snapshot() {
    let dir = setup();
    let mut library = open(&dir);

    assert_eq!(Transition::Applied, library.enable_edit("x"));
    assert_eq!(Transition::Applied, library.edit_template("x", "Y"));
    assert_eq!(Transition::Applied, library.discard("x", |_, _| true));

    let prompt = library.prompt("x").unwrap();
    assert_eq!("X", prompt.prompt_level().template);
    assert!(prompt.view.original_template.is_none());
    assert!(prompt.is_locked());
}

#[test]
fn test_variant_switch_falls_back_and_keeps_values() {
    let dir = setup();
    let mut library = open(&dir);

    library.set_variable("essay", "topic", "ownership");
    assert_eq!(Transition::Applied, library.switch_variant("essay", "long"));

    assert_eq!(Some("Long essay on ownership".to_string()), library.preview("essay"));
}

#[test]
fn test_values_survive_reopening() {
    let dir = setup();
    {
        let mut library = open(&dir);
        library.set_variable("essay", "topic", "lifetimes");
    }

    let library = open(&dir);
    assert_eq!(Some("Short essay on lifetimes".to_string()), library.preview("essay"));
}

#[test]
fn test_values_survive_reopening_for_any_prompt_id() {
    let dir = setup();
    {
        let mut library = open(&dir);
        assert_eq!(Transition::Applied, library.set_variable("code review/v2", "lang", "Rust"));
    }

    let library = open(&dir);
    assert_eq!(
        Some("Review this Rust change".to_string()),
        library.preview("code review/v2")
    );
    assert!(!dir.path().join("state").join("prompt_vars_code review").exists());
}

#[test]
fn test_cleared_values_stay_cleared_after_saving_an_edit() {
    let dir = setup();
    {
        let mut library = open(&dir);
        library.set_variable("essay", "topic", "secret");
        library.enable_edit("essay");
        library.edit_template("essay", "Brief essay on {{topic}}");
        assert_eq!(Transition::Applied, library.save("essay").unwrap());
        assert_eq!(Transition::Applied, library.clear_variables("essay"));
    }

    let library = open(&dir);
    assert_eq!(Some("Brief essay on ".to_string()), library.preview("essay"));
    let content = fs::read_to_string(dir.path().join("prompts.json")).unwrap();
    assert!(!content.contains("secret"));
}

#[test]
fn test_saved_edit_is_written_to_library_file() {
    let dir = setup();
    let mut library = open(&dir);

    library.enable_edit("essay");
    library.edit_template("essay", "Brief essay on {{topic}}");
    assert_eq!(Transition::Applied, library.save("essay").unwrap());

    let stored = FileStorage::new(dir.path().join("prompts.json"))
        .get_prompt("essay")
        .unwrap()
        .unwrap();
    assert_eq!("Brief essay on {{topic}}", stored.variations()[0].template);
    assert_eq!(2, stored.variations().len());
    assert_eq!("topic", stored.prompt_level().variables[0].name);
}

#[test]
fn test_corrupt_state_is_ignored() {
    let dir = setup();
    fs::create_dir_all(dir.path().join("state")).unwrap();
    fs::write(dir.path().join("state").join("prompt_vars_essay.json"), "not json").unwrap();

    let library = open(&dir);
    assert_eq!(Some("Short essay on ".to_string()), library.preview("essay"));
}

#[test]
fn test_missing_library_is_empty() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    assert_eq!(0, library.prompts().count());
    assert!(library.categories().is_empty());
}

#[test]
fn test_library_round_trip_preserves_shape() {
    let dir = setup();
    let storage = FileStorage::new(dir.path().join("prompts.json"));
    let prompts: Vec<Prompt> = storage.get_prompts().unwrap();

    storage.write_library(&prompts).unwrap();

    assert_eq!(prompts, storage.get_prompts().unwrap());
}
