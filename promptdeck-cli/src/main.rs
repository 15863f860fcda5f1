mod clipboard;
mod config;
mod constants;

use crate::clipboard::{ArboardClipboard, StdoutSink, UnavailableClipboard};
use crate::config::get_paths;
use crate::constants::PROMPTDECK_CLI;
use anyhow::{Context, bail};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use log::{LevelFilter, warn};
use promptdeck_core::clipboard::{ClipboardSink, CopyMethod};
use promptdeck_core::dependency::compute_visibility;
use promptdeck_core::file_storage::FileStorage;
use promptdeck_core::kv_store::FileKeyValueStore;
use promptdeck_core::prompt::Prompt;
use promptdeck_core::registry::PromptFilter;
use promptdeck_core::resolver::{active_step_index, active_steps, active_variables, active_variant};
use promptdeck_core::session::{PromptLibrary, Transition};
use promptdeck_core::validation::has_errors;
use promptdeck_core::view::preview;
use std::io;
use std::path::PathBuf;

type Library = PromptLibrary<FileStorage, FileKeyValueStore>;

#[derive(Parser, Debug)]
#[command(version,
display_name = "promptdeck",
bin_name = "promptdeck",
about = "A library of reusable prompt templates",
long_about = "A library of reusable prompt templates with fill-in variables, variants and steps")]
struct Args {
    /// Library file, overriding the configured one.
    #[arg(short = 'l', long, global = true)]
    library: Option<PathBuf>,

    /// Directory for saved values and usage, overriding the configured one.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// List prompts.
    List {
        #[arg(short = 'c', long)]
        category: Option<String>,
        #[arg(short = 's', long)]
        search: Option<String>,
        /// Include archived prompts.
        #[arg(short = 'a', long)]
        archived: bool,
    },
    /// List categories.
    Categories,
    /// Show a prompt, its variables and the compiled text.
    Show {
        id: String,
        #[arg(long)]
        variant: Option<String>,
        /// Step number, starting at 1.
        #[arg(long)]
        step: Option<usize>,
    },
    /// Set variable values, e.g. `set essay topic=Rust tone=dry`.
    Set {
        id: String,
        #[arg(required = true)]
        assignments: Vec<String>,
        #[arg(long)]
        variant: Option<String>,
    },
    /// Clear the saved variable values of a prompt.
    Clear { id: String },
    /// Compile a prompt and copy it to the clipboard.
    Copy {
        id: String,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long)]
        step: Option<usize>,
    },
    /// Replace the template of a prompt (or of one of its variants).
    Edit {
        id: String,
        #[arg(short = 't', long)]
        template: String,
        #[arg(long)]
        variant: Option<String>,
    },
    /// Check the library for inconsistencies.
    Validate,
    /// Print shell completions.
    Completions { shell: Shell },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if let Commands::Completions { shell } = &args.cmd {
        clap_complete::generate(*shell, &mut Args::command(), PROMPTDECK_CLI, &mut io::stdout());
        return Ok(());
    }

    let paths = get_paths(args.library, args.state_dir);
    let storage = FileStorage::new(paths.library_path);
    let store = FileKeyValueStore::new(paths.state_dir);
    let mut library = PromptLibrary::load(storage, store);

    match args.cmd {
        Commands::List {
            category,
            search,
            archived,
        } => {
            let filter = PromptFilter {
                search,
                category,
                include_archived: archived,
            };
            for prompt in library.filter(&filter) {
                print_summary(prompt);
            }
        }
        Commands::Categories => {
            for category in library.categories() {
                println!("{}", category);
            }
        }
        Commands::Show { id, variant, step } => {
            select(&mut library, &id, variant.as_deref(), step)?;
            let prompt = find(&library, &id)?;
            print_details(prompt);
        }
        Commands::Set {
            id,
            assignments,
            variant,
        } => {
            select(&mut library, &id, variant.as_deref(), None)?;
            for assignment in &assignments {
                let Some((name, value)) = assignment.split_once('=') else {
                    bail!("Expected NAME=VALUE, got '{}'", assignment);
                };
                if library.set_variable(&id, name.trim(), value) == Transition::Ignored {
                    bail!("Prompt '{}' has no variable '{}'", id, name.trim());
                }
            }
        }
        Commands::Clear { id } => {
            find(&library, &id)?;
            library.clear_variables(&id);
        }
        Commands::Copy { id, variant, step } => {
            select(&mut library, &id, variant.as_deref(), step)?;

            let mut primary: Box<dyn ClipboardSink> = match ArboardClipboard::new() {
                Ok(clipboard) => Box::new(clipboard),
                Err(e) => {
                    warn!("{}", e);
                    Box::new(UnavailableClipboard(e.to_string()))
                }
            };
            let method = library
                .copy(&id, primary.as_mut(), &mut StdoutSink, Utc::now())
                .context("Failed to copy prompt")?;
            if method == CopyMethod::Clipboard {
                eprintln!("Copied '{}' to the clipboard", id);
            }
        }
        Commands::Edit {
            id,
            template,
            variant,
        } => {
            select(&mut library, &id, variant.as_deref(), None)?;
            library.enable_edit(&id);
            library.edit_template(&id, &template);
            library
                .save(&id)
                .with_context(|| format!("Failed to save prompt '{}'", id))?;
        }
        Commands::Validate => {
            let issues = library.issues();
            for issue in issues {
                println!("{}", issue);
            }
            if has_errors(issues) {
                std::process::exit(exitcode::DATAERR);
            }
            if issues.is_empty() {
                println!("No issues found");
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn find<'a>(library: &'a Library, id: &str) -> anyhow::Result<&'a Prompt> {
    library
        .prompt(id)
        .with_context(|| format!("Prompt '{}' not found", id))
}

/// Applies `--variant` and `--step` before a command runs.
fn select(library: &mut Library, id: &str, variant: Option<&str>, step: Option<usize>) -> anyhow::Result<()> {
    let prompt = find(library, id)?;

    if let Some(variant) = variant {
        if !prompt.variations().iter().any(|v| v.id == variant) {
            bail!("Prompt '{}' has no variant '{}'", id, variant);
        }
        library.switch_variant(id, variant);
    }

    if let Some(step) = step {
        let count = find(library, id).map(|p| active_steps(p).len())?;
        if step == 0 || step > count {
            bail!("Prompt '{}' has {} step(s), got step {}", id, count, step);
        }
        library.go_to_step(id, step - 1);
    }
    Ok(())
}

fn print_summary(prompt: &Prompt) {
    let archived = if prompt.archived { " (archived)" } else { "" };
    println!(
        "{:<24} {:<40} [{}] used {} time(s){}",
        prompt.id, prompt.title, prompt.category, prompt.usage.use_count, archived
    );
}

fn print_details(prompt: &Prompt) {
    println!("{} [{}]", prompt.title, prompt.category);
    if !prompt.description.is_empty() {
        println!("{}", prompt.description);
    }

    let active = active_variant(prompt).map(|v| v.id.as_str());
    for variant in prompt.variations() {
        let marker = if Some(variant.id.as_str()) == active { "*" } else { " " };
        println!("{} variant {}: {}", marker, variant.id, variant.name);
    }

    let current = active_step_index(prompt);
    for (index, step) in active_steps(prompt).iter().enumerate() {
        let marker = if Some(index) == current { "*" } else { " " };
        println!("{} step {}: {}", marker, index + 1, step.name);
    }

    let visibility = compute_visibility(active_variables(prompt));
    println!();
    for variable in active_variables(prompt) {
        if visibility.get(&variable.name).copied().unwrap_or(false) {
            continue;
        }
        println!("  {} = {:?} ({:?})", variable.name, variable.value, variable.input_type());
    }

    println!("---");
    println!("{}", preview(prompt));
}
