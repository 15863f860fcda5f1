//! # Prompt Registry
//!
//! This module defines the collaborator contract for loading and writing back
//! prompts, and the in-memory repository the rest of the crate works on.
//!
//! The main components are:
//! - [`PromptSource`] trait - Bulk read and write-back of prompt entities
//! - [`PromptRepository`] struct - Ordered, id-keyed store of the loaded prompts
//! - [`PromptFilter`] struct - Search and category filtering for listings

use crate::prompt::Prompt;
use log::warn;
use std::collections::{BTreeSet, HashMap};

pub trait PromptSource {
    type Error: std::error::Error + Send + Sync;

    /// Every prompt, in library order.
    fn get_prompts(&self) -> Result<Vec<Prompt>, Self::Error>;
    fn get_prompt(&self, id: &str) -> Result<Option<Prompt>, Self::Error>;
    /// Merges `prompt` into the stored entity with the same id and returns
    /// the stored result.
    fn update_prompt(&self, prompt: &Prompt) -> Result<Prompt, Self::Error>;
}

/// Sorted, deduplicated, non-empty categories of `prompts`.
pub fn categories<'a>(prompts: impl IntoIterator<Item = &'a Prompt>) -> Vec<String> {
    prompts
        .into_iter()
        .map(|p| p.category.as_str())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct PromptFilter {
    /// Case-insensitive substring matched against title, description and category.
    pub search: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    pub include_archived: bool,
}

impl PromptFilter {
    pub fn matches(&self, prompt: &Prompt) -> bool {
        if prompt.archived && !self.include_archived {
            return false;
        }

        let matches_category = match self.category.as_deref() {
            Some(category) if !category.is_empty() => prompt.category == category,
            _ => true,
        };

        let matches_search = match self.search.as_deref() {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                prompt.title.to_lowercase().contains(&term)
                    || prompt.description.to_lowercase().contains(&term)
                    || prompt.category.to_lowercase().contains(&term)
            }
            _ => true,
        };

        matches_category && matches_search
    }
}

/// The loaded prompts, keyed by id, in library order.
#[derive(Debug, Clone, Default)]
pub struct PromptRepository {
    prompts: Vec<Prompt>,
    index: HashMap<String, usize>,
}

impl PromptRepository {
    /// Builds a repository from `prompts`. When ids repeat, the first prompt
    /// is kept and the rest are dropped with a warning.
    pub fn new(prompts: Vec<Prompt>) -> Self {
        let mut repository = PromptRepository::default();
        for prompt in prompts {
            if repository.index.contains_key(&prompt.id) {
                warn!("Dropping prompt with duplicate id '{}'", prompt.id);
                continue;
            }
            repository.index.insert(prompt.id.clone(), repository.prompts.len());
            repository.prompts.push(prompt);
        }
        repository
    }

    pub fn get(&self, id: &str) -> Option<&Prompt> {
        self.index.get(id).map(|&i| &self.prompts[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Prompt> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.prompts[i]),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Prompt> {
        self.prompts.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn categories(&self) -> Vec<String> {
        categories(&self.prompts)
    }

    pub fn filter(&self, filter: &PromptFilter) -> Vec<&Prompt> {
        self.prompts.iter().filter(|p| filter.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: &str, title: &str, category: &str) -> Prompt {
        Prompt::new_simple(id, title, category, "", vec![])
    }

    fn library() -> PromptRepository {
        let mut archived = prompt("old", "Old Essay", "Writing");
        archived.archived = true;
        PromptRepository::new(vec![
            prompt("essay", "Essay Outline", "Writing"),
            prompt("bug", "Bug Report", "Engineering").with_description("Describe a defect"),
            prompt("review", "Code Review", "Engineering"),
            archived,
        ])
    }

    #[test]
    fn test_categories_sorted_and_deduplicated() {
        let repository = PromptRepository::new(vec![
            prompt("essay", "Essay Outline", "Writing"),
            prompt("blank", "Blank", ""),
            prompt("bug", "Bug Report", "Engineering"),
            prompt("review", "Code Review", "Engineering"),
        ]);
        assert_eq!(vec!["Engineering".to_string(), "Writing".to_string()], repository.categories());
    }

    #[test]
    fn test_get_by_id() {
        let repository = library();
        assert_eq!("Bug Report", repository.get("bug").unwrap().title);
        assert!(repository.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let repository = PromptRepository::new(vec![prompt("a", "First", "C"), prompt("a", "Second", "C")]);
        assert_eq!(1, repository.len());
        assert_eq!("First", repository.get("a").unwrap().title);
    }

    #[test]
    fn test_filter_excludes_archived_by_default() {
        let repository = library();
        let all = repository.filter(&PromptFilter::default());
        assert_eq!(3, all.len());

        let with_archived = repository.filter(&PromptFilter {
            include_archived: true,
            ..PromptFilter::default()
        });
        assert_eq!(4, with_archived.len());
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let repository = library();
        let found = repository.filter(&PromptFilter {
            search: Some("DEFECT".to_string()),
            ..PromptFilter::default()
        });
        assert_eq!(1, found.len());
        assert_eq!("bug", found[0].id);
    }

    #[test]
    fn test_filter_by_category_and_search() {
        let repository = library();
        let found = repository.filter(&PromptFilter {
            search: Some("e".to_string()),
            category: Some("Engineering".to_string()),
            include_archived: false,
        });
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(vec!["bug", "review"], ids);
    }
}
