// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Document lookup provider
//
// Loads every `*.txt` file of a directory once and answers with the document
// sharing the most words with the query.

use std::collections::HashSet;
use std::path::Path;

use crate::domain::provider::{ProviderError, ProviderOutput, SyncProvider};

const NO_MATCH: &str = "No relevant information found.";

#[derive(Debug, Clone)]
struct Document {
    name: String,
    text: String,
    words: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocsProvider {
    documents: Vec<Document>,
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

impl DocsProvider {
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut provider = Self::default();
        for path in paths {
            let text = std::fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            provider.add(name, text);
        }

        tracing::info!("Loaded {} documents from {:?}", provider.len(), dir);
        Ok(provider)
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let text = text.into();
        self.documents.push(Document {
            name: name.into(),
            words: words(&text),
            text,
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn best_match(&self, query: &str) -> Option<&Document> {
        let query_words = words(query);
        let mut best: Option<(&Document, usize)> = None;
        for doc in &self.documents {
            let score = query_words.intersection(&doc.words).count();
            // ties keep the earliest document
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((doc, score));
            }
        }
        best.map(|(doc, _)| doc)
    }
}

impl SyncProvider for DocsProvider {
    fn process(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        match self.best_match(query) {
            Some(doc) => {
                tracing::debug!("Document '{}' matched query", doc.name);
                Ok(doc.text.trim().into())
            }
            None => Ok(NO_MATCH.into()),
        }
    }
}
