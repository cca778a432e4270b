//! The definition store: registry of service blueprints, contextual
//! overrides, tags, and post-build extenders.

use indexmap::IndexMap;

use crate::definition::{Concrete, ExtenderFn, ServiceDefinition};
use crate::error::{DiResult, ErrorKind};

/// One contextual override: when `consumer` asks for `needs`, give `give`.
///
/// The consumer side may be an exact id or a trailing-`*` wildcard pattern.
#[derive(Debug, Clone)]
pub struct ContextualRule {
    pub consumer: String,
    pub needs: String,
    pub give: Concrete,
}

impl ContextualRule {
    fn matches_consumer(&self, consumer: &str) -> bool {
        if let Some(prefix) = self.consumer.strip_suffix('*') {
            consumer.starts_with(prefix)
        } else {
            self.consumer == consumer
        }
    }

    fn is_exact(&self) -> bool {
        !self.consumer.ends_with('*')
    }
}

/// Registry of definitions, contextual rules, tags, and extenders.
///
/// Writes happen during the registration phase only; once the container is
/// published for concurrent reads the store is effectively frozen
/// (publish-once discipline). All operations succeed apart from registration
/// of an empty id, which is rejected when the definition is built.
#[derive(Default)]
pub struct DefinitionStore {
    definitions: IndexMap<String, ServiceDefinition>,
    contextual: Vec<ContextualRule>,
    tags: IndexMap<String, Vec<String>>,
    extenders: IndexMap<String, Vec<ExtenderFn>>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a definition, replacing any prior entry for the same id. The
    /// replaced definition's tags leave the reverse index with it.
    pub fn add(&mut self, definition: ServiceDefinition) {
        if let Some(previous) = self.definitions.get(&definition.abstract_id) {
            for tag in &previous.tags {
                if let Some(ids) = self.tags.get_mut(tag) {
                    ids.retain(|id| id != &definition.abstract_id);
                }
            }
            self.tags.retain(|_, ids| !ids.is_empty());
        }
        for tag in &definition.tags {
            Self::push_tag(&mut self.tags, tag, &definition.abstract_id);
        }
        self.definitions
            .insert(definition.abstract_id.clone(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&ServiceDefinition> {
        self.definitions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ServiceDefinition> {
        self.definitions.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Registers a contextual rule. Empty consumer or needs ids are invalid.
    pub fn add_contextual(
        &mut self,
        consumer: impl Into<String>,
        needs: impl Into<String>,
        give: Concrete,
    ) -> DiResult<()> {
        let consumer = consumer.into();
        let needs = needs.into();
        if consumer.is_empty() || needs.is_empty() {
            return Err(ErrorKind::InvalidDefinition {
                reason: "contextual binding ids must not be empty".into(),
            }
            .into());
        }
        self.contextual.push(ContextualRule {
            consumer,
            needs,
            give,
        });
        Ok(())
    }

    /// Finds the contextual concrete for `(consumer, needs)`.
    ///
    /// Exact consumer matches win over wildcard patterns; among wildcard
    /// matches the longest prefix wins, then registration order. First match
    /// wins overall.
    pub fn contextual_match(&self, consumer: &str, needs: &str) -> Option<&Concrete> {
        let mut best: Option<&ContextualRule> = None;
        for rule in &self.contextual {
            if rule.needs != needs || !rule.matches_consumer(consumer) {
                continue;
            }
            if rule.is_exact() {
                return Some(&rule.give);
            }
            let better = match best {
                None => true,
                Some(current) => rule.consumer.len() > current.consumer.len(),
            };
            if better {
                best = Some(rule);
            }
        }
        best.map(|rule| &rule.give)
    }

    /// Attaches tags to an id, preserving insertion order and skipping
    /// duplicates.
    pub fn add_tags(&mut self, id: &str, tags: &[&str]) {
        for tag in tags {
            Self::push_tag(&mut self.tags, tag, id);
        }
        if let Some(def) = self.definitions.get_mut(id) {
            for tag in tags {
                if !def.tags.iter().any(|t| t == tag) {
                    def.tags.push((*tag).to_string());
                }
            }
        }
    }

    /// Abstract ids carrying the given tag, in insertion order.
    pub fn tagged(&self, tag: &str) -> &[String] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends an extender for an id. Extenders run in registration order.
    pub fn add_extender(&mut self, id: impl Into<String>, extender: ExtenderFn) {
        self.extenders.entry(id.into()).or_default().push(extender);
    }

    pub fn extenders(&self, id: &str) -> &[ExtenderFn] {
        self.extenders.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All definitions, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.definitions.values()
    }

    /// Discards every definition, contextual rule, tag, and extender.
    pub fn clear(&mut self) {
        self.definitions.clear();
        self.contextual.clear();
        self.tags.clear();
        self.extenders.clear();
    }

    fn push_tag(tags: &mut IndexMap<String, Vec<String>>, tag: &str, id: &str) {
        let entry = tags.entry(tag.to_string()).or_default();
        if !entry.iter().any(|existing| existing == id) {
            entry.push(id.to_string());
        }
    }
}
