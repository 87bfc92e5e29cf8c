//! Command table: registration and lookup.
//!
//! The table is built once by an explicit registration pass and swapped
//! in wholesale on reload; it is never mutated incrementally. A name
//! collision at build time is an error, not a silent overwrite.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::permissions::Requirements;

use super::CommandHandler;

/// One registered command: names, metadata and declared requirements.
pub struct CommandSpec {
    names: Vec<String>,
    tags: Vec<String>,
    help: Vec<String>,
    requirements: Requirements,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    /// Register a handler under one or more names. Names are matched
    /// case-insensitively (stored lower-cased).
    pub fn new<I, S>(names: I, handler: Arc<dyn CommandHandler>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.into().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
            tags: Vec::new(),
            help: Vec::new(),
            requirements: Requirements::default(),
            handler,
        }
    }

    #[must_use]
    pub fn owner_only(mut self) -> Self {
        self.requirements.owner = true;
        self
    }

    #[must_use]
    pub fn user_admin(mut self) -> Self {
        self.requirements.user_admin = true;
        self
    }

    #[must_use]
    pub fn bot_admin(mut self) -> Self {
        self.requirements.bot_admin = true;
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn help<I, S>(mut self, help: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.help = help.into_iter().map(Into::into).collect();
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("names", &self.names)
            .field("requirements", &self.requirements)
            .finish()
    }
}

/// Registration failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command name '{name}' registered more than once")]
    DuplicateName { name: String },

    #[error("command registration carries no usable names")]
    EmptyNames,
}

/// Builder collecting command registrations into an immutable table.
#[derive(Default)]
pub struct RegistryBuilder {
    specs: Vec<Arc<CommandSpec>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(mut self, spec: CommandSpec) -> Self {
        self.specs.push(Arc::new(spec));
        self
    }

    /// Build the command table. A duplicate name across registrations is
    /// an error at build time.
    pub fn build(self) -> Result<CommandRegistry, RegistryError> {
        let mut by_name = HashMap::new();
        for spec in &self.specs {
            if spec.names().is_empty() {
                return Err(RegistryError::EmptyNames);
            }
            for name in spec.names() {
                if by_name.insert(name.clone(), Arc::clone(spec)).is_some() {
                    return Err(RegistryError::DuplicateName { name: name.clone() });
                }
            }
        }
        Ok(CommandRegistry {
            by_name,
            specs: self.specs,
        })
    }
}

/// Immutable command name → handler table.
#[derive(Default)]
pub struct CommandRegistry {
    by_name: HashMap<String, Arc<CommandSpec>>,
    specs: Vec<Arc<CommandSpec>>,
}

impl CommandRegistry {
    /// Empty table; useful before the first reload.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CommandSpec>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Serializable index of all registrations, for menus and panels.
    pub fn index(&self) -> Vec<CommandIndexEntry> {
        self.specs
            .iter()
            .map(|spec| CommandIndexEntry {
                commands: spec.names.clone(),
                tags: spec.tags.clone(),
                help: spec.help.clone(),
                owner: spec.requirements.owner,
                user_admin: spec.requirements.user_admin,
                bot_admin: spec.requirements.bot_admin,
            })
            .collect()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One row of the command index.
#[derive(Debug, Clone, Serialize)]
pub struct CommandIndexEntry {
    pub commands: Vec<String>,
    pub tags: Vec<String>,
    pub help: Vec<String>,
    pub owner: bool,
    pub user_admin: bool,
    pub bot_admin: bool,
}
