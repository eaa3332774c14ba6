//! Static tool catalog

use serde_json::json;

use crate::llm::ToolDefinition;
use crate::{Error, Result};

/// Every tool the assistant may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrmTool {
    SearchContact,
    AddOrUpdateContact,
    AddNoteToContact,
    CreateOrListTasks,
}

impl CrmTool {
    /// All tools, in catalog order
    pub const ALL: [Self; 4] = [
        Self::SearchContact,
        Self::AddOrUpdateContact,
        Self::AddNoteToContact,
        Self::CreateOrListTasks,
    ];

    /// Wire name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchContact => "search_contact",
            Self::AddOrUpdateContact => "add_or_update_contact",
            Self::AddNoteToContact => "add_note_to_contact",
            Self::CreateOrListTasks => "create_or_list_tasks",
        }
    }

    /// Resolve a model-supplied name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`] for names outside the catalog
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SearchContact => {
                "Search for a contact by name and return details including notes and tasks."
            }
            Self::AddOrUpdateContact => "Add a new contact or update an existing one by name.",
            Self::AddNoteToContact => "Add a note to a contact by name",
            Self::CreateOrListTasks => {
                "Create a new task for a contact or list tasks. For create: provide task and \
                 due_date (YYYY-MM-DD). For list: provide only contact_name."
            }
        }
    }

    /// JSON schema for the arguments object
    #[must_use]
    pub fn parameters(self) -> serde_json::Value {
        match self {
            Self::SearchContact => json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
            Self::AddOrUpdateContact => json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "phone": {"type": "string"},
                    "email": {"type": "string"}
                },
                "required": ["name"]
            }),
            Self::AddNoteToContact => json!({
                "type": "object",
                "properties": {
                    "contact_name": {"type": "string"},
                    "note": {"type": "string"}
                },
                "required": ["contact_name", "note"]
            }),
            Self::CreateOrListTasks => json!({
                "type": "object",
                "properties": {
                    "contact_name": {"type": "string"},
                    "task": {"type": "string"},
                    "due_date": {"type": "string"}
                },
                "required": ["contact_name"]
            }),
        }
    }

    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// The full catalog handed to the model
#[must_use]
pub fn catalog() -> Vec<ToolDefinition> {
    CrmTool::ALL.into_iter().map(CrmTool::definition).collect()
}
