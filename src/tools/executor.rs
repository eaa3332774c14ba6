//! Tool executor: dispatches tool calls to the CRM store
//!
//! Store lookups that miss and half-specified arguments are not failures;
//! they come back as `Ok` text for the model to relay to the user.

use std::fmt::Write as _;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::CrmTool;
use crate::db::{CrmStore, UpsertOutcome, note::TIMESTAMP_FORMAT, task::DATE_FORMAT};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct SearchContactArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AddOrUpdateContactArgs {
    name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddNoteArgs {
    contact_name: String,
    note: String,
}

#[derive(Debug, Deserialize)]
struct TasksArgs {
    #[serde(default)]
    contact_name: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

/// Executes CRM tool calls against an owned store handle
#[derive(Clone)]
pub struct ToolExecutor {
    store: CrmStore,
}

impl ToolExecutor {
    /// Create a new tool executor
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(store: CrmStore) -> Self {
        Self { store }
    }

    /// Execute a tool call by wire name
    ///
    /// Database work runs on the blocking pool; the single pooled connection
    /// keeps statements serialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`] for names outside the catalog, and
    /// [`Error::Tool`] for malformed arguments or store failures
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        let tool = CrmTool::from_name(name)?;
        let store = self.store.clone();
        let arguments = arguments.to_string();

        tokio::task::spawn_blocking(move || run(&store, tool, &arguments))
            .await
            .map_err(|e| Error::Tool(format!("tool task failed: {e}")))?
    }
}

/// Run a tool synchronously, folding recoverable errors into text
fn run(store: &CrmStore, tool: CrmTool, arguments: &str) -> Result<String> {
    let result = match tool {
        CrmTool::SearchContact => search_contact(store, parse_args(tool, arguments)?),
        CrmTool::AddOrUpdateContact => add_or_update_contact(store, parse_args(tool, arguments)?),
        CrmTool::AddNoteToContact => add_note_to_contact(store, parse_args(tool, arguments)?),
        CrmTool::CreateOrListTasks => create_or_list_tasks(store, parse_args(tool, arguments)?),
    };

    match result {
        Err(e) if e.is_recoverable() => Ok(e.to_string()),
        other => other,
    }
}

fn parse_args<T: DeserializeOwned>(tool: CrmTool, arguments: &str) -> Result<T> {
    let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(raw)
        .map_err(|e| Error::Tool(format!("invalid arguments for {}: {e}", tool.name())))
}

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

fn search_contact(store: &CrmStore, args: SearchContactArgs) -> Result<String> {
    let contacts = store.find_contacts(&args.name)?;
    if contacts.is_empty() {
        return Err(Error::NotFound(args.name));
    }

    let mut out = String::new();
    for contact in &contacts {
        let _ = writeln!(
            out,
            "Contact: {} (ID: {}), Phone: {}, Email: {}",
            contact.name,
            contact.id,
            or_none(contact.phone.as_deref()),
            or_none(contact.email.as_deref()),
        );

        let notes = store.notes_for(contact)?;
        if !notes.is_empty() {
            out.push_str("Notes:\n");
            for note in &notes {
                let _ = writeln!(
                    out,
                    "- {} ({})",
                    note.note,
                    note.created_at.format(TIMESTAMP_FORMAT)
                );
            }
        }

        let tasks = store.tasks_for(contact)?;
        if !tasks.is_empty() {
            out.push_str("Tasks:\n");
            for task in &tasks {
                let _ = writeln!(out, "- {} (due: {})", task.task, task.due_date.format(DATE_FORMAT));
            }
        }
    }

    Ok(out.trim_end().to_string())
}

fn add_or_update_contact(store: &CrmStore, args: AddOrUpdateContactArgs) -> Result<String> {
    let outcome =
        store.upsert_contact(&args.name, args.phone.as_deref(), args.email.as_deref())?;

    Ok(match outcome {
        UpsertOutcome::Created(_) => format!("Added new contact '{}'.", args.name),
        UpsertOutcome::Updated(_) => format!("Updated contact '{}'.", args.name),
    })
}

fn add_note_to_contact(store: &CrmStore, args: AddNoteArgs) -> Result<String> {
    store.add_note(&args.contact_name, &args.note)?;
    Ok(format!("Added note to '{}': {}", args.contact_name, args.note))
}

fn create_or_list_tasks(store: &CrmStore, args: TasksArgs) -> Result<String> {
    let Some(contact_name) = args.contact_name.filter(|n| !n.is_empty()) else {
        return Err(Error::InvalidArguments("Contact name required.".to_string()));
    };

    let task = args.task.as_deref().filter(|s| !s.is_empty());
    let due_date = args.due_date.as_deref().filter(|s| !s.is_empty());

    if task.is_none() && due_date.is_none() {
        let tasks = store.list_tasks(&contact_name)?;
        if tasks.is_empty() {
            return Ok(format!("No tasks for '{contact_name}'."));
        }
        let mut out = format!("Tasks for '{contact_name}':");
        for task in &tasks {
            let _ = write!(out, "\n- {} (due: {})", task.task, task.due_date.format(DATE_FORMAT));
        }
        return Ok(out);
    }

    let created = store.create_task(&contact_name, task, due_date)?;
    Ok(format!(
        "Created task for '{contact_name}': {} (due: {})",
        created.task,
        created.due_date.format(DATE_FORMAT)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn executor() -> ToolExecutor {
        ToolExecutor::new(CrmStore::new(init_memory().unwrap()))
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let err = executor().execute("drop_tables", "{}").await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(_)));
    }

    #[tokio::test]
    async fn malformed_arguments_are_a_tool_error() {
        let err = executor()
            .execute("add_note_to_contact", r#"{"contact_name": 7}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }

    #[tokio::test]
    async fn missing_contact_is_spoken_text() {
        let out = executor()
            .execute("add_note_to_contact", r#"{"contact_name":"Bob","note":"hi"}"#)
            .await
            .unwrap();
        assert_eq!(out, "No contact found for 'Bob'.");
    }

    #[tokio::test]
    async fn tasks_list_create_and_half_arguments() {
        let exec = executor();
        exec.execute("add_or_update_contact", r#"{"name":"Ada"}"#)
            .await
            .unwrap();

        let out = exec
            .execute("create_or_list_tasks", r#"{"contact_name":"Ada"}"#)
            .await
            .unwrap();
        assert_eq!(out, "No tasks for 'Ada'.");

        let out = exec
            .execute("create_or_list_tasks", r#"{"contact_name":"Ada","task":"Call"}"#)
            .await
            .unwrap();
        assert_eq!(out, "Must provide both task and due_date to create.");

        let out = exec
            .execute(
                "create_or_list_tasks",
                r#"{"contact_name":"Ada","task":"Call","due_date":"2025-03-01"}"#,
            )
            .await
            .unwrap();
        assert_eq!(out, "Created task for 'Ada': Call (due: 2025-03-01)");

        let out = exec
            .execute("create_or_list_tasks", r#"{"contact_name":"Ada"}"#)
            .await
            .unwrap();
        assert_eq!(out, "Tasks for 'Ada':\n- Call (due: 2025-03-01)");
    }

    #[tokio::test]
    async fn tasks_without_contact_name() {
        let out = executor()
            .execute("create_or_list_tasks", "")
            .await
            .unwrap();
        assert_eq!(out, "Contact name required.");
    }
}
