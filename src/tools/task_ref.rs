//! Execution task references
//!
//! Several tools accept one `task_id` argument that may be a 1-based index
//! into the project's task list, a task UUID, or a task name. The forms are
//! tried in that order: a name that parses as a positive integer, or looks
//! like a UUID, is therefore only reachable through its index or UUID.

use serde::Deserialize;
use serde_json::Value;

/// Minimal view of an execution task as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskSummary {
    #[serde(default)]
    pub task_uuid: String,
    #[serde(default)]
    pub task_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRef {
    Index(i64),
    Uuid(String),
    Name(String),
}

/// 36 characters with exactly four dashes
pub fn is_uuid_format(s: &str) -> bool {
    s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
}

impl TaskRef {
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Number(n) => {
                let index = n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                    .unwrap_or(0);
                TaskRef::Index(index)
            }
            Value::String(s) => match s.parse::<i64>() {
                Ok(index) if index > 0 => TaskRef::Index(index),
                _ if is_uuid_format(s) => TaskRef::Uuid(s.clone()),
                _ => TaskRef::Name(s.clone()),
            },
            other => TaskRef::Name(other.to_string()),
        }
    }

    /// Pick the referenced task; the error text names the reference and project
    pub fn resolve<'a>(
        &self,
        tasks: &'a [TaskSummary],
        project_id: i64,
    ) -> Result<&'a TaskSummary, String> {
        match self {
            TaskRef::Index(index) => usize::try_from(*index)
                .ok()
                .filter(|i| (1..=tasks.len()).contains(i))
                .map(|i| &tasks[i - 1])
                .ok_or_else(|| {
                    format!(
                        "task index {index} out of range, project {project_id} has {} tasks",
                        tasks.len()
                    )
                }),
            TaskRef::Uuid(uuid) => tasks
                .iter()
                .find(|t| &t.task_uuid == uuid)
                .ok_or_else(|| {
                    format!("task with UUID '{uuid}' not found in project {project_id}")
                }),
            TaskRef::Name(name) => tasks
                .iter()
                .find(|t| &t.task_name == name)
                .ok_or_else(|| format!("task '{name}' not found in project {project_id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UUID: &str = "0b7c3a52-1f0e-4d7c-9a43-5b2f6e8d1c90";

    fn tasks() -> Vec<TaskSummary> {
        vec![
            TaskSummary {
                task_uuid: UUID.to_string(),
                task_name: "qweb".to_string(),
            },
            TaskSummary {
                task_uuid: "11111111-2222-3333-4444-555555555555".to_string(),
                task_name: "42".to_string(),
            },
        ]
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(TaskRef::parse(&json!(2)), TaskRef::Index(2));
        assert_eq!(TaskRef::parse(&json!(2.0)), TaskRef::Index(2));
        assert_eq!(TaskRef::parse(&json!("3")), TaskRef::Index(3));
        assert_eq!(TaskRef::parse(&json!("0")), TaskRef::Name("0".to_string()));
        assert_eq!(TaskRef::parse(&json!("-1")), TaskRef::Name("-1".to_string()));
        assert_eq!(TaskRef::parse(&json!(UUID)), TaskRef::Uuid(UUID.to_string()));
        assert_eq!(TaskRef::parse(&json!("qweb")), TaskRef::Name("qweb".to_string()));
        assert_eq!(TaskRef::parse(&json!(true)), TaskRef::Name("true".to_string()));
    }

    #[test]
    fn test_is_uuid_format() {
        assert!(is_uuid_format(UUID));
        assert!(!is_uuid_format("not-a-uuid"));
        assert!(!is_uuid_format(&"-".repeat(36)));
    }

    #[test]
    fn test_resolve_index() {
        let tasks = tasks();
        assert_eq!(TaskRef::Index(1).resolve(&tasks, 1).unwrap().task_name, "qweb");
        assert_eq!(
            TaskRef::Index(3).resolve(&tasks, 7).unwrap_err(),
            "task index 3 out of range, project 7 has 2 tasks"
        );
        assert!(TaskRef::Index(0).resolve(&tasks, 1).is_err());
    }

    #[test]
    fn test_resolve_uuid_and_name() {
        let tasks = tasks();
        assert_eq!(
            TaskRef::Uuid(UUID.to_string()).resolve(&tasks, 1).unwrap().task_name,
            "qweb"
        );
        assert_eq!(
            TaskRef::Name("qweb".to_string()).resolve(&tasks, 1).unwrap().task_uuid,
            UUID
        );
        assert_eq!(
            TaskRef::Name("nope".to_string()).resolve(&tasks, 1).unwrap_err(),
            "task 'nope' not found in project 1"
        );
    }

    #[test]
    fn test_numeric_name_only_reachable_by_index() {
        let tasks = tasks();
        // "42" parses as index 42, which is out of range
        assert!(TaskRef::parse(&json!("42")).resolve(&tasks, 1).is_err());
        assert_eq!(TaskRef::parse(&json!("2")).resolve(&tasks, 1).unwrap().task_name, "42");
    }
}
