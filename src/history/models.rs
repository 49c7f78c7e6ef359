//! Data models for the task history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::estimation::is_on_scale;

/// A task with its estimate and the points the team finally agreed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub estimated_points: u32,
    pub final_points: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_estimated_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_estimated_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bert_estimated_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bert_confidence: Option<f32>,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        task_type: impl Into<String>,
        estimated_points: u32,
        final_points: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            task_type: task_type.into(),
            estimated_points,
            final_points,
            created_at: Utc::now(),
            ml_estimated_points: None,
            ai_estimated_points: None,
            ai_model: None,
            bert_estimated_points: None,
            bert_confidence: None,
        }
    }
}

/// Request body for recording a task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_task_type")]
    pub task_type: String,
    #[serde(default)]
    pub estimated_points: Option<u32>,
    pub final_points: u32,
    #[serde(default)]
    pub ml_estimated_points: Option<u32>,
    #[serde(default)]
    pub ai_estimated_points: Option<u32>,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub bert_estimated_points: Option<u32>,
    #[serde(default)]
    pub bert_confidence: Option<f32>,
}

fn default_task_type() -> String {
    "feature".to_string()
}

impl NewTask {
    /// Check required fields, returning a message for the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("Description is required".to_string());
        }
        if !is_on_scale(i64::from(self.final_points)) {
            return Err(format!(
                "Final points {} are not a story-point value",
                self.final_points
            ));
        }
        Ok(())
    }

    /// Build the stored task. `rule_points` fills in a missing estimate.
    pub fn into_task(self, rule_points: u32) -> Task {
        let mut task = Task::new(
            self.title,
            self.description,
            self.task_type,
            self.estimated_points.unwrap_or(rule_points),
            self.final_points,
        );
        task.ml_estimated_points = self.ml_estimated_points;
        task.ai_estimated_points = self.ai_estimated_points;
        task.ai_model = self.ai_model;
        task.bert_estimated_points = self.bert_estimated_points;
        task.bert_confidence = self.bert_confidence;
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_json_shape() {
        let mut task = Task::new("Login", "Criar tela", "feature", 3, 5);
        task.ai_model = Some("groq".to_string());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "feature");
        assert_eq!(json["estimatedPoints"], 3);
        assert_eq!(json["finalPoints"], 5);
        assert_eq!(json["aiModel"], "groq");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("bertConfidence").is_none());
    }

    #[test]
    fn test_task_accepts_null_optionals() {
        let task: Task = serde_json::from_str(
            r#"{"id":"1","title":"t","description":"d","type":"bug","estimatedPoints":2,
                "finalPoints":3,"createdAt":"2024-05-01T10:00:00Z","mlEstimatedPoints":null}"#,
        )
        .unwrap();
        assert_eq!(task.ml_estimated_points, None);
        assert_eq!(task.final_points, 3);
    }

    #[test]
    fn test_new_task_validation() {
        let mut draft = NewTask {
            title: "t".into(),
            description: "d".into(),
            task_type: "bug".into(),
            final_points: 4,
            ..Default::default()
        };
        assert!(draft.validate().unwrap_err().contains("not a story-point value"));
        draft.final_points = 5;
        assert!(draft.validate().is_ok());
        draft.title = "  ".into();
        assert_eq!(draft.validate().unwrap_err(), "Title is required");
    }

    #[test]
    fn test_into_task_uses_rule_points() {
        let draft = NewTask {
            title: "t".into(),
            description: "d".into(),
            task_type: "bug".into(),
            final_points: 5,
            ..Default::default()
        };
        let task = draft.into_task(2);
        assert_eq!(task.estimated_points, 2);
        assert_eq!(task.final_points, 5);
    }
}
