//! User and plan records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account, keyed by the identity provider's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub clerk_id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written on every identity-provider sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSync {
    pub clerk_id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
}

/// A stored plan row.
///
/// `workout_plan` and `diet_plan` are JSON documents. Plans generated by the
/// coach use the [`WorkoutPlan`] and [`DietPlan`] shapes, but any JSON the
/// client posts is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub workout_plan: serde_json::Value,
    pub diet_plan: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A plan to insert for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub workout_plan: serde_json::Value,
    pub diet_plan: serde_json::Value,
    pub is_active: bool,
}

/// Workout section of a generated plan, with the questionnaire answers it
/// was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub content: String,
    pub answers: Vec<String>,
}

/// Diet section of a generated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietPlan {
    pub content: String,
}

impl NewPlan {
    /// Build an active plan from the coach's generated sections.
    pub fn generated(name: impl Into<String>, workout: &WorkoutPlan, diet: &DietPlan) -> Self {
        Self {
            name: name.into(),
            workout_plan: serde_json::json!({
                "content": workout.content,
                "answers": workout.answers,
            }),
            diet_plan: serde_json::json!({ "content": diet.content }),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_plan_shapes() {
        let workout = WorkoutPlan {
            content: "Day 1: squats".into(),
            answers: vec!["build muscle".into(), "beginner".into()],
        };
        let diet = DietPlan {
            content: "High protein".into(),
        };
        let plan = NewPlan::generated("build muscle - 10/19/2026", &workout, &diet);

        assert!(plan.is_active);
        assert_eq!(plan.workout_plan["content"], "Day 1: squats");
        assert_eq!(plan.workout_plan["answers"][1], "beginner");
        assert_eq!(plan.diet_plan, serde_json::json!({"content": "High protein"}));

        let parsed: WorkoutPlan = serde_json::from_value(plan.workout_plan).unwrap();
        assert_eq!(parsed, workout);
    }
}
