//! Plan prompt construction and plan text extraction.

use std::sync::LazyLock;

use regex::Regex;

use super::questions::{QUESTION_COUNT, QUESTIONS};
use crate::error::CoachError;

/// Diet text stored when the model output has no "Diet Plan" heading.
pub const DIET_PLACEHOLDER: &str = "See full plan above";

static WORKOUT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)workout plan[:\s]*(.*?)(?:diet plan|\z)").expect("valid workout regex")
});

static DIET_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)diet plan[:\s]*(.*?)(?:additional tips|\z)").expect("valid diet regex")
});

/// Build the plan-generation prompt from a complete answer set.
///
/// Answers are embedded verbatim, in questionnaire order.
pub fn build_plan_prompt(answers: &[String]) -> Result<String, CoachError> {
    if answers.len() != QUESTION_COUNT {
        return Err(CoachError::IncompleteAnswers {
            expected: QUESTION_COUNT,
            actual: answers.len(),
        });
    }

    let user_info = QUESTIONS
        .iter()
        .zip(answers)
        .map(|(q, answer)| format!("{}. {}: {}", q.ordinal + 1, q.label, answer))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "Based on the following user information, create a comprehensive fitness program \
with both a workout plan and a diet plan. Format the response as a detailed, structured plan.

User Information:
{user_info}

Please provide:
1. A detailed workout plan with specific exercises, sets, reps, and weekly schedule
2. A comprehensive diet plan with meal suggestions and macronutrient guidelines
3. Additional tips for success

Format the response clearly with sections for Workout Plan and Diet Plan."
    ))
}

/// Workout and diet sections split out of a generated plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPlan {
    pub workout: String,
    pub diet: String,
}

/// Split raw model output into its workout and diet sections.
///
/// Headings match case-insensitively. Without a workout heading the whole
/// text is the workout plan; without a diet heading the diet is
/// [`DIET_PLACEHOLDER`].
pub fn extract_plan(raw: &str) -> ExtractedPlan {
    let workout = WORKOUT_SECTION
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| raw.to_string());

    let diet = DIET_SECTION
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| DIET_PLACEHOLDER.to_string());

    ExtractedPlan { workout, diet }
}
