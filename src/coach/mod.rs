//! The voice coaching questionnaire.
//!
//! A session asks the fixed questions one at a time, collects the answers,
//! then makes a single completion call to produce a workout and diet plan
//! and stores it as the user's active plan.

pub mod manager;
pub mod prompts;
pub mod questions;
pub mod routes;
pub mod session;
pub mod state;

pub use manager::{AnswerReply, CoachManager, StartError, spawn_prune_task};
pub use questions::{QUESTION_COUNT, QUESTIONS, Question};
pub use routes::{CoachRouteState, coach_routes};
pub use session::{CoachSession, SessionSnapshot, TranscriptMessage};
pub use state::CoachPhase;
