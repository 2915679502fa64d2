//! Coaching session registry and plan generation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::prompts::{build_plan_prompt, extract_plan};
use super::session::{AnswerOutcome, CoachSession, GenerationOutcome, SessionSnapshot, TranscriptMessage};
use super::state::CoachPhase;
use crate::error::{CoachError, DatabaseError};
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};
use crate::plans::model::{DietPlan, NewPlan, WorkoutPlan};
use crate::store::Database;

/// Reply to a submitted answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReply {
    pub phase: CoachPhase,
    /// Messages emitted while handling this answer, in order.
    pub messages: Vec<TranscriptMessage>,
    /// Whether a voice client should resume listening.
    pub listen_after: bool,
    pub plan_id: Option<i64>,
}

/// Failure to start a session.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Coach(#[from] CoachError),
}

/// Coordinates coaching sessions: registry, LLM call and plan storage.
pub struct CoachManager {
    db: Arc<dyn Database>,
    llm: Arc<dyn LlmProvider>,
    sessions: RwLock<HashMap<Uuid, CoachSession>>,
    idle_timeout: Duration,
}

impl CoachManager {
    pub fn new(db: Arc<dyn Database>, llm: Arc<dyn LlmProvider>, idle_timeout: Duration) -> Self {
        Self {
            db,
            llm,
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a questionnaire for a known user.
    pub async fn start_session(&self, clerk_id: &str) -> Result<SessionSnapshot, StartError> {
        if self.db.get_user_by_clerk_id(clerk_id).await?.is_none() {
            return Err(DatabaseError::NotFound {
                entity: "user".to_string(),
                id: clerk_id.to_string(),
            }
            .into());
        }

        let mut session = CoachSession::new(clerk_id);
        session.start()?;
        let snapshot = session.snapshot();

        self.sessions.write().await.insert(session.id(), session);
        info!(session_id = %snapshot.session_id, clerk_id, "Coaching session started");
        Ok(snapshot)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, CoachError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(CoachSession::snapshot)
            .ok_or(CoachError::SessionNotFound { id })
    }

    /// Drop a session. Returns whether it existed.
    pub async fn abandon(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Coaching session abandoned");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Record an answer. On the final answer this also generates and saves
    /// the plan before returning.
    pub async fn submit_answer(&self, id: Uuid, answer: &str) -> Result<AnswerReply, CoachError> {
        let (mut messages, clerk_id, answers) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or(CoachError::SessionNotFound { id })?;

            match session.submit_answer(answer)? {
                AnswerOutcome::NextQuestion(messages) => {
                    return Ok(AnswerReply {
                        phase: session.phase(),
                        messages,
                        listen_after: session.phase().accepts_answers(),
                        plan_id: None,
                    });
                }
                AnswerOutcome::ReadyToGenerate(messages) => (
                    messages,
                    session.clerk_id().to_string(),
                    session.answers().to_vec(),
                ),
            }
        };

        // The registry lock is released for the completion call.
        let outcome = self.generate_and_save(&clerk_id, &answers).await;
        let plan_id = outcome.plan_id();

        let mut sessions = self.sessions.write().await;
        let phase = match sessions.get_mut(&id) {
            Some(session) => {
                messages.extend(session.finish(outcome)?);
                session.phase()
            }
            None => {
                warn!(session_id = %id, "Session removed while generating");
                let phase = outcome.phase();
                messages.extend(outcome.into_messages());
                phase
            }
        };

        Ok(AnswerReply {
            phase,
            messages,
            listen_after: false,
            plan_id,
        })
    }

    /// Build the prompt, call the model once, split and store the plan.
    pub async fn generate_and_save(&self, clerk_id: &str, answers: &[String]) -> GenerationOutcome {
        let prompt = match build_plan_prompt(answers) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(error = %e, "Cannot build plan prompt");
                return GenerationOutcome::GenerationFailed;
            }
        };

        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)]);
        let plan_text = match self.llm.complete(request).await {
            Ok(response) if !response.message.content.trim().is_empty() => {
                if response.finish_reason == FinishReason::Length {
                    warn!(
                        clerk_id,
                        output_tokens = response.output_tokens,
                        "Plan cut off at the token budget"
                    );
                }
                response.message.content
            }
            Ok(_) => {
                error!(clerk_id, "Model returned an empty plan");
                return GenerationOutcome::GenerationFailed;
            }
            Err(e) => {
                error!(clerk_id, error = %e, "Error generating plan");
                return GenerationOutcome::GenerationFailed;
            }
        };

        let extracted = extract_plan(&plan_text);
        let workout = WorkoutPlan {
            content: extracted.workout,
            answers: answers.to_vec(),
        };
        let diet = DietPlan {
            content: extracted.diet,
        };
        let name = plan_name(answers.first().map(String::as_str).unwrap_or_default());

        match self
            .db
            .create_plan(clerk_id, &NewPlan::generated(name, &workout, &diet))
            .await
        {
            Ok(plan_id) => GenerationOutcome::Saved { plan_text, plan_id },
            Err(e) => {
                error!(clerk_id, error = %e, "Error saving plan");
                GenerationOutcome::SaveFailed { plan_text }
            }
        }
    }

    /// Remove sessions idle longer than the configured timeout.
    /// Returns the number of sessions removed.
    pub async fn prune_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity().elapsed() < self.idle_timeout);
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, "Pruned idle coaching sessions");
        }
        pruned
    }
}

/// "<goal> - M/D/YYYY"
fn plan_name(goal: &str) -> String {
    format!("{goal} - {}", Utc::now().format("%-m/%-d/%Y"))
}

/// Spawn the idle-session sweep (runs every `interval`).
pub fn spawn_prune_task(
    manager: Arc<CoachManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            manager.prune_idle().await;
        }
    })
}
