//! A single coaching conversation: question cursor, answers and transcript.

use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use super::questions::{QUESTION_COUNT, question};
use super::state::CoachPhase;
use crate::error::CoachError;
use crate::llm::Role;

pub const WELCOME_MESSAGE: &str = "Great! Let's create your personalized fitness program. \
I'll ask you a few questions to understand your goals and needs better.";

pub const READY_MESSAGE: &str = "Perfect! I have all the information I need. \
Let me create your personalized fitness program now.";

pub const CREATED_MESSAGE: &str =
    "I've created your personalized fitness program! Let me save it to your profile.";

pub const SAVED_MESSAGE: &str = "Your personalized fitness program has been saved to your profile! \
You can view it anytime from your profile page.";

pub const GENERATION_FAILED_MESSAGE: &str =
    "I apologize, but I encountered an error generating your plan. Please try again.";

pub const SAVE_FAILED_MESSAGE: &str =
    "Your plan was generated but I couldn't save it to your profile. Please try again.";

/// A transcript entry.
///
/// `listen_after` tells a voice client whether to restart speech capture
/// once this message has been spoken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    pub listen_after: bool,
}

/// What happened to an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The next question was asked.
    NextQuestion(Vec<TranscriptMessage>),
    /// That was the last answer; the session is now generating.
    ReadyToGenerate(Vec<TranscriptMessage>),
}

/// Result of generating and saving the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Saved { plan_text: String, plan_id: i64 },
    GenerationFailed,
    SaveFailed { plan_text: String },
}

impl GenerationOutcome {
    /// Phase the session ends in.
    pub fn phase(&self) -> CoachPhase {
        match self {
            Self::Saved { .. } => CoachPhase::Done,
            Self::GenerationFailed | Self::SaveFailed { .. } => CoachPhase::Error,
        }
    }

    pub fn plan_id(&self) -> Option<i64> {
        match self {
            Self::Saved { plan_id, .. } => Some(*plan_id),
            _ => None,
        }
    }

    /// Assistant messages announcing the outcome. None of them resume listening.
    pub fn into_messages(self) -> Vec<TranscriptMessage> {
        let contents = match self {
            Self::Saved { plan_text, .. } => vec![
                plan_text,
                CREATED_MESSAGE.to_string(),
                format!("✅ {SAVED_MESSAGE}"),
            ],
            Self::GenerationFailed => vec![GENERATION_FAILED_MESSAGE.to_string()],
            Self::SaveFailed { plan_text } => vec![
                plan_text,
                CREATED_MESSAGE.to_string(),
                SAVE_FAILED_MESSAGE.to_string(),
            ],
        };
        contents
            .into_iter()
            .map(|content| TranscriptMessage {
                role: Role::Assistant,
                content,
                listen_after: false,
            })
            .collect()
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub clerk_id: String,
    pub phase: CoachPhase,
    pub question_index: usize,
    pub total_questions: usize,
    pub answers: Vec<String>,
    pub messages: Vec<TranscriptMessage>,
    pub plan_id: Option<i64>,
}

/// One user's pass through the questionnaire.
#[derive(Debug, Clone)]
pub struct CoachSession {
    id: Uuid,
    clerk_id: String,
    phase: CoachPhase,
    question_index: usize,
    answers: Vec<String>,
    transcript: Vec<TranscriptMessage>,
    plan_id: Option<i64>,
    last_activity: Instant,
}

impl CoachSession {
    pub fn new(clerk_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            clerk_id: clerk_id.into(),
            phase: CoachPhase::NotStarted,
            question_index: 0,
            answers: Vec::new(),
            transcript: Vec::new(),
            plan_id: None,
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn clerk_id(&self) -> &str {
        &self.clerk_id
    }

    pub fn phase(&self) -> CoachPhase {
        self.phase
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Begin the questionnaire: welcome message plus the first question.
    pub fn start(&mut self) -> Result<Vec<TranscriptMessage>, CoachError> {
        self.transition(CoachPhase::Asking, "start")?;
        self.touch();

        let first = question(0).map(|q| q.text).unwrap_or_default();
        Ok(vec![
            self.push_assistant(WELCOME_MESSAGE),
            self.push_assistant(first),
        ])
    }

    /// Record the answer to the current question.
    pub fn submit_answer(&mut self, answer: &str) -> Result<AnswerOutcome, CoachError> {
        if !self.phase.accepts_answers() {
            return Err(CoachError::InvalidPhase {
                phase: self.phase,
                action: "accept an answer".to_string(),
            });
        }
        if answer.trim().is_empty() {
            return Err(CoachError::EmptyAnswer);
        }
        self.touch();

        let mut emitted = vec![self.push(Role::User, answer)];
        self.answers.push(answer.to_string());

        if self.question_index < QUESTION_COUNT - 1 {
            self.question_index += 1;
            let next = question(self.question_index).map(|q| q.text).unwrap_or_default();
            emitted.push(self.push_assistant(next));
            Ok(AnswerOutcome::NextQuestion(emitted))
        } else {
            self.question_index = QUESTION_COUNT;
            self.transition(CoachPhase::Generating, "generate")?;
            emitted.push(self.push_assistant(READY_MESSAGE));
            Ok(AnswerOutcome::ReadyToGenerate(emitted))
        }
    }

    /// Apply the generation result and leave the `Generating` phase.
    pub fn finish(
        &mut self,
        outcome: GenerationOutcome,
    ) -> Result<Vec<TranscriptMessage>, CoachError> {
        self.transition(outcome.phase(), "finish generation")?;
        self.touch();

        if let Some(plan_id) = outcome.plan_id() {
            self.plan_id = Some(plan_id);
            // The plan is persisted; the raw answers are no longer needed.
            self.answers.clear();
        }
        let emitted = outcome.into_messages();
        self.transcript.extend(emitted.iter().cloned());
        Ok(emitted)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            clerk_id: self.clerk_id.clone(),
            phase: self.phase,
            question_index: self.question_index,
            total_questions: QUESTION_COUNT,
            answers: self.answers.clone(),
            messages: self.transcript.clone(),
            plan_id: self.plan_id,
        }
    }

    fn transition(&mut self, target: CoachPhase, action: &str) -> Result<(), CoachError> {
        if !self.phase.can_transition_to(target) {
            return Err(CoachError::InvalidPhase {
                phase: self.phase,
                action: action.to_string(),
            });
        }
        self.phase = target;
        Ok(())
    }

    fn push_assistant(&mut self, content: &str) -> TranscriptMessage {
        self.push(Role::Assistant, content)
    }

    fn push(&mut self, role: Role, content: &str) -> TranscriptMessage {
        let message = TranscriptMessage {
            role,
            content: content.to_string(),
            listen_after: role == Role::Assistant && self.phase.accepts_answers(),
        };
        self.transcript.push(message.clone());
        message
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::questions::QUESTIONS;

    fn started() -> CoachSession {
        let mut session = CoachSession::new("user_1");
        session.start().unwrap();
        session
    }

    fn answer_all(session: &mut CoachSession) -> AnswerOutcome {
        let mut last = None;
        for i in 0..QUESTION_COUNT {
            last = Some(session.submit_answer(&format!("answer {i}")).unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn start_emits_welcome_and_first_question() {
        let mut session = CoachSession::new("user_1");
        let emitted = session.start().unwrap();

        assert_eq!(session.phase(), CoachPhase::Asking);
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].content, WELCOME_MESSAGE);
        assert_eq!(emitted[1].content, QUESTIONS[0].text);
        assert!(emitted.iter().all(|m| m.role == Role::Assistant && m.listen_after));
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut session = started();
        assert!(matches!(
            session.start(),
            Err(CoachError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn answer_before_start_is_rejected() {
        let mut session = CoachSession::new("user_1");
        assert!(matches!(
            session.submit_answer("lose weight"),
            Err(CoachError::InvalidPhase {
                phase: CoachPhase::NotStarted,
                ..
            })
        ));
    }

    #[test]
    fn blank_answer_is_rejected_without_advancing() {
        let mut session = started();
        assert!(matches!(
            session.submit_answer("   "),
            Err(CoachError::EmptyAnswer)
        ));
        assert_eq!(session.question_index(), 0);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn questions_are_asked_in_order() {
        let mut session = started();
        for i in 0..QUESTION_COUNT - 1 {
            let outcome = session.submit_answer(&format!("answer {i}")).unwrap();
            let AnswerOutcome::NextQuestion(emitted) = outcome else {
                panic!("expected next question after answer {i}");
            };
            assert_eq!(emitted[0].role, Role::User);
            assert_eq!(emitted[0].content, format!("answer {i}"));
            assert_eq!(emitted[1].content, QUESTIONS[i + 1].text);
            assert!(emitted[1].listen_after);
            assert_eq!(session.question_index(), i + 1);
        }
    }

    #[test]
    fn last_answer_moves_to_generating() {
        let mut session = started();
        let outcome = answer_all(&mut session);

        let AnswerOutcome::ReadyToGenerate(emitted) = outcome else {
            panic!("expected ready to generate");
        };
        assert_eq!(session.phase(), CoachPhase::Generating);
        assert_eq!(session.answers().len(), QUESTION_COUNT);
        assert_eq!(session.answers()[7], "answer 7");
        let ready = emitted.last().unwrap();
        assert_eq!(ready.content, READY_MESSAGE);
        assert!(!ready.listen_after);
    }

    #[test]
    fn answers_rejected_while_generating() {
        let mut session = started();
        answer_all(&mut session);
        assert!(matches!(
            session.submit_answer("extra"),
            Err(CoachError::InvalidPhase {
                phase: CoachPhase::Generating,
                ..
            })
        ));
        assert_eq!(session.answers().len(), QUESTION_COUNT);
    }

    #[test]
    fn saved_outcome_finishes_session() {
        let mut session = started();
        answer_all(&mut session);

        let emitted = session
            .finish(GenerationOutcome::Saved {
                plan_text: "Workout Plan: ...".into(),
                plan_id: 7,
            })
            .unwrap();

        assert_eq!(session.phase(), CoachPhase::Done);
        assert_eq!(emitted[0].content, "Workout Plan: ...");
        assert!(emitted[2].content.contains(SAVED_MESSAGE));
        assert!(emitted.iter().all(|m| !m.listen_after));
        assert_eq!(session.snapshot().plan_id, Some(7));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn generation_failure_moves_to_error() {
        let mut session = started();
        answer_all(&mut session);

        let emitted = session.finish(GenerationOutcome::GenerationFailed).unwrap();
        assert_eq!(session.phase(), CoachPhase::Error);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].content, GENERATION_FAILED_MESSAGE);
        assert!(session.submit_answer("retry").is_err());
    }

    #[test]
    fn save_failure_keeps_plan_text() {
        let mut session = started();
        answer_all(&mut session);

        let emitted = session
            .finish(GenerationOutcome::SaveFailed {
                plan_text: "the plan".into(),
            })
            .unwrap();
        assert_eq!(session.phase(), CoachPhase::Error);
        assert_eq!(emitted[0].content, "the plan");
        assert_eq!(emitted.last().unwrap().content, SAVE_FAILED_MESSAGE);
    }

    #[test]
    fn finish_outside_generating_is_rejected() {
        let mut session = started();
        assert!(session.finish(GenerationOutcome::GenerationFailed).is_err());
    }

    #[test]
    fn transcript_records_every_message() {
        let mut session = started();
        session.submit_answer("lose weight").unwrap();
        // welcome, q0, answer, q1
        assert_eq!(session.transcript().len(), 4);
        assert_eq!(session.snapshot().messages.len(), 4);
    }
}
