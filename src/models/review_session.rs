//! Session-scoped review state.
//! Tracks which question is being reviewed and whether its answer is visible.

use super::Question;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnswerView {
    #[default]
    Hidden,
    Shown,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Reviewing {
        question: Question,
        answer: AnswerView,
        /// Free-form attempt typed before revealing the answer.
        scratch: String,
    },
}

/// Drives the Idle -> Reviewing -> Idle cycle of the review tab.
#[derive(Debug, Default)]
pub struct ReviewSession {
    state: SessionState,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn current(&self) -> Option<&Question> {
        match &self.state {
            SessionState::Reviewing { question, .. } => Some(question),
            SessionState::Idle => None,
        }
    }

    pub fn current_id(&self) -> Option<i64> {
        self.current().map(|q| q.id)
    }

    pub fn answer_shown(&self) -> bool {
        matches!(
            self.state,
            SessionState::Reviewing {
                answer: AnswerView::Shown,
                ..
            }
        )
    }

    /// Starts reviewing `question`; selecting another question discards the previous one.
    pub fn start(&mut self, question: Question) {
        self.state = SessionState::Reviewing {
            question,
            answer: AnswerView::Hidden,
            scratch: String::new(),
        };
    }

    pub fn reveal(&mut self) {
        self.set_answer(AnswerView::Shown);
    }

    pub fn hide(&mut self) {
        self.set_answer(AnswerView::Hidden);
    }

    pub fn toggle_answer(&mut self) {
        if self.answer_shown() {
            self.hide();
        } else {
            self.reveal();
        }
    }

    pub fn scratch_mut(&mut self) -> Option<&mut String> {
        match &mut self.state {
            SessionState::Reviewing { scratch, .. } => Some(scratch),
            SessionState::Idle => None,
        }
    }

    /// Ends the review and hands back the id to record; `None` when idle.
    pub fn finish(&mut self) -> Option<i64> {
        let id = self.current_id();
        self.state = SessionState::Idle;
        id
    }

    /// Leaves the review without recording anything.
    pub fn back(&mut self) {
        self.state = SessionState::Idle;
    }

    /// Drops the session if it points at `id` (after a delete or reset).
    pub fn forget(&mut self, id: i64) {
        if self.current_id() == Some(id) {
            self.back();
        }
    }

    fn set_answer(&mut self, view: AnswerView) {
        if let SessionState::Reviewing { answer, .. } = &mut self.state {
            *answer = view;
        }
    }
}

/// In-place edit buffer for one question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditDraft {
    pub id: i64,
    pub question: String,
    pub answer: String,
}

impl EditDraft {
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id,
            question: question.question.clone(),
            answer: question.answer.clone(),
        }
    }
}
