pub mod backup;
pub mod question;
pub mod review_event;
pub mod review_session;
pub mod scheduler;

pub use backup::Backup;
pub use question::{Question, QuestionUpdate};
pub use review_event::ReviewEvent;
pub use review_session::{AnswerView, EditDraft, ReviewSession, SessionState};
pub use scheduler::{NextState, Outcome};
