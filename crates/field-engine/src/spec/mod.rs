pub mod answer;
pub mod document;
pub mod question;

pub use answer::{Answer, AnswerSpec, AnswerType};
pub use document::{DocumentSpec, FormSpec};
pub use question::{ChoiceOption, Condition, Question, QuestionKind, QuestionSpec, QuestionType};
