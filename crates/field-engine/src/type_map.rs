use crate::spec::{AnswerType, QuestionType};

impl QuestionType {
    /// Answer shape stored for this question type; `None` for types that carry
    /// no value.
    pub const fn answer_type(self) -> Option<AnswerType> {
        match self {
            QuestionType::Text => Some(AnswerType::String),
            QuestionType::Textarea => Some(AnswerType::String),
            QuestionType::Integer => Some(AnswerType::Integer),
            QuestionType::Float => Some(AnswerType::Float),
            QuestionType::MultipleChoice => Some(AnswerType::List),
            QuestionType::Choice => Some(AnswerType::String),
            QuestionType::DynamicMultipleChoice => Some(AnswerType::List),
            QuestionType::DynamicChoice => Some(AnswerType::String),
            QuestionType::Table => Some(AnswerType::Table),
            QuestionType::Form => Some(AnswerType::Form),
            QuestionType::File => Some(AnswerType::File),
            QuestionType::Static => None,
            QuestionType::Date => Some(AnswerType::Date),
        }
    }
}

/// The full question → answer type table.
pub fn type_map() -> impl Iterator<Item = (QuestionType, Option<AnswerType>)> {
    QuestionType::ALL
        .into_iter()
        .map(|question_type| (question_type, question_type.answer_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_question_type_is_mapped_once() {
        let mapped: BTreeSet<_> = type_map().map(|(question_type, _)| question_type).collect();
        assert_eq!(mapped.len(), QuestionType::ALL.len());
    }

    #[test]
    fn only_static_questions_carry_no_answer() {
        let valueless: Vec<_> = type_map()
            .filter(|(_, answer_type)| answer_type.is_none())
            .map(|(question_type, _)| question_type)
            .collect();
        assert_eq!(valueless, vec![QuestionType::Static]);
    }

    #[test]
    fn choice_questions_store_strings_and_lists() {
        assert_eq!(QuestionType::Choice.answer_type(), Some(AnswerType::String));
        assert_eq!(
            QuestionType::DynamicMultipleChoice.answer_type(),
            Some(AnswerType::List)
        );
    }
}
