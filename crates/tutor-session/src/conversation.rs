//! Conversation transcript for the active content item.

use tutor_core::types::{Answer, ContentKind, ConversationMessage, QuestionId};

/// Assistant text appended when a question fails.
pub const ASK_ERROR_MESSAGE: &str = "Error getting answer.";

/// Opening assistant message for a freshly analyzed item.
pub fn greeting(kind: ContentKind) -> String {
    format!(
        "Hello! I've analyzed your {}. What would you like to know about it?",
        kind.label()
    )
}

/// Ordered, append-only message list seeded with a greeting.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    next_question: u64,
}

impl Conversation {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            messages: vec![ConversationMessage::Assistant {
                in_reply_to: None,
                text: greeting(kind),
            }],
            next_question: 1,
        }
    }

    /// Drop every message and start over with a single greeting.
    pub fn reset(&mut self, kind: ContentKind) {
        *self = Self::new(kind);
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append the user's question and return its id.
    pub fn push_user(&mut self, text: &str) -> QuestionId {
        let id = QuestionId(self.next_question);
        self.next_question += 1;
        self.messages.push(ConversationMessage::User {
            question: id,
            text: text.to_string(),
        });
        id
    }

    /// Append an answer followed by its reference list.
    pub fn push_answer(&mut self, question: QuestionId, answer: Answer) {
        self.messages.push(ConversationMessage::Assistant {
            in_reply_to: Some(question),
            text: answer.answer,
        });
        self.messages.push(ConversationMessage::References {
            in_reply_to: question,
            references: answer.references,
        });
    }

    pub fn push_error(&mut self, question: QuestionId) {
        self.messages.push(ConversationMessage::Assistant {
            in_reply_to: Some(question),
            text: ASK_ERROR_MESSAGE.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::types::{Citation, CitationLocation};

    #[test]
    fn test_seed_greeting() {
        let conv = Conversation::new(ContentKind::Pdf);
        assert_eq!(conv.len(), 1);
        assert_eq!(
            conv.messages()[0].text(),
            Some("Hello! I've analyzed your PDF document. What would you like to know about it?")
        );

        let conv = Conversation::new(ContentKind::Youtube);
        assert!(conv.messages()[0].text().unwrap().contains("YouTube video"));
    }

    #[test]
    fn test_answer_appends_two_messages() {
        let mut conv = Conversation::new(ContentKind::Pdf);
        let q = conv.push_user("What is ATP?");
        conv.push_answer(
            q,
            Answer {
                answer: "Energy.".to_string(),
                references: vec![Citation {
                    chunk_id: "1".to_string(),
                    location: CitationLocation::Page(3),
                    preview: "ATP".to_string(),
                }],
            },
        );

        assert_eq!(conv.len(), 4);
        assert!(conv.messages()[1].is_user());
        assert_eq!(conv.messages()[2].text(), Some("Energy."));
        assert_eq!(conv.messages()[3].question_id(), Some(q));
        assert!(matches!(
            conv.messages()[3],
            ConversationMessage::References { ref references, .. } if references.len() == 1
        ));
    }

    #[test]
    fn test_error_keeps_user_message() {
        let mut conv = Conversation::new(ContentKind::Pdf);
        let q = conv.push_user("Why?");
        conv.push_error(q);
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[1].text(), Some("Why?"));
        assert_eq!(conv.messages()[2].text(), Some(ASK_ERROR_MESSAGE));
    }

    #[test]
    fn test_question_ids_increase_and_reset() {
        let mut conv = Conversation::new(ContentKind::Pdf);
        let a = conv.push_user("one");
        let b = conv.push_user("two");
        assert!(b > a);

        conv.reset(ContentKind::Youtube);
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.push_user("three"), QuestionId(1));
    }
}
