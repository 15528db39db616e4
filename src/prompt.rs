use crate::chunking::TextChunk;
use clap::ValueEnum;

/// Which prompt template to send to the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PromptStyle {
    /// Assistant persona told to admit when the context has no answer
    #[default]
    Grounded,
    /// Bare context and question, answer trimmed
    Plain,
}

impl PromptStyle {
    /// Fill the template with retrieved context and the user's question
    pub fn render(self, context: &str, question: &str) -> String {
        match self {
            PromptStyle::Grounded => format!(
                "You are an AI assistant using a Retrieval-Augmented Generation (RAG) system.\n\
                 Only answer the question if you know the answer, don't make it up. \
                 If you don't have the answer, say it.\n\
                 Use the following context to answer the user's question:\n\
                 \n\
                 CONTEXT:\n\
                 {}\n\
                 \n\
                 QUESTION:\n\
                 {}\n\
                 \n\
                 ANSWER:\n",
                context, question
            ),
            PromptStyle::Plain => format!("Context: {}\n\nQuestion: {}\n", context, question),
        }
    }

    /// Post-process the model's reply
    pub fn finish(self, answer: String) -> String {
        match self {
            PromptStyle::Grounded => answer,
            PromptStyle::Plain => answer.trim().to_string(),
        }
    }
}

/// Join retrieved chunk texts into one context block
pub fn join_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a TextChunk>,
{
    chunks
        .into_iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> TextChunk {
        TextChunk {
            text: text.to_string(),
            token_count: 0,
            document_id: "doc.txt".to_string(),
            start_position: 0,
        }
    }

    #[test]
    fn test_join_context_uses_single_newline() {
        let chunks = vec![chunk("first"), chunk("second")];
        assert_eq!(join_context(&chunks), "first\nsecond");
        assert_eq!(join_context(&Vec::new()), "");
    }

    #[test]
    fn test_grounded_prompt_sections() {
        let prompt = PromptStyle::Grounded.render("Walnut desks cost $900.", "How much is a desk?");

        assert!(prompt.contains("don't make it up"));
        let context_at = prompt.find("CONTEXT:\nWalnut desks cost $900.").unwrap();
        let question_at = prompt.find("QUESTION:\nHow much is a desk?").unwrap();
        let answer_at = prompt.find("ANSWER:").unwrap();
        assert!(context_at < question_at && question_at < answer_at);
    }

    #[test]
    fn test_plain_prompt() {
        assert_eq!(
            PromptStyle::Plain.render("ctx", "q?"),
            "Context: ctx\n\nQuestion: q?\n"
        );
    }

    #[test]
    fn test_finish_trims_only_plain_answers() {
        assert_eq!(PromptStyle::Plain.finish("  yes \n".to_string()), "yes");
        assert_eq!(PromptStyle::Grounded.finish("  yes \n".to_string()), "  yes \n");
    }
}
