
use serde::{Deserialize, Serialize};

use super::ChatMessage;

pub const DEFAULT_PREDICTION_TARGET: &str = "future implications";

const ANSWER_SYSTEM_MESSAGE: &str = "You are an AI assistant specialized in answering questions \
about the provided documents. Provide detailed answers based on the given context.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
    BulletPoints,
    Executive,
}

impl std::fmt::Display for SummaryStyle {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            SummaryStyle::Concise => write!(f, "concise"),
            SummaryStyle::Detailed => write!(f, "detailed"),
            SummaryStyle::BulletPoints => write!(f, "bullet points"),
            SummaryStyle::Executive => write!(f, "executive"),
        }
    }
}

/// What the generator is asked to do with the assembled context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Summarize(SummaryStyle),
    Classify,
    Predict { target: Option<String> },
    Answer { question: String },
}

impl Task {
    /// Short label used in session history
    #[inline]
    pub fn label(&self) -> String {
        match *self {
            Task::Summarize(style) => format!("Summarization ({style})"),
            Task::Classify => "Classification".to_string(),
            Task::Predict { ref target } => format!(
                "Prediction ({})",
                target.as_deref().unwrap_or(DEFAULT_PREDICTION_TARGET)
            ),
            Task::Answer { ref question } => format!("Question: {question}"),
        }
    }
}

/// A rendered prompt: optional system message plus the user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    #[inline]
    pub fn into_messages(self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(self.user));
        messages
    }

    /// Everything that determines the model's answer, for cache keys
    #[inline]
    pub fn cache_text(&self) -> String {
        match self.system {
            Some(ref system) => format!("{system}\n\n{}", self.user),
            None => self.user.clone(),
        }
    }
}

/// Join chunk texts with spaces, prefixed by the trimmed additional context if any
#[inline]
pub fn assemble_context<S: AsRef<str>>(chunks: &[S], additional_context: Option<&str>) -> String {
    additional_context
        .map(str::trim)
        .filter(|extra| !extra.is_empty())
        .into_iter()
        .chain(chunks.iter().map(AsRef::as_ref))
        .collect::<Vec<_>>()
        .join(" ")
}

#[inline]
pub fn build_prompt(context: &str, task: &Task) -> Prompt {
    let user = match *task {
        Task::Summarize(SummaryStyle::Concise) => format!(
            "Provide a concise summary of the following text in 2-3 paragraphs:\n\n{context}"
        ),
        Task::Summarize(SummaryStyle::Detailed) => format!(
            "Provide a detailed summary of the following text, including key points and main ideas:\n\n{context}"
        ),
        Task::Summarize(SummaryStyle::BulletPoints) => format!(
            "Summarize the following text in bullet points, highlighting the main ideas:\n\n{context}"
        ),
        Task::Summarize(SummaryStyle::Executive) => format!(
            "Provide an executive summary of the following text, focusing on key findings and conclusions:\n\n{context}"
        ),
        Task::Classify => format!(
            "Classify the following text into appropriate categories. Consider tone, topic, and intent:\n\n{context}"
        ),
        Task::Predict { ref target } => format!(
            "Based on the following text, predict {}:\n\n{context}",
            target
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_PREDICTION_TARGET)
        ),
        Task::Answer { ref question } => {
            return Prompt {
                system: Some(ANSWER_SYSTEM_MESSAGE.to_string()),
                user: format!(
                    "Context: {context}\n\nQuestion: {question}\n\nPlease provide a detailed answer based on the provided context."
                ),
            };
        }
    };

    Prompt { system: None, user }
}
