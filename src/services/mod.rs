pub mod mailer;
pub mod summarizer;
