//! CV intake: document text extraction and profile extraction.

pub mod extractor;
pub mod handlers;
pub mod text_extractor;
