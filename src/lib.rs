pub mod batch;
pub mod config;
pub mod docx;
pub mod image;
pub mod markdown;
pub mod model;
pub mod preprocess;
pub mod source;
pub mod translate;

pub use batch::{convert_file, run_batch, BatchReport};
pub use config::ConvertOptions;
pub use model::Document;

/// Runs the in-memory pipeline: extended-syntax preprocessing, Markdown to
/// HTML, then HTML to the document model.
pub fn markdown_to_document(md: &str, images: &image::ImageLoader) -> Document {
    translate::translate(&markdown::render(md), images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn pipeline_runs_in_memory() {
        let images = image::ImageLoader::new(Path::new("."), &ConvertOptions::default());
        let doc = markdown_to_document("# Hello\n\nE = mc^2^\n", &images);
        assert_eq!(doc.title.as_deref(), Some("Hello"));
        assert_eq!(doc.paragraphs().count(), 2);
        assert!(docx::to_bytes(&doc).is_ok_and(|b| b.starts_with(b"PK")));
    }
}
