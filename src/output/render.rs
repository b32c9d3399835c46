//! HTML to Markdown rendering

use crate::crawler::ContentError;

/// Converts the extracted main content to Markdown
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, main_html: &str) -> Result<String, ContentError>;
}

/// Renderer backed by `html2md`
///
/// Output is trimmed, runs of blank lines are collapsed and the result ends
/// with a single newline.
#[derive(Debug, Clone, Default)]
pub struct Html2MdRenderer;

impl MarkdownRenderer for Html2MdRenderer {
    fn render(&self, main_html: &str) -> Result<String, ContentError> {
        let markdown = html2md::parse_html(main_html);
        let tidy = collapse_blank_lines(markdown.trim());

        if tidy.is_empty() {
            return Err(ContentError::EmptyMarkdown);
        }

        tracing::trace!("Rendered Markdown (first 100 chars): {:.100}", tidy);
        Ok(format!("{}\n", tidy))
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    out.trim_end().to_string()
}
