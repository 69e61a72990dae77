//! Prompt formation for the vision model (§4.4)
//!
//! The text part of the chat request substitutes `{ocr_text}` into a
//! configurable template: the literal `(no text detected)` when OCR found
//! nothing, otherwise the OCR text truncated to 1000 characters.

const DEFAULT_TEMPLATE: &str =
    "Describe what is happening in this screenshot. OCR extracted the following text from it:\n\n{ocr_text}";

const MAX_OCR_TEXT_CHARS: usize = 1000;

/// Renders the prompt template with `ocr_text` substituted in.
pub fn build_prompt(template: &str, ocr_text: Option<&str>) -> String {
    let rendered_text = match ocr_text {
        Some(text) => truncate_chars(text, MAX_OCR_TEXT_CHARS),
        None => "(no text detected)".to_string(),
    };

    template.replace("{ocr_text}", &rendered_text)
}

pub fn default_template() -> &'static str {
    DEFAULT_TEMPLATE
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_text_detected_substitutes_literal_placeholder() {
        let prompt = build_prompt(DEFAULT_TEMPLATE, None);
        assert!(prompt.contains("(no text detected)"));
    }

    #[test]
    fn short_ocr_text_is_passed_through_unchanged() {
        let prompt = build_prompt("{ocr_text}", Some("hello world"));
        assert_eq!(prompt, "hello world");
    }

    #[test]
    fn long_ocr_text_is_truncated_to_1000_chars() {
        let long_text: String = "a".repeat(5000);
        let prompt = build_prompt("{ocr_text}", Some(&long_text));
        assert_eq!(prompt.chars().count(), MAX_OCR_TEXT_CHARS);
    }
}
