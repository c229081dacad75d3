//! Approximate word counting for chat messages
//!
//! Message bodies written by roleplay models carry a lot of non-narrative
//! markup: reasoning blocks, disclaimer trailers, HTML comments used as
//! drafts, UI pseudo-tags and inline styling. Those are stripped first, then
//! every CJK/Kana/Hangul codepoint counts as one word and every run of ASCII
//! letters and digits counts as one word.
//!
//! This is a proxy for "how much was written", not a tokenizer.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Compiled filter chain, applied in field order
struct MarkupFilters {
    reasoning: Regex,
    closing_marker: Regex,
    trailer: Regex,
    comment: Regex,
    ui_tag: Regex,
    styled_paragraph: Regex,
    any_tag: Regex,
}

impl MarkupFilters {
    fn build() -> Result<Self, regex::Error> {
        Ok(Self {
            reasoning: Regex::new(
                r"(?is)<think>.*?(?:</think>|$)|<thinking>.*?(?:</thinking>|$)",
            )?,
            closing_marker: Regex::new(r"(?i)\[finire\]")?,
            trailer: Regex::new(
                r"(?is)<finish>.*?(?:</finish>|$)|<disclaimer>.*?(?:</disclaimer>|$)",
            )?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            ui_tag: Regex::new(r"(?i)<(?:DH|FH)_[^>]*>")?,
            styled_paragraph: Regex::new(r"(?i)<p style[^>]*>")?,
            any_tag: Regex::new(r"<[^>]*>")?,
        })
    }

    fn apply(&self, text: &str) -> String {
        let steps = [
            &self.reasoning,
            &self.closing_marker,
            &self.trailer,
            &self.comment,
            &self.ui_tag,
            &self.styled_paragraph,
            &self.any_tag,
        ];
        steps
            .iter()
            .fold(text.to_string(), |acc, re| match re.replace_all(&acc, "") {
                Cow::Borrowed(_) => acc,
                Cow::Owned(stripped) => stripped,
            })
    }
}

static FILTERS: LazyLock<Result<MarkupFilters, regex::Error>> =
    LazyLock::new(MarkupFilters::build);

/// Strip non-content markup from a message body
///
/// If the filter chain is unavailable the text is returned unchanged.
pub fn filter_message_text(raw: &str) -> Cow<'_, str> {
    match FILTERS.as_ref() {
        Ok(filters) => Cow::Owned(filters.apply(raw)),
        Err(e) => {
            tracing::warn!(error = %e, "Message filters unavailable; counting unfiltered text");
            Cow::Borrowed(raw)
        }
    }
}

/// Count approximate words in a message body
///
/// Accepts either `&str` or `Option<&str>`; absent and empty input count as
/// zero.
///
/// # Examples
///
/// ```
/// use companion_stats::word_count::count_words;
///
/// assert_eq!(count_words("<think>plan the reply</think>Hello there"), 2);
/// assert_eq!(count_words("你好 world"), 3);
/// assert_eq!(count_words(None), 0);
/// ```
pub fn count_words<'a>(raw: impl Into<Option<&'a str>>) -> u64 {
    match raw.into() {
        None | Some("") => 0,
        Some(text) => count_tokens(&filter_message_text(text)),
    }
}

/// CJK ideographs, Hiragana/Katakana, Katakana extensions and Hangul syllables
pub(crate) fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3040}'..='\u{30ff}'
        | '\u{31f0}'..='\u{31ff}'
        | '\u{ac00}'..='\u{d7af}')
}

/// Count CJK codepoints plus maximal ASCII alphanumeric runs
pub(crate) fn count_tokens(text: &str) -> u64 {
    let mut count = 0u64;
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if !in_run {
                count += 1;
                in_run = true;
            }
            continue;
        }
        in_run = false;
        if is_cjk(c) {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_absent_count_zero() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words(None), 0);
        assert_eq!(count_words(Some("")), 0);
    }

    #[test]
    fn test_latin_runs() {
        assert_eq!(count_words("Hello, world! It's 2024."), 5);
        assert_eq!(count_words("abc123def"), 1);
    }

    #[test]
    fn test_cjk_codepoints_each_count() {
        assert_eq!(count_words("今天天气很好"), 6);
        assert_eq!(count_words("こんにちは"), 5);
        assert_eq!(count_words("안녕하세요"), 5);
        assert_eq!(count_words("我爱Rust语言"), 5);
    }

    #[test]
    fn test_think_blocks_removed() {
        assert_eq!(count_words("<think>secret plan here</think>Hi"), 1);
        assert_eq!(count_words("<THINKING>\nmany\nlines\n</THINKING>Hi there"), 2);
    }

    #[test]
    fn test_unclosed_think_runs_to_end() {
        assert_eq!(count_words("Visible words<think>never closed reasoning"), 2);
    }

    #[test]
    fn test_closing_marker_removed() {
        assert_eq!(count_words("The end [finire]"), 2);
        assert_eq!(count_words("The end [FINIRE]"), 2);
    }

    #[test]
    fn test_finish_and_disclaimer_blocks_removed() {
        assert_eq!(count_words("Story<finish>status: ok</finish>"), 1);
        assert_eq!(
            count_words("Story<disclaimer>This is fiction and more"),
            1
        );
    }

    #[test]
    fn test_html_comments_removed() {
        assert_eq!(count_words("a <!-- draft: lots of words --> b"), 2);
    }

    #[test]
    fn test_ui_pseudo_tags_removed() {
        assert_eq!(count_words("<DH_status hp=10 mp=3>Walk"), 1);
        assert_eq!(count_words("<fh_panel x=1>Run"), 1);
    }

    #[test]
    fn test_styled_paragraph_and_tags_keep_inner_text() {
        assert_eq!(count_words("<p style=\"color:red\">Red text</p>"), 2);
        assert_eq!(count_words("<b>bold</b> and <i>italic</i>"), 3);
    }

    #[test]
    fn test_ordering_think_before_generic_tags() {
        // The reasoning block must go entirely, not just its tags.
        assert_eq!(count_words("<think><b>x y z</b></think><b>kept</b>"), 1);
    }

    #[test]
    fn test_count_is_stable_on_filtered_output() {
        let samples = [
            "<think>a b</think>你好<b>world</b><!-- c -->",
            "<p style=\"x\">Hello</p> [finire] <DH_x>テスト",
            "plain text only",
            "<<b>nested>",
        ];
        for sample in samples {
            let filtered = filter_message_text(sample).into_owned();
            assert_eq!(count_words(filtered.as_str()), count_words(sample), "{sample}");
        }
    }

    #[test]
    fn test_is_cjk_ranges() {
        assert!(is_cjk('中'));
        assert!(is_cjk('あ'));
        assert!(is_cjk('ア'));
        assert!(is_cjk('한'));
        assert!(!is_cjk('a'));
        assert!(!is_cjk('é'));
    }
}
