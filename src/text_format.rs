//! Inline rich-text formatting for chapter paragraphs.
//!
//! Chapter JSON marks emphasis with paired delimiters. Text is first escaped
//! for markup, then each delimiter pair is replaced with the shortest match
//! between two occurrences, in this order:
//!
//! | Source    | Markup                              |
//! |-----------|-------------------------------------|
//! | `**x**`   | `<span class="scene">x</span>`      |
//! | `*x*`     | `<span class="dialogue">x</span>`   |
//! | `__x__`   | `<strong>x</strong>`                |
//! | `_x_`     | `<em>x</em>`                        |
//!
//! Replacement is textual. Unbalanced delimiters are left untouched, and
//! overlapping pairs such as `*a_b* c_` yield crossed tags.
//!
//! [`FormattedParagraph`] formats a whole paragraph once and hands out word
//! ranges of it, so a pair that straddles a page break still applies on both
//! sides.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

struct DelimiterRule {
    pattern: Regex,
    replacement: &'static str,
}

// Patterns are literals; compilation cannot fail at runtime.
#[allow(clippy::expect_used)]
static DELIMITER_RULES: LazyLock<[DelimiterRule; 4]> = LazyLock::new(|| {
    let rule = |pattern: &str, replacement: &'static str| DelimiterRule {
        pattern: Regex::new(pattern).expect("delimiter pattern is valid"),
        replacement,
    };
    [
        rule(r"\*\*(.*?)\*\*", r#"<span class="scene">${1}</span>"#),
        rule(r"\*(.*?)\*", r#"<span class="dialogue">${1}</span>"#),
        rule(r"__(.*?)__", "<strong>${1}</strong>"),
        rule(r"_(.*?)_", "<em>${1}</em>"),
    ]
});

/// Escape `<`, `>`, `&`, `'` and `"` so raw text is safe inside markup.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Escape `text` and apply the delimiter rules.
pub fn format_rich_text(text: &str) -> String {
    let mut formatted = escape_text(text).into_owned();
    for rule in DELIMITER_RULES.iter() {
        let replaced = match rule.pattern.replace_all(&formatted, rule.replacement) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(replaced) => replaced,
        };
        formatted = replaced;
    }
    formatted
}

/// Formatted paragraph markup addressable by word index.
///
/// Delimiters are replaced by tags inside the word they belong to, so the
/// markup has exactly as many words as [`split_words`] yields for the source.
/// Inline tags still open at the edge of a slice are closed at its end and
/// reopened at the start of the next slice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormattedParagraph {
    html: String,
    words: Vec<WordMarkup>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct WordMarkup {
    /// Byte range of the word, tags included.
    bytes: Range<usize>,
    /// Open inline tags before the word, outermost first.
    open_before: Vec<Range<usize>>,
    /// Open inline tags after the word, outermost first.
    open_after: Vec<Range<usize>>,
}

impl FormattedParagraph {
    pub fn new(paragraph: &str) -> Self {
        let html = format_rich_text(paragraph);
        let mut words = Vec::with_capacity(16);
        let mut stack: Vec<Range<usize>> = Vec::new();
        let mut current: Option<WordMarkup> = None;
        let mut pos = 0;

        while let Some(ch) = html[pos..].chars().next() {
            if ch == '<' {
                let len = html[pos..].find('>').map_or(html.len() - pos, |end| end + 1);
                let word = current.get_or_insert_with(|| WordMarkup::starting_at(pos, &stack));
                word.bytes.end = pos + len;
                apply_tag(&html, pos..pos + len, &mut stack);
                pos += len;
                continue;
            }
            if ch.is_whitespace() {
                if let Some(mut word) = current.take() {
                    word.open_after = stack.clone();
                    words.push(word);
                }
            } else {
                let word = current.get_or_insert_with(|| WordMarkup::starting_at(pos, &stack));
                word.bytes.end = pos + ch.len_utf8();
            }
            pos += ch.len_utf8();
        }
        if let Some(mut word) = current.take() {
            word.open_after = stack;
            words.push(word);
        }

        Self { html, words }
    }

    /// Markup of the whole paragraph.
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Append the markup of `words` to `out` with inline tags balanced.
    ///
    /// Ranges past the last word are clipped; an empty range appends nothing.
    pub fn push_words(&self, out: &mut String, words: Range<usize>) {
        let end = words.end.min(self.words.len());
        if words.start >= end {
            return;
        }
        let (first, last) = (&self.words[words.start], &self.words[end - 1]);
        for open in &first.open_before {
            out.push_str(&self.html[open.clone()]);
        }
        out.push_str(&self.html[first.bytes.start..last.bytes.end]);
        for open in last.open_after.iter().rev() {
            out.push_str("</");
            out.push_str(tag_name(&self.html[open.clone()]));
            out.push('>');
        }
    }
}

impl WordMarkup {
    fn starting_at(pos: usize, stack: &[Range<usize>]) -> Self {
        Self {
            bytes: pos..pos,
            open_before: stack.to_vec(),
            open_after: Vec::new(),
        }
    }
}

fn tag_name(tag: &str) -> &str {
    tag.trim_start_matches(['<', '/'])
        .split(|c: char| c.is_whitespace() || c == '>')
        .next()
        .unwrap_or("")
}

/// Track open inline tags. A closing tag drops the innermost open tag of the
/// same name, wherever it sits in the stack.
fn apply_tag(html: &str, tag: Range<usize>, stack: &mut Vec<Range<usize>>) {
    let text = &html[tag.clone()];
    if text.starts_with("</") {
        let name = tag_name(text);
        if let Some(at) = stack
            .iter()
            .rposition(|open| tag_name(&html[open.clone()]) == name)
        {
            stack.remove(at);
        }
    } else if !text.ends_with("/>") {
        stack.push(tag);
    }
}

/// Words of a paragraph, split on any whitespace run.
pub fn split_words(paragraph: &str) -> impl Iterator<Item = &str> {
    paragraph.split_whitespace()
}

/// Number of words in a paragraph.
pub fn word_count(paragraph: &str) -> usize {
    split_words(paragraph).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_asterisks_become_scene_spans() {
        assert_eq!(
            format_rich_text("**Night falls** over the bay"),
            r#"<span class="scene">Night falls</span> over the bay"#
        );
    }

    #[test]
    fn single_asterisks_become_dialogue_spans() {
        assert_eq!(
            format_rich_text("She said *run* twice"),
            r#"She said <span class="dialogue">run</span> twice"#
        );
    }

    #[test]
    fn underscores_become_em_and_strong() {
        assert_eq!(
            format_rich_text("a __bold__ and _soft_ word"),
            "a <strong>bold</strong> and <em>soft</em> word"
        );
    }

    #[test]
    fn matches_are_shortest_between_delimiters() {
        assert_eq!(
            format_rich_text("*a* and *b*"),
            r#"<span class="dialogue">a</span> and <span class="dialogue">b</span>"#
        );
    }

    #[test]
    fn unbalanced_delimiter_is_left_literal() {
        assert_eq!(format_rich_text("5 * 3 = 15"), "5 * 3 = 15");
        // A lone `**` is read as an empty single-asterisk pair.
        assert_eq!(
            format_rich_text("**open *x* tail"),
            r#"<span class="dialogue"></span>open <span class="dialogue">x</span> tail"#
        );
    }

    #[test]
    fn markup_characters_are_escaped_before_formatting() {
        assert_eq!(
            format_rich_text("<b>Tom & *Jerry*</b>"),
            r#"&lt;b&gt;Tom &amp; <span class="dialogue">Jerry</span>&lt;/b&gt;"#
        );
    }

    fn sliced(paragraph: &FormattedParagraph, words: Range<usize>) -> String {
        let mut out = String::new();
        paragraph.push_words(&mut out, words);
        out
    }

    #[test]
    fn formatted_paragraph_has_one_word_per_source_word() {
        for text in [
            "**Dawn.** The keeper climbed the *long* stair.",
            "a * b * c",
            "**** and __x y__ _z_",
            "He said *don't_go* and _left_ quietly.",
        ] {
            assert_eq!(FormattedParagraph::new(text).word_count(), word_count(text), "{text}");
        }
    }

    #[test]
    fn full_slice_matches_formatted_text() {
        let text = "She said *run now* and __left__.";
        let paragraph = FormattedParagraph::new(text);
        assert_eq!(sliced(&paragraph, 0..paragraph.word_count()), format_rich_text(text));
        assert_eq!(paragraph.html(), format_rich_text(text));
    }

    #[test]
    fn pair_split_across_slices_is_closed_and_reopened() {
        let paragraph = FormattedParagraph::new("He said *run right now* twice");
        assert_eq!(
            sliced(&paragraph, 0..3),
            r#"He said <span class="dialogue">run</span>"#
        );
        assert_eq!(
            sliced(&paragraph, 3..6),
            r#"<span class="dialogue">right now</span> twice"#
        );
    }

    #[test]
    fn crossed_tags_stay_word_aligned() {
        let paragraph = FormattedParagraph::new("*don't_go* and _left_");
        // The trailing `_` has no partner once `_go</span> and _` pairs up.
        assert_eq!(sliced(&paragraph, 2..3), "<em></em>left_");
        assert_eq!(sliced(&paragraph, 1..2), "<em>and</em>");
        assert_eq!(sliced(&paragraph, 5..9), "");
    }

    #[test]
    fn word_count_ignores_whitespace_runs() {
        assert_eq!(word_count("  one\ttwo \n three  "), 3);
        assert_eq!(word_count(""), 0);
        let words: Vec<&str> = split_words("a  b").collect();
        assert_eq!(words, vec!["a", "b"]);
    }
}
