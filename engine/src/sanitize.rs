use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ValidationError;

static DOUBLE_ENCODED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)%25[0-9a-f]{2}").expect("static regex"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&(amp|lt|gt|quot|apos|nbsp|#39);").expect("static regex"));
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*script\b[^>]*>.*?<\s*/\s*script\s*>").expect("static regex")
});
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:@[!&]?|#)\d+>").expect("static regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?\s*[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>").expect("static regex")
});
static MASS_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(everyone|here)\b").expect("static regex"));

/// Clean free-form chat text before notation is pulled out of it.
///
/// NUL bytes are dropped, other control bytes are refused. Markup and
/// mentions are removed, mass pings are defused with a zero-width space, and
/// whitespace is collapsed. Emoji, custom emoji and bold/underline markup pass
/// through untouched.
pub fn sanitize(text: &str) -> Result<String, ValidationError> {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\t' | '\n' | '\r' => cleaned.push(c),
            c if c.is_control() => {
                tracing::debug!(found = ?c, "control character in chat text");
                return Err(ValidationError::InvalidCharacter(c));
            }
            c => cleaned.push(c),
        }
    }

    if DOUBLE_ENCODED.is_match(&cleaned) {
        return Err(ValidationError::InvalidNotation("double-encoded input"));
    }

    let decoded = ENTITY.replace_all(&cleaned, |caps: &Captures<'_>| {
        match caps[1].to_ascii_lowercase().as_str() {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" | "#39" => "'",
            _ => " ",
        }
    });
    let no_scripts = SCRIPT_BLOCK.replace_all(&decoded, " ");
    let no_mentions = MENTION.replace_all(&no_scripts, " ");
    let no_tags = TAG.replace_all(&no_mentions, " ");
    let defused = MASS_MENTION.replace_all(&no_tags, "@\u{200B}$1");

    Ok(defused.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_emoji_survive() {
        let out = sanitize("<:dice:123456789> 2d6").unwrap();
        assert_eq!(out, "<:dice:123456789> 2d6");
    }

    #[test]
    fn entities_are_decoded_before_tags_go() {
        assert_eq!(sanitize("&lt;b&gt;2d6&lt;/b&gt;").unwrap(), "2d6");
    }
}
