//! Text rendering helpers shared by notifications and command replies.

/// Maximum length, in code points, of a shortened body (separators included).
pub const SHORT_BODY_MAX: usize = 40;

/// Marker appended to a truncated body.
pub const ELLIPSIS: char = '\u{2026}';

/// Horizontal rule framing quoted bodies in outbound messages.
pub const RULE: &str = "──────────";

/// Number of leading id characters used as a reply shortcode.
pub const SHORTCODE_LEN: usize = 4;

/// Shorten a body for one-line context.
///
/// Words are taken while the running total of `word length + 1` stays within
/// [`SHORT_BODY_MAX`] code points. When any word is left out the result ends
/// with [`ELLIPSIS`].
pub fn short_body(body: &str) -> String {
    let words: Vec<&str> = body.split_whitespace().collect();
    let mut total = 0;
    let mut keep = words.len();
    for (i, word) in words.iter().enumerate() {
        total += word.chars().count() + 1;
        if total > SHORT_BODY_MAX {
            keep = i;
            break;
        }
    }

    let mut out = words[..keep].join(" ");
    if keep < words.len() {
        out.push(ELLIPSIS);
    }
    out
}

/// First [`SHORTCODE_LEN`] characters of a post id.
pub fn shortcode(id: &str) -> &str {
    id.char_indices()
        .nth(SHORTCODE_LEN)
        .map_or(id, |(idx, _)| &id[..idx])
}

/// Render a name, substituting `own_title` when it is the reader's own name.
pub fn human_name<'a>(name: &'a str, own_name: &str, own_title: &'a str) -> &'a str {
    if name == own_name { own_title } else { name }
}

/// Render a list of names as `a, b and c`, substituting the reader's own
/// name with `own_title`.
pub fn human_list(names: &[String], own_name: &str, own_title: &str) -> String {
    let names: Vec<&str> = names
        .iter()
        .map(|n| human_name(n, own_name, own_title))
        .collect();
    match names.as_slice() {
        [] => String::new(),
        [single] => (*single).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
