//! Cleanup of raw model output before it is shown to the user.

/// Suffix marking a message that was shortened.
pub const ELLIPSIS: &str = "...";

/// A generated message as returned by the model and after cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedMessage {
    pub raw_text: String,
    pub sanitized_text: String,
}

impl ProposedMessage {
    pub fn new(raw_text: impl Into<String>, max_length: usize) -> Self {
        let raw_text = raw_text.into();
        let sanitized_text = sanitize(&raw_text, max_length);
        Self {
            raw_text,
            sanitized_text,
        }
    }
}

/// Trim, unwrap quotes, and clamp to `max_length` characters.
///
/// A matching pair of double quotes is checked before single quotes, and
/// unwrapping repeats until the text is no longer wrapped, so the result is
/// stable under a second pass. Text over the limit is cut back to the last
/// whitespace inside `max_length - 3` characters and gets [`ELLIPSIS`]
/// appended; a first word longer than the window is hard-cut instead.
pub fn sanitize(raw_text: &str, max_length: usize) -> String {
    let mut text = raw_text.trim();
    while let Some(inner) = strip_wrapping_quotes(text) {
        text = inner.trim();
    }
    clamp(text, max_length)
}

fn strip_wrapping_quotes(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        (text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote))
            .then(|| &text[1..text.len() - 1])
    })
}

fn clamp(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let ellipsis_len = ELLIPSIS.chars().count();
    if max_length <= ellipsis_len {
        return ELLIPSIS.chars().take(max_length).collect();
    }

    let budget = max_length - ellipsis_len;
    let window_end = text
        .char_indices()
        .nth(budget)
        .map_or(text.len(), |(i, _)| i);
    let window = &text[..window_end];
    let at_boundary = text[window_end..].starts_with(char::is_whitespace);

    let kept = if at_boundary {
        window
    } else {
        match window.rfind(char::is_whitespace) {
            Some(i) if i > 0 => &window[..i],
            _ => window,
        }
    };

    let mut out = kept.trim_end().to_string();
    out.push_str(ELLIPSIS);
    out
}
