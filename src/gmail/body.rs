use super::client::MessagePart;
use super::decode::decode;

/// Extract the plain text of a message payload
///
/// Inline body data on a part wins outright. Otherwise every `text/plain`
/// child contributes, nested containers are descended whatever their own
/// type, and the fragments are joined with newlines in tree order.
pub fn extract_text(payload: Option<&MessagePart>) -> String {
    let Some(payload) = payload else {
        return String::new();
    };

    if let Some(data) = inline_data(payload) {
        return decode(data);
    }

    let mut texts = Vec::new();

    for part in payload.parts.as_deref().unwrap_or_default() {
        if part
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("text/plain"))
            && let Some(data) = inline_data(part)
        {
            texts.push(decode(data));
        }

        if part.parts.is_some() {
            let nested = extract_text(Some(part));
            if !nested.is_empty() {
                texts.push(nested);
            }
        }
    }

    texts.join("\n")
}

/// Value of the first `Subject` header, matched case-insensitively
pub fn subject(payload: Option<&MessagePart>) -> String {
    payload
        .and_then(|p| p.headers.as_deref())
        .unwrap_or_default()
        .iter()
        .find(|h| h.name.as_deref().unwrap_or_default().eq_ignore_ascii_case("subject"))
        .and_then(|h| h.value.clone())
        .unwrap_or_default()
}

fn inline_data(part: &MessagePart) -> Option<&str> {
    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .filter(|d| !d.is_empty())
}
