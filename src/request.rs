use crate::codec::url_decode;
use crate::config::limits;

pub const DEFAULT_USER: &str = "Anonymous";

const BODY_DELIMITER: &[u8] = b"\r\n\r\n";

/// The parts of a raw request this server looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: String,
    pub path: String,
    /// Bytes after the first blank line, or `None` when the buffer has no
    /// `\r\n\r\n` delimiter.
    pub body: Option<&'a [u8]>,
}

/// Parse method, path and body from a single receive buffer.
///
/// Never fails: missing tokens come back empty and oversized tokens are
/// truncated to their bounds.
pub fn parse_request(buffer: &[u8]) -> Request<'_> {
    let mut tokens = buffer
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());

    let method = bounded_token(tokens.next(), limits::METHOD);
    let path = bounded_token(tokens.next(), limits::PATH);

    let body = find(buffer, BODY_DELIMITER).map(|pos| &buffer[pos + BODY_DELIMITER.len()..]);

    Request { method, path, body }
}

fn bounded_token(token: Option<&[u8]>, max_len: usize) -> String {
    let token = token.unwrap_or_default();
    let text = String::from_utf8_lossy(&token[..token.len().min(max_len)]);

    // Replacement characters can push a lossy conversion past the bound.
    let mut end = text.len().min(max_len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Decoded fields of a chat submission form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user: String,
    pub text: String,
}

impl Submission {
    /// Extract `username` and `message` from a urlencoded body.
    ///
    /// Pairs are split on `&`, then on the first `=`; the first occurrence of
    /// a key wins. Raw values are truncated before decoding. An absent
    /// `username` becomes [`DEFAULT_USER`]; an absent `message` decodes to
    /// an empty text.
    pub fn from_form(body: &[u8]) -> Self {
        let mut user = None;
        let mut text = None;

        for (key, value) in form_pairs(body) {
            match key {
                b"username" if user.is_none() => {
                    user = Some(decode_field(value, limits::RAW_USERNAME));
                }
                b"message" if text.is_none() => {
                    text = Some(decode_field(value, limits::RAW_MESSAGE));
                }
                _ => {}
            }
        }

        Self {
            user: user.unwrap_or_else(|| DEFAULT_USER.to_string()),
            text: text.unwrap_or_default(),
        }
    }

    /// NUL characters are never stored, so text made only of them counts
    /// as empty.
    pub fn has_text(&self) -> bool {
        self.text.chars().any(|c| c != '\0')
    }
}

/// Iterate `key=value` pairs of a form body. A segment without `=` yields an
/// empty value.
pub fn form_pairs(body: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    body.split(|&b| b == b'&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &pair[pair.len()..]),
        })
}

fn decode_field(raw: &[u8], max_raw: usize) -> String {
    let raw = &raw[..raw.len().min(max_raw)];
    String::from_utf8_lossy(&url_decode(raw)).into_owned()
}
