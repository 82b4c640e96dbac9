use percent_encoding::percent_decode;

/// Decode `%XX` escapes (hex digits in either case) and `+` as a space.
///
/// A `%` that is not followed by two hex digits, including one at the very
/// end of the input, is copied literally and decoding resumes at the next
/// byte. Every other byte passes through unchanged.
pub fn url_decode(input: &[u8]) -> Vec<u8> {
    // `+` is swapped before decoding so an escaped `%2B` stays a plus sign.
    let spaced: Vec<u8> = input
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

/// Escape `<`, `>` and `&` as HTML entities, stopping before the output
/// would exceed `max_len` bytes.
///
/// Truncation never splits an entity or a UTF-8 character. NUL characters
/// are dropped.
pub fn html_escape(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_len));
    let mut utf8 = [0u8; 4];

    for ch in input.chars() {
        let piece: &str = match ch {
            '<' => "&lt;",
            '>' => "&gt;",
            '&' => "&amp;",
            '\0' => continue,
            _ => ch.encode_utf8(&mut utf8),
        };
        if out.len() + piece.len() > max_len {
            break;
        }
        out.push_str(piece);
    }

    out
}
