use crate::request::find;
use crate::store::MessageStore;

/// Placeholder in the root template replaced by the chat log.
pub const CHAT_MARKER: &[u8] = b"<!-- CHAT_MESSAGES -->";

/// A template ready to be written out, split around the chat marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<'a> {
    /// No marker: the template goes out unmodified.
    Verbatim(&'a [u8]),
    Spliced {
        before: &'a [u8],
        messages: Vec<u8>,
        after: &'a [u8],
    },
}

/// Splice the current log into `template` at the first [`CHAT_MARKER`].
///
/// The store lock is held only while the fragments are copied out, so the
/// caller can write the parts without holding it.
pub fn render_template<'a>(template: &'a [u8], store: &MessageStore) -> Rendered<'a> {
    match find(template, CHAT_MARKER) {
        Some(pos) => {
            let mut messages = Vec::new();
            store.render_into(&mut messages);
            Rendered::Spliced {
                before: &template[..pos],
                messages,
                after: &template[pos + CHAT_MARKER.len()..],
            }
        }
        None => Rendered::Verbatim(template),
    }
}

impl Rendered<'_> {
    /// The byte slices to send, in order.
    pub fn parts(&self) -> Vec<&[u8]> {
        match self {
            Rendered::Verbatim(bytes) => vec![*bytes],
            Rendered::Spliced {
                before,
                messages,
                after,
            } => vec![*before, messages.as_slice(), *after],
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.parts().concat()
    }
}
