//! Server-sent event framing for answer fragments.
//!
//! Each fragment becomes one `data: <fragment>\n\n` event. A blank line ends
//! an event on the wire, so line breaks inside a fragment are sent as the
//! two-character escape `\n`, with `\r\n` and bare `\r` normalized to `\n`
//! first. The stream always ends with a `data: [DONE]\n\n` event, even when
//! there were no fragments.

use axum::body::Bytes;
use futures::stream::{self, Stream, StreamExt};
use raglab_core::Error;

pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// Frame one fragment as an SSE event.
pub fn frame(fragment: &str) -> String {
    let escaped = fragment
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\\n");
    format!("data: {escaped}\n\n")
}

/// Frame a fragment stream, appending the terminal event once it ends.
///
/// An error ends the body without the terminal event so the client sees a
/// broken stream rather than a truncated answer that looks complete.
pub fn event_stream<S>(fragments: S) -> impl Stream<Item = Result<Bytes, Error>> + Send + 'static
where
    S: Stream<Item = Result<String, Error>> + Send + 'static,
{
    fragments
        .map(|fragment| fragment.map(|f| Bytes::from(frame(&f))))
        .chain(stream::once(async { Ok(Bytes::from_static(DONE_EVENT.as_bytes())) }))
        .scan(false, |failed, item| {
            // Stop after the first error so [DONE] never follows it.
            if *failed {
                return futures::future::ready(None);
            }
            *failed = item.is_err();
            futures::future::ready(Some(item))
        })
}
