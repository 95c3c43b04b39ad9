//! SSE (Server-Sent Events) framing for the relay's `/chat` response.
//!
//! Converts a provider's channel of [`CompletionEvent`]s into frames of the
//! form `data: {"content": "<fragment>"}`, followed by `data: [DONE]`.

use std::convert::Infallible;
use std::io;

use axum::response::sse::Event;
use futures::stream::Stream;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::error;

use crate::provider::sse::DONE_SENTINEL;
use crate::provider::{CompletionEvent, CompletionStream};

/// Payload of a single content frame.
#[derive(Debug, Serialize)]
pub struct ContentFrame<'a> {
    pub content: &'a str,
}

/// JSON formatter producing `{"k": "v", "k2": 1}` with non-ASCII characters
/// escaped as `\uXXXX`.
struct SpacedAsciiFormatter;

impl serde_json::ser::Formatter for SpacedAsciiFormatter {
    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Encode a text fragment as the JSON body of a content frame.
pub fn content_json(text: &str) -> String {
    let mut out = Vec::with_capacity(text.len() + 16);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    let frame = ContentFrame { content: text };
    if frame.serialize(&mut ser).is_err() {
        return String::new();
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Convert a provider stream into an SSE stream.
///
/// Empty deltas are skipped. Normal completion appends the `[DONE]` frame.
/// A mid-stream provider error is logged and ends the stream without it.
pub fn completion_to_sse_stream(
    rx: CompletionStream,
) -> impl Stream<Item = Result<Event, Infallible>> {
    // `None` marks the provider closing the channel normally.
    ReceiverStream::new(rx)
        .map(Some)
        .chain(tokio_stream::once(None))
        .take_while(|event| match event {
            Some(CompletionEvent::Error(e)) => {
                error!(error = %e, "Provider stream failed");
                false
            }
            _ => true,
        })
        .filter_map(|event| match event {
            Some(CompletionEvent::Chunk(chunk)) => chunk
                .text_delta()
                .map(|text| Ok::<_, Infallible>(Event::default().data(content_json(text)))),
            Some(CompletionEvent::Error(_)) => None,
            None => Some(Ok(Event::default().data(DONE_SENTINEL))),
        })
}
