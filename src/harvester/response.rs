use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tokio::io::AsyncBufRead;

use crate::error::{HarvestError, Result};

use super::token::{push_reference, push_unescaped, utf8};

const ROOT: &[u8] = b"OAI-PMH";
const ERROR: &[u8] = b"error";

/// `<error code="...">message</error>` from the response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaiError {
    pub code: String,
    pub message: String,
}

/// One decoded OAI-PMH response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaiResponse {
    pub error: Option<OaiError>,
    /// Raw inner markup of the `OAI-PMH` element.
    pub payload: String,
}

impl OaiResponse {
    /// Fail with the provider's error, if the envelope carries a non-empty code.
    pub fn into_payload(self) -> Result<String> {
        match self.error {
            Some(error) if !error.code.is_empty() => Err(HarvestError::Protocol {
                code: error.code,
                message: error.message,
            }),
            _ => Ok(self.payload),
        }
    }
}

/// Decode an OAI-PMH envelope from `input` as it arrives.
///
/// Anything after the closing root tag is left unread.
pub async fn parse_response<R>(input: R) -> Result<OaiResponse>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();

    loop {
        match next_event(&mut reader, &mut buf).await? {
            Event::Decl(decl) => {
                if let Some(encoding) = decl.encoding() {
                    check_encoding(&encoding.map_err(quick_xml::Error::from)?)?;
                }
            }
            Event::Start(start) if start.local_name().as_ref() == ROOT => break,
            Event::Empty(empty) if empty.local_name().as_ref() == ROOT => {
                return Ok(OaiResponse::default());
            }
            Event::Eof => return Err(HarvestError::MissingRoot),
            _ => {}
        }
        buf.clear();
    }
    buf.clear();

    let mut payload = Writer::new(Vec::new());
    let mut error: Option<OaiError> = None;
    let mut in_error = false;
    let mut depth = 0usize;

    loop {
        let event = next_event(&mut reader, &mut buf).await?;
        match &event {
            Event::Start(start) => {
                if depth == 0 && start.local_name().as_ref() == ERROR && keeps_looking(&error) {
                    error = Some(error_from(start)?);
                    in_error = true;
                }
                depth += 1;
            }
            Event::Empty(empty)
                if depth == 0 && empty.local_name().as_ref() == ERROR && keeps_looking(&error) =>
            {
                error = Some(error_from(empty)?);
            }
            Event::End(_) if depth == 0 => break,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    in_error = false;
                }
            }
            Event::Text(text) if in_error => push_message(&mut error, |out| {
                push_unescaped(out, text)
            })?,
            Event::GeneralRef(reference) if in_error => push_message(&mut error, |out| {
                push_reference(out, reference)
            })?,
            Event::CData(cdata) if in_error => push_message(&mut error, |out| {
                out.push_str(utf8(cdata)?);
                Ok(())
            })?,
            Event::Eof => return Err(HarvestError::UnexpectedEof),
            _ => {}
        }

        payload
            .write_event(event)
            .map_err(|err| HarvestError::Output(std::io::Error::other(err.to_string())))?;
        buf.clear();
    }

    let payload = String::from_utf8(payload.into_inner())
        .map_err(|err| HarvestError::Encoding(err.to_string()))?;
    Ok(OaiResponse { error, payload })
}

async fn next_event<'b, R>(reader: &mut Reader<R>, buf: &'b mut Vec<u8>) -> Result<Event<'b>>
where
    R: AsyncBufRead + Unpin,
{
    reader
        .read_event_into_async(buf)
        .await
        .map_err(HarvestError::from_xml)
}

/// Only UTF-8 documents are accepted; bytes are never transcoded.
fn check_encoding(encoding: &[u8]) -> Result<()> {
    if encoding.eq_ignore_ascii_case(b"utf-8") || encoding.eq_ignore_ascii_case(b"utf8") {
        Ok(())
    } else {
        Err(HarvestError::Encoding(format!(
            "declared encoding '{}' is not supported",
            String::from_utf8_lossy(encoding)
        )))
    }
}

/// The first error with a non-empty code is the one reported.
fn keeps_looking(error: &Option<OaiError>) -> bool {
    error.as_ref().is_none_or(|error| error.code.is_empty())
}

fn error_from(start: &BytesStart<'_>) -> Result<OaiError> {
    let mut code = String::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == b"code" {
            push_unescaped(&mut code, &attr.value)?;
        }
    }
    Ok(OaiError {
        code,
        message: String::new(),
    })
}

fn push_message(
    error: &mut Option<OaiError>,
    push: impl FnOnce(&mut String) -> Result<()>,
) -> Result<()> {
    match error {
        Some(error) => push(&mut error.message),
        None => Ok(()),
    }
}
