use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{HarvestError, Result};

const RESUMPTION_TOKEN: &[u8] = b"resumptionToken";

/// Find the first `resumptionToken` element anywhere in `payload`.
///
/// Returns `None` when the element is absent or its text is blank, which is
/// how providers signal the last page.
pub fn extract_resumption_token(payload: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(payload);

    loop {
        match reader.read_event()? {
            Event::Start(start) if start.local_name().as_ref() == RESUMPTION_TOKEN => {
                let text = read_element_text(&mut reader)?;
                let token = text.trim();
                return Ok((!token.is_empty()).then(|| token.to_string()));
            }
            Event::Empty(empty) if empty.local_name().as_ref() == RESUMPTION_TOKEN => {
                return Ok(None);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Collect decoded character data up to the end of the current element.
fn read_element_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Text(raw) => push_unescaped(&mut text, &raw)?,
            Event::GeneralRef(reference) => push_reference(&mut text, &reference)?,
            Event::CData(cdata) => text.push_str(utf8(&cdata)?),
            Event::Eof => return Err(HarvestError::UnexpectedEof),
            _ => {}
        }
    }
}

pub(crate) fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|err| HarvestError::Encoding(err.to_string()))
}

pub(crate) fn push_unescaped(out: &mut String, raw: &[u8]) -> Result<()> {
    out.push_str(&quick_xml::escape::unescape(utf8(raw)?)?);
    Ok(())
}

pub(crate) fn push_reference(out: &mut String, name: &[u8]) -> Result<()> {
    let reference = format!("&{};", utf8(name)?);
    push_unescaped(out, reference.as_bytes())
}
