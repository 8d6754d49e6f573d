// src/fetch/classify.rs
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ParseFailure;
use crate::security::SecurityType;

const SECURITY_TYPE_TAG: &[u8] = b"SecurityType";

/// Text of every `<SecurityType>` element, at any depth.
pub fn security_type_texts(xml: &[u8]) -> Result<Vec<String>, ParseFailure> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut texts = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == SECURITY_TYPE_TAG => {
                current = Some(String::new());
            }
            Event::Text(t) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == SECURITY_TYPE_TAG => {
                if let Some(text) = current.take() {
                    texts.push(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(texts)
}

/// Does the document declare itself as `security`?
pub fn is_security_type(xml: &[u8], security: SecurityType) -> Result<bool, ParseFailure> {
    Ok(security_type_texts(xml)?
        .iter()
        .any(|t| t.contains(security.marker())))
}

/// First recognised security type declared in the document.
pub fn classify(xml: &[u8]) -> Result<Option<SecurityType>, ParseFailure> {
    let texts = security_type_texts(xml)?;
    Ok(SecurityType::ALL
        .into_iter()
        .find(|s| texts.iter().any(|t| t.contains(s.marker()))))
}
