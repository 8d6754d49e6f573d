// src/process/record.rs

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ParseFailure;

/// One flat record: tag name → text, in document order.
/// A repeated tag keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    /// The field's value; `None` both when absent and when null.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut rec = Record::new();
        for (k, v) in iter {
            rec.insert(k, v);
        }
        rec
    }
}

/// A parsed per-auction document. Always holds at least one record.
#[derive(Debug, Clone)]
pub struct AuctionDocument {
    pub name: String,
    records: Vec<Record>,
}

impl AuctionDocument {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Result<Self, ParseFailure> {
        if records.is_empty() {
            return Err(ParseFailure::NoRecords);
        }
        Ok(Self {
            name: name.into(),
            records,
        })
    }

    /// Parse raw XML bytes.
    pub fn parse(name: impl Into<String>, xml: &[u8]) -> Result<Self, ParseFailure> {
        Self::new(name, parse_records(xml)?)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// First record: the pre-auction announcement.
    pub fn announcement(&self) -> &Record {
        &self.records[0]
    }

    /// Last record: the auction result. Same as the announcement for single-record documents.
    pub fn result(&self) -> &Record {
        &self.records[self.records.len() - 1]
    }
}

/// Where the reader is relative to the root.
enum Depth {
    BeforeRoot,
    InRoot,
    InRecord(Record),
    InField {
        record: Record,
        name: String,
        text: Option<String>,
        nested: usize,
        saw_child: bool,
    },
    AfterRoot,
}

/// Parse a document into one `Record` per child of the root element.
///
/// Only one level below each record is read: `<Tag>text</Tag>` becomes
/// `Tag → Some(text)`, empty text becomes `None`. Attributes, namespaces
/// and anything nested deeper than a field are ignored.
///
/// Values are trimmed, so whitespace-only text is also `None`.
pub fn parse_records(xml: &[u8]) -> Result<Vec<Record>, ParseFailure> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut state = Depth::BeforeRoot;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        state = match (state, event) {
            (state, Event::Eof) => {
                return match state {
                    Depth::AfterRoot => Ok(records),
                    Depth::BeforeRoot => Err(ParseFailure::Malformed("no root element".into())),
                    _ => Err(ParseFailure::Malformed("unexpected end of document".into())),
                };
            }

            // prolog, comments and processing instructions carry no data
            (
                state,
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_),
            ) => state,

            (Depth::BeforeRoot, Event::Start(_)) => Depth::InRoot,
            (Depth::BeforeRoot, Event::Empty(_)) => Depth::AfterRoot,

            (Depth::InRoot, Event::Start(_)) => Depth::InRecord(Record::new()),
            (Depth::InRoot, Event::Empty(_)) => {
                records.push(Record::new());
                Depth::InRoot
            }
            (Depth::InRoot, Event::End(_)) => Depth::AfterRoot,
            (Depth::InRoot, _) => Depth::InRoot,

            (Depth::InRecord(record), Event::Start(e)) => Depth::InField {
                record,
                name: tag_name(e.name().as_ref()),
                text: None,
                nested: 0,
                saw_child: false,
            },
            (Depth::InRecord(mut record), Event::Empty(e)) => {
                record.insert(tag_name(e.name().as_ref()), None);
                Depth::InRecord(record)
            }
            (Depth::InRecord(record), Event::End(_)) => {
                records.push(record);
                Depth::InRoot
            }
            (state @ Depth::InRecord(_), _) => state,

            (
                Depth::InField {
                    record,
                    name,
                    text,
                    nested,
                    saw_child,
                },
                event,
            ) => match event {
                Event::Text(t) if !saw_child => Depth::InField {
                    record,
                    name,
                    text: append(text, &t.unescape()?),
                    nested,
                    saw_child,
                },
                Event::CData(c) if !saw_child => Depth::InField {
                    record,
                    name,
                    text: append(text, &String::from_utf8_lossy(&c)),
                    nested,
                    saw_child,
                },
                Event::Start(_) => Depth::InField {
                    record,
                    name,
                    text,
                    nested: nested + 1,
                    saw_child: true,
                },
                Event::Empty(_) => Depth::InField {
                    record,
                    name,
                    text,
                    nested,
                    saw_child: true,
                },
                Event::End(_) if nested > 0 => Depth::InField {
                    record,
                    name,
                    text,
                    nested: nested - 1,
                    saw_child,
                },
                Event::End(_) => {
                    let mut record = record;
                    record.insert(name, text.filter(|t| !t.is_empty()));
                    Depth::InRecord(record)
                }
                // only text ahead of the first nested child belongs to the field
                _ => Depth::InField {
                    record,
                    name,
                    text,
                    nested,
                    saw_child,
                },
            },

            (Depth::AfterRoot, Event::Start(_) | Event::Empty(_)) => {
                return Err(ParseFailure::Malformed(
                    "content after the root element".into(),
                ));
            }
            (Depth::AfterRoot, Event::Text(_) | Event::CData(_)) => {
                return Err(ParseFailure::Malformed(
                    "text after the root element".into(),
                ));
            }
            (Depth::BeforeRoot, Event::Text(_) | Event::CData(_)) => {
                return Err(ParseFailure::Malformed(
                    "text before the root element".into(),
                ));
            }
            (state, _) => state,
        };
        buf.clear();
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn append(text: Option<String>, more: &str) -> Option<String> {
    match text {
        Some(mut t) => {
            t.push_str(more);
            Some(t)
        }
        None => Some(more.to_string()),
    }
}
