//! Response body codec for the negotiated formats.
//!
//! JSON bodies decode directly. XML bodies are mapped onto JSON values:
//! elements become objects, repeated sibling names become arrays, leaf text
//! becomes a string and attributes become `@name` keys. An element whose only
//! children are `<item>` entries is an array. XML carries no
//! scalar types, so numbers and booleans arrive as strings.

use crate::domain::types::ResponseFormat;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Decode a successful response body. Empty bodies decode to `null`.
pub fn decode(format: ResponseFormat, body: &[u8]) -> Result<Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    match format {
        ResponseFormat::Json => serde_json::from_slice(body).map_err(|e| e.to_string()),
        ResponseFormat::Xml => decode_xml(body),
    }
}

/// Decode an error body without failing; anything unreadable becomes `{}`.
pub fn decode_lenient(format: ResponseFormat, body: &[u8]) -> Value {
    match decode(format, body) {
        Ok(Value::Null) | Err(_) => Value::Object(Map::new()),
        Ok(value) => value,
    }
}

/// Normalise a decoded list payload into its items.
///
/// JSON lists are bare arrays. XML lists arrive wrapped in a root element,
/// so a single-key object is unwrapped to its array (or lone record).
pub fn normalize_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Null => Some(Vec::new()),
        Value::String(s) if s.is_empty() => Some(Vec::new()),
        Value::Object(object) if object.len() == 1 => {
            let (_, inner) = object.into_iter().next()?;
            match inner {
                Value::Array(items) => Some(items),
                Value::Object(record) => Some(vec![Value::Object(record)]),
                Value::Null => Some(Vec::new()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Element name used for array entries
const ARRAY_ITEM: &str = "item";

struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: BTreeMap<String, Vec<Value>>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            attributes.insert(format!("@{}", key), Value::String(value.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            children: BTreeMap::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Frame {
            name,
            attributes,
            children,
            text,
        } = self;

        if children.is_empty() && attributes.is_empty() {
            let value = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            };
            return (name, value);
        }

        // Repeated `<item>` children are an encoded array, even when there is one
        if attributes.is_empty()
            && text.is_empty()
            && children.len() == 1
            && children.contains_key(ARRAY_ITEM)
        {
            let items = children.into_values().flatten().collect();
            return (name, Value::Array(items));
        }

        let mut object = attributes;
        for (key, mut values) in children {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            object.insert(key, value);
        }
        if !text.is_empty() {
            object.insert("$text".to_string(), Value::String(text));
        }
        (name, Value::Object(object))
    }
}

fn decode_xml(body: &[u8]) -> Result<Value, String> {
    let source = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                let (name, value) = frame.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(stack: &mut [Frame], root: &mut Option<Value>, name: String, value: Value) {
    match stack.last_mut() {
        Some(parent) => parent.children.entry(name).or_default().push(value),
        None => *root = Some(value),
    }
}

/// Render a JSON value as XML under the given root element.
///
/// Array elements are written as repeated `<item>` children.
pub fn encode_xml(root: &str, value: &Value) -> String {
    let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    write_element(&mut out, root, value);
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => {
            out.push('<');
            out.push_str(name);
            out.push_str("/>");
        }
        Value::Object(object) => {
            out.push_str(&format!("<{}>", name));
            for (key, child) in object {
                write_element(out, key, child);
            }
            out.push_str(&format!("</{}>", name));
        }
        Value::Array(items) => {
            out.push_str(&format!("<{}>", name));
            for item in items {
                write_element(out, ARRAY_ITEM, item);
            }
            out.push_str(&format!("</{}>", name));
        }
        Value::String(s) => {
            out.push_str(&format!(
                "<{}>{}</{}>",
                name,
                quick_xml::escape::escape(s.as_str()),
                name
            ));
        }
        Value::Bool(_) | Value::Number(_) => {
            out.push_str(&format!("<{}>{}</{}>", name, value, name));
        }
    }
}
