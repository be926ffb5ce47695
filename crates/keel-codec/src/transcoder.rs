use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use keel_types::{Fields, Oid, Value};
use serde_json::{Map, Number, Value as Json};

use crate::error::{CodecError, CodecResult};
use crate::tag::{
    NodeKind, BYTES_FIELD, DATETIME_TAG, DATE_TAG, OID_TAG, TAG_FIELD, TIME_TAG,
};

/// Converts record fields to and from the tagged JSON payload format.
pub struct Transcoder;

impl Transcoder {
    /// Encode a record's fields as payload text.
    pub fn encode_fields(fields: &Fields) -> CodecResult<String> {
        let mut node = Map::new();
        for (name, value) in fields.iter() {
            node.insert(name.clone(), Self::encode_value(value)?);
        }
        Ok(serde_json::to_string(&Json::Object(node))?)
    }

    /// Decode payload text back into a record's fields.
    ///
    /// The payload must be a JSON object. Its members are decoded one by one;
    /// the top level itself is never treated as a tagged node.
    pub fn decode_fields(text: &str) -> CodecResult<Fields> {
        let tree: Json = serde_json::from_str(text)?;
        let Json::Object(members) = tree else {
            return Err(CodecError::MalformedPayload(
                "payload is not a JSON object".into(),
            ));
        };
        members
            .iter()
            .map(|(name, node)| Ok((name.clone(), Self::decode_value(node)?)))
            .collect::<CodecResult<BTreeMap<String, Value>>>()
            .map(Fields::from)
    }

    /// Encode one value as a JSON tree.
    pub fn encode_value(value: &Value) -> CodecResult<Json> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).ok_or_else(|| {
                CodecError::InvalidArgument(format!("non-finite float {f}"))
            })?,
            Value::Str(s) => Json::String(s.clone()),
            Value::Date(d) => {
                let mut node = tagged(DATE_TAG);
                put_date(&mut node, d);
                Json::Object(node)
            }
            Value::Time(t) => {
                let mut node = tagged(TIME_TAG);
                put_time(&mut node, t);
                Json::Object(node)
            }
            Value::DateTime(dt) => {
                let mut node = tagged(DATETIME_TAG);
                put_date(&mut node, &dt.date());
                put_time(&mut node, &dt.time());
                Json::Object(node)
            }
            Value::Bytes(bytes) => {
                let mut node = Map::new();
                node.insert(BYTES_FIELD.into(), Json::String(STANDARD.encode(bytes)));
                Json::Object(node)
            }
            Value::Oid(oid) => {
                let mut node = tagged(OID_TAG);
                node.insert("namespace".into(), Json::String(oid.namespace().to_string()));
                node.insert("num".into(), Json::from(oid.sequence()));
                Json::Object(node)
            }
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(Self::encode_value)
                    .collect::<CodecResult<Vec<_>>>()?,
            ),
            Value::Map(map) => {
                let mut node = Map::new();
                for (name, item) in map {
                    node.insert(name.clone(), Self::encode_value(item)?);
                }
                // A plain map that would decode as a rich value cannot
                // round-trip.
                if NodeKind::classify(&node).is_rich() {
                    return Err(CodecError::InvalidArgument(format!(
                        "map uses reserved member {TAG_FIELD:?} or {BYTES_FIELD:?}"
                    )));
                }
                Json::Object(node)
            }
        })
    }

    /// Decode one JSON tree into a value, reconstructing tagged nodes at every
    /// nesting level.
    pub fn decode_value(node: &Json) -> CodecResult<Value> {
        Ok(match node {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => decode_number(n)?,
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(
                items
                    .iter()
                    .map(Self::decode_value)
                    .collect::<CodecResult<Vec<_>>>()?,
            ),
            Json::Object(members) => match NodeKind::classify(members) {
                NodeKind::Plain | NodeKind::Unknown => decode_map(members)?,
                NodeKind::Date => Value::Date(decode_date(members, NodeKind::Date)?),
                NodeKind::Time => Value::Time(decode_time(members, NodeKind::Time)?),
                NodeKind::DateTime => Value::DateTime(decode_datetime(members)?),
                NodeKind::Bytes => Value::Bytes(decode_bytes(members)?),
                NodeKind::Oid => Value::Oid(decode_oid(members)?),
            },
        })
    }
}

fn tagged(tag: &str) -> Map<String, Json> {
    let mut node = Map::new();
    node.insert(TAG_FIELD.into(), Json::String(tag.into()));
    node
}

fn put_date(node: &mut Map<String, Json>, d: &NaiveDate) {
    node.insert("y".into(), Json::from(d.year()));
    node.insert("month".into(), Json::from(d.month()));
    node.insert("d".into(), Json::from(d.day()));
}

fn put_time(node: &mut Map<String, Json>, t: &NaiveTime) {
    node.insert("h".into(), Json::from(t.hour()));
    node.insert("minute".into(), Json::from(t.minute()));
    node.insert("s".into(), Json::from(t.second()));
    node.insert("ns".into(), Json::from(t.nanosecond()));
}

fn malformed(kind: NodeKind, reason: impl std::fmt::Display) -> CodecError {
    CodecError::MalformedPayload(format!("{kind} node: {reason}"))
}

fn decode_number(n: &Number) -> CodecResult<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| CodecError::MalformedPayload(format!("unrepresentable number {n}")))
}

fn decode_map(members: &Map<String, Json>) -> CodecResult<Value> {
    members
        .iter()
        .map(|(name, node)| Ok((name.clone(), Transcoder::decode_value(node)?)))
        .collect::<CodecResult<BTreeMap<_, _>>>()
        .map(Value::Map)
}

/// A required integer component of a tagged node, range-checked into `T`.
fn component<T: TryFrom<i64>>(
    members: &Map<String, Json>,
    name: &str,
    kind: NodeKind,
) -> CodecResult<T> {
    let raw = members
        .get(name)
        .ok_or_else(|| malformed(kind, format!("missing component {name:?}")))?;
    let int = raw
        .as_i64()
        .ok_or_else(|| malformed(kind, format!("component {name:?} is not an integer: {raw}")))?;
    T::try_from(int).map_err(|_| malformed(kind, format!("component {name:?} out of range: {int}")))
}

fn decode_date(members: &Map<String, Json>, kind: NodeKind) -> CodecResult<NaiveDate> {
    let year: i32 = component(members, "y", kind)?;
    let month: u32 = component(members, "month", kind)?;
    let day: u32 = component(members, "d", kind)?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| malformed(kind, format!("invalid date {year}-{month}-{day}")))
}

fn decode_time(members: &Map<String, Json>, kind: NodeKind) -> CodecResult<NaiveTime> {
    let hour: u32 = component(members, "h", kind)?;
    let minute: u32 = component(members, "minute", kind)?;
    let second: u32 = component(members, "s", kind)?;
    let nano: u32 = component(members, "ns", kind)?;
    NaiveTime::from_hms_nano_opt(hour, minute, second, nano).ok_or_else(|| {
        malformed(kind, format!("invalid time {hour}:{minute}:{second}.{nano}"))
    })
}

fn decode_datetime(members: &Map<String, Json>) -> CodecResult<NaiveDateTime> {
    let date = decode_date(members, NodeKind::DateTime)?;
    let time = decode_time(members, NodeKind::DateTime)?;
    Ok(NaiveDateTime::new(date, time))
}

fn decode_bytes(members: &Map<String, Json>) -> CodecResult<Vec<u8>> {
    let text = members
        .get(BYTES_FIELD)
        .and_then(Json::as_str)
        .ok_or_else(|| malformed(NodeKind::Bytes, "payload is not a string"))?;
    STANDARD
        .decode(text)
        .map_err(|e| malformed(NodeKind::Bytes, e))
}

fn decode_oid(members: &Map<String, Json>) -> CodecResult<Oid> {
    let namespace = members
        .get("namespace")
        .and_then(Json::as_str)
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| malformed(NodeKind::Oid, "missing or empty \"namespace\""))?;
    let num = members
        .get("num")
        .and_then(Json::as_u64)
        .ok_or_else(|| malformed(NodeKind::Oid, "missing or non-integer \"num\""))?;
    Ok(Oid::new(namespace, num))
}
