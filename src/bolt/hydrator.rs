//! Value hydration.
//!
//! Maps decoded PackStream structures to response messages and domain
//! values. Struct contracts are version-parameterized: the hydrator
//! carries the negotiated major version and the UTC negotiation outcome,
//! fixed once per connection after HELLO. Nodes and relationships gain
//! element-id fields on Bolt 5+; datetime tags flip between the legacy
//! and UTC pairs depending on the `utc` patch.
//!
//! Unknown IANA zone names do not fail the stream; they hydrate to an
//! [`InvalidValue`] placeholder and the caller decides what to do.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use super::error::{BoltError, BoltResult};
use super::handshake::BoltVersion;
use super::message::response::{BoltResponse, FailureMessage, SuccessMessage};
use super::message::tag;
use super::packstream::marker::*;
use super::packstream::{PackStreamStructure, PackStreamValue};
use crate::driver::types::{
    Duration, InvalidValue, Node, Path, Point2D, Point3D, Record, Relationship, Value,
};

/// Days from 0001-01-01 (CE) to the Unix epoch.
const UNIX_EPOCH_DAYS_CE: i64 = 719_163;

/// Version-parameterized hydrator, one per connection.
#[derive(Debug, Clone, Copy)]
pub struct Hydrator {
    bolt_major: u8,
    use_utc: bool,
}

impl Hydrator {
    /// Create a hydrator for the negotiated version. UTC datetimes start
    /// out enabled on Bolt 5+ and may be switched on later for 4.3/4.4
    /// when the server acknowledges the `utc` patch.
    pub fn new(version: BoltVersion) -> Self {
        Self {
            bolt_major: version.major(),
            use_utc: version.utc_by_default(),
        }
    }

    /// Whether UTC datetime tags are in effect.
    pub fn uses_utc(&self) -> bool {
        self.use_utc
    }

    /// Record the server's `patch_bolt` acknowledgement.
    pub fn enable_utc(&mut self) {
        self.use_utc = true;
    }

    /// Hydrate one inbound message.
    pub fn hydrate_message(&self, value: PackStreamValue) -> BoltResult<BoltResponse> {
        let s = value
            .into_structure()
            .ok_or_else(|| BoltError::Protocol("Expected message structure".to_string()))?;

        match s.tag {
            tag::SUCCESS => {
                expect_fields(&s, 1)?;
                let metadata = take_map(s, 0)?;
                Ok(BoltResponse::Success(SuccessMessage::parse(metadata)))
            }
            tag::RECORD => {
                expect_fields(&s, 1)?;
                let mut fields = s.fields;
                let items = match fields.remove(0) {
                    PackStreamValue::List(items) => items,
                    other => {
                        return Err(BoltError::Protocol(format!(
                            "RECORD values must be a list, got {}",
                            other.type_name()
                        )))
                    }
                };
                let values = items
                    .into_iter()
                    .map(|item| self.hydrate_value(item))
                    .collect::<BoltResult<Vec<_>>>()?;
                Ok(BoltResponse::Record(Record::new(values)))
            }
            tag::FAILURE => {
                expect_fields(&s, 1)?;
                let metadata = take_map(s, 0)?;
                Ok(BoltResponse::Failure(FailureMessage::parse(&metadata)))
            }
            tag::IGNORED => {
                expect_fields(&s, 0)?;
                Ok(BoltResponse::Ignored)
            }
            other => Err(unknown_tag(other)),
        }
    }

    /// Hydrate one value, resolving structures to domain entities.
    pub fn hydrate_value(&self, value: PackStreamValue) -> BoltResult<Value> {
        match value {
            PackStreamValue::Null => Ok(Value::Null),
            PackStreamValue::Boolean(b) => Ok(Value::Boolean(b)),
            PackStreamValue::Integer(i) => Ok(Value::Integer(i)),
            PackStreamValue::Float(f) => Ok(Value::Float(f)),
            PackStreamValue::String(s) => Ok(Value::String(s)),
            PackStreamValue::Bytes(b) => Ok(Value::Bytes(b)),
            PackStreamValue::List(items) => Ok(Value::List(
                items
                    .into_iter()
                    .map(|item| self.hydrate_value(item))
                    .collect::<BoltResult<Vec<_>>>()?,
            )),
            PackStreamValue::Map(map) => {
                let mut out = HashMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, self.hydrate_value(v)?);
                }
                Ok(Value::Map(out))
            }
            PackStreamValue::Structure(s) => self.hydrate_structure(s),
        }
    }

    fn hydrate_structure(&self, s: PackStreamStructure) -> BoltResult<Value> {
        match s.tag {
            TAG_NODE => Ok(Value::Node(self.hydrate_node(s)?)),
            TAG_RELATIONSHIP => Ok(Value::Relationship(self.hydrate_relationship(s)?)),
            TAG_PATH => Ok(Value::Path(self.hydrate_path(s)?)),
            TAG_POINT_2D => self.hydrate_point_2d(s),
            TAG_POINT_3D => self.hydrate_point_3d(s),
            TAG_DATE => self.hydrate_date(s),
            TAG_LOCAL_TIME => self.hydrate_local_time(s),
            TAG_TIME => self.hydrate_time(s),
            TAG_LOCAL_DATE_TIME => self.hydrate_local_date_time(s),
            TAG_DURATION => self.hydrate_duration(s),
            TAG_DATE_TIME_LEGACY if !self.use_utc => self.hydrate_date_time_offset(s, true),
            TAG_DATE_TIME_UTC if self.use_utc => self.hydrate_date_time_offset(s, false),
            TAG_DATE_TIME_ZONE_LEGACY if !self.use_utc => self.hydrate_date_time_zone(s, true),
            TAG_DATE_TIME_ZONE_UTC if self.use_utc => self.hydrate_date_time_zone(s, false),
            other => Err(unknown_tag(other)),
        }
    }

    fn hydrate_node(&self, s: PackStreamStructure) -> BoltResult<Node> {
        let expected = if self.bolt_major >= 5 { 4 } else { 3 };
        expect_fields(&s, expected)?;

        let id = int_field(&s, 0, "node id")?;
        let element_id = if self.bolt_major >= 5 {
            str_field(&s, 3, "node element id")?.to_string()
        } else {
            id.to_string()
        };

        let mut labels = Vec::new();
        for label in list_field(&s, 1, "node labels")? {
            let label = label
                .as_str()
                .ok_or_else(|| BoltError::Protocol("Node label must be a string".to_string()))?;
            // Labels are a set; drop duplicates while keeping order.
            if !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }

        Ok(Node {
            id,
            element_id,
            labels,
            properties: self.hydrate_properties(&s, 2)?,
        })
    }

    fn hydrate_relationship(&self, s: PackStreamStructure) -> BoltResult<Relationship> {
        let expected = if self.bolt_major >= 5 { 8 } else { 5 };
        expect_fields(&s, expected)?;

        let id = int_field(&s, 0, "relationship id")?;
        let start_id = int_field(&s, 1, "relationship start id")?;
        let end_id = int_field(&s, 2, "relationship end id")?;
        let rel_type = str_field(&s, 3, "relationship type")?.to_string();
        let properties = self.hydrate_properties(&s, 4)?;

        let (element_id, start_element_id, end_element_id) = if self.bolt_major >= 5 {
            (
                str_field(&s, 5, "relationship element id")?.to_string(),
                str_field(&s, 6, "relationship start element id")?.to_string(),
                str_field(&s, 7, "relationship end element id")?.to_string(),
            )
        } else {
            (id.to_string(), start_id.to_string(), end_id.to_string())
        };

        Ok(Relationship {
            id,
            element_id,
            start_id,
            start_element_id,
            end_id,
            end_element_id,
            rel_type,
            properties,
        })
    }

    /// Unbound relationship carrier used inside paths: id, type, props,
    /// plus an element id on Bolt 5+.
    fn hydrate_unbound(&self, s: PackStreamStructure) -> BoltResult<(i64, String, String, HashMap<String, Value>)> {
        if s.tag != TAG_UNBOUND_RELATIONSHIP {
            return Err(BoltError::Protocol(format!(
                "Expected unbound relationship in path, got struct tag {}",
                s.tag
            )));
        }
        let expected = if self.bolt_major >= 5 { 4 } else { 3 };
        expect_fields(&s, expected)?;

        let id = int_field(&s, 0, "relationship id")?;
        let rel_type = str_field(&s, 1, "relationship type")?.to_string();
        let properties = self.hydrate_properties(&s, 2)?;
        let element_id = if self.bolt_major >= 5 {
            str_field(&s, 3, "relationship element id")?.to_string()
        } else {
            id.to_string()
        };
        Ok((id, element_id, rel_type, properties))
    }

    fn hydrate_path(&self, s: PackStreamStructure) -> BoltResult<Path> {
        expect_fields(&s, 3)?;

        let mut nodes = Vec::new();
        for node in list_field(&s, 0, "path nodes")? {
            let node = node
                .as_structure()
                .filter(|n| n.tag == TAG_NODE)
                .ok_or_else(|| BoltError::Protocol("Path nodes must be Node structs".to_string()))?;
            nodes.push(self.hydrate_node(node.clone())?);
        }

        let mut rels = Vec::new();
        for rel in list_field(&s, 1, "path relationships")? {
            let rel = rel
                .as_structure()
                .ok_or_else(|| {
                    BoltError::Protocol("Path relationships must be structs".to_string())
                })?;
            rels.push(self.hydrate_unbound(rel.clone())?);
        }

        let indexes: Vec<i64> = list_field(&s, 2, "path indexes")?
            .iter()
            .map(|idx| {
                idx.as_int()
                    .ok_or_else(|| BoltError::Protocol("Path index must be an integer".to_string()))
            })
            .collect::<BoltResult<_>>()?;

        if indexes.len() % 2 != 0 {
            return Err(BoltError::Protocol(
                "Path indexes must come in pairs".to_string(),
            ));
        }

        build_path(nodes, rels, &indexes)
    }

    fn hydrate_properties(
        &self,
        s: &PackStreamStructure,
        index: usize,
    ) -> BoltResult<HashMap<String, Value>> {
        let map = s.fields[index].as_map().ok_or_else(|| {
            BoltError::Protocol("Properties must be a map".to_string())
        })?;
        let mut out = HashMap::with_capacity(map.len());
        for (k, v) in map {
            out.insert(k.clone(), self.hydrate_value(v.clone())?);
        }
        Ok(out)
    }

    fn hydrate_point_2d(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 3)?;
        Ok(Value::Point2D(Point2D {
            srid: int_field(&s, 0, "point srid")?,
            x: float_field(&s, 1, "point x")?,
            y: float_field(&s, 2, "point y")?,
        }))
    }

    fn hydrate_point_3d(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 4)?;
        Ok(Value::Point3D(Point3D {
            srid: int_field(&s, 0, "point srid")?,
            x: float_field(&s, 1, "point x")?,
            y: float_field(&s, 2, "point y")?,
            z: float_field(&s, 3, "point z")?,
        }))
    }

    fn hydrate_date(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 1)?;
        let days = int_field(&s, 0, "date days")?;
        let date = days
            .checked_add(UNIX_EPOCH_DAYS_CE)
            .and_then(|d| i32::try_from(d).ok())
            .and_then(NaiveDate::from_num_days_from_ce_opt);
        Ok(match date {
            Some(date) => Value::Date(date),
            None => invalid("date", format!("days out of range: {}", days)),
        })
    }

    fn hydrate_local_time(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 1)?;
        let nanos = int_field(&s, 0, "time nanoseconds")?;
        Ok(match time_of_day(nanos) {
            Some(time) => Value::LocalTime(time),
            None => invalid("localTime", format!("nanoseconds out of range: {}", nanos)),
        })
    }

    fn hydrate_time(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 2)?;
        let nanos = int_field(&s, 0, "time nanoseconds")?;
        let offset = int_field(&s, 1, "time offset")?;
        let Some(time) = time_of_day(nanos) else {
            return Ok(invalid("time", format!("nanoseconds out of range: {}", nanos)));
        };
        let Some(offset_seconds) = i32::try_from(offset).ok().filter(|o| o.abs() < 86_400) else {
            return Ok(invalid("time", format!("offset out of range: {}", offset)));
        };
        Ok(Value::Time {
            time,
            offset_seconds,
        })
    }

    fn hydrate_local_date_time(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 2)?;
        let seconds = int_field(&s, 0, "datetime seconds")?;
        let nanos = int_field(&s, 1, "datetime nanoseconds")?;
        Ok(match wall_clock(seconds, nanos) {
            Some(dt) => Value::LocalDateTime(dt),
            None => invalid(
                "localDateTime",
                format!("out of range: {}s {}ns", seconds, nanos),
            ),
        })
    }

    fn hydrate_duration(&self, s: PackStreamStructure) -> BoltResult<Value> {
        expect_fields(&s, 4)?;
        Ok(Value::Duration(Duration {
            months: int_field(&s, 0, "duration months")?,
            days: int_field(&s, 1, "duration days")?,
            seconds: int_field(&s, 2, "duration seconds")?,
            nanoseconds: int_field(&s, 3, "duration nanoseconds")?,
        }))
    }

    /// Datetime with a fixed offset. The legacy encoding (`F`) carries
    /// wall-clock seconds in the given offset; the UTC encoding (`I`)
    /// carries true epoch seconds. Both normalize to an instant with
    /// the offset attached.
    fn hydrate_date_time_offset(&self, s: PackStreamStructure, legacy: bool) -> BoltResult<Value> {
        let message = if legacy { "dateTime" } else { "utcDateTime" };
        expect_fields(&s, 3)?;
        let seconds = int_field(&s, 0, "datetime seconds")?;
        let nanos = int_field(&s, 1, "datetime nanoseconds")?;
        let offset = int_field(&s, 2, "datetime offset")?;

        let Some(offset_seconds) = i32::try_from(offset).ok().filter(|o| o.abs() < 86_400) else {
            return Ok(invalid(message, format!("offset out of range: {}", offset)));
        };
        let utc_seconds = if legacy {
            seconds - offset_seconds as i64
        } else {
            seconds
        };
        let Some(fixed) = FixedOffset::east_opt(offset_seconds) else {
            return Ok(invalid(message, format!("offset out of range: {}", offset)));
        };
        Ok(match instant(utc_seconds, nanos) {
            Some(dt) => Value::DateTime(dt.with_timezone(&fixed)),
            None => invalid(message, format!("out of range: {}s {}ns", seconds, nanos)),
        })
    }

    /// Datetime with a named zone. Unknown zone names yield an
    /// InvalidValue, never an error.
    fn hydrate_date_time_zone(&self, s: PackStreamStructure, legacy: bool) -> BoltResult<Value> {
        let message = if legacy {
            "dateTimeNamedZone"
        } else {
            "utcDateTimeNamedZone"
        };
        expect_fields(&s, 3)?;
        let seconds = int_field(&s, 0, "datetime seconds")?;
        let nanos = int_field(&s, 1, "datetime nanoseconds")?;
        let zone_name = str_field(&s, 2, "datetime zone")?;

        let Ok(zone) = zone_name.parse::<Tz>() else {
            return Ok(invalid(message, format!("unknown time zone {}", zone_name)));
        };

        let resolved = if legacy {
            // Legacy zoned datetimes are wall-clock in the named zone.
            match wall_clock(seconds, nanos) {
                Some(naive) => zone.from_local_datetime(&naive).earliest(),
                None => None,
            }
        } else {
            instant(seconds, nanos).map(|dt| dt.with_timezone(&zone))
        };

        Ok(match resolved {
            Some(dt) => Value::DateTime(dt.fixed_offset()),
            None => invalid(message, format!("out of range: {}s {}ns", seconds, nanos)),
        })
    }
}

/// Reconstruct a path from wire parts.
///
/// The index list is consumed in `(rel, node)` pairs: the relationship
/// index is 1-based and signed (negative flips traversal direction), the
/// node index addresses the node list directly. Endpoint ids on each
/// reconstructed relationship come from the traversed nodes, not the
/// unbound carrier.
fn build_path(
    nodes: Vec<Node>,
    rels: Vec<(i64, String, String, HashMap<String, Value>)>,
    indexes: &[i64],
) -> BoltResult<Path> {
    if nodes.is_empty() {
        return Err(BoltError::Protocol("Path must contain a start node".to_string()));
    }

    let mut relationships = Vec::with_capacity(indexes.len() / 2);
    let mut current = 0usize;

    for pair in indexes.chunks_exact(2) {
        let rel_index = pair[0];
        let node_index = usize::try_from(pair[1])
            .ok()
            .filter(|i| *i < nodes.len())
            .ok_or_else(|| BoltError::Protocol(format!("Path node index out of range: {}", pair[1])))?;

        let table_index = usize::try_from(rel_index.unsigned_abs())
            .ok()
            .and_then(|i| i.checked_sub(1))
            .filter(|i| *i < rels.len())
            .ok_or_else(|| {
                BoltError::Protocol(format!("Path relationship index out of range: {}", rel_index))
            })?;
        let (id, element_id, rel_type, properties) = rels[table_index].clone();

        let (start, end) = if rel_index < 0 {
            (&nodes[node_index], &nodes[current])
        } else {
            (&nodes[current], &nodes[node_index])
        };

        relationships.push(Relationship {
            id,
            element_id,
            start_id: start.id,
            start_element_id: start.element_id.clone(),
            end_id: end.id,
            end_element_id: end.element_id.clone(),
            rel_type,
            properties,
        });
        current = node_index;
    }

    Ok(Path {
        nodes,
        relationships,
    })
}

fn expect_fields(s: &PackStreamStructure, expected: usize) -> BoltResult<()> {
    if s.fields.len() != expected {
        return Err(BoltError::Protocol(format!(
            "Invalid length of struct, expected {} but was {}",
            expected,
            s.fields.len()
        )));
    }
    Ok(())
}

fn unknown_tag(tag: u8) -> BoltError {
    BoltError::Protocol(format!("Received unknown struct tag: {}", tag))
}

fn invalid(message: &str, cause: String) -> Value {
    Value::Invalid(InvalidValue {
        message: message.to_string(),
        cause,
    })
}

fn int_field(s: &PackStreamStructure, index: usize, what: &str) -> BoltResult<i64> {
    s.fields[index]
        .as_int()
        .ok_or_else(|| BoltError::Protocol(format!("Expected integer for {}", what)))
}

fn float_field(s: &PackStreamStructure, index: usize, what: &str) -> BoltResult<f64> {
    s.fields[index]
        .as_float()
        .ok_or_else(|| BoltError::Protocol(format!("Expected float for {}", what)))
}

fn str_field<'a>(s: &'a PackStreamStructure, index: usize, what: &str) -> BoltResult<&'a str> {
    s.fields[index]
        .as_str()
        .ok_or_else(|| BoltError::Protocol(format!("Expected string for {}", what)))
}

fn list_field<'a>(
    s: &'a PackStreamStructure,
    index: usize,
    what: &str,
) -> BoltResult<&'a [PackStreamValue]> {
    s.fields[index]
        .as_list()
        .ok_or_else(|| BoltError::Protocol(format!("Expected list for {}", what)))
}

fn take_map(
    s: PackStreamStructure,
    index: usize,
) -> BoltResult<HashMap<String, PackStreamValue>> {
    let mut fields = s.fields;
    match fields.remove(index) {
        PackStreamValue::Map(map) => Ok(map),
        other => Err(BoltError::Protocol(format!(
            "Expected map, got {}",
            other.type_name()
        ))),
    }
}

fn time_of_day(nanos: i64) -> Option<NaiveTime> {
    if !(0..86_400_000_000_000).contains(&nanos) {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(
        (nanos / 1_000_000_000) as u32,
        (nanos % 1_000_000_000) as u32,
    )
}

fn instant(seconds: i64, nanos: i64) -> Option<DateTime<chrono::Utc>> {
    let nanos = u32::try_from(nanos).ok().filter(|n| *n < 1_000_000_000)?;
    DateTime::from_timestamp(seconds, nanos)
}

fn wall_clock(seconds: i64, nanos: i64) -> Option<NaiveDateTime> {
    instant(seconds, nanos).map(|dt| dt.naive_utc())
}
