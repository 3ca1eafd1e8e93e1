//! Driver Types
//!
//! 드라이버에서 사용하는 그래프 값 타입 정의

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::error::{DriverError, DriverResult};

// ============================================================================
// Value - 그래프 값
// ============================================================================

/// 그래프 값 타입
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
    /// List
    List(Vec<Value>),
    /// Map
    Map(HashMap<String, Value>),
    /// Node
    Node(Node),
    /// Relationship
    Relationship(Relationship),
    /// Path
    Path(Path),
    /// 2D Point
    Point2D(Point2D),
    /// 3D Point
    Point3D(Point3D),
    /// Date (연/월/일)
    Date(NaiveDate),
    /// LocalTime (시각, 타임존 없음)
    LocalTime(NaiveTime),
    /// Time (시각 + UTC 오프셋 초)
    Time { time: NaiveTime, offset_seconds: i32 },
    /// LocalDateTime (벽시계 일시)
    LocalDateTime(NaiveDateTime),
    /// DateTime (고정 오프셋 일시)
    DateTime(DateTime<FixedOffset>),
    /// Duration
    Duration(Duration),
    /// 해석할 수 없는 값 (알 수 없는 타임존 등)
    Invalid(InvalidValue),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean으로 변환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer로 변환
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float로 변환
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String으로 변환
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// List로 변환
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map으로 변환
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Node로 변환
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Relationship으로 변환
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Path로 변환
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
            Value::Point2D(_) => "Point2D",
            Value::Point3D(_) => "Point3D",
            Value::Date(_) => "Date",
            Value::LocalTime(_) => "LocalTime",
            Value::Time { .. } => "Time",
            Value::LocalDateTime(_) => "LocalDateTime",
            Value::DateTime(_) => "DateTime",
            Value::Duration(_) => "Duration",
            Value::Invalid(_) => "Invalid",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Value::Node(n) => write!(f, "{}", n),
            Value::Relationship(r) => write!(f, "{}", r),
            Value::Path(p) => write!(f, "{}", p),
            Value::Point2D(p) => write!(f, "{}", p),
            Value::Point3D(p) => write!(f, "{}", p),
            Value::Date(d) => write!(f, "{}", d),
            Value::LocalTime(t) => write!(f, "{}", t),
            Value::Time {
                time,
                offset_seconds,
            } => write!(f, "{}{:+}s", time, offset_seconds),
            Value::LocalDateTime(dt) => write!(f, "{}", dt),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Invalid(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        value
            .as_int()
            .ok_or_else(|| DriverError::type_conversion(format!("{} is not an Integer", value.type_name())))
    }
}

impl TryFrom<Value> for f64 {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        value
            .as_float()
            .ok_or_else(|| DriverError::type_conversion(format!("{} is not a Float", value.type_name())))
    }
}

impl TryFrom<Value> for bool {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        value
            .as_bool()
            .ok_or_else(|| DriverError::type_conversion(format!("{} is not a Boolean", value.type_name())))
    }
}

impl TryFrom<Value> for String {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(DriverError::type_conversion(format!(
                "{} is not a String",
                other.type_name()
            ))),
        }
    }
}

// ============================================================================
// Node - 그래프 노드
// ============================================================================

/// 그래프 노드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 노드 ID
    pub id: i64,
    /// 엘리먼트 ID (Bolt 5+; 이전 버전은 숫자 ID의 문자열 표현)
    pub element_id: String,
    /// 레이블 (중복 없음)
    pub labels: Vec<String>,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// 새 노드 생성
    pub fn new(id: i64, labels: Vec<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            element_id: id.to_string(),
            labels,
            properties,
        }
    }

    /// 레이블 포함 여부
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// 속성 가져오기 (타입 변환)
    pub fn get_as<T: TryFrom<Value, Error = DriverError>>(&self, key: &str) -> DriverResult<T> {
        self.properties
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("Property '{}' not found", key)))
            .and_then(T::try_from)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.id, labels)
    }
}

// ============================================================================
// Relationship - 그래프 관계
// ============================================================================

/// 그래프 관계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// 관계 ID
    pub id: i64,
    /// 엘리먼트 ID
    pub element_id: String,
    /// 시작 노드 ID
    pub start_id: i64,
    /// 시작 노드 엘리먼트 ID
    pub start_element_id: String,
    /// 종료 노드 ID
    pub end_id: i64,
    /// 종료 노드 엘리먼트 ID
    pub end_element_id: String,
    /// 관계 타입
    pub rel_type: String,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    /// 새 관계 생성
    pub fn new(
        id: i64,
        start_id: i64,
        end_id: i64,
        rel_type: impl Into<String>,
        properties: HashMap<String, Value>,
    ) -> Self {
        Self {
            id,
            element_id: id.to_string(),
            start_id,
            start_element_id: start_id.to_string(),
            end_id,
            end_element_id: end_id.to_string(),
            rel_type: rel_type.into(),
            properties,
        }
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[{}:{}]->({})",
            self.start_id, self.id, self.rel_type, self.end_id
        )
    }
}

// ============================================================================
// Path - 그래프 경로
// ============================================================================

/// 그래프 경로
///
/// k개의 홉을 가진 경로는 노드 k+1개와 관계 k개를 가지며,
/// `relationships[i]`는 `nodes[i]`와 `nodes[i+1]`을 잇는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// 경로의 노드들
    pub nodes: Vec<Node>,
    /// 경로의 관계들
    pub relationships: Vec<Relationship>,
}

impl Path {
    /// 홉 수
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// 빈 경로 여부 (노드 하나만 있는 경로)
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path[{} nodes, {} rels]", self.nodes.len(), self.relationships.len())
    }
}

// ============================================================================
// Point - 공간 좌표
// ============================================================================

/// 2차원 공간 좌표
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// 공간 참조 체계 ID
    pub srid: i64,
    /// X 좌표
    pub x: f64,
    /// Y 좌표
    pub y: f64,
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point(srid={}, {}, {})", self.srid, self.x, self.y)
    }
}

/// 3차원 공간 좌표
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    /// 공간 참조 체계 ID
    pub srid: i64,
    /// X 좌표
    pub x: f64,
    /// Y 좌표
    pub y: f64,
    /// Z 좌표
    pub z: f64,
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "point(srid={}, {}, {}, {})",
            self.srid, self.x, self.y, self.z
        )
    }
}

// ============================================================================
// Duration - 기간
// ============================================================================

/// 기간
///
/// 네 구성 요소는 서로 독립이며 정규화하지 않는다. 한 달의 길이는
/// 문맥에 따라 다르므로 합산할 수 없다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    /// 개월
    pub months: i64,
    /// 일
    pub days: i64,
    /// 초
    pub seconds: i64,
    /// 나노초
    pub nanoseconds: i64,
}

impl Duration {
    /// 새 기간 생성
    pub fn new(months: i64, days: i64, seconds: i64, nanoseconds: i64) -> Self {
        Self {
            months,
            days,
            seconds,
            nanoseconds,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{}M{}DT{}.{:09}S",
            self.months, self.days, self.seconds, self.nanoseconds
        )
    }
}

// ============================================================================
// InvalidValue - 해석 불가 값
// ============================================================================

/// 해석할 수 없는 값의 자리 표시자
///
/// 알 수 없는 IANA 타임존처럼 메타데이터를 해석할 수 없을 때
/// 프로토콜 에러 대신 반환된다. 처리 방법은 호출자가 결정한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidValue {
    /// 어떤 값이었는지에 대한 진단 메시지
    pub message: String,
    /// 원인
    pub cause: String,
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value ({}): {}", self.message, self.cause)
    }
}

// ============================================================================
// Record - 결과 레코드
// ============================================================================

/// 쿼리 결과 한 행
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 컬럼 값들
    pub values: Vec<Value>,
}

impl Record {
    /// 새 레코드 생성
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// 컬럼 수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 빈 레코드 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 인덱스로 값 가져오기
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_int(), Some(42));
        assert_eq!(Value::Integer(42).as_float(), Some(42.0));
        assert_eq!(Value::Float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
    }

    #[test]
    fn value_try_from() {
        assert_eq!(i64::try_from(Value::Integer(3)).unwrap(), 3);
        assert_eq!(String::try_from(Value::String("a".into())).unwrap(), "a");
        assert!(i64::try_from(Value::Null).is_err());
        assert!(bool::try_from(Value::Integer(1)).is_err());
    }

    #[test]
    fn node_basics() {
        let mut props = HashMap::new();
        props.insert("age".to_string(), Value::Integer(30));
        let node = Node::new(7, vec!["Person".into()], props);

        assert_eq!(node.element_id, "7");
        assert!(node.has_label("Person"));
        assert!(!node.has_label("Robot"));
        assert_eq!(node.get("age").unwrap().as_int(), Some(30));
        assert_eq!(node.get_as::<i64>("age").unwrap(), 30);
        assert!(node.get_as::<i64>("missing").is_err());
        assert_eq!(node.to_string(), "(7:Person)");
    }

    #[test]
    fn relationship_basics() {
        let rel = Relationship::new(1, 10, 20, "KNOWS", HashMap::new());
        assert_eq!(rel.element_id, "1");
        assert_eq!(rel.start_element_id, "10");
        assert_eq!(rel.end_element_id, "20");
        assert_eq!(rel.to_string(), "(10)-[1:KNOWS]->(20)");
    }

    #[test]
    fn path_invariant_shape() {
        let n1 = Node::new(1, vec![], HashMap::new());
        let n2 = Node::new(2, vec![], HashMap::new());
        let rel = Relationship::new(3, 1, 2, "x", HashMap::new());
        let path = Path {
            nodes: vec![n1, n2],
            relationships: vec![rel],
        };
        assert_eq!(path.len(), 1);
        assert_eq!(path.nodes.len(), path.len() + 1);
        assert!(!path.is_empty());
    }

    #[test]
    fn duration_display_is_not_normalized() {
        let d = Duration::new(12, 31, 59, 10_001);
        assert_eq!(d.to_string(), "P12M31DT59.000010001S");
    }

    #[test]
    fn record_access() {
        let record = Record::new(vec![Value::Integer(1), Value::String("x".into())]);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get(0).unwrap().as_int(), Some(1));
        assert!(record.get(2).is_none());
    }

    #[test]
    fn display_smoke() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(
            Value::Point2D(Point2D {
                srid: 4326,
                x: 1.5,
                y: 2.5
            })
            .to_string(),
            "point(srid=4326, 1.5, 2.5)"
        );
    }
}
