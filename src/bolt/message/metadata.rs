//! SUCCESS metadata sub-structures.
//!
//! Plans, profiles, notifications and routing tables arrive as plain
//! maps inside SUCCESS metadata. Parsing is lenient: missing keys fall
//! back to defaults and unknown keys are ignored.

use std::collections::HashMap;

use crate::bolt::packstream::PackStreamValue;

/// Query plan returned for EXPLAIN.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Operator name
    pub operator: String,
    /// Operator arguments
    pub arguments: HashMap<String, PackStreamValue>,
    /// Identifiers in scope
    pub identifiers: Vec<String>,
    /// Child operators
    pub children: Vec<Plan>,
}

impl Plan {
    /// Parse a plan map. Returns `None` when `operatorType` is absent.
    pub fn from_map(map: &HashMap<String, PackStreamValue>) -> Option<Self> {
        let operator = map.get("operatorType")?.as_str()?.to_string();
        Some(Self {
            operator,
            arguments: map.get("args").and_then(|v| v.as_map()).cloned().unwrap_or_default(),
            identifiers: string_list(map.get("identifiers")),
            children: child_maps(map.get("children"), Plan::from_map),
        })
    }
}

/// Executed query plan returned for PROFILE.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfiledPlan {
    /// Operator name
    pub operator: String,
    /// Operator arguments
    pub arguments: HashMap<String, PackStreamValue>,
    /// Identifiers in scope
    pub identifiers: Vec<String>,
    /// Database hits attributed to this operator
    pub db_hits: i64,
    /// Records produced by this operator
    pub records: i64,
    /// Child operators
    pub children: Vec<ProfiledPlan>,
}

impl ProfiledPlan {
    /// Parse a profile map. Returns `None` when `operatorType` is absent.
    pub fn from_map(map: &HashMap<String, PackStreamValue>) -> Option<Self> {
        let operator = map.get("operatorType")?.as_str()?.to_string();
        Some(Self {
            operator,
            arguments: map.get("args").and_then(|v| v.as_map()).cloned().unwrap_or_default(),
            identifiers: string_list(map.get("identifiers")),
            db_hits: map.get("dbHits").and_then(|v| v.as_int()).unwrap_or(0),
            records: map.get("rows").and_then(|v| v.as_int()).unwrap_or(0),
            children: child_maps(map.get("children"), ProfiledPlan::from_map),
        })
    }
}

/// Server notification attached to a result summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Notification code
    pub code: String,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Severity string as sent by the server
    pub severity: String,
    /// Position in the query text, when the server pinpoints one
    pub position: Option<Position>,
}

/// Position of a notification within the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Character offset from the start of the query
    pub offset: i64,
    /// 1-based line number
    pub line: i64,
    /// 1-based column number
    pub column: i64,
}

impl Notification {
    /// Parse a notification map. Returns `None` when `code` is absent.
    pub fn from_map(map: &HashMap<String, PackStreamValue>) -> Option<Self> {
        let code = map.get("code")?.as_str()?.to_string();
        let position = map.get("position").and_then(|v| v.as_map()).and_then(|pos| {
            Some(Position {
                offset: pos.get("offset").and_then(|v| v.as_int())?,
                line: pos.get("line").and_then(|v| v.as_int())?,
                column: pos.get("column").and_then(|v| v.as_int())?,
            })
        });
        Some(Self {
            code,
            title: opt_string(map.get("title")),
            description: opt_string(map.get("description")),
            severity: opt_string(map.get("severity")),
            position,
        })
    }
}

/// Routing table returned for ROUTE.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutingTable {
    /// Seconds the table may be cached
    pub time_to_live: i64,
    /// Database the table applies to (Bolt 4.4+; empty before that)
    pub database_name: Option<String>,
    /// Addresses answering ROUTE
    pub routers: Vec<String>,
    /// Addresses accepting reads
    pub readers: Vec<String>,
    /// Addresses accepting writes
    pub writers: Vec<String>,
}

impl RoutingTable {
    /// Parse the `rt` map of a ROUTE SUCCESS. Unknown roles and extra
    /// keys inside server entries are skipped.
    pub fn from_map(map: &HashMap<String, PackStreamValue>) -> Self {
        let mut table = RoutingTable {
            time_to_live: map.get("ttl").and_then(|v| v.as_int()).unwrap_or(0),
            database_name: map.get("db").and_then(|v| v.as_str()).map(str::to_string),
            ..Default::default()
        };

        let servers = match map.get("servers").and_then(|v| v.as_list()) {
            Some(list) => list,
            None => return table,
        };
        for server in servers {
            let Some(entry) = server.as_map() else {
                continue;
            };
            let addresses = string_list(entry.get("addresses"));
            match entry.get("role").and_then(|v| v.as_str()) {
                Some("ROUTE") => table.routers.extend(addresses),
                Some("READ") => table.readers.extend(addresses),
                Some("WRITE") => table.writers.extend(addresses),
                _ => {}
            }
        }
        table
    }
}

fn opt_string(value: Option<&PackStreamValue>) -> String {
    value.and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn string_list(value: Option<&PackStreamValue>) -> Vec<String> {
    value
        .and_then(|v| v.as_list())
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn child_maps<T>(
    value: Option<&PackStreamValue>,
    parse: fn(&HashMap<String, PackStreamValue>) -> Option<T>,
) -> Vec<T> {
    value
        .and_then(|v| v.as_list())
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_map().and_then(parse))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_map(pairs: Vec<(&str, PackStreamValue)>) -> HashMap<String, PackStreamValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn plan_with_children() {
        let child = value_map(vec![
            ("operatorType", "cop".into()),
            (
                "identifiers",
                PackStreamValue::List(vec!["cid".into()]),
            ),
        ]);
        let map = value_map(vec![
            ("operatorType", "opType".into()),
            (
                "identifiers",
                PackStreamValue::List(vec!["id1".into(), "id2".into()]),
            ),
            (
                "args",
                PackStreamValue::Map(value_map(vec![("arg1", PackStreamValue::Integer(1001))])),
            ),
            (
                "children",
                PackStreamValue::List(vec![PackStreamValue::Map(child)]),
            ),
        ]);

        let plan = Plan::from_map(&map).unwrap();
        assert_eq!(plan.operator, "opType");
        assert_eq!(plan.identifiers, vec!["id1", "id2"]);
        assert_eq!(plan.arguments.get("arg1").unwrap().as_int(), Some(1001));
        assert_eq!(plan.children.len(), 1);
        assert_eq!(plan.children[0].operator, "cop");
        assert!(plan.children[0].children.is_empty());
    }

    #[test]
    fn plan_requires_operator() {
        assert!(Plan::from_map(&HashMap::new()).is_none());
    }

    #[test]
    fn profile_counts() {
        let child = value_map(vec![
            ("operatorType", "cop".into()),
            ("dbHits", PackStreamValue::Integer(1)),
            ("rows", PackStreamValue::Integer(2)),
        ]);
        let map = value_map(vec![
            ("operatorType", "opType".into()),
            ("dbHits", PackStreamValue::Integer(7)),
            ("rows", PackStreamValue::Integer(4)),
            (
                "children",
                PackStreamValue::List(vec![PackStreamValue::Map(child)]),
            ),
        ]);

        let profile = ProfiledPlan::from_map(&map).unwrap();
        assert_eq!(profile.db_hits, 7);
        assert_eq!(profile.records, 4);
        assert_eq!(profile.children[0].db_hits, 1);
        assert_eq!(profile.children[0].records, 2);
    }

    #[test]
    fn notification_with_position() {
        let map = value_map(vec![
            ("code", "c1".into()),
            ("title", "t1".into()),
            ("description", "d1".into()),
            ("severity", "s1".into()),
            (
                "position",
                PackStreamValue::Map(value_map(vec![
                    ("offset", PackStreamValue::Integer(1)),
                    ("line", PackStreamValue::Integer(2)),
                    ("column", PackStreamValue::Integer(3)),
                ])),
            ),
        ]);

        let n = Notification::from_map(&map).unwrap();
        assert_eq!(n.code, "c1");
        assert_eq!(
            n.position,
            Some(Position {
                offset: 1,
                line: 2,
                column: 3
            })
        );
    }

    #[test]
    fn notification_without_position() {
        let map = value_map(vec![("code", "c2".into()), ("severity", "s2".into())]);
        let n = Notification::from_map(&map).unwrap();
        assert_eq!(n.severity, "s2");
        assert!(n.position.is_none());
        assert!(n.title.is_empty());
    }

    #[test]
    fn routing_table_roles() {
        let route = value_map(vec![
            ("role", "ROUTE".into()),
            (
                "addresses",
                PackStreamValue::List(vec!["router1".into(), "router2".into()]),
            ),
        ]);
        let read = value_map(vec![
            ("role", "READ".into()),
            (
                "addresses",
                PackStreamValue::List(vec!["reader1".into(), "reader2".into(), "reader3".into()]),
            ),
        ]);
        let write = value_map(vec![
            ("role", "WRITE".into()),
            ("addresses", PackStreamValue::List(vec!["writer1".into()])),
        ]);
        let map = value_map(vec![
            ("ttl", PackStreamValue::Integer(1001)),
            ("db", "dbname".into()),
            (
                "servers",
                PackStreamValue::List(vec![
                    PackStreamValue::Map(route),
                    PackStreamValue::Map(read),
                    PackStreamValue::Map(write),
                ]),
            ),
        ]);

        let table = RoutingTable::from_map(&map);
        assert_eq!(table.time_to_live, 1001);
        assert_eq!(table.database_name.as_deref(), Some("dbname"));
        assert_eq!(table.routers, vec!["router1", "router2"]);
        assert_eq!(table.readers, vec!["reader1", "reader2", "reader3"]);
        assert_eq!(table.writers, vec!["writer1"]);
    }

    #[test]
    fn routing_table_without_database() {
        // Pre-4.4 servers omit the db key.
        let map = value_map(vec![("ttl", PackStreamValue::Integer(300))]);
        let table = RoutingTable::from_map(&map);
        assert_eq!(table.time_to_live, 300);
        assert!(table.database_name.is_none());
        assert!(table.routers.is_empty());
    }

    #[test]
    fn routing_table_skips_unknown_roles_and_extras() {
        let entry = value_map(vec![
            ("role", "OBSERVER".into()),
            ("addresses", PackStreamValue::List(vec!["x".into()])),
            ("extra2", PackStreamValue::List(vec!["extraval2".into()])),
        ]);
        let map = value_map(vec![
            ("ttl", PackStreamValue::Integer(1)),
            ("servers", PackStreamValue::List(vec![PackStreamValue::Map(entry)])),
        ]);

        let table = RoutingTable::from_map(&map);
        assert!(table.routers.is_empty());
        assert!(table.readers.is_empty());
        assert!(table.writers.is_empty());
    }
}
