use lazy_static::lazy_static;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Allow is the policy of a single field of an allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allow {
    /// Keep the field if it's a string, number, or boolean.
    SimpleType,
    /// Never keep the field, for the given reason.
    Never(&'static str),
}

/// AllowNode is a node of an allowlist tree, which mirrors the structure of
/// the documents it's applied to. Fields of a document having no
/// corresponding node are removed.
#[derive(Debug, Clone, PartialEq)]
pub enum AllowNode {
    Leaf(Allow),
    /// Children of an object, which also apply to each object of an array.
    Tree(BTreeMap<&'static str, AllowNode>),
}

impl AllowNode {
    pub fn tree<const N: usize>(children: [(&'static str, AllowNode); N]) -> Self {
        AllowNode::Tree(children.into_iter().collect())
    }
}

use Allow::SimpleType;
use AllowNode::Leaf;

lazy_static! {
    /// Fields of an event which may be retained once it's stripped.
    pub static ref EVENT_DATA_ALLOWLIST: AllowNode = AllowNode::tree([
        ("type", Leaf(SimpleType)),
        ("datetime", Leaf(SimpleType)),
        ("timestamp", Leaf(SimpleType)),
        ("platform", Leaf(SimpleType)),
        ("sdk", AllowNode::tree([
            ("name", Leaf(SimpleType)),
            ("version", Leaf(SimpleType)),
            ("integrations", Leaf(Allow::Never("users can add their own integrations"))),
        ])),
        ("exception", AllowNode::tree([
            ("values", AllowNode::tree([
                ("stacktrace", AllowNode::tree([
                    ("frames", AllowNode::tree([
                        ("filename", Leaf(Allow::Never(
                            "the filename path could contain the app name",
                        ))),
                        ("function", Leaf(SimpleType)),
                        ("raw_function", Leaf(SimpleType)),
                        ("module", Leaf(SimpleType)),
                        ("abs_path", Leaf(SimpleType)),
                        ("in_app", Leaf(SimpleType)),
                        ("instruction_addr", Leaf(SimpleType)),
                        ("addr_mode", Leaf(SimpleType)),
                        ("symbol", Leaf(SimpleType)),
                        ("symbol_addr", Leaf(SimpleType)),
                        ("image_addr", Leaf(SimpleType)),
                        ("package", Leaf(SimpleType)),
                        ("platform", Leaf(SimpleType)),
                    ])),
                ])),
                ("value", Leaf(Allow::Never("the exception value could contain PII"))),
                ("type", Leaf(SimpleType)),
                ("mechanism", AllowNode::tree([
                    ("handled", Leaf(SimpleType)),
                    ("type", Leaf(SimpleType)),
                    ("meta", AllowNode::tree([
                        ("signal", AllowNode::tree([
                            ("number", Leaf(SimpleType)),
                            ("code", Leaf(SimpleType)),
                            ("name", Leaf(SimpleType)),
                            ("code_name", Leaf(SimpleType)),
                        ])),
                        ("mach_exception", AllowNode::tree([
                            ("exception", Leaf(SimpleType)),
                            ("code", Leaf(SimpleType)),
                            ("subcode", Leaf(SimpleType)),
                            ("name", Leaf(SimpleType)),
                        ])),
                    ])),
                ])),
            ])),
        ])),
        ("contexts", AllowNode::tree([
            ("device", AllowNode::tree([
                ("family", Leaf(SimpleType)),
                ("model", Leaf(SimpleType)),
                ("arch", Leaf(SimpleType)),
            ])),
            ("os", AllowNode::tree([
                ("name", Leaf(SimpleType)),
                ("version", Leaf(SimpleType)),
                ("build", Leaf(SimpleType)),
            ])),
        ])),
    ]);
}

/// Strip `data` down to the fields of `allowlist`.
///
/// Objects are recursively stripped by their subtree of the allowlist, as are
/// objects within arrays. Values having a different shape than their node of
/// the allowlist are removed.
pub fn strip_with_allowlist(
    data: &Map<String, Value>,
    allowlist: &BTreeMap<&'static str, AllowNode>,
) -> Map<String, Value> {
    let mut stripped = Map::new();

    for (key, value) in data {
        let Some(node) = allowlist.get(key.as_str()) else {
            continue;
        };

        match (node, value) {
            (Leaf(Allow::SimpleType), Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
                stripped.insert(key.clone(), value.clone());
            }
            (Leaf(Allow::Never(reason)), _) => {
                tracing::trace!(
                    field = %key,
                    reason = *reason,
                    "removed field which is never allowed"
                );
            }
            (Leaf(Allow::SimpleType), _) => (),
            (AllowNode::Tree(children), Value::Object(object)) => {
                stripped.insert(
                    key.clone(),
                    Value::Object(strip_with_allowlist(object, children)),
                );
            }
            (AllowNode::Tree(children), Value::Array(items)) => {
                let items = items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .map(|item| Value::Object(strip_with_allowlist(item, children)))
                    .collect();
                stripped.insert(key.clone(), Value::Array(items));
            }
            (AllowNode::Tree(_), _) => (),
        }
    }
    stripped
}

#[cfg(test)]
mod test {
    use super::{strip_with_allowlist, AllowNode, EVENT_DATA_ALLOWLIST};
    use serde_json::json;

    #[test]
    fn test_allowlist_stripping() {
        let AllowNode::Tree(allowlist) = &*EVENT_DATA_ALLOWLIST else {
            panic!("allowlist root must be a tree");
        };
        let event = json!({
            "event_id": "80e3496eff734ab0ac993167aaa0d1cd",
            "type": "error",
            "platform": "cocoa",
            "timestamp": 1694000000,
            "user": {"email": "someone@example.com"},
            "sdk": {
                "name": "sentry.cocoa",
                "version": "8.2.0",
                "integrations": ["Crash", "MyCustomIntegration"],
            },
            "contexts": {
                "device": {"family": "iOS", "model": "iPhone14,5", "arch": "arm64e", "name": "Jane's iPhone"},
                "os": {"name": "iOS", "version": "16.3", "build": {"nested": "object"}},
            },
            "exception": {"values": [
                {
                    "type": "EXC_BAD_ACCESS",
                    "value": "crash at 0x0 in MyApp",
                    "mechanism": {
                        "handled": false,
                        "type": "mach",
                        "data": {"relevant_address": "0x0"},
                        "meta": {"signal": {"number": 11, "code": 0, "name": "SIGSEGV"}},
                    },
                    "stacktrace": {"frames": [
                        {"function": "main", "filename": "MyApp/main.swift", "in_app": true, "vars": {"password": "x"}},
                        "not-an-object",
                    ]},
                },
            ]},
        });

        let stripped = strip_with_allowlist(event.as_object().unwrap(), allowlist);

        insta::assert_json_snapshot!(stripped, @r###"
        {
          "contexts": {
            "device": {
              "arch": "arm64e",
              "family": "iOS",
              "model": "iPhone14,5"
            },
            "os": {
              "name": "iOS",
              "version": "16.3"
            }
          },
          "exception": {
            "values": [
              {
                "mechanism": {
                  "handled": false,
                  "meta": {
                    "signal": {
                      "code": 0,
                      "name": "SIGSEGV",
                      "number": 11
                    }
                  },
                  "type": "mach"
                },
                "stacktrace": {
                  "frames": [
                    {
                      "function": "main",
                      "in_app": true
                    }
                  ]
                },
                "type": "EXC_BAD_ACCESS"
              }
            ]
          },
          "platform": "cocoa",
          "sdk": {
            "name": "sentry.cocoa",
            "version": "8.2.0"
          },
          "timestamp": 1694000000,
          "type": "error"
        }
        "###);
    }
}
