//! Stripping of event payloads down to fields which are known to be free of
//! personal or application-identifying data, retaining only stack frames of
//! the SDK and of system libraries.

mod allowlist;
mod frames;

pub use allowlist::{strip_with_allowlist, Allow, AllowNode, EVENT_DATA_ALLOWLIST};
pub use frames::{strip_frames, FunctionPrefixDetector, SdkFrameDetector};

use serde_json::{Map, Value};

/// Strip an event by EVENT_DATA_ALLOWLIST, and then strip the stack frames of
/// its last exception, which is the one which was raised.
///
/// Returns an empty object if nothing of the event is retained.
pub fn strip_event_data(
    event: &Map<String, Value>,
    detector: &dyn SdkFrameDetector,
) -> Map<String, Value> {
    let mut stripped = match &*EVENT_DATA_ALLOWLIST {
        AllowNode::Tree(allowlist) => strip_with_allowlist(event, allowlist),
        AllowNode::Leaf(_) => Map::new(),
    };
    if stripped.is_empty() {
        return stripped;
    }

    let frames = stripped
        .get_mut("exception")
        .and_then(|exception| exception.get_mut("values"))
        .and_then(Value::as_array_mut)
        .and_then(|values| values.last_mut())
        .and_then(|value| value.get_mut("stacktrace"))
        .and_then(|stacktrace| stacktrace.get_mut("frames"))
        .and_then(Value::as_array_mut);

    if let Some(frames) = frames {
        let before = frames.len();
        *frames = strip_frames(frames, detector);
        tracing::debug!(before, after = frames.len(), "stripped exception frames");
    }
    stripped
}

#[cfg(test)]
mod test {
    use super::{strip_event_data, FunctionPrefixDetector};
    use serde_json::{json, Value};

    fn strip(event: Value) -> Value {
        Value::Object(strip_event_data(
            event.as_object().unwrap(),
            &FunctionPrefixDetector::cocoa(),
        ))
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(strip(json!({})), json!({}));
        assert_eq!(strip(json!({"user": {"id": 1}, "extra": "x"})), json!({}));
    }

    #[test]
    fn test_last_exception_frames_are_stripped() {
        let frame = |function: &str| json!({"function": function, "filename": "App.swift", "in_app": true});

        let stripped = strip(json!({
            "platform": "cocoa",
            "exception": {"values": [
                {"type": "NSException", "stacktrace": {"frames": [frame("main")]}},
                {"type": "EXC_BAD_ACCESS", "value": "secret", "stacktrace": {"frames": [
                    frame("main"),
                    frame("-[SentryCrash install]"),
                ]}},
            ]},
        }));

        assert_eq!(
            stripped,
            json!({
                "platform": "cocoa",
                "exception": {"values": [
                    // Frames of prior exceptions are only stripped by the allowlist.
                    {"type": "NSException", "stacktrace": {"frames": [
                        {"function": "main", "in_app": true},
                    ]}},
                    {"type": "EXC_BAD_ACCESS", "stacktrace": {"frames": [
                        {"function": "-[SentryCrash install]", "in_app": true},
                    ]}},
                ]},
            })
        );
    }
}
