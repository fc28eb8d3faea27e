use serde_json::{Map, Value};

// Frame fields which hold paths, and may therefore contain the name of the application.
const PATH_FIELDS: [&str; 3] = ["package", "module", "abs_path"];

const SYSTEM_LIBRARY_PREFIXES: [&str; 2] = ["/System/Library/", "/usr/lib/system/"];

/// SdkFrameDetector is a delegated trait which identifies stack frames
/// belonging to the SDK itself.
pub trait SdkFrameDetector: Send + Sync {
    fn is_sdk_frame(&self, frame: &Map<String, Value>) -> bool;

    /// Path which replaces the path fields of SDK frames.
    fn sdk_path(&self) -> &str {
        "Sentry.framework"
    }
}

/// FunctionPrefixDetector identifies SDK frames by a prefix of their function.
#[derive(Debug, Clone)]
pub struct FunctionPrefixDetector {
    prefixes: Vec<String>,
}

impl FunctionPrefixDetector {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Detector of frames of the Cocoa SDK.
    pub fn cocoa() -> Self {
        Self::new(["sentrycrash", "-[Sentry", "+[Sentry", "-[SentryCrash", "+[SentryCrash"])
    }
}

impl SdkFrameDetector for FunctionPrefixDetector {
    fn is_sdk_frame(&self, frame: &Map<String, Value>) -> bool {
        match frame.get("function").and_then(Value::as_str) {
            Some(function) => self.prefixes.iter().any(|p| function.starts_with(p.as_str())),
            None => false,
        }
    }
}

fn is_system_library(frame: &Map<String, Value>) -> bool {
    PATH_FIELDS.iter().any(|field| {
        frame
            .get(*field)
            .and_then(Value::as_str)
            .map(|path| SYSTEM_LIBRARY_PREFIXES.iter().any(|p| path.starts_with(p)))
            .unwrap_or_default()
    })
}

/// Keep only frames of the SDK or of system libraries. SDK frames are marked
/// as in-app and have their paths replaced, while all others are not in-app.
pub fn strip_frames(frames: &[Value], detector: &dyn SdkFrameDetector) -> Vec<Value> {
    frames
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|frame| {
            let is_sdk = detector.is_sdk_frame(frame);
            if !is_sdk && !is_system_library(frame) {
                return None;
            }
            let mut frame = frame.clone();

            if is_sdk {
                for field in PATH_FIELDS {
                    match frame.get(field) {
                        None | Some(Value::Null) => (),
                        Some(Value::String(s)) if s.is_empty() => (),
                        Some(_) => {
                            frame.insert(field.to_string(), Value::from(detector.sdk_path()));
                        }
                    }
                }
            }
            frame.insert("in_app".to_string(), Value::Bool(is_sdk));

            Some(Value::Object(frame))
        })
        .collect()
}
