//! Building values from JSON literals.
//!
//! Objects and arrays become fresh raw compounds, so
//! `reactive(json!({ "count": 1 }))` is the quickest way to get observable state.

use std::rc::Rc;

use super::{Raw, Value};

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(Rc::from(s)),
            serde_json::Value::Array(items) => Value::Compound(Raw::array(items)),
            serde_json::Value::Object(props) => Value::Compound(Raw::object_from(props)),
        }
    }
}
