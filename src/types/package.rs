use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A travel package.
///
/// The record is kept exactly as the API sent it, so serializing it again
/// yields the same object. Typed views of the fields the assistant reads are
/// exposed through accessors; none of them is required to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Package {
    fields: Map<String, Value>,
}

impl Package {
    /// `packageId` as text. Numeric ids are rendered in decimal.
    pub fn package_id(&self) -> Option<String> {
        match self.fields.get("packageId")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn package_name(&self) -> Option<&str> {
        self.str_field("packageName")
    }

    pub fn destination_name(&self) -> Option<&str> {
        self.str_field("destinationName")
    }

    pub fn plan_name(&self) -> Option<&str> {
        self.str_field("planName")
    }

    pub fn no_of_days(&self) -> Option<u32> {
        self.fields.get("noOfDays").and_then(leading_count)
    }

    pub fn no_of_night(&self) -> Option<u32> {
        self.fields.get("noOfNight").and_then(leading_count)
    }

    /// Starting price as sent; may be a number or a formatted string.
    pub fn start_from(&self) -> Option<&Value> {
        self.fields.get("startFrom")
    }

    /// Starting price as a number. Accepts `12999`, `"12999"` and `"12,999"`.
    pub fn price(&self) -> Option<f64> {
        match self.start_from()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                cleaned.parse().ok()
            }
            _ => None,
        }
    }

    /// Package name, else id, else empty.
    pub fn display_name(&self) -> String {
        self.package_name()
            .map(str::to_string)
            .or_else(|| self.package_id())
            .unwrap_or_default()
    }

    /// Any field by its wire name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Package {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

// Counts arrive as numbers or strings such as "5" or "5 Days".
fn leading_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}
