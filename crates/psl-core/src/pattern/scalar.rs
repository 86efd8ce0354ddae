use serde::{Deserialize, Serialize};

/// Scalar literal carried by value patterns and subject leaves
///
/// Literal matching compares canonical string forms, so `Int(1)` and
/// `Str("1")` match each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Canonical string form used for literal dispatch
    pub fn canonical(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => {
                let text = f.to_string();
                if f.is_finite() && !text.contains('.') {
                    format!("{}.0", text)
                } else {
                    text
                }
            }
            Scalar::Str(s) => s.clone(),
        }
    }

    /// Type name given to scalar leaves of a subject tree
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "str",
        }
    }

    /// Convert a JSON scalar; arrays, objects and null yield `None`
    pub fn from_json(value: &serde_json::Value) -> Option<Scalar> {
        match value {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            serde_json::Value::String(s) => Some(Scalar::Str(s.clone())),
            _ => None,
        }
    }
}

/// PSL source form: strings are quoted, everything else is canonical
impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            other => f.write_str(&other.canonical()),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_and_str_share_canonical_form() {
        assert_eq!(Scalar::Int(1).canonical(), Scalar::from("1").canonical());
    }

    #[test]
    fn test_whole_float_keeps_fraction() {
        assert_eq!(Scalar::Float(1.0).canonical(), "1.0");
        assert_eq!(Scalar::Float(2.5).canonical(), "2.5");
        assert_ne!(Scalar::Float(1.0).canonical(), Scalar::Int(1).canonical());
    }

    #[test]
    fn test_display_quotes_strings() {
        assert_eq!(Scalar::from("a").to_string(), "'a'");
        assert_eq!(Scalar::Int(7).to_string(), "7");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(
            Scalar::from_json(&serde_json::json!(3)),
            Some(Scalar::Int(3))
        );
        assert_eq!(
            Scalar::from_json(&serde_json::json!(0.5)),
            Some(Scalar::Float(0.5))
        );
        assert_eq!(Scalar::from_json(&serde_json::json!(null)), None);
        assert_eq!(Scalar::from_json(&serde_json::json!([1])), None);
    }
}
