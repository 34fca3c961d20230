//! reading loosely typed yaml values
//!
//! Inventory files are hand written and rarely agree on types: `hosts` may be a string or a list,
//! `tags` a list or a single string, flags may be `yes`, `1` or `true`. [ValueExt] converts
//! [serde_yaml::Value]s into the few shapes the extractor needs.
//!
//! Truthiness follows the usual dynamic-language rules:
//! - `null`, `false`, `0`, `""`, `[]` and `{}` are falsy
//! - everything else is truthy
use serde_yaml::Value;

pub trait ValueExt {
    fn is_truthy(&self) -> bool;

    /// String form used for extra parameters and map keys
    fn to_param_string(&self) -> String;

    /// A list of strings from either a sequence or a single scalar
    fn to_string_list(&self) -> Vec<String>;

    /// A host pattern; lists are joined with `:`, falsy values are `None`
    fn to_hosts(&self) -> Option<String>;
}

impl ValueExt for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Sequence(seq) => !seq.is_empty(),
            Value::Mapping(map) => !map.is_empty(),
            Value::Tagged(tagged) => tagged.value.is_truthy(),
        }
    }

    fn to_param_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Tagged(tagged) => tagged.value.to_param_string(),
            Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(self)
                .or_else(|_| serde_yaml::to_string(self).map(|s| s.trim_end().to_string()))
                .unwrap_or_default(),
        }
    }

    fn to_string_list(&self) -> Vec<String> {
        match self {
            Value::Null => vec![],
            Value::Sequence(seq) => seq
                .iter()
                .filter(|item| !item.is_null())
                .map(ValueExt::to_param_string)
                .collect(),
            Value::Tagged(tagged) => tagged.value.to_string_list(),
            scalar => vec![scalar.to_param_string()],
        }
    }

    fn to_hosts(&self) -> Option<String> {
        if !self.is_truthy() {
            return None;
        }

        match self {
            Value::Sequence(_) => Some(self.to_string_list().join(":")),
            Value::Tagged(tagged) => tagged.value.to_hosts(),
            other => Some(other.to_param_string()),
        }
    }
}
