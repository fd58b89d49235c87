use pest::iterators::Pair;
use pest::RuleType;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Turns a pest parse tree into a serde value keyed by rule names, so that
/// grammar rules named after model fields deserialize straight into models.
///
/// Leaf pairs become strings with runs of whitespace collapsed, which keeps
/// multi-word C types like `unsigned  long` stable. Rules listed in `arrays`
/// become JSON arrays of their children.
pub struct JsonConverter {
    arrays: Vec<&'static str>,
}

impl JsonConverter {
    pub fn new(arrays: &[&'static str]) -> Self {
        JsonConverter {
            arrays: arrays.to_vec(),
        }
    }

    fn leaf(data: &str) -> Value {
        Value::String(data.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn convert_to_value<R>(&self, pair: Pair<'_, R>) -> Value
    where
        R: RuleType,
    {
        let rule = format!("{:?}", pair.as_rule());
        let data = pair.as_str();
        let inner = pair.into_inner();
        if self.arrays.contains(&rule.as_str()) {
            return Value::Array(inner.map(|pair| self.convert_to_value(pair)).collect());
        }
        if inner.peek().is_none() {
            Self::leaf(data)
        } else {
            Value::Object(Map::from_iter(inner.map(|pair| {
                (format!("{:?}", pair.as_rule()), self.convert_to_value(pair))
            })))
        }
    }

    pub fn convert<T, R>(&self, pair: Pair<'_, R>) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
        R: RuleType,
    {
        serde_json::from_value(self.convert_to_value(pair))
    }
}
