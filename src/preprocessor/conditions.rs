use crate::models::Error;
use crate::patching::values::parse_integer;
use crate::preprocessor::Macros;
use pest::iterators::Pair;
use pest::{error, Parser};

#[derive(Parser)]
#[grammar = "./grammars/condition.pest"]
struct ConditionParser;

const EXPANSION_LIMIT: usize = 16;

/// Value of an identifier inside `#if`: its expansion when that is numeric,
/// otherwise `0` as the C preprocessor does for unknown names.
fn identifier_value(name: &str, macros: &Macros) -> i64 {
    let mut current = name.to_string();
    for _ in 0..EXPANSION_LIMIT {
        let body = match macros.get(&current) {
            Some(definition) if !definition.function_like => definition.body.trim().to_string(),
            _ => return 0,
        };
        if let Some(value) = parse_integer(&body) {
            return value;
        }
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return 0;
        }
        current = body;
    }
    0
}

fn evaluate_pair(pair: Pair<'_, Rule>, macros: &Macros) -> Result<i64, Error> {
    match pair.as_rule() {
        Rule::expression => {
            let mut result = 0;
            for conjunction in pair.into_inner() {
                if evaluate_pair(conjunction, macros)? != 0 {
                    result = 1;
                }
            }
            Ok(result)
        }
        Rule::conjunction => {
            let mut result = 1;
            for comparison in pair.into_inner() {
                if evaluate_pair(comparison, macros)? == 0 {
                    result = 0;
                }
            }
            Ok(result)
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let left = match inner.next() {
                Some(left) => evaluate_pair(left, macros)?,
                None => return Err(Error::FileMalformed),
            };
            let (comparator, right) = match (inner.next(), inner.next()) {
                (Some(comparator), Some(right)) => (comparator, evaluate_pair(right, macros)?),
                _ => return Ok(left),
            };
            let result = match comparator.as_str() {
                "==" => left == right,
                "!=" => left != right,
                ">=" => left >= right,
                "<=" => left <= right,
                ">" => left > right,
                _ => left < right,
            };
            Ok(result as i64)
        }
        Rule::negation => {
            let operand = pair.into_inner().next().ok_or(Error::FileMalformed)?;
            Ok((evaluate_pair(operand, macros)? == 0) as i64)
        }
        Rule::defined => {
            let name = pair
                .into_inner()
                .find(|inner| inner.as_rule() == Rule::identifier)
                .ok_or(Error::FileMalformed)?;
            Ok(macros.contains_key(name.as_str()) as i64)
        }
        Rule::number => {
            parse_integer(pair.as_str()).ok_or_else(|| Error::ParseInt(pair.as_str().to_string()))
        }
        Rule::identifier => Ok(identifier_value(pair.as_str(), macros)),
        _ => Err(Error::FileMalformed),
    }
}

/// Evaluates the expression of an `#if` or `#elif` line.
pub fn evaluate(expression: &str, macros: &Macros) -> Result<bool, Error> {
    let expression = ConditionParser::parse(Rule::condition, expression.trim())?
        .next()
        .ok_or(Error::FileMalformed)?;
    Ok(evaluate_pair(expression, macros)? != 0)
}

impl From<error::Error<Rule>> for Error {
    fn from(error: error::Error<Rule>) -> Self {
        Self::Pest(error.to_string())
    }
}
