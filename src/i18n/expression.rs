//! Interpolation expressions: parsing `{{ ... }}` occurrences and compiling
//! the property-chain subset into getter closures.
//!
//! Only pure property reads rooted at the params (`name`, `user.name`,
//! `a.b.c`) compile. Anything else is handed to the configured
//! [`DynamicEvaluator`], which runs expression text taken from translation
//! content. Translation sources are therefore a privileged input channel.

use crate::i18n::{DynamicEvaluator, EvalError, Params, Unsupported};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// One sub-expression of a parsed interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedExpression {
    /// Property reads rooted at the implicit context, outermost last
    PropertyChain(Vec<String>),

    /// Any other shape, kept as source text
    Other(String),
}

/// Alternating literal / expression structure of an interpolation.
///
/// `strings` always has one more element than `expressions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInterpolation {
    pub strings: Vec<String>,
    pub expressions: Vec<ParsedExpression>,
}

/// Capability turning raw interpolation text into its parsed structure.
pub trait ExpressionParser: Send + Sync {
    /// `None` means the text could not be parsed as an interpolation.
    fn parse_interpolation(&self, raw: &str) -> Option<ParsedInterpolation>;
}

/// Default parser for `{{ expr }}` text.
///
/// Classifies each expression as a property chain or leaves it as text;
/// it does not understand operators itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateParser;

static CHAIN_REGEX: OnceLock<Regex> = OnceLock::new();

fn chain_regex() -> &'static Regex {
    CHAIN_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(?:\s*\.\s*[A-Za-z_$][A-Za-z0-9_$]*)*$")
            .expect("Invalid property chain regex")
    })
}

fn classify(expression: &str) -> ParsedExpression {
    let expression = expression.trim();
    if chain_regex().is_match(expression) {
        ParsedExpression::PropertyChain(
            expression.split('.').map(|s| s.trim().to_string()).collect(),
        )
    } else {
        ParsedExpression::Other(expression.to_string())
    }
}

impl ExpressionParser for TemplateParser {
    fn parse_interpolation(&self, raw: &str) -> Option<ParsedInterpolation> {
        let text = raw.replace("this.", "");
        let mut strings = Vec::new();
        let mut expressions = Vec::new();
        let mut rest = text.as_str();

        while let Some(start) = rest.find("{{") {
            let (literal, tail) = rest.split_at(start);
            let end = tail.find("}}")?;
            strings.push(literal.to_string());
            expressions.push(classify(&tail[2..end]));
            rest = &tail[end + 2..];
        }

        if expressions.is_empty() || rest.contains("}}") {
            return None;
        }
        strings.push(rest.to_string());

        Some(ParsedInterpolation {
            strings,
            expressions,
        })
    }
}

/// Reads a value out of the params; `None` when any link is missing or null.
pub type Getter = Box<dyn for<'a> Fn(&'a Params) -> Option<&'a Value> + Send + Sync>;

fn getter<F>(f: F) -> Getter
where
    F: for<'a> Fn(&'a Params) -> Option<&'a Value> + Send + Sync + 'static,
{
    Box::new(f)
}

/// One piece of a compiled interpolation.
pub enum Part {
    Literal(String),
    Evaluator(Getter),
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Part::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Part::Evaluator(_) => f.write_str("Evaluator"),
        }
    }
}

/// Ordered parts that render to a string against a params context.
#[derive(Debug)]
pub struct CompiledExpression {
    parts: Vec<Part>,
}

impl CompiledExpression {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn interpolate(&self, ctx: &Params) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.clone(),
                Part::Evaluator(get) => format_value(get(ctx)),
            })
            .collect()
    }
}

/// Render an evaluated value: missing and null become empty, strings are
/// used verbatim, whole floats print without a fraction, everything else
/// uses its JSON text.
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Compiles property chains and falls back to a dynamic evaluator.
#[derive(Clone)]
pub struct ExpressionCompiler {
    evaluator: Arc<dyn DynamicEvaluator>,
}

impl ExpressionCompiler {
    pub fn new(evaluator: Arc<dyn DynamicEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Compile a parsed interpolation into literal and getter parts.
    ///
    /// Empty literals are skipped. Any sub-expression that is not a
    /// property chain makes the whole interpolation `Unsupported`.
    pub fn compile(&self, ast: &ParsedInterpolation) -> Result<CompiledExpression, Unsupported> {
        let mut parts = Vec::new();

        for (i, literal) in ast.strings.iter().enumerate() {
            if !literal.is_empty() {
                parts.push(Part::Literal(literal.clone()));
            }

            if let Some(expression) = ast.expressions.get(i) {
                match expression {
                    ParsedExpression::PropertyChain(chain) => {
                        parts.push(Part::Evaluator(property_getter(chain)?));
                    }
                    ParsedExpression::Other(text) => return Err(Unsupported(text.clone())),
                }
            }
        }

        Ok(CompiledExpression { parts })
    }

    /// Evaluate arbitrary expression text with the params as its scope.
    pub fn evaluate_generic(&self, expression: &str, ctx: &Params) -> Result<String, EvalError> {
        let value = self.evaluator.evaluate(expression, ctx)?;
        Ok(format_value(Some(&value)))
    }
}

/// Build a getter for `chain`, composing the receiver's getter with one
/// more property read for each nested step.
fn property_getter(chain: &[String]) -> Result<Getter, Unsupported> {
    match chain.split_last() {
        None => Err(Unsupported(String::new())),
        Some((name, [])) => {
            let name = name.clone();
            Ok(getter(move |ctx| ctx.get(&name).filter(|v| !v.is_null())))
        }
        Some((name, receiver)) => {
            let inner = property_getter(receiver)?;
            let name = name.clone();
            Ok(getter(move |ctx| {
                inner(ctx)
                    .and_then(Value::as_object)
                    .and_then(|object| object.get(&name))
                    .filter(|v| !v.is_null())
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{to_params, BasicEvaluator};
    use serde_json::json;

    fn compiler() -> ExpressionCompiler {
        ExpressionCompiler::new(Arc::new(BasicEvaluator))
    }

    fn chain(names: &[&str]) -> ParsedExpression {
        ParsedExpression::PropertyChain(names.iter().map(|s| s.to_string()).collect())
    }

    // ==================== TemplateParser Tests ====================

    #[test]
    fn test_parse_single_property() {
        let parsed = TemplateParser.parse_interpolation("{{ name }}").unwrap();
        assert_eq!(parsed.strings, vec!["", ""]);
        assert_eq!(parsed.expressions, vec![chain(&["name"])]);
    }

    #[test]
    fn test_parse_nested_chain_and_literals() {
        let parsed = TemplateParser
            .parse_interpolation("Hi {{user . name}}!")
            .unwrap();
        assert_eq!(parsed.strings, vec!["Hi ", "!"]);
        assert_eq!(parsed.expressions, vec![chain(&["user", "name"])]);
    }

    #[test]
    fn test_parse_strips_this_prefix() {
        let parsed = TemplateParser.parse_interpolation("{{this.count}}").unwrap();
        assert_eq!(parsed.expressions, vec![chain(&["count"])]);
    }

    #[test]
    fn test_parse_operator_is_other() {
        let parsed = TemplateParser.parse_interpolation("{{ a + b }}").unwrap();
        assert_eq!(
            parsed.expressions,
            vec![ParsedExpression::Other("a + b".to_string())]
        );
    }

    #[test]
    fn test_parse_unbalanced_is_none() {
        assert!(TemplateParser.parse_interpolation("{{ name").is_none());
        assert!(TemplateParser.parse_interpolation("name }}").is_none());
        assert!(TemplateParser.parse_interpolation("plain").is_none());
    }

    // ==================== compile Tests ====================

    #[test]
    fn test_compile_skips_empty_literals() {
        let parsed = TemplateParser.parse_interpolation("{{name}}").unwrap();
        let compiled = compiler().compile(&parsed).unwrap();
        assert_eq!(compiled.parts().len(), 1);
        assert!(matches!(compiled.parts()[0], Part::Evaluator(_)));
    }

    #[test]
    fn test_compile_and_interpolate() {
        let parsed = TemplateParser
            .parse_interpolation("Dear {{user.title}} {{user.name}}")
            .unwrap();
        let compiled = compiler().compile(&parsed).unwrap();

        let ctx = to_params(json!({"user": {"title": "Dr.", "name": "Who"}}));
        assert_eq!(compiled.interpolate(&ctx), "Dear Dr. Who");
    }

    #[test]
    fn test_missing_link_short_circuits_to_empty() {
        let parsed = TemplateParser.parse_interpolation("[{{a.b.c}}]").unwrap();
        let compiled = compiler().compile(&parsed).unwrap();

        assert_eq!(compiled.interpolate(&to_params(json!({}))), "[]");
        assert_eq!(compiled.interpolate(&to_params(json!({"a": null}))), "[]");
        assert_eq!(compiled.interpolate(&to_params(json!({"a": "str"}))), "[]");
        assert_eq!(
            compiled.interpolate(&to_params(json!({"a": {"b": {"c": 3}}}))),
            "[3]"
        );
    }

    #[test]
    fn test_compile_rejects_other_shapes() {
        let parsed = TemplateParser.parse_interpolation("{{ a * 2 }}").unwrap();
        assert_eq!(
            compiler().compile(&parsed).unwrap_err(),
            Unsupported("a * 2".to_string())
        );
    }

    // ==================== format_value Tests ====================

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None), "");
        assert_eq!(format_value(Some(&Value::Null)), "");
        assert_eq!(format_value(Some(&json!("text"))), "text");
        assert_eq!(format_value(Some(&json!(1.5))), "1.5");
        assert_eq!(format_value(Some(&json!(false))), "false");
        assert_eq!(format_value(Some(&json!([1, 2]))), "[1,2]");
    }

    #[test]
    fn test_whole_floats_format_like_dynamic_results() {
        assert_eq!(format_value(Some(&json!(5.0))), "5");
        assert_eq!(format_value(Some(&json!(-2.0))), "-2");
        assert_eq!(format_value(Some(&json!(7))), "7");

        let parsed = TemplateParser.parse_interpolation("{{price}}").unwrap();
        let compiled = compiler().compile(&parsed).unwrap();
        let ctx = to_params(json!({"price": 5.0}));
        assert_eq!(
            compiled.interpolate(&ctx),
            compiler().evaluate_generic("price * 1", &ctx).unwrap()
        );
        assert_eq!(compiled.interpolate(&ctx), "5");
    }

    // ==================== evaluate_generic Tests ====================

    #[test]
    fn test_evaluate_generic_formats_result() {
        let ctx = to_params(json!({"count": 2}));
        assert_eq!(compiler().evaluate_generic("count * 3", &ctx).unwrap(), "6");
    }

    #[test]
    fn test_evaluate_generic_propagates_errors() {
        let ctx = Params::new();
        assert!(compiler().evaluate_generic("1 +", &ctx).is_err());
    }
}
