//! Function signatures and the built-in function library

use std::collections::BTreeMap;
use std::fmt;

use jmespath_ast::{Ast, JmespathError, JmespathType, Rcvar, RuntimeError, Spanned, Variable};

use crate::{Context, SearchResult, interpret};

/// Function argument types used when validating.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ArgumentType {
    Any,
    Null,
    String,
    Number,
    Bool,
    Object,
    Array,
    Expref,
    /// Every element of the array must match the inner type.
    TypedArray(Box<ArgumentType>),
    /// Accepts any of the listed types.
    Union(Vec<ArgumentType>),
}

impl ArgumentType {
    #[must_use]
    pub fn array_of(inner: Self) -> Self {
        Self::TypedArray(Box::new(inner))
    }

    #[must_use]
    pub fn is_valid(&self, value: &Variable) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Expref => value.is_expref(),
            Self::TypedArray(inner) => value
                .as_array()
                .is_some_and(|values| values.iter().all(|v| inner.is_valid(v))),
            Self::Union(types) => types.iter().any(|t| t.is_valid(value)),
        }
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("boolean"),
            Self::Object => f.write_str("object"),
            Self::Array => f.write_str("array"),
            Self::Expref => f.write_str("expref"),
            Self::TypedArray(inner) => write!(f, "array[{inner}]"),
            Self::Union(types) => {
                let names: Vec<String> = types.iter().map(ToString::to_string).collect();
                f.write_str(&names.join("|"))
            }
        }
    }
}

/// Arity and argument types of a function
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Signature {
    pub inputs: Vec<ArgumentType>,
    pub variadic: Option<ArgumentType>,
    pub output: ArgumentType,
}

impl Signature {
    #[must_use]
    pub const fn new(
        inputs: Vec<ArgumentType>,
        variadic: Option<ArgumentType>,
        output: ArgumentType,
    ) -> Self {
        Self {
            inputs,
            variadic,
            output,
        }
    }

    /// Check the number of arguments against the signature
    ///
    /// # Errors
    ///
    /// Returns `NotEnoughArguments` or `TooManyArguments` runtime errors
    pub fn validate_arity(&self, actual: usize, ctx: &Context<'_>) -> Result<(), JmespathError> {
        let expected = self.inputs.len();
        if actual < expected {
            Err(ctx.error(RuntimeError::NotEnoughArguments { expected, actual }))
        } else if actual > expected && self.variadic.is_none() {
            Err(ctx.error(RuntimeError::TooManyArguments { expected, actual }))
        } else {
            Ok(())
        }
    }

    /// Check arity and the type of every argument
    ///
    /// # Errors
    ///
    /// Returns arity errors or `InvalidType` for the first mismatching argument
    pub fn validate(&self, args: &[Rcvar], ctx: &Context<'_>) -> Result<(), JmespathError> {
        self.validate_arity(args.len(), ctx)?;
        for (position, value) in args.iter().enumerate() {
            let Some(expected) = self.inputs.get(position).or(self.variadic.as_ref()) else {
                continue;
            };
            if !expected.is_valid(value) {
                return Err(ctx.error(RuntimeError::InvalidType {
                    expected: expected.to_string(),
                    actual: value.get_type().to_string(),
                    position,
                }));
            }
        }
        Ok(())
    }
}

/// A function callable from expressions.
pub trait Function: Send + Sync {
    /// Evaluate the function with already evaluated arguments.
    ///
    /// # Errors
    ///
    /// Returns a runtime `JmespathError` when validation or evaluation fails
    fn evaluate(&self, args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult;
}

type Callback = dyn Fn(&[Rcvar], &mut Context<'_>) -> SearchResult + Send + Sync;

/// User supplied function validated against a signature before each call
pub struct CustomFunction {
    signature: Signature,
    callback: Box<Callback>,
}

impl CustomFunction {
    #[must_use]
    pub fn new(signature: Signature, callback: Box<Callback>) -> Self {
        Self {
            signature,
            callback,
        }
    }
}

impl Function for CustomFunction {
    fn evaluate(&self, args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
        self.signature.validate(args, ctx)?;
        (self.callback)(args, ctx)
    }
}

type BuiltinFn = fn(&[Rcvar], &mut Context<'_>) -> SearchResult;

/// Built-in function: a signature paired with a plain function pointer
struct Builtin {
    signature: Signature,
    body: BuiltinFn,
}

impl Function for Builtin {
    fn evaluate(&self, args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
        self.signature.validate(args, ctx)?;
        (self.body)(args, ctx)
    }
}

/// The standard JMESPath function library
pub(crate) fn builtins() -> Vec<(&'static str, Box<dyn Function>)> {
    use ArgumentType::{Any, Array, Bool, Expref, Null, Number, Object, String, Union};

    let strings_or_numbers = || {
        Union(vec![
            ArgumentType::array_of(String),
            ArgumentType::array_of(Number),
        ])
    };
    let table: Vec<(&'static str, Signature, BuiltinFn)> = vec![
        ("abs", Signature::new(vec![Number], None, Number), abs),
        ("avg", Signature::new(vec![ArgumentType::array_of(Number)], None, Number), avg),
        ("ceil", Signature::new(vec![Number], None, Number), ceil),
        (
            "contains",
            Signature::new(vec![Union(vec![String, Array]), Any], None, Bool),
            contains,
        ),
        ("ends_with", Signature::new(vec![String, String], None, Bool), ends_with),
        ("floor", Signature::new(vec![Number], None, Number), floor),
        (
            "join",
            Signature::new(vec![String, ArgumentType::array_of(String)], None, String),
            join,
        ),
        ("keys", Signature::new(vec![Object], None, Array), keys),
        (
            "length",
            Signature::new(vec![Union(vec![Array, Object, String])], None, Number),
            length,
        ),
        ("map", Signature::new(vec![Expref, Array], None, Array), map),
        (
            "max",
            Signature::new(vec![strings_or_numbers()], None, Union(vec![String, Number])),
            max,
        ),
        (
            "max_by",
            Signature::new(vec![Array, Expref], None, Union(vec![String, Number])),
            max_by,
        ),
        ("merge", Signature::new(vec![Object], Some(Object), Object), merge),
        (
            "min",
            Signature::new(vec![strings_or_numbers()], None, Union(vec![String, Number])),
            min,
        ),
        (
            "min_by",
            Signature::new(vec![Array, Expref], None, Union(vec![String, Number])),
            min_by,
        ),
        ("not_null", Signature::new(vec![Any], Some(Any), Any), not_null),
        (
            "reverse",
            Signature::new(vec![Union(vec![Array, String])], None, Union(vec![Array, String])),
            reverse,
        ),
        ("sort", Signature::new(vec![strings_or_numbers()], None, Array), sort),
        ("sort_by", Signature::new(vec![Array, Expref], None, Array), sort_by),
        ("starts_with", Signature::new(vec![String, String], None, Bool), starts_with),
        ("sum", Signature::new(vec![ArgumentType::array_of(Number)], None, Number), sum),
        ("to_array", Signature::new(vec![Any], None, Array), to_array),
        ("to_number", Signature::new(vec![Any], None, Number), to_number),
        (
            "to_string",
            Signature::new(
                vec![Union(vec![Object, Array, Bool, Number, String, Null])],
                None,
                String,
            ),
            to_string,
        ),
        ("type", Signature::new(vec![Any], None, String), type_of),
        ("values", Signature::new(vec![Object], None, Array), values),
    ];

    table
        .into_iter()
        .map(|(name, signature, body)| {
            let function: Box<dyn Function> = Box::new(Builtin { signature, body });
            (name, function)
        })
        .collect()
}

// Typed argument accessors. Signatures are validated before a body runs, so
// a mismatch here only happens if a signature and its body disagree.

fn mismatch(args: &[Rcvar], position: usize, expected: &str, ctx: &Context<'_>) -> JmespathError {
    let actual = args
        .get(position)
        .map_or(JmespathType::Null, |value| value.get_type());
    ctx.error(RuntimeError::InvalidType {
        expected: expected.to_string(),
        actual: actual.to_string(),
        position,
    })
}

fn any_arg<'v>(
    args: &'v [Rcvar],
    position: usize,
    ctx: &Context<'_>,
) -> Result<&'v Rcvar, JmespathError> {
    args.get(position)
        .ok_or_else(|| mismatch(args, position, "any", ctx))
}

fn number_arg(args: &[Rcvar], position: usize, ctx: &Context<'_>) -> Result<f64, JmespathError> {
    args.get(position)
        .and_then(|value| value.as_number())
        .ok_or_else(|| mismatch(args, position, "number", ctx))
}

fn string_arg<'v>(
    args: &'v [Rcvar],
    position: usize,
    ctx: &Context<'_>,
) -> Result<&'v str, JmespathError> {
    args.get(position)
        .and_then(|value| value.as_string())
        .map(String::as_str)
        .ok_or_else(|| mismatch(args, position, "string", ctx))
}

fn array_arg<'v>(
    args: &'v [Rcvar],
    position: usize,
    ctx: &Context<'_>,
) -> Result<&'v Vec<Rcvar>, JmespathError> {
    args.get(position)
        .and_then(|value| value.as_array())
        .ok_or_else(|| mismatch(args, position, "array", ctx))
}

fn object_arg<'v>(
    args: &'v [Rcvar],
    position: usize,
    ctx: &Context<'_>,
) -> Result<&'v BTreeMap<String, Rcvar>, JmespathError> {
    args.get(position)
        .and_then(|value| value.as_object())
        .ok_or_else(|| mismatch(args, position, "object", ctx))
}

fn expref_arg<'v>(
    args: &'v [Rcvar],
    position: usize,
    ctx: &Context<'_>,
) -> Result<&'v Spanned<Ast>, JmespathError> {
    args.get(position)
        .and_then(|value| value.as_expref())
        .ok_or_else(|| mismatch(args, position, "expref", ctx))
}

fn number(n: f64) -> SearchResult {
    Ok(Rcvar::new(Variable::Number(n)))
}

fn boolean(b: bool) -> SearchResult {
    Ok(Rcvar::new(Variable::Bool(b)))
}

fn null() -> SearchResult {
    Ok(Rcvar::new(Variable::Null))
}

#[allow(clippy::cast_precision_loss)]
fn count(n: usize) -> SearchResult {
    number(n as f64)
}

fn numbers(values: &[Rcvar]) -> impl Iterator<Item = f64> + '_ {
    values.iter().filter_map(|value| value.as_number())
}

/// Evaluate `&expr` against each element, requiring every key to be a
/// number or every key to be a string.
fn keyed_values(args: &[Rcvar], ctx: &mut Context<'_>) -> Result<Vec<(Rcvar, Rcvar)>, JmespathError> {
    let values = array_arg(args, 0, ctx)?;
    let ast = expref_arg(args, 1, ctx)?;
    let offset = ctx.offset;

    let mut keyed = Vec::with_capacity(values.len());
    let mut key_type = None;
    for (invocation, value) in values.iter().enumerate() {
        let key = interpret(value, ast, ctx)?;
        ctx.offset = offset;
        let actual = key.get_type();
        let expected = *key_type.get_or_insert(actual);
        let sortable = matches!(actual, JmespathType::Number | JmespathType::String);
        if !sortable || actual != expected {
            let expected = if sortable {
                format!("expression->{expected}")
            } else {
                "expression->number|expression->string".to_string()
            };
            return Err(ctx.error(RuntimeError::InvalidReturnType {
                expected,
                actual: actual.to_string(),
                position: 1,
                invocation,
            }));
        }
        keyed.push((value.clone(), key));
    }
    Ok(keyed)
}

fn abs(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    number(number_arg(args, 0, ctx)?.abs())
}

fn avg(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let values = array_arg(args, 0, ctx)?;
    if values.is_empty() {
        return null();
    }
    #[allow(clippy::cast_precision_loss)]
    let len = values.len() as f64;
    number(numbers(values).sum::<f64>() / len)
}

fn ceil(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    number(number_arg(args, 0, ctx)?.ceil())
}

fn contains(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let haystack = any_arg(args, 0, ctx)?;
    let needle = any_arg(args, 1, ctx)?;
    match &**haystack {
        Variable::Array(values) => boolean(values.contains(needle)),
        Variable::String(subject) => {
            boolean(needle.as_string().is_some_and(|s| subject.contains(s.as_str())))
        }
        _ => Err(mismatch(args, 0, "string|array", ctx)),
    }
}

fn ends_with(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let subject = string_arg(args, 0, ctx)?;
    let suffix = string_arg(args, 1, ctx)?;
    boolean(subject.ends_with(suffix))
}

fn floor(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    number(number_arg(args, 0, ctx)?.floor())
}

fn join(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let glue = string_arg(args, 0, ctx)?;
    let values = array_arg(args, 1, ctx)?;
    let parts: Vec<&str> = values
        .iter()
        .filter_map(|value| value.as_string().map(String::as_str))
        .collect();
    Ok(Rcvar::new(Variable::String(parts.join(glue))))
}

fn keys(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let members = object_arg(args, 0, ctx)?;
    let keys = members
        .keys()
        .map(|key| Rcvar::new(Variable::String(key.clone())))
        .collect();
    Ok(Rcvar::new(Variable::Array(keys)))
}

fn length(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    match &**any_arg(args, 0, ctx)? {
        Variable::Array(values) => count(values.len()),
        Variable::Object(members) => count(members.len()),
        // Code points, not bytes
        Variable::String(s) => count(s.chars().count()),
        _ => Err(mismatch(args, 0, "array|object|string", ctx)),
    }
}

fn map(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let ast = expref_arg(args, 0, ctx)?;
    let values = array_arg(args, 1, ctx)?;
    let mut results = Vec::with_capacity(values.len());
    for value in values {
        results.push(interpret(value, ast, ctx)?);
    }
    Ok(Rcvar::new(Variable::Array(results)))
}

fn max(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let values = array_arg(args, 0, ctx)?;
    Ok(values.iter().max().cloned().unwrap_or_else(|| Rcvar::new(Variable::Null)))
}

fn min(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let values = array_arg(args, 0, ctx)?;
    Ok(values.iter().min().cloned().unwrap_or_else(|| Rcvar::new(Variable::Null)))
}

fn max_by(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let keyed = keyed_values(args, ctx)?;
    // Ties keep the first maximal element
    Ok(keyed
        .into_iter()
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
        .map_or_else(|| Rcvar::new(Variable::Null), |(value, _)| value))
}

fn min_by(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let keyed = keyed_values(args, ctx)?;
    Ok(keyed
        .into_iter()
        .min_by(|a, b| a.1.cmp(&b.1))
        .map_or_else(|| Rcvar::new(Variable::Null), |(value, _)| value))
}

fn merge(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let mut merged = BTreeMap::new();
    for position in 0..args.len() {
        let members = object_arg(args, position, ctx)?;
        merged.extend(members.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Ok(Rcvar::new(Variable::Object(merged)))
}

fn not_null(args: &[Rcvar], _ctx: &mut Context<'_>) -> SearchResult {
    Ok(args
        .iter()
        .find(|value| !value.is_null())
        .cloned()
        .unwrap_or_else(|| Rcvar::new(Variable::Null)))
}

fn reverse(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    match &**any_arg(args, 0, ctx)? {
        Variable::Array(values) => {
            Ok(Rcvar::new(Variable::Array(values.iter().rev().cloned().collect())))
        }
        Variable::String(s) => Ok(Rcvar::new(Variable::String(s.chars().rev().collect()))),
        _ => Err(mismatch(args, 0, "array|string", ctx)),
    }
}

fn sort(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let mut values = array_arg(args, 0, ctx)?.clone();
    values.sort();
    Ok(Rcvar::new(Variable::Array(values)))
}

fn sort_by(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let mut keyed = keyed_values(args, ctx)?;
    // Stable: elements with equal keys keep their input order
    keyed.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(Rcvar::new(Variable::Array(
        keyed.into_iter().map(|(value, _)| value).collect(),
    )))
}

fn starts_with(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let subject = string_arg(args, 0, ctx)?;
    let prefix = string_arg(args, 1, ctx)?;
    boolean(subject.starts_with(prefix))
}

fn sum(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    number(numbers(array_arg(args, 0, ctx)?).sum())
}

fn to_array(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let value = any_arg(args, 0, ctx)?;
    if value.is_array() {
        Ok(value.clone())
    } else {
        Ok(Rcvar::new(Variable::Array(vec![value.clone()])))
    }
}

fn to_number(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let value = any_arg(args, 0, ctx)?;
    match &**value {
        Variable::Number(_) => Ok(value.clone()),
        Variable::String(s) => match Variable::from_json(s.trim()) {
            Ok(parsed @ Variable::Number(_)) => Ok(Rcvar::new(parsed)),
            _ => null(),
        },
        _ => null(),
    }
}

fn to_string(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let value = any_arg(args, 0, ctx)?;
    if value.is_string() {
        Ok(value.clone())
    } else {
        Ok(Rcvar::new(Variable::String(value.to_string())))
    }
}

fn type_of(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let value = any_arg(args, 0, ctx)?;
    Ok(Rcvar::new(Variable::String(value.get_type().to_string())))
}

fn values(args: &[Rcvar], ctx: &mut Context<'_>) -> SearchResult {
    let members = object_arg(args, 0, ctx)?;
    Ok(Rcvar::new(Variable::Array(members.values().cloned().collect())))
}
