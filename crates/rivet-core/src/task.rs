// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task signatures, parameter validation, and task results.
//!
//! A task is an executable with a JSON metadata file declaring its
//! parameters. Plugins run tasks through the execution context; the compiler
//! supplies the signature and this module checks supplied parameters against
//! it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters supplied to a task, keyed by parameter name.
pub type TaskParams = serde_json::Map<String, Value>;

/// Declared type of a task parameter.
///
/// This is the subset of the configuration language's type system that task
/// metadata uses in practice. Names outside the subset parse as [`Any`]
/// because full type checking belongs to the compiler.
///
/// [`Any`]: ParamType::Any
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParamType {
    #[default]
    Any,
    String,
    Integer,
    Number,
    Boolean,
    Hash,
    Array(Box<ParamType>),
    Enum(Vec<String>),
    Optional(Box<ParamType>),
    Sensitive(Box<ParamType>),
}

impl ParamType {
    /// Whether a parameter of this type may be omitted.
    pub fn is_optional(&self) -> bool {
        match self {
            ParamType::Optional(_) | ParamType::Any => true,
            ParamType::Sensitive(inner) => inner.is_optional(),
            _ => false,
        }
    }

    /// Whether the type itself marks the parameter as sensitive.
    pub fn is_sensitive(&self) -> bool {
        match self {
            ParamType::Sensitive(_) => true,
            ParamType::Optional(inner) => inner.is_sensitive(),
            _ => false,
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Any => true,
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Hash => value.is_object(),
            ParamType::Array(inner) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| inner.accepts(v))),
            ParamType::Enum(variants) => value
                .as_str()
                .is_some_and(|s| variants.iter().any(|v| v == s)),
            ParamType::Optional(inner) => value.is_null() || inner.accepts(value),
            ParamType::Sensitive(inner) => inner.accepts(value),
        }
    }
}

/// Split `Name[args]` into `("Name", Some("args"))`.
fn split_params(s: &str) -> Result<(&str, Option<&str>), String> {
    match s.find('[') {
        None => Ok((s, None)),
        Some(open) => {
            let inner = s[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| format!("unbalanced brackets in type `{s}`"))?;
            Ok((s[..open].trim(), Some(inner.trim())))
        }
    }
}

/// Split type arguments on commas outside nested brackets and quotes.
fn split_args(args: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced brackets in `{args}`"))?;
            }
            (None, ',') if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return Err(format!("unbalanced brackets in `{args}`"));
    }
    parts.push(args[start..].trim());
    Ok(parts)
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty parameter type".to_string());
        }
        let (name, args) = split_params(s)?;
        let inner = |args: Option<&str>| -> Result<Box<ParamType>, String> {
            match args {
                Some(a) if !a.is_empty() => Ok(Box::new(a.parse()?)),
                _ => Ok(Box::new(ParamType::Any)),
            }
        };
        let ty = match name {
            "String" | "Pattern" => ParamType::String,
            "Integer" => ParamType::Integer,
            "Float" | "Numeric" => ParamType::Number,
            "Boolean" => ParamType::Boolean,
            "Hash" | "Struct" => ParamType::Hash,
            "Array" | "Tuple" => {
                // Array[Type, min, max]: only the element type matters here.
                let element = match args {
                    Some(a) => split_args(a)?.first().copied(),
                    None => None,
                };
                ParamType::Array(inner(element)?)
            }
            "Enum" => {
                let variants = split_args(args.unwrap_or(""))?
                    .into_iter()
                    .map(|v| v.trim_matches(|c| c == '\'' || c == '"').to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                ParamType::Enum(variants)
            }
            "Optional" => ParamType::Optional(inner(args)?),
            "Sensitive" => ParamType::Sensitive(inner(args)?),
            _ => ParamType::Any,
        };
        Ok(ty)
    }
}

impl TryFrom<String> for ParamType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ParamType> for String {
    fn from(t: ParamType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "Any"),
            ParamType::String => write!(f, "String"),
            ParamType::Integer => write!(f, "Integer"),
            ParamType::Number => write!(f, "Numeric"),
            ParamType::Boolean => write!(f, "Boolean"),
            ParamType::Hash => write!(f, "Hash"),
            ParamType::Array(inner) => write!(f, "Array[{inner}]"),
            ParamType::Enum(variants) => {
                let quoted: Vec<String> = variants.iter().map(|v| format!("'{v}'")).collect();
                write!(f, "Enum[{}]", quoted.join(", "))
            }
            ParamType::Optional(inner) => write!(f, "Optional[{inner}]"),
            ParamType::Sensitive(inner) => write!(f, "Sensitive[{inner}]"),
        }
    }
}

/// Declaration of a single task parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.param_type.is_optional()
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive || self.param_type.is_sensitive()
    }
}

/// How a task receives its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    Stdin,
    Environment,
    #[default]
    Both,
}

/// Contents of a task's JSON metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `None` means the task declares no parameters and accepts anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, ParamSpec>>,
    #[serde(default)]
    pub supports_noop: bool,
    #[serde(default)]
    pub input_method: InputMethod,
}

/// A task as the compiler knows it: name, metadata, and executable.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSignature {
    pub name: String,
    pub metadata: TaskMetadata,
    pub executable: PathBuf,
}

impl TaskSignature {
    pub fn new(name: impl Into<String>, metadata: TaskMetadata, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            metadata,
            executable: executable.into(),
        }
    }

    /// Check `params` against the declared parameters.
    ///
    /// Collects every problem rather than stopping at the first one.
    pub fn validate(&self, params: &TaskParams) -> Result<(), Vec<String>> {
        let Some(declared) = &self.metadata.parameters else {
            return Ok(());
        };

        let mut errors = Vec::new();

        // Keys starting with `_` are metaparameters and are never declared.
        for key in params.keys().filter(|k| !k.starts_with('_')) {
            if !declared.contains_key(key) {
                errors.push(format!(
                    "task '{}' does not expect a value for parameter '{key}'",
                    self.name
                ));
            }
        }

        for (key, spec) in declared {
            match params.get(key) {
                None if spec.is_required() => errors.push(format!(
                    "task '{}' expects a value for parameter '{key}'",
                    self.name
                )),
                None => {}
                Some(value) if !spec.param_type.accepts(value) => errors.push(format!(
                    "parameter '{key}' expects a value of type {}, got {}",
                    spec.param_type,
                    json_type_name(value)
                )),
                Some(_) => {}
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Names of the parameters declared sensitive.
    pub fn sensitive_params(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .parameters
            .iter()
            .flatten()
            .filter(|(_, spec)| spec.is_sensitive())
            .map(|(name, _)| name.as_str())
    }

    /// Build the runnable task descriptor for this signature.
    pub fn task(&self) -> Task {
        Task {
            name: self.name.clone(),
            description: self.metadata.description.clone(),
            executable: self.executable.clone(),
            input_method: self.metadata.input_method,
            supports_noop: self.metadata.supports_noop,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Undef",
        Value::Bool(_) => "Boolean",
        Value::Number(n) if n.is_f64() => "Float",
        Value::Number(_) => "Integer",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Hash",
    }
}

/// A runnable task descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub description: Option<String>,
    pub executable: PathBuf,
    pub input_method: InputMethod,
    pub supports_noop: bool,
}

/// A value that must not appear in logs or debug output.
#[derive(Clone, PartialEq)]
pub struct Sensitive(Value);

impl Sensitive {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sensitive [value redacted]")
    }
}

/// A single task argument, possibly wrapped as sensitive.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskArg {
    Plain(Value),
    Sensitive(Sensitive),
}

impl TaskArg {
    pub fn expose(&self) -> &Value {
        match self {
            TaskArg::Plain(v) => v,
            TaskArg::Sensitive(s) => s.expose(),
        }
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, TaskArg::Sensitive(_))
    }
}

/// Task arguments ready for a transport, sensitive values wrapped.
pub type TaskArgs = BTreeMap<String, TaskArg>;

/// Unwrap arguments into the JSON object a task receives.
pub fn expose_args(args: &TaskArgs) -> TaskParams {
    args.iter()
        .map(|(k, v)| (k.clone(), v.expose().clone()))
        .collect()
}

/// Options for a single task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Ask the task to report what it would do without doing it.
    pub noop: bool,
    pub description: Option<String>,
}

/// Outcome of a task run on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failure,
}

/// The result of running a task on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub target: String,
    pub task: String,
    pub status: TaskStatus,
    /// Parsed JSON output, or `{"_output": <stdout>}` when the task printed
    /// something that is not a JSON object.
    pub value: Value,
}

impl TaskResult {
    pub fn success(target: impl Into<String>, task: impl Into<String>, value: Value) -> Self {
        Self {
            target: target.into(),
            task: task.into(),
            status: TaskStatus::Success,
            value,
        }
    }

    pub fn failure(target: impl Into<String>, task: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            task: task.into(),
            status: TaskStatus::Failure,
            value: serde_json::json!({ "_error": { "msg": message.into() } }),
        }
    }

    pub fn ok(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// The `_error.msg` reported by a failed task.
    pub fn error_message(&self) -> Option<&str> {
        self.value
            .get("_error")
            .and_then(|e| e.get("msg"))
            .and_then(Value::as_str)
    }

    /// Interpret raw task stdout the way task results are read: a JSON
    /// object is taken as the value, anything else is wrapped in `_output`.
    pub fn parse_output(stdout: &str) -> Value {
        match serde_json::from_str::<Value>(stdout.trim()) {
            Ok(v @ Value::Object(_)) => v,
            _ => serde_json::json!({ "_output": stdout }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn signature(params: Value) -> TaskSignature {
        let metadata: TaskMetadata =
            serde_json::from_value(json!({ "parameters": params })).unwrap();
        TaskSignature::new("demo::task", metadata, "/tmp/demo.sh")
    }

    fn params(v: Value) -> TaskParams {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parse_nested_types() {
        let t: ParamType = "Optional[Array[String]]".parse().unwrap();
        assert_eq!(
            t,
            ParamType::Optional(Box::new(ParamType::Array(Box::new(ParamType::String))))
        );
        assert_eq!(t.to_string(), "Optional[Array[String]]");
    }

    #[test]
    fn parse_enum_and_bounds() {
        let t: ParamType = "Enum['present', \"absent\"]".parse().unwrap();
        assert_eq!(t, ParamType::Enum(vec!["present".into(), "absent".into()]));
        assert_eq!("String[1]".parse::<ParamType>().unwrap(), ParamType::String);
        assert_eq!(
            "Array[Integer, 1, 5]".parse::<ParamType>().unwrap(),
            ParamType::Array(Box::new(ParamType::Integer))
        );
    }

    #[test]
    fn parse_element_types_with_their_own_arguments() {
        let array = |inner| ParamType::Array(Box::new(inner));
        assert_eq!(
            "Array[Hash[String, String]]".parse::<ParamType>().unwrap(),
            array(ParamType::Hash)
        );
        assert_eq!(
            "Array[Enum['a', 'b'], 1]".parse::<ParamType>().unwrap(),
            array(ParamType::Enum(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            "Optional[Array[Variant[String, Integer]]]".parse::<ParamType>().unwrap(),
            ParamType::Optional(Box::new(array(ParamType::Any)))
        );
        assert_eq!(
            "Tuple[Array[Integer, 1, 2], String]".parse::<ParamType>().unwrap(),
            array(array(ParamType::Integer))
        );
    }

    #[test]
    fn enum_variants_may_contain_commas() {
        let t: ParamType = "Enum['a,b', c]".parse().unwrap();
        assert_eq!(t, ParamType::Enum(vec!["a,b".into(), "c".into()]));
    }

    #[test]
    fn metadata_with_nested_parameter_types_deserializes() {
        let sig = signature(json!({
            "headers": { "type": "Optional[Array[Hash[String, String]]]" }
        }));
        assert!(sig.validate(&params(json!({ "headers": [{ "a": "b" }] }))).is_ok());
        assert!(sig.validate(&params(json!({ "headers": ["a"] }))).is_err());
    }

    #[test]
    fn parse_rejects_unbalanced_brackets() {
        assert!("Optional[String".parse::<ParamType>().is_err());
        assert!("".parse::<ParamType>().is_err());
        assert!("Array[Hash[String]".parse::<ParamType>().is_err());
        assert!("Enum['a]".parse::<ParamType>().is_err());
    }

    #[test]
    fn unknown_type_names_are_any() {
        assert_eq!("Target".parse::<ParamType>().unwrap(), ParamType::Any);
    }

    #[test]
    fn required_param_missing_fails() {
        let sig = signature(json!({ "param": { "type": "String" } }));
        let errors = sig.validate(&params(json!({}))).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("expects a value for parameter 'param'"));

        assert!(sig.validate(&params(json!({ "param": "value" }))).is_ok());
    }

    #[test]
    fn optional_and_defaulted_params_may_be_omitted() {
        let sig = signature(json!({
            "a": { "type": "Optional[String]" },
            "b": { "type": "Integer", "default": 3 },
        }));
        assert!(sig.validate(&params(json!({}))).is_ok());
    }

    #[test]
    fn unexpected_and_mistyped_params_are_all_reported() {
        let sig = signature(json!({ "count": { "type": "Integer" } }));
        let errors = sig
            .validate(&params(json!({ "count": "three", "extra": true })))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("does not expect a value for parameter 'extra'")));
        assert!(errors.iter().any(|e| e.contains("expects a value of type Integer, got String")));
    }

    #[test]
    fn metaparameters_are_not_checked() {
        let sig = signature(json!({ "key": { "type": "String" } }));
        let p = params(json!({ "key": "a", "_config": {}, "_boltdir": "/srv" }));
        assert!(sig.validate(&p).is_ok());
    }

    #[test]
    fn task_without_parameter_metadata_accepts_anything() {
        let sig = TaskSignature::new("free", TaskMetadata::default(), "/bin/true");
        assert!(sig.validate(&params(json!({ "anything": 1 }))).is_ok());
    }

    #[test]
    fn sensitive_params_from_flag_or_type() {
        let sig = signature(json!({
            "password": { "type": "String", "sensitive": true },
            "token": { "type": "Sensitive[String]" },
            "user": { "type": "String" },
        }));
        let mut names: Vec<&str> = sig.sensitive_params().collect();
        names.sort();
        assert_eq!(names, vec!["password", "token"]);
    }

    #[test]
    fn sensitive_debug_is_redacted() {
        let arg = TaskArg::Sensitive(Sensitive::new(json!("hunter2")));
        let dbg = format!("{arg:?}");
        assert!(!dbg.contains("hunter2"));
        assert_eq!(arg.expose(), &json!("hunter2"));
    }

    #[test]
    fn parse_output_wraps_non_objects() {
        assert_eq!(TaskResult::parse_output("{\"value\": 1}"), json!({ "value": 1 }));
        assert_eq!(TaskResult::parse_output("plain"), json!({ "_output": "plain" }));
    }

    #[test]
    fn failure_result_exposes_message() {
        let result = TaskResult::failure("localhost", "demo", "exit 1");
        assert!(!result.ok());
        assert_eq!(result.error_message(), Some("exit 1"));
    }

    #[test]
    fn metadata_parses_input_method() {
        let meta: TaskMetadata =
            serde_json::from_value(json!({ "input_method": "stdin", "supports_noop": true })).unwrap();
        assert_eq!(meta.input_method, InputMethod::Stdin);
        assert!(meta.supports_noop);
        assert!(meta.parameters.is_none());
    }
}
