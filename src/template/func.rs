//! Function tables available to templates
//!
//! Three layers of functions resolve a name inside a template, in order:
//! the reserved layout helpers ([`YIELD`], [`CURRENT`], [`BLOCK`]), the
//! caller's bundles (later bundles override earlier ones), then the built-ins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::Value;

/// Renders the target template inside a layout
pub const YIELD: &str = "yield";
/// Name of the template being rendered through a layout
pub const CURRENT: &str = "current";
/// Renders an optional named template
pub const BLOCK: &str = "block";

/// Names reserved for the layout helpers
/// Logic built-ins; evaluation stops at the argument that decides them
pub const AND: &str = "and";
pub const OR: &str = "or";

pub const HELPER_NAMES: [&str; 3] = [YIELD, CURRENT, BLOCK];

/// Error reported by a template function
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FuncError(pub String);

impl FuncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A function callable from templates
pub type Func = Arc<dyn Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync>;

/// A named bundle of template functions
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<String, Func>,
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, replacing any previous one with the same name
    pub fn insert<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
    }

    /// Builder form of [`FuncMap::insert`]
    pub fn with<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync + 'static,
    {
        self.insert(name, func);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Func> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Merge another bundle into this one; its functions win on conflicts
    pub fn extend(&mut self, other: &FuncMap) {
        for (name, func) in &other.funcs {
            self.funcs.insert(name.clone(), Arc::clone(func));
        }
    }
}

fn want_args(name: &str, args: &[Value], want: usize) -> Result<(), FuncError> {
    if args.len() != want {
        return Err(FuncError::new(format!(
            "wrong number of args for {}: want {} got {}",
            name,
            want,
            args.len()
        )));
    }
    Ok(())
}

fn want_at_least(name: &str, args: &[Value], want: usize) -> Result<(), FuncError> {
    if args.len() < want {
        return Err(FuncError::new(format!(
            "wrong number of args for {}: want at least {} got {}",
            name,
            want,
            args.len()
        )));
    }
    Ok(())
}

fn compare(name: &'static str, accept: fn(std::cmp::Ordering) -> bool) -> impl Fn(&[Value]) -> Result<Value, FuncError> {
    move |args| {
        want_args(name, args, 2)?;
        let ordering = args[0].loose_cmp(&args[1]).ok_or_else(|| {
            FuncError::new(format!(
                "incompatible types for comparison: {} and {}",
                args[0].kind(),
                args[1].kind()
            ))
        })?;
        Ok(Value::from(accept(ordering)))
    }
}

/// Functions every template can use
pub fn builtins() -> FuncMap {
    FuncMap::new()
        .with("not", |args| {
            want_args("not", args, 1)?;
            Ok(Value::from(!args[0].is_true()))
        })
        // First empty argument, or the last one
        .with(AND, |args| {
            want_at_least(AND, args, 1)?;
            let pick = args.iter().find(|a| !a.is_true()).unwrap_or(&args[args.len() - 1]);
            Ok(pick.clone())
        })
        // First non-empty argument, or the last one
        .with(OR, |args| {
            want_at_least(OR, args, 1)?;
            let pick = args.iter().find(|a| a.is_true()).unwrap_or(&args[args.len() - 1]);
            Ok(pick.clone())
        })
        // eq a b c... is true when a equals any of the others
        .with("eq", |args| {
            want_at_least("eq", args, 2)?;
            Ok(Value::from(args[1..].iter().any(|b| args[0].loose_eq(b))))
        })
        .with("ne", |args| {
            want_args("ne", args, 2)?;
            Ok(Value::from(!args[0].loose_eq(&args[1])))
        })
        .with("lt", compare("lt", |o| o.is_lt()))
        .with("le", compare("le", |o| o.is_le()))
        .with("gt", compare("gt", |o| o.is_gt()))
        .with("ge", compare("ge", |o| o.is_ge()))
        .with("len", |args| {
            want_args("len", args, 1)?;
            args[0]
                .length()
                .map(Value::from)
                .ok_or_else(|| FuncError::new(format!("len of type {}", args[0].kind())))
        })
        .with("index", |args| {
            want_at_least("index", args, 1)?;
            let mut current = args[0].clone();
            for key in &args[1..] {
                current = index_one(&current, key)?;
            }
            Ok(current)
        })
        .with("print", |args| Ok(Value::from(print(args))))
}

fn index_one(item: &Value, key: &Value) -> Result<Value, FuncError> {
    match item.as_data() {
        Some(serde_json::Value::Array(items)) => {
            let i = key
                .as_i64()
                .ok_or_else(|| FuncError::new(format!("cannot index array with {}", key.kind())))?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .map(Value::Data)
                .ok_or_else(|| FuncError::new(format!("index out of range: {}", i)))
        }
        Some(serde_json::Value::Object(map)) => {
            let k = key
                .as_str()
                .ok_or_else(|| FuncError::new(format!("cannot index object with {}", key.kind())))?;
            Ok(map.get(k).cloned().map(Value::Data).unwrap_or_default())
        }
        Some(serde_json::Value::Null) => Err(FuncError::new("index of untyped nil")),
        _ => Err(FuncError::new(format!("can't index item of type {}", item.kind()))),
    }
}

/// Concatenate operands, with spaces between operands when neither side is a string
fn print(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && arg.as_str().is_none() && args[i - 1].as_str().is_none() {
            out.push(' ');
        }
        out.push_str(&arg.to_text());
    }
    out
}

/// Markup helpers installed by [`crate::HtmlRenderer`] ahead of caller bundles
///
/// - `html s` marks `s` as trusted markup
/// - `js s` escapes `s` for use inside a JavaScript string literal
pub fn markup_funcs() -> FuncMap {
    FuncMap::new()
        .with("html", |args| {
            want_args("html", args, 1)?;
            Ok(Value::html(args[0].to_text()))
        })
        .with("js", |args| {
            want_args("js", args, 1)?;
            Ok(Value::from(js_escape(&args[0].to_text())))
        })
}

fn js_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(map: &FuncMap, name: &str, args: &[Value]) -> Result<Value, FuncError> {
        let f = map.get(name).expect("function should exist");
        f(args)
    }

    #[test]
    fn test_later_bundle_overrides() {
        let mut merged = FuncMap::new().with("greet", |_| Ok(Value::from("hi")));
        merged.extend(&FuncMap::new().with("greet", |_| Ok(Value::from("hello"))));
        assert_eq!(merged.len(), 1);
        assert_eq!(call(&merged, "greet", &[]).unwrap(), Value::from("hello"));
    }

    #[test]
    fn test_and_or_pick_operands() {
        let f = builtins();
        let args = [Value::from("a"), Value::from(""), Value::from("c")];
        assert_eq!(call(&f, "and", &args).unwrap(), Value::from(""));
        assert_eq!(call(&f, "or", &args).unwrap(), Value::from("a"));
    }

    #[test]
    fn test_eq_any_of() {
        let f = builtins();
        let args = [Value::from(json!(2)), Value::from(json!(1)), Value::from(json!(2.0))];
        assert_eq!(call(&f, "eq", &args).unwrap(), Value::from(true));
    }

    #[test]
    fn test_comparisons() {
        let f = builtins();
        let args = [Value::from(json!(1)), Value::from(json!(2))];
        assert_eq!(call(&f, "lt", &args).unwrap(), Value::from(true));
        assert_eq!(call(&f, "ge", &args).unwrap(), Value::from(false));
        let bad = [Value::from(json!(1)), Value::from("x")];
        assert!(call(&f, "lt", &bad).is_err());
    }

    #[test]
    fn test_len_and_index() {
        let f = builtins();
        let list = Value::from(json!(["a", "b"]));
        assert_eq!(call(&f, "len", &[list.clone()]).unwrap(), Value::from(2usize));
        assert_eq!(
            call(&f, "index", &[list.clone(), Value::from(1i64)]).unwrap(),
            Value::from("b")
        );
        assert!(call(&f, "index", &[list, Value::from(5i64)]).is_err());
        let map = Value::from(json!({"k": {"n": 1}}));
        assert_eq!(
            call(&f, "index", &[map, Value::from("k"), Value::from("n")]).unwrap(),
            Value::from(json!(1))
        );
    }

    #[test]
    fn test_print_spacing() {
        let f = builtins();
        let args = [Value::from(json!(1)), Value::from(json!(2)), Value::from("x"), Value::from(json!(3))];
        assert_eq!(call(&f, "print", &args).unwrap(), Value::from("1 2x3"));
    }

    #[test]
    fn test_arity_checked() {
        let f = builtins();
        let err = call(&f, "not", &[]).unwrap_err();
        assert_eq!(err.to_string(), "wrong number of args for not: want 1 got 0");
    }

    #[test]
    fn test_markup_funcs() {
        let f = markup_funcs();
        assert_eq!(
            call(&f, "html", &[Value::from("<b>")]).unwrap(),
            Value::html("<b>")
        );
        assert_eq!(
            call(&f, "js", &[Value::from("it's <x>")]).unwrap(),
            Value::from("it\\'s \\u003Cx\\u003E")
        );
    }

    #[test]
    fn test_debug_lists_names() {
        let f = FuncMap::new().with("b", |_| Ok(Value::nil())).with("a", |_| Ok(Value::nil()));
        assert_eq!(format!("{:?}", f), r#"{"a", "b"}"#);
    }
}
