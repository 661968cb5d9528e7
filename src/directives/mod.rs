//! SSI directive text.
//!
//! Builders for the statements ssify emits and the serializer turning a resolved table
//! into `set` statements. The syntax is the one Nginx and Apache understand: single-quoted
//! attributes inside `<!--#...-->`, which browsers and renderers unaware of SSI treat
//! as comments.

use serde_json::Value;

use crate::resolver::ResolvedTable;

/// Closing the alternative branch of an SSI if.
pub const ELSE: &str = "<!--#else-->";

/// Closing an SSI if.
pub const ENDIF: &str = "<!--#endif-->";

/// `<!--#set var='NAME' value='VALUE'-->` with the value escaped.
pub fn set_statement(name: &str, value: &Value) -> String {
    format!("<!--#set var='{name}' value='{}'-->", escape(&value_text(value)))
}

/// `<!--#echo var='NAME' encoding='none'-->`
pub fn echo_statement(name: &str) -> String {
    format!("<!--#echo var='{name}' encoding='none'-->")
}

/// `<!--#if expr='EXPR'-->`
pub fn if_statement(expr: &str) -> String {
    format!("<!--#if expr='{expr}'-->")
}

/// `<!--#include file='PATH'-->`
pub fn include_statement(path: &str) -> String {
    format!("<!--#include file='{path}'-->")
}

/// Text of a resolved value as it appears in a set statement.
///
/// `false` and `null` become empty strings so that SSI if statements treat them as
/// false; strings are used verbatim; everything else uses its JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape a value for a single-quoted SSI attribute.
pub fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Reverse [`escape`]: a backslash makes the next character literal.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// One set statement per resolved variable.
///
/// Consumers only rely on every identifier being set before it is read, not on the
/// order of the statements; identifiers come out sorted.
pub fn serialize(resolved: &ResolvedTable) -> String {
    resolved.iter().map(|(name, value)| set_statement(name, value)).collect()
}
