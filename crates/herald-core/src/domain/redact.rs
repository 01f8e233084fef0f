//! Aligned `key: value` rendering with redaction of sensitive fields.

use std::fmt;

/// Placeholder printed instead of a non-empty sensitive value.
pub const REDACTED: &str = "***REDACTED***";

/// Whether a field value may appear in logs and error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    Public,
    Secret,
}

/// One printable field of a configuration structure.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: &'static str,
    pub sensitivity: Sensitivity,
    pub value: String,
}

impl Field {
    pub fn public(key: &'static str, value: impl ToString) -> Self {
        Self {
            key,
            sensitivity: Sensitivity::Public,
            value: value.to_string(),
        }
    }

    pub fn secret(key: &'static str, value: &str) -> Self {
        Self {
            key,
            sensitivity: Sensitivity::Secret,
            value: value.to_string(),
        }
    }

    fn shown(&self) -> &str {
        match self.sensitivity {
            Sensitivity::Secret if !self.value.is_empty() => REDACTED,
            _ => &self.value,
        }
    }
}

/// Write `fields` one per line, values aligned two columns past the longest
/// key. No trailing newline.
pub fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[Field]) -> fmt::Result {
    let width = fields.iter().map(|field| field.key.len()).max().unwrap_or(0) + 2;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str("\n")?;
        }
        let label = format!("{}:", field.key);
        write!(f, "{label:<width$}{}", field.shown())?;
    }
    Ok(())
}

/// Render a list as `[a b c]`.
pub fn bracketed<T: fmt::Display>(items: &[T]) -> String {
    let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", joined.join(" "))
}
