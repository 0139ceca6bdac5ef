// src/core/call_tree/signature.rs
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TraceError, Result};

/// Member name used for constructors and for descriptors without a name
pub const CONSTRUCTOR_MARKER: &str = "new";

/// Placeholder for a missing owning type
pub const UNKNOWN_TYPE: &str = "<unknown>";

/// Placeholder for a missing parameter type
pub const UNKNOWN_PARAM_TYPE: &str = "?";

/// Descriptor handed over by the instrumentation layer on every entry and exit
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodSignature {
    /// Fully qualified name of the declaring type
    pub owning_type: String,
    /// Method name; empty for constructors
    pub member_name: String,
    pub is_static: bool,
    pub is_constructor: bool,
    /// Declared return type, `None` for `void` and constructors
    pub return_type: Option<String>,
    /// Fully qualified parameter types, in declaration order
    pub parameter_types: Vec<String>,
    /// Parameter names, parallel to `parameter_types`
    pub parameter_names: Vec<String>,
}

impl MethodSignature {
    pub fn method(owning_type: impl Into<String>, member_name: impl Into<String>) -> Self {
        Self {
            owning_type: owning_type.into(),
            member_name: member_name.into(),
            ..Self::default()
        }
    }

    pub fn constructor(owning_type: impl Into<String>) -> Self {
        Self {
            owning_type: owning_type.into(),
            member_name: CONSTRUCTOR_MARKER.to_string(),
            is_constructor: true,
            ..Self::default()
        }
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn returning(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn param(mut self, param_type: impl Into<String>, name: impl Into<String>) -> Self {
        self.parameter_types.push(param_type.into());
        self.parameter_names.push(name.into());
        self
    }

    /// Declaring type without its package or module path
    pub fn simple_type_name(&self) -> &str {
        simple_name(&self.owning_type)
    }

    /// `Type.member(..)` or `Type.member()`, used to derive default diagram file names
    pub fn short_string(&self) -> String {
        let member = if self.member_name.is_empty() {
            CONSTRUCTOR_MARKER
        } else {
            &self.member_name
        };
        let args = if self.parameter_types.is_empty() && self.parameter_names.is_empty() {
            "()"
        } else {
            "(..)"
        };
        format!("{}.{}{}", self.simple_type_name(), member, args)
    }

    /// Whether an exit event plausibly belongs to this entry
    pub fn same_member(&self, other: &MethodSignature) -> bool {
        self.owning_type == other.owning_type && self.member_name == other.member_name
    }

    /// Parse the textual form produced by `Display`:
    ///
    /// ```text
    /// static org.example.Type.member(java.lang.String name, int count) -> boolean
    /// new org.example.Type(int size)
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();

        if let Some(caps) = constructor_regex().captures(trimmed) {
            let mut signature = Self::constructor(&caps["owner"]);
            push_params(&mut signature, &caps["params"]);
            return Ok(signature);
        }

        let caps = method_regex()
            .captures(trimmed)
            .ok_or_else(|| TraceError::Signature(trimmed.to_string()))?;

        let mut signature = Self::method(&caps["owner"], &caps["member"]);
        signature.is_static = caps.name("static").is_some();
        signature.return_type = caps
            .name("ret")
            .map(|m| m.as_str().trim())
            .filter(|ret| *ret != "void")
            .map(str::to_string);
        push_params(&mut signature, &caps["params"]);
        Ok(signature)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameter_types
            .iter()
            .zip(&self.parameter_names)
            .map(|(ty, name)| format!("{} {}", ty, name))
            .collect::<Vec<_>>()
            .join(", ");

        if self.is_constructor {
            return write!(f, "new {}({})", self.owning_type, params);
        }
        if self.is_static {
            write!(f, "static ")?;
        }
        write!(f, "{}.{}({})", self.owning_type, self.member_name, params)?;
        match &self.return_type {
            Some(ret) => write!(f, " -> {}", ret),
            None => write!(f, " -> void"),
        }
    }
}

/// Strip the package or module path from a type name, keeping generic arguments intact.
///
/// `java.util.List<java.lang.String>` becomes `List<java.lang.String>`,
/// `crate::store::Cache` becomes `Cache`.
pub fn simple_name(type_name: &str) -> &str {
    let base_end = type_name.find('<').unwrap_or(type_name.len());
    let base = &type_name[..base_end];
    let start = match (base.rfind('.'), base.rfind("::")) {
        (Some(dot), Some(colons)) => (dot + 1).max(colons + 2),
        (Some(dot), None) => dot + 1,
        (None, Some(colons)) => colons + 2,
        (None, None) => 0,
    };
    &type_name[start..]
}

/// `simple_name` without generic arguments: `java.util.Optional<a.b.Entry>` becomes `Optional`
pub fn raw_simple_name(type_name: &str) -> &str {
    let base_end = type_name.find('<').unwrap_or(type_name.len());
    simple_name(&type_name[..base_end])
}

fn method_regex() -> &'static Regex {
    static METHOD: OnceLock<Regex> = OnceLock::new();
    METHOD.get_or_init(|| {
        Regex::new(
            r"^(?P<static>static\s+)?(?P<owner>\S.*?)(?:\.|::)(?P<member>[A-Za-z_$][\w$]*)\((?P<params>.*)\)(?:\s*->\s*(?P<ret>\S.*))?$",
        )
        .expect("Invalid method signature regex")
    })
}

fn constructor_regex() -> &'static Regex {
    static CONSTRUCTOR: OnceLock<Regex> = OnceLock::new();
    CONSTRUCTOR.get_or_init(|| {
        Regex::new(r"^new\s+(?P<owner>[^\s(]+)\((?P<params>.*)\)$")
            .expect("Invalid constructor signature regex")
    })
}

fn push_params(signature: &mut MethodSignature, params: &str) {
    for (index, param) in split_params(params).into_iter().enumerate() {
        match param.rsplit_once(char::is_whitespace) {
            Some((ty, name)) => {
                signature.parameter_types.push(ty.trim().to_string());
                signature.parameter_names.push(name.trim().to_string());
            }
            None => {
                signature.parameter_types.push(param.to_string());
                signature.parameter_names.push(format!("arg{}", index));
            }
        }
    }
}

// Commas inside generic arguments do not separate parameters.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut nesting = 0usize;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '<' => nesting += 1,
            '>' => nesting = nesting.saturating_sub(1),
            ',' if nesting == 0 => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}
