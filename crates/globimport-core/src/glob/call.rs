//! Finding and validating glob-import calls in module source.

use super::resolve::{to_absolute_glob, ModuleResolver};
use crate::error::{Error, Result};
use crate::expr::{
    parse_expression_at, Argument, ArrayElement, Callee, Expr, LitValue, Literal, ObjectMember,
    PropKey,
};
use futures::future::try_join_all;
use regex_lite::Regex;
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use tracing::trace;

/// Textual pre-filter for call sites. Every match is confirmed by parsing.
const IMPORT_GLOB_PATTERN: &str =
    r"\bimport\.meta\.(importGlob|glob|globEager|globEagerDefault)(?:<\w+>)?\s*\(";

/// Spelling used at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobCallKind {
    /// `import.meta.importGlob`
    ImportGlob,
    /// `import.meta.glob`
    Glob,
    /// `import.meta.globEager`
    GlobEager,
    /// `import.meta.globEagerDefault`
    GlobEagerDefault,
}

impl GlobCallKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "importGlob" => Self::ImportGlob,
            "glob" => Self::Glob,
            "globEager" => Self::GlobEager,
            "globEagerDefault" => Self::GlobEagerDefault,
            _ => return None,
        })
    }

    /// Property name after `import.meta.`.
    pub fn name(self) -> &'static str {
        match self {
            Self::ImportGlob => "importGlob",
            Self::Glob => "glob",
            Self::GlobEager => "globEager",
            Self::GlobEagerDefault => "globEagerDefault",
        }
    }

    /// Whether this spelling is transformed without takeover.
    pub fn is_canonical(self) -> bool {
        self == Self::ImportGlob
    }

    pub fn force_eager(self) -> bool {
        matches!(self, Self::GlobEager | Self::GlobEagerDefault)
    }

    pub fn force_default_export(self) -> bool {
        self == Self::GlobEagerDefault
    }
}

/// The `as` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobAs {
    Raw,
    Url,
    Custom(String),
}

impl GlobAs {
    fn new(value: &str) -> Self {
        match value {
            "raw" => Self::Raw,
            "url" => Self::Url,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Raw => "raw",
            Self::Url => "url",
            Self::Custom(value) => value,
        }
    }

    /// `raw` and `url` imports only have a default export.
    pub fn forces_default_export(&self) -> bool {
        matches!(self, Self::Raw | Self::Url)
    }
}

impl fmt::Display for GlobAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `query` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobQuery {
    String(String),
    /// Ordered pairs; `None` values render as bare keys.
    Map(Vec<(String, Option<String>)>),
}

/// Validated call options. `as` has already been folded into `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobOptions {
    pub eager: bool,
    pub export: Option<String>,
    pub exhaustive: bool,
    pub query: Option<GlobQuery>,
}

/// Absolute patterns of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedGlobSet {
    pub resolved: Vec<String>,
    /// Every written pattern began with `.` or `!`.
    pub is_relative: bool,
}

/// One validated call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobCallOccurrence {
    pub kind: GlobCallKind,
    pub force_eager: bool,
    pub force_default_export: bool,
    /// Byte offset of `import`.
    pub start: usize,
    /// Byte offset just past the closing `)`.
    pub end: usize,
    /// Position among all textual matches in the module.
    pub index: usize,
    pub raw_globs: Vec<String>,
    pub options: GlobOptions,
    pub resolved: ResolvedGlobSet,
}

impl GlobCallOccurrence {
    /// Half-open byte range of the call expression.
    pub fn source_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A call that passed validation but whose globs are not resolved yet.
struct ParsedCall {
    kind: GlobCallKind,
    start: usize,
    end: usize,
    index: usize,
    raw_globs: Vec<String>,
    options: GlobOptions,
}

/// Find, validate and resolve every glob-import call in `code`.
///
/// `dir` is the importer's directory, `None` for virtual modules. Matches
/// inside what turns out to be an unterminated string are skipped. Without
/// `takeover` only `importGlob` calls are kept; the other spellings are
/// dropped before any resolution so they never fail the module.
pub async fn parse_import_globs(
    code: &str,
    importer: &str,
    dir: Option<&str>,
    root: &str,
    takeover: bool,
    resolver: &dyn ModuleResolver,
) -> Result<Vec<GlobCallOccurrence>> {
    let calls = scan_calls(code)?;

    let occurrences = calls
        .into_iter()
        .filter(|call| takeover || call.kind.is_canonical())
        .map(|call| async move {
            let is_relative = call
                .raw_globs
                .iter()
                .all(|glob| glob.starts_with('.') || glob.starts_with('!'));
            if dir.is_none() && is_relative {
                if let Some(glob) = call.raw_globs.first() {
                    return Err(Error::VirtualRelative { glob: glob.clone() });
                }
            }

            let resolved = try_join_all(
                call.raw_globs
                    .iter()
                    .map(|glob| to_absolute_glob(glob, root, importer, dir, resolver)),
            )
            .await?;

            Ok(GlobCallOccurrence {
                kind: call.kind,
                force_eager: call.kind.force_eager(),
                force_default_export: call.kind.force_default_export(),
                start: call.start,
                end: call.end,
                index: call.index,
                raw_globs: call.raw_globs,
                options: call.options,
                resolved: ResolvedGlobSet {
                    resolved,
                    is_relative,
                },
            })
        });

    try_join_all(occurrences).await
}

/// Scan and validate call sites without resolving anything.
fn scan_calls(code: &str) -> Result<Vec<ParsedCall>> {
    let re = Regex::new(IMPORT_GLOB_PATTERN)
        .map_err(|e| Error::other(format!("invalid glob import pattern: {e}")))?;

    let mut calls = Vec::new();
    for (index, captures) in re.captures_iter(code).enumerate() {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(kind) = GlobCallKind::from_name(name.as_str()) else {
            continue;
        };
        let start = whole.start();

        let expr = match parse_expression_at(code, start) {
            Ok(expr) => expr,
            Err(e) if e.is_unterminated_string() => {
                trace!(start, "skipping glob import match inside a string");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let (raw_globs, options, end) = validate_call(&expr, start)?;
        calls.push(ParsedCall {
            kind,
            start,
            end,
            index,
            raw_globs,
            options,
        });
    }

    Ok(calls)
}

fn validate_call(expr: &Expr, start: usize) -> Result<(Vec<String>, GlobOptions, usize)> {
    let err = |message: String| Error::syntax(message, start);

    let call = match expr {
        Expr::Call(call) if matches!(call.callee, Callee::Expr(_)) => call,
        other => {
            return Err(err(format!(
                "Expect CallExpression, got {}",
                other.kind_name()
            )))
        }
    };

    if call.arguments.is_empty() || call.arguments.len() > 2 {
        return Err(err(format!(
            "Expected 1-2 arguments, but got {}",
            call.arguments.len()
        )));
    }

    let globs = match &call.arguments[0] {
        Argument::Expr(Expr::Array(array)) => array
            .elements
            .iter()
            .flatten()
            .map(|element| match element {
                ArrayElement::Expr(Expr::Literal(literal)) => glob_literal(literal, start),
                _ => Err(err("Could only use literals".to_string())),
            })
            .collect::<Result<Vec<_>>>()?,
        Argument::Expr(Expr::Literal(literal)) => vec![glob_literal(literal, start)?],
        _ => return Err(err("Could only use literals".to_string())),
    };

    let options = match call.arguments.get(1) {
        None => GlobOptions::default(),
        Some(Argument::Expr(Expr::Object(object))) => validate_options(&object.members, start)?,
        Some(Argument::Expr(other)) => {
            return Err(err(format!(
                "Expected the second argument to be an object literal, but got \"{}\"",
                other.kind_name()
            )))
        }
        Some(Argument::Spread(_)) => {
            return Err(err(
                "Expected the second argument to be an object literal, but got \"SpreadElement\""
                    .to_string(),
            ))
        }
    };

    Ok((globs, options, call.span.end as usize))
}

fn glob_literal(literal: &Literal, start: usize) -> Result<String> {
    match &literal.value {
        LitValue::String(glob) => Ok(glob.clone()),
        other => Err(Error::syntax(
            format!(
                "Expected glob to be a string, but got \"{}\"",
                other.type_name()
            ),
            start,
        )),
    }
}

/// Expected `typeof` of each known option.
fn option_type(name: &str) -> Option<&'static str> {
    Some(match name {
        "as" | "export" => "string",
        "eager" | "exhaustive" => "boolean",
        _ => return None,
    })
}

/// A property written as `name: value`, or `None` for spreads, shorthand
/// and non-identifier keys.
fn plain_property(member: &ObjectMember) -> Option<(&str, &Expr)> {
    match member {
        ObjectMember::Property {
            key: PropKey::Ident(name),
            value,
            shorthand: false,
            ..
        } => Some((name, value)),
        _ => None,
    }
}

fn is_undefined(expr: &Expr) -> bool {
    matches!(expr, Expr::Identifier(ident) if ident.name == "undefined")
}

fn validate_options(members: &[ObjectMember], start: usize) -> Result<GlobOptions> {
    let err = |message: String| Error::syntax(message, start);
    let literals = || Error::syntax("Could only use literals", start);

    let mut options = GlobOptions::default();
    let mut as_: Option<GlobAs> = None;

    for member in members {
        let (name, value) = plain_property(member).ok_or_else(literals)?;

        if name == "query" {
            options.query = Some(validate_query(value, start)?);
            continue;
        }

        let expected = option_type(name).ok_or_else(|| err(format!("Unknown options {name}")))?;
        let literal = match value {
            Expr::Literal(literal) => &literal.value,
            value if is_undefined(value) => continue,
            _ => return Err(literals()),
        };

        match (name, literal) {
            ("as", LitValue::String(value)) => {
                as_ = (!value.is_empty()).then(|| GlobAs::new(value));
            }
            ("export", LitValue::String(value)) => {
                options.export = (!value.is_empty()).then(|| value.clone());
            }
            ("eager", LitValue::Bool(value)) => options.eager = *value,
            ("exhaustive", LitValue::Bool(value)) => options.exhaustive = *value,
            (_, other) => {
                return Err(err(format!(
                    "Expected the type of option \"{name}\" to be \"{expected}\", but got \"{}\"",
                    other.type_name()
                )))
            }
        }
    }

    if let Some(as_) = &as_ {
        if as_.forces_default_export() {
            if let Some(export) = options.export.as_deref().filter(|e| *e != "default") {
                return Err(err(format!(
                    "Option \"export\" can only be \"default\" when \"as\" is \"{as_}\", but got \"{export}\""
                )));
            }
            options.export = Some("default".to_string());
        }
    }

    if as_.is_some() && options.query.is_some() {
        return Err(err(
            "Options \"as\" and \"query\" cannot be used together".to_string(),
        ));
    }

    if let Some(as_) = as_ {
        options.query = Some(GlobQuery::String(as_.as_str().to_string()));
    }

    Ok(options)
}

fn validate_query(value: &Expr, start: usize) -> Result<GlobQuery> {
    let literals = || Error::syntax("Could only use literals", start);

    match value {
        Expr::Object(object) => {
            let mut pairs: Vec<(String, Option<String>)> = Vec::new();
            for member in &object.members {
                let (key, value) = plain_property(member).ok_or_else(literals)?;
                let value = match value {
                    Expr::Literal(literal) => query_value(&literal.value),
                    value if is_undefined(value) => continue,
                    _ => return Err(literals()),
                };
                // Later duplicates win but keep the first position
                match pairs.iter_mut().find(|(k, _)| k == key) {
                    Some(pair) => pair.1 = value,
                    None => pairs.push((key.to_string(), value)),
                }
            }
            Ok(GlobQuery::Map(pairs))
        }
        Expr::Literal(Literal {
            value: LitValue::String(query),
            ..
        }) => Ok(GlobQuery::String(query.clone())),
        Expr::Literal(literal) => Err(Error::syntax(
            format!(
                "Expected query to be a string, but got \"{}\"",
                literal.value.type_name()
            ),
            start,
        )),
        _ => Err(literals()),
    }
}

/// Query value of a literal; empty strings and `null` become bare keys.
fn query_value(value: &LitValue) -> Option<String> {
    match value {
        LitValue::String(s) if s.is_empty() => None,
        LitValue::String(s) => Some(s.clone()),
        LitValue::Number(n) => Some(js_number(*n)),
        LitValue::BigInt(digits) => Some(digits.clone()),
        LitValue::Bool(b) => Some(b.to_string()),
        LitValue::Null => None,
    }
}

fn js_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
