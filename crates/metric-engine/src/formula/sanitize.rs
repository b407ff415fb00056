//! Text-level defences for user formulas and provider field names.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Longest formula accepted, in characters. Keeps parse trees shallow.
pub const MAX_FORMULA_LENGTH: usize = 1000;

/// Substrings that indicate an attempt to reach code rather than arithmetic.
/// Matched case-insensitively with whitespace removed.
const DANGEROUS_PATTERNS: [&str; 18] = [
    "eval(",
    "function(",
    "newfunction",
    "settimeout(",
    "setinterval(",
    "import(",
    "require(",
    "with(",
    "constructor",
    "prototype",
    "__proto__",
    "process.",
    "global.",
    "window.",
    "document.",
    "console.",
    ".call(",
    ".apply(",
];

/// Words a sanitized field name may never take: keywords of the formula
/// language, its function and constant names, and common script keywords.
pub const RESERVED_WORDS: [&str; 52] = [
    "abs", "sqrt", "min", "max", "pow", "round", "floor", "ceil", "log", "log10", "exp", "Math",
    "PI", "E", "true", "false", "null", "undefined", "NaN", "Infinity", "break", "case", "catch",
    "class", "const", "continue", "debugger", "default", "delete", "do", "else", "export",
    "extends", "finally", "for", "function", "if", "import", "in", "instanceof", "let", "new",
    "return", "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while",
];

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_char),
        _ => false,
    }
}

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

fn strip_comments(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut rest = formula;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(end) => &after[end + 2..],
                None => "",
            };
            out.push(' ');
        } else if let Some(after) = rest.strip_prefix("//") {
            rest = match after.find('\n') {
                Some(end) => &after[end..],
                None => "",
            };
        } else {
            let c = rest.chars().next().unwrap_or_default();
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// Remove `'...'` and `"..."` literals. `None` when a quote is unbalanced.
fn without_string_literals(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None => out.push(c),
        }
    }
    quote.is_none().then_some(out)
}

fn is_allowed_char(c: char) -> bool {
    is_identifier_char(c)
        || c.is_whitespace()
        || matches!(
            c,
            '+' | '-' | '*' | '/' | '%' | '(' | ')' | '.' | ',' | '<' | '>' | '=' | '!' | '&'
                | '|' | '?' | ':'
        )
}

/// Strip comments and reject anything that is not plain arithmetic text.
///
/// Returns the trimmed formula, or `None` when it is empty, too long, matches
/// a dangerous pattern, or contains characters outside the allow-list.
pub fn sanitize_formula(formula: &str) -> Option<String> {
    let stripped = strip_comments(formula);
    let trimmed = stripped.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_FORMULA_LENGTH {
        return None;
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if let Some(pattern) = DANGEROUS_PATTERNS.iter().find(|p| compact.contains(*p)) {
        tracing::debug!("Formula rejected: contains '{}'", pattern);
        return None;
    }

    let checked = without_string_literals(trimmed)?;
    if let Some(bad) = checked.chars().find(|c| !is_allowed_char(*c)) {
        tracing::debug!("Formula rejected: disallowed character '{}'", bad);
        return None;
    }

    Some(trimmed.to_string())
}

/// Map a field name to a bare identifier not already in `taken`.
pub fn sanitize_field_name(name: &str, taken: &HashSet<String>) -> String {
    let base = if is_valid_identifier(name) && !is_reserved_word(name) {
        name.to_string()
    } else {
        let replaced: String = name
            .chars()
            .map(|c| if is_identifier_char(c) { c } else { '_' })
            .collect();

        let mut collapsed = String::with_capacity(replaced.len());
        for c in replaced.chars() {
            if !(c == '_' && collapsed.ends_with('_')) {
                collapsed.push(c);
            }
        }

        let trimmed = collapsed.trim_matches('_').trim_start_matches(|c: char| c.is_ascii_digit());
        let mut candidate = trimmed.trim_start_matches('_').to_string();
        if candidate.is_empty() {
            candidate = "field".to_string();
        }
        if !candidate.starts_with(is_identifier_start) {
            candidate.insert(0, '_');
        }
        if is_reserved_word(&candidate) {
            candidate.push('_');
        }
        candidate
    };

    if !taken.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

/// Original -> sanitized field names for one evaluation. Injective.
#[derive(Debug, Clone, Default)]
pub struct FieldNameMap {
    forward: BTreeMap<String, String>,
    reverse: HashMap<String, String>,
}

impl FieldNameMap {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::default();
        let mut taken = HashSet::new();

        for name in names {
            if map.forward.contains_key(name) {
                continue;
            }
            let sanitized = sanitize_field_name(name, &taken);
            taken.insert(sanitized.clone());
            map.reverse.insert(sanitized.clone(), name.to_string());
            map.forward.insert(name.to_string(), sanitized);
        }
        map
    }

    pub fn sanitized(&self, original: &str) -> Option<&str> {
        self.forward.get(original).map(String::as_str)
    }

    pub fn original(&self, sanitized: &str) -> Option<&str> {
        self.reverse.get(sanitized).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(o, s)| (o.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Replace every original field name in `formula` with its sanitized form.
///
/// Single left-to-right pass, longest name first at each position, with
/// word-boundary checks on identifier-like edges so `debt` never matches
/// inside `debtToEquity` and replaced text is never rescanned. A name
/// directly followed by `(` is a function call and is left alone.
pub fn substitute_fields(formula: &str, names: &FieldNameMap) -> String {
    let mut candidates: Vec<(&str, &str)> = names.iter().filter(|(o, _)| !o.is_empty()).collect();
    candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = String::with_capacity(formula.len());
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < formula.len() {
        let rest = &formula[i..];
        let at_boundary = !prev.is_some_and(|p| is_identifier_char(p) || p == '.');

        let matched = candidates.iter().find(|(original, _)| {
            if !rest.starts_with(original) {
                return false;
            }
            let starts_word = original.chars().next().is_some_and(is_identifier_char);
            let ends_word = original.chars().last().is_some_and(is_identifier_char);
            let tail = &rest[original.len()..];
            let next = tail.chars().next();
            let is_call = tail.trim_start().starts_with('(');
            (!starts_word || at_boundary)
                && (!ends_word || !(next.is_some_and(is_identifier_char) || is_call))
        });

        match matched {
            Some((original, sanitized)) => {
                out.push_str(sanitized);
                prev = original.chars().last();
                i += original.len();
            }
            None => {
                let c = rest.chars().next().unwrap_or_default();
                out.push(c);
                prev = Some(c);
                i += c.len_utf8();
            }
        }
    }
    out
}
