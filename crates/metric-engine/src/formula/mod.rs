//! Custom metric formulas.
//!
//! A formula goes through three gates before it is evaluated: the text
//! sanitizer (deny-list and character allow-list), field-name substitution
//! onto sanitized identifiers, and the restricted parser. Evaluation walks
//! the parsed tree against a scope of numeric field values; nothing is ever
//! compiled or executed as code.

mod ast;
mod sanitize;

use std::collections::HashMap;

use metrics_core::{MetricsError, RawFinancialData};
use serde::{Deserialize, Serialize};

pub use ast::{parse_expression, BinaryOp, Expr, Function};
pub use sanitize::{
    is_reserved_word, is_valid_identifier, sanitize_field_name, sanitize_formula,
    substitute_fields, FieldNameMap, MAX_FORMULA_LENGTH, RESERVED_WORDS,
};

use crate::parsing::parse_numeric_value;

/// Numeric field values a formula may reference, keyed by sanitized name.
#[derive(Debug, Clone, Default)]
pub struct FormulaScope {
    names: FieldNameMap,
    values: HashMap<String, f64>,
}

impl FormulaScope {
    /// Every field of the record that parses to a finite number.
    pub fn from_record(record: &RawFinancialData) -> Self {
        Self::from_values(
            record
                .iter()
                .filter_map(|(field, value)| parse_numeric_value(value).map(|v| (field, v))),
        )
    }

    pub fn from_values<'a>(values: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let pairs: Vec<(&str, f64)> = values.into_iter().collect();
        let names = FieldNameMap::new(pairs.iter().map(|(field, _)| *field));
        let values = pairs
            .iter()
            .filter_map(|(field, v)| names.sanitized(field).map(|s| (s.to_string(), *v)))
            .collect();
        Self { names, values }
    }

    pub fn names(&self) -> &FieldNameMap {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A formula that passed every gate and can be evaluated repeatedly.
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    source: String,
    expression: String,
    expr: Expr,
}

impl CompiledFormula {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The sanitized text after field substitution.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Referenced identifiers not resolvable through `names`, reported by
    /// their original field name when one is known.
    pub fn missing_fields(&self, names: &FieldNameMap) -> Vec<String> {
        self.expr
            .fields()
            .into_iter()
            .filter(|field| names.original(field).is_none())
            .map(str::to_string)
            .collect()
    }

    pub fn evaluate(&self, scope: &FormulaScope) -> Result<f64, MetricsError> {
        let missing = self.missing_fields(&scope.names);
        if !missing.is_empty() {
            return Err(MetricsError::UnknownFields(missing));
        }
        match self.expr.evaluate(&scope.values)? {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(MetricsError::NonFiniteResult),
        }
    }
}

/// Run a formula through the sanitizer, field substitution and parser.
pub fn compile(formula: &str, names: &FieldNameMap) -> Result<CompiledFormula, MetricsError> {
    let cleaned = sanitize_formula(formula)
        .ok_or_else(|| MetricsError::UnsafeFormula(formula.to_string()))?;
    let expression = substitute_fields(&cleaned, names);
    let expr = parse_expression(&expression)?;
    Ok(CompiledFormula {
        source: formula.to_string(),
        expression,
        expr,
    })
}

pub fn evaluate_formula(formula: &str, scope: &FormulaScope) -> Result<f64, MetricsError> {
    compile(formula, &scope.names)?.evaluate(scope)
}

/// Editor-facing result of checking a formula against the known fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaValidation {
    pub valid: bool,
    pub missing_fields: Vec<String>,
    pub errors: Vec<String>,
}

/// Check `formula` without evaluating it.
pub fn validate_formula<'a>(
    formula: &str,
    available_fields: impl IntoIterator<Item = &'a str>,
) -> FormulaValidation {
    let names = FieldNameMap::new(available_fields);
    match compile(formula, &names) {
        Ok(compiled) => {
            let missing_fields = compiled.missing_fields(&names);
            let errors = missing_fields
                .iter()
                .map(|f| format!("Unknown field: {}", f))
                .collect();
            FormulaValidation {
                valid: missing_fields.is_empty(),
                missing_fields,
                errors,
            }
        }
        Err(e) => FormulaValidation {
            valid: false,
            missing_fields: Vec::new(),
            errors: vec![e.to_string()],
        },
    }
}
