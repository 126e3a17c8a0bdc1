//! Scoped-key operator grammar.
//!
//! A declared constraint has the form `[operator_token]value`. The
//! operator token, when present, is matched longest-first from a fixed
//! set; anything that does not start with a recognized token is an exact
//! string-equality requirement (so an unknown token degrades to a
//! literal match of the whole declared string, never an error).

use serde_json::Value;
use tracing::debug;

/// Numeric comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumOp {
    /// `=` — actual must be at least the declared value.
    MinValue,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

/// Lexicographic string comparison operators (`s==`, `s!=`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A parsed constraint, ready to be matched against host-derived values.
///
/// Parsing is total: every input string produces a `Requirement`.
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    /// No recognized operator prefix — exact string equality.
    Literal(String),
    /// Numeric comparison against the declared value.
    Num(NumOp, String),
    /// Lexicographic comparison against the declared value.
    Str(StrOp, String),
    /// `<in>` — declared value is a substring of the actual value, or a
    /// member of an actual-side list.
    In(String),
    /// `<or>` — actual value equals any of the declared alternatives.
    AnyOf(Vec<String>),
}

/// Operator tokens ordered longest-first so that prefix matching never
/// picks `=` where `==` (or `s<` where `s<=`) was declared.
const OP_TOKENS: &[&str] = &[
    "<in>", "<or>", "s==", "s!=", "s<=", "s>=", "==", "!=", ">=", "<=", "s<", "s>", "=",
];

impl Requirement {
    /// Parse a declared constraint string.
    pub fn parse(declared: &str) -> Requirement {
        let trimmed = declared.trim();
        let Some(token) = OP_TOKENS.iter().find(|t| trimmed.starts_with(**t)) else {
            return Requirement::Literal(declared.to_string());
        };
        let rest = trimmed[token.len()..].trim();
        // Except for `<or>`, only the first word after the operator is
        // the operand; trailing words (including stray operator tokens)
        // are ignored.
        let operand = rest.split_whitespace().next().unwrap_or("");
        if *token != "<or>" && operand.len() < rest.len() {
            debug!(declared = %trimmed, operand, "ignoring trailing words in constraint");
        }
        match *token {
            "=" => Requirement::Num(NumOp::MinValue, operand.to_string()),
            "==" => Requirement::Num(NumOp::Eq, operand.to_string()),
            "!=" => Requirement::Num(NumOp::Ne, operand.to_string()),
            ">=" => Requirement::Num(NumOp::Ge, operand.to_string()),
            "<=" => Requirement::Num(NumOp::Le, operand.to_string()),
            "s==" => Requirement::Str(StrOp::Eq, operand.to_string()),
            "s!=" => Requirement::Str(StrOp::Ne, operand.to_string()),
            "s<" => Requirement::Str(StrOp::Lt, operand.to_string()),
            "s<=" => Requirement::Str(StrOp::Le, operand.to_string()),
            "s>" => Requirement::Str(StrOp::Gt, operand.to_string()),
            "s>=" => Requirement::Str(StrOp::Ge, operand.to_string()),
            "<in>" => Requirement::In(operand.to_string()),
            "<or>" => {
                let alternatives = rest
                    .split("<or>")
                    .map(|alt| alt.trim().to_string())
                    .filter(|alt| !alt.is_empty())
                    .collect();
                Requirement::AnyOf(alternatives)
            }
            _ => unreachable!("token comes from OP_TOKENS"),
        }
    }

    /// Match against a string-form actual value.
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Requirement::Literal(declared) => actual == declared,
            Requirement::Num(op, declared) => {
                let (Ok(actual), Ok(declared)) =
                    (actual.trim().parse::<f64>(), declared.trim().parse::<f64>())
                else {
                    // Non-numeric operand on a numeric operator: no match.
                    return false;
                };
                match op {
                    NumOp::MinValue | NumOp::Ge => actual >= declared,
                    NumOp::Eq => actual == declared,
                    NumOp::Ne => actual != declared,
                    NumOp::Le => actual <= declared,
                }
            }
            Requirement::Str(op, declared) => match op {
                StrOp::Eq => actual == declared.as_str(),
                StrOp::Ne => actual != declared.as_str(),
                StrOp::Lt => actual < declared.as_str(),
                StrOp::Le => actual <= declared.as_str(),
                StrOp::Gt => actual > declared.as_str(),
                StrOp::Ge => actual >= declared.as_str(),
            },
            Requirement::In(declared) => actual.contains(declared.as_str()),
            Requirement::AnyOf(alternatives) => alternatives.iter().any(|alt| alt == actual),
        }
    }

    /// Match against a JSON actual value, as found in a host capability
    /// map. Lists satisfy `<in>` by membership; every other value is
    /// matched through its string form.
    pub fn matches_value(&self, actual: &Value) -> bool {
        if let (Requirement::In(declared), Value::Array(items)) = (self, actual) {
            return items.iter().any(|item| value_to_string(item) == *declared);
        }
        self.matches(&value_to_string(actual))
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_min_value() {
        let req = Requirement::parse("= 1024");
        assert!(req.matches("1024"));
        assert!(req.matches("2048"));
        assert!(!req.matches("512"));
    }

    #[test]
    fn numeric_comparisons() {
        assert!(Requirement::parse("== 4").matches("4"));
        assert!(!Requirement::parse("== 4").matches("4.5"));
        assert!(Requirement::parse("!= 4").matches("5"));
        assert!(Requirement::parse(">= 4").matches("4"));
        assert!(!Requirement::parse(">= 4").matches("3"));
        assert!(Requirement::parse("<= 4").matches("4"));
        assert!(!Requirement::parse("<= 4").matches("5"));
    }

    #[test]
    fn numeric_against_non_numeric_fails() {
        assert!(!Requirement::parse(">= 1024").matches("lots"));
        assert!(!Requirement::parse(">= banana").matches("1024"));
    }

    #[test]
    fn default_operator_is_string_equality() {
        let bare = Requirement::parse("x86_64");
        let explicit = Requirement::parse("s== x86_64");
        for actual in ["x86_64", "X86_64", "arm"] {
            assert_eq!(bare.matches(actual), explicit.matches(actual));
        }
        assert!(bare.matches("x86_64"));
        assert!(!bare.matches("arm"));
    }

    #[test]
    fn string_comparisons_are_lexicographic() {
        assert!(Requirement::parse("s< banana").matches("apple"));
        assert!(!Requirement::parse("s< apple").matches("banana"));
        assert!(Requirement::parse("s>= apple").matches("apple"));
        assert!(Requirement::parse("s!= apple").matches("banana"));
    }

    #[test]
    fn longest_token_wins() {
        // "s<=" must not parse as "s<" with declared "=...".
        assert!(Requirement::parse("s<= mango").matches("mango"));
        // "==" must not parse as "=" with declared "=4".
        assert!(!Requirement::parse("== 4").matches("5"));
    }

    #[test]
    fn unknown_operator_falls_back_to_literal() {
        let req = Requirement::parse("<wat> value");
        assert_eq!(req, Requirement::Literal("<wat> value".to_string()));
        assert!(req.matches("<wat> value"));
        assert!(!req.matches("value"));
    }

    #[test]
    fn operand_is_first_word_only() {
        // Trailing words after the operand are ignored, so a stray
        // duplicated token still matches.
        assert!(Requirement::parse("<in> 12311321 <in>").matches("12311321"));
        assert!(!Requirement::parse("<in> 11 <in>").matches("12310321"));
        assert!(Requirement::parse(">= 3 junk").matches("4"));
        assert!(!Requirement::parse(">= 3 junk").matches("2"));
    }

    #[test]
    fn numeric_operator_without_operand_never_matches() {
        assert!(!Requirement::parse("=").matches("34"));
        assert!(!Requirement::parse(">=").matches("1"));
    }

    #[test]
    fn or_tolerates_trailing_token() {
        let req = Requirement::parse("<or> 11 <or> 12 <or>");
        assert!(req.matches("12"));
        assert!(!req.matches("13"));
    }

    #[test]
    fn or_matches_any_alternative() {
        let req = Requirement::parse("<or> kvm <or> qemu <or> xen");
        assert!(req.matches("kvm"));
        assert!(req.matches("xen"));
        assert!(!req.matches("lxc"));
    }

    #[test]
    fn or_single_alternative() {
        let req = Requirement::parse("<or> kvm");
        assert!(req.matches("kvm"));
        assert!(!req.matches("qemu"));
    }

    #[test]
    fn in_is_substring_on_strings() {
        let req = Requirement::parse("<in> sse4");
        assert!(req.matches("sse2 sse3 sse4 avx"));
        assert!(!req.matches("sse2 sse3"));
    }

    #[test]
    fn in_is_membership_on_lists() {
        let req = Requirement::parse("<in> sse4");
        assert!(req.matches_value(&json!(["sse2", "sse4", "avx"])));
        assert!(!req.matches_value(&json!(["sse2", "avx"])));
    }

    #[test]
    fn matches_json_scalars() {
        assert!(Requirement::parse(">= 2").matches_value(&json!(4)));
        assert!(Requirement::parse("kvm").matches_value(&json!("kvm")));
        assert!(Requirement::parse("true").matches_value(&json!(true)));
    }
}
