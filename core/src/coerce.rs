//! Type-directed coercion of tokens into bound fields.
//!
//! One [`CoercionRule`] per supported [`FieldKind`]. Adding a scalar kind is
//! a new row in [`RULES`] plus a [`Scalar`](crate::Scalar) impl.

use std::fmt;

use chrono::DateTime;
use tracing::debug;

use crate::binding::Slot;
use crate::error::{ParseError, ParseResult};
use crate::value::{FieldKind, ScalarValue};

/// Per-kind coercion behavior.
pub struct CoercionRule {
    pub kind: FieldKind,
    /// Shown after the option name in help text (`--count INT`).
    pub type_hint: &'static str,
    /// Number of value tokens consumed.
    pub arity: usize,
    /// Help text used when the field carries none.
    pub default_help: Option<&'static str>,
    coerce: fn(&ScalarValue, &str) -> Result<ScalarValue, String>,
}

impl fmt::Debug for CoercionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoercionRule")
            .field("kind", &self.kind)
            .field("type_hint", &self.type_hint)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl CoercionRule {
    pub fn takes_value(&self) -> bool {
        self.arity > 0
    }
}

pub(crate) const TIME_PROFILE: &str = "RFC-3339 (2006-01-02T15:04:05+07:00)";

static RULES: &[CoercionRule] = &[
    CoercionRule {
        kind: FieldKind::Bool,
        type_hint: "",
        arity: 0,
        default_help: None,
        coerce: toggle,
    },
    CoercionRule {
        kind: FieldKind::Int,
        type_hint: "INT",
        arity: 1,
        default_help: None,
        coerce: |_, token| {
            token
                .parse::<i128>()
                .map(ScalarValue::Int)
                .map_err(|_| format!("should pass INT: {token}"))
        },
    },
    CoercionRule {
        kind: FieldKind::Str,
        type_hint: "STR",
        arity: 1,
        default_help: None,
        coerce: |_, token| Ok(ScalarValue::Str(token.to_string())),
    },
    CoercionRule {
        kind: FieldKind::Time,
        type_hint: "TIME",
        arity: 1,
        default_help: Some("timestamp RFC-3339 (2006-01-02T15:04:05+07:00)"),
        coerce: |_, token| {
            DateTime::parse_from_rfc3339(token)
                .map(ScalarValue::Time)
                .map_err(|e| format!("should pass {TIME_PROFILE}: {token}: {e}"))
        },
    },
    CoercionRule {
        kind: FieldKind::Ip,
        type_hint: "IP",
        arity: 1,
        default_help: None,
        coerce: |_, token| {
            token
                .parse()
                .map(ScalarValue::Ip)
                .map_err(|_| format!("invalid IP: {token}"))
        },
    },
    CoercionRule {
        kind: FieldKind::Cidr,
        type_hint: "CIDR",
        arity: 1,
        default_help: None,
        coerce: |_, token| token.parse().map(ScalarValue::Cidr),
    },
    CoercionRule {
        kind: FieldKind::Perm,
        type_hint: "PERM",
        arity: 1,
        default_help: Some("file perm"),
        coerce: |_, token| token.parse().map(ScalarValue::Perm),
    },
    CoercionRule {
        kind: FieldKind::Iface,
        type_hint: "IFACE",
        arity: 1,
        default_help: Some("network interface"),
        coerce: |_, token| token.parse().map(ScalarValue::Iface),
    },
];

fn toggle(current: &ScalarValue, _token: &str) -> Result<ScalarValue, String> {
    match current {
        ScalarValue::Bool(value) => Ok(ScalarValue::Bool(!value)),
        other => Err(format!("cannot toggle {other:?}")),
    }
}

/// Looks up the coercion rule for a kind.
///
/// # Examples
///
/// ```
/// use command_argparse_core::{FieldKind, coercion_rule};
///
/// assert_eq!(coercion_rule(FieldKind::Int).unwrap().type_hint, "INT");
/// assert_eq!(coercion_rule(FieldKind::Bool).unwrap().arity, 0);
/// assert!(coercion_rule(FieldKind::File).is_none());
/// ```
pub fn coercion_rule(kind: FieldKind) -> Option<&'static CoercionRule> {
    RULES.iter().find(|rule| rule.kind == kind)
}

/// Coerces the leading tokens into `slot`.
///
/// Returns the number of tokens consumed. The field is only written when the
/// token parses and passes the choice check.
pub(crate) fn assign<C>(
    rule: &CoercionRule,
    slot: &dyn Slot<C>,
    conf: &mut C,
    tokens: &[String],
    field: &str,
    choices: &[String],
) -> ParseResult<usize> {
    debug!(field, tokens = ?tokens, "try set value");

    let token = match rule.arity {
        0 => "",
        _ => tokens.first().map(String::as_str).ok_or_else(|| ParseError::InvalidValue {
            field: field.to_string(),
            reason: match rule.type_hint {
                "TIME" => format!("should pass TIME: {TIME_PROFILE}"),
                hint => format!("should pass {hint}"),
            },
        })?,
    };

    let current = slot.current(conf);
    let value = (rule.coerce)(&current, token).map_err(|reason| ParseError::InvalidValue {
        field: field.to_string(),
        reason,
    })?;

    if rule.takes_value() && !choices.is_empty() && !in_choices(choices, token) {
        return Err(ParseError::InvalidChoice {
            field: field.to_string(),
            value: token.to_string(),
            choices: choices.to_vec(),
        });
    }

    slot.store(conf, value).map_err(|reason| ParseError::InvalidValue {
        field: field.to_string(),
        reason,
    })?;

    debug!(field, consumed = rule.arity, "success set value");
    Ok(rule.arity)
}

/// Binary search in an already sorted choice list.
pub(crate) fn in_choices(choices: &[String], value: &str) -> bool {
    choices
        .binary_search_by(|choice| choice.as_str().cmp(value))
        .is_ok()
}
