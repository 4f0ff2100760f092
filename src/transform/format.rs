//! printf-style formatting of JSON values.
//!
//! Supports the verbs `%s`, `%v`, `%d`, `%f`, `%t`, `%q` and the `%%` escape,
//! each optionally preceded by flags (`-+ 0#`), a width and a `.precision`,
//! as in `%03d`, `%-10s` or `%.2f`. Arguments are consumed positionally. A
//! verb without an argument renders as `%!s(MISSING)`; unused arguments are
//! appended as `%!(EXTRA ...)`.

use crate::fieldpath::paved::type_name;
use serde_json::{Number, Value};
use std::iter::Peekable;
use std::str::Chars;

/// Widths and precisions above this render `%!(BADWIDTH)` / `%!(BADPREC)`.
const MAX_WIDTH: usize = 1_000_000;

#[derive(Debug, Default, Clone, Copy)]
struct Directive {
    minus: bool,
    plus: bool,
    space: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

pub fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut next_arg = 0;
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                ' ' => directive.space = true,
                '0' => directive.zero = true,
                '#' => {}
                _ => break,
            }
            chars.next();
        }
        match number(&mut chars) {
            Some(width) if width > MAX_WIDTH => out.push_str("%!(BADWIDTH)"),
            width => directive.width = width,
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            match number(&mut chars).unwrap_or(0) {
                precision if precision > MAX_WIDTH => out.push_str("%!(BADPREC)"),
                precision => directive.precision = Some(precision),
            }
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        match args.get(next_arg) {
            Some(arg) => {
                next_arg += 1;
                out.push_str(&format_verb(verb, arg, &directive));
            }
            None => {
                out.push_str("%!");
                out.push(verb);
                out.push_str("(MISSING)");
            }
        }
    }

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|arg| format!("{}={}", type_name(arg), display(arg)))
            .collect();
        out.push_str("%!(EXTRA ");
        out.push_str(&extra.join(", "));
        out.push(')');
    }

    out
}

/// Reads a run of decimal digits, saturating instead of overflowing.
fn number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        value = Some(
            value
                .unwrap_or(0)
                .saturating_mul(10)
                .saturating_add(digit as usize),
        );
    }
    value
}

/// Renders a value the way `%v` does.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_verb(verb: char, arg: &Value, directive: &Directive) -> String {
    match (verb, arg) {
        ('d' | 'v', Value::Number(n)) if n.is_i64() || n.is_u64() => {
            format_integer(n, directive)
        }
        ('f', Value::Number(n)) => match n.as_f64() {
            Some(f) => format_float(f, directive),
            None => bad_verb(verb, arg),
        },
        ('s' | 'v', Value::String(s)) => pad("", truncate(s, directive.precision), directive),
        ('s' | 'v', _) => pad("", display(arg), directive),
        ('t', Value::Bool(b)) => pad("", b.to_string(), directive),
        ('q', Value::String(s)) => pad("", Value::String(s.clone()).to_string(), directive),
        _ => bad_verb(verb, arg),
    }
}

fn sign(negative: bool, directive: &Directive) -> &'static str {
    if negative {
        "-"
    } else if directive.plus {
        "+"
    } else if directive.space {
        " "
    } else {
        ""
    }
}

fn format_integer(n: &Number, directive: &Directive) -> String {
    let text = n.to_string();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits.to_string()),
        None => (false, text),
    };
    let sign = sign(negative, directive);
    match directive.precision {
        // An explicit precision is a minimum digit count and disables zero padding.
        Some(precision) => {
            let digits = format!("{digits:0>precision$}");
            let directive = Directive {
                zero: false,
                ..*directive
            };
            pad(sign, digits, &directive)
        }
        None => pad(sign, digits, directive),
    }
}

fn format_float(f: f64, directive: &Directive) -> String {
    let precision = directive.precision.unwrap_or(6);
    let body = format!("{:.precision$}", f.abs());
    pad(sign(f.is_sign_negative() && f != 0.0, directive), body, directive)
}

fn truncate(s: &str, precision: Option<usize>) -> String {
    match precision {
        Some(precision) => s.chars().take(precision).collect(),
        None => s.to_string(),
    }
}

/// Pads `sign` + `body` to the directive's width. Zero padding goes between
/// the sign and the body; `-` pads on the right and overrides `0`.
fn pad(sign: &str, body: String, directive: &Directive) -> String {
    let len = sign.chars().count() + body.chars().count();
    let fill = match directive.width {
        Some(width) if width > len => width - len,
        _ => return format!("{sign}{body}"),
    };
    if directive.minus {
        format!("{sign}{body}{}", " ".repeat(fill))
    } else if directive.zero {
        format!("{sign}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{sign}{body}", " ".repeat(fill))
    }
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{verb}({}={})", type_name(arg), display(arg))
}
