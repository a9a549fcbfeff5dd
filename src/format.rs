//! `repr()` of floats and the `format()` mini-language:
//!
//!     [[fill]align][sign][#][0][width][,|_][.precision][type]
//!
use crate::exception::{Exception, ExceptionKind};
use crate::value::Value;

/// Shortest representation that reads back to the same float, spelled the
/// way the host language spells it (`1.0`, `1e+16`, `1.5e-05`, `inf`).
/// Between two equally short candidates the correctly rounded one wins, so
/// an exact tie goes to the even digit.
pub fn float_repr(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_owned();
    }

    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    // 17 significant digits always read back.
    let sci = (0..17)
        .map(|precision| format!("{:.*e}", precision, n))
        .find(|text| text.parse::<f64>().ok() == Some(n))
        .unwrap_or_else(|| format!("{:e}", n));

    let (mantissa, exp) = match sci.find('e') {
        Some(pos) => (&sci[..pos], sci[pos + 1..].parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exp < -4 || exp >= 16 {
        return exponent_form(&sci);
    }

    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits = mantissa.replace('.', "");
    let text = if exp < 0 {
        format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
    } else {
        let point = exp as usize + 1;
        if digits.len() <= point {
            format!("{}{}.0", digits, "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    };
    format!("{}{}", sign, text)
}

/// `1.5e-5` => `1.5e-05`
fn exponent_form(rust: &str) -> String {
    match rust.find('e') {
        Some(pos) => {
            let (mantissa, exp) = rust.split_at(pos);
            let exp = &exp[1..];
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => rust.to_owned(),
    }
}

fn code_point(n: i64) -> Result<char, Exception> {
    if n < 0 || n > 0x10ffff {
        return Err(Exception::new(
            ExceptionKind::OverflowError,
            "%c arg not in range(0x110000)",
        ));
    }
    std::char::from_u32(n as u32).ok_or_else(|| Exception::value_error("surrogates not allowed"))
}

#[derive(Debug, PartialEq, Default)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

fn invalid_spec(spec: &str, value: &Value) -> Exception {
    Exception::value_error(format!(
        "Invalid format specifier '{}' for object of type '{}'",
        spec,
        value.type_name()
    ))
}

fn parse_spec(spec: &str, value: &Value) -> Result<Spec, Exception> {
    let chars: Vec<char> = spec.chars().collect();
    let mut parsed = Spec::default();
    let mut i = 0;

    let is_align = |c: Option<&char>| matches!(c, Some('<') | Some('>') | Some('^') | Some('='));
    if chars.len() >= 2 && is_align(chars.get(1)) {
        parsed.fill = Some(chars[0]);
        parsed.align = Some(chars[1]);
        i = 2;
    } else if is_align(chars.get(0)) {
        parsed.align = Some(chars[0]);
        i = 1;
    }

    if let Some(&c) = chars.get(i) {
        if c == '+' || c == '-' || c == ' ' {
            parsed.sign = Some(c);
            i += 1;
        }
    }

    if chars.get(i) == Some(&'#') {
        parsed.alternate = true;
        i += 1;
    }

    if chars.get(i) == Some(&'0') {
        parsed.zero = true;
        i += 1;
    }

    let start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i > start {
        let digits: String = chars[start..i].iter().collect();
        parsed.width = digits.parse().map_err(|_| invalid_spec(spec, value))?;
    }

    if let Some(&c) = chars.get(i) {
        if c == ',' || c == '_' {
            parsed.grouping = Some(c);
            i += 1;
        }
    }

    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return Err(Exception::value_error("Format specifier missing precision"));
        }
        let digits: String = chars[start..i].iter().collect();
        parsed.precision = Some(digits.parse().map_err(|_| invalid_spec(spec, value))?);
    }

    if i + 1 == chars.len() {
        parsed.ty = Some(chars[i]);
    } else if i != chars.len() {
        return Err(invalid_spec(spec, value));
    }

    Ok(parsed)
}

fn unknown_code(ty: char, value: &Value) -> Exception {
    Exception::value_error(format!(
        "Unknown format code '{}' for object of type '{}'",
        ty,
        value.type_name()
    ))
}

/// `format(value, spec)`
pub fn format_value(value: &Value, spec: &str) -> Result<String, Exception> {
    if spec.is_empty() {
        return value.try_str();
    }

    match value {
        Value::Str(s) => {
            let spec = parse_spec(spec, value)?;
            format_str(s, &spec, value)
        }
        Value::Int(_) | Value::Bool(_) => {
            let n = value.as_int().unwrap_or(0);
            let spec = parse_spec(spec, value)?;
            match spec.ty {
                Some('e') | Some('E') | Some('f') | Some('F') | Some('g') | Some('G')
                | Some('%') => format_float(n as f64, &spec, value),
                _ => format_int(n, &spec, value),
            }
        }
        Value::Float(n) => {
            let spec = parse_spec(spec, value)?;
            format_float(*n, &spec, value)
        }
        _ => Err(Exception::type_error(format!(
            "unsupported format string passed to {}.__format__",
            value.type_name()
        ))),
    }
}

fn format_str(s: &str, spec: &Spec, value: &Value) -> Result<String, Exception> {
    match spec.ty {
        None | Some('s') => {}
        Some(ty) => return Err(unknown_code(ty, value)),
    }

    if spec.sign.is_some() {
        return Err(Exception::value_error(
            "Sign not allowed in string format specifier",
        ));
    }

    if spec.align == Some('=') {
        return Err(Exception::value_error(
            "'=' alignment not allowed in string format specifier",
        ));
    }

    let body: String = match spec.precision {
        Some(precision) => s.chars().take(precision).collect(),
        None => s.to_owned(),
    };

    Ok(pad("", &body, spec, '<'))
}

fn format_int(n: i64, spec: &Spec, value: &Value) -> Result<String, Exception> {
    if spec.precision.is_some() {
        return Err(Exception::value_error(
            "Precision not allowed in integer format specifier",
        ));
    }

    let magnitude = n.unsigned_abs();
    let (prefix, digits) = match spec.ty {
        None | Some('d') | Some('n') => ("", group(&magnitude.to_string(), spec.grouping)),
        Some('x') => ("0x", format!("{:x}", magnitude)),
        Some('X') => ("0X", format!("{:X}", magnitude)),
        Some('o') => ("0o", format!("{:o}", magnitude)),
        Some('b') => ("0b", format!("{:b}", magnitude)),
        Some('c') => {
            let c = code_point(n)?;
            return Ok(pad("", &c.to_string(), spec, '<'));
        }
        Some(ty) => return Err(unknown_code(ty, value)),
    };

    let mut sign = sign_of(n < 0, spec.sign);
    if spec.alternate {
        sign.push_str(prefix);
    }
    Ok(pad(&sign, &digits, spec, '>'))
}

fn format_float(n: f64, spec: &Spec, value: &Value) -> Result<String, Exception> {
    let upper = matches!(spec.ty, Some('E') | Some('F') | Some('G'));
    let negative = n.is_sign_negative() && !n.is_nan();
    let abs = n.abs();

    let body = if !abs.is_finite() {
        let text = if abs.is_nan() { "nan" } else { "inf" };
        let text = if upper { text.to_uppercase() } else { text.to_owned() };
        if spec.ty == Some('%') {
            format!("{}%", text)
        } else {
            text
        }
    } else {
        match spec.ty {
            Some('f') | Some('F') => {
                let fixed = format!("{:.*}", spec.precision.unwrap_or(6), abs);
                group_fixed(&fixed, spec.grouping)
            }
            Some('e') | Some('E') => {
                let text = exponent_form(&format!("{:.*e}", spec.precision.unwrap_or(6), abs));
                if upper {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            Some('%') => {
                let fixed = format!("{:.*}", spec.precision.unwrap_or(6), abs * 100.0);
                format!("{}%", group_fixed(&fixed, spec.grouping))
            }
            Some('g') | Some('G') => {
                let text = general(abs, spec.precision.unwrap_or(6), spec.alternate, false);
                let text = group_fixed(&text, spec.grouping);
                if upper {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            None => match spec.precision {
                Some(precision) => group_fixed(&general(abs, precision, spec.alternate, true), spec.grouping),
                None => group_fixed(&float_repr(abs), spec.grouping),
            },
            Some(ty) => return Err(unknown_code(ty, value)),
        }
    };

    let sign = sign_of(negative, spec.sign);
    Ok(pad(&sign, &body, spec, '>'))
}

/// The `g` presentation: fixed or scientific depending on the exponent,
/// trailing zeros removed.
fn general(abs: f64, precision: usize, alternate: bool, keep_point: bool) -> String {
    let precision = precision.max(1);
    if abs == 0.0 {
        return if keep_point { "0.0" } else { "0" }.to_owned();
    }

    let sci = format!("{:.*e}", precision - 1, abs);
    let exp: i32 = sci
        .rsplit('e')
        .next()
        .and_then(|e| e.parse().ok())
        .unwrap_or(0);

    if exp < -4 || exp >= precision as i32 {
        let mut text = exponent_form(&sci);
        if !alternate {
            if let Some(pos) = text.find('e') {
                let (mantissa, rest) = text.split_at(pos);
                text = format!("{}{}", strip_zeros(mantissa), rest);
            }
        }
        text
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, abs);
        if alternate {
            fixed
        } else {
            let stripped = strip_zeros(&fixed);
            if keep_point && !stripped.contains('.') {
                format!("{}.0", stripped)
            } else {
                stripped
            }
        }
    }
}

fn strip_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text.to_owned()
    }
}

fn sign_of(negative: bool, sign: Option<char>) -> String {
    match (negative, sign) {
        (true, _) => "-".to_owned(),
        (false, Some('+')) => "+".to_owned(),
        (false, Some(' ')) => " ".to_owned(),
        _ => String::new(),
    }
}

/// Inserts a separator every three digits.
fn group(digits: &str, separator: Option<char>) -> String {
    let separator = match separator {
        Some(separator) => separator,
        None => return digits.to_owned(),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

fn group_fixed(text: &str, separator: Option<char>) -> String {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| text.len());
    let (int_part, rest) = text.split_at(end);
    format!("{}{}", group(int_part, separator), rest)
}

fn pad(sign: &str, body: &str, spec: &Spec, default_align: char) -> String {
    let len = sign.chars().count() + body.chars().count();
    if len >= spec.width {
        return format!("{}{}", sign, body);
    }

    let (fill, align) = match (spec.fill, spec.align) {
        (fill, Some(align)) => (fill.unwrap_or(' '), align),
        (_, None) if spec.zero => ('0', '='),
        (_, None) => (' ', default_align),
    };

    let padding = spec.width - len;
    let fill_str = |n: usize| fill.to_string().repeat(n);
    match align {
        '<' => format!("{}{}{}", sign, body, fill_str(padding)),
        '^' => format!(
            "{}{}{}{}",
            fill_str(padding / 2),
            sign,
            body,
            fill_str(padding - padding / 2)
        ),
        '=' => format!("{}{}{}", sign, fill_str(padding), body),
        _ => format!("{}{}{}", fill_str(padding), sign, body),
    }
}

/// `template % args`, the printf-style formatting of strings.
pub fn percent_format(template: &str, args: &Value) -> Result<String, Exception> {
    let mut values = match args {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    }
    .into_iter();

    let chars: Vec<char> = template.chars().collect();
    let mut s = String::with_capacity(template.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '%' {
            s.push(chars[i]);
            i += 1;
            continue;
        }

        i += 1;
        let mut flags = String::new();
        while i < chars.len() && "-+ 0#".contains(chars[i]) {
            flags.push(chars[i]);
            i += 1;
        }

        let mut width = String::new();
        while i < chars.len() && chars[i].is_ascii_digit() {
            width.push(chars[i]);
            i += 1;
        }

        let mut precision = String::new();
        if i < chars.len() && chars[i] == '.' {
            precision.push('.');
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                precision.push(chars[i]);
                i += 1;
            }
            if precision.len() == 1 {
                precision.push('0');
            }
        }

        let conversion = match chars.get(i) {
            Some(c) => *c,
            None => return Err(Exception::value_error("incomplete format")),
        };
        i += 1;

        if conversion == '%' {
            s.push('%');
            continue;
        }

        let value = values
            .next()
            .ok_or_else(|| Exception::type_error("not enough arguments for format string"))?;

        let align = if flags.contains('-') { "<" } else { ">" };
        let mut spec = String::new();
        if flags.contains('-') {
            spec.push('<');
        }
        if flags.contains('+') {
            spec.push('+');
        } else if flags.contains(' ') {
            spec.push(' ');
        }
        if flags.contains('#') {
            spec.push('#');
        }
        if flags.contains('0') && !flags.contains('-') {
            spec.push('0');
        }
        spec.push_str(&width);

        let text = match conversion {
            's' | 'r' | 'a' => {
                let text = if conversion == 's' {
                    value.try_str()?
                } else {
                    value.try_repr()?
                };
                format_value(&Value::from(text), &format!("{}{}{}", align, width, precision))?
            }
            'd' | 'i' | 'u' => {
                let n = match &value {
                    Value::Float(f) if f.is_finite() => *f as i64,
                    other => other.as_int().ok_or_else(|| {
                        Exception::type_error(format!(
                            "%{} format: a real number is required, not {}",
                            conversion,
                            other.type_name()
                        ))
                    })?,
                };
                format_value(&Value::Int(n), &format!("{}d", spec))?
            }
            'x' | 'X' | 'o' => {
                let n = value.as_int().ok_or_else(|| {
                    Exception::type_error(format!(
                        "%{} format: an integer is required, not {}",
                        conversion,
                        value.type_name()
                    ))
                })?;
                format_value(&Value::Int(n), &format!("{}{}", spec, conversion))?
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                let n = value.as_float().ok_or_else(|| {
                    Exception::type_error(format!(
                        "must be real number, not {}",
                        value.type_name()
                    ))
                })?;
                format_value(
                    &Value::Float(n),
                    &format!("{}{}{}", spec, precision, conversion),
                )?
            }
            'c' => {
                let c = match &value {
                    Value::Str(text) if text.chars().count() == 1 => text.to_string(),
                    other => {
                        let n = other
                            .as_int()
                            .ok_or_else(|| Exception::type_error("%c requires int or char"))?;
                        code_point(n)?.to_string()
                    }
                };
                format_value(&Value::from(c), &format!("{}{}", align, width))?
            }
            other => {
                return Err(Exception::value_error(format!(
                    "unsupported format character '{}' (0x{:x}) at index {}",
                    other,
                    other as u32,
                    i - 1
                )))
            }
        };
        s.push_str(&text);
    }

    if values.next().is_some() {
        return Err(Exception::type_error(
            "not all arguments converted during string formatting",
        ));
    }

    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fmt(value: Value, spec: &str) -> String {
        format_value(&value, spec).unwrap()
    }

    #[test]
    fn float_reprs() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(-0.0), "-0.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float_repr(2.5), "2.5");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.5e-5), "1.5e-05");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(1.23e100), "1.23e+100");
        assert_eq!(float_repr(f64::INFINITY), "inf");
        assert_eq!(float_repr(f64::NAN), "nan");
        assert_eq!(float_repr(1e15 + 0.3), "1000000000000000.2");
        assert_eq!(float_repr(-123.456), "-123.456");
        assert_eq!(float_repr(9007199254740993.0), "9007199254740992.0");
        assert_eq!(float_repr(1e-5), "1e-05");
        assert_eq!(float_repr(0.00012), "0.00012");
        assert_eq!(float_repr(f64::MAX), "1.7976931348623157e+308");
        assert_eq!(float_repr(5e-324), "5e-324");
    }

    #[test]
    fn strings() {
        assert_eq!(fmt("ab".into(), ">5"), "   ab");
        assert_eq!(fmt("ab".into(), "*^6"), "**ab**");
        assert_eq!(fmt("ab".into(), "5"), "ab   ");
        assert_eq!(fmt("abcdef".into(), ".3"), "abc");
        assert_eq!(
            format_value(&"ab".into(), "d").unwrap_err().message,
            "Unknown format code 'd' for object of type 'str'"
        );
    }

    #[test]
    fn integers() {
        assert_eq!(fmt(Value::Int(42), "5"), "   42");
        assert_eq!(fmt(Value::Int(42), "05"), "00042");
        assert_eq!(fmt(Value::Int(-42), "05"), "-0042");
        assert_eq!(fmt(Value::Int(42), "+d"), "+42");
        assert_eq!(fmt(Value::Int(1234567), ","), "1,234,567");
        assert_eq!(fmt(Value::Int(255), "x"), "ff");
        assert_eq!(fmt(Value::Int(255), "#X"), "0XFF");
        assert_eq!(fmt(Value::Int(5), "08b"), "00000101");
        assert_eq!(fmt(Value::Int(3), ".2f"), "3.00");
        assert_eq!(fmt(Value::Bool(true), "d"), "1");
        assert_eq!(fmt(Value::Int(65), "c"), "A");
        assert_eq!(
            format_value(&Value::Int(1), ".2").unwrap_err().message,
            "Precision not allowed in integer format specifier"
        );
    }

    #[test]
    fn floats() {
        assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Value::Float(3.14159), "8.3f"), "   3.142");
        assert_eq!(fmt(Value::Float(-1.5), "+.1f"), "-1.5");
        assert_eq!(fmt(Value::Float(1234.5), ",.1f"), "1,234.5");
        assert_eq!(fmt(Value::Float(0.25), ".0%"), "25%");
        assert_eq!(fmt(Value::Float(12345.678), ".2e"), "1.23e+04");
        assert_eq!(fmt(Value::Float(12345.678), "g"), "12345.7");
        assert_eq!(fmt(Value::Float(0.00001234), "g"), "1.234e-05");
        assert_eq!(fmt(Value::Float(1.0), ".3"), "1.0");
        assert_eq!(fmt(Value::Float(1234.0), ".2"), "1.2e+03");
        assert_eq!(fmt(Value::Float(2.0), "5"), "  2.0");
        assert_eq!(fmt(Value::Float(f64::INFINITY), "f"), "inf");
        assert_eq!(
            format_value(&Value::Float(1.0), "d").unwrap_err().message,
            "Unknown format code 'd' for object of type 'float'"
        );
    }

    #[test]
    fn other_values() {
        assert_eq!(fmt(Value::None, ""), "None");
        assert_eq!(
            format_value(&Value::list(vec![]), ">3").unwrap_err().message,
            "unsupported format string passed to list.__format__"
        );
        assert_eq!(
            format_value(&Value::Int(1), "z").unwrap_err().message,
            "Unknown format code 'z' for object of type 'int'"
        );
    }

    #[test]
    fn printf_style() {
        let args = Value::tuple(vec![Value::from("x"), Value::Int(5), Value::Float(2.5)]);
        assert_eq!(
            percent_format("%s=%03d (%.2f) 100%%", &args).unwrap(),
            "x=005 (2.50) 100%"
        );
        let args = Value::tuple(vec!["ab".into(), Value::Int(7)]);
        assert_eq!(percent_format("[%5s|%-4d]", &args).unwrap(), "[   ab|7   ]");
        assert_eq!(percent_format("%r", &Value::from("q")).unwrap(), "'q'");
        assert_eq!(
            percent_format("%d %d", &Value::Int(1)).unwrap_err().message,
            "not enough arguments for format string"
        );
        assert_eq!(
            percent_format("hi", &Value::Int(1)).unwrap_err().message,
            "not all arguments converted during string formatting"
        );

        assert_eq!(percent_format("%c%c", &Value::tuple(vec![Value::Int(65), "b".into()])).unwrap(), "Ab");
        let wide = percent_format("%c", &Value::Int((1 << 32) + 65)).unwrap_err();
        assert_eq!(wide.kind, ExceptionKind::OverflowError);
        assert_eq!(wide.message, "%c arg not in range(0x110000)");
        assert!(percent_format("%c", &Value::Int(-1)).is_err());
        assert!(format_value(&Value::Int(0x110000), "c").is_err());
    }
}
