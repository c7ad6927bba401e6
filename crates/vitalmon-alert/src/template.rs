//! Alert message templates.
//!
//! Placeholders are written as `{name}`; `{{` and `}}` produce literal braces.
//! Every placeholder is resolved when the template is parsed, so rendering
//! is infallible.

use vitalmon_common::types::{Indicator, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Rule name
    Rule,
    AlertType,
    Level,
    /// Indicator name(s) that caused the match
    Indicator,
    /// Observed value(s)
    Value,
    /// Threshold description
    Threshold,
    /// Unit of the first matched indicator
    Unit,
    /// Observed reading of a specific indicator referenced by the rule
    Reading(Indicator),
}

impl Placeholder {
    fn resolve(name: &str, referenced: &[Indicator]) -> Option<Self> {
        match name {
            "rule" | "name" => Some(Self::Rule),
            "alert_type" => Some(Self::AlertType),
            "level" | "severity" => Some(Self::Level),
            "indicator" => Some(Self::Indicator),
            "value" => Some(Self::Value),
            "threshold" => Some(Self::Threshold),
            "unit" => Some(Self::Unit),
            other => {
                let ind: Indicator = other.parse().ok()?;
                referenced.contains(&ind).then_some(Self::Reading(ind))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    Unresolved(String),
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Values available when rendering a message for one rule match.
pub struct TemplateContext<'a> {
    pub rule: &'a str,
    pub alert_type: &'a str,
    pub level: &'a str,
    pub indicator: &'a str,
    pub value: &'a str,
    pub threshold: &'a str,
    pub unit: &'a str,
    pub readings: &'a [(Indicator, Reading)],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Parses `source`. Per-indicator placeholders such as `{heart_rate}` are
    /// only accepted for indicators in `referenced`, since those are the only
    /// ones guaranteed to be present when the rule matches.
    pub fn parse(source: &str, referenced: &[Indicator]) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        if n == '{' {
                            return Err(TemplateError::Malformed(format!(
                                "nested '{{' inside placeholder '{name}'"
                            )));
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(TemplateError::Malformed(format!(
                            "unclosed placeholder '{{{name}'"
                        )));
                    }
                    let name = name.trim();
                    let placeholder = Placeholder::resolve(name, referenced)
                        .ok_or_else(|| TemplateError::Unresolved(name.to_string()))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(placeholder));
                }
                '}' => {
                    return Err(TemplateError::Malformed(
                        "unmatched '}' (use '}}' for a literal brace)".to_string(),
                    ));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder(p) => match p {
                    Placeholder::Rule => out.push_str(ctx.rule),
                    Placeholder::AlertType => out.push_str(ctx.alert_type),
                    Placeholder::Level => out.push_str(ctx.level),
                    Placeholder::Indicator => out.push_str(ctx.indicator),
                    Placeholder::Value => out.push_str(ctx.value),
                    Placeholder::Threshold => out.push_str(ctx.threshold),
                    Placeholder::Unit => out.push_str(ctx.unit),
                    Placeholder::Reading(ind) => {
                        if let Some((_, reading)) = ctx.readings.iter().find(|(i, _)| i == ind) {
                            out.push_str(&reading.to_string());
                        }
                    }
                },
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(readings: &'a [(Indicator, Reading)]) -> TemplateContext<'a> {
        TemplateContext {
            rule: "Hypertension",
            alert_type: "blood_pressure",
            level: "high",
            indicator: "systolic_pressure",
            value: "160",
            threshold: "systolic_pressure > 140",
            unit: "mmHg",
            readings,
        }
    }

    #[test]
    fn renders_placeholders_and_escapes() {
        let t = MessageTemplate::parse(
            "{rule}: {indicator}={value}{unit} ({threshold}) {{raw}}",
            &[Indicator::SystolicPressure],
        )
        .unwrap();
        assert_eq!(
            t.render(&ctx(&[])),
            "Hypertension: systolic_pressure=160mmHg (systolic_pressure > 140) {raw}"
        );
    }

    #[test]
    fn renders_referenced_indicator_reading() {
        let t = MessageTemplate::parse(
            "BP {systolic_pressure}/{diastolic_pressure}",
            &[Indicator::SystolicPressure, Indicator::DiastolicPressure],
        )
        .unwrap();
        let readings = [
            (Indicator::SystolicPressure, Reading::Integer(150)),
            (Indicator::DiastolicPressure, Reading::Integer(95)),
        ];
        assert_eq!(t.render(&ctx(&readings)), "BP 150/95");
    }

    #[test]
    fn unknown_placeholder_is_unresolved() {
        let err = MessageTemplate::parse("{patient_name}", &[]).unwrap_err();
        assert_eq!(err, TemplateError::Unresolved("patient_name".into()));
    }

    #[test]
    fn unreferenced_indicator_is_unresolved() {
        let err = MessageTemplate::parse("HR {heart_rate}", &[Indicator::SystolicPressure])
            .unwrap_err();
        assert_eq!(err, TemplateError::Unresolved("heart_rate".into()));
    }

    #[test]
    fn unbalanced_braces_are_malformed() {
        assert!(matches!(
            MessageTemplate::parse("value {value", &[]),
            Err(TemplateError::Malformed(_))
        ));
        assert!(matches!(
            MessageTemplate::parse("value }", &[]),
            Err(TemplateError::Malformed(_))
        ));
    }
}
