use crate::pattern::{Component, Extraction};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Component(Component),
    FileName,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("命名テンプレートが空です")]
    Empty,
}

pub fn validate_template(input: &str) -> Result<(), TemplateError> {
    parse_template(input).map(|_| ())
}

/// Unknown `{names}` and unbalanced braces are kept as literal text.
pub fn parse_template(input: &str) -> Result<Vec<TemplatePart>, TemplateError> {
    if input.trim().is_empty() {
        return Err(TemplateError::Empty);
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            literal.push('{');
            rest = after;
            break;
        };

        match parse_field(&after[..close]) {
            Some(field) => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(TemplatePart::Field(field));
                rest = &after[close + 1..];
            }
            None => {
                literal.push('{');
                rest = after;
            }
        }
    }
    literal.push_str(rest);

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    Ok(parts)
}

pub fn render_template(parts: &[TemplatePart], extraction: &Extraction, file_name: &str) -> String {
    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Field(Field::FileName) => output.push_str(file_name),
            TemplatePart::Field(Field::Component(component)) => {
                output.push_str(extraction.get(*component).unwrap_or_default())
            }
        }
    }
    output
}

fn parse_field(name: &str) -> Option<Field> {
    if name == "filename" {
        return Some(Field::FileName);
    }
    Component::from_name(name).map(Field::Component)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction() -> Extraction {
        [
            (Component::Year, "2023"),
            (Component::Month, "07"),
            (Component::Day, "28"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parse_template_ok() {
        let parsed = parse_template("{year}-{month}").expect("must parse");
        assert_eq!(
            parsed,
            vec![
                TemplatePart::Field(Field::Component(Component::Year)),
                TemplatePart::Literal("-".to_string()),
                TemplatePart::Field(Field::Component(Component::Month)),
            ]
        );
    }

    #[test]
    fn parse_template_rejects_empty() {
        assert_eq!(parse_template("").expect_err("must fail"), TemplateError::Empty);
        assert_eq!(parse_template("  ").expect_err("must fail"), TemplateError::Empty);
    }

    #[test]
    fn render_is_deterministic_without_residue() {
        let parsed = parse_template("{year}-{month}").expect("must parse");
        let first = render_template(&parsed, &extraction(), "20230728.jpg");
        let second = render_template(&parsed, &extraction(), "20230728.jpg");
        assert_eq!(first, "2023-07");
        assert_eq!(first, second);
        assert!(!first.contains('{'));
    }

    #[test]
    fn render_missing_components_as_empty() {
        let parsed = parse_template("{year}_{hour}{minute}").expect("must parse");
        let rendered = render_template(&parsed, &extraction(), "x.jpg");
        assert_eq!(rendered, "2023_");
    }

    #[test]
    fn render_substitutes_filename() {
        let parsed = parse_template("{year}/{filename}").expect("must parse");
        let rendered = render_template(&parsed, &extraction(), "20230728.jpg");
        assert_eq!(rendered, "2023/20230728.jpg");
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let parsed = parse_template("{year}-{camera}").expect("must parse");
        let rendered = render_template(&parsed, &extraction(), "x.jpg");
        assert_eq!(rendered, "2023-{camera}");
    }

    #[test]
    fn unbalanced_braces_pass_through() {
        let parsed = parse_template("{{year}} {month").expect("must parse");
        let rendered = render_template(&parsed, &extraction(), "x.jpg");
        assert_eq!(rendered, "{2023} {month");
    }
}
