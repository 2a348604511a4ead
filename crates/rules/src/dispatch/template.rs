//! `{n}` placeholder rendering for ticket descriptions and messages.

use crate::evaluator::InputValues;

/// Shown for a placeholder whose input was not found for the entity.
pub const MISSING: &str = "N/A";

/// Replace every `{n}` with the value of input `I<n>`. Braces that do not
/// enclose a plain index are kept verbatim.
pub fn render(template: &str, inputs: &InputValues) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after
            .find('}')
            .map(|close| (&after[..close], close))
            .filter(|(index, _)| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()));
        match placeholder {
            Some((index, close)) => {
                match index.parse::<u32>().ok().and_then(|n| inputs.get(n)) {
                    Some(value) => out.push_str(&value.to_string()),
                    None => out.push_str(MISSING),
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use vigil_core::Value;

    use super::*;

    fn inputs() -> InputValues {
        [(0, Value::Number(22.5)), (2, Value::Text("Room 101".to_string()))]
            .into_iter()
            .collect()
    }

    #[test]
    fn replaces_indexed_placeholders() {
        assert_eq!(
            render("{2} is at {0} degrees", &inputs()),
            "Room 101 is at 22.5 degrees"
        );
    }

    #[test]
    fn unknown_inputs_render_as_missing() {
        assert_eq!(render("humidity {1}%", &inputs()), "humidity N/A%");
    }

    #[test]
    fn other_braces_are_left_alone() {
        assert_eq!(render("{name} {} {0", &inputs()), "{name} {} {0");
        assert_eq!(render("{{0}}", &inputs()), "{22.5}");
        assert_eq!(render("no placeholders", &inputs()), "no placeholders");
    }
}
