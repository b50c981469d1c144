use std::collections::HashMap;

/// Substitutes `{{ name }}` tokens in `template` with values from `vars`.
///
/// Whitespace inside the braces is ignored, so `{{balance}}` and
/// `{{ balance }}` resolve identically. A token whose name is not in `vars`
/// is replaced with the empty string rather than left literal. Values are
/// inserted as-is; no recursive expansion and no HTML escaping.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some(value) = vars.get(name) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated token: keep the tail verbatim.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_tokens() {
        assert_eq!(render("{{x}}", &vars(&[("x", "5")])), "5");
        assert_eq!(
            render("Dear {{name}}, balance {{balance}}.", &vars(&[("name", "Alice"), ("balance", "KSh 600")])),
            "Dear Alice, balance KSh 600."
        );
    }

    #[test]
    fn ignores_whitespace_in_braces() {
        assert_eq!(render("{{  balance  }}", &vars(&[("balance", "600")])), "600");
    }

    #[test]
    fn unknown_tokens_become_empty() {
        assert_eq!(render("{{missing}}", &vars(&[])), "");
        assert_eq!(render("a{{missing}}b", &vars(&[("x", "1")])), "ab");
    }

    #[test]
    fn empty_template_renders_empty() {
        assert_eq!(render("", &vars(&[("x", "1")])), "");
    }

    #[test]
    fn unterminated_token_passes_through() {
        assert_eq!(render("hello {{name", &vars(&[("name", "x")])), "hello {{name");
    }

    #[test]
    fn no_recursive_expansion() {
        assert_eq!(
            render("{{a}}", &vars(&[("a", "{{b}}"), ("b", "deep")])),
            "{{b}}"
        );
    }

    #[test]
    fn values_are_not_escaped() {
        assert_eq!(
            render("{{v}}", &vars(&[("v", "<b>&</b>")])),
            "<b>&</b>"
        );
    }
}
