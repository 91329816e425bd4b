//! Placeholder substitution for subjects and bodies.
//!
//! Plain token replacement: `{{ name }}` is replaced by the value of `name`
//! from the first variable scope that defines it. Tokens with no value are
//! kept verbatim, braces included.

use std::collections::BTreeMap;

/// Template variables keyed by placeholder name.
pub type Variables = BTreeMap<String, String>;

/// Placeholders the storefront knows how to fill.
pub const KNOWN_PLACEHOLDERS: [&str; 10] = [
    "customer_first_name",
    "order_id",
    "product_name",
    "price",
    "variant",
    "size",
    "color",
    "qty",
    "cart_recovery_url",
    "cta_url",
];

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replace every resolvable placeholder in `template`.
///
/// `scopes` are searched in order; earlier scopes win.
#[must_use]
pub fn render(template: &str, scopes: &[&Variables]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let token = &rest[start..start + OPEN.len() + end + CLOSE.len()];
        let name = after_open[..end].trim();
        match lookup(name, scopes) {
            Some(value) if is_name(name) => out.push_str(value),
            _ => out.push_str(token),
        }
        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

/// Names of all well-formed placeholders referenced by `template`, in order
/// of first appearance.
#[must_use]
pub fn referenced(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        let name = after_open[..end].trim();
        if is_name(name) && !names.contains(&name) {
            names.push(name);
        }
        rest = &after_open[end + CLOSE.len()..];
    }
    names
}

fn lookup<'a>(name: &str, scopes: &[&'a Variables]) -> Option<&'a str> {
    scopes
        .iter()
        .find_map(|scope| scope.get(name))
        .map(String::as_str)
}

fn is_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn should_replace_known_placeholder() {
        let v = vars(&[("customer_first_name", "Ada")]);
        assert_eq!(render("Hi {{customer_first_name}}!", &[&v]), "Hi Ada!");
    }

    #[test]
    fn should_tolerate_whitespace_inside_braces() {
        let v = vars(&[("order_id", "1042")]);
        assert_eq!(render("Order {{ order_id }}", &[&v]), "Order 1042");
    }

    #[test]
    fn should_leave_unresolved_placeholder_verbatim() {
        let v = vars(&[("price", "9.99")]);
        assert_eq!(
            render("{{product_name}} costs {{price}}", &[&v]),
            "{{product_name}} costs 9.99"
        );
    }

    #[test]
    fn should_keep_unterminated_token_as_is() {
        let v = vars(&[("qty", "2")]);
        assert_eq!(render("Qty {{qty}} and {{size", &[&v]), "Qty 2 and {{size");
    }

    #[test]
    fn should_prefer_earlier_scope() {
        let recipient = vars(&[("cta_url", "https://a.test")]);
        let global = vars(&[("cta_url", "https://b.test"), ("color", "red")]);
        assert_eq!(
            render("{{cta_url}} {{color}}", &[&recipient, &global]),
            "https://a.test red"
        );
    }

    #[test]
    fn should_not_substitute_malformed_names() {
        let v = vars(&[("a b", "x")]);
        assert_eq!(render("{{a b}}", &[&v]), "{{a b}}");
    }

    #[test]
    fn should_render_text_without_placeholders_unchanged() {
        assert_eq!(render("plain text", &[]), "plain text");
        assert_eq!(render("", &[]), "");
    }

    #[test]
    fn should_list_referenced_placeholders_once_in_order() {
        let names = referenced("{{price}} {{qty}} {{ price }} {{bad name}} {{size");
        assert_eq!(names, vec!["price", "qty"]);
    }
}
