//! A small JSONPath subset: `$`, `.name`, `['name']`, `[n]` and `*`

use crate::engine::JsonPath;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Parses an expression; `None` when it uses anything outside the subset.
pub fn parse(expression: &str) -> Option<Vec<Selector>> {
    let mut rest = expression.trim().strip_prefix('$')?;
    let mut selectors = vec![];

    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            if let Some(after) = after_dot.strip_prefix('*') {
                selectors.push(Selector::Wildcard);
                rest = after;
                continue;
            }
            let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
            if end == 0 {
                return None;
            }
            selectors.push(Selector::Key(after_dot[..end].to_string()));
            rest = &after_dot[end..];
        } else if let Some(inside) = rest.strip_prefix('[') {
            let close = inside.find(']')?;
            let (token, after) = (&inside[..close], &inside[close + 1..]);
            let token = token.trim();
            let selector = if token == "*" {
                Selector::Wildcard
            } else if let Some(quoted) = unquote(token) {
                Selector::Key(quoted.to_string())
            } else {
                Selector::Index(token.parse().ok()?)
            };
            selectors.push(selector);
            rest = after;
        } else {
            return None;
        }
    }
    Some(selectors)
}

fn unquote(token: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if let Some(inner) = token.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return Some(inner);
        }
    }
    None
}

/// Every node matched by `expression`, with its path. `None` for
/// expressions outside the subset.
pub fn query<'a>(document: &'a Value, expression: &str) -> Option<Vec<(JsonPath, &'a Value)>> {
    let selectors = parse(expression)?;
    let mut matches = vec![(JsonPath::root(), document)];

    for selector in &selectors {
        let mut next = vec![];
        for (path, value) in matches {
            match (selector, value) {
                (Selector::Key(key), Value::Object(map)) => {
                    if let Some(child) = map.get(key) {
                        next.push((path.child_key(key), child));
                    }
                }
                (Selector::Index(index), Value::Array(items)) => {
                    if let Some(child) = items.get(*index) {
                        next.push((path.child_index(*index), child));
                    }
                }
                (Selector::Wildcard, Value::Object(map)) => {
                    next.extend(map.iter().map(|(key, child)| (path.child_key(key), child)));
                }
                (Selector::Wildcard, Value::Array(items)) => {
                    next.extend(
                        items.iter().enumerate().map(|(i, child)| (path.child_index(i), child)),
                    );
                }
                _ => {}
            }
        }
        matches = next;
    }
    Some(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("$", vec![]; "root")]
    #[test_case("$.definitions.Pet", vec![Selector::Key("definitions".into()), Selector::Key("Pet".into())]; "dotted")]
    #[test_case("$.paths['/pets'].*", vec![Selector::Key("paths".into()), Selector::Key("/pets".into()), Selector::Wildcard]; "bracketed")]
    #[test_case("$.tags[1]", vec![Selector::Key("tags".into()), Selector::Index(1)]; "index")]
    fn test_parse(expression: &str, expected: Vec<Selector>) {
        assert_eq!(parse(expression), Some(expected));
    }

    #[test_case("definitions.Pet"; "missing root")]
    #[test_case("$..name"; "recursive descent")]
    #[test_case("$.tags[x]"; "bad index")]
    fn test_parse_rejects(expression: &str) {
        assert_eq!(parse(expression), None);
    }

    #[test]
    fn test_query_wildcard_over_object() {
        let document = json!({
            "paths": {
                "/pets": { "get": {}, "post": {} },
                "/stores": { "get": {} }
            }
        });
        let matches = query(&document, "$.paths.*.get").unwrap();
        let paths: Vec<String> = matches.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["$.paths['/pets'].get", "$.paths['/stores'].get"]);
    }
}
