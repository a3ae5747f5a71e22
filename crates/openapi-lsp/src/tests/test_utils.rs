//! Shared fixtures for coordinator tests.

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

/// Creates a `file://` URL for testing.
///
/// # Examples
///
/// ```ignore
/// let uri = url("work/pets.json");
/// assert_eq!(uri.as_str(), "file:///work/pets.json");
/// ```
pub fn url(path: &str) -> Url {
    Url::parse(&format!("file:///{}", path)).unwrap()
}

/// Creates an error diagnostic spanning columns 0-10 of `line` (0-based).
pub fn error_diagnostic(message: &str, line: u32) -> Diagnostic {
    Diagnostic {
        range: Range::new(Position::new(line, 0), Position::new(line, 10)),
        severity: Some(DiagnosticSeverity::ERROR),
        message: message.to_string(),
        ..Default::default()
    }
}

/// A configuration document listing `inputs`, with `extra` appended to its
/// YAML block.
pub fn configuration(inputs: &[&str], extra: &str) -> String {
    let mut text = String::from("# Pets\n> see https://aka.ms/autorest\n\n```yaml\ninput-file:\n");
    for input in inputs {
        text.push_str(&format!("  - {input}\n"));
    }
    text.push_str(extra);
    text.push_str("```\n");
    text
}

/// A Swagger 2.0 document whose `Pet` definition has the given properties.
pub fn pets_definition(properties: &[&str]) -> String {
    let properties: Vec<String> = properties
        .iter()
        .map(|name| format!("        \"{name}\": {{ \"type\": \"string\" }}"))
        .collect();
    format!(
        "{{\n  \"swagger\": \"2.0\",\n  \"definitions\": {{\n    \"Pet\": {{\n      \"properties\": {{\n{}\n      }}\n    }}\n  }}\n}}",
        properties.join(",\n")
    )
}
