//! Literate documents: markdown hosting fenced YAML or JSON blocks

use serde_json::{Map, Value};

/// Marker that identifies a literate configuration document.
pub const CONFIGURATION_MARKER: &str = "see https://aka.ms/autorest";

/// A fenced code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Info string after the opening fence, trimmed
    pub info: String,
    pub content: String,
    /// 0-based line of the first content line
    pub first_line: usize,
}

impl CodeBlock {
    pub fn language(&self) -> &str {
        self.info.split_whitespace().next().unwrap_or("")
    }

    /// Blocks with a condition after the language (`yaml $(tag) == 'x'`)
    /// only apply to specific runs and are skipped.
    pub fn is_conditional(&self) -> bool {
        self.info.split_whitespace().nth(1).is_some()
    }
}

/// Problem while reading a literate or plain document.
#[derive(Debug, Clone, PartialEq)]
pub struct LiterateError {
    pub message: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
}

pub fn is_configuration(content: &str) -> bool {
    content.contains(CONFIGURATION_MARKER)
}

/// Collects the fenced blocks of a markdown document. An unclosed fence runs
/// to the end of the document.
pub fn code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = vec![];
    let mut open: Option<(String, usize, Vec<&str>)> = None;

    for (index, line) in markdown.lines().enumerate() {
        let trimmed = line.trim_start();
        match open.take() {
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    open = Some((info.trim().to_string(), index + 1, vec![]));
                }
            }
            Some((info, first_line, lines)) if trimmed.starts_with("```") => {
                blocks.push(CodeBlock { info, content: lines.join("\n"), first_line });
            }
            Some((info, first_line, mut lines)) => {
                lines.push(line);
                open = Some((info, first_line, lines));
            }
        }
    }
    if let Some((info, first_line, lines)) = open {
        blocks.push(CodeBlock { info, content: lines.join("\n"), first_line });
    }
    blocks
}

/// Merges every unconditional YAML or JSON block into one document.
///
/// Text without any fence is parsed as a whole, so plain JSON and YAML files
/// go through the same path.
pub fn parse_literate(text: &str) -> Result<Value, LiterateError> {
    let blocks = code_blocks(text);
    if blocks.is_empty() {
        return parse_structured(text, 0);
    }
    let mut merged = Value::Object(Map::new());
    for block in blocks {
        if block.is_conditional() || !matches!(block.language(), "yaml" | "json") {
            continue;
        }
        let value = parse_structured(&block.content, block.first_line)?;
        merge_configuration(&mut merged, value);
    }
    Ok(merged)
}

/// Parses YAML (and therefore JSON) text. `line_offset` shifts reported
/// positions for blocks embedded in a larger document.
pub fn parse_structured(text: &str, line_offset: usize) -> Result<Value, LiterateError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yml::from_str::<Value>(text).map_err(|e| {
        let (line, column) = e.location().map(|l| (l.line(), l.column())).unwrap_or((1, 1));
        LiterateError {
            message: e.to_string(),
            line: (line + line_offset) as u32,
            column: column as u32,
        }
    })
}

/// Layers `overlay` onto `base`: mappings merge recursively, sequences
/// concatenate, anything else is replaced.
pub fn merge_configuration(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_configuration(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay),
        (Value::Array(base), value) => base.push(value),
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

/// JSON rendition of a literate document, when it holds a mapping.
pub fn literate_to_json(content: &str) -> Option<String> {
    match parse_literate(content) {
        Ok(value @ Value::Object(_)) => serde_json::to_string_pretty(&value).ok(),
        _ => None,
    }
}
