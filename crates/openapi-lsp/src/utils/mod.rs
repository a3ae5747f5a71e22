//! URI and text utility functions

use crate::errors::CoordinatorError;
use lsp_server::{RequestId, Response};
use lsp_types::{Position, Url};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Extensions of literate (markdown hosted) specification documents.
pub const LITERATE_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Cast an LSP request to a specific type
pub fn cast_request<R>(
    req: lsp_server::Request,
) -> Result<(RequestId, R::Params), (RequestId, serde_json::Error)>
where
    R: lsp_types::request::Request,
    R::Params: DeserializeOwned,
{
    match serde_json::from_value::<R::Params>(req.params) {
        Ok(params) => Ok((req.id, params)),
        Err(e) => Err((req.id, e)),
    }
}

/// Cast an LSP notification to its parameters
pub fn cast_notification<N>(not: lsp_server::Notification) -> Result<N::Params, serde_json::Error>
where
    N: lsp_types::notification::Notification,
    N::Params: DeserializeOwned,
{
    serde_json::from_value::<N::Params>(not.params)
}

/// Create an error response for invalid requests
pub fn create_error_response(id: RequestId, message: &str) -> Response {
    Response {
        id,
        result: None,
        error: Some(lsp_server::ResponseError {
            code: lsp_server::ErrorCode::InvalidParams as i32,
            message: message.to_string(),
            data: None,
        }),
    }
}

/// Normalizes a document URI so that one file always maps to one key.
///
/// An escaped drive colon (`%3A`) is decoded and the drive letter is
/// lower-cased: `file:///C%3A/specs/Pets.json` becomes
/// `file:///c:/specs/Pets.json`. The rest of the path keeps its casing.
pub fn normalize_uri(uri: &Url) -> Url {
    let raw = uri.as_str();
    let decoded = if raw.contains("%3A") || raw.contains("%3a") {
        raw.replacen("%3A", ":", 1).replacen("%3a", ":", 1)
    } else {
        raw.to_string()
    };
    let mut normalized = match Url::parse(&decoded) {
        Ok(url) => url,
        Err(_) => uri.clone(),
    };
    lowercase_drive_letter(&mut normalized);
    normalized
}

/// Parses and normalizes a URI string coming from the editor or the engine.
pub fn parse_uri(raw: &str) -> Result<Url, CoordinatorError> {
    let url = Url::parse(raw).map_err(|e| CoordinatorError::InvalidUri {
        uri: raw.to_string(),
        message: e.to_string(),
    })?;
    Ok(normalize_uri(&url))
}

fn lowercase_drive_letter(url: &mut Url) {
    let path = url.path();
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_uppercase() && bytes[2] == b':' {
        let lowered = format!("/{}{}", path[1..2].to_ascii_lowercase(), &path[2..]);
        url.set_path(&lowered);
    }
}

/// Returns the folder containing `uri`, with a trailing slash.
pub fn folder_of(uri: &Url) -> Url {
    uri.join(".").unwrap_or_else(|_| uri.clone())
}

/// Location of the configuration generated for a document that has none.
///
/// The file lives "inside" a pseudo-folder named after the document, so each
/// document gets its own: `file:///x/pets.json` maps to
/// `file:///x/pets.json/readme.md`.
pub fn synthesized_config_uri(document: &Url) -> Result<Url, CoordinatorError> {
    let raw = format!("{}/readme.md", document.as_str().trim_end_matches('/'));
    let config = Url::parse(&raw)
        .map_err(|e| CoordinatorError::InvalidUri { uri: raw.clone(), message: e.to_string() })?;
    Ok(normalize_uri(&config))
}

/// Lower-cased extension of the last path segment, without the dot.
pub fn extension_of(uri: &Url) -> Option<String> {
    let file_name = uri.path_segments()?.last()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

pub fn is_literate_extension(extension: &str) -> bool {
    LITERATE_EXTENSIONS.contains(&extension)
}

/// Path of the structured `.json` twin of a literate document on disk.
pub fn shadow_file_path(uri: &Url) -> Option<PathBuf> {
    let extension = extension_of(uri)?;
    if !is_literate_extension(&extension) {
        return None;
    }
    let path = uri.to_file_path().ok()?;
    Some(path.with_extension("json"))
}

/// URI to hand back to the editor; `untitled://x` is reported as `untitled:x`.
pub fn editor_uri(uri: &Url) -> Url {
    let raw = uri.as_str();
    match raw.strip_prefix("untitled://") {
        Some(rest) => Url::parse(&format!("untitled:{rest}")).unwrap_or_else(|_| uri.clone()),
        None => uri.clone(),
    }
}

/// Convert a byte offset to a position in text
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 0;
    let mut character = 0;

    for (idx, ch) in text.char_indices() {
        if idx >= offset {
            break;
        }

        if ch == '\n' {
            line += 1;
            character = 0;
        } else {
            character += 1;
        }
    }

    Position { line, character }
}

/// Text of the given 0-based line, if present.
pub fn line_at(text: &str, line: u32) -> Option<&str> {
    text.lines().nth(line as usize)
}
