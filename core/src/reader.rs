use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// JSON with comments and trailing commas.
    Jsonc,
    /// Apple property list (XML).
    Plist,
    Yaml,
    /// Legacy CoffeeScript object notation. Recognised but not decoded.
    Cson,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Jsonc => "jsonc",
            FileFormat::Plist => "plist",
            FileFormat::Yaml => "yaml",
            FileFormat::Cson => "cson",
        }
    }

    /// Pick a format by file extension, falling back to sniffing the start
    /// of the content: binary plist magic, then the first non-whitespace
    /// character.
    pub fn detect(path: &Path, content: &[u8]) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json" | "jsonc" | "code-snippets") => return FileFormat::Jsonc,
            Some("tmlanguage" | "tmtheme" | "plist" | "xml") => return FileFormat::Plist,
            Some("yaml" | "yml") => return FileFormat::Yaml,
            Some("cson") => return FileFormat::Cson,
            _ => {}
        }
        if content.starts_with(BINARY_PLIST_MAGIC) {
            return FileFormat::Plist;
        }
        let text = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        match text.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => FileFormat::Jsonc,
            Some(b'<') => FileFormat::Plist,
            _ => FileFormat::Yaml,
        }
    }
}

const BINARY_PLIST_MAGIC: &[u8] = b"bplist";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---------------------------------------------------------------------------
// Reader trait
// ---------------------------------------------------------------------------

/// Reads a structured file relative to a base location and decodes it into a
/// JSON value tree.
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, base: &Path, relative: Option<&str>) -> Result<Value>;
}

/// Filesystem reader that decodes JSONC, PList and YAML.
#[derive(Debug, Default, Clone)]
pub struct FsFileReader;

impl FsFileReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileReader for FsFileReader {
    async fn read(&self, base: &Path, relative: Option<&str>) -> Result<Value> {
        let path = match relative {
            Some(rel) => join_normalized(base, rel),
            None => base.to_path_buf(),
        };
        let bytes = tokio::fs::read(&path).await.map_err(|source| BridgeError::Read {
            path: path.clone(),
            source,
        })?;
        decode(&path, &bytes)
    }
}

/// Decode `content` according to the format detected for `path`. Plists
/// are decoded from the raw bytes (XML or binary); text formats must be
/// valid UTF-8.
pub fn decode(path: &Path, content: &[u8]) -> Result<Value> {
    let format = FileFormat::detect(path, content);
    let decode_err = |message: String| BridgeError::Decode {
        path: path.to_path_buf(),
        format: format.as_str(),
        message,
    };
    let text = || {
        std::str::from_utf8(content)
            .map(|s| s.trim_start_matches('\u{feff}'))
            .map_err(|e| decode_err(e.to_string()))
    };

    match format {
        FileFormat::Jsonc => {
            let cleaned = strip_trailing_commas(&strip_jsonc_comments(text()?));
            serde_json::from_str(&cleaned).map_err(|e| decode_err(e.to_string()))
        }
        FileFormat::Plist => {
            plist::from_bytes::<Value>(content).map_err(|e| decode_err(e.to_string()))
        }
        FileFormat::Yaml => {
            serde_yaml::from_str::<Value>(text()?).map_err(|e| decode_err(e.to_string()))
        }
        FileFormat::Cson => Err(BridgeError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Join `relative` onto `base` and collapse `.` and `..` lexically, so the
/// same file always yields the same path.
pub fn join_normalized(base: &Path, relative: &str) -> PathBuf {
    normalize(&base.join(relative))
}

pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// JSONC
// ---------------------------------------------------------------------------

/// Strip `//` and `/* */` comments outside of string literals. Newlines are
/// kept so decoder error positions still line up.
pub fn strip_jsonc_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                result.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    chars.next();
                    for nc in chars.by_ref() {
                        if nc == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for nc in chars.by_ref() {
                        if prev == '*' && nc == '/' {
                            break;
                        }
                        if nc == '\n' {
                            result.push('\n');
                        }
                        prev = nc;
                    }
                }
                _ => result.push(c),
            },
            _ => result.push(c),
        }
    }

    result
}

/// Drop commas that directly precede `}` or `]` (ignoring whitespace).
pub fn strip_trailing_commas(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut result = String::with_capacity(content.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            result.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    result.push(next);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                result.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}' | ']')) {
                    result.push(c);
                }
            }
            _ => result.push(c),
        }
        i += 1;
    }

    result
}
