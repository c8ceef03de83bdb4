//! File tools: read_file, list_directory

use ragops_application::{HostTool, HostToolError};
use ragops_domain::{ParameterField, ParameterSchema};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const READ_FILE: &str = "read_file";
pub const LIST_DIRECTORY: &str = "list_directory";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum lines returned per read; longer files are paged via `offset`.
const MAX_READ_LINES: usize = 2000;

fn require_str<'a>(arguments: &'a Value, name: &str) -> Result<&'a str, HostToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| HostToolError::new(format!("missing required parameter '{}'", name)))
}

/// Reads a text file as numbered lines, paged by offset and limit.
pub struct ReadFileTool;

impl HostTool for ReadFileTool {
    fn name(&self) -> &str {
        READ_FILE
    }

    fn description(&self) -> &str {
        "Read a text file, returning numbered lines. Use offset and limit to page through large files."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object(&[
            ParameterField::new("path", "Path to the file to read", true),
            ParameterField::new("offset", "Line number to start reading from (1-indexed)", false)
                .with_type("integer"),
            ParameterField::new("limit", "Maximum number of lines to read", false)
                .with_type("integer"),
        ])
    }

    fn call(&self, arguments: &Value) -> Result<Value, HostToolError> {
        let path_str = require_str(arguments, "path")?;
        let path = Path::new(path_str);

        if !path.exists() {
            return Err(HostToolError::new(format!("File not found: {}", path_str)));
        }
        if !path.is_file() {
            return Err(HostToolError::new(format!("'{}' is not a file", path_str)));
        }

        let metadata = fs::metadata(path)
            .map_err(|e| HostToolError::new(format!("Failed to get file metadata: {}", e)))?;
        if metadata.len() > MAX_READ_SIZE {
            return Err(HostToolError::new(format!(
                "File too large ({} bytes). Maximum size is {} bytes",
                metadata.len(),
                MAX_READ_SIZE
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                HostToolError::new(format!("Permission denied: {}", path_str))
            }
            std::io::ErrorKind::InvalidData => {
                HostToolError::new(format!("'{}' is not valid UTF-8 text", path_str))
            }
            _ => HostToolError::new(format!("Failed to read file: {}", e)),
        })?;

        let offset = arguments
            .get("offset")
            .and_then(Value::as_i64)
            .unwrap_or(1)
            .max(1) as usize;
        let limit = arguments
            .get("limit")
            .and_then(Value::as_i64)
            .map(|l| l.clamp(1, MAX_READ_LINES as i64) as usize)
            .unwrap_or(MAX_READ_LINES);

        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();

        if offset > total {
            return Ok(Value::String(format!(
                "File has {} lines, offset {} is past the end",
                total, offset
            )));
        }

        let end = (offset - 1 + limit).min(total);
        let mut output = String::new();
        for (i, line) in lines[offset - 1..end].iter().enumerate() {
            let _ = writeln!(output, "{:>5} {}", offset + i, line);
        }
        if end < total {
            let _ = write!(
                output,
                "... ({} more lines, continue with offset={})",
                total - end,
                end + 1
            );
        } else {
            // Drop the trailing newline from the last writeln.
            output.truncate(output.trim_end_matches('\n').len());
        }

        Ok(Value::String(output))
    }
}

/// Lists a directory's entries, directories first.
pub struct ListDirectoryTool;

impl HostTool for ListDirectoryTool {
    fn name(&self) -> &str {
        LIST_DIRECTORY
    }

    fn description(&self) -> &str {
        "List the entries of a directory. Directories come first with a trailing slash, files with their size."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object(&[ParameterField::new(
            "path",
            "Path to the directory to list",
            true,
        )])
    }

    fn call(&self, arguments: &Value) -> Result<Value, HostToolError> {
        let path_str = require_str(arguments, "path")?;
        let path = Path::new(path_str);

        if !path.exists() {
            return Err(HostToolError::new(format!(
                "Directory not found: {}",
                path_str
            )));
        }
        if !path.is_dir() {
            return Err(HostToolError::new(format!(
                "'{}' is not a directory",
                path_str
            )));
        }

        let entries = fs::read_dir(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                HostToolError::new(format!("Permission denied: {}", path_str))
            }
            _ => HostToolError::new(format!("Failed to list directory: {}", e)),
        })?;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut unreadable = 0usize;

        for entry in entries {
            let Ok(entry) = entry else {
                unreadable += 1;
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.metadata() {
                Ok(meta) if meta.is_dir() => dirs.push(format!("{}/", name)),
                Ok(meta) => files.push(format!("{} ({} bytes)", name, meta.len())),
                Err(_) => {
                    unreadable += 1;
                }
            }
        }

        dirs.sort();
        files.sort();

        let mut listing: Vec<String> = dirs;
        listing.extend(files);

        let mut output = if listing.is_empty() {
            "Directory is empty".to_string()
        } else {
            listing.join("\n")
        };
        if unreadable > 0 {
            let _ = write!(output, "\n({} entries could not be read)", unreadable);
        }

        Ok(Value::String(output))
    }
}
