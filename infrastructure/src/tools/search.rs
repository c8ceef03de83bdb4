//! Search tool: find_files

use glob::glob;
use ragops_application::{HostTool, HostToolError};
use ragops_domain::{ParameterField, ParameterSchema};
use serde_json::Value;
use std::path::Path;

pub const FIND_FILES: &str = "find_files";

/// Maximum number of results to return
const MAX_RESULTS: usize = 500;

/// Finds files by name under a directory tree.
pub struct FindFilesTool;

impl HostTool for FindFilesTool {
    fn name(&self) -> &str {
        FIND_FILES
    }

    fn description(&self) -> &str {
        "Find files whose name matches a regex, searching a directory tree recursively. Matching is case-insensitive. Use include to restrict the walk to a file glob."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object(&[
            ParameterField::new("pattern", "Regex matched against file names", true),
            ParameterField::new(
                "base_dir",
                "Directory to search from (default: current dir)",
                false,
            ),
            ParameterField::new(
                "include",
                "File glob restricting which files are considered (e.g. '*.py')",
                false,
            ),
        ])
    }

    fn call(&self, arguments: &Value) -> Result<Value, HostToolError> {
        let pattern = arguments
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| HostToolError::new("missing required parameter 'pattern'"))?;
        let base_dir = arguments
            .get("base_dir")
            .and_then(Value::as_str)
            .unwrap_or(".");
        let include = arguments
            .get("include")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("*");

        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| HostToolError::new(format!("Invalid pattern '{}': {}", pattern, e)))?;

        let base = Path::new(base_dir);
        if !base.is_dir() {
            return Err(HostToolError::new(format!(
                "'{}' is not a directory",
                base_dir
            )));
        }

        // `**` also matches zero components, so base-level files are included.
        let walk = glob(&format!("{}/**/{}", base_dir, include))
            .map_err(|e| HostToolError::new(format!("Invalid include glob '{}': {}", include, e)))?;

        let mut results = Vec::new();
        let mut truncated = false;
        for path in walk.flatten() {
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };
            if regex.is_match(&name) {
                if results.len() >= MAX_RESULTS {
                    truncated = true;
                    break;
                }
                results.push(path.display().to_string());
            }
        }

        let mut output = if results.is_empty() {
            "No files found matching the pattern".to_string()
        } else {
            results.join("\n")
        };
        if truncated {
            output.push_str(&format!("\n... (limited to {} results)", MAX_RESULTS));
        }

        Ok(Value::String(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_find_files_matches_names_recursively() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("notes.md"), "").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub").join("more_notes.md"), "").unwrap();
        fs::write(temp_dir.path().join("data.csv"), "").unwrap();

        let result = FindFilesTool
            .call(&json!({
                "pattern": r"\.md$",
                "base_dir": temp_dir.path().to_str().unwrap(),
            }))
            .unwrap();
        let output = result.as_str().unwrap();

        assert!(output.contains("notes.md"));
        assert!(output.contains("more_notes.md"));
        assert!(!output.contains("data.csv"));
    }

    #[test]
    fn test_find_files_is_case_insensitive() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("README"), "").unwrap();

        let result = FindFilesTool
            .call(&json!({
                "pattern": "readme",
                "base_dir": temp_dir.path().to_str().unwrap(),
            }))
            .unwrap();

        assert!(result.as_str().unwrap().contains("README"));
    }

    #[test]
    fn test_find_files_include_restricts_walk() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("notes.md"), "").unwrap();
        fs::write(temp_dir.path().join("script.py"), "").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub").join("util.py"), "").unwrap();

        let result = FindFilesTool
            .call(&json!({
                "pattern": ".",
                "base_dir": temp_dir.path().to_str().unwrap(),
                "include": "*.py",
            }))
            .unwrap();
        let output = result.as_str().unwrap();

        assert!(output.contains("script.py"));
        assert!(output.contains("util.py"));
        assert!(!output.contains("notes.md"));
    }

    #[test]
    fn test_find_files_no_matches() {
        let temp_dir = tempfile::tempdir().unwrap();

        let result = FindFilesTool
            .call(&json!({
                "pattern": "missing",
                "base_dir": temp_dir.path().to_str().unwrap(),
            }))
            .unwrap();

        assert_eq!(result, json!("No files found matching the pattern"));
    }

    #[test]
    fn test_find_files_invalid_regex() {
        let error = FindFilesTool
            .call(&json!({"pattern": "[invalid", "base_dir": "."}))
            .unwrap_err();

        assert!(error.to_string().contains("Invalid pattern"));
    }

    #[test]
    fn test_find_files_missing_directory() {
        let error = FindFilesTool
            .call(&json!({"pattern": "x", "base_dir": "/nonexistent/dir"}))
            .unwrap_err();

        assert!(error.to_string().contains("not a directory"));
    }
}
