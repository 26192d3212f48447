//! The three tools of the file assistant.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::schema::{parse_args, schema_for};
use super::{Tool, ToolError, ToolRegistry, ToolResult};
use crate::document;
use crate::translate::Translator;
use crate::writer::FileWriter;

pub const READ_LOCAL_FILE: &str = "read_local_file";
pub const UNIVERSAL_TRANSLATOR: &str = "universal_translator";
pub const SAVE_TO_FOLDER: &str = "save_to_folder";

/// Builds the registry holding the three file-assistant tools.
pub fn registry(translator: Translator, writer: FileWriter) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadLocalFileTool))?;
    registry.register(Arc::new(TranslatorTool::new(translator)))?;
    registry.register(Arc::new(SaveToFolderTool::new(writer)))?;
    Ok(registry)
}

fn invalid(err: ToolError) -> ToolResult {
    ToolResult::error(format!("Error: {}", err))
}

fn outcome(result: Result<String, String>) -> ToolResult {
    match result {
        Ok(text) => ToolResult::ok(text),
        Err(text) => ToolResult::error(text),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadFileArgs {
    /// Full local path of the file; .txt, .md, .pdf and .docx are supported
    file_path: String,
}

/// Reads plain text, PDF and Word documents.
#[derive(Debug, Default)]
pub struct ReadLocalFileTool;

#[async_trait]
impl Tool for ReadLocalFileTool {
    fn name(&self) -> &str {
        READ_LOCAL_FILE
    }

    fn description(&self) -> &str {
        "Read the content of a local file. Supported formats: plain text \
         (.txt, .md, .py, .csv, ...), Word documents (.docx) and PDF documents (.pdf)."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<ReadFileArgs>()
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let args: ReadFileArgs = match parse_args(args) {
            Ok(args) => args,
            Err(err) => return invalid(err),
        };

        match tokio::task::spawn_blocking(move || document::try_read(&args.file_path)).await {
            Ok(result) => outcome(result),
            Err(err) => ToolResult::error(format!("Error reading file: {}", err)),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TranslateArgs {
    /// The original text to translate
    text: String,
    /// Target language, e.g. Chinese, English, Japanese
    target_language: String,
}

/// Translates text with the session's completion service.
#[derive(Debug)]
pub struct TranslatorTool {
    translator: Translator,
}

impl TranslatorTool {
    pub fn new(translator: Translator) -> Self {
        Self { translator }
    }
}

#[async_trait]
impl Tool for TranslatorTool {
    fn name(&self) -> &str {
        UNIVERSAL_TRANSLATOR
    }

    fn description(&self) -> &str {
        "A universal translation tool. Whenever the user asks for a translation, \
         use this tool to obtain the translated text."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<TranslateArgs>()
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let args: TranslateArgs = match parse_args(args) {
            Ok(args) => args,
            Err(err) => return invalid(err),
        };
        outcome(
            self.translator
                .try_translate(&args.text, &args.target_language)
                .await,
        )
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SaveArgs {
    /// The text content to save
    content: String,
    /// Name of the folder to create or reuse
    folder_name: String,
    /// File name to save as, including its extension
    filename: String,
}

/// Saves text into a folder on the desktop.
#[derive(Debug)]
pub struct SaveToFolderTool {
    writer: FileWriter,
}

impl SaveToFolderTool {
    pub fn new(writer: FileWriter) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl Tool for SaveToFolderTool {
    fn name(&self) -> &str {
        SAVE_TO_FOLDER
    }

    fn description(&self) -> &str {
        "Save text to a file. Creates the named folder on the desktop if it does \
         not exist and writes the content into it."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<SaveArgs>()
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let args: SaveArgs = match parse_args(args) {
            Ok(args) => args,
            Err(err) => return invalid(err),
        };

        let writer = self.writer.clone();
        let saved = tokio::task::spawn_blocking(move || {
            writer.save_report(&args.content, &args.folder_name, &args.filename)
        })
        .await;

        match saved {
            Ok(result) => outcome(result),
            Err(err) => ToolResult::error(format!("Failed to save file: {}", err)),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> ToolRegistry {
    let base = std::env::temp_dir().join("file-assistant-tests");
    registry(Translator::uninitialized(), FileWriter::new(base)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn schemas_declare_required_fields() {
        let registry = test_registry();
        let defs = registry.definitions();

        let save = defs.iter().find(|d| d.name == SAVE_TO_FOLDER).unwrap();
        let names: Vec<String> = save.fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["content", "folder_name", "filename"]);
        assert!(save.fields().iter().all(|f| f.required && f.kind == "string"));

        let read = defs.iter().find(|d| d.name == READ_LOCAL_FILE).unwrap();
        assert!(read.fields()[0].description.contains(".docx"));
    }

    #[tokio::test]
    async fn read_tool_reports_missing_file_as_error() {
        let result = ReadLocalFileTool
            .execute(json!({"file_path": "/definitely/not/here.txt"}))
            .await;

        assert!(result.is_error());
        assert!(result.into_text().contains("/definitely/not/here.txt"));
    }

    #[tokio::test]
    async fn translator_tool_without_client() {
        let tool = TranslatorTool::new(Translator::uninitialized());

        let result = tool
            .execute(json!({"text": "hi", "target_language": "French"}))
            .await;

        assert_eq!(result, ToolResult::error(crate::translate::NOT_INITIALIZED));
    }

    #[tokio::test]
    async fn save_tool_writes_under_base_dir() {
        let base = TempDir::new().unwrap();
        let tool = SaveToFolderTool::new(FileWriter::new(base.path()));

        let result = tool
            .execute(json!({"content": "Bonjour", "folder_name": "Out", "filename": "fr.txt"}))
            .await;

        assert!(!result.is_error());
        assert!(result.output.contains("[Out]"));
        let written = std::fs::read_to_string(base.path().join("Out").join("fr.txt")).unwrap();
        assert_eq!(written, "Bonjour");
    }
}
