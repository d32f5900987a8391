use crate::error::SourceError;
use crate::models::Prompt;
use crate::store::PromptStore;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Read prompts from a CSV file, one per row, from the `column` column.
///
/// Rows whose value is empty or whitespace are skipped with a warning and do
/// not consume an index.
pub fn load_from_table(path: &Path, column: &str) -> Result<Vec<Prompt>, SourceError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path_str.clone(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| csv_error(&path_str, e))?;
    let column_index = headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| SourceError::MissingColumn {
            path: path_str.clone(),
            column: column.to_string(),
        })?;

    let mut prompts = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(&path_str, e))?;
        match record.get(column_index).map(str::trim) {
            Some(content) if !content.is_empty() => {
                prompts.push(Prompt::new(prompts.len(), content));
            }
            _ => {
                skipped += 1;
                warn!(path = path_str.as_str(), row = row + 1, "Skipping row with blank prompt");
            }
        }
    }

    info!(
        path = path_str.as_str(),
        loaded = prompts.len(),
        skipped,
        "Loaded prompts from CSV"
    );
    Ok(prompts)
}

/// Read prompts from documents in `collection` that carry a string `field`.
/// Documents without one do not count towards `limit`.
pub async fn load_from_store(
    store: &dyn PromptStore,
    collection: &str,
    field: &str,
    limit: Option<u64>,
) -> Result<Vec<Prompt>, SourceError> {
    let questions = store.fetch_questions(collection, field, limit).await?;

    let prompts: Vec<Prompt> = questions
        .into_iter()
        .filter(|question| !question.trim().is_empty())
        .enumerate()
        .map(|(index, question)| Prompt::new(index, question.trim()))
        .collect();

    info!(collection, loaded = prompts.len(), ?limit, "Loaded prompts from store");
    Ok(prompts)
}

fn csv_error(path: &str, source: csv::Error) -> SourceError {
    SourceError::Csv {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_from_table_in_file_order() {
        let file = csv_file(
            "id,question,category\n1,What is 2+2?,math\n2,\"Name a primary color.\",art\n3,\"Explain, briefly, recursion\",cs\n",
        );

        let prompts = load_from_table(file.path(), "question").unwrap();
        let contents: Vec<_> = prompts.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["What is 2+2?", "Name a primary color.", "Explain, briefly, recursion"]
        );
        assert_eq!(prompts[2].index, 2);
    }

    #[test]
    fn test_load_from_table_missing_column() {
        let file = csv_file("id,prompt\n1,What is 2+2?\n");

        match load_from_table(file.path(), "question") {
            Err(SourceError::MissingColumn { column, .. }) => assert_eq!(column, "question"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_load_from_table_skips_blank_prompts() {
        let file = csv_file("question\nfirst\n\"\"\n   \nsecond\n");

        let prompts = load_from_table(file.path(), "question").unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], Prompt::new(0, "first"));
        assert_eq!(prompts[1], Prompt::new(1, "second"));
    }

    #[test]
    fn test_load_from_table_short_row() {
        let file = csv_file("id,question\n1,kept\n2\n");

        let prompts = load_from_table(file.path(), "question").unwrap();
        assert_eq!(prompts.len(), 1);
    }

    #[test]
    fn test_load_from_table_missing_file() {
        let result = load_from_table(Path::new("/nonexistent/prompts.csv"), "question");
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }

    #[tokio::test]
    async fn test_load_from_store_with_limit() {
        let store = MemoryStore::new().with_prompt_documents(
            "raw_prompts",
            vec![
                json!({"_id": 1, "source": "no question"}),
                json!({"_id": 2, "question": "What is 2+2?"}),
                json!({"_id": 3, "question": "Name a primary color."}),
                json!({"_id": 4, "question": "Third"}),
            ],
        );

        let prompts = load_from_store(&store, "raw_prompts", "question", Some(2))
            .await
            .unwrap();
        assert_eq!(
            prompts,
            vec![
                Prompt::new(0, "What is 2+2?"),
                Prompt::new(1, "Name a primary color.")
            ]
        );
    }

    #[tokio::test]
    async fn test_load_from_store_without_limit() {
        let store = MemoryStore::new().with_prompt_documents(
            "raw_prompts",
            vec![json!({"question": "a"}), json!({"question": "b"}), json!({"other": 1})],
        );

        let prompts = load_from_store(&store, "raw_prompts", "question", None)
            .await
            .unwrap();
        assert_eq!(prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_load_from_store_unavailable() {
        let store = MemoryStore::unavailable();
        let result = load_from_store(&store, "raw_prompts", "question", None).await;
        assert!(matches!(result, Err(SourceError::Store(_))));
    }
}
