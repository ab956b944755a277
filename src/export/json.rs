//! JSON import/export of the question collection.
//! Saves and loads a [`Backup`] (questions with their schedule plus the review log).

use crate::error::Result;
use crate::models::Backup;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Exports a backup to a JSON file at the specified path.
pub fn export_json_to_path(backup: &Backup, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json_string = serde_json::to_string_pretty(backup)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    info!(
        path = %path.display(),
        questions = backup.questions.len(),
        "backup exported"
    );
    Ok(())
}

/// Reads a backup from a JSON file.
/// Fails if the file doesn't exist or contains invalid JSON.
pub fn import_json(path: impl AsRef<Path>) -> Result<Backup> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let backup: Backup = serde_json::from_str(&contents)?;

    info!(
        path = %path.display(),
        questions = backup.questions.len(),
        reviews = backup.reviews.len(),
        "backup read"
    );
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{Question, ReviewEvent};
    use chrono::NaiveDate;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spaced_review_{}_{}", std::process::id(), name))
    }

    fn create_test_backup() -> Backup {
        let date = NaiveDate::from_ymd_opt(2025, 7, 30).unwrap();
        Backup {
            questions: vec![
                Question {
                    id: 1,
                    question: "[RUST] What is Send?".to_string(),
                    answer: "Safe to move across threads".to_string(),
                    last_reviewed: Some(date),
                    next_review: NaiveDate::from_ymd_opt(2025, 8, 5).unwrap(),
                    interval_days: 6,
                },
                Question {
                    id: 2,
                    question: "What is Sync?".to_string(),
                    answer: "Safe to share references across threads".to_string(),
                    last_reviewed: None,
                    next_review: date,
                    interval_days: 3,
                },
            ],
            reviews: vec![ReviewEvent {
                question_id: 1,
                review_date: date,
            }],
        }
    }

    #[test]
    fn test_export_json_to_path() {
        let backup = create_test_backup();
        let test_file = temp_file("export.json");

        let result = export_json_to_path(&backup, &test_file);
        assert!(result.is_ok());

        assert!(fs::metadata(&test_file).is_ok(), "File should exist");

        let _ = fs::remove_file(&test_file);
    }

    #[test]
    fn test_import_json() {
        let json_content = r#"{
  "questions": [
    {
      "id": 7,
      "question": "test question",
      "answer": "test answer",
      "last_reviewed": null,
      "next_review": "2025-07-30",
      "interval_days": 3
    }
  ]
}"#;

        let test_file = temp_file("import.json");
        fs::write(&test_file, json_content).unwrap();

        let backup = import_json(&test_file).unwrap();
        assert_eq!(backup.questions.len(), 1);
        assert_eq!(backup.questions[0].question, "test question");
        assert_eq!(
            backup.questions[0].next_review,
            NaiveDate::from_ymd_opt(2025, 7, 30).unwrap()
        );
        assert!(backup.reviews.is_empty());

        let _ = fs::remove_file(&test_file);
    }

    #[test]
    fn test_export_and_import_keep_schedule() {
        let original = create_test_backup();
        let test_file = temp_file("roundtrip.json");

        export_json_to_path(&original, &test_file).unwrap();
        let imported = import_json(&test_file).unwrap();

        assert_eq!(original, imported);

        let _ = fs::remove_file(&test_file);
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_json(temp_file("nonexistent_xyz123.json"));
        assert!(matches!(result, Err(Error::Backup(_))));
    }

    #[test]
    fn test_import_invalid_json() {
        let test_file = temp_file("invalid.json");
        fs::write(&test_file, "{ this is not valid json }").unwrap();

        let result = import_json(&test_file);
        assert!(matches!(result, Err(Error::Backup(_))));

        let _ = fs::remove_file(&test_file);
    }
}
