use crate::models::{FailureStage, ResultRecord, RunSummary};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the run summary in the specified format
pub fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", SummaryTable(summary)),
        OutputFormat::Json => print_json(summary),
    }
}

/// Print records captured by a dry run, grouped by collection
pub fn print_records(collections: &[(String, Vec<ResultRecord>)], format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", RecordListing(collections)),
        OutputFormat::Json => {
            let grouped: serde_json::Map<String, serde_json::Value> = collections
                .iter()
                .map(|(name, records)| (name.clone(), serde_json::json!(records)))
                .collect();
            print_json(&grouped);
        }
    }
}

/// Plain-text rendering of a [`RunSummary`]
struct SummaryTable<'a>(&'a RunSummary);

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;

        writeln!(f, "📊 RUN SUMMARY")?;
        writeln!(f, "--------------")?;
        if summary.models.is_empty() {
            writeln!(f, "No models were run.")?;
        } else {
            writeln!(
                f,
                "{:<20} {:<22} {:>9} {:>7} {:>8}",
                "Model", "Collection", "Succeeded", "Failed", "Tokens"
            )?;
            writeln!(f, "{}", "-".repeat(70))?;
            for model in &summary.models {
                writeln!(
                    f,
                    "{:<20} {:<22} {:>9} {:>7} {:>8}",
                    model.model,
                    model.collection,
                    model.succeeded,
                    model.failed,
                    model.completion_tokens
                )?;
            }
        }
        writeln!(
            f,
            "\n{} record(s) written, {} failure(s)",
            summary.records_written(),
            summary.failure_count()
        )?;

        if summary.failures.is_empty() {
            return Ok(());
        }

        writeln!(f, "\n⚠️  FAILURES")?;
        writeln!(f, "-----------")?;
        for failure in &summary.failures {
            let stage = match failure.stage {
                FailureStage::Invocation => "invocation",
                FailureStage::Persistence => "persistence",
            };
            writeln!(
                f,
                "[{}] prompt #{} ({}): {}",
                failure.model,
                failure.prompt_index + 1,
                stage,
                failure.error
            )?;
        }
        Ok(())
    }
}

/// Plain-text rendering of dry-run records
struct RecordListing<'a>(&'a [(String, Vec<ResultRecord>)]);

impl fmt::Display for RecordListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, records) in self.0 {
            writeln!(f, "=== {} ({} record(s)) ===", name, records.len())?;
            for record in records {
                writeln!(f, "Model: {}", record.model)?;
                writeln!(f, "Timestamp: {}", record.timestamp)?;
                writeln!(f, "Prompt: {}", record.prompt)?;
                writeln!(f, "Response: {}", record.response)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}
