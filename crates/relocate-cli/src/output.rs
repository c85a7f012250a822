//! Text and JSON rendering of generation results and validation reports.

use relocate_core::generate::GenerationResult;
use relocate_core::snapshot::SnapshotElement;
use relocate_core::validation::{ValidationReport, ValidationResult};
use serde::Serialize;

use crate::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Failed(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn format_element(elem: &SnapshotElement) -> String {
    let node = &elem.node;
    let mut parts = vec![format!("[{}]", short_tag(&node.tag_name))];
    if !node.resource_id.is_empty() {
        parts.push(node.resource_id.clone());
    }
    if !node.content_desc.is_empty() {
        parts.push(format!("\"{}\"", node.content_desc));
    }
    if !node.text.is_empty() {
        parts.push(format!("={}", node.text));
    }
    if let Some(bounds) = &node.bounds {
        parts.push(format!("@({},{})", bounds.x, bounds.y));
    }
    parts.join(" ")
}

/// `android.widget.Button` -> `Button`, `XCUIElementTypeButton` -> `Button`.
fn short_tag(tag: &str) -> &str {
    let tail = tag.rsplit('.').next().unwrap_or(tag);
    tail.strip_prefix("XCUIElementType").unwrap_or(tail)
}

pub fn print_generation(result: &GenerationResult, quiet: bool) {
    for elem in &result.elements {
        println!("{}", format_element(elem));
        if quiet {
            continue;
        }
        for candidate in elem.candidates.iter() {
            println!("    {:<22} {}", candidate.strategy.as_str(), candidate.selector);
        }
    }
    if !quiet {
        eprintln!("{} elements ({})", result.element_count, result.platform);
    }
}

fn print_result(result: &ValidationResult) {
    let status = if result.found { "FOUND" } else { "MISSING" };
    println!(
        "{:<8} {}/{} {}={}",
        status, result.page_name, result.page_element_name, result.locator_strategy, result.locator
    );
    for alt in &result.alternates {
        println!("    -> {:<22} {}", alt.strategy.as_str(), alt.selector);
    }
}

pub fn print_report(report: &ValidationReport, quiet: bool) {
    for result in &report.results {
        if quiet && result.found {
            continue;
        }
        print_result(result);
    }
    println!("{}", report.summary);
}
