use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use slidetree_hierarchy::{Hierarchy, LoadOptions, LoadReport, ObjectView};
use slidetree_store::InMemoryObjectStore;
use slidetree_types::InterchangeVersion;

use crate::cli::*;
use crate::config::CliConfig;

const UNCLASSIFIED: &str = "Unclassified";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, &config, cli.format),
        Command::Convert(args) => cmd_convert(args, &config, cli.format),
    }
}

#[derive(Debug, Serialize)]
struct InspectSummary {
    file: String,
    interchange_version: InterchangeVersion,
    annotations: usize,
    detections: usize,
    classes: BTreeMap<String, usize>,
    report: LoadReport,
}

#[derive(Debug, Serialize)]
struct ConvertSummary {
    input: String,
    output: String,
    annotations: usize,
    report: LoadReport,
}

/// Read a document, accepting either a bare record list or a feature collection.
fn read_document(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let document: Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(match document {
        Value::Object(mut collection) if collection.get("features").is_some_and(Value::is_array) => {
            collection.remove("features").unwrap_or_default()
        }
        other => other,
    })
}

fn load_hierarchy(
    path: &Path,
    options: &LoadOptions,
    version: InterchangeVersion,
) -> anyhow::Result<(Hierarchy, LoadReport)> {
    let document = read_document(path)?;
    let hierarchy = Hierarchy::with_store(Arc::new(InMemoryObjectStore::with_version(version)));
    let report = hierarchy
        .load_with_report(&document, options)
        .with_context(|| format!("loading {}", path.display()))?;
    debug!(file = %path.display(), %version, converted = report.converted, "document loaded");
    Ok((hierarchy, report))
}

fn class_distribution(views: &[&ObjectView]) -> anyhow::Result<BTreeMap<String, usize>> {
    let mut classes = BTreeMap::new();
    for view in views {
        for object in view.iter()? {
            let name = object
                .path_class()
                .map_or(UNCLASSIFIED, |class| class.name())
                .to_string();
            *classes.entry(name).or_insert(0) += 1;
        }
    }
    Ok(classes)
}

fn print_skipped(report: &LoadReport) {
    if report.skipped.is_empty() {
        return;
    }
    println!(
        "  {} {} records skipped",
        "!".yellow().bold(),
        report.skipped.total().to_string().bold()
    );
    for (name, count) in report.skipped.most_common() {
        println!("    {:<24} {}", name, count.to_string().red());
    }
}

fn cmd_inspect(args: InspectArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let options = config.load_options(args.fix_invalid, args.raise_on_skip);
    let version = config.version(args.legacy);
    let (hierarchy, report) = load_hierarchy(&args.file, &options, version)?;

    let summary = InspectSummary {
        file: args.file.display().to_string(),
        interchange_version: version,
        annotations: hierarchy.annotations().len()?,
        detections: hierarchy.detections().len()?,
        classes: class_distribution(&[hierarchy.annotations(), hierarchy.detections()])?,
        report,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!(
                "{} Loaded {} (interchange {})",
                "✓".green().bold(),
                summary.file.bold(),
                version.to_string().cyan()
            );
            println!("  Annotations: {}", summary.annotations.to_string().bold());
            println!("  Detections:  {}", summary.detections.to_string().bold());
            if !summary.classes.is_empty() {
                println!("  Classes:");
                for (name, count) in &summary.classes {
                    println!("    {:<24} {}", name.yellow(), count);
                }
            }
            print_skipped(&summary.report);
        }
    }
    Ok(())
}

fn cmd_convert(args: ConvertArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let options = config.load_options(args.fix_invalid, false);
    let (hierarchy, report) = load_hierarchy(&args.input, &options, config.version(None))?;

    let document = hierarchy.to_document()?;
    let text = serde_json::to_string_pretty(&document)?;
    fs::write(&args.output, text).with_context(|| format!("writing {}", args.output.display()))?;

    let summary = ConvertSummary {
        input: args.input.display().to_string(),
        output: args.output.display().to_string(),
        annotations: document.len(),
        report,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!(
                "{} Wrote {} annotations to {}",
                "✓".green().bold(),
                summary.annotations.to_string().bold(),
                summary.output.bold()
            );
            print_skipped(&summary.report);
        }
    }
    Ok(())
}
