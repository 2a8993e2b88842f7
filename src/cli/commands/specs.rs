//! Archived specification commands: list, table, csv, inject, delete, clear.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use console::style;
use serde_json::json;

use crate::adapters::sqlite::{create_pool, PoolConfig};
use crate::adapters::SqliteResultStore;
use crate::application::archive::{ArchivedRun, SpecificationArchive};
use crate::domain::models::config::Config;
use crate::domain::models::lattice::{SignLatticeElement, Threshold};
use crate::domain::models::specification::{
    ArtifactHandle, ArtifactId, FunctionRef, Specification, SpecificationsRequest,
    SpecificationsResponse,
};

/// Column order used by the table and csv reports.
const REPORT_ELEMENTS: [SignLatticeElement; 8] = [
    SignLatticeElement::LessThanZero,
    SignLatticeElement::GreaterThanZero,
    SignLatticeElement::Zero,
    SignLatticeElement::LessThanEqualZero,
    SignLatticeElement::GreaterThanEqualZero,
    SignLatticeElement::NotZero,
    SignLatticeElement::Top,
    SignLatticeElement::Emptyset,
];

#[derive(Args)]
pub struct SpecsArgs {
    #[command(subcommand)]
    pub command: SpecsCommand,
}

#[derive(Subcommand)]
pub enum SpecsCommand {
    /// List archived specifications at a confidence threshold
    List {
        /// Only show the artifact with this id or source URI
        #[arg(long)]
        artifact: Option<String>,

        /// Minimum confidence for a base fact to count as known
        #[arg(long, default_value_t = 100)]
        threshold: u8,

        /// Plain `function function element` lines, suitable for re-injection
        #[arg(long)]
        raw: bool,
    },

    /// Per-element specification counts for every archived artifact
    Table {
        #[arg(long, default_value_t = 100)]
        threshold: u8,
    },

    /// Export newly inferred specification counts as CSV
    Csv {
        /// Output file path
        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = 100)]
        threshold: u8,
    },

    /// Archive hand-written specifications for an artifact
    Inject {
        /// Artifact id the specifications belong to
        #[arg(long)]
        artifact: String,

        /// Source URI of the artifact
        #[arg(long)]
        uri: String,

        /// Three-column specifications file: `<tag> <function> <element>`
        #[arg(long)]
        file: PathBuf,

        /// Replace an existing archived record
        #[arg(long)]
        overwrite: bool,
    },

    /// Delete the archived record for one artifact
    Delete {
        #[arg(long)]
        artifact: String,
    },

    /// Delete every archived specification record
    Clear,
}

pub async fn execute(args: SpecsArgs, config: &Config, json: bool) -> Result<()> {
    let database_url = format!("sqlite://{}", config.database.path);
    let pool = create_pool(
        &database_url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..Default::default()
        }),
    )
    .await
    .context("Failed to open result store")?;
    let archive = SpecificationArchive::new(Arc::new(SqliteResultStore::new(pool)));

    match args.command {
        SpecsCommand::List {
            artifact,
            threshold,
            raw,
        } => list(&archive, artifact.as_deref(), threshold, raw, json).await,
        SpecsCommand::Table { threshold } => table(&archive, threshold, json).await,
        SpecsCommand::Csv { output, threshold } => csv(&archive, &output, threshold).await,
        SpecsCommand::Inject {
            artifact,
            uri,
            file,
            overwrite,
        } => inject(&archive, artifact, uri, &file, overwrite).await,
        SpecsCommand::Delete { artifact } => {
            let removed = archive.remove(&ArtifactId::new(artifact)).await?;
            println!("Removed {removed} record(s)");
            Ok(())
        }
        SpecsCommand::Clear => {
            let removed = archive.clear().await?;
            println!("Removed {removed} record(s)");
            Ok(())
        }
    }
}

fn matches_filter(run: &ArchivedRun, filter: Option<&str>) -> bool {
    match filter {
        Some(filter) => {
            run.request.artifact.id.as_str() == filter || run.request.artifact.uri == filter
        }
        None => true,
    }
}

fn file_name(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

async fn list(
    archive: &SpecificationArchive,
    filter: Option<&str>,
    threshold: u8,
    raw: bool,
    json: bool,
) -> Result<()> {
    let threshold = Threshold::new(threshold)?;
    let runs = archive.read_all().await?;

    if json {
        let mut entries = Vec::new();
        for run in runs.iter().filter(|run| matches_filter(run, filter)) {
            let specifications: Vec<_> = run
                .response
                .specifications
                .iter()
                .filter_map(|spec| {
                    let element = spec.confidence.resolve(threshold);
                    (element != SignLatticeElement::Bottom).then(|| {
                        json!({
                            "function": spec.function.source_name,
                            "specification": element.as_str(),
                        })
                    })
                })
                .collect();
            entries.push(json!({
                "artifact_id": run.request.artifact.id.as_str(),
                "uri": run.request.artifact.uri,
                "specifications": specifications,
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if !raw {
        println!("---Specifications in archive---");
        println!(
            "{}",
            style("Yellow indicates the specification came from domain knowledge").yellow()
        );
    }

    for run in runs.iter().filter(|run| matches_filter(run, filter)) {
        let initial_functions: Vec<&str> = run
            .request
            .initial_specifications
            .iter()
            .map(|spec| spec.function.source_name.as_str())
            .collect();

        if !raw {
            println!("{}", "-".repeat(30));
            println!(
                "{}",
                style(format!(
                    "{:<40} {:<75}",
                    "Artifact ID (last 8 characters):", "File name:"
                ))
                .red()
            );
            println!(
                "{:<40} {:<75}",
                run.request.artifact.id.short(),
                file_name(&run.request.artifact.uri)
            );
            println!(
                "{}",
                style(format!("{:<50} {:<30}", "Function:", "Specification:")).green()
            );
        }

        if run.response.specifications.is_empty() {
            println!("NONE FOUND");
            continue;
        }

        for spec in &run.response.specifications {
            let element = spec.confidence.resolve(threshold);
            if element == SignLatticeElement::Bottom {
                continue;
            }

            let function = spec.function.source_name.as_str();
            if raw {
                // Spreadsheet-safe form for `==0`, accepted back by inject.
                let sign = if element == SignLatticeElement::Zero {
                    "'==0"
                } else {
                    element.as_str()
                };
                println!("{function}: {function} {sign}");
                continue;
            }

            let row = format!("{function:<50} {:<30}", element.as_str());
            if initial_functions.contains(&function) {
                println!("{}", style(row).yellow());
            } else {
                println!("{row}");
            }
        }
    }

    Ok(())
}

/// Count non-bottom specifications per element at `threshold`. When
/// `exclude` is given, functions named there are left out.
fn count_elements(
    run: &ArchivedRun,
    threshold: Threshold,
    exclude: &[&str],
) -> (BTreeMap<&'static str, usize>, usize) {
    let mut counts = BTreeMap::new();
    let mut total = 0usize;
    for spec in &run.response.specifications {
        if exclude.contains(&spec.function.source_name.as_str()) {
            continue;
        }
        let element = spec.confidence.resolve(threshold);
        if element == SignLatticeElement::Bottom {
            continue;
        }
        *counts.entry(element.as_str()).or_insert(0) += 1;
        total += 1;
    }
    (counts, total)
}

async fn table(archive: &SpecificationArchive, threshold: u8, json: bool) -> Result<()> {
    let threshold = Threshold::new(threshold)?;
    let runs = archive.read_all().await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let mut header = vec!["Artifact".to_string(), "File".to_string()];
    header.extend(REPORT_ELEMENTS.iter().map(|e| e.as_str().to_string()));
    header.push("total".to_string());
    header.push("increase %".to_string());
    table.set_header(header);

    let mut entries = Vec::new();
    for run in &runs {
        let (counts, total) = count_elements(run, threshold, &[]);
        let (_, total_baseline) = count_elements(run, Threshold::MAX, &[]);

        // Extra specifications surfaced relative to full confidence.
        let increase = if total_baseline > 0 {
            ((total as f64 - total_baseline as f64) / total_baseline as f64) * 100.0
        } else {
            0.0
        };

        if json {
            entries.push(json!({
                "artifact_id": run.request.artifact.id.as_str(),
                "uri": run.request.artifact.uri,
                "counts": counts,
                "total": total,
                "increase_percent": increase,
            }));
            continue;
        }

        let mut row = vec![
            run.request.artifact.id.short().to_string(),
            file_name(&run.request.artifact.uri).to_string(),
        ];
        row.extend(
            REPORT_ELEMENTS
                .iter()
                .map(|e| counts.get(e.as_str()).copied().unwrap_or(0).to_string()),
        );
        row.push(total.to_string());
        row.push(format!("{increase:.2}"));
        table.add_row(row);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{table}");
    }
    Ok(())
}

async fn csv(archive: &SpecificationArchive, output: &Path, threshold: u8) -> Result<()> {
    let threshold = Threshold::new(threshold)?;
    let runs = archive.read_all().await?;

    let mut body = String::from("artifact_id,file,<0,>0,==0,<=0,>=0,!=0,top,emptyset\n");
    for run in &runs {
        let initial_functions: Vec<&str> = run
            .request
            .initial_specifications
            .iter()
            .map(|spec| spec.function.source_name.as_str())
            .collect();
        let (counts, _) = count_elements(run, threshold, &initial_functions);

        body.push_str(run.request.artifact.id.short());
        body.push(',');
        body.push_str(file_name(&run.request.artifact.uri));
        for element in REPORT_ELEMENTS {
            body.push(',');
            body.push_str(&counts.get(element.as_str()).copied().unwrap_or(0).to_string());
        }
        body.push('\n');
    }

    tokio::fs::write(output, body)
        .await
        .context(format!("Failed to write CSV to {}", output.display()))?;
    println!("Wrote {} row(s) to {}", runs.len(), output.display());
    Ok(())
}

async fn inject(
    archive: &SpecificationArchive,
    artifact: String,
    uri: String,
    file: &Path,
    overwrite: bool,
) -> Result<()> {
    let artifact_id = ArtifactId::new(artifact);

    let content = tokio::fs::read_to_string(file)
        .await
        .context(format!("Failed to read {}", file.display()))?;

    let mut specifications = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            bail!("Malformed specification line (want 3 columns): {line:?}");
        }
        let element = SignLatticeElement::from_str(fields[2])
            .ok_or_else(|| anyhow!("Unknown lattice element: {}", fields[2]))?;
        specifications.push(Specification {
            function: FunctionRef::from_source_name(fields[1]),
            lattice_element: element,
            confidence: element.canonical_confidence(),
        });
    }

    if overwrite {
        let removed = archive.remove(&artifact_id).await?;
        if removed > 0 {
            println!("Removed existing record for {artifact_id}");
        }
    } else if archive.contains(&artifact_id).await? {
        println!("Archive already has an entry for artifact {artifact_id}");
        return Ok(());
    }

    let mut request = SpecificationsRequest::new(ArtifactHandle {
        id: artifact_id,
        uri,
        authority: None,
    });
    request.llm_name = Some("Injected".to_string());

    let count = specifications.len();
    archive
        .insert(&request, &SpecificationsResponse { specifications })
        .await?;
    println!("Injected {count} specification(s)");
    Ok(())
}
