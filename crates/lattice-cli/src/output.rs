//! Terminal rendering of results
//!
//! Every printer takes a `json` flag; JSON goes to stdout pretty-printed.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};

use lattice_core::{Direction, IndexStats, IngestReport, Neighbor, OrderedResult, Provenance};

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Outgoing => "->",
        Direction::Incoming => "<-",
    }
}

fn format_fields(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn format_rank(rank: Option<usize>) -> String {
    rank.map(|r| format!("#{}", r)).unwrap_or_else(|| "-".to_string())
}

/// Print ordered search results
pub fn print_results(query: &str, results: &[OrderedResult], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(results);
    }

    println!("{} {}", "=== Results for".cyan().bold(), format!("\"{}\" ===", query).cyan().bold());
    println!();

    if results.is_empty() {
        println!("{}", "No results found.".dimmed());
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        match &result.provenance {
            Provenance::Direct {
                lexical_rank,
                vector_rank,
            } => {
                println!(
                    "{:>3}. {} {} {}",
                    i + 1,
                    result.entity_id.white().bold(),
                    format!("{:.5}", result.score).green(),
                    format!(
                        "(keyword {}, vector {})",
                        format_rank(*lexical_rank),
                        format_rank(*vector_rank)
                    )
                    .dimmed()
                );
            }
            Provenance::Expansion {
                via_relationship_type,
                via_entity_id,
                connections,
            } => {
                let extra = connections.len().saturating_sub(1);
                let via = if extra > 0 {
                    format!("via {} {} (+{} more)", via_relationship_type, via_entity_id, extra)
                } else {
                    format!("via {} {}", via_relationship_type, via_entity_id)
                };
                println!(
                    "{:>3}. {} {} {}",
                    i + 1,
                    result.entity_id.white().bold(),
                    "expansion".yellow(),
                    via.dimmed()
                );
            }
        }
        if !result.display_fields.is_empty() {
            println!("     {}", format_fields(&result.display_fields));
        }
    }

    Ok(())
}

/// Print graph neighbors of `id`
pub fn print_neighbors(id: &str, neighbors: &[Neighbor], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(neighbors);
    }

    println!("{} {}", "=== Neighbors of".cyan().bold(), format!("{} ===", id).cyan().bold());
    println!();

    if neighbors.is_empty() {
        println!("{}", "No neighbors found.".dimmed());
        return Ok(());
    }

    for neighbor in neighbors {
        println!(
            "  {} {} {} {} {}",
            format!("[{}]", neighbor.hop).dimmed(),
            neighbor.via_node_id,
            arrow(neighbor.direction),
            neighbor.node_id.white().bold(),
            neighbor.relationship_type.yellow()
        );
        if !neighbor.attributes.is_empty() {
            println!("      {}", format_fields(&neighbor.attributes).dimmed());
        }
    }

    Ok(())
}

/// Print index statistics
pub fn print_stats(
    path: &Path,
    stats: &IndexStats,
    relationship_types: &[String],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(stats);
    }

    println!("{}", "=== Lattice Index Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Database".white().bold(), path.display());
    println!("{}: {}", "Entities".white().bold(), stats.total_entities);
    println!("{}: {}", "With Vectors".white().bold(), stats.entities_with_vectors);
    println!("{}: {}", "Relationships".white().bold(), stats.total_relationships);

    let coverage = if stats.total_entities > 0 {
        (stats.entities_with_vectors as f64 / stats.total_entities as f64) * 100.0
    } else {
        0.0
    };
    println!("{}: {:.1}%", "Vector Coverage".white().bold(), coverage);

    if let Some(dimensions) = stats.dimensions {
        println!("{}: {}", "Dimensions".white().bold(), dimensions);
    }
    if let Some(model) = &stats.embedding_model {
        println!("{}: {}", "Embedding Model".white().bold(), model);
    }
    if let Some(built_at) = stats.built_at {
        println!("{}: {}", "Built At".white().bold(), built_at.format("%Y-%m-%d %H:%M:%S"));
    }

    if !relationship_types.is_empty() {
        println!();
        println!("{}", "=== Relationship Types ===".yellow().bold());
        for name in relationship_types {
            println!("  {}", name);
        }
    }

    Ok(())
}

/// Print an ingestion report
pub fn print_report(report: &IngestReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }

    println!("{}", "Index rebuilt".green().bold());
    println!("{}: {}", "Entities".white().bold(), report.entities);
    println!("{}: {}", "Relationships".white().bold(), report.edges);
    println!("{}: {}", "Embedded".white().bold(), report.embedded);
    if report.skipped_embeddings > 0 {
        println!(
            "{}: {}",
            "Without Vectors".yellow().bold(),
            report.skipped_embeddings
        );
    }
    println!("{}: {} ms", "Elapsed".white().bold(), report.elapsed.as_millis());

    Ok(())
}
