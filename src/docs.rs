//! CLI output for the `payctx docs` and `payctx context` commands.
//!
//! Every command builds a [`ContextEngine`] from the config, materializes
//! the catalog once, and prints to stdout.

use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::config::Config;
use crate::engine::ContextEngine;
use crate::models::{format_size, DocumentType, ManagedDocument};

/// Which documents `docs effective` resolves.
#[derive(Debug, Clone, Copy)]
pub enum EffectiveQuery {
    Date(NaiveDate),
    Period { month: u32, year: i32 },
}

pub async fn run_list(
    config: &Config,
    doc_type: Option<&str>,
    search: Option<&str>,
) -> Result<()> {
    let engine = ContextEngine::from_config(config).await?;
    let mut docs = match search {
        Some(q) => engine.search(q),
        None => engine.list(),
    };
    if let Some(t) = doc_type {
        let doc_type: DocumentType = t.parse().map_err(anyhow::Error::msg)?;
        docs.retain(|d| d.doc_type == doc_type);
    }

    if docs.is_empty() {
        println!("No documents found.");
        return Ok(());
    }
    print_table(&docs);
    Ok(())
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let engine = ContextEngine::from_config(config).await?;
    let doc = match engine.get(id) {
        Some(d) => d,
        None => bail!("document not found: {}", id),
    };

    println!("--- Document ---");
    println!("id:             {}", doc.id);
    println!("name:           {}", doc.name);
    println!("key:            {}", doc.logical_key);
    println!("type:           {}", doc.doc_type);
    println!("version:        {}", doc.version);
    println!("effective:      {}", doc.effective_period());
    println!("status:         {}", doc.status);
    if let Some(ref code) = doc.code {
        println!("code:           {}", code);
    }
    if let Some(ref source) = doc.source_ref {
        println!("source:         {} ({})", source, doc.content_origin);
    }
    println!("size:           {}", doc.display_size());
    println!("content_hash:   {}", doc.content_hash);
    println!("description:    {}", doc.description);
    println!();

    println!("--- Content ---");
    println!("{}", doc.content);

    Ok(())
}

pub async fn run_versions(config: &Config, key: &str) -> Result<()> {
    let engine = ContextEngine::from_config(config).await?;
    let docs = engine.versions_of(key);
    if docs.is_empty() {
        bail!("no versions registered for '{}'", key);
    }
    print_table(&docs);
    Ok(())
}

pub async fn run_effective(config: &Config, query: EffectiveQuery, latest: bool) -> Result<()> {
    let engine = ContextEngine::from_config(config).await?;
    let date = match query {
        EffectiveQuery::Date(date) => date,
        EffectiveQuery::Period { month, year } => {
            crate::resolver::payslip_reference_date(month, year)?
        }
    };
    let docs = if latest {
        engine.latest_for_date(date)
    } else {
        engine.documents_for_date(date)
    };

    println!("Documents in effect on {}:", date);
    if docs.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    print_table(&docs);
    Ok(())
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let engine = ContextEngine::from_config(config).await?;
    let stats = engine.stats();

    println!("Documents:  {} ({} active)", stats.total, stats.active);
    println!("Size:       {}", stats.total_size);
    println!();
    println!("By type:");
    for (doc_type, count) in &stats.by_type {
        println!("  {:<12} {}", doc_type, count);
    }
    println!();
    println!("Versions per document:");
    for (key, count) in &stats.versions {
        println!("  {:<20} {}", key, count);
    }
    Ok(())
}

/// Prints the assembled prompt context for a payslip question.
pub async fn run_context(config: &Config, question: &str, month: u32, year: i32) -> Result<()> {
    let engine = ContextEngine::from_config(config).await?;
    let assembled = engine.assemble(question, month, year)?;
    println!("{}", assembled.text);
    Ok(())
}

fn print_table(docs: &[ManagedDocument]) {
    println!(
        "{:<36} {:<20} {:<8} {:<10} {:<26} {:>8} {:<8}",
        "ID", "KEY", "VERSION", "TYPE", "EFFECTIVE", "SIZE", "STATUS"
    );
    for d in docs {
        println!(
            "{:<36} {:<20} {:<8} {:<10} {:<26} {:>8} {:<8}",
            d.id,
            d.logical_key,
            d.version,
            d.doc_type,
            d.effective_period(),
            format_size(d.size_bytes),
            d.status
        );
    }
}
