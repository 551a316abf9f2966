use anyhow::{bail, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use bike_garage::{
    load_bike, load_spec_sheet, registry, to_json_pretty, Entity, GraphBuilder, SpecImporter,
};

const USAGE: &str = "Usage:
  bike-garage build [bike.json]
  bike-garage import <specs.csv> [bike.json]
  bike-garage schema";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("build") => run_build(args.get(2).map(Path::new))?,
        Some("import") => {
            let Some(sheet) = args.get(2) else {
                bail!("Missing spec sheet path\n{}", USAGE);
            };
            run_import(Path::new(sheet), args.get(3).map(Path::new))?;
        }
        Some("schema") => run_schema(),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn load_or_empty(document: Option<&Path>) -> Result<Entity> {
    match document {
        Some(path) => {
            eprintln!("📂 Loading {}...", path.display());
            load_bike(path)
        }
        None => Ok(Entity::bike()),
    }
}

fn run_build(document: Option<&Path>) -> Result<()> {
    let bike = load_or_empty(document)?;

    eprintln!("🏗️  Building bike graph...");
    let builder = GraphBuilder::new(Some(bike));
    let report = builder.report();
    eprintln!("✓ {}", report.summary());
    for drift in &report.drift {
        eprintln!("⚠️  {}: expected {}, found {}", drift.path, drift.expected, drift.found);
    }

    println!("{}", to_json_pretty(builder.bike())?);
    Ok(())
}

fn run_import(sheet: &Path, document: Option<&Path>) -> Result<()> {
    let mut bike = load_or_empty(document)?;

    eprintln!("📥 Reading spec sheet {}...", sheet.display());
    let rows = load_spec_sheet(sheet)?;
    eprintln!("✓ Loaded {} rows", rows.len());

    let report = SpecImporter::new().import(&mut bike, &rows);

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("📊 Import: {}", report.summary());
    for label in &report.skipped {
        eprintln!("   ⏭️  {} (no mapping)", label);
    }
    for (label, err) in &report.failed {
        eprintln!("   ❌ {}: {}", label, err);
    }
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    println!("{}", to_json_pretty(&bike)?);
    Ok(())
}

fn run_schema() {
    let registry = registry();
    println!("🚲 Bike Garage entity catalogue ({} kinds)", registry.count());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for kind in registry.kinds() {
        let Some(definition) = registry.entity(kind) else {
            continue;
        };
        println!("\n{} - {}", kind, definition.description);
        for field in definition.fields() {
            let unit = field.unit.map(|u| format!(" [{}]", u)).unwrap_or_default();
            println!("  {:<22} {}{}", field.name, field.field_type.describe(), unit);
        }
    }
}
