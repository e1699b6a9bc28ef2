//! Catalog and area-string commands

use anyhow::{bail, Context, Result};
use canvasdive_canvas::{compute_geometry, parse_area_string, synthesize_default, GridTemplate};
use canvasdive_core::{CatalogCache, StaticCatalogSource};
use std::sync::Arc;

use crate::config::AppConfig;

fn catalog() -> CatalogCache {
    CatalogCache::new(Arc::new(StaticCatalogSource::builtin()))
}

fn print_template(template: &GridTemplate) {
    println!(
        "  {} columns x {} rows ({} / {})",
        template.columns(),
        template.rows(),
        template.column_tracks.join(" "),
        template.row_tracks.join(" ")
    );
    for row in template.to_matrix().template_areas() {
        println!("    \"{}\"", row);
    }
    for (i, area) in template.area_strings().iter().enumerate() {
        println!("    s{}: {}", i, area.as_deref().unwrap_or("unplaced"));
    }
}

pub async fn layouts(count: usize) -> Result<()> {
    let catalog = catalog().layouts().await?;
    let matches = catalog.templates_for(count);

    if matches.is_empty() {
        println!("No named layout for {} sections, synthesized default:", count);
        print_template(&synthesize_default(count));
        return Ok(());
    }
    for layout in matches {
        println!("{} ({})", layout.name, layout.id);
        print_template(&layout.template);
    }
    Ok(())
}

pub fn area(config: &AppConfig, area: &str, columns: usize, rows: usize) -> Result<()> {
    let max = config.layout.max_tracks;
    if columns == 0 || rows == 0 || columns > max || rows > max {
        bail!("grid must be between 1x1 and {}x{}", max, max);
    }
    let spec = parse_area_string(area).context("Invalid area string")?;
    if !spec.fits(columns, rows) {
        bail!("{} does not fit a {}x{} grid", spec, columns, rows);
    }

    let geometry = compute_geometry(&spec, columns, rows, 100.0);
    println!("canonical: {}", spec);
    println!(
        "cell: row {} col {}, {} high x {} wide",
        spec.row(),
        spec.col(),
        spec.height(),
        spec.width()
    );
    println!(
        "geometry: left {:.2}% top {:.2}% width {:.2}% height {:.2}%",
        geometry.left, geometry.top, geometry.width, geometry.height
    );
    Ok(())
}

pub async fn types() -> Result<()> {
    for ty in catalog().canvas_types().await?.iter() {
        println!("{:<20} {} ({} sections)", ty.id, ty.name, ty.sections.len());
        if !ty.description.is_empty() {
            println!("{:<20} {}", "", ty.description);
        }
    }
    Ok(())
}
