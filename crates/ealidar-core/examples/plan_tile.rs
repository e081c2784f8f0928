//! Example: list the archives that would be downloaded for a tile.
//!
//! Usage: cargo run --example plan_tile -- <tile_id> [product] [out_dir]

use ealidar_core::{pipeline, CatalogErrorPolicy, Config, HttpCatalog};
use std::env;
use std::path::Path;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <tile_id> [product] [out_dir]", args[0]);
        eprintln!("Example: {} TQ28 LIDAR-DTM-1M-ENGLAND-EA .", args[0]);
        std::process::exit(1);
    }

    let tile_id = &args[1];
    let product = args.get(2).map(|s| s.as_str()).unwrap_or("LIDAR-DTM-1M-ENGLAND-EA");
    let out_dir = args.get(3).map(|s| s.as_str()).unwrap_or(".");

    let config = Config::default();
    let catalog = HttpCatalog::new(config.catalog.clone()).expect("Failed to create catalog client");

    let tiles = pipeline::tiles_by_id(tile_id).expect("Invalid tile id");
    println!("Requesting {} tiles:", tiles.len());
    for tile in &tiles {
        println!("  {}", tile);
    }

    match pipeline::list_products(&catalog, tile_id) {
        Ok(products) => {
            println!("\nProducts available for {}:", tile_id);
            for product in products {
                println!("  {}", product);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let start = Instant::now();
    let plan = pipeline::plan_downloads(&catalog, &tiles, product, Path::new(out_dir), CatalogErrorPolicy::Abort)
        .expect("Failed to build download plan");

    println!(
        "\n{} archives of {} ({} catalog queries in {:.2}s):",
        plan.tasks.len(),
        product,
        catalog.queries_sent(),
        start.elapsed().as_secs_f64()
    );
    for task in &plan.tasks {
        println!("  {} -> {}", task.url, task.destination.display());
    }
}
