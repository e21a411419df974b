//! # Catalog Seeder
//!
//! Fills an empty database with products for local development.
//!
//! ## Usage
//! ```bash
//! # 200 products into the configured database
//! cargo run -p cartwright-service --bin seed
//!
//! # Custom amount and path
//! cargo run -p cartwright-service --bin seed -- --count 1000 --db ./data/cartwright.db
//! ```
//!
//! Prices run from $1.99 to $99.99 and stock from 0 to 50, so some products
//! are sold out from the start.

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, warn};

use cartwright_core::Product;
use cartwright_db::repository::product::generate_product_id;
use cartwright_db::Database;
use cartwright_service::config::AppConfig;
use cartwright_service::telemetry::init_tracing;

const CATEGORIES: &[(&str, &[&str])] = &[
    ("kitchen", &["Chef Knife", "Cast Iron Pan", "Cutting Board", "Kettle", "Spice Rack"]),
    ("office", &["Desk Lamp", "Notebook", "Fountain Pen", "Monitor Stand", "Stapler"]),
    ("outdoor", &["Tent", "Headlamp", "Water Bottle", "Camp Stove", "Hammock"]),
    ("home", &["Throw Blanket", "Candle", "Picture Frame", "Doormat", "Wall Clock"]),
];

const VARIANTS: &[&str] = &["Classic", "Pro", "Mini", "Deluxe", "Travel"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" if i + 1 < args.len() => {
                count = args[i + 1].parse()?;
                i += 1;
            }
            "--db" | "-d" if i + 1 < args.len() => {
                db_path = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--help" | "-h" => {
                println!("Cartwright catalog seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products (default: 200)");
                println!("  -d, --db <PATH>      Database file (default: configured path)");
                println!("      --config <PATH>  Config file");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging.filter);

    let db = Database::new(config.db_config()).await?;
    info!(path = ?config.database.path, "Connected");

    let existing = db.session().await?.products().count().await?;
    if existing > 0 {
        warn!(existing = existing, "Catalog already populated; delete the database to reseed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let products = generate_products(count);

    let mut uow = db.begin().await?;
    for product in &products {
        uow.products().insert(product).await?;
    }
    uow.commit().await?;

    info!(count = products.len(), elapsed = ?start.elapsed(), "Seed complete");
    db.close().await;

    Ok(())
}

fn generate_products(count: usize) -> Vec<Product> {
    let now = Utc::now();
    let combos = CATEGORIES.iter().map(|(_, names)| names.len()).sum::<usize>() * VARIANTS.len();

    CATEGORIES
        .iter()
        .flat_map(|(category, names)| names.iter().map(move |name| (*category, *name)))
        .flat_map(|(category, name)| VARIANTS.iter().map(move |variant| (category, name, *variant)))
        .cycle()
        .take(count)
        .enumerate()
        .map(|(seed, (category, name, variant))| {
            let round = seed / combos;
            let title = if round == 0 {
                format!("{name} {variant}")
            } else {
                format!("{name} {variant} #{}", round + 1)
            };

            Product {
                id: generate_product_id(),
                title,
                price_cents: 199 + ((seed * 37) % 9801) as i64,
                qty_available: (seed % 51) as i64,
                category_id: Some(category.to_string()),
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}
