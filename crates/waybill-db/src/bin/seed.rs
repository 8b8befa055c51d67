//! # Seed Data Generator
//!
//! Populates a Local Store with demo master data and shipments.
//!
//! ## Usage
//! ```bash
//! # 50 shipments (default)
//! cargo run -p waybill-db --bin seed
//!
//! # Custom amount and database
//! cargo run -p waybill-db --bin seed -- --count 200 --db ./data/waybill.db
//! ```
//!
//! Each shipment gets 1-4 boxes with 1-3 products, priced between 8.00
//! and 17.50 per kg.

use std::env;
use waybill_core::{
    compute_totals, prepare_publish, DraftData, MasterDataKind, MasterRecord, Money,
    ShipmentBox, ShipmentHeader, ShipmentProduct, Weight,
};
use waybill_db::{Database, DbConfig, PublishSource};

const SHIPPERS: &[&str] = &[
    "Andes Flowers",
    "Rosas del Ecuador",
    "Bogota Blooms",
    "Sabana Farms",
];

const CONSIGNEES: &[&str] = &[
    "Dutch Auction BV",
    "Miami Floral Imports",
    "Tokyo Hana Trading",
];

const PRODUCT_TYPES: &[&str] = &["Roses", "Carnations", "Alstroemeria", "Gypsophila", "Chrysanthemums"];

const FLOWER_TYPES: &[&str] = &["Freedom", "Explorer", "Mondial", "Vendela", "Moonlight"];

const AIRPORTS: &[(&str, &str)] = &[("UIO", "AMS"), ("BOG", "MIA"), ("UIO", "NRT")];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./waybill_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Waybill Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of shipments to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./waybill_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Waybill Seed Data Generator");
    println!("===========================");
    println!("Database:  {}", db_path);
    println!("Shipments: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.shipments().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} shipments", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    for (kind, names) in [
        (MasterDataKind::Shipper, SHIPPERS),
        (MasterDataKind::Consignee, CONSIGNEES),
        (MasterDataKind::ProductType, PRODUCT_TYPES),
        (MasterDataKind::FlowerType, FLOWER_TYPES),
    ] {
        for name in names {
            db.master_data().upsert(&MasterRecord::new(kind, *name)).await?;
        }
    }
    println!("✓ Master data written");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut grand_total = Money::zero();

    for seed in 0..count {
        let data = generate_draft(seed);
        grand_total += compute_totals(&data.boxes).total;

        let plan = prepare_publish(&data)?;
        if let Err(e) = db.shipments().publish(&plan, &PublishSource::default()).await {
            eprintln!("Failed to publish {}: {}", plan.invoice_number(), e);
            continue;
        }
        generated += 1;
    }

    println!();
    println!("✓ Generated {} shipments in {:?}", generated, start.elapsed());
    println!("  Invoiced total: {}", grand_total);
    println!("  Local counts:   {}", db.entity_counts().await?);

    Ok(())
}

/// Deterministic demo invoice for `seed`.
fn generate_draft(seed: usize) -> DraftData {
    let (origin, destination) = AIRPORTS[seed % AIRPORTS.len()];

    let mut header = ShipmentHeader::new(
        format!("WB{:05}", 1000 + seed),
        SHIPPERS[seed % SHIPPERS.len()],
        CONSIGNEES[seed % CONSIGNEES.len()],
    );
    header.awb = Some(format!("729-{:08}", 10_000_000 + seed * 37));
    header.flight_no = Some(format!("KL{}", 700 + seed % 50));
    header.origin = Some(origin.to_string());
    header.destination = Some(destination.to_string());
    header.freight_terms = Some(if seed % 2 == 0 { "PREPAID" } else { "COLLECT" }.to_string());

    let box_count = 1 + seed % 4;
    let boxes = (0..box_count)
        .map(|b| {
            let mut shipment_box = ShipmentBox::with_dimensions(100.0, 40.0, 30.0 + (b % 3) as f64 * 5.0);
            for p in 0..(1 + (seed + b) % 3) {
                let mix = seed * 7 + b * 3 + p;
                let mut product = ShipmentProduct::new(
                    PRODUCT_TYPES[mix % PRODUCT_TYPES.len()],
                    Weight::from_grams(5_000 + ((mix * 1_250) % 20_000) as i64),
                    Money::from_cents(800 + ((mix * 50) % 950) as i64),
                );
                product.flower_type = Some(FLOWER_TYPES[mix % FLOWER_TYPES.len()].to_string());
                product.has_stems = mix % 2 == 0;
                product.approx_quantity = 100 + (mix % 5) as i64 * 50;
                shipment_box.products.push(product);
            }
            shipment_box
        })
        .collect();

    DraftData {
        header,
        boxes,
        ..DraftData::default()
    }
}
