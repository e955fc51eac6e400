//! # Seed Data Generator
//!
//! Populates a development database with a small storefront.
//!
//! ## Usage
//! ```bash
//! # Seed ./bazaar_dev.db
//! cargo run -p bazaar-db --bin seed
//!
//! # Specify database path
//! cargo run -p bazaar-db --bin seed -- --db ./data/bazaar.db
//! ```
//!
//! ## Generated Data
//! - Four categories with a handful of products each
//! - One admin and one customer profile with fixed ids, so
//!   `dev_token` can mint tokens for them
//! - A default address for the customer
//! - A few reviews so product ratings are non-zero

use bazaar_core::catalog::{CategoryInput, ProductInput};
use bazaar_core::pagination::PageRequest;
use bazaar_core::reviews::ReviewDraft;
use bazaar_core::{AddressInput, UserRole, DEFAULT_TENANT_ID};
use bazaar_db::{Database, DbConfig, NewProfile};
use std::env;

/// Fixed ids for the development accounts.
const ADMIN_ID: &str = "00000000-0000-4000-8000-00000000a001";
const CUSTOMER_ID: &str = "00000000-0000-4000-8000-00000000c001";

/// (category, description, [(name, sku, price_cents, stock)])
type CategorySeed = (&'static str, &'static str, &'static [(&'static str, &'static str, i64, i64)]);

const CATALOG: &[CategorySeed] = &[
    (
        "Shirts",
        "Casual and formal shirts",
        &[
            ("Linen Shirt", "SHIRT-LIN", 4999, 40),
            ("Oxford Shirt", "SHIRT-OXF", 5499, 25),
            ("Flannel Shirt", "SHIRT-FLA", 4499, 3),
            ("Denim Shirt", "SHIRT-DEN", 5999, 0),
        ],
    ),
    (
        "Knitwear",
        "Sweaters and cardigans",
        &[
            ("Merino Sweater", "KNIT-MER", 8999, 15),
            ("Cable Cardigan", "KNIT-CAB", 9499, 8),
            ("Cashmere Crew", "KNIT-CAS", 14999, 4),
        ],
    ),
    (
        "Accessories",
        "Scarves, hats and bags",
        &[
            ("Wool Scarf", "ACC-SCARF", 2599, 60),
            ("Beanie", "ACC-BEANIE", 1999, 80),
            ("Canvas Tote", "ACC-TOTE", 2999, 35),
            ("Leather Belt", "ACC-BELT", 3999, 2),
        ],
    ),
    (
        "Footwear",
        "Shoes and boots",
        &[
            ("Chelsea Boots", "FOOT-CHEL", 15999, 12),
            ("Canvas Sneakers", "FOOT-SNK", 6999, 30),
            ("Suede Loafers", "FOOT-LOAF", 11999, 6),
        ],
    ),
];

const REVIEWS: &[(&str, i64, &str)] = &[
    ("SHIRT-LIN", 5, "Breathable and fits true to size."),
    ("KNIT-MER", 4, "Warm without being bulky. Sleeves run a little long."),
    ("ACC-SCARF", 5, "Soft, no itch at all."),
    ("FOOT-SNK", 3, "Comfortable, but the laces fray quickly."),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./bazaar_dev.db");
    let mut tenant = String::from(DEFAULT_TENANT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./bazaar_dev.db)");
                println!("  -t, --tenant <ID>    Tenant to seed (default: {DEFAULT_TENANT_ID})");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().stats(&tenant).await?.total;
    if existing > 0 {
        println!("⚠ Tenant already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Accounts
    let admin = db
        .users()
        .ensure_profile(
            &tenant,
            &NewProfile {
                id: ADMIN_ID.to_string(),
                email: "admin@bazaar.test".to_string(),
                display_name: Some("Store Admin".to_string()),
                role: UserRole::Admin,
            },
        )
        .await?;
    let customer = db
        .users()
        .ensure_profile(
            &tenant,
            &NewProfile {
                id: CUSTOMER_ID.to_string(),
                email: "customer@bazaar.test".to_string(),
                display_name: Some("Casey Customer".to_string()),
                role: UserRole::Customer,
            },
        )
        .await?;

    db.addresses()
        .create(
            &customer.id,
            &AddressInput {
                recipient_name: "Casey Customer".to_string(),
                address_line1: "1 Market Street".to_string(),
                address_line2: None,
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
                phone: "555-0100".to_string(),
                is_default: true,
            },
        )
        .await?;

    println!("✓ Accounts: admin {} / customer {}", admin.id, customer.id);

    // Catalog
    println!();
    println!("Generating catalog...");

    let mut generated = 0;
    for (category_name, description, products) in CATALOG {
        let category = db
            .categories()
            .insert(
                &tenant,
                &CategoryInput {
                    name: category_name.to_string(),
                    description: Some(description.to_string()),
                },
            )
            .await?;

        for (idx, (name, sku, price_cents, stock)) in products.iter().enumerate() {
            let input = ProductInput {
                name: name.to_string(),
                description: format!("{name} from our {category_name} range."),
                price_cents: *price_cents,
                // Every third product is on sale.
                original_price_cents: (idx % 3 == 0).then(|| price_cents + price_cents / 5),
                stock: *stock,
                image_url: Some(format!("/images/{}.jpg", sku.to_lowercase())),
                category_id: Some(category.id.clone()),
                sku: Some(sku.to_string()),
                is_featured: idx == 0,
            };

            if let Err(e) = db.products().insert(&tenant, &input).await {
                eprintln!("Failed to insert {}: {}", sku, e);
                continue;
            }
            generated += 1;
        }
    }

    println!("✓ Generated {} products", generated);

    // Reviews
    let all = db
        .products()
        .search(
            &tenant,
            &Default::default(),
            Default::default(),
            PageRequest::new(Some(1), Some(100)),
        )
        .await?;

    let mut reviewed = 0;
    for (sku, rating, content) in REVIEWS {
        let Some(product) = all.data.iter().find(|p| p.sku.as_deref() == Some(*sku)) else {
            continue;
        };
        let draft = ReviewDraft {
            content: content.to_string(),
            rating: Some(*rating),
            images: Vec::new(),
            parent_id: None,
        };
        db.reviews()
            .create(&tenant, &product.id, &customer.id, &draft)
            .await?;
        reviewed += 1;
    }

    println!("✓ Posted {} reviews", reviewed);

    let stats = db.dashboard_stats(&tenant).await?;
    println!();
    println!(
        "  Products: {} active, {} low stock, {} out of stock",
        stats.products.total, stats.products.low_stock, stats.products.out_of_stock
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
