use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::path::Path;

use crate::{format_number, Error, RawProduct, Result};

pub const DEFAULT_CATALOG_SIZE: usize = 400;

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &["Audio|Headphones", "Mobiles|Accessories", "WearableTechnology|SmartWatches"],
    ),
    ("Computers&Accessories", &["Cables|USBCables", "Peripherals|Mice", "Storage|PenDrives"]),
    ("Home&Kitchen", &["Kitchen|Kettles", "Heating|RoomHeaters", "Cleaning|Vacuums"]),
    ("OfficeProducts", &["Writing|Pens", "Paper|Notebooks"]),
    ("HomeImprovement", &["Electrical|Extension Boards"]),
];

const NOUNS: &[&str] = &[
    "Cable", "Charger", "Earbuds", "Kettle", "Mouse", "Heater", "Notebook", "Watch", "Adapter",
    "Speaker",
];

const BRANDS: &[&str] = &["Zentro", "Acme", "Boltline", "Homely", "Pixelo", "Northwind"];

const PRAISE: &[&str] = &[
    "Great product, works perfectly",
    "Excellent build quality and very good value",
    "Love it, highly recommend",
    "Good sound and fast charging",
    "Nice design, happy with the purchase",
];

const COMPLAINTS: &[&str] = &[
    "Stopped working after a week, fake product",
    "Poor quality and it broke on day two",
    "Defective unit, asked for a refund",
    "Looks damaged and cheap, worst purchase",
    "Not working at all, waste of money",
];

/// Produces a messy raw catalog in the marketplace export format: currency
/// strings, percent strings, comma-grouped counts, missing ratings, exact
/// duplicates and a few unusable rows. The same seed yields the same rows.
pub fn generate_raw_catalog(count: usize, seed: u64) -> Vec<RawProduct> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(count + count / 20);

    for idx in 0..count {
        let row = sample_product(&mut rng, idx);
        let duplicate = rng.gen::<f64>() < 0.03;
        if duplicate {
            rows.push(row.clone());
        }
        rows.push(row);
    }

    rows
}

fn sample_product(rng: &mut StdRng, idx: usize) -> RawProduct {
    let (main, subs) = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
    let sub = subs[rng.gen_range(0..subs.len())];
    let brand = BRANDS.choose(rng).copied().unwrap_or("Acme");
    let noun = NOUNS.choose(rng).copied().unwrap_or("Gadget");

    // Log-uniform list prices between roughly 99 and 60,000.
    let actual: f64 = (rng.gen_range(4.6..11.0_f64)).exp().round();
    let discount_pct = rng.gen_range(0..=90) as f64;
    let discounted = (actual * (1.0 - discount_pct / 100.0)).round().max(1.0);

    let complaint_rate = if discount_pct >= 60.0 { 0.45 } else { 0.15 };
    let complaining = rng.gen::<f64>() < complaint_rate;
    let rating = if complaining {
        rng.gen_range(2.0..3.8_f64)
    } else {
        rng.gen_range(3.6..5.0_f64)
    };
    let rating_count = (rng.gen_range(0.0..12.0_f64)).exp().round();

    let phrases = if complaining { COMPLAINTS } else { PRAISE };
    let review = phrases.choose(rng).copied().unwrap_or_default();
    let title = review.split(',').next().unwrap_or(review);

    let mut row = RawProduct {
        product_id: format!("SYN{idx:05}"),
        product_name: format!("{brand} {noun} {}", idx % 97 + 1),
        category: format!("{main}|{sub}"),
        discounted_price: Some(format!("₹{}", format_number(discounted))),
        actual_price: Some(format!("₹{}", format_number(actual))),
        discount_percentage: Some(format!("{discount_pct}%")),
        rating: Some(format!("{rating:.1}")),
        rating_count: Some(format_number(rating_count)),
        review_title: Some(title.to_string()),
        review_content: Some(review.to_string()),
    };

    let roll = rng.gen::<f64>();
    if roll < 0.05 {
        row.rating = None;
    } else if roll < 0.07 {
        row.rating = Some("|".to_string());
    } else if roll < 0.09 {
        row.rating_count = None;
    } else if roll < 0.10 {
        row.actual_price = Some("N/A".to_string());
    }
    row
}

pub fn write_raw_catalog(path: &Path, rows: &[RawProduct]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|err| Error::io(path, err))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote synthetic catalog");
    Ok(())
}
