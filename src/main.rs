mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use catalog_intel::config::{default_config_path, AppConfig, LoggingConfig};
use catalog_intel::insights::build_report;
use catalog_intel::rules::{
    assign_badge, compare, explore, find_product, recommend, simulate_deal, ComparisonOutcome,
    Preference, ProductDetail, ProductFilter, RecommendQuery, Side, WhatIfInput,
};
use catalog_intel::snapshot::{write_enriched, Snapshot};
use catalog_intel::synthetic::{generate_raw_catalog, write_raw_catalog, DEFAULT_CATALOG_SIZE};
use catalog_intel::{
    format_float, format_number, format_percent, Error, Product, Result, SegmentName,
};

#[derive(Parser)]
#[command(name = "catalog-intel", about = "Product catalog scoring and decision rules")]
struct Cli {
    /// TOML config file (defaults to CATALOG_CONFIG_PATH or config/catalog.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a raw catalog and write the enriched file.
    Run(RunArgs),
    /// Write a seeded synthetic raw catalog.
    Demo(DemoArgs),
    Explore(ExploreArgs),
    Recommend(RecommendArgs),
    Compare(CompareArgs),
    /// What-if pricing for one product.
    Simulate(SimulateArgs),
    Insights(InsightsArgs),
    /// Serve the read-only JSON API.
    Serve(ServeArgs),
    /// Write the effective configuration to disk.
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct DemoArgs {
    /// Defaults to the configured pipeline input.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_CATALOG_SIZE)]
    rows: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Also run the pipeline over the generated file.
    #[arg(long)]
    score: bool,
}

#[derive(Args, Debug, Clone)]
struct CatalogArgs {
    /// Enriched catalog (defaults to the configured pipeline output).
    #[arg(long)]
    enriched: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ExploreArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    segment: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_discount: Option<f64>,
    #[arg(long)]
    max_discount: Option<f64>,
    #[arg(long)]
    min_rating: Option<f64>,
    #[arg(long)]
    max_rating: Option<f64>,
    #[arg(long)]
    risk_only: bool,
    #[arg(long, default_value_t = 20)]
    limit: usize,
    /// Show the drill-down view for one product id or name.
    #[arg(long)]
    product: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct RecommendArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    #[arg(long, default_value_t = 2000.0)]
    budget: f64,
    #[arg(long, default_value_t = 3.5)]
    min_rating: f64,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, default_value = "best overall")]
    preference: String,
    #[arg(long, default_value_t = 15)]
    top_n: usize,
}

#[derive(Args, Debug, Clone)]
struct CompareArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Product id or name.
    a: String,
    b: String,
}

#[derive(Args, Debug, Clone)]
struct SimulateArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    product: String,
    #[arg(long)]
    actual: f64,
    #[arg(long)]
    discounted: f64,
}

#[derive(Args, Debug, Clone)]
struct InsightsArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    #[arg(long, default_value_t = 10)]
    risky_limit: usize,
    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long)]
    path: Option<PathBuf>,
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = AppConfig::load(cli.config)?;
    init_logging(&config.logging);
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Run(args) => run_pipeline(&config, args),
        Command::Demo(args) => run_demo(&config, args),
        Command::Explore(args) => run_explore(&config, args),
        Command::Recommend(args) => run_recommend(&config, args),
        Command::Compare(args) => run_compare(&config, args),
        Command::Simulate(args) => run_simulate(&config, args),
        Command::Insights(args) => run_insights(&config, args),
        Command::Serve(args) => run_serve(config, args).await,
        Command::InitConfig(args) => run_init_config(&config, args),
    }
}

fn run_pipeline(config: &AppConfig, args: RunArgs) -> Result<()> {
    let input = args.input.unwrap_or_else(|| config.pipeline.input.clone());
    let output = args.output.unwrap_or_else(|| config.pipeline.output.clone());
    score_catalog(config, &input, &output)
}

fn score_catalog(config: &AppConfig, input: &Path, output: &Path) -> Result<()> {
    let pipeline = config.build_pipeline()?;
    let snapshot = Snapshot::build(&pipeline, input)?;
    write_enriched(output, &snapshot.products)?;

    if let Some(report) = snapshot.report.as_ref() {
        println!(
            "Rows read: {} | duplicates removed: {} | invalid dropped: {} | kept: {}",
            format_number(report.rows_read as f64),
            format_number(report.duplicates_removed as f64),
            format_number(report.invalid_dropped as f64),
            format_number(report.rows_kept as f64)
        );
        println!(
            "Imputed: rating {} | rating_count {}",
            format_number(report.ratings_imputed as f64),
            format_number(report.rating_counts_imputed as f64)
        );
    }
    println!("Segments:");
    for segment in SegmentName::ALL {
        let count = snapshot
            .products
            .iter()
            .filter(|product| product.segment_name == segment)
            .count();
        println!("  {}: {}", segment.label(), format_number(count as f64));
    }
    println!("Wrote {} ({})", output.display(), snapshot.id);
    Ok(())
}

fn run_demo(config: &AppConfig, args: DemoArgs) -> Result<()> {
    let output = args.output.unwrap_or_else(|| config.pipeline.input.clone());
    let rows = generate_raw_catalog(args.rows, args.seed);
    write_raw_catalog(&output, &rows)?;
    println!("Wrote {} raw rows to {}", rows.len(), output.display());

    if args.score {
        score_catalog(config, &output, &config.pipeline.output)?;
    }
    Ok(())
}

fn load_catalog(config: &AppConfig, args: &CatalogArgs) -> Result<Snapshot> {
    let path = args
        .enriched
        .clone()
        .unwrap_or_else(|| config.pipeline.output.clone());
    Snapshot::from_enriched(&path, config.features.discount_weight)
}

fn run_explore(config: &AppConfig, args: ExploreArgs) -> Result<()> {
    let snapshot = load_catalog(config, &args.catalog)?;

    if let Some(key) = args.product.as_deref() {
        let product = find_product(&snapshot.products, key)
            .ok_or_else(|| Error::UnknownProduct(key.to_string()))?;
        print_detail(&ProductDetail::new(product));
        return Ok(());
    }

    let segment = match args.segment.as_deref() {
        Some(label) => Some(SegmentName::from_label(label).ok_or_else(|| {
            Error::Config(format!("unknown segment: {}", label))
        })?),
        None => None,
    };
    let filter = ProductFilter {
        search: args.search,
        category: args.category,
        segment,
        min_price: args.min_price,
        max_price: args.max_price,
        min_discount: args.min_discount,
        max_discount: args.max_discount,
        min_rating: args.min_rating,
        max_rating: args.max_rating,
        risk_only: args.risk_only,
    };

    let matches = explore(&snapshot.products, &filter);
    println!("{} matching products", format_number(matches.len() as f64));
    for product in matches.iter().take(args.limit) {
        print_row(product);
    }
    Ok(())
}

fn run_recommend(config: &AppConfig, args: RecommendArgs) -> Result<()> {
    let snapshot = load_catalog(config, &args.catalog)?;
    let preference = Preference::from_label(&args.preference)
        .ok_or_else(|| Error::Config(format!("unknown preference: {}", args.preference)))?;
    let query = RecommendQuery {
        budget: args.budget,
        min_rating: args.min_rating,
        category: args.category,
        preference,
        top_n: args.top_n,
    };

    let ranked = recommend(&snapshot.products, &query, &config.ranking);
    if ranked.is_empty() {
        println!("No products match the budget and rating filters.");
        return Ok(());
    }
    println!("Top {} for \"{}\":", ranked.len(), preference.label());
    for (idx, item) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {} [{}]",
            idx + 1,
            format_float(item.final_score, 3),
            item.product.product_id
        );
        print_row(item.product);
    }
    Ok(())
}

fn run_compare(config: &AppConfig, args: CompareArgs) -> Result<()> {
    let snapshot = load_catalog(config, &args.catalog)?;
    let lookup = |key: &str| {
        find_product(&snapshot.products, key).ok_or_else(|| Error::UnknownProduct(key.to_string()))
    };
    let a = lookup(&args.a)?;
    let b = lookup(&args.b)?;
    let result = compare(a, b, &config.ranking.best_overall);

    println!("A: {} ({})", a.product_name, format_float(result.score_a, 2));
    println!("B: {} ({})", b.product_name, format_float(result.score_b, 2));
    match result.outcome {
        ComparisonOutcome::Winner { side } => {
            let winner = if side == Side::A { a } else { b };
            println!("Winner: {}", winner.product_name);
        }
        ComparisonOutcome::Tie { trust_leader } => {
            println!("Tie on overall score.");
            if let Some(side) = trust_leader {
                let leader = if side == Side::A { a } else { b };
                println!("Higher trust: {}", leader.product_name);
            }
        }
    }
    Ok(())
}

fn run_simulate(config: &AppConfig, args: SimulateArgs) -> Result<()> {
    let snapshot = load_catalog(config, &args.catalog)?;
    let product = find_product(&snapshot.products, &args.product)
        .ok_or_else(|| Error::UnknownProduct(args.product.clone()))?;
    let scaling = snapshot
        .value_scaling
        .as_ref()
        .ok_or_else(|| Error::EmptyInput(snapshot.source.clone()))?;
    let outcome = simulate_deal(
        product,
        scaling,
        &WhatIfInput {
            new_actual_price: args.actual,
            new_discounted_price: args.discounted,
        },
    )?;

    println!("{}", product.product_name);
    println!(
        "Discount: {} -> {}",
        format_percent(product.discount_percentage),
        format_percent(outcome.new_discount_percentage)
    );
    println!(
        "Value score: {} -> {} ({:?})",
        format_float(product.value_score, 1),
        format_float(outcome.new_value_score, 1),
        outcome.trend
    );
    println!(
        "Trust {} | popularity {}",
        format_float(outcome.trust_score, 1),
        format_float(outcome.popularity_score, 1)
    );
    println!("Simulated segment: {}", outcome.segment.label());
    Ok(())
}

fn run_insights(config: &AppConfig, args: InsightsArgs) -> Result<()> {
    let snapshot = load_catalog(config, &args.catalog)?;
    let report = build_report(&snapshot.products, args.risky_limit);

    if args.json {
        let payload = serde_json::to_string_pretty(&report)
            .map_err(|err| Error::Config(format!("failed to serialize report: {}", err)))?;
        println!("{}", payload);
        return Ok(());
    }

    let kpis = &report.kpis;
    println!("Products: {}", format_number(kpis.product_count as f64));
    let show = |value: Option<f64>, digits: usize| {
        value
            .map(|value| format_float(value, digits))
            .unwrap_or_else(|| "-".to_string())
    };
    println!(
        "Avg rating {} | avg discount {} | avg trust {}",
        show(kpis.avg_rating, 2),
        kpis.avg_discount
            .map(format_percent)
            .unwrap_or_else(|| "-".to_string()),
        show(kpis.avg_trust, 1)
    );

    println!("\nCategories:");
    for category in &report.categories {
        println!(
            "  {:<28} {:>5} | discount {} | rating {} | trust {}",
            category.main_category,
            category.product_count,
            format_percent(category.avg_discount),
            format_float(category.avg_rating, 2),
            format_float(category.avg_trust, 1)
        );
    }

    let highlights = &report.highlights;
    println!();
    if let Some(top) = highlights.highest_discount_category.as_ref() {
        println!(
            "Highest average discount: {} ({})",
            top.main_category,
            format_percent(top.average)
        );
    }
    if let Some(top) = highlights.most_trusted_category.as_ref() {
        println!(
            "Most trusted category: {} ({})",
            top.main_category,
            format_float(top.average, 1)
        );
    }
    println!(
        "Discount traps: {} | best deals: {}",
        highlights.discount_trap_count, highlights.best_deals_count
    );

    let reviews = &report.reviews;
    println!(
        "\nAvg sentiment {} | risk flagged {} ({})",
        format_float(reviews.avg_sentiment, 3),
        reviews.risk_count,
        format_percent(reviews.risk_percentage)
    );
    for product in &reviews.riskiest {
        println!(
            "  {} [{}] sentiment {}",
            product.product_name,
            product.product_id,
            format_float(product.sentiment_score, 3)
        );
    }
    Ok(())
}

async fn run_serve(config: AppConfig, args: ServeArgs) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let pipeline = config.build_pipeline()?;
    let snapshot = Snapshot::build(&pipeline, &config.pipeline.input)?;
    tracing::info!(
        snapshot = %snapshot.id,
        products = snapshot.products.len(),
        "initial catalog snapshot ready"
    );

    let state = server::AppState::new(config, pipeline, snapshot);
    server::serve(state, &host, port).await
}

fn run_init_config(config: &AppConfig, args: InitConfigArgs) -> Result<()> {
    let path = args
        .path
        .or_else(default_config_path)
        .unwrap_or_else(|| PathBuf::from("config/catalog.toml"));
    if path.exists() && !args.force {
        return Err(Error::Config(format!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        )));
    }
    config.write(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_row(product: &Product) {
    let badge = assign_badge(product)
        .map(|badge| format!(" [{}]", badge.label()))
        .unwrap_or_default();
    println!(
        "     {}{} | {} | {} off | rating {} | value {} trust {} pop {} | {}",
        product.product_name,
        badge,
        format_number(product.discounted_price),
        format_percent(product.discount_percentage),
        format_float(product.rating, 1),
        format_float(product.value_score, 1),
        format_float(product.trust_score, 1),
        format_float(product.popularity_score, 1),
        product.segment_name.label()
    );
}

fn print_detail(detail: &ProductDetail<'_>) {
    let product = detail.product;
    println!("{} [{}]", product.product_name, product.product_id);
    println!("Category: {}", product.category);
    println!(
        "Price: {} (list {}, {} off, {} bucket)",
        format_number(product.discounted_price),
        format_number(product.actual_price),
        format_percent(product.discount_percentage),
        product.price_bucket.label()
    );
    println!(
        "Rating: {} from {} reviews (weighted {})",
        format_float(product.rating, 1),
        format_number(product.rating_count as f64),
        format_float(product.weighted_rating, 2)
    );
    println!(
        "Scores: value {} | trust {} | popularity {}",
        format_float(product.value_score, 1),
        format_float(product.trust_score, 1),
        format_float(product.popularity_score, 1)
    );
    println!("Segment: {}", product.segment_name.label());
    if let Some(badge) = detail.badge {
        println!("Badge: {}", badge.label());
    }
    println!(
        "Sentiment: {} ({}){}",
        detail.sentiment.label(),
        format_float(product.sentiment_score, 3),
        if product.is_risky() { " | risk flagged" } else { "" }
    );
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
