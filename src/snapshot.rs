use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::scoring::{NormalizeReport, ScoringPipeline, ValueScaling};
use crate::{stable_hash64, Error, Product, RawProduct, Result, REQUIRED_COLUMNS};

/// Header of the enriched output file, in `Product` field order.
pub const ENRICHED_COLUMNS: [&str; 22] = [
    "product_id",
    "product_name",
    "category",
    "discounted_price",
    "actual_price",
    "discount_percentage",
    "rating",
    "rating_count",
    "review_title",
    "review_content",
    "discount_amount",
    "discount_ratio",
    "price_bucket",
    "main_category",
    "popularity_score",
    "weighted_rating",
    "trust_score",
    "value_score",
    "segment",
    "segment_name",
    "sentiment_score",
    "risk_flag",
];

/// Raw rows plus a content id of the file they came from.
#[derive(Debug, Clone)]
pub struct RawCatalog {
    pub id: String,
    pub rows: Vec<RawProduct>,
    /// Records the reader could not map onto the raw schema at all.
    pub malformed_rows: usize,
}

pub fn load_raw_catalog(path: &Path) -> Result<RawCatalog> {
    let bytes = read_input(path)?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(Error::MissingColumn(column.to_string()));
        }
    }

    let mut rows = Vec::new();
    let mut malformed_rows = 0usize;
    for (line, record) in reader.deserialize::<RawProduct>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(err) => {
                malformed_rows += 1;
                tracing::debug!(record = line + 1, error = %err, "skipping malformed record");
            }
        }
    }
    if malformed_rows > 0 {
        tracing::warn!(malformed_rows, "skipped records that did not match the catalog schema");
    }
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded raw catalog");

    Ok(RawCatalog {
        id: content_id(&bytes),
        rows,
        malformed_rows,
    })
}

/// Writes the enriched catalog through a temporary file so readers never see
/// a half-written table. An empty catalog still gets a header row.
pub fn write_enriched(path: &Path, products: &[Product]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    if products.is_empty() {
        writer.write_record(ENRICHED_COLUMNS)?;
    }
    for product in products {
        writer.serialize(product)?;
    }
    let payload = writer
        .into_inner()
        .map_err(|err| Error::io(path, err.into_error()))?;

    let tmp_path = path.with_extension("csv.tmp");
    std::fs::write(&tmp_path, payload).map_err(|err| Error::io(&tmp_path, err))?;
    std::fs::rename(&tmp_path, path).map_err(|err| Error::io(path, err))?;
    tracing::info!(path = %path.display(), products = products.len(), "wrote enriched catalog");
    Ok(())
}

pub fn load_enriched(path: &Path) -> Result<Vec<Product>> {
    let bytes = read_input(path)?;
    parse_enriched(&bytes)
}

fn parse_enriched(bytes: &[u8]) -> Result<Vec<Product>> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(bytes);
    let products = reader
        .deserialize::<Product>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(products)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|err| Error::io(path, err))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::EmptyInput(path.to_path_buf()));
    }
    Ok(bytes)
}

fn content_id(bytes: &[u8]) -> String {
    format!("{:016x}", stable_hash64(bytes))
}

/// One immutable, fully scored catalog. Readers share it through an `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub id: String,
    pub source: PathBuf,
    pub products: Vec<Product>,
    /// Bounds the what-if simulator scores against; `None` for an empty catalog.
    #[serde(skip)]
    pub value_scaling: Option<ValueScaling>,
    pub report: Option<NormalizeReport>,
}

impl Snapshot {
    /// Runs the full pipeline over a raw catalog file.
    pub fn build(pipeline: &ScoringPipeline, input: &Path) -> Result<Self> {
        let catalog = load_raw_catalog(input)?;
        let output = pipeline.run(catalog.rows)?;
        Ok(Self {
            id: catalog.id,
            source: input.to_path_buf(),
            value_scaling: output.stats.as_ref().map(|stats| stats.scaling.value),
            products: output.products,
            report: Some(output.report),
        })
    }

    /// Loads an already enriched file. The value bounds are rebuilt from the
    /// stored columns, which match the bounds of the run that wrote them.
    pub fn from_enriched(path: &Path, discount_weight: f64) -> Result<Self> {
        let bytes = read_input(path)?;
        let products = parse_enriched(&bytes)?;
        tracing::info!(path = %path.display(), products = products.len(), "loaded enriched catalog");
        Ok(Self {
            id: content_id(&bytes),
            source: path.to_path_buf(),
            value_scaling: ValueScaling::from_products(&products, discount_weight),
            products,
            report: None,
        })
    }
}

/// Copy-on-write holder for the live snapshot.
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub async fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().await;
        Arc::clone(&guard)
    }

    /// Swaps in a new snapshot and returns the one it replaced.
    pub async fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let mut guard = self.current.write().await;
        tracing::info!(from = %guard.id, to = %snapshot.id, "swapped catalog snapshot");
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::product;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("catalog-intel-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_raw_catalog(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[test]
    fn blank_file_is_empty_input() {
        let path = temp_path("blank.csv");
        std::fs::write(&path, " \n\n").unwrap();
        assert!(matches!(load_raw_catalog(&path), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn header_must_carry_required_columns() {
        let path = temp_path("no_rating.csv");
        std::fs::write(
            &path,
            "product_id,product_name,category,discounted_price,actual_price,discount_percentage,rating_count\n\
             p1,Cable,Electronics,100,200,50%,10\n",
        )
        .unwrap();
        match load_raw_catalog(&path) {
            Err(Error::MissingColumn(column)) => assert_eq!(column, "rating"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn raw_rows_keep_strings_and_ignore_extra_columns() {
        let path = temp_path("raw.csv");
        std::fs::write(
            &path,
            "product_id,product_name,category,discounted_price,actual_price,discount_percentage,rating,rating_count,img_link\n\
             p1, Cable ,Electronics|Cables,\"₹1,099\",\"₹2,000\",45%,,\"1,024\",http://x\n",
        )
        .unwrap();
        let catalog = load_raw_catalog(&path).unwrap();
        assert_eq!(catalog.rows.len(), 1);
        let row = &catalog.rows[0];
        assert_eq!(row.product_name, "Cable");
        assert_eq!(row.discounted_price.as_deref(), Some("₹1,099"));
        assert_eq!(row.rating, None);
        assert_eq!(row.review_content, None);
        assert_eq!(catalog.id.len(), 16);
    }

    #[test]
    fn enriched_file_round_trips() {
        let path = temp_path("enriched.csv");
        let mut first = product("p1", 12.345678901234567, 99.99999999999999, 0.1);
        first.review_content = Some("Good, but \"loud\"".to_string());
        let products = vec![first, product("p2", 50.0, 50.0, 50.0)];

        write_enriched(&path, &products).unwrap();
        assert_eq!(load_enriched(&path).unwrap(), products);
    }

    #[test]
    fn empty_catalog_writes_header_only() {
        let path = temp_path("empty_enriched.csv");
        write_enriched(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("product_id,product_name"));
        assert!(load_enriched(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_swaps_whole_snapshots() {
        let snapshot = |id: &str| Snapshot {
            id: id.to_string(),
            source: PathBuf::from("catalog.csv"),
            products: vec![product(id, 1.0, 2.0, 3.0)],
            value_scaling: None,
            report: None,
        };
        let store = SnapshotStore::new(snapshot("first"));
        let held = store.current().await;

        let previous = store.replace(snapshot("second")).await;
        assert_eq!(previous.id, "first");
        assert_eq!(held.id, "first");
        assert_eq!(store.current().await.id, "second");
    }
}
