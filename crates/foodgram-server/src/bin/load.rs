//! Bulk-load reference data from CSV.
//!
//! ```text
//! foodgram-load ingredients data/ingredients.csv
//! foodgram-load tags data/tags.csv
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;

const USAGE: &str = "usage: foodgram-load <ingredients|tags> <file.csv>";

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(kind), Some(file)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let db_path = std::env::var("FOODGRAM_DB_PATH").unwrap_or_else(|_| "foodgram.db".into());
    let db = foodgram_db::Database::open(&PathBuf::from(&db_path))?;

    let reader = BufReader::new(File::open(&file).with_context(|| format!("Cannot open {}", file))?);
    let report = match kind.as_str() {
        "ingredients" => db.import_ingredients(reader)?,
        "tags" => db.import_tags(reader)?,
        other => bail!("unknown data set '{}'; {}", other, USAGE),
    };

    info!(
        "Loaded {} from {} into {}: {} inserted, {} already present, {} malformed",
        kind, file, db_path, report.inserted, report.duplicates, report.malformed
    );
    Ok(())
}
