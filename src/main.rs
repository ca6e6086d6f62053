use std::error::Error;
use std::io;

use opportunity_board::config::{load_settings, settings_path};
use opportunity_board::models::{Opportunity, OpportunityFilter};
use opportunity_board::store::{self, FsObjectStore};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(default_filter: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(io::stderr))
    .init();
}

fn main() -> Result<(), Box<dyn Error>> {
  let settings = load_settings()?;
  init_tracing(&settings.log_filter);
  let config_path = settings_path()?;
  info!(path = %config_path.display(), "settings loaded");

  let conn = store::open(&settings.database_path)?;
  info!(path = %settings.database_path.display(), "database ready");

  let objects = FsObjectStore::new(&settings.object_store_root);
  objects.ensure_buckets()?;
  info!(root = %objects.root().display(), "object store ready");

  let published = OpportunityFilter {
    published_only: true,
    ..Default::default()
  };
  let opportunities = Opportunity::count(&conn, &OpportunityFilter::default())?;
  let published_pages = Opportunity::page_count(&conn, &published)?;
  info!(opportunities, published_pages, "board opened");
  Ok(())
}
