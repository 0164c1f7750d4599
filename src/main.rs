use std::env;

use akin::{Akin, AkinConfig};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if env::var("AKIN_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// `akin [config.yaml]`: open the configured store and print what it holds.
fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match env::args().nth(1) {
        Some(path) => AkinConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => AkinConfig::default(),
    };
    let akin = Akin::open(config).context("failed to open akin store")?;

    println!("templates:");
    for template in akin.templates() {
        println!(
            "  {:<28} threshold={} shingles={} case_sensitive={} permutations={}",
            template.name,
            template.threshold,
            if template.use_shingles {
                template.shingle_length.to_string()
            } else {
                "-".to_string()
            },
            template.case_sensitive,
            template.signature_length,
        );
    }

    println!("data sources:");
    for ds in akin.datasources() {
        println!(
            "  {} ({} rows; fields: {}; cached signature passes: {})",
            ds.name(),
            ds.len(),
            ds.headers().join(", "),
            ds.signature_keys().count()
        );
        for group in ds.groups() {
            println!(
                "    {} clusters={} unindexable={}{}",
                group.key(),
                group.clusters().len(),
                group.unindexable().len(),
                if group.is_grouped() { "" } else { " (index only)" },
            );
        }
    }
    Ok(())
}
