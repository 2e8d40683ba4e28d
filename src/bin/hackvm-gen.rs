use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hackvm_gen::programs::{self, Builder, CATALOG};
use hackvm_gen::writer::write_all;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Regenerate the HackVM demo binaries"
)]
struct Opts {
    /// Output directory (created if missing)
    #[arg(short, long, default_value = "demos")]
    out_dir: PathBuf,
    /// Only generate the named program(s)
    #[arg(long, value_name = "NAME")]
    only: Vec<String>,
    /// List program names and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    if opts.list {
        for (name, _) in CATALOG {
            println!("{name}");
        }
        return Ok(());
    }

    let selected: Vec<Builder> = if opts.only.is_empty() {
        CATALOG.iter().map(|&(_, build)| build).collect()
    } else {
        opts.only
            .iter()
            .map(|name| programs::builder(name).ok_or_else(|| anyhow!("unknown program: {name}")))
            .collect::<Result<_>>()?
    };

    // each program is built, written and reported before the next is built
    write_all(&opts.out_dir, selected.iter().map(|build| build()), |path, n| {
        println!("Wrote {n} bytes to {}", path.display());
    })?;
    Ok(())
}
