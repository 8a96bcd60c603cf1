use anyhow::{anyhow, Context};
use bpaf::Bpaf;
use camino::Utf8PathBuf;
use libpaths::backend::DEFAULT_LIBRARIES;
use libpaths::{LibPathsCache, LibPathsConfig, LoaderCacheImage, Version};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options)]
struct Options {
    #[bpaf(short, long)]
    /// Verbose output
    verbose: bool,

    #[bpaf(short('C'), long, argument("CACHE"))]
    /// Use an alternative loader cache file
    source: Option<Utf8PathBuf>,

    #[bpaf(short, long, argument("FILE"))]
    /// Use an alternative local store file
    store: Option<Utf8PathBuf>,

    #[bpaf(long)]
    /// Neither read nor write the local store
    no_store: bool,

    #[bpaf(long, argument("DIR"))]
    /// Directory guessed for libraries that are not found
    fallback_dir: Option<Utf8PathBuf>,

    #[bpaf(short, long, argument("NAME=VERSION"))]
    /// Check that a library is at least the given version
    minimum: Vec<String>,

    #[bpaf(short, long)]
    /// Print every resolved library
    print: bool,

    #[bpaf(long, argument("FILE"))]
    /// Write a loader cache image listing the given absolute paths and exit
    emit_image: Option<Utf8PathBuf>,

    #[bpaf(positional("NAME"))]
    /// Library short names to resolve
    names: Vec<String>,
}

/// Initialize the tracing subscriber
///
/// DEBUG when `verbose` is set, INFO otherwise; `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(filter_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(verbose)
        .with_target(verbose)
        .with_line_number(verbose)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    debug!("Logging initialized with level: {}", filter_level);
}

fn main() -> anyhow::Result<()> {
    let options = options().run();

    init_logging(options.verbose);

    if let Some(target) = &options.emit_image {
        let image = LoaderCacheImage::from_paths(options.names.as_slice());
        image.write_to_file(target)?;
        info!("Wrote {} bytes to {}", image.size(), target);
        return Ok(());
    }

    let config = LibPathsConfig::builder()
        .maybe_source(options.source.clone())
        .maybe_store(options.store.clone())
        .persist(!options.no_store)
        .maybe_fallback_dir(options.fallback_dir.clone())
        .build();

    let names: Vec<&str> = if options.names.is_empty() {
        DEFAULT_LIBRARIES.to_vec()
    } else {
        options.names.iter().map(String::as_str).collect()
    };

    let requirements = options
        .minimum
        .iter()
        .map(String::as_str)
        .map(parse_requirement)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cache = LibPathsCache::open_with(config, &names).context("Loader cache unavailable")?;

    if options.print {
        print!("{}", cache);
    } else {
        for name in &names {
            println!("{} => {}", name, cache.full_path(name));
        }
    }

    for (name, version) in &requirements {
        let verdict = if cache.meets_minimum(name, version) {
            "yes"
        } else {
            "no"
        };
        println!("{} >= {}: {}", name, version, verdict);
    }

    cache.close();

    Ok(())
}

fn parse_requirement(spec: &str) -> anyhow::Result<(String, Version)> {
    let (name, version) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=VERSION, got {:?}", spec))?;
    let version = version
        .parse::<Version>()
        .with_context(|| format!("Bad version for {}", name))?;
    Ok((name.to_string(), version))
}
