use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imscp_core::system::{FileStore, Persistence};
use imscp_core::{attach, BridgeConfig, CmiSource, ScormApi, ToolConfig};
use imscp_manifest::{extract_from_dir, extract_from_zip, ImsPackage};
use imscp_webcontent::{package_webcontent, plan_entrypoints, write_entrypoint, ScormAssets};

#[derive(Parser)]
#[command(name = "imscp", about = "IMS content package tools with SCORM session persistence")]
struct Cli {
    /// Tool config file (defaults to ./imscp.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the manifest of a package as JSON
    Extract {
        /// Package zip or extracted directory
        source: PathBuf,

        /// Where to unpack a zip (defaults to a temp dir)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Write one HTML5 zip per web content item
    Package {
        /// Package zip or extracted directory
        source: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// scormAPI.js to bundle with SCOs (overrides the config file)
        #[arg(long)]
        scorm_api: Option<PathBuf>,
    },
    /// Write one redirect zip per web content item, pointing into the package zip
    Entrypoints {
        /// Package zip
        zip: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a SCORM session against the persisted state and print its CMI data
    Session {
        /// Store file (overrides the config file)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Storage key (overrides the config file)
        #[arg(long)]
        key: Option<String>,

        /// Set a CMI element before saving, e.g. cmi.core.lesson_location=p3
        #[arg(long = "set", value_name = "ELEMENT=VALUE", value_parser = parse_assignment)]
        sets: Vec<(String, String)>,

        /// End with LMSFinish instead of LMSCommit
        #[arg(long)]
        finish: bool,
    },
    /// Print the stored CMI blob
    Show {
        /// Store file (overrides the config file)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Storage key (overrides the config file)
        #[arg(long)]
        key: Option<String>,
    },
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (element, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ELEMENT=VALUE, got {s:?}"))?;
    if element.is_empty() {
        return Err(format!("empty element name in {s:?}"));
    }
    Ok((element.to_string(), value.to_string()))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = ToolConfig::discover(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Extract { source, dest } => cmd_extract(&source, dest.as_deref()),
        Command::Package {
            source,
            out,
            scorm_api,
        } => cmd_package(&config, &source, &out, scorm_api),
        Command::Entrypoints { zip, out } => cmd_entrypoints(&zip, &out),
        Command::Session {
            store,
            key,
            sets,
            finish,
        } => cmd_session(&config, store, key, &sets, finish),
        Command::Show { store, key } => cmd_show(&config, store, key),
    }
}

/// Open a package from a zip or a directory. A zip without `dest` is
/// unpacked into `scratch`, which must outlive any use of the files.
fn open_package(
    source: &Path,
    dest: Option<&Path>,
    scratch: &mut Option<tempfile::TempDir>,
) -> Result<(ImsPackage, PathBuf)> {
    if source.is_dir() {
        let pkg = extract_from_dir(source)
            .with_context(|| format!("failed to read package {}", source.display()))?;
        return Ok((pkg, source.to_path_buf()));
    }
    let dir = match dest {
        Some(dest) => dest.to_path_buf(),
        None => scratch
            .insert(tempfile::tempdir().context("failed to create temp dir")?)
            .path()
            .to_path_buf(),
    };
    let pkg = extract_from_zip(source, &dir)
        .with_context(|| format!("failed to extract {}", source.display()))?;
    Ok((pkg, dir))
}

fn cmd_extract(source: &Path, dest: Option<&Path>) -> Result<()> {
    let mut scratch = None;
    let (pkg, _) = open_package(source, dest, &mut scratch)?;
    println!("{}", serde_json::to_string_pretty(&pkg)?);
    Ok(())
}

fn cmd_package(
    config: &ToolConfig,
    source: &Path,
    out: &Path,
    scorm_api: Option<PathBuf>,
) -> Result<()> {
    let mut scratch = None;
    let (pkg, ims_dir) = open_package(source, None, &mut scratch)?;
    let assets = scorm_api
        .or_else(|| config.scorm_api_js.clone())
        .map(|api_js| ScormAssets { api_js });
    if assets.is_none() {
        tracing::warn!("no scormAPI.js configured, SCOs are packaged without SCORM support");
    }

    let mut count = 0;
    for item in pkg.leaves() {
        if !item.is_webcontent() {
            tracing::debug!(item = ?item.identifier, "skipping non web content item");
            continue;
        }
        let packaged = package_webcontent(item, &ims_dir, out, assets.as_ref())
            .with_context(|| format!("failed to package item {:?}", item.identifier))?;
        println!("{}\t{}", packaged.identifier, packaged.zip_path.display());
        count += 1;
    }
    tracing::info!(count, out = %out.display(), "packaging done");
    Ok(())
}

fn cmd_entrypoints(zip: &Path, out: &Path) -> Result<()> {
    let mut scratch = None;
    let (pkg, _) = open_package(zip, None, &mut scratch)?;
    for entry in plan_entrypoints(&pkg) {
        let path = write_entrypoint(zip, &entry, out)
            .with_context(|| format!("failed to write entrypoint {}", entry.source_id))?;
        println!("{}\t{}", entry.source_id, path.display());
    }
    Ok(())
}

fn open_store(config: &ToolConfig, store: Option<PathBuf>) -> Result<FileStore> {
    let path = store.unwrap_or_else(|| config.resolved_store_path());
    FileStore::open(&path).with_context(|| format!("failed to open store {}", path.display()))
}

fn bridge_config(config: &ToolConfig, key: Option<String>) -> BridgeConfig {
    match key {
        Some(storage_key) => BridgeConfig { storage_key },
        None => config.bridge.clone(),
    }
}

/// Turn a `"false"` from the runtime into an error carrying its diagnostics.
fn check(api: &ScormApi, call: &str, result: &str) -> Result<()> {
    if result == "true" {
        return Ok(());
    }
    let code = api.lms_get_last_error();
    bail!(
        "{call} failed with {code} ({}): {}",
        api.lms_get_error_string(&code),
        api.lms_get_diagnostic(&code)
    )
}

fn cmd_session(
    config: &ToolConfig,
    store: Option<PathBuf>,
    key: Option<String>,
    sets: &[(String, String)],
    finish: bool,
) -> Result<()> {
    let store = open_store(config, store)?;
    let bridge = bridge_config(config, key);
    let mut api = ScormApi::new();
    let handle = attach(Some(&mut api), Some(store), &bridge)
        .context("failed to restore session state")?
        .context("bridge was not installed")?;
    tracing::info!(key = handle.key(), store = %handle.store().borrow().path().display(), "session ready");

    let result = api.lms_initialize("");
    check(&api, "LMSInitialize", result)?;
    for (element, value) in sets {
        let result = api.lms_set_value(element, value);
        check(&api, &format!("LMSSetValue({element})"), result)?;
    }
    if finish {
        let result = api.lms_finish("");
        check(&api, "LMSFinish", result)?;
    } else {
        let result = api.lms_commit("");
        check(&api, "LMSCommit", result)?;
    }

    println!("{}", serde_json::to_string_pretty(&api.cmi_json()?)?);
    Ok(())
}

fn cmd_show(config: &ToolConfig, store: Option<PathBuf>, key: Option<String>) -> Result<()> {
    let store = open_store(config, store)?;
    let bridge = bridge_config(config, key);
    let Some(blob) = store.load(&bridge.storage_key)? else {
        bail!("nothing stored under {:?} in {}", bridge.storage_key, store.path().display());
    };
    match serde_json::from_str::<serde_json::Value>(&blob) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{blob}"),
    }
    Ok(())
}
