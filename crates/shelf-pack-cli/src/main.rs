use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use globset::{Glob, GlobSetBuilder};
use handlebars::Handlebars;
use serde::Deserialize;
use shelf_pack_core::{BinId, Layout, PackOptions, PackRequest, ShelfPack, ShelfPackConfig};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "shelf-pack",
    about = "Compute shelf-packed atlas layouts for sprites and glyphs",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a request list (JSON/YAML) or a folder of images and export the layout
    Pack(PackArgs),
    /// Pack random requests and print time + occupancy
    Bench(BenchArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `{ bins: [...], stats, meta }`
    Json,
    /// `{ bins: { id: {...} }, stats, meta }`
    JsonHash,
    /// Full layout snapshot (shelves, live and free bins) as YAML
    Yaml,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SortOrder {
    /// Keep input order
    None,
    /// Tallest first; tends to fill shelves with exact height matches
    HeightDesc,
    AreaDesc,
    /// By id, for reproducible output across file systems
    NameAsc,
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Request file (.json/.yaml/.yml) or image file/directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output file (stdout when omitted)
    #[arg(short, long, help_heading = "Input/Output")]
    out: Option<PathBuf>,
    /// YAML/JSON config file path (atlas flags given on the command line win)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only images matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Images matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Atlas
    /// Initial atlas width [default: 64]
    #[arg(long, help_heading = "Atlas")]
    width: Option<u32>,
    /// Initial atlas height [default: 64]
    #[arg(long, help_heading = "Atlas")]
    height: Option<u32>,
    /// Grow the atlas when a request does not fit (`--auto-resize` or `--auto-resize=false`)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "Atlas")]
    auto_resize: Option<bool>,
    /// Order in which requests are packed
    #[arg(long, value_enum, default_value_t = SortOrder::None, help_heading = "Atlas")]
    sort_order: SortOrder,

    // Export
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, help_heading = "Export")]
    format: OutputFormat,
    /// Handlebars template rendered with the JSON layout (overrides --format)
    #[arg(long, help_heading = "Export")]
    template: Option<PathBuf>,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Dry run: compute layout and stats but do not write anything
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Number of random requests
    #[arg(long, default_value_t = 1000)]
    count: usize,
    /// Smallest side length
    #[arg(long, default_value_t = 8)]
    min: u32,
    /// Largest side length
    #[arg(long, default_value_t = 64)]
    max: u32,
    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Initial atlas size (square); the bench always auto-resizes
    #[arg(long, default_value_t = 64)]
    size: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Bench(b) => run_bench(b),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => YamlConfig::default(),
    };
    let cfg = resolve_config(file, cli);
    cfg.validate()?;

    if cli.print_config {
        println!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let mut requests = load_requests(cli, show_progress)?;
    sort_requests(&mut requests, cli.sort_order);
    info!(count = requests.len(), "loaded requests");

    let mut sprite = ShelfPack::new(cfg);
    let placed = sprite.pack(&mut requests, PackOptions { in_place: true });
    for r in requests.iter().filter(|r| r.x.is_none()) {
        let id = r.id.as_ref().map(ToString::to_string).unwrap_or_default();
        warn!(id = %id, w = r.w, h = r.h, "request not placed");
    }
    let layout = sprite.snapshot();
    let stats = layout.stats();
    info!(
        placed = placed.len(),
        skipped = requests.len() - placed.len(),
        "{}",
        stats.summary()
    );

    if cli.dry_run {
        return Ok(());
    }

    let text = render_layout(&layout, cli)?;
    match &cli.out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
            info!(?path, bins = layout.bins.len(), "layout written");
        }
        None => println!("{}", text),
    }

    if let Some(stats_path) = &cli.export_stats {
        shelf_pack_core::write_json(stats_path, &serde_json::to_value(stats)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
    }
    Ok(())
}

fn render_layout(layout: &Layout, cli: &PackArgs) -> anyhow::Result<String> {
    if let Some(template) = &cli.template {
        let source = fs::read_to_string(template)
            .with_context(|| format!("read template {}", template.display()))?;
        let mut hb = Handlebars::new();
        hb.register_template_string("layout", source)
            .with_context(|| format!("compile template {}", template.display()))?;
        let ctx = shelf_pack_core::to_json_array(layout);
        return Ok(hb.render("layout", &ctx)?);
    }
    Ok(match cli.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&shelf_pack_core::to_json_array(layout))?
        }
        OutputFormat::JsonHash => {
            serde_json::to_string_pretty(&shelf_pack_core::to_json_hash(layout))?
        }
        OutputFormat::Yaml => serde_yaml::to_string(layout)?,
    })
}

fn load_requests(cli: &PackArgs, show_progress: bool) -> anyhow::Result<Vec<PackRequest>> {
    let ext = cli
        .input
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => {
            let text = fs::read_to_string(&cli.input)
                .with_context(|| format!("read {}", cli.input.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parse {}", cli.input.display()))
        }
        Some("yaml" | "yml") => {
            let text = fs::read_to_string(&cli.input)
                .with_context(|| format!("read {}", cli.input.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parse {}", cli.input.display()))
        }
        _ => {
            let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
            read_image_sizes_with_progress(&cli.input, &paths, show_progress)
        }
    }
}

fn sort_requests(requests: &mut [PackRequest], order: SortOrder) {
    match order {
        SortOrder::None => {}
        SortOrder::HeightDesc => requests.sort_by(|a, b| b.h.cmp(&a.h).then(b.w.cmp(&a.w))),
        SortOrder::AreaDesc => {
            requests.sort_by_key(|r| std::cmp::Reverse((r.w as u64) * (r.h as u64)))
        }
        SortOrder::NameAsc => requests.sort_by(|a, b| a.id.cmp(&b.id)),
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg")
    )
}

/// Reads only image headers; pixels are never decoded.
fn read_image_sizes_with_progress(
    root: &Path,
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<PackRequest>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} reading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match image::image_dimensions(p) {
            Ok((w, h)) => {
                let rel = p.strip_prefix(root).unwrap_or(p);
                let key = rel.to_string_lossy().replace('\\', "/");
                let id = if key.is_empty() {
                    p.to_string_lossy().replace('\\', "/")
                } else {
                    key
                };
                list.push(PackRequest::new(w, h).with_id(BinId::try_from(id)?));
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    use rand::{Rng, SeedableRng};
    use std::time::Instant;
    anyhow::ensure!(
        b.min > 0 && b.min <= b.max,
        "invalid size range {}..={}",
        b.min,
        b.max
    );
    let mut rng = rand::rngs::StdRng::seed_from_u64(b.seed);
    let mut requests: Vec<PackRequest> = (0..b.count)
        .map(|_| PackRequest::new(rng.gen_range(b.min..=b.max), rng.gen_range(b.min..=b.max)))
        .collect();
    let cfg = ShelfPackConfig::builder()
        .with_dimensions(b.size, b.size)
        .auto_resize(true)
        .build();
    let mut sprite = ShelfPack::new(cfg);
    let start = Instant::now();
    let placed = sprite.pack(&mut requests, PackOptions::default());
    let dur = start.elapsed();
    let stats = sprite.stats();
    println!(
        "bins={} size={}x{} shelves={} occupancy={:.2}% time={}",
        placed.len(),
        stats.width,
        stats.height,
        stats.num_shelves,
        stats.occupancy * 100.0,
        bench_fmt_dur(dur)
    );
    Ok(())
}

fn bench_fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(alias = "autoResize")]
    auto_resize: Option<bool>,
}

impl YamlConfig {
    fn into_config(self, mut cfg: ShelfPackConfig) -> ShelfPackConfig {
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.auto_resize {
            cfg.auto_resize = v;
        }
        cfg
    }
}

/// Layers defaults, then the config file, then explicit atlas flags.
fn resolve_config(file: YamlConfig, cli: &PackArgs) -> ShelfPackConfig {
    let flags = YamlConfig {
        width: cli.width,
        height: cli.height,
        auto_resize: cli.auto_resize,
    };
    flags.into_config(file.into_config(ShelfPackConfig::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_config_overrides_only_given_fields() {
        let y: YamlConfig = serde_yaml::from_str("width: 256\nautoResize: true\n").unwrap();
        let cfg = y.into_config(ShelfPackConfig::builder().with_dimensions(64, 32).build());
        assert_eq!((cfg.width, cfg.height, cfg.auto_resize), (256, 32, true));
    }

    #[test]
    fn atlas_flags_override_config_file() {
        let file: YamlConfig =
            serde_yaml::from_str("width: 256\nheight: 128\nauto_resize: true\n").unwrap();
        let args =
            PackArgs::try_parse_from(["pack", "in.json", "--width", "512", "--auto-resize=false"])
                .unwrap();
        let cfg = resolve_config(file, &args);
        assert_eq!((cfg.width, cfg.height, cfg.auto_resize), (512, 128, false));

        // Without flags the file wins over defaults, and bare --auto-resize means true.
        let args = PackArgs::try_parse_from(["pack", "in.json", "--auto-resize"]).unwrap();
        let cfg = resolve_config(YamlConfig::default(), &args);
        assert_eq!((cfg.width, cfg.height, cfg.auto_resize), (64, 64, true));
        let file: YamlConfig = serde_yaml::from_str("width: 256\n").unwrap();
        let args = PackArgs::try_parse_from(["pack", "in.json"]).unwrap();
        assert_eq!(resolve_config(file, &args).width, 256);
    }

    #[test]
    fn yaml_requests_accept_width_height_aliases() {
        let reqs: Vec<PackRequest> =
            serde_yaml::from_str("- id: a\n  width: 4\n  height: 6\n- w: 2\n  h: 3\n").unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!((reqs[0].w, reqs[0].h), (4, 6));
        assert_eq!(reqs[1].id, None);
    }

    #[test]
    fn height_desc_sort_is_tallest_first() {
        let mut reqs = vec![
            PackRequest::new(1, 2),
            PackRequest::new(5, 9),
            PackRequest::new(3, 9),
        ];
        sort_requests(&mut reqs, SortOrder::HeightDesc);
        let dims: Vec<(u32, u32)> = reqs.iter().map(|r| (r.w, r.h)).collect();
        assert_eq!(dims, vec![(5, 9), (3, 9), (1, 2)]);
    }

    #[test]
    fn glob_filters_apply_to_paths() {
        let mut b = GlobSetBuilder::new();
        b.add(Glob::new("**/skip/**").unwrap());
        let exclude = b.build().unwrap();
        assert!(should_skip(Path::new("a/skip/b.png"), None, Some(&exclude)));
        assert!(!should_skip(Path::new("a/keep/b.png"), None, Some(&exclude)));
        assert!(is_image(Path::new("x.PNG")));
        assert!(!is_image(Path::new("x.txt")));
    }

    #[test]
    fn template_renders_layout() {
        let mut sprite = ShelfPack::with_size(32, 32);
        sprite.pack_one(8, 8, Some(BinId::Named("a".into()))).unwrap();
        let layout = sprite.snapshot();
        let mut hb = Handlebars::new();
        hb.register_template_string("t", "{{#each bins}}{{id}}@{{x}},{{y}};{{/each}}")
            .unwrap();
        let out = hb
            .render("t", &shelf_pack_core::to_json_array(&layout))
            .unwrap();
        assert_eq!(out, "a@0,0;");
    }
}
