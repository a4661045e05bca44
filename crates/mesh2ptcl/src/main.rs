use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, info, warn};
use particle_morph::mesh::{obj::parse_obj, sample_asset, MeshAsset, MeshSource, ObjSource};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{Cursor, Read},
    path::{Path, PathBuf},
    time::Instant,
};
use walkdir::WalkDir;

/// Output encoding for baked point resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Binary PTCL (optionally zlib-compressed).
    Ptcl,
    /// JSON `{positions, colors}` document.
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Ptcl => "ptcl",
            Format::Json => "json",
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mesh2ptcl", version)]
struct Args {
    #[arg(long, default_value = "meshes")]
    input_dir: String,

    #[arg(long, default_value = "assets")]
    output_dir: String,

    /// Points per baked resource. The loader decimates to its own target, so
    /// bake for the largest device class.
    #[arg(long, default_value_t = 24_000)]
    count: usize,

    #[arg(long, value_enum, default_value_t = Format::Ptcl)]
    format: Format,

    /// zlib-compress PTCL payloads (`--compress false` to disable)
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    compress: bool,

    /// Base seed; each mesh derives its own from this and its index.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// If both exist, prefer `<name>.zip` over `<name>.obj`
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    prefer_zip: bool,

    /// Only bake these names (file stems). Repeatable.
    #[arg(long)]
    only: Vec<String>,
}

/// One resolved input per stem.
#[derive(Debug, Default)]
struct LocalIndex {
    by_stem: BTreeMap<String, PathBuf>,
}

fn lower_ext(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default()
}

fn build_local_index(input_dir: &str, prefer_zip: bool) -> LocalIndex {
    let mut index = LocalIndex::default();

    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let ext = lower_ext(&path);
        if ext != "obj" && ext != "zip" {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_owned();
        if stem.is_empty() {
            continue;
        }

        index
            .by_stem
            .entry(stem)
            .and_modify(|existing| {
                let existing_is_zip = lower_ext(existing) == "zip";
                if prefer_zip && !existing_is_zip && ext == "zip" {
                    *existing = path.clone();
                }
            })
            .or_insert_with(|| path.clone());
    }

    index
}

/// Load a mesh from a plain `.obj` or a `.zip` holding one `.obj`. Material
/// libraries are only resolved for plain files.
fn load_mesh(path: &Path) -> Result<MeshAsset> {
    if lower_ext(path) != "zip" {
        return Ok(ObjSource::new(path).load_asset()?);
    }

    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let obj_name = archive
        .file_names()
        .find(|n| n.to_ascii_lowercase().ends_with(".obj"))
        .context("No .obj file found in zip archive")?
        .to_owned();

    debug!("Found OBJ file in ZIP: {}", obj_name);
    let mut bytes = Vec::new();
    archive.by_name(&obj_name)?.read_to_end(&mut bytes)?;

    Ok(parse_obj(Cursor::new(bytes), None)?)
}

fn output_path(args: &Args, stem: &str) -> PathBuf {
    Path::new(&args.output_dir).join(format!("{stem}.{}", args.format.extension()))
}

fn process_one_mesh(path: &Path, stem: &str, seed: u64, args: &Args) -> Result<()> {
    let out_path = output_path(args, stem);
    if out_path.exists() && !args.overwrite {
        debug!("Skipping existing file: {}", out_path.display());
        return Ok(());
    }

    info!("Processing {} -> {}", path.display(), out_path.display());
    let started = Instant::now();

    let asset = load_mesh(path).with_context(|| format!("loading {}", path.display()))?;
    debug!(
        "{}: {} meshes, {} triangles",
        stem,
        asset.meshes.len(),
        asset.triangle_count()
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let cloud = sample_asset(&asset, args.count, &mut rng);
    let resource = ptcl::PointResource::new(cloud.positions, cloud.colors)?;

    match args.format {
        Format::Ptcl => ptcl::write_file(
            &out_path,
            &resource,
            ptcl::WriteOptions {
                compress: args.compress,
            },
        )?,
        Format::Json => ptcl::write_json(&out_path, &resource)?,
    }

    info!(
        "OK {} -> {} ({} pts, {:.2?})",
        path.display(),
        out_path.display(),
        resource.point_count(),
        started.elapsed()
    );

    Ok(())
}

/// Bake every indexed mesh. Fails when any mesh could not be baked.
fn bake_all(args: &Args) -> Result<()> {
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir))?;

    let index = build_local_index(&args.input_dir, args.prefer_zip);
    let work: Vec<(u64, &String, &PathBuf)> = index
        .by_stem
        .iter()
        .filter(|(stem, _)| args.only.is_empty() || args.only.contains(*stem))
        .enumerate()
        .map(|(i, (stem, path))| (args.seed.wrapping_add(i as u64), stem, path))
        .collect();

    if work.is_empty() {
        warn!("No .obj/.zip meshes found under {}", args.input_dir);
        return Ok(());
    }

    info!("Processing {} meshes...", work.len());

    let failures: usize = work
        .par_iter()
        .map(|(seed, stem, path)| match process_one_mesh(path, stem, *seed, args) {
            Ok(()) => 0,
            Err(err) => {
                warn!("Error processing {}: {:#}", path.display(), err);
                1
            }
        })
        .sum();

    if failures > 0 {
        bail!("{failures} of {} meshes failed", work.len());
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    bake_all(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TRI: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn args_for(input: &Path, output: &Path, format: Format) -> Args {
        Args::parse_from([
            "mesh2ptcl",
            "--input-dir",
            input.to_str().unwrap(),
            "--output-dir",
            output.to_str().unwrap(),
            "--count",
            "64",
            "--format",
            match format {
                Format::Ptcl => "ptcl",
                Format::Json => "json",
            },
        ])
    }

    fn write_zip(path: &Path, inner: &str, body: &str) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        zip.start_file(inner, zip::write::FileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn index_prefers_zip_over_obj() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), TRI).unwrap();
        write_zip(&dir.path().join("a.zip"), "inner/a.obj", TRI);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let index = build_local_index(dir.path().to_str().unwrap(), true);
        assert_eq!(index.by_stem.len(), 1);
        assert_eq!(lower_ext(&index.by_stem["a"]), "zip");

        let index = build_local_index(dir.path().to_str().unwrap(), false);
        assert_eq!(index.by_stem.len(), 1);
    }

    #[test]
    fn zipped_mesh_bakes_to_ptcl() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_zip(&input.path().join("tri.zip"), "tri.obj", TRI);

        let args = args_for(input.path(), output.path(), Format::Ptcl);
        process_one_mesh(&input.path().join("tri.zip"), "tri", 1, &args).unwrap();

        let res = ptcl::read_path(output.path().join("tri.ptcl")).unwrap();
        assert_eq!(res.point_count(), 64);
        assert!(res.colors.is_some());
    }

    #[test]
    fn existing_outputs_are_skipped_without_overwrite() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("tri.obj"), TRI).unwrap();
        fs::write(output.path().join("tri.json"), "sentinel").unwrap();

        let args = args_for(input.path(), output.path(), Format::Json);
        process_one_mesh(&input.path().join("tri.obj"), "tri", 1, &args).unwrap();
        assert_eq!(fs::read_to_string(output.path().join("tri.json")).unwrap(), "sentinel");
    }

    #[test]
    fn boolean_flags_can_be_switched_off() {
        let args = Args::parse_from(["mesh2ptcl"]);
        assert!(args.compress && args.prefer_zip);

        let args = Args::parse_from(["mesh2ptcl", "--compress", "false", "--prefer-zip", "false"]);
        assert!(!args.compress);
        assert!(!args.prefer_zip);
    }

    #[test]
    fn failed_meshes_make_the_run_fail() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("good.obj"), TRI).unwrap();
        write_zip(&input.path().join("empty.zip"), "readme.txt", "no mesh here");

        let args = args_for(input.path(), output.path(), Format::Json);
        let err = bake_all(&args).unwrap_err();
        assert!(format!("{err}").contains("1 of 2"));
        assert!(output.path().join("good.json").exists());
    }
}
