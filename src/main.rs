use std::{env, path::PathBuf, process};

use avafix::fix::{FixOptions, fix_armature};
use avafix::import::Importer;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut input: Option<PathBuf> = None;
    let mut fix = false;
    let mut options = FixOptions::default();

    for arg in &args[1..] {
        match arg.as_str() {
            "--fix" => fix = true,
            "--full-body" => options.full_body_tracking = true,
            "--strict" => options.strict_parenting = true,
            other if input.is_none() => input = Some(PathBuf::from(other)),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    let Some(input) = input else {
        eprintln!("Usage: avafix <input.gltf|.glb|.vrm> [--fix] [--full-body] [--strict]");
        process::exit(2);
    };

    let mut importer = Importer::open(&input)?;
    let document = importer.document();
    println!("File: {}", input.display());
    println!("VRM: {}", document.is_vrm());
    println!(
        "Nodes: {}, Meshes: {}, Materials: {}, Skins: {}",
        document.count("nodes"),
        document.count("meshes"),
        document.count("materials"),
        document.count("skins"),
    );
    println!(
        "Buffers: {}, Views: {}, Accessors: {}, Images: {}",
        document.count("buffers"),
        document.count("bufferViews"),
        document.count("accessors"),
        document.count("images"),
    );

    if !fix {
        return Ok(());
    }

    let (mut skeleton, mut channels) = importer.build_armature()?;
    if skeleton.is_empty() {
        anyhow::bail!("no skinned armature found in {}", input.display());
    }

    let report = fix_armature(&mut skeleton, &mut channels, &options);
    println!(
        "Bones: {} ({} renamed, {} removed), merges: {}",
        report.bone_count,
        report.renamed_bones,
        report.removed_bones.len(),
        report.merged_channels.len()
    );
    if report.source_engine {
        println!("Rig: Source engine");
    }
    if report.mixamo {
        println!("Rig: Mixamo");
    }
    if report.hierarchy_ok {
        println!("Model successfully fixed.");
    } else {
        println!("Hierarchy check failed: {}", report.hierarchy_message);
    }

    Ok(())
}
