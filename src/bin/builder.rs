//! Octree builder binary — converts a `.vxl` point cloud into a `.oct`
//! octree blob.
//!
//! Usage: builder <stem> [repeat_mask repeat_depth]
//!
//! Reads `vxl/<stem>.vxl` and writes `vxl/<stem>.oct`. The optional repeat
//! arguments clone the scene along the axes named by the clear bits of
//! `repeat_mask` (4 = x, 2 = y, 1 = z), `repeat_depth` layers deep.
//!
//! Exit codes: 0 on success, 1 if a numeric argument does not parse, 2 on
//! wrong argument count; other failures exit nonzero with a logged error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use log::{error, info};

use octcast::core::types::Result;
use octcast::voxel::point::load_points;
use octcast::voxel::OctreeBuilder;

fn parse_u32(arg: &str, what: &str) -> std::result::Result<u32, ExitCode> {
    arg.parse().map_err(|e| {
        error!("could not parse {} '{}': {}", what, arg, e);
        ExitCode::from(1)
    })
}

fn run(stem: &str, repeat_mask: u32, repeat_depth: u32) -> Result<()> {
    let start = Instant::now();
    let infile = PathBuf::from(format!("vxl/{}.vxl", stem));
    let outfile = PathBuf::from(format!("vxl/{}.oct", stem));

    let builder = OctreeBuilder::with_repeat(repeat_mask, repeat_depth)?;
    if repeat_depth > 0 {
        let dirs = (7 ^ repeat_mask).count_ones();
        info!(
            "result cloned {} times at {} layers in {}{}{} direction(s)",
            1u64 << (dirs * repeat_depth),
            repeat_depth,
            if repeat_mask & 4 == 0 { "X" } else { "" },
            if repeat_mask & 2 == 0 { "Y" } else { "" },
            if repeat_mask & 1 == 0 { "Z" } else { "" },
        );
    }

    info!("opening '{}'", infile.display());
    let mut points = load_points(&infile)?;
    info!(
        "loaded {} points in {:.0?}",
        points.len(),
        start.elapsed()
    );

    let octree = builder.build(&mut points)?;
    info!(
        "built {} nodes in {:.0?}",
        octree.node_count(),
        start.elapsed()
    );

    octree.save(&outfile)?;
    info!("wrote '{}' in {:.0?}", outfile.display(), start.elapsed());
    Ok(())
}

fn main() -> ExitCode {
    octcast::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 && args.len() != 4 {
        error!("usage: builder <stem> [repeat_mask repeat_depth]");
        return ExitCode::from(2);
    }

    let (repeat_mask, repeat_depth) = if args.len() == 4 {
        let mask = match parse_u32(&args[2], "repeat mask") {
            Ok(v) => v,
            Err(code) => return code,
        };
        let depth = match parse_u32(&args[3], "repeat depth") {
            Ok(v) => v,
            Err(code) => return code,
        };
        (mask, depth)
    } else {
        (7, 0)
    };

    match run(&args[1], repeat_mask, repeat_depth) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
