//! Debug utility: decodes a
//! grib file and prints its zone shape, timestamps and data-quality report,
//! adapted to this crate's `GribLoader`/`GribDiagnostics` instead of the
//! original ad hoc message-by-message dump.

use std::path::PathBuf;

use clap::Parser;

use isorouting::grib::decode::GribLoader;
use isorouting::grib::GribDiagnostics;

#[derive(Parser, Debug)]
#[command(about = "Decode a grib file and print its zone shape and data-quality report")]
struct Args {
    /// Path to the grib file to inspect
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("Opening {:?}...", args.path);
    let field = GribLoader::new().load(&args.path)?;
    let zone = &field.zone;

    println!(
        "zone: lat [{:.3}, {:.3}] step {:.3} ({} points)",
        zone.lat_min, zone.lat_max, zone.lat_step, zone.nb_lat
    );
    println!(
        "zone: lon [{:.3}, {:.3}] step {:.3} ({} points), ante_meridian={}",
        zone.lon_left, zone.lon_right, zone.lon_step, zone.nb_lon, zone.ante_meridian
    );
    println!("timestamps (h): {:?}", zone.time_stamp);

    let diag = GribDiagnostics::compute(&field);
    println!("diagnostics: {diag:#?}");
    if diag.is_clean() {
        println!("no data-quality issues found");
    }

    Ok(())
}
