//! Command-line wrapper around the routing engine: loads a grib/polar/mask
//! triple plus origin/destination from the command line, runs one leg (or a
//! best-departure sweep) and prints a summary. Exit codes:
//! 0 destination reached, 1 exhausted, 2 usage error, 3 I/O error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use log::{error, info};

use isorouting::config::{Config, LatLon, OptMode};
use isorouting::engine::orchestration::{new_roster, run_competitors, CompetitorSeed};
use isorouting::engine::{route_waypoint_legs, IsochroneEngine};
use isorouting::error::RoutingError;
use isorouting::grib::decode::GribLoader;
use isorouting::mask::LandMask;
use isorouting::polar::PolarMatrix;

#[derive(Parser, Debug)]
#[command(version, about = "Time-minimising isochrone sailing router")]
struct Args {
    /// Full `Config` as JSON (waypoints, forbid zones, competitors,
    /// best-departure sweep). When given, supersedes the individual
    /// origin/destination/tuning flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Origin latitude, degrees
    #[arg(long, required_unless_present = "config")]
    origin_lat: Option<f64>,
    /// Origin longitude, degrees
    #[arg(long, required_unless_present = "config")]
    origin_lon: Option<f64>,
    /// Destination latitude, degrees
    #[arg(long, required_unless_present = "config")]
    dest_lat: Option<f64>,
    /// Destination longitude, degrees
    #[arg(long, required_unless_present = "config")]
    dest_lon: Option<f64>,

    /// Path to the wind grib file (optional when --const-wind-tws > 0)
    #[arg(long)]
    grib: Option<PathBuf>,
    /// Path to the boat polar CSV
    #[arg(long)]
    polar: PathBuf,
    /// Optional sail polar CSV (same shape as --polar)
    #[arg(long)]
    sail_polar: Option<PathBuf>,

    /// Departure time, hours relative to the grib's reference instant
    #[arg(long, default_value_t = 0.0)]
    start_time_hours: f64,
    /// Isochrone time step, hours
    #[arg(long, default_value_t = 1.0)]
    t_step: f64,
    /// Course discretisation step, degrees
    #[arg(long, default_value_t = 5.0)]
    cog_step: f64,
    /// Half-range of courses explored around current TWD, degrees
    #[arg(long, default_value_t = 90.0)]
    range_cog: f64,
    /// Sector count for frontier pruning
    #[arg(long, default_value_t = 180)]
    n_sectors: usize,
    /// Pruning mode: 0=none, 1=distance, 2=vmc, >=3=weighted
    #[arg(long, default_value_t = 3)]
    opt: i32,

    /// Uniform wind speed override, knots (0 = use the grib)
    #[arg(long, default_value_t = 0.0)]
    const_wind_tws: f64,
    /// Uniform wind direction override, degrees
    #[arg(long, default_value_t = 0.0)]
    const_wind_twd: f64,

    /// Treat the whole surface as sea (disable land mask)
    #[arg(long, default_value_t = false)]
    always_sea: bool,

    /// Write the finalised route as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,
}

fn run(args: &Args) -> isorouting::error::Result<bool> {
    let polar = PolarMatrix::load_csv(&args.polar)?;
    let diag = polar.check();
    if !diag.is_clean() {
        info!("polar diagnostics:\n{}", diag.report);
    }
    let sail_polar = args
        .sail_polar
        .as_ref()
        .map(PolarMatrix::load_csv)
        .transpose()?;

    let wind = match &args.grib {
        Some(path) => GribLoader::new().load(path)?,
        None if args.const_wind_tws > 0.0 => {
            // A constant-wind run never touches the grib loader; this
            // minimal whole-globe field exists purely so `route_leg`'s
            // zone/timestamp checks have something to read.
            isorouting::grib::GribField {
                zone: isorouting::grib::Zone {
                    lat_min: -90.0,
                    lat_max: 90.0,
                    lon_left: -180.0,
                    lon_right: 180.0,
                    lat_step: 180.0,
                    lon_step: 360.0,
                    ante_meridian: false,
                    nb_lat: 2,
                    nb_lon: 2,
                    time_stamp: vec![0.0, 1e6],
                    reference_time: None,
                },
                cells: vec![Default::default(); 8],
            }
        }
        None => {
            return Err(RoutingError::InvalidGrib(
                "--grib is required unless --const-wind-tws is set".into(),
            ));
        }
    };
    let grib_diag = isorouting::grib::GribDiagnostics::compute(&wind);
    if !grib_diag.is_clean() {
        info!("grib diagnostics: {:?}", grib_diag);
    }

    let land_mask = LandMask::new();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(RoutingError::Io)?;
            serde_json::from_str::<Config>(&text)?
        }
        None => {
            let mut config = Config::new(
                LatLon::new(args.origin_lat.expect("required_unless_present=config"), args.origin_lon.expect("required_unless_present=config")),
                LatLon::new(args.dest_lat.expect("required_unless_present=config"), args.dest_lon.expect("required_unless_present=config")),
            );
            config.start_time_in_hours = args.start_time_hours;
            config.t_step = args.t_step;
            config.cog_step = args.cog_step;
            config.range_cog = args.range_cog;
            config.n_sectors = args.n_sectors;
            config.opt = OptMode::from_code(args.opt);
            config.const_wind_tws = args.const_wind_tws;
            config.const_wind_twd = args.const_wind_twd;
            config.always_sea = args.always_sea;
            config
        }
    };
    // CLI-only overrides always apply, even alongside --config, since the
    // grib/mask paths have no place in the serialisable tuning surface.
    config.always_sea = config.always_sea || args.always_sea;

    let forbid_zones = config.forbid_zones_mask();
    let engine = IsochroneEngine::new(
        &polar,
        sail_polar.as_ref(),
        None,
        &wind,
        None,
        &land_mask,
        &forbid_zones,
        &config,
    );

    let stop = AtomicBool::new(false);

    if !config.competitors.is_empty() {
        let names: Vec<String> = (0..config.competitors.len()).map(|i| format!("competitor-{i}")).collect();
        let seeds: Vec<CompetitorSeed> = config
            .competitors
            .iter()
            .enumerate()
            .map(|(i, c)| CompetitorSeed { color_index: i as u32, name_index: i, lat: c.lat, lon: c.lon })
            .collect();
        let mut roster = new_roster(&seeds, &names);
        let passages = run_competitors(
            &engine,
            &config.waypoints,
            config.destination,
            config.start_time_in_hours,
            &mut roster,
            &stop,
        )?;

        let reached = roster.run_index.is_none();
        for c in &roster.competitors {
            println!(
                "{}: duration={:.2}h eta={:.2}h dist_to_dest={:.2}nm",
                c.name, c.duration_hours, c.eta_hours, c.dist_to_destination
            );
        }
        if let Some(path) = &args.output {
            let routes: Vec<&isorouting::engine::SailRoute> =
                passages.iter().filter_map(|p| p.legs.last().map(|l| &l.route)).collect();
            let json = serde_json::to_string_pretty(&(&roster.competitors, &routes))?;
            std::fs::write(path, json).map_err(RoutingError::Io)?;
        }
        return Ok(reached);
    }

    if config.best_departure_sweep {
        let run = engine.best_departure_sweep(
            (config.origin.lat, config.origin.lon),
            (config.destination.lat, config.destination.lon),
            config.t_begin,
            config.t_end,
            config.t_step.max(f64::EPSILON),
            &stop,
        )?;
        let reached = run.destination_reached();
        let duration = (run.isochrones.len() as f64 - 2.0).max(0.0) * config.t_step + run.last_step_duration;
        println!(
            "best departure: start_time={:.2}h duration={:.2}h reached={reached}",
            run.start_time_hours, duration
        );
        if let Some(path) = &args.output {
            let route = isorouting::engine::build_route(&engine, &run)?;
            let json = serde_json::to_string_pretty(&route)?;
            std::fs::write(path, json).map_err(RoutingError::Io)?;
        }
        return Ok(reached);
    }

    let passage = route_waypoint_legs(
        &engine,
        config.origin,
        &config.waypoints,
        config.destination,
        config.start_time_in_hours,
        &stop,
    )?;

    let reached = passage.fully_reached();
    for (i, leg) in passage.legs.iter().enumerate() {
        println!(
            "leg {i}: {} isochrones, {:.2}h, reached={}",
            leg.run.isochrones.len(),
            leg.route.duration_hours,
            leg.run.destination_reached()
        );
    }
    println!(
        "total duration: {:.2}h, destination reached: {reached}",
        passage.total_duration_hours()
    );

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&passage.legs.last().map(|l| &l.route))?;
        std::fs::write(path, json).map_err(RoutingError::Io)?;
    }

    Ok(reached)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::from(0),
        Ok(false) => {
            info!("destination not reached within time/isochrone budget");
            ExitCode::from(1)
        }
        Err(err @ (RoutingError::Io(_) | RoutingError::Serde(_))) => {
            error!("I/O error: {err}");
            ExitCode::from(3)
        }
        Err(err) => {
            error!("routing error: {err}");
            ExitCode::from(1)
        }
    }
}
