use std::{path::PathBuf, thread};

use anyhow::Context;
use clap::Parser;
use log::info;
use roadgrid::{
    util::{load_image, parse_point, render_route},
    MarkerRole, Session, Settings,
};

/// Find a route between two grid cells of a map image
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Map image, any format the image crate decodes
    image: PathBuf,

    /// Start cell as `row,col`
    start: String,

    /// Goal cell as `row,col`
    goal: String,

    /// Settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Side length of one grid cell in pixels
    #[arg(long)]
    cell_size: Option<u32>,

    /// Brightness threshold for walkable cells
    #[arg(short, long)]
    threshold: Option<u8>,

    /// Only move horizontally and vertically
    #[arg(long)]
    no_diagonal: bool,

    /// Play the route back after finding it
    #[arg(short, long)]
    animate: bool,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("could not load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(cell_size) = args.cell_size {
        settings.cell_size = cell_size;
    }
    if let Some(threshold) = args.threshold {
        settings.brightness_threshold = threshold;
    }
    if args.no_diagonal {
        settings.allow_diagonal = false;
    }

    let img = load_image(&args.image)
        .with_context(|| format!("could not open {}", args.image.display()))?;

    let mut session = Session::new(settings)?;
    session.rebuild_grid(&img);
    session.set_marker(MarkerRole::Start, parse_point(&args.start)?)?;
    session.set_marker(MarkerRole::End, parse_point(&args.goal)?)?;

    let found = session.find_path()?.found();

    if let Some(grid) = session.grid() {
        println!("{}", render_route(grid, session.route(), session.markers()));
    }

    match session.route().and_then(|route| route.result()) {
        Some(result) => println!(
            "path found: {} cells, cost {:.3}",
            result.path.len(),
            result.total_cost
        ),
        None => println!("no path found"),
    }

    if found && args.animate {
        let run = session.start_animation()?;
        let interval = session.animator().frame_interval();

        while let Some(frame) = session.tick(run) {
            info!(
                "segment {} step {}: ({:.1}, {:.1})",
                frame.segment, frame.step, frame.position.x, frame.position.y
            );
            thread::sleep(interval);
        }
    }

    Ok(())
}
