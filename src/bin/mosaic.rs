use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use mosaic_wm::common::config::{Config, config_file, store_file};
use mosaic_wm::common::log;
use mosaic_wm::layout::engine::LayoutSnapshot;
use mosaic_wm::layout::grid::{self, AdjacentEdges};
use mosaic_wm::sys::geometry::Rect;
use mosaic_wm::sys::storage::{JsonFileStore, Storage};

#[derive(Parser)]
#[command(name = "mosaic", about = "Region-based tiling window layout engine")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration file and report problems.
    Validate,
    /// Print each configured region's resolved rectangle and sub-rectangle
    /// preview for a screen size.
    Regions {
        #[arg(long, default_value_t = 1920.0)]
        width: f64,
        #[arg(long, default_value_t = 1080.0)]
        height: f64,
        /// Windows per region in the sub-rectangle preview.
        #[arg(long, default_value_t = 2)]
        windows: usize,
    },
    /// Verify that saved layout snapshots still parse.
    CheckRestore,
}

fn main() -> anyhow::Result<()> {
    log::init();
    let cli = Cli::parse();

    let path = cli.config.unwrap_or_else(config_file);
    let config = if path.exists() {
        Config::load(&path)?
    } else {
        eprintln!("no config at {}, using defaults", path.display());
        Config::default()
    };

    match cli.command.unwrap_or(Commands::Validate) {
        Commands::Validate => {
            let issues = config.validate();
            if issues.is_empty() {
                println!("config ok ({} displays, {} keybindings)",
                    config.displays.len(),
                    config.keybindings().len());
            } else {
                for issue in &issues {
                    eprintln!("config: {issue}");
                }
                process::exit(1);
            }
        }
        Commands::Regions { width, height, windows } => {
            print_regions(&config, width, height, windows);
        }
        Commands::CheckRestore => check_restore()?,
    }
    Ok(())
}

fn print_regions(config: &Config, width: f64, height: f64, windows: usize) {
    let screen = Rect::new(0.0, 0.0, width, height);
    for display in &config.displays {
        println!("display {}:", display.index);
        for region in &display.regions {
            let frame = region.rect.resolve(screen);
            let mut edges = AdjacentEdges::empty();
            for (direction, target) in region.adjacent.entries() {
                if target.display == display.index
                    && let Ok(direction) = direction.parse()
                {
                    edges |= AdjacentEdges::from_direction(direction);
                }
            }
            println!(
                "  {} [{}{}]: {:.0}x{:.0} at ({:.0}, {:.0})",
                region.name,
                region.orientation,
                if region.is_default { ", default" } else { "" },
                frame.size.width,
                frame.size.height,
                frame.origin.x,
                frame.origin.y,
            );
            let slots =
                grid::sub_regions(frame, region.orientation, windows, edges, config.settings.margin);
            for (i, slot) in slots.iter().enumerate() {
                println!(
                    "    slot {}: {:.1}x{:.1} at ({:.1}, {:.1})",
                    i, slot.size.width, slot.size.height, slot.origin.x, slot.origin.y,
                );
            }
        }
    }
}

fn check_restore() -> anyhow::Result<()> {
    let store = JsonFileStore::open(store_file())?;
    let mut found = false;
    for key in ["layout/default", "layout/last"] {
        let Some(blob) = store.get(key)? else { continue };
        found = true;
        match serde_json::from_str::<LayoutSnapshot>(&blob) {
            Ok(snapshot) => {
                let windows: usize = snapshot
                    .displays
                    .iter()
                    .flat_map(|d| d.regions.iter())
                    .map(|r| r.windows.len())
                    .sum();
                println!("{key}: ok ({} displays, {} windows)", snapshot.displays.len(), windows);
            }
            Err(err) => {
                eprintln!("{key}: unreadable ({err})");
                process::exit(1);
            }
        }
    }
    if !found {
        println!("no saved layouts in {}", store_file().display());
    }
    Ok(())
}
