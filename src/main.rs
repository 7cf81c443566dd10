use clap::{Parser, Subcommand};
use std::path::PathBuf;
use webpage_export::assets::SiteAssets;
use webpage_export::index::ExportIndex;
use webpage_export::metadata::{IconSource, StaticIconSource};
use webpage_export::render::MarkdownPageGenerator;
use webpage_export::website::{Capabilities, Website};
use webpage_export::{config, init_tracing, output, scan, write};

#[derive(Parser)]
#[command(name = "webpage-export")]
#[command(about = "Incremental static website export for markdown folders")]
#[command(long_about = "\
Incremental static website export for markdown folders

Markdown documents become HTML pages; every other file is copied as-is.
Re-running an export only regenerates documents whose modification time or
size changed, and only writes output files that are new or stale.

Source structure:

  notes/
  ├── config.toml          # Export config (optional)
  ├── assets/              # Fonts, favicons → copied to output as-is
  ├── index.md             # → index.html
  └── projects/
      ├── plan.md          # → projects/plan.html
      └── diagram.png      # → projects/diagram.png

Display metadata (first available wins):
  Title: frontmatter title → first alias → filename
  Icon:  frontmatter icon → banner_icon → [icons.overrides] → default

Run 'webpage-export gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Source directory
    #[arg(long, default_value = "notes", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "site", global = true)]
    output: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export the source directory, skipping what hasn't changed
    Export {
        /// Ignore the previous export and regenerate everything
        #[arg(long)]
        full: bool,
    },
    /// List the inputs an export would consider
    Scan,
    /// Summarize the index recorded by the previous export
    Index,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Export { full } => {
            let config = config::load_config(&cli.source)?;
            let inputs = scan::scan(&cli.source, &config, Some(cli.output.as_path()))?;
            let index = ExportIndex::load(&cli.output);

            let icon_source: Option<Box<dyn IconSource>> = if config.icons.overrides.is_empty() {
                None
            } else {
                Some(Box::new(StaticIconSource::new(config.icons.overrides.clone())))
            };
            let capabilities = Capabilities { icon_source };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    println!("{}", output::format_progress_event(&event));
                }
            });
            let mut website = Website::new(
                cli.source.clone(),
                config,
                index,
                MarkdownPageGenerator,
                SiteAssets,
            )
            .with_capabilities(capabilities)
            .with_progress(tx)
            .with_full_export(full);

            let result = website.build(&inputs, &cli.output);
            // Dropping the website closes the progress channel
            let index = website.index().clone();
            drop(website);
            printer.join().ok();
            let result = result?;

            if !result.cancelled {
                write::write_artifacts(&result.write_set, &cli.output)?;
                write::remove_paths(&result.removed, &cli.output)?;
                index.save(&cli.output)?;
            }
            println!();
            output::print_build_summary(&result);
        }
        Command::Scan => {
            let config = config::load_config(&cli.source)?;
            let inputs = scan::scan(&cli.source, &config, Some(cli.output.as_path()))?;
            output::print_scan_output(&inputs);
        }
        Command::Index => {
            output::print_index_summary(&ExportIndex::load(&cli.output));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
