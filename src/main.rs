use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vsite::clean::{self, PairSide};
use vsite::convert::{self, Profile};
use vsite::{config, generate, output};

#[derive(Parser)]
#[command(name = "vsite")]
#[command(about = "Static HTML gallery generator for video folders")]
#[command(long_about = "\
Static HTML gallery generator for video folders

Writes one listing page per directory and one player page per video, flat
into the scanned directory, next to the videos:

  videos/
  ├── index.html              # root listing
  ├── style.css
  ├── Travel_index.html       # listing for Travel/
  ├── player_intro.html       # player for intro.mp4
  ├── player_Travel_day_1.html
  ├── intro.mp4
  └── Travel/
      ├── day 1.mkv           # hidden by day 1.mp4 once converted
      └── day 1.mp4

Hidden directories (.name) are skipped. Formats browsers cannot play
(mkv, avi, mov, wmv, flv) can be converted to mp4 with --convert, which
needs ffmpeg; --gpu additionally needs an NVIDIA GPU with NVENC.

Settings are read from vsite.toml in the scanned directory when present.
Run 'vsite --gen-config' to print a documented one.")]
#[command(version, disable_version_flag = true)]
#[command(group(
    ArgGroup::new("clean_mode").args(["clean", "clean_converted", "clean_originals"])
))]
struct Cli {
    /// Directory containing the videos
    #[arg(required_unless_present = "gen_config")]
    directory: Option<PathBuf>,

    /// Title of the root listing page (default: "Videos")
    #[arg(short, long)]
    title: Option<String>,

    /// Convert unsupported formats to mp4 before generating
    #[arg(long)]
    convert: bool,

    /// Use NVIDIA NVENC for conversion
    #[arg(long, requires = "convert")]
    gpu: bool,

    /// Remove all generated HTML files and style.css, then exit
    #[arg(short, long)]
    clean: bool,

    /// Remove converted mp4 files (keeps the originals), then exit
    #[arg(long)]
    clean_converted: bool,

    /// Remove originals that have a converted mp4 (keeps the mp4), then exit
    #[arg(long)]
    clean_originals: bool,

    /// Scan and print the pages that would be generated, without writing
    #[arg(long)]
    check: bool,

    /// Print a stock vsite.toml with all options documented
    #[arg(long, exclusive = true)]
    gen_config: bool,

    /// Log debug diagnostics to stderr (RUST_LOG takes precedence)
    #[arg(long)]
    verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            e.print().ok();
            return code;
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "vsite=debug" } else { "vsite=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }
    let Some(root) = cli.directory else {
        return Err("no directory given".into());
    };

    if cli.clean {
        output::print_clean_output(&clean::clean_generated(&root)?);
        return Ok(());
    }
    if cli.clean_converted || cli.clean_originals {
        let side = if cli.clean_converted {
            PairSide::Converted
        } else {
            PairSide::Originals
        };
        output::print_clean_output(&clean::clean_pairs(&root, side)?);
        return Ok(());
    }

    let site_config = config::load_config(&root)?;
    let title = cli.title.unwrap_or_else(|| site_config.title.clone());

    if cli.check {
        let site = generate::prepare(&root, &title)?;
        output::print_scan_output(&site);
        println!("==> Nothing written");
        return Ok(());
    }

    if cli.convert {
        let profile = if cli.gpu { Profile::Gpu } else { Profile::Cpu };
        run_conversion(&root, &site_config.conversion, profile)?;
    }

    let site = generate::prepare(&root, &title)?;
    output::print_scan_output(&site);
    let report = generate::generate(&root, &site, &site_config)?;
    output::print_generate_output(&report, &root);
    Ok(())
}

/// Preflight, then convert every pending file with progress on stdout.
fn run_conversion(
    root: &Path,
    conversion: &config::ConversionConfig,
    profile: Profile,
) -> Result<(), Box<dyn std::error::Error>> {
    let preflight = convert::preflight(conversion, profile)?;
    let pending = convert::find_pending(root)?;
    output::print_convert_plan(&pending, profile, &preflight.gpus);
    if pending.tasks.is_empty() {
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_convert_event(&event) {
                println!("{}", line);
            }
        }
    });
    let summary = convert::convert(
        &pending.tasks,
        profile.settings(conversion),
        &preflight.encoder,
        profile.workers(conversion),
        Some(tx),
    )?;
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    output::print_convert_summary(&summary);
    Ok(())
}
