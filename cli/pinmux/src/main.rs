//! pinmux CLI: Betaflight board definitions to C++ `BoardConfig` headers.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};

use commands::convert::ConvertRequest;
use config::PinmuxConfig;

#[derive(Parser)]
#[command(
    name = "pinmux",
    version,
    about = "Translate Betaflight board definitions into BoardConfig headers"
)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a board definition into a header
    Convert {
        /// Board definition (.config)
        input: PathBuf,
        /// Output header (default: <stem>.h, or under [output] dir in pinmux.toml)
        output: Option<PathBuf>,
        /// MCU, for boards whose header does not name one (e.g., STM32F411)
        #[arg(long)]
        mcu: Option<String>,
        /// Capability table root (default: [tables] dir in pinmux.toml, else ./tables)
        #[arg(long)]
        tables: Option<PathBuf>,
        /// Write the header even when validation reports errors
        #[arg(long)]
        force: bool,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
    /// Validate board definitions without writing headers
    Check {
        /// Board definitions (.config)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// MCU, for boards whose header does not name one
        #[arg(long)]
        mcu: Option<String>,
        /// Capability table root
        #[arg(long)]
        tables: Option<PathBuf>,
    },
    /// Show what a pin can be routed to
    Pins {
        /// MCU (e.g., STM32F411, f405)
        mcu: String,
        /// Pin (B00, PB_0 or PB0)
        pin: String,
        /// Only one peripheral kind (timer, spi, i2c, uart, adc)
        #[arg(long)]
        kind: Option<String>,
        /// Capability table root
        #[arg(long)]
        tables: Option<PathBuf>,
    },
    /// List supported MCUs and their capability tables
    Tables {
        /// Capability table root
        #[arg(long)]
        tables: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Install the stderr log subscriber. Diagnostics are printed separately; logs
/// only trace the pipeline stages.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (config, project_dir) = load_config_optional(&cwd)?;
    let config = config.unwrap_or_default();
    let project_dir = project_dir.unwrap_or(cwd);

    match cli.command {
        Commands::Convert {
            input,
            output,
            mcu,
            tables,
            force,
            report,
        } => commands::convert::run(
            &project_dir,
            &config,
            &ConvertRequest {
                output: output.as_deref(),
                mcu: mcu.as_deref(),
                tables: tables.as_deref(),
                force,
                report: report.as_deref(),
                ..ConvertRequest::new(&input)
            },
        ),

        Commands::Check {
            inputs,
            mcu,
            tables,
        } => commands::check::run(
            &project_dir,
            &config,
            &inputs,
            mcu.as_deref(),
            tables.as_deref(),
        ),

        Commands::Pins {
            mcu,
            pin,
            kind,
            tables,
        } => commands::pins::run(
            &project_dir,
            &config,
            &mcu,
            &pin,
            kind.as_deref(),
            tables.as_deref(),
        ),

        Commands::Tables { tables } => {
            commands::tables::run(&project_dir, &config, tables.as_deref())
        }
    }
}

/// Try to load `pinmux.toml` from the current directory upward. Returns (None, None) if not found.
fn load_config_optional(cwd: &Path) -> anyhow::Result<(Option<PinmuxConfig>, Option<PathBuf>)> {
    match PinmuxConfig::find_and_load(cwd)? {
        Some((config, dir)) => Ok((Some(config), Some(dir))),
        None => Ok((None, None)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    const BOARD: &str = "boards/JHEF-JHEF411.config";
    const TABLE: &str = "tables/STM32F4xx/F411C(C-E)(U-Y)/PeripheralPins.c";

    /// A project directory holding the shared board and table fixtures.
    fn project(config: &str) -> (tempfile::TempDir, PathBuf) {
        let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("fc");
        for file in [BOARD, TABLE] {
            let target = root.join(file);
            std::fs::create_dir_all(target.parent().unwrap()).unwrap();
            std::fs::copy(workspace.join(file), &target).unwrap();
        }
        std::fs::write(root.join("pinmux.toml"), config).unwrap();
        (dir, root)
    }

    fn broken_board(root: &Path) -> PathBuf {
        let text = std::fs::read_to_string(root.join(BOARD)).unwrap();
        let path = root.join("boards/BROKEN.config");
        std::fs::write(&path, text.replace("timer B04 AF2", "timer B04 AF9")).unwrap();
        path
    }

    /// Full workflow: discover config, convert, convert again.
    #[test]
    fn convert_workflow() {
        let (_dir, root) = project(PinmuxConfig::template());

        let (config, project_dir) = load_config_optional(&root.join("boards")).unwrap();
        let config = config.unwrap();
        let project_dir = project_dir.unwrap();
        assert_eq!(project_dir, root);

        let input = root.join(BOARD);
        commands::convert::run(&project_dir, &config, &ConvertRequest::new(&input)).unwrap();
        let header_path = root.join("out/JHEF-JHEF411.h");
        let first = std::fs::read_to_string(&header_path).unwrap();
        assert!(first.contains(" * Source: JHEF-JHEF411.config"));
        assert!(first.contains("namespace BoardConfig {"));
        assert!(first.contains("static constexpr I2CConfig sensors{PB_9, PB_8, 400000};"));

        // Same inputs, same bytes.
        commands::convert::run(&project_dir, &config, &ConvertRequest::new(&input)).unwrap();
        assert_eq!(std::fs::read_to_string(&header_path).unwrap(), first);
    }

    #[test]
    fn explicit_output_and_json_report() {
        let (_dir, root) = project("");
        let config = PinmuxConfig::default();
        let input = root.join(BOARD);
        let output = root.join("firmware/include/BoardConfig.h");
        let request = ConvertRequest {
            output: Some(&output),
            report: Some("json"),
            ..ConvertRequest::new(&input)
        };
        commands::convert::run(&root, &config, &request).unwrap();
        assert!(output.is_file());
        assert!(!root.join("boards/JHEF-JHEF411.h").exists());
    }

    #[test]
    fn default_output_beside_input_without_output_dir() {
        let (_dir, root) = project("");
        let input = root.join(BOARD);
        commands::convert::run(&root, &PinmuxConfig::default(), &ConvertRequest::new(&input))
            .unwrap();
        assert!(root.join("boards/JHEF-JHEF411.h").is_file());
    }

    #[test]
    fn errors_block_output_unless_forced() {
        let (_dir, root) = project(PinmuxConfig::template());
        let config = PinmuxConfig::find_and_load(&root).unwrap().unwrap().0;
        let input = broken_board(&root);
        let header_path = root.join("out/BROKEN.h");

        let err = commands::convert::run(&root, &config, &ConvertRequest::new(&input)).unwrap_err();
        assert!(err.to_string().contains("no header written"), "{err:#}");
        assert!(!header_path.exists());

        let forced = ConvertRequest {
            force: true,
            ..ConvertRequest::new(&input)
        };
        let err = commands::convert::run(&root, &config, &forced).unwrap_err();
        assert!(err.to_string().contains("written anyway"), "{err:#}");
        let header = std::fs::read_to_string(&header_path).unwrap();
        assert!(header.contains("// MOTOR 5: omitted (unresolved)"));
    }

    #[test]
    fn force_from_config_file() {
        let (_dir, root) = project("[output]\ndir = \"out\"\nforce = true\n");
        let config = PinmuxConfig::find_and_load(&root).unwrap().unwrap().0;
        let input = broken_board(&root);
        assert!(commands::convert::run(&root, &config, &ConvertRequest::new(&input)).is_err());
        assert!(root.join("out/BROKEN.h").is_file());
    }

    #[test]
    fn mcu_flag_for_headerless_board() {
        let (_dir, root) = project("");
        let config = PinmuxConfig::default();
        let input = root.join("boards/BARE.config");
        std::fs::write(&input, "resource LED 1 C13\nresource BEEPER 1 C14\n").unwrap();

        let err = commands::convert::run(&root, &config, &ConvertRequest::new(&input)).unwrap_err();
        assert!(err.to_string().contains("--mcu"), "{err:#}");

        let request = ConvertRequest {
            mcu: Some("f411"),
            ..ConvertRequest::new(&input)
        };
        commands::convert::run(&root, &config, &request).unwrap();
        let header = std::fs::read_to_string(root.join("boards/BARE.h")).unwrap();
        assert!(header.contains("// MCU: STM32F411"));
        assert!(header.contains("static constexpr LEDConfig status_leds{PC_13};"));
    }

    #[test]
    fn missing_table_is_fatal() {
        let (_dir, root) = project("");
        let input = root.join(BOARD);
        let request = ConvertRequest {
            mcu: Some("STM32H743"),
            ..ConvertRequest::new(&input)
        };
        let err = commands::convert::run(&root, &PinmuxConfig::default(), &request).unwrap_err();
        assert!(format!("{err:#}").contains("loading capability table for STM32H743"));
    }

    #[test]
    fn missing_input_is_fatal() {
        let (_dir, root) = project("");
        let input = root.join("boards/NOPE.config");
        let err = commands::convert::run(&root, &PinmuxConfig::default(), &ConvertRequest::new(&input))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn check_counts_failing_boards() {
        let (_dir, root) = project("");
        let config = PinmuxConfig::default();
        let good = root.join(BOARD);
        let bad = broken_board(&root);

        commands::check::run(&root, &config, &[good.clone()], None, None).unwrap();

        let err = commands::check::run(&root, &config, &[good, bad], None, None).unwrap_err();
        assert!(err.to_string().contains("1 of 2"), "{err:#}");
        // Checking never writes.
        assert!(!root.join("boards/JHEF-JHEF411.h").exists());
    }

    #[test]
    fn check_with_tables_flag() {
        let (_dir, root) = project("");
        let moved = root.join("vendor");
        std::fs::rename(root.join("tables"), &moved).unwrap();
        let config = PinmuxConfig::default();
        let input = [root.join(BOARD)];
        assert!(commands::check::run(&root, &config, &input, None, None).is_err());
        commands::check::run(&root, &config, &input, None, Some(&moved)).unwrap();
    }

    #[test]
    fn pins_lookup() {
        let (_dir, root) = project("");
        let config = PinmuxConfig::default();
        commands::pins::run(&root, &config, "STM32F411", "PB_0", Some("timer"), None).unwrap();
        commands::pins::run(&root, &config, "f411", "C13", None, None).unwrap();
        assert!(commands::pins::run(&root, &config, "STM32F411", "K01", None, None).is_err());
        assert!(commands::pins::run(&root, &config, "STM32F411", "B00", Some("dac"), None).is_err());
    }

    #[test]
    fn tables_listing() {
        let (_dir, root) = project("");
        commands::tables::run(&root, &PinmuxConfig::default(), None).unwrap();
    }
}
