use std::{fs, path::PathBuf};

use ccu::{sim::SimRegisters, ClockId, ClockRegistry, Cru};
use ccu_config::{buildtime, CcuConfig};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use miette::{Context, IntoDiagnostic};

fn main() -> miette::Result<()> {
    use tracing_subscriber::prelude::*;

    let App {
        cmd,
        table,
        output,
    } = App::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .with(output.trace_filter)
        .init();

    let config = table.load()?;
    if let Cmd::Render { format, out } = &cmd {
        return render(&config, *format, out.as_ref());
    }

    let sim = SimRegisters::for_table(&config.clocks, &config.address_map());
    let (mut clocks, report) = config
        .probe(Cru::new(sim))
        .map_err(op_error)
        .wrap_err("Failed to probe clock table")?;
    if table.disable_unused {
        let disabled = clocks.disable_unused();
        tracing::info!(count = disabled.len(), "disabled unused clocks");
    }

    match cmd {
        Cmd::Summary | Cmd::Render { .. } => {}
        Cmd::Check => {
            println!(
                "{} clocks registered, {} enabled at bring-up",
                clocks.descs().count(),
                report.enabled.len()
            );
            if !report.is_clean() {
                for error in &report.diagnostics {
                    println!("  skipped: {error}");
                }
                for (id, error) in &report.failed {
                    println!("  failed: {id}: {error}");
                }
                miette::bail!("Bring-up did not complete cleanly");
            }
            return Ok(());
        }
        Cmd::Enable { clock } => {
            let id = resolve(&clocks, &clock)?;
            clocks.prepare_enable(id).map_err(op_error)?;
        }
        Cmd::Disable { clock } => {
            let id = resolve(&clocks, &clock)?;
            clocks.disable_unprepare(id).map_err(op_error)?;
        }
        Cmd::SetRate { clock, rate } => {
            let id = resolve(&clocks, &clock)?;
            let rounded = clocks.round_rate(id, rate).map_err(op_error)?;
            tracing::info!(clock = %clock, rate, rounded, "setting rate");
            clocks.set_rate(id, rate).map_err(op_error)?;
        }
        Cmd::SetParent { clock, parent } => {
            let id = resolve(&clocks, &clock)?;
            clocks.set_parent(id, &parent).map_err(op_error)?;
        }
    }

    print!("{}", clocks.summary());
    Ok(())
}

/// Offline clock tree simulator.
///
/// Builds a clock registry for a table (the built-in K1x table unless
/// `--table` is given) against a simulated register file, probes it, and
/// runs one operation on it.
#[derive(Debug, Parser)]
#[clap(about, version)]
struct App {
    #[clap(subcommand)]
    cmd: Cmd,

    #[clap(flatten)]
    table: TableOptions,

    #[clap(flatten)]
    output: OutputOptions,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Print the clock tree after bring-up.
    Summary,
    /// Validate the table and report on bring-up.
    Check,
    /// Take an enable reference on a clock.
    Enable { clock: String },
    /// Drop an enable reference on a clock.
    Disable { clock: String },
    /// Change a clock's rate.
    SetRate { clock: String, rate: u64 },
    /// Switch a clock to another of its parents.
    SetParent { clock: String, parent: String },
    /// Write the table out in another format.
    Render {
        #[clap(long, short, value_enum, default_value_t = Format::Toml)]
        format: Format,
        /// Output file. TOML goes to stdout if this is not given.
        #[clap(long, short, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Toml,
    Postcard,
}

#[derive(Clone, Debug, Args)]
#[command(next_help_heading = "Table Options")]
struct TableOptions {
    /// A clock table to load instead of the built-in K1x table: TOML, or
    /// postcard as written by `render` if the file ends in `.postcard`.
    #[clap(long, env = "CCU_TABLE", value_hint = ValueHint::FilePath, global = true)]
    table: Option<PathBuf>,

    /// Run the late-init pass that gates off unreferenced clocks before the
    /// operation.
    #[clap(long, global = true)]
    disable_unused: bool,
}

impl TableOptions {
    fn load(&self) -> miette::Result<CcuConfig> {
        match &self.table {
            Some(path) => buildtime::load(path),
            None => Ok(ccu_k1x::config()),
        }
    }
}

#[derive(Clone, Debug, Args)]
#[command(next_help_heading = "Output Options")]
struct OutputOptions {
    /// Tracing filter.
    #[clap(
        long = "trace",
        alias = "log",
        env = "RUST_LOG",
        default_value = "warn",
        global = true
    )]
    trace_filter: tracing_subscriber::filter::Targets,
}

/// Looks a clock up by name, or by id written as `#n` or `n`.
fn resolve<Io, D, F>(clocks: &ClockRegistry<Io, D, F>, clock: &str) -> miette::Result<ClockId>
where
    Io: ccu::RegisterIo,
    D: ccu::wait::Delay,
    F: ccu::framework::Framework,
{
    if let Some(id) = clocks.id_of(clock) {
        return Ok(id);
    }
    let id = clock
        .trim_start_matches('#')
        .parse()
        .map(ClockId)
        .map_err(|_| miette::miette!("{}", ccu::Error::UnknownClock(clock.into())))?;
    if !clocks.is_registered(id) {
        miette::bail!("{}", ccu::Error::NotRegistered(id));
    }
    Ok(id)
}

fn op_error(error: ccu::Error) -> miette::Report {
    miette::miette!("{error}")
}

fn render(config: &CcuConfig, format: Format, out: Option<&PathBuf>) -> miette::Result<()> {
    buildtime::validate(config)?;
    let bytes = match format {
        Format::Toml => toml::to_string_pretty(config)
            .into_diagnostic()
            .wrap_err("Failed to render table as TOML")?
            .into_bytes(),
        Format::Postcard => buildtime::to_postcard(config)?,
    };
    match out {
        Some(path) => fs::write(path, &bytes)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write '{}'", path.display())),
        None if format == Format::Toml => {
            print!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
        None => miette::bail!("postcard output needs --out"),
    }
}
