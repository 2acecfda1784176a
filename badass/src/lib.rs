//! CLI glue: parses flags into [`Cli`], drives `badass-asm` across however
//! many source files were given, then either writes the laid-out sections
//! through `badass-fmt` or (`--run`) boots them in a headless `sixfive`
//! machine with the `badass-text` device mapped in.
//!
//! Grounded on the original `main.cpp`'s `AssemblerState`, generalized from
//! a single combined `Assembler` instance to the same shape built out of
//! `badass-asm`'s lower-level `Driver`/`AssembleOptions` API (`assemble_file`
//! is a single-source convenience the multi-source CLI doesn't use
//! directly).

use badass_asm::pass::{AssembleOptions, Driver};
use badass_asm::{cache, grammar};
use sixfive::enums::Cpu;
use sixfive::memory::{CallbackMemory, Memory};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no source files given")]
    NoSources,
    #[error("{0}")]
    Assemble(String),
    #[error(transparent)]
    Format(#[from] badass_fmt::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Raw,
    Prg,
    Crt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(OutputFormat::Raw),
            "prg" => Ok(OutputFormat::Prg),
            "crt" => Ok(OutputFormat::Crt),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

impl From<OutputFormat> for badass_fmt::OutputFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Raw => badass_fmt::OutputFormat::Raw,
            OutputFormat::Prg => badass_fmt::OutputFormat::Prg,
            OutputFormat::Crt => badass_fmt::OutputFormat::Crt,
        }
    }
}

pub struct Cli {
    pub sources: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
    pub defines: Vec<(String, Option<String>)>,
    pub format: OutputFormat,
    pub out: Option<PathBuf>,
    pub trace: bool,
    pub run: bool,
    pub max_passes: usize,
    pub show_undefined: bool,
    pub quiet: bool,
    pub dump_symbols: bool,
    pub use_65c02: bool,
    pub symbol_file: Option<PathBuf>,
}

impl Default for Cli {
    fn default() -> Self {
        Cli {
            sources: Vec::new(),
            scripts: Vec::new(),
            defines: Vec::new(),
            format: OutputFormat::Prg,
            out: None,
            trace: false,
            run: false,
            max_passes: 10,
            show_undefined: false,
            quiet: false,
            dump_symbols: false,
            use_65c02: false,
            symbol_file: None,
        }
    }
}

impl Cli {
    fn default_out_path(&self) -> PathBuf {
        match self.format {
            OutputFormat::Prg => "result.prg",
            OutputFormat::Crt => "result.crt",
            OutputFormat::Raw => "result.bin",
        }
        .into()
    }
}

/// Installs a `tracing_subscriber` filtered by `-q`/`--trace`/`RUST_LOG`,
/// following the ambient logging convention shared by every crate here.
pub fn init_logging(cli: &Cli) {
    let default_level = if cli.trace { "trace" } else if cli.quiet { "error" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn parse_sources(paths: &[PathBuf]) -> Result<badass_asm::ast::Program, Error> {
    let mut program = Vec::new();
    for path in paths {
        let source = std::fs::read_to_string(path)?;
        let parsed = cache::parse_cached(&source, grammar::parse)
            .map_err(|e| Error::Assemble(format!("{}: {}", path.display(), e)))?;
        program.extend(parsed);
    }
    Ok(program)
}

fn build_driver(cli: &Cli) -> Driver {
    let options = AssembleOptions {
        max_passes: cli.max_passes,
        cpu: if cli.use_65c02 { Cpu::W65C02 } else { Cpu::Mos6502 },
        defines: cli.defines.clone(),
        show_undefined: cli.show_undefined,
    };
    let mut driver = Driver::new(&options);
    driver.loader = Some(std::rc::Rc::new(|p: &str| std::fs::read(p).map_err(badass_asm::Error::from)));
    driver.parser = Some(std::rc::Rc::new(|text: &str| cache::parse_cached(text, grammar::parse)));
    driver
}

/// Assembles every source, then either writes the binary output or (in
/// `--run` mode) boots it headlessly. Returns `Ok(())` on success; any
/// `Err` maps to exit code 1 at the CLI boundary.
pub fn run(cli: &Cli) -> Result<(), Error> {
    if cli.sources.is_empty() && cli.scripts.is_empty() {
        return Err(Error::NoSources);
    }

    let program = parse_sources(&cli.sources)?;
    let mut driver = build_driver(cli);
    let label = cli.sources.first().map(|p| p.display().to_string()).unwrap_or_default();

    let report = driver.assemble(&label, &program, cli.max_passes).map_err(|errors| {
        Error::Assemble(errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))
    })?;
    tracing::debug!(passes = report.passes_run, "assembly converged");

    if !cli.quiet {
        for section in driver.sections.sections() {
            if !section.data.is_empty() {
                let start = section.start.unwrap_or(0);
                println!("{:04x}-{:04x} {}", start, start + section.data.len() as u32, section.name);
            }
        }
    }

    if cli.dump_symbols {
        driver.symtab.for_all(|name, value| println!("{name} = {value}"));
    }

    if let Some(path) = &cli.symbol_file {
        let mut out = String::new();
        driver.symtab.for_all(|name, value| out.push_str(&format!("{name} = {value}\n")));
        std::fs::write(path, out)?;
    }

    if cli.run {
        run_headless(&driver)?;
        return Ok(());
    }

    let out_path = cli.out.clone().unwrap_or_else(|| cli.default_out_path());
    let mut bytes = Vec::new();
    badass_fmt::write(&mut bytes, cli.format.into(), &label, driver.sections.sections())?;
    std::fs::write(out_path, bytes)?;

    Ok(())
}

/// `--run` without a real terminal attached: sections are loaded into a
/// `sixfive::Machine` with the text device's register/plane pages mapped
/// in, and the CPU runs to a stop condition against a headless display.
/// Actually driving a terminal is a host concern outside this crate.
fn run_headless(driver: &Driver) -> Result<(), Error> {
    let mut mem = CallbackMemory::new();
    let mut start = 0u16;
    let mut have_start = false;
    for section in driver.sections.sections() {
        if section.data.is_empty() || section.flags.no_storage {
            continue;
        }
        let base = section.start.unwrap_or(0) as u16;
        mem.load(base, &section.data);
        if !have_start || base < start {
            start = base;
            have_start = true;
        }
    }

    let device = badass_text::TextDevice::new(badass_text::NullDisplay::default()).shared();
    badass_text::install(&device, &mut mem);

    let mut machine = sixfive::Machine::new(mem, driver.cpu);
    machine.regs.pc = start;

    const MAX_TICKS: u32 = 1_000_000;
    for _ in 0..MAX_TICKS {
        let stop = machine.run_for(10_000);
        device.borrow_mut().tick();
        if device.borrow().should_stop() {
            break;
        }
        if let Ok(sixfive::StopReason::StackWrap) = stop {
            break;
        }
    }
    Ok(())
}
