#[macro_use]
extern crate clap;

use badass::{Cli, OutputFormat};
use clap::Arg;
use std::path::PathBuf;
use std::str::FromStr;

fn parse_define(raw: &str) -> (String, Option<String>) {
    match raw.split_once('=') {
        Some((k, v)) => (k.to_string(), Some(v.to_string())),
        None => (raw.to_string(), None),
    }
}

fn build_cli() -> Cli {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .takes_value(true)
                .possible_values(&["raw", "prg", "crt"])
                .default_value("prg")
                .help("Output format"),
        )
        .arg(Arg::with_name("trace").long("trace").help("Trace rule invocations"))
        .arg(Arg::with_name("run").long("run").help("Run program in a headless emulator"))
        .arg(
            Arg::with_name("max-passes")
                .long("max-passes")
                .takes_value(true)
                .default_value("10")
                .help("Max assembler passes"),
        )
        .arg(Arg::with_name("show-undefined").long("show-undefined").help("Show undefined symbols after each pass"))
        .arg(Arg::with_name("quiet").short("q").long("quiet").help("Less noise"))
        .arg(Arg::with_name("symbols").short("S").help("Dump symbol table"))
        .arg(Arg::with_name("65c02").long("65c02").help("Target 65C02"))
        .arg(Arg::with_name("table").short("s").takes_value(true).value_name("FILE").help("Write numeric symbols to file"))
        .arg(Arg::with_name("out").short("o").long("out").takes_value(true).value_name("FILE").help("Output file"))
        .arg(Arg::with_name("define").short("D").takes_value(true).multiple(true).number_of_values(1).help("Add symbol"))
        .arg(Arg::with_name("include").short("i").takes_value(true).multiple(true).number_of_values(1).help("Sources to compile"))
        .arg(Arg::with_name("script").short("x").long("lua").takes_value(true).multiple(true).number_of_values(1).help("Scripts to load"))
        .arg(Arg::with_name("source").multiple(true).help("Sources to compile"))
        .get_matches();

    let mut cli = Cli {
        format: matches.value_of("format").and_then(|s| OutputFormat::from_str(s).ok()).unwrap_or(OutputFormat::Prg),
        trace: matches.is_present("trace"),
        run: matches.is_present("run"),
        max_passes: value_t!(matches.value_of("max-passes"), usize).unwrap_or(10),
        show_undefined: matches.is_present("show-undefined"),
        quiet: matches.is_present("quiet"),
        dump_symbols: matches.is_present("symbols"),
        use_65c02: matches.is_present("65c02"),
        symbol_file: matches.value_of("table").map(PathBuf::from),
        out: matches.value_of("out").map(PathBuf::from),
        ..Cli::default()
    };

    cli.sources.extend(matches.values_of("include").unwrap_or_default().map(PathBuf::from));
    cli.sources.extend(matches.values_of("source").unwrap_or_default().map(PathBuf::from));
    cli.scripts.extend(matches.values_of("script").unwrap_or_default().map(PathBuf::from));
    cli.defines.extend(matches.values_of("define").unwrap_or_default().map(parse_define));

    cli
}

fn main() {
    let cli = build_cli();
    badass::init_logging(&cli);

    if let Err(e) = badass::run(&cli) {
        eprintln!("**Error: {e}");
        std::process::exit(1);
    }
}
