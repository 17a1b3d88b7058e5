extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate nesasm;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use nesasm::assembler::{Assembler, Assembly, Platform};
use nesasm::assembler::directives::Directives;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Listing rows show at most this many bytes per statement.
const LISTING_BYTES: usize = 8;

fn main() {
    let args = process_arguments();
    let level = level_filter(args.occurrences_of("verbose"));
    initialize_logging(level);

    debug!("Arguments:\n\tVerbosity: {}\n\tParse Only: {}\n\tiNES: {}\n\tOutfile: {}\n\tInfile: {}",
        level,
        args.is_present("parse-only"),
        args.is_present("ines"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap_or("None")
    );

    // INPUT is a required argument, clap has already rejected its absence.
    let ipath = Path::new(args.value_of("INPUT").unwrap_or_default());

    let source = match fs::read_to_string(&ipath) {
        Err(err) => {
            error!("fatal: unable to read input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(source) => source,
    };

    let assembler = match Assembler::new(Platform::default(), Directives::default()) {
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        },
        Ok(assembler) => assembler,
    };

    if args.is_present("parse-only") {
        match assembler.parse(&source) {
            Err(err) => {
                error!("{}: {}", ipath.display(), err);
                std::process::exit(1);
            },
            Ok(program) => {
                for statement in program.statements.iter() {
                    println!("{}", statement);
                }
            },
        }
        return;
    }

    let assembly = match assembler.assemble(&source) {
        Err(err) => {
            error!("{}: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(assembly) => assembly,
    };

    if args.is_present("listing") {
        print_listing(&assembly);
    }

    let ines = args.is_present("ines");
    let opath = match args.value_of("output") {
        Some(filename) => PathBuf::from(filename),
        None => ipath.with_extension(if ines { "nes" } else { "bin" }),
    };

    let mut ofile = match File::create(&opath) {
        Err(err) => {
            error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    let bytes = assembly.bytes(ines);
    if let Err(err) = ofile.write_all(&bytes) {
        error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
        std::process::exit(1);
    }
    info!("Wrote {} bytes to `{}`.", bytes.len(), opath.display());
}

fn print_listing(assembly: &Assembly) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for entry in assembly.listing.iter() {
        let mut bytes: Vec<String> = entry.bytes
            .iter()
            .take(LISTING_BYTES)
            .map(|b| format!("{:02X}", b))
            .collect();
        if entry.bytes.len() > LISTING_BYTES {
            bytes.push("..".to_string());
        }
        grid.add(Cell::from(format!("${:04X}:", entry.address)));
        grid.add(Cell::from(bytes.join(" ")));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(entry.statement.clone()));
    }
    println!("{}", grid.fit_into_columns(4));

    let mut symbols = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });
    for (name, address) in assembly.symbols.sorted() {
        symbols.add(Cell::from(name.to_string()));
        symbols.add(Cell::from(format!("${:04X}", address)));
    }
    println!("{}", symbols.fit_into_columns(2));
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap_or("nesasm"))
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"))
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap_or(""))
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap_or(""))
        .arg(Arg::with_name("INPUT")
            .help("6502 assembly source to assemble")
            .required(true)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .help("log more; repeat up to three times"))
        .arg(Arg::with_name("output")
            .short("o")
            .long("output")
            .value_name("OUTFILE")
            .takes_value(true)
            .help("where to write the image [default: INPUT with .bin or .nes]"))
        .arg(Arg::with_name("ines")
            .short("n")
            .long("ines")
            .help("wrap the code in an iNES header with 8 KiB banks"))
        .arg(Arg::with_name("parse-only")
            .short("e")
            .long("parse-only")
            .conflicts_with_all(&["ines", "output", "listing"])
            .help("stop after parsing and print each statement"))
        .arg(Arg::with_name("listing")
            .short("d")
            .long("listing")
            .help("print the address, bytes and source of every statement, then the symbol table"))
        .get_matches()
}

fn level_filter(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

/// Logs go to stderr so listings on stdout stay clean.
fn initialize_logging(level: log::LevelFilter) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply().ok();
}
