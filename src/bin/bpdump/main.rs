//! bpdump - Tool for inspecting BP index, data and dataset files.

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use bpformat::bp::{DataFileDecoder, Dataset, DecodeOptions, FileSource, FormatHeader, Index, VmdLengthConvention};
use bpformat::dump;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BPDUMP_BUILD_DATE"),
    " ",
    env!("BPDUMP_BUILD_TIME"),
    ")"
);

/// Flags shared by every command.
#[derive(Default)]
struct Flags {
    json: bool,
    forensic: bool,
    legacy_vmd_length: bool,
    no_mmap: bool,
}

impl Flags {
    fn options(&self) -> DecodeOptions {
        let options = if self.forensic { DecodeOptions::forensic() } else { DecodeOptions::strict() };
        if self.legacy_vmd_length {
            options.with_vmd_length(VmdLengthConvention::AfterLengthField)
        } else {
            options
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut flags = Flags::default();
    let mut positional: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "-j" | "--json" => flags.json = true,
            "-f" | "--forensic" => flags.forensic = true,
            "--legacy-vmd-length" => flags.legacy_vmd_length = true,
            "--no-mmap" => flags.no_mmap = true,
            "-V" | "--version" => {
                println!("bpdump {VERSION}");
                return;
            }
            _ => positional.push(arg),
        }
    }
    init_logging(level);

    if positional.is_empty() {
        print_help();
        return;
    }

    let result = match positional[0] {
        "header" | "h" => with_file(&positional, "header <file>", |p| cmd_header(p, &flags)),
        "index" | "i" => with_file(&positional, "index <md.idx>", |p| cmd_index(p, &flags)),
        "data" | "d" => with_file(&positional, "data <data.N>", |p| cmd_data(p, &flags)),
        "dataset" | "ds" => with_file(&positional, "dataset <dir.bp>", |p| cmd_dataset(p, &flags)),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Run 'bpdump help' for usage");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the command line.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_help() {
    println!("bpdump {VERSION} - BP file inspector");
    println!();
    println!("USAGE:");
    println!("    bpdump [OPTIONS] <COMMAND> <PATH>");
    println!();
    println!("COMMANDS:");
    println!("    h,  header  <file>        Show the 64-byte file header");
    println!("    i,  index   <md.idx>      Decode a v4 or v5 index file");
    println!("    d,  data    <data.N>      Decode every process group in a data file");
    println!("    ds, dataset <dir.bp>      Decode the index and all data files of a dataset");
    println!("        help                  Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -j, --json               Print JSON instead of a text report");
    println!("    -f, --forensic           Record errors and keep scanning");
    println!("        --legacy-vmd-length  Variable block lengths exclude the length field");
    println!("        --no-mmap            Read files into memory instead of mapping them");
    println!("    -v, --verbose            Show debug output");
    println!("    -vv, --trace             Show trace output (very verbose)");
    println!("    -q, --quiet              Only show errors");
    println!("    -V, --version            Show version");
    println!();
    println!("NOTES:");
    println!("    - RUST_LOG overrides -v/-vv/-q");
    println!("    - Exit status is 1 on any decode error in strict mode");
}

fn with_file(
    args: &[&str],
    usage: &str,
    run: impl FnOnce(&Path) -> bpformat::Result<()>,
) -> bpformat::Result<()> {
    match args.get(1) {
        Some(path) => run(Path::new(path)),
        None => {
            eprintln!("Error: missing path argument");
            eprintln!("Usage: bpdump {}", usage);
            process::exit(1);
        }
    }
}

fn open(path: &Path, flags: &Flags) -> bpformat::Result<FileSource> {
    info!("Opening {}", path.display());
    FileSource::open_opts(path, !flags.no_mmap && cfg!(feature = "mmap"))
}

fn cmd_header(path: &Path, flags: &Flags) -> bpformat::Result<()> {
    let source = open(path, flags)?;
    let header = FormatHeader::from_bytes(&source)?;
    if flags.json {
        print_json(&dump::header_json(&header))
    } else {
        dump::write_header(&mut io::stdout().lock(), &header)?;
        Ok(())
    }
}

fn cmd_index(path: &Path, flags: &Flags) -> bpformat::Result<()> {
    let source = open(path, flags)?;
    let index = Index::decode(&source, &flags.options())?;
    debug!("Index format {}", index.format_version());
    if flags.json {
        print_json(&dump::index_json(&index))
    } else {
        dump::write_index(&mut io::stdout().lock(), &index)?;
        Ok(())
    }
}

fn cmd_data(path: &Path, flags: &Flags) -> bpformat::Result<()> {
    let source = open(path, flags)?;
    let report = DataFileDecoder::new(flags.options()).decode(&source)?;
    info!(
        "{} process groups, {} variables, {} errors",
        report.process_groups.len(),
        report.variable_count(),
        report.errors.len()
    );
    if flags.json {
        print_json(&dump::data_file_json(&report))
    } else {
        dump::write_data_file(&mut io::stdout().lock(), &report)?;
        Ok(())
    }
}

fn cmd_dataset(path: &Path, flags: &Flags) -> bpformat::Result<()> {
    let dataset = Dataset::open(path, &flags.options())?;
    if flags.json {
        print_json(&dump::dataset_json(&dataset))
    } else {
        dump::write_dataset(&mut io::stdout().lock(), &dataset)?;
        Ok(())
    }
}

fn print_json(value: &serde_json::Value) -> bpformat::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
