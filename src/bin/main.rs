//! Command-line front end for the blackbox log decoder.

use anyhow::{Context, Result};
use bbl_decoder::export::{compute_export_paths, write_headers_csv, CsvExporter};
use bbl_decoder::{DecodeHandler, FlightLog, FrameEvent, FrameKind, LogEvent, LogHeader};
use clap::{Arg, Command};
use glob::glob;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Forwards frames to the optional CSV exporter and keeps the decoded
/// events for the event export.
struct CliHandler {
    csv: Option<CsvExporter<std::fs::File>>,
    events: Vec<LogEvent>,
}

impl DecodeHandler for CliHandler {
    fn on_metadata(&mut self, header: &LogHeader) {
        if let Some(csv) = &mut self.csv {
            csv.on_metadata(header);
        }
    }

    fn on_frame(&mut self, header: &LogHeader, frame: &FrameEvent) {
        if let Some(csv) = &mut self.csv {
            csv.on_frame(header, frame);
        }
    }

    fn on_event(&mut self, _header: &LogHeader, event: &LogEvent) {
        self.events.push(*event);
    }
}

fn main() -> Result<()> {
    let matches = Command::new("bbl_decode")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(concat!(
            env!("CARGO_PKG_VERSION"),
            " (",
            env!("VERGEN_GIT_SHA"),
            ", ",
            env!("VERGEN_GIT_COMMIT_DATE"),
            ")"
        ))
        .about("Decode blackbox flight data recorder logs. Output to CSV and JSON.")
        .arg(
            Arg::new("files")
                .help("Log files to decode (.BBL, .BFL, .TXT extensions, case-insensitive, supports globbing)")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("index")
                .long("index")
                .help("Decode only the sub-log with this zero-based index (default: all)")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Export decoded main frames to CSV files (plus .headers.csv with the raw header lines)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("event")
                .long("event")
                .help("Export decoded events to JSON files (requires the json feature)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Disable predictor application and report raw field values")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .help("Only export main fields whose name matches this regular expression")
                .value_name("REGEX"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for output files (default: same as input file)")
                .value_name("DIR"),
        )
        .get_matches();

    let export_csv = matches.get_flag("csv");
    let export_event = matches.get_flag("event");
    let raw = matches.get_flag("raw");
    let log_index = matches.get_one::<usize>("index").copied();
    let output_dir = matches.get_one::<String>("output-dir").map(PathBuf::from);
    let field_filter = matches
        .get_one::<String>("filter")
        .map(|pattern| Regex::new(pattern).context("Invalid --filter regular expression"))
        .transpose()?;
    let file_patterns: Vec<&String> = matches.get_many::<String>("files").unwrap().collect();

    if export_event && !cfg!(feature = "json") {
        eprintln!("Error: --event requires this binary to be built with the json feature.");
        std::process::exit(1);
    }

    let mut valid_paths = Vec::new();
    for pattern in &file_patterns {
        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern) {
                Ok(glob_iter) => match glob_iter.collect::<std::result::Result<Vec<_>, _>>() {
                    Ok(paths) => paths,
                    Err(e) => {
                        eprintln!("Error expanding glob pattern '{pattern}': {e}");
                        continue;
                    }
                },
                Err(e) => {
                    eprintln!("Invalid glob pattern '{pattern}': {e}");
                    continue;
                }
            }
        } else {
            vec![PathBuf::from(pattern)]
        };

        for path in paths {
            if !path.exists() {
                eprintln!("Warning: File does not exist: {path:?}");
                continue;
            }

            let valid_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    let ext_lower = ext.to_ascii_lowercase();
                    ext_lower == "bbl" || ext_lower == "bfl" || ext_lower == "txt"
                })
                .unwrap_or(false);

            if !valid_extension {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("none");
                eprintln!("Warning: Skipping file with unsupported extension '{ext}': {path:?}");
                continue;
            }

            valid_paths.push(path);
        }
    }

    if valid_paths.is_empty() {
        eprintln!("Error: No valid files found to process.");
        eprintln!("Supported extensions: .BBL, .BFL, .TXT (case-insensitive)");
        std::process::exit(1);
    }

    let mut processed_files = 0;

    for (file_number, path) in valid_paths.iter().enumerate() {
        if file_number > 0 {
            println!();
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        println!("Processing: {filename}");

        match process_file(
            path,
            log_index,
            export_csv,
            export_event,
            raw,
            field_filter.as_ref(),
            output_dir.as_deref(),
        ) {
            Ok(()) => processed_files += 1,
            Err(e) => {
                eprintln!("Error processing {filename}: {e}");
                eprintln!("Continuing with next file...");
            }
        }
    }

    if processed_files == 0 {
        eprintln!(
            "Error: No files were successfully processed out of {} files found.",
            valid_paths.len()
        );
        std::process::exit(1);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_file(
    path: &Path,
    log_index: Option<usize>,
    export_csv: bool,
    export_event: bool,
    raw: bool,
    field_filter: Option<&Regex>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read log file: {path:?}"))?;
    let mut log = FlightLog::new(&data)?;

    let total_logs = log.log_count();
    if total_logs == 0 {
        anyhow::bail!("No blackbox log headers found in file");
    }

    let indices: Vec<usize> = match log_index {
        Some(index) if index < total_logs => vec![index],
        Some(index) => {
            anyhow::bail!("Sub-log index {index} out of range (file holds {total_logs})")
        }
        None => (0..total_logs).collect(),
    };

    for index in indices {
        let (csv_path, headers_path, event_path) =
            compute_export_paths(path, output_dir, index + 1, total_logs);

        let csv = if export_csv {
            let mut exporter = CsvExporter::create(&csv_path)?;
            if let Some(filter) = field_filter {
                let filter = filter.clone();
                exporter = exporter.with_field_filter(move |name| filter.is_match(name));
            }
            Some(exporter)
        } else {
            None
        };

        let mut handler = CliHandler {
            csv,
            events: Vec::new(),
        };

        let parsed = log.parse(index, &mut handler, raw)?;
        if !parsed {
            eprintln!("Sub-log {} has no data frames, skipping", index + 1);
            continue;
        }

        if let Some(csv) = handler.csv {
            let rows = csv.finish()?;
            write_headers_csv(&headers_path, &log.header)?;
            println!("  Wrote {} rows to {:?}", rows, csv_path);
        }

        #[cfg(feature = "json")]
        if export_event {
            bbl_decoder::export::export_events_json(&event_path, &handler.events)?;
            println!("  Wrote {} events to {:?}", handler.events.len(), event_path);
        }
        #[cfg(not(feature = "json"))]
        let _ = (export_event, event_path);

        print_summary(&log, index + 1, total_logs);
    }

    Ok(())
}

fn print_summary(log: &FlightLog, log_number: usize, total_logs: usize) {
    let stats = &log.stats;
    let intra = stats.frame(FrameKind::Intra);
    let inter = stats.frame(FrameKind::Inter);
    let gps = stats.frame(FrameKind::Gps);
    let home = stats.frame(FrameKind::GpsHome);
    let event = stats.frame(FrameKind::Event);

    println!(
        "  Log {} of {}: {} I / {} P frames, {} GPS, {} home, {} events",
        log_number,
        total_logs,
        intra.valid_count,
        inter.valid_count,
        gps.valid_count,
        home.valid_count,
        event.valid_count,
    );

    if !log.header.firmware_revision.is_empty() {
        println!("  Firmware: {}", log.header.firmware_revision);
    }

    if stats.total_corrupt_frames > 0 || inter.desync_count > 0 {
        println!(
            "  {} corrupt frames, {} desynced P frames",
            stats.total_corrupt_frames, inter.desync_count
        );
    }
}
