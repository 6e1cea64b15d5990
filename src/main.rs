//! forge – command-line template → PDF exporter.
//!
//! Usage:
//!   forge <template.json> [output.pdf] [--vars vars.json] [--blocks blocks.json]
//!         [--title "My Report"] [--layout-json] [--calls]
//!
//! If `output.pdf` is omitted the PDF is written next to the template with
//! the same stem (e.g. `invoice.json` → `invoice.pdf`).

use std::{collections::BTreeMap, env, fs, path::PathBuf, process};

use plate_forge::fonts::FontManager;
use plate_forge::io::{load_blocks, load_template, load_variables};
use plate_forge::model::Variables;
use plate_forge::pipeline::{compute_layout, render_document, ExportConfig};
use plate_forge::render::{PdfRenderer, RecordingRenderer};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut vars_path: Option<PathBuf> = None;
    let mut blocks_path: Option<PathBuf> = None;
    let mut title: Option<String> = None;
    let mut layout_json = false;
    let mut calls = false;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--vars" | "-v" => vars_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--blocks" | "-b" => blocks_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--title" | "-t" => title = Some(flag_value(&mut iter, arg, &args[0])),
            "--layout-json" => layout_json = true,
            "--calls" => calls = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let input = match input_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no template file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    // Default output: same directory + same stem as input, but with .pdf
    let output = output_path.unwrap_or_else(|| {
        let mut o = input.clone();
        o.set_extension("pdf");
        o
    });

    let template = load_template(&input).unwrap_or_else(|e| {
        eprintln!("Error reading template '{}': {e}", input.display());
        process::exit(1);
    });
    let variables = match &vars_path {
        Some(p) => load_variables(p).unwrap_or_else(|e| {
            eprintln!("Error reading variables '{}': {e}", p.display());
            process::exit(1);
        }),
        None => Variables::new(),
    };
    let blocks = match &blocks_path {
        Some(p) => load_blocks(p).unwrap_or_else(|e| {
            eprintln!("Error reading blocks '{}': {e}", p.display());
            process::exit(1);
        }),
        None => BTreeMap::new(),
    };

    // Default title: template name, then the input filename stem.
    let default_title = Some(template.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| input.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_else(|| ExportConfig::default().title);
    let config = ExportConfig::with_title(title.unwrap_or(default_title));

    let fonts = FontManager::default();
    let document = compute_layout(&template, &blocks, &fonts, &variables, &config);

    if layout_json {
        let path = output.with_extension("layout.json");
        if let Err(e) = fs::write(&path, document.to_json()) {
            eprintln!("Error writing '{}': {e}", path.display());
            process::exit(1);
        }
        eprintln!("Wrote layout '{}'", path.display());
    }

    if calls {
        let mut recorder = RecordingRenderer::new();
        if let Err(e) = render_document(&document, &mut recorder, &fonts, None) {
            eprintln!("Error recording draw calls: {e}");
            process::exit(1);
        }
        println!("{}", recorder.to_json());
        return;
    }

    // Create output directory if necessary.
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating output directory: {e}");
                process::exit(1);
            }
        }
    }

    let mut renderer = PdfRenderer::with_fonts(&config.title, fonts.clone());
    match render_document(&document, &mut renderer, &fonts, Some(&output)) {
        Ok(report) => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            let bytes = renderer.bytes().map_or(0, <[u8]>::len);
            let pages = report.page_count;
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{})",
                output.display(),
                bytes,
                pages,
                if pages == 1 { "" } else { "s" }
            );
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

/// Take the value following `flag`, or exit with usage.
fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str, prog: &str) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("forge – document template to PDF exporter (plate-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <template.json> [output.pdf] [--vars vars.json] [--blocks blocks.json]");
    eprintln!("        [--title \"My Report\"] [--layout-json] [--calls]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <template.json>  Template to export (legacy flat templates are migrated)");
    eprintln!("  [output.pdf]     Output path  (default: same stem as input with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --vars, -v       JSON object of global variables");
    eprintln!("  --blocks, -b     JSON block definition (one block or an array)");
    eprintln!("  --title, -t      Document title in PDF metadata (default: template name)");
    eprintln!("  --layout-json    Also write the paginated layout next to the output");
    eprintln!("  --calls          Print the renderer call stream as JSON instead of writing a PDF");
    eprintln!("  --help           Print this message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for per-stage diagnostics.");
}
