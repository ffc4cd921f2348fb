//! press – command-line book builder.
//!
//! Usage:
//!   press <manifest.json> [output.pdf] [--generate] [--docx] [--plan]
//!         [--theme slate] [--letter] [--no-page-numbers] [--image photo.png]
//!   press --sample [manifest.json]
//!
//! If the output path is omitted the book is written next to the manifest
//! with the same stem (e.g. `book.json` → `book.pdf`).

use std::{env, fs, path::Path, path::PathBuf, process};

use bookpress::compose::PageSizeChoice;
use bookpress::generate::GenerationClient;
use bookpress::images::ImageAsset;
use bookpress::style::ThemeChoice;
use bookpress::{docx, render_book, samples, Manifest, Result};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut generate = false;
    let mut sample = false;
    let mut write_plan = false;
    let mut as_docx = false;
    let mut theme: Option<String> = None;
    let mut letter = false;
    let mut no_page_numbers = false;
    let mut image_paths: Vec<PathBuf> = Vec::new();
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--generate" | "-g" => generate = true,
            "--sample" => sample = true,
            "--plan" => write_plan = true,
            "--docx" => as_docx = true,
            "--letter" => letter = true,
            "--no-page-numbers" => no_page_numbers = true,
            "--theme" | "-t" => match iter.next() {
                Some(v) => theme = Some(v.clone()),
                None => {
                    eprintln!("--theme needs a value (classic, slate, vintage)");
                    process::exit(1);
                }
            },
            "--image" | "-i" => match iter.next() {
                Some(v) => image_paths.push(PathBuf::from(v)),
                None => {
                    eprintln!("--image needs a path to a png or jpeg file");
                    process::exit(1);
                }
            },
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

    if sample {
        let target = input_path.unwrap_or_else(|| PathBuf::from("field-guide.json"));
        if let Err(e) = fs::write(&target, samples::field_guide_manifest()) {
            eprintln!("Error writing '{}': {e}", target.display());
            process::exit(1);
        }
        eprintln!("Wrote sample manifest '{}'", target.display());
        process::exit(0);
    }

    let input = match input_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no manifest file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    // Default output: same directory + same stem as the manifest.
    let output = output_path.unwrap_or_else(|| {
        let mut o = input.clone();
        o.set_extension(if as_docx { "docx" } else { "pdf" });
        o
    });

    let raw = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", input.display());
            process::exit(1);
        }
    };

    let mut manifest = match Manifest::from_json(&raw) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error parsing '{}': {e}", input.display());
            process::exit(1);
        }
    };

    // Flag overrides beat manifest options.
    if let Some(key) = theme {
        manifest.options.theme = ThemeChoice::from_key(&key);
    }
    if letter {
        manifest.options.page_size = PageSizeChoice::Letter;
    }
    if no_page_numbers {
        manifest.options.page_numbers = false;
    }

    // Extra images ingested from the command line join the gallery.
    for path in &image_paths {
        match ImageAsset::from_file(path) {
            Ok(asset) => manifest.images.push(asset),
            Err(e) => {
                eprintln!("Error ingesting image '{}': {e}", path.display());
                process::exit(1);
            }
        }
    }

    if generate {
        if let Err(e) = run_generation(&mut manifest) {
            eprintln!("Error generating manuscript: {e}");
            process::exit(1);
        }
    }

    let manuscript = match manifest.manuscript() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if as_docx {
        match docx::manuscript_to_docx(&manuscript) {
            Ok(bytes) => write_output(&output, &bytes, None),
            Err(e) => {
                eprintln!("Error exporting DOCX: {e}");
                process::exit(1);
            }
        }
        return;
    }

    match render_book(&manuscript, &manifest.images, &manifest.options) {
        Ok((bytes, plan)) => {
            write_output(&output, &bytes, Some(plan.pages.len()));
            if write_plan {
                let mut plan_path = output.clone();
                plan_path.set_extension("plan.json");
                if let Err(e) = fs::write(&plan_path, plan.to_json()) {
                    eprintln!("Error writing '{}': {e}", plan_path.display());
                    process::exit(1);
                }
                eprintln!("Wrote layout plan '{}'", plan_path.display());
            }
        }
        Err(e) => {
            eprintln!("Error building book: {e}");
            process::exit(1);
        }
    }
}

/// Fill in a missing outline and the chapter prose via the drafting service.
/// Falls back to locally synthesized content when no API key is configured.
fn run_generation(manifest: &mut Manifest) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let client = GenerationClient::from_env();
    if !client.has_credentials() {
        eprintln!("No API key found; generating placeholder content offline.");
    }

    let outline = match manifest.outline.clone().filter(|o| !o.chapters.is_empty()) {
        Some(existing) => existing,
        None => {
            let generated = runtime.block_on(client.generate_outline(&manifest.config));
            if let Some(warning) = &generated.warning {
                eprintln!("Warning: {warning}");
            }
            manifest.outline = Some(generated.data.clone());
            generated.data
        }
    };

    let generated = runtime.block_on(client.generate_chapters(&manifest.config, &outline));
    if let Some(warning) = &generated.warning {
        eprintln!("Warning: {warning}");
    }
    manifest.chapters = Some(generated.data);
    Ok(())
}

fn write_output(output: &Path, bytes: &[u8], pages: Option<usize>) {
    // Create the output directory if necessary.
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating output directory: {e}");
                process::exit(1);
            }
        }
    }
    if let Err(e) = fs::write(output, bytes) {
        eprintln!("Error writing '{}': {e}", output.display());
        process::exit(1);
    }
    match pages {
        Some(pages) => eprintln!(
            "Wrote '{}' ({} bytes, {} page{})",
            output.display(),
            bytes.len(),
            pages,
            if pages == 1 { "" } else { "s" }
        ),
        None => eprintln!("Wrote '{}' ({} bytes)", output.display(), bytes.len()),
    }
}

fn print_usage(prog: &str) {
    eprintln!("press – manuscript to PDF book builder (bookpress)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <manifest.json> [output.pdf] [flags]");
    eprintln!("  {prog} --sample [manifest.json]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <manifest.json>  Book manifest (config, chapters, images, options)");
    eprintln!("  [output.pdf]     Output path  (default: same stem as manifest)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --generate, -g    Draft missing outline/chapters via the model API");
    eprintln!("                    (offline placeholder content without an API key)");
    eprintln!("  --docx            Export a .docx instead of rendering a PDF");
    eprintln!("  --plan            Also write the layout plan JSON next to the PDF");
    eprintln!("  --theme, -t       Theme preset: classic, slate, vintage");
    eprintln!("  --image, -i       Ingest a png/jpeg into the gallery (repeatable)");
    eprintln!("  --letter          US Letter pages instead of A4");
    eprintln!("  --no-page-numbers Disable footer page numbers");
    eprintln!("  --sample          Write the bundled sample manifest and exit");
    eprintln!("  --help            Print this message");
}
