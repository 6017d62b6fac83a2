//! layout-render CLI
//!
//! Usage:
//!   layout-render [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -d, --dir <DIR>          Template directory (default: templates)
//!   -l, --layout <NAME>      Layout template wrapping the render
//!   -x, --ext <EXT>          Template file extension, repeatable (default: .html)
//!   -c, --config <FILE>      Options file (TOML format)
//!   --data <FILE>            JSON data for the template, `-` for stdin
//!   --left-delim <DELIM>     Left action delimiter
//!   --right-delim <DELIM>    Right action delimiter
//!   --list                   Print the compiled template names
//!   -v, --verbose            Debug logging on stderr
//!   -h, --help               Print help

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use layout_render::{HtmlRenderer, RenderError, RenderOptions, Value};

#[derive(Parser)]
#[command(name = "layout-render")]
#[command(about = "Render HTML templates through nested layouts")]
struct Cli {
    /// Template to render, by its path relative to the template directory
    template: Option<String>,

    /// Template directory
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Layout template name
    #[arg(short, long)]
    layout: Option<String>,

    /// Template file extension (repeatable)
    #[arg(short = 'x', long = "ext")]
    extensions: Vec<String>,

    /// Options file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON data file, or `-` to read stdin
    #[arg(long)]
    data: Option<PathBuf>,

    /// Left action delimiter
    #[arg(long)]
    left_delim: Option<String>,

    /// Right action delimiter
    #[arg(long)]
    right_delim: Option<String>,

    /// Print the compiled template names and exit
    #[arg(long)]
    list: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = load_options(&cli);
    let renderer = match HtmlRenderer::new(options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e.report());
            std::process::exit(1);
        }
    };

    if cli.list {
        for name in renderer.templates().names() {
            println!("{}", name);
        }
        return;
    }

    let Some(template) = &cli.template else {
        eprintln!("Error: no template given (use --list to see available templates)");
        std::process::exit(1);
    };

    let data = load_data(cli.data.as_ref());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = renderer.render(&mut out, template, &data) {
        let _ = out.flush();
        report_render_error(&renderer, &e);
        std::process::exit(1);
    }
    if let Err(e) = out.flush() {
        eprintln!("Error writing output: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> RenderOptions {
    let mut options = match &cli.config {
        Some(path) => match RenderOptions::from_file(path) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => RenderOptions::default(),
    };

    if let Some(dir) = &cli.dir {
        options.directory = dir.clone();
    }
    if let Some(layout) = &cli.layout {
        options.layout = layout.clone();
    }
    if !cli.extensions.is_empty() {
        options.extensions = cli.extensions.clone();
    }
    if let Some(left) = &cli.left_delim {
        options.delims.left = left.clone();
    }
    if let Some(right) = &cli.right_delim {
        options.delims.right = right.clone();
    }
    options
}

fn load_data(path: Option<&PathBuf>) -> Value {
    let Some(path) = path else {
        return Value::nil();
    };

    let text = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        match io::stdin().read_to_string(&mut buffer) {
            Ok(_) => buffer,
            Err(e) => {
                eprintln!("Error reading from stdin: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
    };

    match serde_json::from_str(&text) {
        Ok(data) => Value::Data(data),
        Err(e) => {
            eprintln!("Error parsing data '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn report_render_error(renderer: &HtmlRenderer, err: &RenderError) {
    eprintln!("Error: {}", err);
    if let Some(name) = err.template() {
        if let Some(unit) = renderer.templates().lookup(name) {
            if let RenderError::Execution { span, .. } = innermost(err) {
                if let Some(before) = unit.text.get(..span.start) {
                    eprintln!("  --> {}:{}", name, before.matches('\n').count() + 1);
                }
            }
        }
    }
}

fn innermost(err: &RenderError) -> &RenderError {
    match err {
        RenderError::Execution {
            cause: layout_render::ExecError::Nested { source, .. },
            ..
        } => innermost(source),
        other => other,
    }
}
