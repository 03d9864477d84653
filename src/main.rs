use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use plcforge::model::PlcopenProject;
use plcforge::scan::scan_directory;
use plcforge::{
    ParsedDocument, ParserLimits, serialize_plcopen_project, try_parse_document,
    try_parse_plcopen_project,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plcforge")]
#[command(
    author,
    version,
    about = "Parse and regenerate PLCopen XML and IEC 61499 Basic FB files",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    limits: LimitArgs,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "PLCFORGE_LOG", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a PLCopen project or .fbt Basic FB and print the model as JSON
    Parse {
        #[arg(value_name = "FILE")]
        file: Utf8PathBuf,
    },
    /// Parse a PLCopen project and print it re-serialized as XML
    Roundtrip {
        #[arg(value_name = "FILE")]
        file: Utf8PathBuf,
    },
    /// Read a project model from JSON and print it as PLCopen XML
    Export {
        #[arg(value_name = "MODEL_JSON")]
        model: Utf8PathBuf,
    },
    /// Summarize every .xml / .fbt file below a directory
    Scan {
        #[arg(value_name = "DIR")]
        dir: Utf8PathBuf,
    },
}

#[derive(Args, Debug)]
struct LimitArgs {
    /// JSON file with parser limits; flags below override it
    #[arg(long = "limits", global = true, value_name = "FILE")]
    limits_file: Option<Utf8PathBuf>,

    #[arg(long, global = true, env = "PLCFORGE_MAX_INPUT_BYTES")]
    max_input_bytes: Option<usize>,

    #[arg(long, global = true, env = "PLCFORGE_MAX_TYPE_DEPTH")]
    max_type_depth: Option<usize>,

    #[arg(long, global = true, env = "PLCFORGE_MAX_XML_NODES")]
    max_xml_nodes: Option<u32>,
}

impl LimitArgs {
    fn resolve(&self) -> Result<ParserLimits> {
        let mut limits = match &self.limits_file {
            Some(path) => ParserLimits::from_json_file(path)?,
            None => ParserLimits::default(),
        };
        if let Some(v) = self.max_input_bytes {
            limits.max_input_bytes = v;
        }
        if let Some(v) = self.max_type_depth {
            limits.max_type_depth = v;
        }
        if let Some(v) = self.max_xml_nodes {
            limits.max_xml_nodes = v;
        }
        Ok(limits)
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(path: &Utf8Path) -> Result<String> {
    std::fs::read_to_string(path.as_std_path()).with_context(|| format!("Open {}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);
    let limits = cli.limits.resolve()?;

    match cli.command {
        Command::Parse { file } => {
            let text = read_input(&file)?;
            let document = try_parse_document(&text, &limits)
                .with_context(|| format!("Failed to parse {}", file))?;
            info!(file = %file, dialect = %document.dialect(), "parsed");
            let json = match &document {
                ParsedDocument::PlcOpen(project) => serde_json::to_string_pretty(project)?,
                ParsedDocument::Fbt(fb) => serde_json::to_string_pretty(fb)?,
            };
            println!("{}", json);
        }
        Command::Roundtrip { file } => {
            let text = read_input(&file)?;
            let project = try_parse_plcopen_project(&text, &limits)
                .with_context(|| format!("Failed to parse {}", file))?;
            print!("{}", serialize_plcopen_project(&project));
        }
        Command::Export { model } => {
            let text = read_input(&model)?;
            let project: PlcopenProject = serde_json::from_str(&text)
                .with_context(|| format!("Failed to read project model {}", model))?;
            print!("{}", serialize_plcopen_project(&project));
        }
        Command::Scan { dir } => {
            let entries = scan_directory(&dir, &limits);
            for entry in &entries {
                println!("{}", entry);
            }
            info!(files = entries.len(), "done");
        }
    }
    Ok(())
}
