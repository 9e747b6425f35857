use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pixelizer_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use pixelizer_contracts::config::{parse_flag, parse_size, TransportConfig};
use pixelizer_contracts::events::{EventNotifier, EventWriter, Notifier};
use pixelizer_engine::{
    concatenate_paths, default_backend_registry, ClientHandle, Direction, FrontEnd, Pixelizer,
    PixelizerConfig, PromptBuilder, Quality, ResultSink, SubmissionMode,
};

#[derive(Debug, Parser)]
#[command(name = "pixelizer-rs", version, about = "Turn a photo of a person into a pixel-art character")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pixelize one image and exit.
    Run(RunArgs),
    /// Interactive upload / generate / reset loop.
    Chat(ChatArgs),
    /// Concatenate images into one canvas without calling any model.
    Compose(ComposeArgs),
    /// Print the instruction sent with every request.
    Prompt(PromptArgs),
}

#[derive(Debug, Args)]
struct GenerationArgs {
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    references: Option<PathBuf>,
    #[arg(long, default_value = "openai")]
    backend: String,
    #[arg(long)]
    mode: Option<SubmissionMode>,
    #[arg(long)]
    quality: Option<Quality>,
    #[arg(long)]
    size: Option<String>,
    #[arg(long)]
    no_stream: bool,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    generation: GenerationArgs,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    generation: GenerationArgs,
}

#[derive(Debug, Parser)]
struct ComposeArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    vertical: bool,
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Parser)]
struct PromptArgs {
    #[arg(long, default_value_t = 7)]
    references: usize,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pixelizer-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("pixelizer-rs: could not load .env: {err}");
        }
    }
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_once(args),
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Compose(args) => run_compose(args),
        Command::Prompt(args) => {
            println!("{}", PromptBuilder::new(args.references).build());
            Ok(0)
        }
    }
}

fn resolve_config(args: &GenerationArgs) -> Result<PixelizerConfig> {
    let mut config = PixelizerConfig::from_env().context("invalid PIXELIZER_* environment")?;
    if let Some(out) = args.out.as_ref() {
        config.output_dir = out.clone();
    }
    if let Some(references) = args.references.as_ref() {
        config.reference_dir = references.clone();
    }
    if let Some(mode) = args.mode {
        config.submission = mode;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(size) = args.size.as_deref() {
        config.size = parse_size(size)?;
    }
    if args.no_stream {
        config.stream = false;
    }
    Ok(config)
}

fn build_client(config: &PixelizerConfig, backend: &str) -> ClientHandle {
    let transport = TransportConfig::from_env();
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mut registry = default_backend_registry(&transport, timeout);
    let client = registry
        .take(backend)
        .and_then(|backend| Pixelizer::load(config.clone(), backend));
    ClientHandle::from_result(client)
}

fn open_front_end(config: &PixelizerConfig, args: &GenerationArgs) -> Result<FrontEnd<EventNotifier>> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| config.output_dir.join("events.jsonl"));
    let session_id = format!("session-{}", timestamp_millis());
    let events = EventWriter::new(events_path, session_id.clone());
    let notifier = EventNotifier::new(events.clone());

    let client = build_client(config, &args.backend);
    if let ClientHandle::Unavailable(reason) = &client {
        notifier.warning(&format!("Model not initialized: {reason}"));
    }
    let sink = ResultSink::new(client, notifier, config).with_events(events.clone());
    FrontEnd::new(sink, session_id).with_session_log(events, config.output_dir.join("summary.json"))
}

fn run_once(args: RunArgs) -> Result<i32> {
    let config = resolve_config(&args.generation)?;
    let mut front_end = open_front_end(&config, &args.generation)?;
    front_end.upload(&args.input);
    generate_and_report(&mut front_end);
    let summary = front_end.finish()?;
    Ok(if summary.total_failures > 0 { 1 } else { 0 })
}

fn generate_and_report(front_end: &mut FrontEnd<EventNotifier>) {
    let mut frames = 0usize;
    front_end.generate(|image| {
        frames += 1;
        println!("frame {frames}: {}x{}", image.width(), image.height());
    });
    match front_end
        .last_outcome()
        .and_then(|outcome| outcome.output_path.as_deref())
    {
        Some(path) => println!("Saved {}", path.display()),
        None => println!("No image produced."),
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut config = resolve_config(&args.generation)?;
    let mut front_end = open_front_end(&config, &args.generation)?;

    let stdin = io::stdin();
    let mut line = String::new();

    println!("Pixelizer chat started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        match intent.action.as_str() {
            "noop" => continue,
            "help" => println!("Commands: {}", CHAT_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "upload" => match intent.arg("path") {
                Some(path) => {
                    front_end.upload(path);
                    println!("Input set to {path}");
                }
                None => println!("/upload requires a path"),
            },
            "pixelize" => {
                if let Some(path) = intent.arg("path") {
                    front_end.upload(path);
                }
                generate_and_report(&mut front_end);
            }
            "reset" => {
                front_end.reset();
                println!("Cleared input and output.");
            }
            "status" => print_status(&config, &args.generation.backend, &front_end),
            "set_mode" | "set_quality" | "set_size" | "set_stream" => {
                match apply_setting(&mut config, &intent.action, intent.arg(setting_key(&intent.action))) {
                    Ok(message) => {
                        front_end.replace_client(build_client(&config, &args.generation.backend));
                        if let ClientHandle::Unavailable(reason) = front_end.sink().client() {
                            println!("Model not initialized: {reason}");
                        }
                        println!("{message}");
                    }
                    Err(err) => println!("{err:#}"),
                }
            }
            "unknown" => println!(
                "Unknown command: /{}",
                intent.arg("command").unwrap_or_default()
            ),
            other => println!("Unhandled action: {other}"),
        }
    }

    let summary = front_end.finish()?;
    println!(
        "Session finished: {} generation(s), {} frame(s), {} failure(s).",
        summary.total_generations, summary.total_frames, summary.total_failures
    );
    Ok(())
}

fn setting_key(action: &str) -> &'static str {
    match action {
        "set_mode" => "mode",
        "set_quality" => "quality",
        "set_size" => "size",
        _ => "stream",
    }
}

fn apply_setting(config: &mut PixelizerConfig, action: &str, value: Option<&str>) -> Result<String> {
    let Some(value) = value else {
        bail!("/{} requires a value", setting_key(action));
    };
    let message = match action {
        "set_mode" => {
            config.submission = value.parse()?;
            format!("Submission mode set to {}", config.submission)
        }
        "set_quality" => {
            config.quality = value.parse()?;
            format!("Quality set to {}", config.quality)
        }
        "set_size" => {
            config.size = parse_size(value)?;
            format!("Size set to {}", config.size)
        }
        _ => {
            config.stream = parse_flag("stream", value)?;
            format!("Streaming {}", if config.stream { "on" } else { "off" })
        }
    };
    Ok(message)
}

fn print_status(config: &PixelizerConfig, backend: &str, front_end: &FrontEnd<EventNotifier>) {
    let client = match front_end.sink().client() {
        ClientHandle::Ready(_) => "ready".to_string(),
        ClientHandle::Unavailable(reason) => format!("unavailable ({reason})"),
    };
    println!("Backend: {backend} [{client}]");
    println!(
        "Model: {} quality={} size={} mode={} stream={}",
        config.model, config.quality, config.size, config.submission, config.stream
    );
    println!(
        "References: {} x{}",
        config.reference_dir.display(),
        config.reference_count
    );
    println!(
        "Input: {}",
        front_end
            .input()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Output: {}",
        front_end
            .output()
            .map(|image| format!("{}x{}", image.width(), image.height()))
            .unwrap_or_else(|| "-".to_string())
    );
}

fn run_compose(args: ComposeArgs) -> Result<i32> {
    let direction = if args.vertical {
        Direction::Vertical
    } else {
        Direction::Horizontal
    };
    let Some(canvas) = concatenate_paths(&args.images, direction)? else {
        bail!("no images to concatenate");
    };
    write_output(&args.out, canvas.bytes())?;
    println!(
        "Wrote {} ({}x{})",
        args.out.display(),
        canvas.width(),
        canvas.height()
    );
    Ok(0)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
