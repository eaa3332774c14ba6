use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crm_voice::llm::ToolDefinition;
use crm_voice::voice::{ChannelSink, SinkEvent, WavSink};
use crm_voice::{
    Agent, AudioSink, Config, CrmStore, CrmTool, Error, HttpSpeech, OpenRouterClient,
    SpeechEmitter, ToolExecutor, VoiceSession, db, shutdown, tools,
};

/// CRM Voice - Voice assistant for a small contact database
#[derive(Parser)]
#[command(name = "crm-voice", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML config file (defaults to the platform config dir)
    #[arg(long, env = "CRM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Talk to the assistant from stdin, one utterance per line
    Chat {
        /// Write spoken replies as WAV files into this directory
        #[arg(long)]
        audio_dir: Option<PathBuf>,
        /// Skip the spoken greeting
        #[arg(long)]
        no_greeting: bool,
    },
    /// Synthesize text through the audio pipeline only
    Say {
        text: String,
        #[arg(long)]
        audio_dir: PathBuf,
    },
    /// Look up contacts by partial name
    Search { name: String },
    /// List tasks for a contact
    Tasks { name: String },
    /// Print the tool catalog as JSON
    Tools,
    /// Create the database and schema
    InitDb,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,crm_voice=info",
        1 => "info,crm_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Chat {
            audio_dir,
            no_greeting,
        } => chat(&config, audio_dir.as_deref(), !no_greeting).await,
        Command::Say { text, audio_dir } => say(&config, &text, &audio_dir).await,
        Command::Search { name } => {
            run_tool(&config, CrmTool::SearchContact, serde_json::json!({ "name": name })).await
        }
        Command::Tasks { name } => {
            run_tool(
                &config,
                CrmTool::CreateOrListTasks,
                serde_json::json!({ "contact_name": name }),
            )
            .await
        }
        Command::Tools => {
            let wire: Vec<_> = tools::catalog().iter().map(ToolDefinition::to_wire).collect();
            println!("{}", serde_json::to_string_pretty(&wire)?);
            Ok(())
        }
        Command::InitDb => {
            db::init(&config.db_path)?;
            println!("Database ready at {}", config.db_path.display());
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<CrmStore> {
    let pool = db::init(&config.db_path)?;
    tracing::debug!(path = %config.db_path.display(), "database opened");
    Ok(CrmStore::new(pool))
}

async fn run_tool(config: &Config, tool: CrmTool, args: serde_json::Value) -> anyhow::Result<()> {
    let executor = ToolExecutor::new(open_store(config)?);
    let output = executor.execute(tool.name(), &args.to_string()).await?;
    println!("{output}");
    Ok(())
}

fn emitter(config: &Config) -> anyhow::Result<SpeechEmitter> {
    let speech = HttpSpeech::new(config.speech_config())?;
    Ok(SpeechEmitter::new(Arc::new(speech), config.voice.frame_delay))
}

/// WAV files when a directory is given, otherwise frames are drained and dropped
fn sink_for(audio_dir: Option<&Path>) -> anyhow::Result<Box<dyn AudioSink>> {
    if let Some(dir) = audio_dir {
        return Ok(Box::new(WavSink::new(dir)?));
    }

    let (sink, mut rx) = ChannelSink::new(64);
    tokio::spawn(async move {
        let mut bytes = 0usize;
        while let Some(event) = rx.recv().await {
            match event {
                SinkEvent::Frame(frame) => bytes += frame.len(),
                SinkEvent::Ended => {
                    tracing::debug!(bytes, "discarded segment audio");
                    bytes = 0;
                }
                SinkEvent::Initialized(_) | SinkEvent::Flushed => {}
            }
        }
    });
    Ok(Box::new(sink))
}

async fn say(config: &Config, text: &str, audio_dir: &Path) -> anyhow::Result<()> {
    let emitter = emitter(config)?;
    let mut sink = WavSink::new(audio_dir)?;

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });

    let report = emitter.emit(text, &mut sink, &shutdown).await?;
    for path in sink.written() {
        println!("{}", path.display());
    }
    tracing::info!(
        frames = report.frames,
        samples = report.samples,
        cancelled = report.cancelled,
        "speech written"
    );
    Ok(())
}

async fn chat(config: &Config, audio_dir: Option<&Path>, greet: bool) -> anyhow::Result<()> {
    let model = OpenRouterClient::new(config.openrouter_config())?;
    let executor = ToolExecutor::new(open_store(config)?);
    let agent = Agent::new(Arc::new(model), executor, config.agent_config());

    let (mut session, handle) = VoiceSession::new(
        agent,
        emitter(config)?,
        sink_for(audio_dir)?,
        config.voice.segment_delay,
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.end();
        }
    });

    tracing::info!(model = %config.llm.model, "starting chat session");

    if greet {
        let spoken = session.greet().await?;
        println!("assistant> {}", spoken.reply.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }

        match session.handle_utterance(utterance).await {
            Ok(spoken) => {
                println!("assistant> {}", spoken.reply.text);
                if spoken.failed_segments > 0 {
                    tracing::warn!(failed = spoken.failed_segments, "some speech segments failed");
                }
                if spoken.cancelled {
                    break;
                }
            }
            Err(Error::Cancelled) => break,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(turns = session.agent().history().len(), "chat session ended");
    Ok(())
}
