use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use video_chat::{
    format_transcript, register_api_key, summarize_video, AppConfig, ChatSession, CredentialStore, FileCredentialStore, Message,
    MessageId, MessageRole, SessionStatus, SummarizationService, SummarizerClient, Viewport, API_KEY_SLOT,
};

type InputLines = Lines<BufReader<Stdin>>;

enum ChatExit {
    Back,
    Quit,
}

/// Terminal rendering of a chat session's log
struct TerminalView {
    printed: Vec<MessageId>,
    showed_pending: bool,
}

impl TerminalView {
    fn new() -> Self {
        Self { printed: Vec::new(), showed_pending: false }
    }

    /// Print everything appended since the last pass
    fn render(&mut self, messages: &[Message], status: SessionStatus) {
        for message in messages.iter().skip(self.printed.len()) {
            match message.role {
                MessageRole::User => println!("  you › {}", message.content),
                MessageRole::Assistant => {
                    println!("  🤖  {}", message.content.replace('\n', "\n      "));
                }
            }
            self.printed.push(message.id.clone());
        }

        match status {
            SessionStatus::AwaitingResponse if !self.showed_pending => {
                println!("  … thinking");
                self.showed_pending = true;
            }
            SessionStatus::Idle => self.showed_pending = false,
            _ => {}
        }
    }
}

impl Viewport for TerminalView {
    fn is_rendered(&self, id: &MessageId) -> bool {
        self.printed.contains(id)
    }

    fn align_to_bottom(&mut self, id: &MessageId) {
        // The terminal already keeps the newest line at the bottom; just flush it out
        if let Err(e) = io::stdout().flush() {
            tracing::debug!("Failed to flush stdout: {}", e);
        }
        tracing::trace!("Viewport anchored at {}", id);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env()?;
    let client = SummarizerClient::new(&config)?;
    match client.health().await {
        Ok(true) => tracing::info!("Summarizer backend at {} is healthy", client.base_url()),
        Ok(false) => tracing::warn!("Summarizer backend at {} reports unhealthy", client.base_url()),
        Err(e) => tracing::warn!("Summarizer backend at {} unreachable: {}", client.base_url(), e),
    }

    let service: Arc<dyn SummarizationService> = Arc::new(client);
    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::open(&config.credentials_path)?);

    println!("🎬 YouTube Video Summarizer");
    println!("==========================================");
    if store.get(API_KEY_SLOT).is_none() {
        println!("No OpenAI API key saved yet. Type /key to add one.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt("\nYouTube URL (/key, /quit): ")?;
        let Some(line) = lines.next_line().await? else { break };
        let input = line.trim();

        match input {
            "/quit" => break,
            "/key" => save_api_key(service.as_ref(), store.as_ref()).await?,
            _ => {
                println!("⏳ Processing...");
                let video = match summarize_video(Arc::clone(&service), Arc::clone(&store), input).await {
                    Ok(video) => video,
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        continue;
                    }
                };

                let summary = &video.summary;
                println!();
                println!(
                    "⏱  {}   #  {} segments   Video ID: {}",
                    summary.total_duration, summary.snippet_count, summary.video_id
                );
                println!("------------------------------------------");
                println!("Summary\n\n{}", summary.summary);

                if let Some(chat) = video.chat {
                    if let ChatExit::Quit = chat_loop(&chat, service.as_ref(), store.as_ref(), &mut lines).await? {
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn chat_loop(
    chat: &ChatSession,
    service: &dyn SummarizationService,
    store: &dyn CredentialStore,
    lines: &mut InputLines,
) -> Result<ChatExit, Box<dyn std::error::Error>> {
    println!();
    println!("💬 Ask questions about this video");
    println!("Ask me anything about this video!");
    println!("Try: \"What are the main points?\" or \"Can you explain the part about...?\"");
    println!("(/transcript to show the transcript, /back for a new video, /key to change the API key, /quit to exit)");

    let mut view = TerminalView::new();
    let mut changes = chat.subscribe();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(ChatExit::Quit) };
                match line.trim() {
                    "/quit" => return Ok(ChatExit::Quit),
                    "/back" => return Ok(ChatExit::Back),
                    "/key" => save_api_key(service, store).await?,
                    "/transcript" => {
                        for line in format_transcript(&chat.context().transcript_data) {
                            println!("  {}", line);
                        }
                    }
                    question => {
                        if let Err(rejection) = chat.spawn_question(question) {
                            println!("  ⚠️  {}", rejection);
                        }
                    }
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    return Ok(ChatExit::Back);
                }
                view.render(&chat.messages(), chat.status());
                chat.after_render(&mut view);
            }
        }
    }
}

async fn save_api_key(service: &dyn SummarizationService, store: &dyn CredentialStore) -> Result<(), Box<dyn std::error::Error>> {
    prompt("🔑 OpenAI API key: ")?;
    let api_key = tokio::task::spawn_blocking(rpassword::read_password).await??;

    match register_api_key(service, store, &api_key).await {
        Ok(()) => println!("✅ API key saved successfully"),
        Err(e) => eprintln!("❌ {}", e),
    }
    Ok(())
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{}", text);
    io::stdout().flush()
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "info,video_chat=debug,reqwest=info,hyper=info".to_string()
        } else {
            "warn,video_chat=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::debug!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Log level: {}", log_level);
    Ok(())
}
