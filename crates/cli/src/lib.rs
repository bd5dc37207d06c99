use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use command_bridge::{
    CommandError, InvokeBridge, RecordingTransport, CHECK_ACTIVE_USER, INSERT_NEW_BOOK,
};
use doc_model::{AppConfig, BoundaryPolicy, Document, DocumentSource, TargetBox, ViewerSettings};
use library_core::{
    process_guard, Notification, OnboardingForm, SelectedFile, StartupRoute, Toaster, UploadFlow,
    UploadState,
};
use pdf_engine::{default_engine, PageRasterizer, PdfEngine, PreviewGenerator};
use serde::Serialize;
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use viewer_core::{EngineRenderer, NavIntent, RenderOutcome, ViewerSession};

#[derive(Debug, Parser)]
#[command(name = "studystudio-cli")]
#[command(about = "Study Studio CLI")]
pub struct Cli {
    /// Directory holding config.json (defaults to the platform data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Rasterize one page to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate the first-page upload preview.
    Preview {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Write the JPEG here instead of printing a data URL.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Page through a document and report every step as a JSON line.
    Read {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_delimiter = ',')]
        steps: Vec<Step>,
        #[arg(long)]
        start: Option<u32>,
        #[arg(long, value_enum)]
        policy: Option<Policy>,
    },
    /// Run the add-book flow against a dry-run backend.
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        author: Option<String>,
        /// Make the dry-run backend reject the insert with this message.
        #[arg(long, value_name = "MESSAGE")]
        reject: Option<String>,
    },
    /// Resolve the startup route against a dry-run backend.
    Startup {
        /// Pretend the backend has an active user.
        #[arg(long)]
        active_user: bool,
    },
    /// Submit the onboarding form against a dry-run backend.
    Onboard {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long = "day")]
        days: Vec<String>,
        #[arg(long = "interest")]
        interests: Vec<String>,
    },
    /// Print the effective configuration.
    Config,
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Step {
    Next,
    Prev,
}

impl From<Step> for NavIntent {
    fn from(step: Step) -> Self {
        match step {
            Step::Next => NavIntent::Next,
            Step::Prev => NavIntent::Prev,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Clamp,
    PassThrough,
}

impl From<Policy> for BoundaryPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Clamp => BoundaryPolicy::Clamp,
            Policy::PassThrough => BoundaryPolicy::PassThrough,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct StepOutput {
    step: String,
    outcome: &'static str,
    page: Option<u32>,
    error: Option<String>,
    visible_page: Option<u32>,
    label: String,
    prev_enabled: bool,
    next_enabled: bool,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    state: UploadState,
    open: bool,
    toasts: Vec<Notification>,
}

#[derive(Debug, Serialize)]
struct OnboardOutput {
    route: Option<StartupRoute>,
    toasts: Vec<Notification>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let storage = match &cli.data_dir {
        Some(dir) => Storage::with_root(dir),
        None => Storage::from_default_project()?,
    };
    let config = storage.load_config().context("failed to load config")?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.log_level));
    debug!(root = %storage.root().display(), "loaded configuration");

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { file, page, width, height, output } => {
            let target = TargetBox::new(
                width.unwrap_or(config.viewer.target_width) as f32,
                height.unwrap_or(config.viewer.target_height) as f32,
            );
            run_render(&file, page, target, output.as_deref())
        }
        Commands::Preview { file, output } => run_preview(&file, &config, output.as_deref()),
        Commands::Read { file, steps, start, policy } => {
            let mut settings = config.viewer;
            if let Some(policy) = policy {
                settings.boundary_policy = policy.into();
            }
            block_on(run_read(&file, &steps, start, settings))
        }
        Commands::Add { file, title, author, reject } => {
            block_on(run_add(&file, title, author, reject, &config))
        }
        Commands::Startup { active_user } => block_on(run_startup(active_user)),
        Commands::Onboard { name, email, days, interests } => {
            let form = OnboardingForm { name, email, available_days: days, interests };
            block_on(run_onboard(form))
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second call in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(future)
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(DocumentSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let first_page_size_pt = if page_count > 0 {
        let size = engine.page_size(handle, 0)?;
        Some(PageSizeOutput { width: size.width_pt, height: size.height_pt })
    } else {
        None
    };

    let payload = InfoOutput { path: file.display().to_string(), page_count, first_page_size_pt };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_render(file: &Path, page: u32, target: TargetBox, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    let document = Document::from_path(file);
    let engine = default_engine();
    debug!(engine = engine.name(), "rendering page");
    let mut rasterizer = PageRasterizer::new(engine);
    let surface = rasterizer.render(&document, page, target).context("failed to render page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_output(file, page, "png"));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    surface
        .image
        .save_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    rasterizer.close(&document.id);

    Ok(())
}

fn run_preview(file: &Path, config: &AppConfig, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let preview = PreviewGenerator::new(config.preview)
        .preview(&bytes)
        .context("failed to generate PDF preview")?;

    match output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output, &preview.jpeg)
                .with_context(|| format!("failed to write preview to {}", output.display()))?;
            println!("{}", output.display());
        }
        None => println!("{}", preview.data_url()),
    }

    Ok(())
}

async fn run_read(
    file: &Path,
    steps: &[Step],
    start: Option<u32>,
    settings: ViewerSettings,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    let session = ViewerSession::open(
        EngineRenderer::new(default_engine()),
        Document::from_path(file),
        &settings,
    )
    .await
    .context("failed to open PDF")?;

    let outcome = session.refresh().await;
    print_step(&session, "open", outcome)?;

    if let Some(start) = start {
        let outcome = session.go_to(start).await;
        print_step(&session, "start", outcome)?;
    }

    for step in steps {
        let outcome = session.apply((*step).into()).await;
        let name = match step {
            Step::Next => "next",
            Step::Prev => "prev",
        };
        print_step(&session, name, outcome)?;
    }

    Ok(())
}

fn print_step<R: viewer_core::PageRenderer>(
    session: &ViewerSession<R>,
    step: &str,
    outcome: RenderOutcome,
) -> Result<()> {
    let (outcome, page, error) = match outcome {
        RenderOutcome::Applied { page } => ("applied", Some(page), None),
        RenderOutcome::Stale { page } => ("stale", Some(page), None),
        RenderOutcome::Unchanged => ("unchanged", None, None),
        RenderOutcome::Failed { page, error } => ("failed", Some(page), Some(error.to_string())),
    };
    let toolbar = session.toolbar();

    let line = StepOutput {
        step: step.to_owned(),
        outcome,
        page,
        error,
        visible_page: session.visible_page(),
        label: toolbar.label,
        prev_enabled: toolbar.prev_enabled,
        next_enabled: toolbar.next_enabled,
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

async fn run_add(
    file: &Path,
    title: String,
    author: Option<String>,
    reject: Option<String>,
    config: &AppConfig,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    let selected = SelectedFile::read(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let transport = RecordingTransport::new();
    if let Some(message) = reject {
        transport.respond(INSERT_NEW_BOOK, Err(CommandError::Rejected(message)));
    }
    let bridge = Arc::new(InvokeBridge::new(transport));
    let toaster = Toaster::new();

    let mut flow = UploadFlow::new(
        bridge.clone(),
        toaster.clone(),
        config.upload,
        PreviewGenerator::new(config.preview),
    );
    flow.set_title(title);
    if let Some(author) = author {
        flow.set_author(author);
    }
    if !flow.select_files(vec![selected]).await {
        anyhow::bail!("not a PDF file: {}", file.display());
    }

    let result = flow.submit().await;

    print_invocations(bridge.transport())?;
    let summary =
        UploadOutput { state: flow.state(), open: flow.is_open(), toasts: toaster.drain() };
    println!("{}", serde_json::to_string(&summary)?);

    result.context("failed to add book")
}

async fn run_startup(active_user: bool) -> Result<()> {
    let transport = RecordingTransport::new();
    transport.respond(CHECK_ACTIVE_USER, Ok(Value::Bool(active_user)));
    let bridge = InvokeBridge::new(transport);

    let route = process_guard().resolve(&bridge).await;

    print_invocations(bridge.transport())?;
    println!("{}", serde_json::json!({ "route": route }));
    Ok(())
}

async fn run_onboard(form: OnboardingForm) -> Result<()> {
    let bridge = InvokeBridge::new(RecordingTransport::new());
    let toaster = Toaster::new();

    let result = form.submit(&bridge, &toaster).await;

    print_invocations(bridge.transport())?;
    let summary = OnboardOutput { route: result.as_ref().ok().copied(), toasts: toaster.drain() };
    println!("{}", serde_json::to_string(&summary)?);

    result.map(|_| ()).context("failed to create account")
}

fn print_invocations(transport: &RecordingTransport) -> Result<()> {
    for invocation in transport.invocations() {
        println!("{}", serde_json::to_string(&invocation)?);
    }
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_output(file: &Path, page: u32, extension: &str) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.{extension}"))
}
