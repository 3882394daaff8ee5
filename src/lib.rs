//! Cocolift: balanced COCO subsets for a remote training service.
//!
//! Cocolift reads a COCO instances file, picks the categories you ask for,
//! samples a class-balanced subset of images within an image budget, and
//! packs the result into upload batches that respect the service's per-batch
//! limits (64 images, fewer than 20 distinct labels).
//!
//! # Modules
//!
//! - [`corpus`]: COCO parsing and the in-memory annotation store
//! - [`select`]: Category selection and the per-label budget floor
//! - [`sample`]: Round-robin balanced sampling
//! - [`training_set`]: Joining sampled images to their metadata
//! - [`upload`]: Label resolution, batch packing, and submission
//! - [`error`]: Error types for cocolift operations

pub mod corpus;
pub mod error;
pub mod sample;
pub mod select;
pub mod training_set;
pub mod upload;

use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;

use corpus::AnnotationStore;
use sample::SampleReport;
use select::CategorySelection;
use training_set::TrainingImage;
use upload::http::CustomVisionClient;
use upload::{
    BatchLimits, LabelMap, LabelRegistry, OfflineRegistry, PackOutcome, PackReport,
    UploadMode, UploadSummary,
};

pub use error::CocoliftError;

/// Most images the service accepts in one project.
pub const MAX_SERVICE_IMAGES: usize = 5000;

/// The cocolift CLI application.
#[derive(Parser)]
#[command(name = "cocolift")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Sample and pack offline, then print the plan.
    Plan(PlanArgs),
    /// Sample, pack and upload to a remote project.
    Upload(UploadArgs),
}

/// Options shared by every subcommand.
#[derive(clap::Args)]
struct SelectionArgs {
    /// COCO instances file: a local path or an http(s) URL.
    input: String,

    /// Comma-separated category or supercategory names. Empty selects all.
    #[arg(short = 'c', long, value_delimiter = ',', default_value = "")]
    categories: Vec<String>,

    /// Image budget (0 = no cap).
    #[arg(short = 'i', long, default_value_t = 0)]
    images: usize,

    /// Upload regions for object detection instead of image-level labels.
    #[arg(long)]
    detection: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the plan subcommand.
#[derive(clap::Args)]
struct PlanArgs {
    #[command(flatten)]
    selection: SelectionArgs,
}

/// Arguments for the upload subcommand.
#[derive(clap::Args)]
struct UploadArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Training service endpoint, e.g. https://westus.api.cognitive.microsoft.com
    #[arg(long, env = "COCOLIFT_ENDPOINT")]
    endpoint: String,

    /// Training key sent with every request.
    #[arg(long, env = "COCOLIFT_TRAINING_KEY", hide_env_values = true)]
    training_key: String,

    /// Project name. Created if it does not exist.
    #[arg(long, env = "COCOLIFT_PROJECT")]
    project: String,
}

impl SelectionArgs {
    fn mode(&self) -> UploadMode {
        if self.detection {
            UploadMode::Detection
        } else {
            UploadMode::Classification
        }
    }

    fn budget(&self) -> usize {
        if self.images > MAX_SERVICE_IMAGES {
            warn!(
                "Image budget {} exceeds the service limit, using {}",
                self.images, MAX_SERVICE_IMAGES
            );
            MAX_SERVICE_IMAGES
        } else {
            self.images
        }
    }

    fn check_output(&self) -> Result<(), CocoliftError> {
        match self.output.as_str() {
            "text" | "json" => Ok(()),
            other => Err(CocoliftError::UnsupportedFormat(format!(
                "output '{other}' (supported: text, json)"
            ))),
        }
    }
}

/// Everything computed before the first upload request.
#[derive(Clone, Debug)]
pub struct UploadPlan {
    pub selection: CategorySelection,
    pub sample: SampleReport,
    pub training_set: Vec<TrainingImage>,
    pub labels: LabelMap,
    pub packed: PackOutcome,
    pub report: PackReport,
}

/// A sampled and joined training set that has not touched any registry yet.
#[derive(Clone, Debug)]
pub struct PreparedSet {
    pub selection: CategorySelection,
    pub sample: SampleReport,
    pub training_set: Vec<TrainingImage>,
}

/// Select, check the budget, sample and join a corpus.
///
/// Purely local. Every input error a run can hit before talking to the
/// service surfaces here.
///
/// # Errors
/// Category, budget and integrity errors from the individual stages.
pub fn prepare_training_set(
    store: &AnnotationStore,
    categories: &[String],
    budget: usize,
) -> Result<PreparedSet, CocoliftError> {
    let selection = select::select_categories(store.categories(), categories)?;
    select::check_budget(budget, store.images().len(), &selection)?;

    let outcome = sample::sample_images(store, &selection, budget);
    for empty in outcome.report.empty_categories() {
        warn!("Category '{}' has no images in the sample", empty.name);
    }
    let training_set = training_set::build_training_set(store, outcome.images)?;

    Ok(PreparedSet {
        selection,
        sample: outcome.report,
        training_set,
    })
}

/// Resolve labels for a prepared set and pack it into batches.
///
/// A live registry gets its missing tags created here.
///
/// # Errors
/// [`CocoliftError::LabelRegistry`] when the registry cannot list or create a
/// label.
pub fn pack_training_set<R: LabelRegistry + ?Sized>(
    prepared: PreparedSet,
    mode: UploadMode,
    registry: &mut R,
) -> Result<UploadPlan, CocoliftError> {
    let PreparedSet {
        selection,
        sample,
        training_set,
    } = prepared;

    let labels = upload::resolve_labels(registry, &selection, &training_set)?;
    let limits = BatchLimits::default();
    let packed = upload::pack_batches(&training_set, &labels, mode, limits);
    let report = PackReport::new(mode, labels.len(), limits, &packed);

    Ok(UploadPlan {
        selection,
        sample,
        training_set,
        labels,
        packed,
        report,
    })
}

/// Select, sample, join and pack a corpus.
///
/// Shorthand for [`prepare_training_set`] followed by [`pack_training_set`].
///
/// # Errors
/// Category, budget, integrity and registry errors from the individual
/// stages.
pub fn plan_upload<R: LabelRegistry + ?Sized>(
    store: &AnnotationStore,
    categories: &[String],
    budget: usize,
    mode: UploadMode,
    registry: &mut R,
) -> Result<UploadPlan, CocoliftError> {
    let prepared = prepare_training_set(store, categories, budget)?;
    pack_training_set(prepared, mode, registry)
}

/// JSON shape of `--output json`.
#[derive(Serialize)]
struct RunReport<'a> {
    sample: &'a SampleReport,
    pack: &'a PackReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload: Option<&'a UploadSummary>,
}

fn print_report(
    output: &str,
    plan: &UploadPlan,
    upload: Option<&UploadSummary>,
) -> Result<(), CocoliftError> {
    if output == "json" {
        let report = RunReport {
            sample: &plan.sample,
            pack: &plan.report,
            upload,
        };
        let json = serde_json::to_string_pretty(&report).map_err(|source| {
            CocoliftError::Io(std::io::Error::other(source))
        })?;
        println!("{json}");
    } else {
        print!("{}", plan.sample);
        print!("{}", plan.report);
        if let Some(summary) = upload {
            print!("{summary}");
        }
    }
    Ok(())
}

/// Run the cocolift CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CocoliftError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan(args) => run_plan(args),
        Commands::Upload(args) => run_upload(args),
    }
}

/// Execute the plan subcommand.
fn run_plan(args: PlanArgs) -> Result<(), CocoliftError> {
    let args = args.selection;
    args.check_output()?;

    let store = corpus::io_coco_json::read_coco_json(&args.input)?;
    let mut registry = OfflineRegistry::new();
    let plan = plan_upload(
        &store,
        &args.categories,
        args.budget(),
        args.mode(),
        &mut registry,
    )?;

    print_report(&args.output, &plan, None)
}

/// Execute the upload subcommand.
fn run_upload(args: UploadArgs) -> Result<(), CocoliftError> {
    args.selection.check_output()?;
    let mode = args.selection.mode();

    // Fail on a bad endpoint before downloading a large annotation file.
    let mut client = CustomVisionClient::new(&args.endpoint, &args.training_key)?;
    let store = corpus::io_coco_json::read_coco_json(&args.selection.input)?;

    // No project is created for a selection that cannot be uploaded.
    let prepared = prepare_training_set(
        &store,
        &args.selection.categories,
        args.selection.budget(),
    )?;

    client.ensure_project(&args.project, mode)?;
    let plan = pack_training_set(prepared, mode, &mut client)?;

    info!(
        "Uploading {} images to project '{}'",
        plan.packed.entry_count(),
        args.project
    );
    let summary = upload::upload_batches(&mut client, &plan.packed.batches)?;

    print_report(&args.selection.output, &plan, Some(&summary))
}
