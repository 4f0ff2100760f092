use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use patch_and_transform::config::{
    apply_patches, load_document, load_from_path, ApplicationError, Composition, Documents,
    PatchResult,
};
use patch_and_transform::Unstructured;
use serde_json::{json, Value};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pnt")]
#[command(about = "Apply patch-and-transform compositions to resource documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a composition against observed documents
    Render {
        /// Composition file (.toml, .json, .yaml)
        #[arg(short, long)]
        composition: PathBuf,

        /// Observed composite resource
        #[arg(long)]
        observed_composite: PathBuf,

        /// Existing desired composite resource (defaults to empty)
        #[arg(long)]
        desired_composite: Option<PathBuf>,

        /// Map of template name to observed composed resource
        #[arg(long)]
        observed_resources: Option<PathBuf>,

        /// Environment document (defaults to empty)
        #[arg(short, long)]
        environment: Option<PathBuf>,

        /// Show a diff of every changed document
        #[arg(short, long)]
        diff: bool,
    },

    /// Load and validate a composition without applying it
    Validate {
        /// Composition file (.toml, .json, .yaml)
        #[arg(short, long)]
        composition: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            composition,
            observed_composite,
            desired_composite,
            observed_resources,
            environment,
            diff,
        } => cmd_render(RenderArgs {
            composition,
            observed_composite,
            desired_composite,
            observed_resources,
            environment,
            diff,
        }),

        Commands::Validate { composition } => cmd_validate(&composition),
    }
}

/// Installs the log subscriber. `PNT_LOG` takes `EnvFilter` directives,
/// e.g. `PNT_LOG=patch_and_transform=debug`.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("PNT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("patch_and_transform=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

struct RenderArgs {
    composition: PathBuf,
    observed_composite: PathBuf,
    desired_composite: Option<PathBuf>,
    observed_resources: Option<PathBuf>,
    environment: Option<PathBuf>,
    diff: bool,
}

fn load_unstructured(path: &Path) -> Result<Unstructured> {
    let value = load_document(path)?;
    Unstructured::from_value(value)
        .with_context(|| format!("{} must contain a mapping", path.display()))
}

fn load_optional(path: Option<&Path>) -> Result<Unstructured> {
    match path {
        Some(path) => load_unstructured(path),
        None => Ok(Unstructured::new()),
    }
}

fn load_resources(path: Option<&Path>) -> Result<BTreeMap<String, Unstructured>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let value = load_document(path)?;
    serde_json::from_value(value).with_context(|| {
        format!(
            "{} must map template names to resource documents",
            path.display()
        )
    })
}

fn load_composition(path: &Path) -> Result<Composition> {
    load_from_path(path).with_context(|| format!("cannot load composition {}", path.display()))
}

fn display_diff(label: &str, original: &Value, modified: &Value) -> Result<()> {
    let original = serde_json::to_string_pretty(original)? + "\n";
    let modified = serde_json::to_string_pretty(modified)? + "\n";
    if original == modified {
        return Ok(());
    }

    eprintln!("\n{}", format!("--- {label} (before)").dimmed());
    eprintln!("{}", format!("+++ {label} (after)").dimmed());

    let diff = TextDiff::from_lines(&original, &modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        eprint!("{}", sign);
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let composition = load_composition(&args.composition)?;

    let mut docs = Documents {
        observed_composite: load_unstructured(&args.observed_composite)?,
        desired_composite: load_optional(args.desired_composite.as_deref())?,
        observed_resources: load_resources(args.observed_resources.as_deref())?,
        desired_resources: BTreeMap::new(),
        environment: load_optional(args.environment.as_deref())?,
    };
    let before = docs.clone();

    let results = apply_patches(&composition, &mut docs)?;

    let mut total_applied = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for (patch_id, result) in &results {
        match result {
            Ok(PatchResult::Applied { route }) => {
                eprintln!("{} {}: Applied ({})", "✓".green(), patch_id, route);
                total_applied += 1;
            }
            Ok(PatchResult::NotApplicable) => {
                eprintln!("{} {}: Not applicable", "⊘".cyan(), patch_id);
                total_skipped += 1;
            }
            Ok(skipped) => {
                eprintln!("{} {}: {}", "⊘".cyan(), patch_id, skipped);
                total_skipped += 1;
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), patch_id, e);
                if let ApplicationError::Render { .. } = e {
                    eprintln!("  Possible causes:");
                    eprintln!("    - The template base changed apiVersion or kind");
                    eprintln!("    - The desired resource belongs to another template");
                }
                total_failed += 1;
            }
        }
    }

    if args.diff {
        display_diff(
            "desired composite",
            &before.desired_composite.to_value(),
            &docs.desired_composite.to_value(),
        )?;
        display_diff(
            "environment",
            &before.environment.to_value(),
            &docs.environment.to_value(),
        )?;
        for (name, resource) in &docs.desired_resources {
            let original = before
                .desired_resources
                .get(name)
                .map(Unstructured::to_value)
                .unwrap_or_else(|| json!({}));
            display_diff(&format!("resources[{name}]"), &original, &resource.to_value())?;
        }
    }

    let output = json!({
        "desiredComposite": docs.desired_composite,
        "desiredResources": docs.desired_resources,
        "environment": docs.environment,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    eprintln!();
    eprintln!("{}", "Summary:".bold());
    eprintln!("  {} applied", format!("{}", total_applied).green());
    eprintln!("  {} skipped", format!("{}", total_skipped).cyan());
    eprintln!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        bail!("{total_failed} patch(es) failed");
    }

    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let composition = load_composition(path)?;
    let patches: usize = composition
        .resources
        .iter()
        .map(|template| template.patches.len())
        .sum::<usize>()
        + composition.environment_patches().len();

    patch_and_transform::composed_templates(&composition.patch_sets, &composition.resources)
        .context("cannot resolve patch sets")?;

    println!(
        "{} {}: {} patch set(s), {} resource(s), {} patch(es)",
        "✓".green(),
        path.display(),
        composition.patch_sets.len(),
        composition.resources.len(),
        patches
    );
    Ok(())
}
