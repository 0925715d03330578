//! # Analyze Subcommand
//!
//! Runs one compliance analysis. Input comes either from flags
//! (`--category`, `--ingredients`/`--ingredient`, `--allergen-declaration`,
//! `--panel`) or from a JSON file produced by the upstream extraction step
//! (`--input`), whose shape is [`AnalysisRequest`].

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use labelcheck_compliance::{
    is_print_ready, AnalysisRequest, ComplianceEngine, ComplianceReport, EngineConfig,
};
use labelcheck_core::{PanelType, ProductCategory};

/// Report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for `labelcheck analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory holding gras/ndi/odi/allergens reference files.
    #[arg(long, value_name = "DIR")]
    pub reference_dir: Option<PathBuf>,

    /// JSON request file (ingredients, category, allergen_declaration_present,
    /// panel_type, label_issues).
    #[arg(long, value_name = "FILE", conflicts_with_all = ["category", "ingredients", "ingredient"])]
    pub input: Option<PathBuf>,

    /// Product category (food, beverage, alcoholic-beverage, supplement).
    #[arg(long, required_unless_present = "input")]
    pub category: Option<ProductCategory>,

    /// Comma-separated ingredient list as printed on the label.
    #[arg(long)]
    pub ingredients: Option<String>,

    /// A single ingredient. Repeatable.
    #[arg(long)]
    pub ingredient: Vec<String>,

    /// The label carries an allergen declaration ("Contains: ...").
    #[arg(long)]
    pub allergen_declaration: bool,

    /// Nutrition panel detected on the label (nutrition-facts, supplement-facts).
    #[arg(long)]
    pub panel: Option<PanelType>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the analyze subcommand.
///
/// Returns 0 when the report is print-ready and 2 when it is not.
pub fn run_analyze(args: &AnalyzeArgs, config: &EngineConfig) -> Result<u8> {
    let request = build_request(args)?;
    if request.ingredients.is_empty() {
        tracing::warn!("no ingredients supplied; only label checks will run");
    }

    let dir = crate::reference_dir(args.reference_dir.as_deref());
    let cache = crate::open_cache(&dir, config.cache.clone())?;
    let engine = ComplianceEngine::new(cache, config.matcher.clone());
    let report = engine.analyze(&request).context("compliance analysis failed")?;

    let rendered = match args.format {
        OutputFormat::Text => render_text(&report).context("failed to render report")?,
        OutputFormat::Json => report.to_json_pretty().context("failed to serialize report")?,
    };
    emit(&rendered, args.output.as_deref())?;

    Ok(if is_print_ready(&report) {
        0
    } else {
        crate::EXIT_NOT_PRINT_READY
    })
}

fn build_request(args: &AnalyzeArgs) -> Result<AnalysisRequest> {
    if let Some(path) = &args.input {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut request = AnalysisRequest::from_json(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        request.allergen_declaration_present |= args.allergen_declaration;
        if args.panel.is_some() {
            request.panel_type = args.panel;
        }
        return Ok(request);
    }

    let Some(category) = args.category else {
        bail!("--category is required without --input");
    };
    let mut ingredients = args
        .ingredients
        .as_deref()
        .map(split_ingredient_list)
        .unwrap_or_default();
    ingredients.extend(args.ingredient.iter().cloned());

    let mut request = AnalysisRequest::new(ingredients, category, args.allergen_declaration);
    request.panel_type = args.panel;
    Ok(request)
}

/// Split a printed ingredient list on top-level commas and semicolons.
///
/// Separators inside parentheses or brackets belong to a sub-ingredient
/// list and do not split: `"Chocolate (sugar, cocoa butter), Salt"` yields
/// two ingredients.
pub fn split_ingredient_list(list: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in list.chars() {
        match ch {
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' | ';' if depth == 0 => {
                push_trimmed(&mut out, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_trimmed(&mut out, &current);
    out
}

fn push_trimmed(out: &mut Vec<String>, item: &str) {
    let item = item.trim().trim_end_matches('.').trim();
    if !item.is_empty() {
        out.push(item.to_string());
    }
}

/// Human-readable report.
pub fn render_text(report: &ComplianceReport) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Report {} ({})", report.report_id(), report.product_category())?;
    writeln!(
        out,
        "Overall: {}    Print-ready: {}",
        report.overall_status(),
        if report.is_print_ready() { "yes" } else { "no" }
    )?;

    for section in report.sections() {
        writeln!(out)?;
        writeln!(
            out,
            "{}: {} ({} compliant, {} to verify, {} violations)",
            section.section.title(),
            section.status,
            section.summary.compliant,
            section.summary.requires_verification,
            section.summary.violations
        )?;
        for snapshot in &section.snapshots {
            writeln!(
                out,
                "  against {} v{} ({} entries, {})",
                snapshot.dataset, snapshot.version, snapshot.entries, snapshot.digest
            )?;
        }
        for finding in &section.findings {
            write!(out, "  {:<22} {}", finding.status.as_str(), finding.subject)?;
            if let (Some(name), Some(kind)) = (&finding.matched_name, finding.match_type) {
                write!(out, " -> {name} [{kind:?}]")?;
            }
            writeln!(out)?;
            writeln!(out, "  {:<22} {}", "", finding.rationale)?;
        }
    }

    writeln!(out)?;
    if report.recommendations().is_empty() {
        writeln!(out, "No recommendations.")?;
    } else {
        writeln!(out, "Recommendations:")?;
        for (i, rec) in report.recommendations().iter().enumerate() {
            write!(out, "  {}. [{}] {}", i + 1, rec.priority, rec.text)?;
            if let Some(reference) = &rec.regulation_reference {
                write!(out, " ({reference})")?;
            }
            writeln!(out)?;
        }
    }
    Ok(out)
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}
