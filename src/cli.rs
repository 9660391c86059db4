//! Minimal CLI: template → (compile | check)
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use cdl::{compile, CdlError, CompiledTemplate, Template};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile configuration templates and check JSON/YAML documents against them
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a template and print its rules
    Compile(CompileOut),
    /// validate documents against a template
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct TemplateSettings {
    /// template file (.json, .yaml or .yml)
    #[arg(long, short)]
    template: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /services/0)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    template_settings: TemplateSettings,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    template_settings: TemplateSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// only print failures
    #[arg(long, short)]
    quiet: bool,
}

/// One document pulled out of an input file.
#[derive(Debug)]
struct Document {
    label: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TemplateSettings {
    fn load(&self) -> Result<CompiledTemplate> {
        let value = read_tree(&self.template)?;
        let template = Template::from_value(&value)
            .with_context(|| format!("invalid template {}", self.template.display()))?;
        let compiled = compile(&template)
            .with_context(|| format!("failed to compile template {}", self.template.display()))?;
        info!(template = %self.template.display(), rules = compiled.len(), "compiled template");
        Ok(compiled)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let roots = if self.ndjson {
                let source = std::fs::read_to_string(&source_path)
                    .with_context(|| format!("failed to read {source_path_str}"))?;
                let mut roots = Vec::new();
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = serde_json::from_str::<Value>(line).with_context(|| {
                        format!("failed to parse NDJSON line {} of {source_path_str}", line_no + 1)
                    })?;
                    roots.push((format!("{source_path_str}:{}", line_no + 1), value));
                }
                roots
            } else {
                vec![(source_path_str.clone(), read_tree(&source_path)?)]
            };
            for (label, value) in roots {
                self.select(label, value, &mut documents)?;
            }
        }
        debug!(count = documents.len(), "loaded documents");
        Ok(documents)
    }

    fn select(&self, label: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("{label}: JSON pointer {pointer} selects nothing"))?,
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { label, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let many = results.len() > 1;
                for (index, value) in results.into_iter().enumerate() {
                    let label = if many { format!("{label}#{index}") } else { label.clone() };
                    out.push(Document { label, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns `false` when some document failed validation.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Compile(target) => {
                let compiled = target.template_settings.load()?;
                let width = compiled.rules().map(|(name, _)| name.len()).max().unwrap_or(0);
                for (name, rule) in compiled.rules() {
                    println!("{:<width$}  {:<12} {}", name.bold(), rule.kind_name().dimmed(), rule);
                }
                Ok(true)
            }
            Command::Check(target) => {
                let compiled = target.template_settings.load()?;
                let documents = target.input_settings.load_documents()?;
                let results: Vec<(&Document, Result<(), CdlError>)> = documents
                    .par_iter()
                    .map(|doc| (doc, compiled.validate(&doc.value)))
                    .collect();

                let mut failed = 0usize;
                for (doc, result) in &results {
                    match result {
                        Ok(()) => {
                            if !target.quiet {
                                println!("{} {}", "ok".green().bold(), doc.label);
                            }
                        }
                        Err(error) => {
                            failed += 1;
                            println!("{} {}: {error}", "FAIL".red().bold(), doc.label);
                        }
                    }
                }
                let summary = format!("{} checked, {failed} failed", results.len());
                if failed == 0 {
                    eprintln!("{}", summary.green());
                } else {
                    eprintln!("{}", summary.red());
                }
                Ok(failed == 0)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Reads a JSON or YAML file (by extension) into a generic tree.
fn read_tree(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str::<Value>(&source)
            .with_context(|| format!("failed to parse YAML {}", path.display()))
    } else {
        serde_json::from_str::<Value>(&source)
            .with_context(|| format!("failed to parse JSON {}", path.display()))
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
