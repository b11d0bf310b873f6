use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::persist::{save_documents, save_index, IndexPaths};
use docsearch_core::tokenizer::normalize;
use docsearch_core::{DocId, DocMeta, InvertedIndex};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One rendered documentation page, as handed over by the site build.
#[derive(Debug, Deserialize)]
struct PageRecord {
    slug: String,
    title: String,
    html: String,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the documentation search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build search.index and search.documents from page records
    Build {
        /// Input path: a JSON/JSONL file, or a directory walked for them
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => build_index(&input, &output),
    }
}

fn build_index(input: &str, output: &str) -> Result<()> {
    let input_path = Path::new(input);
    let mut index = InvertedIndex::new();
    let mut documents: Vec<DocMeta> = Vec::new();

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        // document ids are positional, so the walk order must be stable
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }

    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&file, &mut index, &mut documents)?;
        } else {
            index_json(&file, &mut index, &mut documents)?;
        }
    }

    tracing::info!(
        num_docs = documents.len(),
        num_terms = index.term_count(),
        "ingested documents"
    );

    let out_paths = IndexPaths::new(output);
    save_index(&out_paths, &index).context("writing search.index")?;
    save_documents(&out_paths, &documents).context("writing search.documents")?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn index_jsonl(file: &Path, index: &mut InvertedIndex, documents: &mut Vec<DocMeta>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let page: PageRecord = serde_json::from_str(&line)
            .with_context(|| format!("parsing record in {}", file.display()))?;
        ingest_page(page, index, documents);
    }
    Ok(())
}

fn index_json(file: &Path, index: &mut InvertedIndex, documents: &mut Vec<DocMeta>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let page: PageRecord = serde_json::from_value(v)
                    .with_context(|| format!("parsing record in {}", file.display()))?;
                ingest_page(page, index, documents);
            }
        }
        serde_json::Value::Object(_) => {
            let page: PageRecord = serde_json::from_value(json)
                .with_context(|| format!("parsing record in {}", file.display()))?;
            ingest_page(page, index, documents);
        }
        _ => {}
    }
    Ok(())
}

fn ingest_page(page: PageRecord, index: &mut InvertedIndex, documents: &mut Vec<DocMeta>) {
    let doc_id = documents.len() as DocId;

    // titles are searchable alongside body text
    let mut tokens = normalize(&page.title);
    tokens.extend(normalize(&page.html));
    index.index_document(doc_id, &tokens);

    tracing::debug!(doc_id, slug = %page.slug, tokens = tokens.len(), "indexed page");
    documents.push(DocMeta { slug: page.slug, title: page.title });
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::persist::{load_documents, load_index};
    use std::fs;

    #[test]
    fn build_from_jsonl_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pages.jsonl");
        fs::write(
            &input,
            concat!(
                r#"{"slug":"/docs/fox","title":"The Quick Brown Fox","html":"<p>fox</p>"}"#,
                "\n",
                r#"{"slug":"/docs/jump","title":"Quick foxes jump","html":"<p>jump</p>"}"#,
                "\n",
            ),
        )
        .unwrap();
        let out = dir.path().join("index");

        build_index(input.to_str().unwrap(), out.to_str().unwrap()).unwrap();

        let paths = IndexPaths::new(&out);
        let index = load_index(&paths).unwrap();
        let documents = load_documents(&paths).unwrap();
        assert_eq!(index.doc_count(), 2);
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].slug, "/docs/fox");
        assert_eq!(index.document_frequency("fox"), 2);
    }
}
