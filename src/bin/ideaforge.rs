#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ideaforge::cache::MemoryCallCache;
use ideaforge::export;
use ideaforge::gateway::{ChatModel, NoopUsageSink, ProviderGateway, StderrUsageSink, UsageSink};
use ideaforge::pipeline::{Pipeline, PipelineSession, SessionParams};

#[derive(Parser)]
#[command(name = "ideaforge", version, about = "Idea generation and refinement pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: generate → evaluate → brief → export
    Run {
        /// Topic to brainstorm ideas for
        #[arg(long)]
        topic: String,

        /// Number of ideas to generate
        #[arg(long, default_value_t = 10)]
        count: u32,

        /// Generation temperature (0.0 - 1.0)
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,

        /// How many ideas the evaluation stage processes
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Titles of refined ideas to brief (comma-separated).
        /// Omit to brief every refined idea.
        #[arg(long, value_delimiter = ',')]
        select: Option<Vec<String>>,

        /// OpenAI model for brainstorming
        #[arg(long, default_value = "gpt-4o-mini")]
        brainstorm_model: String,

        /// Anthropic model for evaluation and brief enhancement
        #[arg(long, default_value = "claude-3-5-haiku-20241022")]
        refine_model: String,

        /// OpenAI model for structured repair
        #[arg(long, default_value = "gpt-4-turbo")]
        repair_model: String,

        /// Output session JSON
        #[arg(long)]
        out: PathBuf,

        /// Also write the exported brief document (markdown) to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Disable the in-process call cache
        #[arg(long)]
        no_cache: bool,

        /// Log per-call usage records to stderr
        #[arg(long)]
        log_usage: bool,
    },
    /// Export the briefs of a saved session JSON as markdown
    Export {
        /// Path to a session JSON written by `run`
        #[arg(long)]
        session: PathBuf,

        /// Output markdown file
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            topic,
            count,
            temperature,
            limit,
            select,
            brainstorm_model,
            refine_model,
            repair_model,
            out,
            export,
            no_cache,
            log_usage,
        } => {
            let mut params = SessionParams::new(topic);
            params.idea_count = count;
            params.temperature = temperature;
            params.evaluation_limit = limit;
            params.brainstorm_model = ChatModel::openai(brainstorm_model);
            params.refine_model = ChatModel::anthropic(refine_model);
            params.repair_model = ChatModel::openai(repair_model);
            params.validate()?;

            let usage_sink: Arc<dyn UsageSink> = if log_usage {
                Arc::new(StderrUsageSink)
            } else {
                Arc::new(NoopUsageSink)
            };
            let gateway = Arc::new(ProviderGateway::from_env(usage_sink));
            let cache = if no_cache {
                None
            } else {
                Some(Arc::new(MemoryCallCache::new()))
            };

            let pipeline = Pipeline::new(
                gateway,
                cache
                    .clone()
                    .map(|c| c as Arc<dyn ideaforge::cache::CallCache>),
            );
            let mut session = PipelineSession::new(params);

            eprintln!("[ideaforge] session {}", session.id);

            let gen_failures = pipeline.run_generation(&mut session).await?;
            eprintln!(
                "[ideaforge] generated {} ideas ({} failed)",
                session.ideas().len(),
                gen_failures.len()
            );
            for failure in &gen_failures {
                eprintln!(
                    "[ideaforge]   request #{} failed: {}",
                    failure.ordinal, failure.error
                );
            }

            pipeline.run_evaluation(&mut session).await?;
            eprintln!(
                "[ideaforge] evaluated {} ideas:",
                session.refined_ideas().len()
            );
            for refined in session.refined_ideas() {
                eprintln!("[ideaforge]   - {}", refined.display_title());
            }

            let selected: Vec<String> = match select {
                Some(titles) => titles,
                None => session
                    .refined_ideas()
                    .iter()
                    .map(|r| r.display_title().to_string())
                    .collect(),
            };

            let brief_failures = pipeline.run_briefs(&mut session, &selected).await?;
            eprintln!(
                "[ideaforge] briefed {} ideas ({} failed)",
                session.briefs().len(),
                brief_failures.len()
            );
            for failure in &brief_failures {
                eprintln!("[ideaforge]   '{}' failed: {}", failure.title, failure.error);
            }

            if let Some(cache) = &cache {
                eprintln!(
                    "[ideaforge] cache: {} entries, {} hits",
                    cache.len(),
                    cache.hit_count()
                );
            }

            std::fs::write(&out, serde_json::to_string_pretty(&session)?)?;
            eprintln!("[ideaforge] session written to {}", out.display());

            if let Some(export_path) = export {
                export::write_markdown(&export_path, session.briefs())?;
                eprintln!("[ideaforge] briefs exported to {}", export_path.display());
            }
        }
        Commands::Export { session, out } => {
            let json = std::fs::read_to_string(&session)?;
            let session: PipelineSession = serde_json::from_str(&json)?;
            export::write_markdown(&out, session.briefs())?;
            println!("exported {} briefs to {}", session.briefs().len(), out.display());
        }
    }

    Ok(())
}
