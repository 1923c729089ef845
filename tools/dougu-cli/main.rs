use clap::Parser;
use dougu::prelude::*;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// A compilation and execution engine CLI for user-authored tool pipelines
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the tool definition JSON file
    tool_path: String,
    /// Optional path to the input JSON file (an object keyed by field id)
    input_path: Option<String>,

    /// Print the per-step execution report
    #[arg(short, long)]
    report: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let total_start = Instant::now();

    // --- 1. File Loading ---
    let load_start = Instant::now();
    let tool_json = fs::read_to_string(&cli.tool_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read tool file '{}': {}",
            &cli.tool_path, e
        ))
    });
    let input: serde_json::Value = match &cli.input_path {
        Some(path) => {
            let input_json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read input file '{}': {}", path, e))
            });
            serde_json::from_str(&input_json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to parse input JSON: {}", e))
            })
        }
        None => {
            println!("No input file provided. Using an empty input object.");
            serde_json::json!({})
        }
    };
    let load_duration = load_start.elapsed();

    // --- 2. Parsing and Compilation ---
    let draft: ToolDraft = serde_json::from_str(&tool_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse tool JSON: {}", e)));

    println!("\nCompiling tool '{}'...", draft.name);
    let compile_start = Instant::now();
    let tool = ToolCompiler::new(draft)
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    let compile_duration = compile_start.elapsed();
    println!(
        "Compilation successful! {} fields, {} steps in {:?}",
        tool.fields.len(),
        tool.steps.len(),
        compile_duration
    );

    // --- 3. Validation and Execution ---
    let exec_start = Instant::now();
    let seed = validate_input(&tool.fields, &input)
        .unwrap_or_else(|e| exit_with_error(&format!("Input rejected: {}", e)));

    let engine = Engine::new();
    let run = engine.execute(&tool, ExecutionContext::seeded(seed)).await;
    let exec_duration = exec_start.elapsed();

    if cli.report {
        println!("\n--- Step Report ---");
        println!("{}", ReportFormatter::format(&run));
    }

    if let Some(error) = &run.error {
        exit_with_error(&format!("Run failed: {}", error));
    }

    // --- 4. Rendering ---
    let rendered = render(&run.result, Some(&tool.output))
        .unwrap_or_else(|e| exit_with_error(&format!("Rendering failed: {}", e)));

    println!("\nRun Finished!");
    print_output(&rendered);

    let total_duration = total_start.elapsed();
    println!("\n--- Performance Summary ---");
    println!("File Loading:   {:?}", load_duration);
    println!("Compilation:    {:?}", compile_duration);
    println!("Execution:      {:?}", exec_duration);
    println!("---------------------------");
    println!("Total:          {:?}", total_duration);
    println!();
}

fn print_output(rendered: &RenderedOutput) {
    match rendered {
        RenderedOutput::Text { content } => println!("{}", content),
        RenderedOutput::Json { content } => println!("{}", content),
        RenderedOutput::Markdown { html } => println!("{}", html),
        RenderedOutput::Table { columns, rows } => {
            println!("{}", columns.join(" | "));
            for row in rows {
                println!("{}", row.join(" | "));
            }
        }
        RenderedOutput::Card { items } => {
            for item in items {
                println!("{}: {}", item.label, item.value);
            }
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
