use clap::Parser;
use docqa_cli::{App, Args, repl};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials usually live in .env; a missing file is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    docqa_telemetry::init(&args.telemetry());

    let config = args.rag_config()?;
    let (embedder, model) = args.providers()?;
    let mut app = App::new(config, embedder, model).with_max_cost(args.max_cost);
    // Ctrl-C cancels the running load or question; at the prompt it is read as a key.
    let _listener = app.interrupt().listen();
    let mut stdout = std::io::stdout();

    if let Some(file) = &args.file {
        app.load(file, &mut stdout).await?;
    }

    match &args.question {
        Some(question) => app.ask(question, &mut stdout).await,
        None => repl::run(&mut app).await,
    }
}
