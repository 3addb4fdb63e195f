//! Generate one image with whichever backend the environment selects.
//!
//! Reads `ZIMAGE_BACKEND`, `ZIMAGE_API_BASE`, `GEMINI_API_KEY` and friends,
//! stores history under `./.zimage`, and cancels cleanly on Ctrl-C.
//!
//! ```sh
//! ZIMAGE_BACKEND=task cargo run --example generate -- "a lighthouse in a storm"
//! ```

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use zimage_client::{
    build_backend, init_tracing, AppState, ClientConfig, FileStore, GenerationEvent,
    GenerationRequest, Generator,
};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        eprintln!("usage: generate <prompt>");
        return Ok(());
    }

    let config = ClientConfig::from_env()?;
    let state = AppState::load(Arc::new(FileStore::new(".zimage")), &config)?;
    let generator = Generator::new(build_backend(&config, &state.settings())?);
    println!("Backend: {:?}", generator.backend().kind());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = generator
        .generate(&state, GenerationRequest::new(prompt), &cancel, |event| match event {
            GenerationEvent::Started => println!("Started"),
            GenerationEvent::Progress(p) => match p.step {
                Some(step) => println!("  {}% ({})", p.percent, step),
                None => println!("  {}%", p.percent),
            },
            GenerationEvent::Completed(image) => println!("Done: {}", image.url),
            GenerationEvent::Failed { message } => eprintln!("Failed: {}", message),
        })
        .await;

    if result.is_ok() {
        println!("History now holds {} image(s)", state.history_len());
    }
    Ok(())
}
