//! Page through the task server's history the way an infinite-scroll list would.
//!
//! ```sh
//! ZIMAGE_API_BASE=http://localhost:8000 cargo run --example browse_history
//! ```

use std::sync::Arc;
use zimage_client::{
    init_tracing, AppState, ClientConfig, HistoryPager, MemoryStore, PageLoad, TaskClient,
};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ClientConfig::from_env()?;
    let state = AppState::load(Arc::new(MemoryStore::new()), &config)?;
    let pager = HistoryPager::from_config(Arc::new(TaskClient::from_config(&config)), &config);

    let mut initial = true;
    loop {
        match pager.load_history(&state, initial).await? {
            PageLoad::Loaded {
                fetched,
                added,
                has_more,
            } => {
                println!("Fetched {} row(s), {} new image(s)", fetched, added);
                if !has_more {
                    break;
                }
            }
            PageLoad::Skipped => break,
        }
        initial = false;
    }

    for image in state.history() {
        println!("{}  {}", image.id, image.prompt);
    }
    println!("{} image(s) total", state.history_len());
    Ok(())
}
