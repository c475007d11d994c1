//! Commands that work on the database directly while the server is down.

use bookvote_core::{BookvoteConfig, tally};
use bookvote_state::StateStore;
use tracing::info;

pub fn print_results(config: &BookvoteConfig) -> anyhow::Result<()> {
    let store = StateStore::open(&config.storage.database_path())?;
    let books = store.load_books()?;
    let votes = store.load_votes()?;
    let epoch = store.vote_epoch()?;

    let result = tally(&books, votes.values());
    println!("round {epoch}, {} ballot(s)", result.ballots());
    for (rank, row) in result.ranked().iter().enumerate() {
        println!("{:>3}. {:<48} {:>6}", rank + 1, row.title, row.points);
    }
    if !result.unlisted().is_empty() {
        println!("not on the ballot:");
        for (title, points) in result.unlisted() {
            println!("     {title:<48} {points:>6}");
        }
    }
    Ok(())
}

pub fn reset_votes(config: &BookvoteConfig) -> anyhow::Result<()> {
    let store = StateStore::open(&config.storage.database_path())?;
    let epoch = store.reset_votes()?;
    info!(epoch, "votes reset from the command line");
    println!("votes cleared, new round {epoch}");
    Ok(())
}
