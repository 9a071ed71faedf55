//! Show configuration and sync status.

use anyhow::Result;
use sync_core::SubscriptionState;

use crate::config::Settings;
use crate::session::Session;

/// Run the status command.
pub async fn run(settings: &Settings) -> Result<()> {
    println!("=== tasksync status ===");
    println!();
    println!("User:        {}", settings.user);
    println!("Remote file: {}", settings.remote_path.display());
    println!("Cache dir:   {}", settings.cache_dir.display());
    println!();

    let session = Session::open(settings).await?;
    let state = session.sync.state();
    let completed = state.tasks().iter().filter(|t| t.completed).count();

    println!("Records:     {} (all users)", session.record_count());
    println!(
        "Tasks:       {} ({} completed, {} open)",
        state.tasks().len(),
        completed,
        state.tasks().len() - completed
    );
    println!(
        "Sync:        {}",
        describe(&session.sync.subscription_state().await)
    );

    Ok(())
}

fn describe(state: &SubscriptionState) -> String {
    match state {
        SubscriptionState::NoIdentity => "no identity".to_string(),
        SubscriptionState::Subscribing { owner } => format!("loading tasks for {}", owner),
        SubscriptionState::Subscribed { owner } => format!("subscribed as {}", owner),
        SubscriptionState::Degraded { owner, error } => {
            format!("degraded for {}: {}", owner, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::OwnerId;

    #[test]
    fn describes_each_state() {
        let owner = OwnerId::new("alice");
        assert_eq!(describe(&SubscriptionState::NoIdentity), "no identity");
        assert_eq!(
            describe(&SubscriptionState::Subscribed {
                owner: owner.clone()
            }),
            "subscribed as alice"
        );
        assert_eq!(
            describe(&SubscriptionState::Degraded {
                owner,
                error: "offline".to_string()
            }),
            "degraded for alice: offline"
        );
    }
}
