//! Runs a short moderation scenario against the in-memory system.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p user-management
//! ```

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};
use user_management::config::UserManagementOptions;
use user_management::lifecycle::{setup_tracing, IdentitySystem};
use user_management::model::{UserRecord, UserStatus};
use user_management::outcome::ErrorInfo;

const DEMO_USER: i64 = 42;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let options = UserManagementOptions::from_env().context("invalid configuration")?;
    let system = IdentitySystem::in_memory(options);
    system
        .store
        .insert(UserRecord::new(DEMO_USER, "ext-42").with_roles(["player"]));
    let mut events = system.events.subscribe();
    let cancel = CancellationToken::new();

    let span = tracing::info_span!("moderation", user_id = DEMO_USER);
    async {
        let user = system.users.get_user(DEMO_USER, &cancel).await?;
        info!(status = %user.status, roles = ?user.roles, "Loaded user");

        system
            .users
            .set_status(DEMO_USER, UserStatus::Banned, &cancel)
            .await?;

        // Same status again is reported, not applied.
        let repeat = system
            .users
            .set_status(DEMO_USER, UserStatus::Banned, &cancel)
            .await;
        let info = ErrorInfo::from(&repeat);
        info!(code = info.code, message = %info.message, "Repeated ban");

        let change = system
            .users
            .update_roles(
                DEMO_USER,
                vec!["moderator".to_string()],
                vec!["player".to_string()],
                &cancel,
            )
            .await?;
        info!(added = ?change.added, removed = ?change.removed, "Roles updated");

        let token = system.users.mint_token(DEMO_USER, None, None, &cancel).await?;
        info!(expires_at = %token.expires_at, "Token minted");

        anyhow::Ok(())
    }
    .instrument(span)
    .await
    .inspect_err(|e| error!(error = %e, "Scenario failed"))?;

    while let Ok(event) = events.try_recv() {
        info!(event_type = %event.event_type, subject = %event.subject, "Event received");
    }
    if let Some(claims) = system.identity.claims_for("ext-42") {
        info!(?claims, "Claims at provider");
    }

    system.shutdown().await;
    info!("Application completed successfully");
    Ok(())
}
