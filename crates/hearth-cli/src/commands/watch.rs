use std::time::Duration;

use chrono::{Local, Utc};
use hearth_core::config::ClientConfig;
use hearth_core::connectivity::ConnectivityMonitor;
use hearth_core::db::LibSqlNotificationQueue;
use hearth_core::engine::SyncEngine;
use hearth_core::subscription::LiveSubscriptionManager;
use hearth_core::transport::PollingTransport;
use hearth_core::SyncState;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::commands::common::{api_client, format_task_lines, LocalReminders};
use crate::error::CliError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const REMINDER_CHECK_INTERVAL: Duration = Duration::from_secs(20);

pub async fn run_watch(config: &ClientConfig) -> Result<(), CliError> {
    let api = api_client(config)?;
    let probe_target = probe_address(config.api_base_url.as_str());

    let reminders = LocalReminders::open(config).await?;
    let queue = reminders.queue();
    let (engine, engine_task) = SyncEngine::spawn(reminders.scheduler(config));

    let transport = PollingTransport::from_http(api, config.poll_interval);
    let manager = LiveSubscriptionManager::new(transport);
    let monitor = ConnectivityMonitor::new(
        manager,
        config.owner_id.clone(),
        engine.data_callback(),
        |error| eprintln!("Sync error [{}]: {error}", error.code()),
    );
    let mut states = monitor.watch_state();

    let (online_tx, online_rx) = watch::channel(probe(probe_target.as_ref()).await);
    let monitor_task = tokio::spawn(monitor.run(online_rx));

    let mut tasks = engine.subscribe_tasks();
    let mut probe_timer = interval(config.poll_interval);
    probe_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reminder_timer = interval(REMINDER_CHECK_INTERVAL);
    reminder_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("Watching tasks for {} (Ctrl-C to stop)", config.owner_id);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = tasks.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = tasks.borrow_and_update().clone();
                println!("--- {} ({} tasks)", Local::now().format("%H:%M:%S"), snapshot.len());
                for line in format_task_lines(&snapshot, &config.owner_id) {
                    println!("{line}");
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                println!("[{}]", state_message(state));
            }
            _ = probe_timer.tick() => {
                let online = probe(probe_target.as_ref()).await;
                online_tx.send_if_modified(|current| {
                    let modified = *current != online;
                    *current = online;
                    modified
                });
            }
            _ = reminder_timer.tick() => deliver_due(&queue).await,
        }
    }

    drop(online_tx);
    if let Err(error) = monitor_task.await {
        tracing::warn!("Connectivity monitor task failed: {error}");
    }
    engine.shutdown().await?;
    if let Err(error) = engine_task.await {
        tracing::warn!("Sync engine task failed: {error}");
    }
    Ok(())
}

async fn deliver_due(queue: &LibSqlNotificationQueue) {
    match queue.take_due(Utc::now()).await {
        Ok(due) => {
            for reminder in due {
                println!(
                    "\u{23f0} Reminder: {} (due {}, {})",
                    reminder.payload.title, reminder.payload.due_date, reminder.payload.priority
                );
            }
        }
        Err(error) => tracing::warn!("Failed to read due reminders: {error}"),
    }
}

pub const fn state_message(state: SyncState) -> &'static str {
    match state {
        SyncState::Offline => "offline",
        SyncState::Syncing => "connecting",
        SyncState::Synced => "up to date",
        SyncState::Error => "sync error",
    }
}

/// Host and port to probe for reachability.
pub fn probe_address(base_url: &str) -> Option<(String, u16)> {
    let url = reqwest::Url::parse(base_url).ok()?;
    let host = url.host_str()?.to_string();
    let port = url.port_or_known_default()?;
    Some((host, port))
}

async fn probe(target: Option<&(String, u16)>) -> bool {
    let Some((host, port)) = target else {
        return false;
    };
    matches!(
        timeout(PROBE_TIMEOUT, TcpStream::connect((host.as_str(), *port))).await,
        Ok(Ok(_))
    )
}
