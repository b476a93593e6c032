use crate::bubble::BubblePosition;
use crate::config::{Config, OutputFormat};
use crate::delivery::DeliveryStatus;
use crate::hub::ConversationHub;
use crate::messenger_types::{ConversationEvent, Message, Timestamp};
use crate::projector::{DerivedView, MessageView};
use crate::snapshot::{load_conversation, load_events};
use colored::*;
use tokio::sync::mpsc;
use tracing::info;

/// Replay a snapshot (and optional event log), optionally compose a pending
/// message, and print the resulting view.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let conversation = load_conversation(&config.snapshot_path)?;
    let hub = ConversationHub::new(config.viewer_id.clone(), config.event_buffer);
    hub.load(&conversation).await?;

    if let Some(path) = &config.events_path {
        let events = load_events(path)?;
        info!("Replaying {} event(s) from {}", events.len(), path.display());

        // Transport side: feed the hub in log order
        let (tx, rx) = mpsc::channel(config.event_buffer);
        let feeder = tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        let (applied, rejected) = hub.consume(rx).await;
        feeder.await?;
        if rejected > 0 {
            eprintln!(
                "{} {} event(s) rejected, {} applied",
                "!".yellow().bold(),
                rejected,
                applied
            );
        }
    }

    if let Some(text) = &config.compose {
        let message = Message::optimistic(
            conversation.id.clone(),
            config.viewer_id.clone(),
            Some(text.clone()),
            Vec::new(),
        );
        hub.apply(&ConversationEvent::MessageAppended { message })
            .await?;
    }

    let view = hub
        .view(&conversation.id)
        .await
        .ok_or_else(|| anyhow::anyhow!("conversation {} vanished", conversation.id))?;

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => print!("{}", render_transcript(&view)),
    }
    Ok(())
}

fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn bubble_marker(position: BubblePosition) -> &'static str {
    match position {
        BubblePosition::Isolated => "●",
        BubblePosition::First => "┌",
        BubblePosition::Middle => "│",
        BubblePosition::Last => "└",
    }
}

fn status_label(d: &MessageView) -> ColoredString {
    let at = format_timestamp(d.display_timestamp);
    match d.status {
        DeliveryStatus::Sending => "sending…".dimmed(),
        DeliveryStatus::Sent => format!("✓ sent {}", at).normal(),
        DeliveryStatus::Delivered => format!("✓✓ delivered {}", at).cyan(),
        DeliveryStatus::Seen => format!("✓✓ seen {}", at).green(),
        DeliveryStatus::None => "".normal(),
    }
}

/// Human-readable transcript of a derived view
pub fn render_transcript(view: &DerivedView) -> String {
    let mut out = String::new();
    let peer = view
        .participant(&view.peer_id)
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| view.peer_id.clone());
    out.push_str(&format!(
        "{} {} ({} messages)\n",
        "Conversation with".bright_white().bold(),
        peer.cyan(),
        view.len()
    ));

    for d in &view.descriptors {
        let incoming = !d.message.is_from(&view.viewer_id);
        let avatar = if d.show_avatar {
            peer.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default()
        } else {
            " ".to_string()
        };
        let mut body = d.message.text.clone().unwrap_or_default();
        if d.has_media {
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(&format!("[{} attachment(s)]", d.message.attachments.len()));
        }
        let direction = if incoming { "←".blue() } else { "→".magenta() };
        out.push_str(&format!(
            "{} {} {} {}",
            avatar,
            bubble_marker(d.bubble),
            direction,
            body
        ));
        if d.show_delivery_status && d.status != DeliveryStatus::None {
            out.push_str(&format!("  {}", status_label(d)));
        }
        out.push('\n');
    }
    out
}
