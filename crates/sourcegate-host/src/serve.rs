// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `sourcegate serve`: one bridge session driven over line-delimited JSON.
//
// The peer (a WebView embedder in another process) forwards page calls as
// `request` lines and evaluates every `evaluate` line it receives. At end
// of input the loop waits for outstanding calls before closing.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sourcegate_bridge::{BridgeSession, Capabilities, ScriptHost, ScriptVariant};
use sourcegate_core::call::Args;
use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::Result;
use sourcegate_core::types::Notification;

use crate::protocol::{Inbound, Outbound, PageEvent};

/// Forwards notifications to the writer loop.
struct ChannelHost(mpsc::UnboundedSender<Notification>);

impl ScriptHost for ChannelHost {
    fn notify(&self, notification: Notification) {
        if self.0.send(notification).is_err() {
            debug!("writer gone, notification dropped");
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, message: &Outbound) -> Result<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}

enum Step {
    Continue,
    Reply(Outbound),
    Stop,
}

fn handle(session: &BridgeSession, line: &str, outstanding: &mut usize) -> Step {
    let message = match serde_json::from_str::<Inbound>(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "unparsable line from peer");
            return Step::Reply(Outbound::Error {
                message: format!("bad message: {e}"),
            });
        }
    };
    match message {
        Inbound::Request { name, args, id } => {
            session.request(&name, Args::from(args), id);
            *outstanding += 1;
            Step::Continue
        }
        Inbound::Get { id } => {
            let value = session.get_from_memory(&id);
            Step::Reply(Outbound::Value { id, value })
        }
        Inbound::Intercept { url } => {
            let script = session.intercept(&url);
            Step::Reply(Outbound::Script { url, script })
        }
        Inbound::Event { event, value } => {
            let events = session.host_events();
            let value = value.unwrap_or_default();
            match event {
                PageEvent::Toast => events.toast(&value),
                PageEvent::LongToast => events.long_toast(&value),
                PageEvent::Log => events.log(&value),
                PageEvent::UpConfig => events.up_config(&value),
                PageEvent::LockOrientation => events.lock_orientation(&value),
                PageEvent::CloseRequested => events.close_requested(),
            }
            Step::Continue
        }
        Inbound::Close => Step::Stop,
    }
}

/// Run one session over `input`/`output` until the peer closes it or input
/// ends.
pub async fn serve<R, W>(
    config: &BridgeConfig,
    variant: ScriptVariant,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut notifications) = mpsc::unbounded_channel();
    let host: Arc<dyn ScriptHost> = Arc::new(ChannelHost(tx));
    let capabilities = Capabilities::from_config(config)?;
    let session = BridgeSession::new(config, capabilities, Arc::downgrade(&host))?.with_variant(variant);

    write_line(&mut output, &Outbound::session(&session)).await?;

    let mut lines = input.lines();
    let mut outstanding = 0usize;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match handle(&session, &line, &mut outstanding) {
                    Step::Continue => {}
                    Step::Reply(reply) => write_line(&mut output, &reply).await?,
                    Step::Stop => {
                        outstanding = 0;
                        break;
                    }
                }
            }
            Some(notification) = notifications.recv() => {
                outstanding = outstanding.saturating_sub(1);
                let script = session.dispatch_call(&notification);
                write_line(&mut output, &Outbound::Evaluate { script }).await?;
            }
        }
    }

    // Input ended: let outstanding calls finish, bounded by the call deadline.
    let drain_limit = config.call_deadline() + std::time::Duration::from_secs(1);
    while outstanding > 0 {
        match tokio::time::timeout(drain_limit, notifications.recv()).await {
            Ok(Some(notification)) => {
                outstanding -= 1;
                let script = session.dispatch_call(&notification);
                write_line(&mut output, &Outbound::Evaluate { script }).await?;
            }
            _ => break,
        }
    }

    session.close();
    info!("session finished");
    Ok(())
}
