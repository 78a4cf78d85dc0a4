//! Dispatch policy: per-recipient routing to pipe, local mailbox, or remote
//! relay, including the forwarding sender rewrite.

pub mod forward;

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;

use crate::courier::{Courier, LocalDomains};
use crate::error::DispatchError;
use crate::item::{Item, Recipient, RecipientKind};

/// Hard deadline for pipe deliveries.
const PIPE_DEADLINE: Duration = Duration::from_secs(30);

/// Dispatches a single recipient attempt. Returns the courier-shaped outcome
/// the worker's per-attempt procedure reduces into a status transition.
pub async fn dispatch(
    item: &Item,
    recipient: &Recipient,
    local_domains: &dyn LocalDomains,
    local_courier: &dyn Courier,
    remote_courier: &dyn Courier,
) -> Result<(), DispatchError> {
    match recipient.kind {
        RecipientKind::Pipe => dispatch_pipe(item, recipient).await,
        RecipientKind::Mailbox => {
            dispatch_mailbox(item, recipient, local_domains, local_courier, remote_courier).await
        }
    }
}

async fn dispatch_pipe(item: &Item, recipient: &Recipient) -> Result<(), DispatchError> {
    let argv: Vec<&str> = recipient.address.split_whitespace().collect();
    let Some((program, args)) = argv.split_first() else {
        return Err(DispatchError::Permanent("empty pipe".to_string()));
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| DispatchError::Permanent(format!("failed to spawn pipe: {e}")))?;

    // The write and the wait both run under the same deadline: a child that
    // never drains stdin must not be able to stall past `PIPE_DEADLINE` any
    // more than a child that never exits can. The future borrows `child`
    // rather than consuming it, so on timeout the borrow ends when the
    // future is dropped and `child` is still here to kill below.
    let run = async {
        if let Some(mut stdin) = child.stdin.take() {
            // Pipes don't retry regardless of why the write failed; the
            // exit status below is what actually decides success.
            let _ = stdin.write_all(&item.data).await;
        }
        child.wait().await
    };

    match timeout(PIPE_DEADLINE, run).await {
        Ok(Ok(status)) => {
            if status.success() {
                Ok(())
            } else {
                let mut stderr_buf = Vec::new();
                if let Some(mut stderr) = child.stderr.take() {
                    let _ = stderr.read_to_end(&mut stderr_buf).await;
                }
                let diagnostic = if stderr_buf.is_empty() {
                    format!("pipe exited with status {status}")
                } else {
                    String::from_utf8_lossy(&stderr_buf).trim().to_string()
                };
                Err(DispatchError::Permanent(diagnostic))
            }
        }
        Ok(Err(e)) => Err(DispatchError::Permanent(format!(
            "pipe execution failed: {e}"
        ))),
        Err(_) => {
            let _ = child.kill().await;
            Err(DispatchError::Permanent(format!(
                "pipe exceeded {}s deadline",
                PIPE_DEADLINE.as_secs()
            )))
        }
    }
}

async fn dispatch_mailbox(
    item: &Item,
    recipient: &Recipient,
    local_domains: &dyn LocalDomains,
    local_courier: &dyn Courier,
    remote_courier: &dyn Courier,
) -> Result<(), DispatchError> {
    let Some((_, recipient_domain)) = forward::split_user_domain(&recipient.address) else {
        return Err(DispatchError::Permanent(format!(
            "malformed recipient address: {}",
            recipient.address
        )));
    };

    if local_domains.is_local(recipient_domain) {
        return local_courier
            .deliver(&item.from, &recipient.address, &item.data)
            .await;
    }

    let sender_is_remote = forward::split_user_domain(&item.from)
        .is_some_and(|(_, from_domain)| !local_domains.is_local(from_domain));

    let outgoing_from = if sender_is_remote {
        forward::rewrite_sender(&item.from, &recipient.original_address)
            .unwrap_or_else(|| item.from.clone())
    } else {
        item.from.clone()
    };

    remote_courier
        .deliver(&outgoing_from, &recipient.address, &item.data)
        .await
}
