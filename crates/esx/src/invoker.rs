//! 🔄 The failover sweep: knock on every door, in order, until somebody answers.
//!
//! 🧠 Knowledge graph:
//! - Hosts are tried strictly in configured order. No shuffling, no load balancing, no favorites.
//! - The first attempt that completes without a transport fault wins, immediately.
//!   Hosts after it are never contacted.
//! - A faulted attempt (refused, timed out, response too big for the buffer...) is logged and
//!   forgotten the moment the next host gets its turn. Only the LAST fault survives the sweep.
//! - No retries, no backoff, no second lap. One pass. The mirrors are supposed to be mirrors.
//! - An HTTP error status is NOT a fault. The body is delivered and the extractor reads it.

use std::time::Duration;

use tracing::{debug, warn};

use crate::app_config::HostConfig;
use crate::backends::{HttpRequest, Method, Transport};
use crate::error::{Fault, TransportError};
use crate::response_buffer::ResponseBuffer;

/// 📡 Perform one logical request against the host list, writing the winning body into `buffer`.
pub(crate) async fn invoke<T: Transport + ?Sized>(
    transport: &mut T,
    hosts: &[HostConfig],
    timeout: Duration,
    buffer: &mut ResponseBuffer,
    path: &str,
    method: Method,
    body: Option<&str>,
) -> Result<(), TransportError> {
    if hosts.is_empty() {
        return Err(TransportError::Input(
            "no hosts to send the request to".to_string(),
        ));
    }

    let path = path.trim_start_matches('/');
    buffer.begin_response();

    let mut last_fault: Option<(String, Fault)> = None;
    for (attempt, host) in hosts.iter().enumerate() {
        let url = format!("{}/{}", host.base_url(), path);
        // -- 🔄 whatever the previous host half-wrote for this call goes in the bin
        buffer.rewind_attempt();

        debug!(attempt, %method, url = %url, "📡 trying host");
        let request = HttpRequest {
            url: &url,
            method,
            body,
            timeout,
        };
        match transport.perform(&request, buffer).await {
            Ok(()) => {
                debug!(attempt, url = %url, bytes = buffer.current_response().len(), "✅ host answered");
                return Ok(());
            }
            Err(fault) => {
                warn!(
                    attempt,
                    url = %url,
                    code = fault.kind.code(),
                    "⚠️ host attempt failed, moving down the list: {}",
                    fault.message
                );
                last_fault = Some((url, fault));
            }
        }
    }

    buffer.rewind_attempt();
    match last_fault {
        Some((url, fault)) => Err(TransportError::Transport {
            fault: fault.kind,
            url,
            message: fault.message,
        }),
        None => Err(TransportError::Input(
            "no hosts to send the request to".to_string(),
        )),
    }
}
