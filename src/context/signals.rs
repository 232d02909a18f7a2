// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::Context;
use std::sync::OnceLock;

#[derive(Debug)]
struct SignalRegistry {
    context: Context,
}

impl SignalRegistry {
    fn new() -> Self {
        let context = Context::background();
        register_handlers(&context);
        Self { context }
    }
}

#[cfg(unix)]
fn register_handlers(context: &Context) {
    use log::{debug, warn};
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(err) => {
            warn!("Failed to register cancellation handlers: {err}");
            return;
        }
    };

    let context = context.clone();
    let spawned = thread::Builder::new()
        .name("leasehold-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                debug!("Received signal {signal}, cancelling global context");
                context.cancel();
            }
        });
    if let Err(err) = spawned {
        warn!("Failed to start signal listener: {err}");
    }
}

#[cfg(not(unix))]
fn register_handlers(_context: &Context) {
    log::debug!("Signal driven cancellation is not available on this platform");
}

static GLOBAL_REGISTRY: OnceLock<SignalRegistry> = OnceLock::new();

/// Returns a context cancelled by SIGINT or SIGTERM.
///
/// Handlers are installed on first use. Derive per-operation contexts from it
/// with [`Context::with_cancel`] or [`Context::with_timeout`].
pub fn global_context() -> Context {
    GLOBAL_REGISTRY
        .get_or_init(SignalRegistry::new)
        .context
        .clone()
}
