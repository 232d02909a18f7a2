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

use crate::commands::CommandContext;
use crate::error::Result;
use crate::lock::{DistributedLock, hold_lock};
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub struct HoldCommand<'a> {
    context: &'a CommandContext<'a>,
}

impl<'a> HoldCommand<'a> {
    pub fn new(context: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self { context })
    }

    /// Acquires `resource`, keeps it for `duration` (or until interrupted
    /// when `None`) and releases it.
    pub fn execute(&self, resource: &str, duration: Option<Duration>, renew: bool) -> Result<()> {
        let ctx = &self.context.ctx;
        let provider = self.context.lock_provider()?;
        let lock = provider.acquire_lock(ctx, resource)?;

        println!(
            "Acquired lock on {} until {} (token {})",
            lock.resource(),
            lock.expires_at(),
            lock.token()
        );

        if !renew {
            self.wait(duration);
            lock.release()?;
            println!("Released lock on {}", lock.resource());
            return Ok(());
        }

        let resource = lock.resource().to_string();
        let lock_time = self.context.config.lock.default_lock_time();
        let holder = hold_lock(ctx, Arc::new(lock), lock_time)?;
        self.wait(duration);
        holder.release()?;
        println!("Released lock on {resource}");
        Ok(())
    }

    fn wait(&self, duration: Option<Duration>) {
        let ctx = &self.context.ctx;
        let interrupted = match duration {
            Some(duration) => ctx.sleep(duration).is_err(),
            None => {
                println!("Holding until interrupted (Ctrl-C)");
                ctx.wait();
                true
            }
        };
        if interrupted {
            info!("Interrupted, releasing");
        }
    }
}
