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

pub struct ConfigCommand<'a> {
    context: &'a CommandContext<'a>,
}

impl<'a> ConfigCommand<'a> {
    pub fn new(context: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self { context })
    }

    pub fn execute(&self) -> Result<()> {
        print!("{}", self.render()?);
        Ok(())
    }

    fn render(&self) -> Result<String> {
        let config = self.context.config;
        let mut output = format!(
            "# home: {}\n# store path: {}\n",
            config.home().display(),
            config.store_path().display()
        );
        output.push_str(&config.to_toml()?);
        Ok(output)
    }
}
