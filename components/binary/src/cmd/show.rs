// Copyright 2024 tessera
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Args;
use snafu::{ResultExt, Whatever};

use super::options::CommonArgs;

#[derive(Debug, Clone, Args)]
#[command(long_about = r"

Print the VFS options after applying the config file, the TESSERA_VFS_*
environment variables and the command line flags, and normalizing them.
Examples:

# Options a mount with umask 022 and write caching would use
tessera show --umask 022 --vfs-cache-mode writes
")]
pub struct ShowArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl ShowArgs {
    pub fn run(&self) -> Result<(), Whatever> {
        let _guards = self.common.logging.init();
        let opt = self.common.load_options()?;
        let out = serde_json::to_string_pretty(&opt)
            .whatever_context("failed to serialize VFS options")?;
        println!("{out}");
        Ok(())
    }
}
