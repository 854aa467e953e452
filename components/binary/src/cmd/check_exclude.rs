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
use snafu::Whatever;
use tessera_vfs::VfsOptions;

use super::options::CommonArgs;

#[derive(Debug, Clone, Args)]
#[command(long_about = r"

Report which paths the VFS cache would keep from uploading.
Paths are relative to the root of the mount.
Examples:

tessera check-exclude --vfs-upload-exclude '*.tmp' work/a.tmp work/a.txt
")]
pub struct CheckExcludeArgs {
    #[arg(help = "Paths to check", value_name = "PATH", required = true)]
    pub paths: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckExcludeArgs {
    pub fn run(&self) -> Result<(), Whatever> {
        let _guards = self.common.logging.init();
        let opt = self.common.load_options()?;
        for line in report(&opt, &self.paths) {
            println!("{line}");
        }
        Ok(())
    }
}

fn report(opt: &VfsOptions, paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            let verdict = if opt.is_excluded(path) { "excluded" } else { "included" };
            format!("{verdict}\t{path}")
        })
        .collect()
}
