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

mod cmd;

use clap::{Parser, Subcommand};
use snafu::Whatever;

use crate::cmd::{check_exclude::CheckExcludeArgs, show::ShowArgs};

#[derive(Debug, Parser)]
#[clap(
name = "tessera",
about = "tessera VFS options tool",
version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Show(ShowArgs),
    CheckExclude(CheckExcludeArgs),
}

fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();
    match cli.commands {
        Commands::Show(show_args) => show_args.run(),
        Commands::CheckExclude(check_args) => check_args.run(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() { Cli::command().debug_assert(); }

    #[test]
    fn parse_subcommands() {
        let cli = Cli::try_parse_from(["tessera", "show", "--umask", "022"]).unwrap();
        assert!(matches!(cli.commands, Commands::Show(_)));

        let cli = Cli::try_parse_from(["tessera", "check-exclude", "a.tmp", "b/c.txt"]).unwrap();
        match cli.commands {
            Commands::CheckExclude(args) => assert_eq!(args.paths, vec!["a.tmp", "b/c.txt"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
