//! Build script rendering the `winstage` man pages from the clap definitions.
//!
//! Writes `winstage.1` for the binary and one `winstage-<subcommand>.1` page
//! per subcommand into `OUT_DIR`.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = PathBuf::from(
        env::var_os("OUT_DIR")
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))?,
    );

    let command = Cli::command();
    let binary = command.get_name().to_owned();
    render(&Man::new(command.clone()), &out_dir.join(format!("{binary}.1")))?;

    for subcommand in command.get_subcommands() {
        let title = format!("{binary}-{}", subcommand.get_name());
        let page = Man::new(Command::clone(subcommand)).title(title.as_str());
        render(&page, &out_dir.join(format!("{title}.1")))?;
    }

    Ok(())
}

fn render(page: &Man, path: &Path) -> io::Result<()> {
    let mut buffer = Vec::new();
    page.render(&mut buffer)?;
    fs::write(path, buffer)
}
