//! `omnipacker completions` and `omnipacker man`.

use anyhow::Result;
use clap_complete::Shell;

pub fn run_completions(cmd: &mut clap::Command, shell: Shell) {
    clap_complete::generate(shell, cmd, "omnipacker", &mut std::io::stdout());
}

pub fn run_man(cmd: clap::Command) -> Result<()> {
    let man = clap_mangen::Man::new(cmd);
    man.render(&mut std::io::stdout())?;
    Ok(())
}
