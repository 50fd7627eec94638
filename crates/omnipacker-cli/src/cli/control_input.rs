//! Interactive control during `omnipacker run`: one command per stdin line.
//!
//! ```text
//! code <CODE>      submit an email login code
//! cancel           cancel the running job
//! overwrite|copy|skip   answer an output conflict
//! start | clear | quit
//! select|remove|up|down <N>   act on job N
//! ```

use omnipacker_core::conflict::ConflictChoice;
use omnipacker_core::job::JobId;
use omnipacker_core::scheduler::Command;
use std::io::BufRead;
use tokio::sync::mpsc::UnboundedSender;

/// `None` for blank lines; `Err` carries a message for the user.
pub fn parse_control_line(line: &str) -> Option<Result<Command, String>> {
    let mut words = line.split_whitespace();
    let word = words.next()?;
    let rest: Vec<&str> = words.collect();
    let job_arg = || -> Result<JobId, String> {
        match rest.as_slice() {
            [n] => n
                .trim_start_matches("job-")
                .parse::<u64>()
                .map(JobId)
                .map_err(|_| format!("invalid job number: {n}")),
            _ => Err(format!("usage: {word} <N>")),
        }
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "code" => match rest.as_slice() {
            [code] => Ok(Command::SubmitEmailCode(code.to_string())),
            _ => Err("usage: code <CODE>".to_string()),
        },
        "cancel" => Ok(Command::Cancel),
        "overwrite" => Ok(Command::ResolveConflict(ConflictChoice::Overwrite)),
        "copy" => Ok(Command::ResolveConflict(ConflictChoice::Copy)),
        "skip" => Ok(Command::ResolveConflict(ConflictChoice::Cancel)),
        "start" => Ok(Command::Start),
        "clear" => Ok(Command::Clear),
        "quit" | "exit" => Ok(Command::Shutdown),
        "select" => job_arg().map(Command::Select),
        "remove" => job_arg().map(Command::Remove),
        "up" => job_arg().map(|job| Command::Reorder { job, delta: -1 }),
        "down" => job_arg().map(|job| Command::Reorder { job, delta: 1 }),
        other => Err(format!("unknown command: {other}")),
    };
    Some(command)
}

/// Reads stdin on a dedicated thread; the thread ends at EOF or once the
/// control loop stops accepting commands.
pub fn spawn_stdin_reader(tx: UnboundedSender<Command>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-control".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_control_line(&line) {
                    Some(Ok(command)) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Some(Err(message)) => eprintln!("{message}"),
                    None => {}
                }
            }
        })?;
    Ok(())
}
