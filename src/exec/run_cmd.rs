use std::fs::File;
use std::io::{stderr, stdout, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result};

use crate::fs::Fs;

use super::Error;

/// Run a subprocess, copying its stdout and stderr both to our own and to `log_file`.
/// Based on:
/// <https://stackoverflow.com/questions/66060139/how-to-tee-stdout-stderr-from-a-subprocess-in-rust>
pub fn run_cmd(cmd: &mut Command, log_file: &Path, fs: &Fs) -> Result<bool> {
    let out_file = fs.create_file(log_file).context("creating log file")?;
    let err_file = out_file.try_clone().context("duplicating log file handle")?;

    log::debug!("running {:?} {:?}", cmd.get_program(), cmd.get_args());
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| {
            format!(
                "failed to execute child process {:?} {:?}",
                cmd.get_program(),
                cmd.get_args(),
            )
        })?;

    let child_out = child.stdout.take().ok_or(Error::ChildPipe("stdout"))?;
    let child_err = child.stderr.take().ok_or(Error::ChildPipe("stderr"))?;

    let thread_out = thread::spawn(move || communicate(child_out, out_file, stdout()));
    let thread_err = thread::spawn(move || communicate(child_err, err_file, stderr()));

    thread_out.join().map_err(|_| Error::OutputThread)??;
    thread_err.join().map_err(|_| Error::OutputThread)??;

    let status = child.wait().context("waiting on child process")?;
    log::info!("process finished with {status}");
    Ok(status.success())
}

fn communicate<R: Read, W: Write>(
    mut stream: R,
    mut file: File,
    mut output: W,
) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    loop {
        let num_read = stream.read(&mut buf)?;
        if num_read == 0 {
            break;
        }

        let buf = &buf[..num_read];
        file.write_all(buf)?;
        output.write_all(buf)?;
    }

    Ok(())
}
