use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use lazy_static::lazy_static;
use win_dbg_logger::output_debug_string;

const LOG_FILE: &str = "translation-loader.log";

lazy_static! {
    pub(crate) static ref LOG: Mutex<Option<LineWriter<File>>> = {
        match open_log_file().context("open_log_file error") {
            Ok(log) => Mutex::new(Some(log)),
            Err(err) => {
                // a loader must not take the host down over a log file;
                // the debugger channel still works without one
                output_debug_string(format!("{:#}", err).as_str());
                Mutex::new(None)
            }
        }
    };
}

fn open_log_file() -> anyhow::Result<LineWriter<File>> {
    // next to the host binary, where the patch data itself lives
    let path = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOG_FILE)))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE));
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    Ok(LineWriter::new(file))
}

pub(crate) fn write_line(msg: &str) {
    output_debug_string(msg);
    if let Ok(mut log) = LOG.lock() {
        if let Some(log) = log.as_mut() {
            log.write_all(msg.as_bytes()).ok();
            log.write_all(b"\n").ok();
        }
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(windows)]
pub(crate) fn message_box(text: &str) {
    use std::ffi::CString;
    use winapi::ctypes::c_char;
    use winapi::um::winuser::{MessageBoxA, MB_ICONWARNING, MB_OK};

    let text = CString::new(text).unwrap_or_default();
    unsafe {
        MessageBoxA(
            std::ptr::null_mut(),
            text.as_ptr(),
            "Loader\0".as_ptr() as *const c_char,
            MB_OK | MB_ICONWARNING,
        );
    }
}

#[cfg(not(windows))]
pub(crate) fn message_box(_text: &str) {}
