pub mod loader;
mod log;
pub mod patch;
pub mod reader;

use std::path::Path;

use win_dbg_logger::output_debug_string;

#[cfg(windows)]
use winapi::shared::minwindef::{BOOL, DWORD, HINSTANCE, LPVOID, TRUE};

const DEBUG: bool = false;

/// File name of the host binary this loader's patch data is authored against.
pub const TARGET_EXE: &str = "P5R.exe";

#[cfg(windows)]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(module: HINSTANCE, reason: DWORD, _reserved: LPVOID) -> BOOL {
    if reason == winapi::um::winnt::DLL_PROCESS_ATTACH {
        unsafe { winapi::um::libloaderapi::DisableThreadLibraryCalls(module) };
        if host_is_target() {
            apply_patches();
        }
    }
    TRUE
}

/// The patch data is only meaningful inside the binary it was authored
/// against; any other process gets a silent no-op.
pub fn host_is_target() -> bool {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|name| name.to_os_string()))
        .map_or(false, |name| name.eq_ignore_ascii_case(TARGET_EXE))
}

/// One-shot entry point, run on the attach thread before the host starts up.
/// Reports every failure itself and never unwinds into the host; at worst the
/// host keeps running unpatched.
pub fn apply_patches() {
    std::panic::set_hook(Box::new(|info| {
        log::write_line(info.to_string().as_str());
    }));

    lazy_static::initialize(&log::LOG);
    output_debug_string("translation loader: attach");

    match loader::apply_file(Path::new(loader::PATCH_FILE)) {
        Ok(summary) => {
            log::write_line(&format!(
                "patching done: {} records applied, {} skipped",
                summary.applied, summary.skipped
            ));
        }
        Err(err) => {
            // partial or no patching; the host keeps running either way
            let msg = format!("{:#}", anyhow::Error::new(err));
            log::write_line(&msg);
            log::message_box(&msg);
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_binary_is_not_the_target_host() {
        assert!(!crate::host_is_target());
    }
}
